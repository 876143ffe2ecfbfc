//! Timeline Store: the minimal persistence contract the merge engine and
//! as-of query need (spec §4.2).
//!
//! `TimelineStore` is implemented once, by `SqliteStore` (see
//! `core::sqlite_store`), against the `segments`/`watermarks` tables defined
//! in `core::schemas`. Every mutating method takes a `&rusqlite::Transaction`
//! so the caller controls the batch-level transaction boundary (spec §9
//! Design Note: "Transactional scoping → explicit acquire/commit/rollback" —
//! `rusqlite::Transaction` already rolls back on `Drop` if never committed,
//! which is exactly the resource-scoping this note calls for).

use crate::core::error::Error;
use crate::core::time::Instant;
use rusqlite::Transaction;
use serde::Serialize;

/// One row of bi-temporal history (spec §3.1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub segment_id: i64,
    pub entity_id: String,
    pub attributes: serde_json::Value,
    pub event_time: Instant,
    pub valid_from: Instant,
    pub valid_to: Option<Instant>,
    pub knowledge_from: Instant,
    pub knowledge_to: Option<Instant>,
    pub is_current: bool,
}

/// A segment not yet assigned a `segment_id`, ready for `TimelineStore::insert`.
#[derive(Debug, Clone)]
pub struct NewSegment {
    pub entity_id: String,
    pub attributes: serde_json::Value,
    pub event_time: Instant,
    pub valid_from: Instant,
    pub valid_to: Option<Instant>,
    pub knowledge_from: Instant,
}

impl NewSegment {
    pub fn is_current(&self) -> bool {
        self.valid_to.is_none()
    }
}

/// A fact as received at the merge engine's boundary (spec §4.3.1, §6.2).
#[derive(Debug, Clone)]
pub struct Fact {
    pub entity_id: String,
    pub event_time: Instant,
    pub attributes: serde_json::Value,
}

/// Summary statistics for one merged batch (spec §4.4).
#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub processed: usize,
    pub skipped_as_late: usize,
    pub inserted_rows: usize,
    pub knowledge_time: Instant,
    pub max_event_time: Option<Instant>,
}

/// The minimal persistence contract a bi-temporal timeline store must offer.
pub trait TimelineStore {
    /// Every segment of `entity_id` whose `knowledge_to` is open, ordered by
    /// `valid_from` ascending.
    fn current_segments(&self, tx: &Transaction, entity_id: &str) -> Result<Vec<Segment>, Error>;

    /// Inserts a new segment. Returns `false` (no-op) if a segment with
    /// identical `(entity_id, attributes, valid_from, valid_to,
    /// knowledge_to=None)` already exists — the existence check is the
    /// idempotency guard and runs inside the same transaction as the insert.
    fn insert(&self, tx: &Transaction, segment: &NewSegment) -> Result<bool, Error>;

    /// Atomically sets `knowledge_to` and clears `is_current` on a segment,
    /// conditional on its `knowledge_to` still being open (guards against
    /// double-close).
    fn supersede(
        &self,
        tx: &Transaction,
        segment_id: i64,
        knowledge_time: Instant,
    ) -> Result<(), Error>;

    /// The current event-time watermark, if any has ever been recorded.
    fn watermark(&self, tx: &Transaction) -> Result<Option<Instant>, Error>;

    /// Persists the event-time watermark. Does not itself check monotonicity;
    /// callers (the batch driver, `set_watermark`) enforce that.
    fn set_watermark_raw(&self, tx: &Transaction, value: Instant) -> Result<(), Error>;

    /// All segments matching an as-of predicate (spec §4.5), ordered by
    /// `(entity_id, valid_from)`.
    fn as_of(
        &self,
        tx: &Transaction,
        knowledge_time: Instant,
        effective_time: Instant,
        entity_ids: Option<&[String]>,
    ) -> Result<Vec<Segment>, Error>;
}
