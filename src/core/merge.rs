//! The merge engine: integrates one fact into an entity's current timeline
//! (spec §4.3).
//!
//! This is the algorithmic core of the crate and is a direct, literal
//! translation of spec.md §4.3.2's five-step algorithm — idempotency check,
//! same-boundary correction, predecessor/successor location, overlap split,
//! non-overlap insert — onto the `TimelineStore` trait. Every step maps to
//! exactly the spec step it implements; nothing here reinterprets the
//! algorithm, which is also tested line-for-line against the original
//! Python reference implementation's behaviour in `tests/scenarios.rs`.

use crate::core::attributes::canonical_bytes;
use crate::core::error::Error;
use crate::core::store::{NewSegment, Segment, TimelineStore};
use crate::core::time::Instant;
use rusqlite::Transaction;

/// Merges one fact into `entity_id`'s timeline, returning the number of
/// segments physically inserted (0, 1, or 2).
pub fn merge_one(
    tx: &Transaction,
    store: &dyn TimelineStore,
    entity_id: &str,
    event_time: Instant,
    attributes: &serde_json::Value,
    knowledge_time: Instant,
) -> Result<usize, Error> {
    let current = store.current_segments(tx, entity_id)?;
    let canonical_attrs = canonical_bytes(attributes);

    // Step 1: idempotency.
    if current
        .iter()
        .any(|s| s.valid_from == event_time && canonical_bytes(&s.attributes) == canonical_attrs)
    {
        return Ok(0);
    }

    // Step 2: boundary correction (same valid_from, different attributes).
    // Reuses `existing`'s own `valid_to` rather than re-locating a successor:
    // `current` is non-overlapping by invariant, so no other current segment
    // can start between `existing.valid_from` and `existing.valid_to`.
    if let Some(existing) = current.iter().find(|s| s.valid_from == event_time) {
        debug_assert!(
            current.iter().all(|s| s.segment_id == existing.segment_id
                || s.valid_from >= existing.valid_to.unwrap_or(s.valid_from)
                || s.valid_from <= existing.valid_from),
            "current segments must not overlap existing's range"
        );
        store.supersede(tx, existing.segment_id, knowledge_time)?;
        let inserted = store.insert(
            tx,
            &NewSegment {
                entity_id: entity_id.to_string(),
                attributes: attributes.clone(),
                event_time,
                valid_from: event_time,
                valid_to: existing.valid_to,
                knowledge_from: knowledge_time,
            },
        )?;
        return Ok(inserted as usize);
    }

    // Step 3: locate predecessor (greatest valid_from <= E) and successor
    // (smallest valid_from > E). `current` is ordered by valid_from ascending.
    let predecessor: Option<&Segment> = current.iter().rfind(|s| s.valid_from <= event_time);
    let successor: Option<&Segment> = current.iter().find(|s| s.valid_from > event_time);

    let overlaps = predecessor
        .map(|p| p.valid_to.is_none_or(|vt| event_time < vt))
        .unwrap_or(false);

    if overlaps {
        // Step 4: overlap case.
        let predecessor = predecessor.expect("overlaps implies predecessor is Some");
        store.supersede(tx, predecessor.segment_id, knowledge_time)?;

        let mut inserted = 0usize;
        if predecessor.valid_from != event_time {
            let reinserted = store.insert(
                tx,
                &NewSegment {
                    entity_id: entity_id.to_string(),
                    attributes: predecessor.attributes.clone(),
                    event_time: predecessor.event_time,
                    valid_from: predecessor.valid_from,
                    valid_to: Some(event_time),
                    knowledge_from: knowledge_time,
                },
            )?;
            inserted += reinserted as usize;
        }

        let mut new_valid_to = predecessor.valid_to;
        if let Some(n) = successor
            && new_valid_to.is_none_or(|vt| n.valid_from < vt)
        {
            new_valid_to = Some(n.valid_from);
        }

        let inserted_new = store.insert(
            tx,
            &NewSegment {
                entity_id: entity_id.to_string(),
                attributes: attributes.clone(),
                event_time,
                valid_from: event_time,
                valid_to: new_valid_to,
                knowledge_from: knowledge_time,
            },
        )?;
        inserted += inserted_new as usize;
        Ok(inserted)
    } else {
        // Step 5: non-overlap case.
        let valid_to = successor.map(|n| n.valid_from);
        let inserted = store.insert(
            tx,
            &NewSegment {
                entity_id: entity_id.to_string(),
                attributes: attributes.clone(),
                event_time,
                valid_from: event_time,
                valid_to,
                knowledge_from: knowledge_time,
            },
        )?;
        Ok(inserted as usize)
    }
}
