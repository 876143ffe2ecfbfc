//! SQLite implementation of `TimelineStore`.
//!
//! Grounded on `core::db`/`core::schemas`/`core::broker`: a plain
//! `rusqlite::Connection` opened with WAL mode and foreign keys on, with
//! `segments`/`watermarks` tables whose DDL lives in `core::schemas`.

use crate::core::broker::Broker;
use crate::core::error::Error;
use crate::core::store::{NewSegment, Segment, TimelineStore};
use crate::core::time::Instant;
use crate::core::{attributes, db};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A `TimelineStore` backed by a single SQLite database file.
pub struct SqliteStore {
    conn: Connection,
    db_path: PathBuf,
    broker: Broker,
    watermark_name: String,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `db_path` and runs
    /// `initialize` (spec §6.1).
    pub fn open(
        db_path: impl AsRef<Path>,
        watermark_name: impl Into<String>,
    ) -> Result<Self, Error> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = db::connect(&db_path.to_string_lossy())?;
        db::initialize(&conn)?;
        let audit_log_path = db_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("broker.events.jsonl");
        Ok(Self {
            conn,
            db_path,
            broker: Broker::new(audit_log_path),
            watermark_name: watermark_name.into(),
        })
    }

    pub fn watermark_name(&self) -> &str {
        &self.watermark_name
    }

    /// Runs `f` inside one serialized transaction against this store's
    /// database (spec §5: one batch, one transaction).
    pub fn with_tx<F, R>(&mut self, op: &str, f: F) -> Result<R, Error>
    where
        F: FnOnce(&Transaction, &dyn TimelineStore) -> Result<R, Error>,
    {
        let impl_ = SqliteTimelineStore {
            watermark_name: self.watermark_name.clone(),
        };
        let db_path = self.db_path.clone();
        self.broker
            .with_tx(&mut self.conn, &db_path, op, |tx| f(tx, &impl_))
    }
}

/// `TimelineStore` implementation operating over the caller's
/// `rusqlite::Transaction`, scoped to one watermark pipeline name.
struct SqliteTimelineStore {
    watermark_name: String,
}

/// Columns are written exclusively by this module in canonical
/// `Instant` form, so a parse failure here means on-disk corruption rather
/// than a normal user-facing error; surface it as a SQLite conversion error.
fn parse_stored_instant(raw: &str) -> rusqlite::Result<Instant> {
    Instant::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_segment(row: &Row) -> rusqlite::Result<Segment> {
    let valid_to: Option<String> = row.get("valid_to")?;
    let knowledge_to: Option<String> = row.get("knowledge_to")?;
    let event_time: String = row.get("event_time")?;
    let valid_from: String = row.get("valid_from")?;
    let knowledge_from: String = row.get("knowledge_from")?;
    let attributes_text: String = row.get("attributes")?;

    Ok(Segment {
        segment_id: row.get("segment_id")?,
        entity_id: row.get("entity_id")?,
        attributes: serde_json::from_str(&attributes_text).unwrap_or(serde_json::Value::Null),
        event_time: parse_stored_instant(&event_time)?,
        valid_from: parse_stored_instant(&valid_from)?,
        valid_to: valid_to.map(|s| parse_stored_instant(&s)).transpose()?,
        knowledge_from: parse_stored_instant(&knowledge_from)?,
        knowledge_to: knowledge_to.map(|s| parse_stored_instant(&s)).transpose()?,
        is_current: row.get::<_, i64>("is_current")? != 0,
    })
}

impl TimelineStore for SqliteTimelineStore {
    fn current_segments(&self, tx: &Transaction, entity_id: &str) -> Result<Vec<Segment>, Error> {
        let mut stmt = tx.prepare(
            "SELECT segment_id, entity_id, attributes, event_time, valid_from, valid_to, \
             knowledge_from, knowledge_to, is_current \
             FROM segments WHERE entity_id = ?1 AND knowledge_to IS NULL ORDER BY valid_from ASC",
        )?;
        let rows = stmt.query_map(params![entity_id], row_to_segment)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn insert(&self, tx: &Transaction, segment: &NewSegment) -> Result<bool, Error> {
        let attrs_text = attributes::canonical_string(&segment.attributes);
        let valid_from = segment.valid_from.to_string();
        let valid_to = segment.valid_to.map(|i| i.to_string());

        let exists: bool = match &valid_to {
            None => tx
                .query_row(
                    "SELECT 1 FROM segments WHERE entity_id = ?1 AND attributes = ?2 \
                     AND valid_from = ?3 AND valid_to IS NULL AND knowledge_to IS NULL",
                    params![segment.entity_id, attrs_text, valid_from],
                    |_| Ok(()),
                )
                .optional()?
                .is_some(),
            Some(vt) => tx
                .query_row(
                    "SELECT 1 FROM segments WHERE entity_id = ?1 AND attributes = ?2 \
                     AND valid_from = ?3 AND valid_to = ?4 AND knowledge_to IS NULL",
                    params![segment.entity_id, attrs_text, valid_from, vt],
                    |_| Ok(()),
                )
                .optional()?
                .is_some(),
        };
        if exists {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO segments (entity_id, attributes, event_time, valid_from, valid_to, \
             knowledge_from, knowledge_to, is_current) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
            params![
                segment.entity_id,
                attrs_text,
                segment.event_time.to_string(),
                valid_from,
                valid_to,
                segment.knowledge_from.to_string(),
                segment.is_current() as i64,
            ],
        )?;
        Ok(true)
    }

    fn supersede(
        &self,
        tx: &Transaction,
        segment_id: i64,
        knowledge_time: Instant,
    ) -> Result<(), Error> {
        tx.execute(
            "UPDATE segments SET knowledge_to = ?1, is_current = 0 \
             WHERE segment_id = ?2 AND knowledge_to IS NULL",
            params![knowledge_time.to_string(), segment_id],
        )?;
        Ok(())
    }

    fn watermark(&self, tx: &Transaction) -> Result<Option<Instant>, Error> {
        let value: Option<String> = tx
            .query_row(
                "SELECT value FROM watermarks WHERE name = ?1",
                params![self.watermark_name],
                |row| row.get(0),
            )
            .optional()?;
        value.map(|s| Instant::from_str(&s)).transpose()
    }

    fn set_watermark_raw(&self, tx: &Transaction, value: Instant) -> Result<(), Error> {
        tx.execute(
            "INSERT INTO watermarks (name, value) VALUES (?1, ?2) \
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![self.watermark_name, value.to_string()],
        )?;
        Ok(())
    }

    fn as_of(
        &self,
        tx: &Transaction,
        knowledge_time: Instant,
        effective_time: Instant,
        entity_ids: Option<&[String]>,
    ) -> Result<Vec<Segment>, Error> {
        let knowledge_time = knowledge_time.to_string();
        let effective_time = effective_time.to_string();

        let base_query = "SELECT segment_id, entity_id, attributes, event_time, valid_from, valid_to, \
             knowledge_from, knowledge_to, is_current FROM segments \
             WHERE knowledge_from <= ?1 AND (knowledge_to IS NULL OR knowledge_to > ?2) \
             AND valid_from <= ?3 AND (valid_to IS NULL OR valid_to > ?4)";

        let mut out = Vec::new();
        // An empty filter means "no filter", matching the original's
        // `if security_ids:` guard rather than building `entity_id IN ()`.
        match entity_ids.filter(|ids| !ids.is_empty()) {
            None => {
                let mut stmt =
                    tx.prepare(&format!("{base_query} ORDER BY entity_id, valid_from"))?;
                let rows = stmt.query_map(
                    params![
                        knowledge_time,
                        knowledge_time,
                        effective_time,
                        effective_time
                    ],
                    row_to_segment,
                )?;
                for row in rows {
                    out.push(row?);
                }
            }
            Some(ids) => {
                let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                let query = format!(
                    "{base_query} AND entity_id IN ({placeholders}) ORDER BY entity_id, valid_from"
                );
                let mut stmt = tx.prepare(&query)?;
                let mut bound: Vec<&dyn rusqlite::ToSql> = vec![
                    &knowledge_time,
                    &knowledge_time,
                    &effective_time,
                    &effective_time,
                ];
                for id in ids {
                    bound.push(id);
                }
                let rows = stmt.query_map(bound.as_slice(), row_to_segment)?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }
}
