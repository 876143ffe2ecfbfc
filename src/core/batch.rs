//! Watermark & batch driver (spec §4.4): sorts a batch deterministically,
//! merges it record-by-record under one transaction, maintains the
//! per-pipeline event-time watermark, and reports summary statistics.

use crate::core::error::Error;
use crate::core::merge::merge_one;
use crate::core::sqlite_store::SqliteStore;
use crate::core::store::{Fact, MergeSummary};
use crate::core::time::Instant;

/// Parses one input record into a `Fact` (spec §6.2). `entity_id` must be a
/// non-empty string after trimming; `event_time` must parse as an instant.
/// Every other key becomes an attribute.
pub fn parse_fact(record: &serde_json::Map<String, serde_json::Value>) -> Result<Fact, Error> {
    let entity_id = record
        .get("entity_id")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::MissingField("entity_id".to_string()))?;

    let event_time_raw = record
        .get("event_time")
        .ok_or_else(|| Error::MissingField("event_time".to_string()))?;
    let event_time = Instant::from_json(event_time_raw)?;

    let attributes = crate::core::attributes::extract_attributes(record);

    Ok(Fact {
        entity_id,
        event_time,
        attributes,
    })
}

/// Merges a batch of facts into `store` under one transaction (spec §4.4,
/// §6.1 `merge(store, batch, knowledge_time, allow_late)`).
pub fn merge_batch(
    store: &mut SqliteStore,
    facts: Vec<Fact>,
    knowledge_time: Instant,
    allow_late: bool,
) -> Result<MergeSummary, Error> {
    let mut sorted = facts;
    sorted.sort_by_key(|f| (f.entity_id.clone(), f.event_time));

    store.with_tx("batch.merge", |tx, ts| {
        let watermark = ts.watermark(tx)?;

        let mut processed = 0usize;
        let mut skipped_as_late = 0usize;
        let mut inserted_rows = 0usize;
        let mut max_event_time: Option<Instant> = None;

        for fact in &sorted {
            if let Some(w) = watermark
                && !allow_late
                && fact.event_time <= w
            {
                skipped_as_late += 1;
                continue;
            }

            let inserted = merge_one(
                tx,
                ts,
                &fact.entity_id,
                fact.event_time,
                &fact.attributes,
                knowledge_time,
            )?;
            processed += 1;
            inserted_rows += inserted;
            // Pure no-ops (inserted == 0) do not advance the watermark
            // (spec §9 Open Question, resolved conservatively to match the
            // original reference implementation's behaviour).
            if inserted > 0 && max_event_time.is_none_or(|m| fact.event_time > m) {
                max_event_time = Some(fact.event_time);
            }
        }

        if let Some(max_et) = max_event_time
            && watermark.is_none_or(|w| max_et > w)
        {
            ts.set_watermark_raw(tx, max_et)?;
        }

        Ok(MergeSummary {
            processed,
            skipped_as_late,
            inserted_rows,
            knowledge_time,
            max_event_time,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(obj: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        obj.as_object().unwrap().clone()
    }

    #[test]
    fn test_parse_fact_missing_entity_id() {
        let r = record(json!({"event_time": "2025-01-01T00:00:00Z"}));
        assert!(matches!(parse_fact(&r), Err(Error::MissingField(_))));
    }

    #[test]
    fn test_parse_fact_missing_event_time() {
        let r = record(json!({"entity_id": "EQ1"}));
        assert!(matches!(parse_fact(&r), Err(Error::MissingField(_))));
    }

    #[test]
    fn test_parse_fact_bad_timestamp() {
        let r = record(json!({"entity_id": "EQ1", "event_time": "not-a-date"}));
        assert!(matches!(parse_fact(&r), Err(Error::BadTimestamp(_))));
    }

    #[test]
    fn test_parse_fact_trims_entity_id() {
        let r = record(
            json!({"entity_id": "  EQ1  ", "event_time": "2025-01-01T00:00:00Z", "status": "ACTIVE"}),
        );
        let f = parse_fact(&r).unwrap();
        assert_eq!(f.entity_id, "EQ1");
        assert_eq!(f.attributes, json!({"status": "ACTIVE"}));
    }

    #[test]
    fn test_fresh_insert_batch_summary() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("db.sqlite"), "event_time").unwrap();
        let facts = vec![Fact {
            entity_id: "EQ1".to_string(),
            event_time: Instant::from_json(&json!("2025-01-01T00:00:00Z")).unwrap(),
            attributes: json!({"status": "ACTIVE"}),
        }];
        let summary = merge_batch(
            &mut store,
            facts,
            Instant::from_json(&json!("2025-01-05T00:00:00Z")).unwrap(),
            true,
        )
        .unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.inserted_rows, 1);
        assert_eq!(summary.skipped_as_late, 0);
        assert_eq!(
            summary.max_event_time,
            Some(Instant::from_json(&json!("2025-01-01T00:00:00Z")).unwrap())
        );
    }

    #[test]
    fn test_late_arrival_skipped_when_disallowed() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("db.sqlite"), "event_time").unwrap();
        merge_batch(
            &mut store,
            vec![Fact {
                entity_id: "EQ1".to_string(),
                event_time: Instant::from_json(&json!("2025-01-10T00:00:00Z")).unwrap(),
                attributes: json!({"status": "ACTIVE"}),
            }],
            Instant::from_json(&json!("2025-01-10T00:00:00Z")).unwrap(),
            true,
        )
        .unwrap();

        let summary = merge_batch(
            &mut store,
            vec![Fact {
                entity_id: "EQ1".to_string(),
                event_time: Instant::from_json(&json!("2025-01-05T00:00:00Z")).unwrap(),
                attributes: json!({"status": "PENDING"}),
            }],
            Instant::from_json(&json!("2025-02-01T00:00:00Z")).unwrap(),
            false,
        )
        .unwrap();
        assert_eq!(summary.skipped_as_late, 1);
        assert_eq!(summary.inserted_rows, 0);
    }
}
