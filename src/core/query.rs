//! As-of query (spec §4.5): projects the timeline as it was known as of a
//! given knowledge time, viewed at a given effective (valid) time.

use crate::core::error::Error;
use crate::core::sqlite_store::SqliteStore;
use crate::core::store::Segment;
use crate::core::time::Instant;

/// Returns every segment satisfying
/// `knowledge_from <= knowledge_time < knowledge_to` and
/// `valid_from <= effective_time < valid_to`, restricted to `entity_ids`
/// when given. `effective_time` defaults to `knowledge_time` when `None`
/// (spec §4.5: "as of today, what do we currently believe was true today").
pub fn as_of(
    store: &mut SqliteStore,
    knowledge_time: Instant,
    effective_time: Option<Instant>,
    entity_ids: Option<&[String]>,
) -> Result<Vec<Segment>, Error> {
    let effective_time = effective_time.unwrap_or(knowledge_time);
    store.with_tx("query.as_of", |tx, ts| {
        ts.as_of(tx, knowledge_time, effective_time, entity_ids)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::{merge_batch, parse_fact};
    use serde_json::json;
    use tempfile::tempdir;

    fn fact(entity: &str, event_time: &str, attrs: serde_json::Value) -> crate::core::store::Fact {
        let mut obj = attrs.as_object().unwrap().clone();
        obj.insert("entity_id".to_string(), json!(entity));
        obj.insert("event_time".to_string(), json!(event_time));
        parse_fact(&obj).unwrap()
    }

    #[test]
    fn test_as_of_defaults_effective_to_knowledge() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("db.sqlite"), "event_time").unwrap();
        merge_batch(
            &mut store,
            vec![fact(
                "EQ1",
                "2025-01-01T00:00:00Z",
                json!({"status": "ACTIVE"}),
            )],
            Instant::from_json(&json!("2025-01-01T00:00:00Z")).unwrap(),
            true,
        )
        .unwrap();

        let segs = as_of(
            &mut store,
            Instant::from_json(&json!("2025-06-01T00:00:00Z")).unwrap(),
            None,
            None,
        )
        .unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].attributes, json!({"status": "ACTIVE"}));
    }

    #[test]
    fn test_as_of_before_knowledge_from_sees_nothing() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("db.sqlite"), "event_time").unwrap();
        merge_batch(
            &mut store,
            vec![fact(
                "EQ1",
                "2025-01-01T00:00:00Z",
                json!({"status": "ACTIVE"}),
            )],
            Instant::from_json(&json!("2025-06-01T00:00:00Z")).unwrap(),
            true,
        )
        .unwrap();

        let segs = as_of(
            &mut store,
            Instant::from_json(&json!("2025-01-01T00:00:00Z")).unwrap(),
            None,
            None,
        )
        .unwrap();
        assert!(segs.is_empty());
    }

    #[test]
    fn test_as_of_filters_by_entity_ids() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("db.sqlite"), "event_time").unwrap();
        merge_batch(
            &mut store,
            vec![
                fact("EQ1", "2025-01-01T00:00:00Z", json!({"status": "ACTIVE"})),
                fact("EQ2", "2025-01-01T00:00:00Z", json!({"status": "ACTIVE"})),
            ],
            Instant::from_json(&json!("2025-01-01T00:00:00Z")).unwrap(),
            true,
        )
        .unwrap();

        let segs = as_of(
            &mut store,
            Instant::from_json(&json!("2025-06-01T00:00:00Z")).unwrap(),
            None,
            Some(&["EQ1".to_string()]),
        )
        .unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].entity_id, "EQ1");
    }

    #[test]
    fn test_as_of_empty_entity_ids_means_no_filter() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("db.sqlite"), "event_time").unwrap();
        merge_batch(
            &mut store,
            vec![
                fact("EQ1", "2025-01-01T00:00:00Z", json!({"status": "ACTIVE"})),
                fact("EQ2", "2025-01-01T00:00:00Z", json!({"status": "ACTIVE"})),
            ],
            Instant::from_json(&json!("2025-01-01T00:00:00Z")).unwrap(),
            true,
        )
        .unwrap();

        let segs = as_of(
            &mut store,
            Instant::from_json(&json!("2025-06-01T00:00:00Z")).unwrap(),
            None,
            Some(&[]),
        )
        .unwrap();
        assert_eq!(segs.len(), 2);
    }
}
