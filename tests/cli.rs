//! CLI smoke test: `init` then `merge` against a fixture batch file.

use std::process::Command;
use tempfile::tempdir;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_bitemporal")
}

#[test]
fn init_then_merge_then_query_as_of() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("cli_smoke.sqlite");
    let facts = dir.path().join("facts.jsonl");
    std::fs::write(
        &facts,
        "{\"entity_id\": \"EQ1\", \"event_time\": \"2025-01-01T00:00:00Z\", \"status\": \"ACTIVE\"}\n",
    )
    .unwrap();

    let init = Command::new(bin())
        .args(["--db", db.to_str().unwrap(), "init"])
        .output()
        .unwrap();
    assert!(
        init.status.success(),
        "{}",
        String::from_utf8_lossy(&init.stderr)
    );

    let merge = Command::new(bin())
        .args([
            "--db",
            db.to_str().unwrap(),
            "merge",
            facts.to_str().unwrap(),
            "--knowledge-time",
            "2025-01-05T00:00:00Z",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(
        merge.status.success(),
        "{}",
        String::from_utf8_lossy(&merge.stderr)
    );
    let summary: serde_json::Value = serde_json::from_slice(&merge.stdout).unwrap();
    assert_eq!(summary["processed"], 1);
    assert_eq!(summary["inserted_rows"], 1);

    let query = Command::new(bin())
        .args([
            "--db",
            db.to_str().unwrap(),
            "query-as-of",
            "2025-06-01T00:00:00Z",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(
        query.status.success(),
        "{}",
        String::from_utf8_lossy(&query.stderr)
    );
    let segments: serde_json::Value = serde_json::from_slice(&query.stdout).unwrap();
    assert_eq!(segments.as_array().unwrap().len(), 1);
    assert_eq!(segments[0]["attributes"]["status"], "ACTIVE");
}
