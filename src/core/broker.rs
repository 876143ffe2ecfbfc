//! Write serialization and mutation audit trail (the thin waist).
//!
//! The bi-temporal store is a single-writer engine: one batch is merged at a
//! time, inside one transaction, and a partial batch is never observable
//! (spec §5). `Broker::with_tx` is the one place a mutation happens: it
//! serializes concurrent callers per database path with an in-process lock,
//! opens a SQLite transaction, and appends a JSONL audit record of what ran.
//! This is this crate's structured "logging" of mutations, in the teacher's
//! own idiom — an events log file — rather than a tracing crate.

use crate::core::error::Error;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Serializes mutating access to a SQLite database and records an audit
/// trail of every transaction run through it.
pub struct Broker {
    audit_log_path: PathBuf,
}

/// One line of `broker.events.jsonl`: what ran, against which database, and
/// whether it committed.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub event_id: String,
    pub ts: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl Broker {
    pub fn new(audit_log_path: impl Into<PathBuf>) -> Self {
        Self {
            audit_log_path: audit_log_path.into(),
        }
    }

    /// Run `f` inside a SQLite transaction against `db_path`, serialized
    /// against any other caller using the same path. Commits on `Ok`, rolls
    /// back on `Err` (and on panic, via `rusqlite::Transaction`'s `Drop`).
    pub fn with_tx<F, R>(
        &self,
        conn: &mut Connection,
        db_path: &Path,
        op: &str,
        f: F,
    ) -> Result<R, Error>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<R, Error>,
    {
        let lock = db_lock(db_path);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let tx = conn.transaction()?;
        let result = f(&tx);
        let status = if result.is_ok() { "success" } else { "error" };
        self.log_event(op, db_path, status)?;

        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback()?;
                Err(err)
            }
        }
    }

    fn log_event(&self, op: &str, db_path: &Path, status: &str) -> Result<(), Error> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let event = BrokerEvent {
            event_id: time::new_event_id(),
            ts: time::Instant::now().to_string(),
            op: op.to_string(),
            db_id: db_path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            status: status.to_string(),
        };

        if let Some(parent) = self.audit_log_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)?;
        writeln!(
            file,
            "{}",
            serde_json::to_string(&event).expect("event is always serializable")
        )?;
        Ok(())
    }
}

fn db_lock_map() -> &'static Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> {
    static DB_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    DB_LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn db_lock(db_path: &Path) -> Arc<Mutex<()>> {
    let mut map = db_lock_map()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    map.entry(db_path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}
