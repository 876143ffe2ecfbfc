// src/core/schemas.rs
// Centralized SQL schema definitions for the bi-temporal store (spec §6.3).

pub const DB_NAME: &str = "reference_data.db";

pub const SEGMENTS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS segments (
        segment_id INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_id TEXT NOT NULL,
        attributes TEXT NOT NULL,
        event_time TEXT NOT NULL,
        valid_from TEXT NOT NULL,
        valid_to TEXT,
        knowledge_from TEXT NOT NULL,
        knowledge_to TEXT,
        is_current INTEGER NOT NULL DEFAULT 0
    )
";

pub const SEGMENTS_INDEX_ENTITY_VALID: &str =
    "CREATE INDEX IF NOT EXISTS idx_segments_entity_valid ON segments(entity_id, valid_from)";

pub const SEGMENTS_INDEX_ENTITY_CURRENT: &str =
    "CREATE INDEX IF NOT EXISTS idx_segments_entity_current ON segments(entity_id, is_current)";

pub const WATERMARKS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS watermarks (
        name TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";
