//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Lead Prospector database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Business listings and their enrichment results
CREATE TABLE IF NOT EXISTS leads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    place_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    types TEXT NOT NULL DEFAULT '[]',
    sponsored INTEGER NOT NULL DEFAULT 0,
    address TEXT,
    phone TEXT,
    website TEXT,
    domain TEXT,
    status TEXT NOT NULL,
    error TEXT,
    technologies TEXT NOT NULL DEFAULT '[]',
    performance TEXT,
    audit TEXT,
    content_markdown TEXT,
    extraction_tier TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    enriched_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_leads_domain ON leads(domain);
CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status);

-- Durable enrichment queue; available_at is unix milliseconds
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lead_id INTEGER NOT NULL REFERENCES leads(id),
    url TEXT NOT NULL,
    status TEXT NOT NULL,
    attempt INTEGER NOT NULL DEFAULT 0,
    max_attempts INTEGER NOT NULL,
    available_at INTEGER NOT NULL,
    last_error TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_status_available ON jobs(status, available_at);
CREATE INDEX IF NOT EXISTS idx_jobs_lead ON jobs(lead_id);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
