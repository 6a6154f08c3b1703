//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the `LeadStore`
//! and `JobStore` traits.

use crate::state::{EnrichmentStatus, JobStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobStore, LeadStore, StorageError, StorageResult};
use crate::storage::{EnrichmentJob, Lead, NewLead};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

const LEAD_COLUMNS: &str = "id, place_id, name, types, sponsored, address, phone, website, domain,
     status, error, technologies, performance, audit, content_markdown, extraction_tier,
     created_at, updated_at, enriched_at";

const JOB_COLUMNS: &str =
    "id, lead_id, url, attempt, max_attempts, status, last_error, available_at, created_at, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// Missing parent directories are created.
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_lead(&self, filter: &str, value: &dyn rusqlite::ToSql) -> StorageResult<Option<Lead>> {
        let sql = format!(
            "SELECT {} FROM leads WHERE {} ORDER BY id ASC LIMIT 1",
            LEAD_COLUMNS, filter
        );
        let lead = self
            .conn
            .query_row(&sql, params![value], lead_from_row)
            .optional()?;
        Ok(lead)
    }

    fn job_status(&self, job_id: i64) -> StorageResult<JobStatus> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        status
            .and_then(|s| JobStatus::from_db_string(&s))
            .ok_or(StorageError::JobNotFound(job_id))
    }

    /// Fails unless the job may move from its current status to `to`
    fn check_transition(&self, job_id: i64, to: JobStatus) -> StorageResult<()> {
        let from = self.job_status(job_id)?;
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(StorageError::InvalidTransition { from, to })
        }
    }
}

impl LeadStore for SqliteStorage {
    fn insert_lead(&mut self, lead: &NewLead) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO leads (place_id, name, types, sponsored, address, phone, website, domain,
             status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                lead.place_id,
                lead.name,
                serde_json::to_string(&lead.types)?,
                lead.sponsored,
                lead.address,
                lead.phone,
                lead.website,
                lead.domain,
                lead.status.to_db_string(),
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_by_key(&self, id: i64) -> StorageResult<Option<Lead>> {
        self.query_lead("id = ?1", &id)
    }

    fn find_by_place_id(&self, place_id: &str) -> StorageResult<Option<Lead>> {
        self.query_lead("place_id = ?1", &place_id)
    }

    fn find_by_domain(&self, domain: &str) -> StorageResult<Option<Lead>> {
        self.query_lead("domain = ?1", &domain)
    }

    fn save(&mut self, lead: &Lead) -> StorageResult<()> {
        let performance = lead
            .performance
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let audit = lead.audit.as_ref().map(serde_json::to_string).transpose()?;
        let now = Utc::now().to_rfc3339();

        let updated = self.conn.execute(
            "UPDATE leads SET name = ?1, types = ?2, sponsored = ?3, address = ?4, phone = ?5,
             website = ?6, domain = ?7, status = ?8, error = ?9, technologies = ?10,
             performance = ?11, audit = ?12, content_markdown = ?13, extraction_tier = ?14,
             enriched_at = ?15, updated_at = ?16
             WHERE id = ?17",
            params![
                lead.name,
                serde_json::to_string(&lead.types)?,
                lead.sponsored,
                lead.address,
                lead.phone,
                lead.website,
                lead.domain,
                lead.status.to_db_string(),
                lead.error,
                serde_json::to_string(&lead.technologies)?,
                performance,
                audit,
                lead.content_markdown,
                lead.extraction_tier,
                lead.enriched_at,
                now,
                lead.id,
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::LeadNotFound(lead.id));
        }
        Ok(())
    }

    fn set_enrichment_status(
        &mut self,
        id: i64,
        status: EnrichmentStatus,
        error: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE leads SET status = ?1, error = ?2, updated_at = ?3 WHERE id = ?4",
            params![status.to_db_string(), error, now, id],
        )?;

        if updated == 0 {
            return Err(StorageError::LeadNotFound(id));
        }
        Ok(())
    }

    fn count_by_status(&self, status: EnrichmentStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM leads WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl JobStore for SqliteStorage {
    fn enqueue(&mut self, lead_id: i64, url: &str, max_attempts: u32) -> StorageResult<i64> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO jobs (lead_id, url, status, attempt, max_attempts, available_at,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?6)",
            params![
                lead_id,
                url,
                JobStatus::Queued.to_db_string(),
                max_attempts,
                now.timestamp_millis(),
                now.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn claim_next(&mut self) -> StorageResult<Option<EnrichmentJob>> {
        let now = Utc::now();
        let tx = self.conn.transaction()?;

        let job_id: Option<i64> = tx
            .query_row(
                "SELECT j.id FROM jobs j
                 WHERE j.status = ?1 AND j.available_at <= ?2
                   AND NOT EXISTS (
                       SELECT 1 FROM jobs r WHERE r.lead_id = j.lead_id AND r.status = ?3
                   )
                 ORDER BY j.available_at ASC, j.id ASC
                 LIMIT 1",
                params![
                    JobStatus::Queued.to_db_string(),
                    now.timestamp_millis(),
                    JobStatus::Running.to_db_string(),
                ],
                |row| row.get(0),
            )
            .optional()?;

        let Some(job_id) = job_id else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE jobs SET status = ?1, attempt = attempt + 1, updated_at = ?2 WHERE id = ?3",
            params![JobStatus::Running.to_db_string(), now.to_rfc3339(), job_id],
        )?;

        let job = tx.query_row(
            &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
            params![job_id],
            job_from_row,
        )?;

        tx.commit()?;
        Ok(Some(job))
    }

    fn ack_success(&mut self, job_id: i64) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::Succeeded)?;
        self.conn
            .execute("DELETE FROM jobs WHERE id = ?1", params![job_id])?;
        Ok(())
    }

    fn ack_retry(&mut self, job_id: i64, delay: Duration, error: &str) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::FailedTransient)?;

        let now = Utc::now();
        // Delays past chrono's range clamp to the latest representable instant
        let available_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .timestamp_millis();
        self.conn.execute(
            "UPDATE jobs SET status = ?1, available_at = ?2, last_error = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                JobStatus::Queued.to_db_string(),
                available_at,
                error,
                now.to_rfc3339(),
                job_id,
            ],
        )?;
        Ok(())
    }

    fn ack_terminal(&mut self, job_id: i64, error: &str) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::FailedTerminal)?;

        self.conn.execute(
            "UPDATE jobs SET status = ?1, last_error = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                JobStatus::FailedTerminal.to_db_string(),
                error,
                Utc::now().to_rfc3339(),
                job_id,
            ],
        )?;
        Ok(())
    }

    fn get_job(&self, job_id: i64) -> StorageResult<Option<EnrichmentJob>> {
        let job = self
            .conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                params![job_id],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    fn count_active(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status IN (?1, ?2)",
            params![
                JobStatus::Queued.to_db_string(),
                JobStatus::Running.to_db_string()
            ],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_jobs_by_status(&self, status: JobStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn has_active_job(&self, lead_id: i64) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE lead_id = ?1 AND status IN (?2, ?3)",
            params![
                lead_id,
                JobStatus::Queued.to_db_string(),
                JobStatus::Running.to_db_string()
            ],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn next_available_at(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let millis: Option<i64> = self.conn.query_row(
            "SELECT MIN(available_at) FROM jobs WHERE status = ?1",
            params![JobStatus::Queued.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(millis.and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
    }

    fn recover_interrupted(&mut self) -> StorageResult<u64> {
        let now = Utc::now();
        let recovered = self.conn.execute(
            "UPDATE jobs SET status = ?1, available_at = ?2, updated_at = ?3 WHERE status = ?4",
            params![
                JobStatus::Queued.to_db_string(),
                now.timestamp_millis(),
                now.to_rfc3339(),
                JobStatus::Running.to_db_string(),
            ],
        )?;
        Ok(recovered as u64)
    }
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        place_id: row.get(1)?,
        name: row.get(2)?,
        types: json_column(row, 3)?,
        sponsored: row.get(4)?,
        address: row.get(5)?,
        phone: row.get(6)?,
        website: row.get(7)?,
        domain: row.get(8)?,
        status: EnrichmentStatus::from_db_string(&row.get::<_, String>(9)?)
            .unwrap_or(EnrichmentStatus::Unprocessed),
        error: row.get(10)?,
        technologies: json_column(row, 11)?,
        performance: optional_json_column(row, 12)?,
        audit: optional_json_column(row, 13)?,
        content_markdown: row.get(14)?,
        extraction_tier: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
        enriched_at: row.get(18)?,
    })
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<EnrichmentJob> {
    let available_ms: i64 = row.get(7)?;
    Ok(EnrichmentJob {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        url: row.get(2)?,
        attempt: row.get(3)?,
        max_attempts: row.get(4)?,
        status: JobStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(JobStatus::FailedTerminal),
        last_error: row.get(6)?,
        available_at: Utc
            .timestamp_millis_opt(available_ms)
            .single()
            .unwrap_or_else(Utc::now),
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
