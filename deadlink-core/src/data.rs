use chrono::Utc;
use deadlink_scanner::{LinkOutcome, RequesterId, ResultSink, ScanResult};
use rusqlite::{Connection, Result, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

pub struct Database {
    conn: Connection,
}

/// One persisted link finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: i64,
    pub requester: String,
    pub page_url: String,
    pub link_url: String,
    pub status: String,
    pub status_label: String,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub checked_at: i64,
}

/// Bookkeeping row for one completed scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub requester: String,
    pub seed_url: String,
    pub started_at: i64,
    pub finished_at: i64,
    pub termination: String,
    pub outcome_count: i64,
    pub dropped_links: i64,
}

fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

impl Database {
    pub fn drop(path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- One row per scan invocation
            CREATE TABLE IF NOT EXISTS scans (
    id TEXT PRIMARY KEY,
    requester TEXT NOT NULL,
    seed_url TEXT NOT NULL,
    started_at INTEGER NOT NULL,
    finished_at INTEGER NOT NULL,
    termination TEXT NOT NULL CHECK(termination IN ('completed', 'deadline_exceeded')),
    outcome_count INTEGER NOT NULL DEFAULT 0,
    dropped_links INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_scans_requester ON scans(requester);

-- Checked links
CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    requester TEXT NOT NULL,
    page_url TEXT NOT NULL,
    link_url TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN (
        'alive',
        'not_found',
        'client_error',
        'server_error',
        'redirect',
        'too_many_redirects',
        'dead'
    )),
    status_label TEXT NOT NULL,
    status_code INTEGER,
    error TEXT,
    checked_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_requester ON results(requester);
CREATE INDEX IF NOT EXISTS idx_results_status ON results(status);
            ",
        )?;
        Ok(())
    }

    pub fn record_scan(&self, result: &ScanResult) -> Result<String> {
        let scan_id = uuid::Uuid::new_v4().to_string();

        self.conn.execute(
            "INSERT INTO scans (
                id, requester, seed_url, started_at, finished_at, termination,
                outcome_count, dropped_links
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &scan_id,
                result.requester.as_str(),
                &result.seed_url,
                result.started_at.timestamp(),
                result.finished_at.timestamp(),
                result.termination.as_str(),
                result.outcomes.len() as i64,
                result.dropped_links as i64,
            ],
        )?;

        Ok(scan_id)
    }

    pub fn insert_result(
        &self,
        requester: &RequesterId,
        page_url: &str,
        outcome: &LinkOutcome,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO results (
                requester, page_url, link_url, status, status_label, status_code,
                error, checked_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                requester.as_str(),
                page_url,
                &outcome.url,
                outcome.status.as_str(),
                outcome.status.to_string(),
                outcome.status_code,
                &outcome.error,
                current_timestamp(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_results_for_requester(&self, requester: &RequesterId) -> Result<Vec<StoredResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, requester, page_url, link_url, status, status_label, status_code,
                    error, checked_at
             FROM results
             WHERE requester = ?1
             ORDER BY checked_at DESC, id",
        )?;

        let results = stmt
            .query_map([requester.as_str()], |row| {
                Ok(StoredResult {
                    id: row.get(0)?,
                    requester: row.get(1)?,
                    page_url: row.get(2)?,
                    link_url: row.get(3)?,
                    status: row.get(4)?,
                    status_label: row.get(5)?,
                    status_code: row.get(6)?,
                    error: row.get(7)?,
                    checked_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(results)
    }

    pub fn get_scans_for_requester(&self, requester: &RequesterId) -> Result<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, requester, seed_url, started_at, finished_at, termination,
                    outcome_count, dropped_links
             FROM scans
             WHERE requester = ?1
             ORDER BY started_at DESC",
        )?;

        let scans = stmt
            .query_map([requester.as_str()], |row| {
                Ok(ScanRecord {
                    id: row.get(0)?,
                    requester: row.get(1)?,
                    seed_url: row.get(2)?,
                    started_at: row.get(3)?,
                    finished_at: row.get(4)?,
                    termination: row.get(5)?,
                    outcome_count: row.get(6)?,
                    dropped_links: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(scans)
    }
}

impl ResultSink for Database {
    fn persist(
        &self,
        requester: &RequesterId,
        seed_url: &str,
        outcome: &LinkOutcome,
    ) -> anyhow::Result<()> {
        self.insert_result(requester, seed_url, outcome)?;
        Ok(())
    }
}
