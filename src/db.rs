use std::path::Path;

use rusqlite::Connection;

use crate::aggregate::BilingualRow;
use crate::error::Result;
use crate::fetch::FetchFailure;
use crate::parser::{PageExtraction, PageStatus};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS runs (
            id         INTEGER PRIMARY KEY,
            started_at TEXT NOT NULL,
            url_count  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fetch_log (
            id         INTEGER PRIMARY KEY,
            run_id     INTEGER NOT NULL REFERENCES runs(id),
            url        TEXT NOT NULL,
            status     TEXT NOT NULL CHECK(status IN ('success','failed')),
            error      TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_fetch_log_run ON fetch_log(run_id);

        CREATE TABLE IF NOT EXISTS texts (
            id           INTEGER PRIMARY KEY,
            run_id       INTEGER NOT NULL REFERENCES runs(id),
            row_id       INTEGER NOT NULL,
            url          TEXT NOT NULL,
            english_text TEXT NOT NULL,
            khmer_text   TEXT NOT NULL,
            UNIQUE(run_id, row_id)
        );

        CREATE TABLE IF NOT EXISTS page_tables (
            id           INTEGER PRIMARY KEY,
            run_id       INTEGER NOT NULL REFERENCES runs(id),
            url          TEXT NOT NULL,
            position     INTEGER NOT NULL,
            title        TEXT NOT NULL,
            detail       TEXT,
            headers_json TEXT NOT NULL,
            rows_json    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_page_tables_run ON page_tables(run_id);
        ",
    )?;
    Ok(())
}

fn status_label(status: PageStatus) -> &'static str {
    match status {
        PageStatus::Success => "success",
        PageStatus::Failed => "failed",
    }
}

/// Persist one finished run in a single transaction. Returns the run id.
pub fn save_run(
    conn: &Connection,
    started_at: &str,
    url_count: usize,
    pages: &[PageExtraction],
    failures: &[FetchFailure],
    rows: &[BilingualRow],
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO runs (started_at, url_count) VALUES (?1, ?2)",
        rusqlite::params![started_at, url_count],
    )?;
    let run_id = tx.last_insert_rowid();

    {
        let mut log_stmt = tx.prepare(
            "INSERT INTO fetch_log (run_id, url, status, error) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for p in pages {
            log_stmt.execute(rusqlite::params![
                run_id,
                p.page.url,
                status_label(p.page.status),
                Option::<String>::None,
            ])?;
        }
        for f in failures {
            log_stmt.execute(rusqlite::params![
                run_id,
                f.url,
                status_label(PageStatus::Failed),
                f.error.to_string(),
            ])?;
        }

        let mut text_stmt = tx.prepare(
            "INSERT INTO texts (run_id, row_id, url, english_text, khmer_text) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for r in rows {
            text_stmt.execute(rusqlite::params![run_id, r.id, r.url, r.english_text, r.khmer_text])?;
        }

        let mut table_stmt = tx.prepare(
            "INSERT INTO page_tables (run_id, url, position, title, detail, headers_json, rows_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for p in pages {
            for (i, t) in p.tables.iter().enumerate() {
                table_stmt.execute(rusqlite::params![
                    run_id,
                    p.page.url,
                    i + 1,
                    t.title,
                    t.detail,
                    serde_json::to_string(&t.headers)?,
                    serde_json::to_string(&t.rows)?,
                ])?;
            }
        }
    }

    tx.commit()?;
    Ok(run_id)
}

// ── Stats ──

pub struct Stats {
    pub runs: usize,
    pub fetched: usize,
    pub failed: usize,
    pub english_rows: usize,
    pub khmer_rows: usize,
    pub tables: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    Ok(Stats {
        runs: count("SELECT COUNT(*) FROM runs")?,
        fetched: count("SELECT COUNT(*) FROM fetch_log WHERE status = 'success'")?,
        failed: count("SELECT COUNT(*) FROM fetch_log WHERE status = 'failed'")?,
        english_rows: count("SELECT COUNT(*) FROM texts WHERE english_text != ''")?,
        khmer_rows: count("SELECT COUNT(*) FROM texts WHERE khmer_text != ''")?,
        tables: count("SELECT COUNT(*) FROM page_tables")?,
    })
}
