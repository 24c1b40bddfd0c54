use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

/// Remove a config key. Returns true if it existed.
pub fn unset_config(conn: &Connection, key: &str) -> Result<bool, rusqlite::Error> {
    let n = conn.execute("DELETE FROM app_config WHERE key = ?1", params![key])?;
    Ok(n > 0)
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Report Runs ────────────────────────────────────────────────────

/// One recorded attempt at generating a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRun {
    pub id: i64,
    pub period_key: String,
    pub range_start: Option<String>,
    pub range_end: Option<String>,
    pub status: String,
    pub event_count: Option<u64>,
    pub error_message: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

pub fn insert_report_run(
    conn: &Connection,
    period_key: &str,
    range_start: Option<&str>,
    range_end: Option<&str>,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO report_runs (period_key, range_start, range_end, status, started_at)
         VALUES (?1, ?2, ?3, 'running', datetime('now'))",
        params![period_key, range_start, range_end],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn complete_report_run(
    conn: &Connection,
    run_id: i64,
    event_count: u64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE report_runs SET
            status = 'completed', completed_at = datetime('now'), event_count = ?2
         WHERE id = ?1",
        params![run_id, event_count as i64],
    )?;
    Ok(())
}

pub fn fail_report_run(
    conn: &Connection,
    run_id: i64,
    error_message: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE report_runs SET
            status = 'failed', completed_at = datetime('now'), error_message = ?2
         WHERE id = ?1",
        params![run_id, error_message],
    )?;
    Ok(())
}

/// Most recent runs first.
pub fn list_report_runs(conn: &Connection, limit: u32) -> Result<Vec<ReportRun>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, period_key, range_start, range_end, status, event_count,
                error_message, started_at, completed_at
         FROM report_runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(ReportRun {
            id: row.get(0)?,
            period_key: row.get(1)?,
            range_start: row.get(2)?,
            range_end: row.get(3)?,
            status: row.get(4)?,
            event_count: row.get::<_, Option<i64>>(5)?.map(|n| n as u64),
            error_message: row.get(6)?,
            started_at: row.get(7)?,
            completed_at: row.get(8)?,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[tokio::test]
    async fn test_config_round_trip() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                set_config(conn, "api_base_url", "http://localhost:5000/api")?;
                let val = get_config(conn, "api_base_url")?;
                assert_eq!(val.as_deref(), Some("http://localhost:5000/api"));

                let missing = get_config(conn, "nonexistent")?;
                assert!(missing.is_none());

                set_config(conn, "api_base_url", "http://other/api")?;
                set_config(conn, "event_limit", "50")?;
                let all = list_config(conn)?;
                assert_eq!(
                    all,
                    vec![
                        ("api_base_url".to_string(), "http://other/api".to_string()),
                        ("event_limit".to_string(), "50".to_string()),
                    ]
                );

                assert!(unset_config(conn, "event_limit")?);
                assert!(!unset_config(conn, "event_limit")?);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_report_run_lifecycle() {
        let db = Database::open_memory().await.unwrap();

        let runs = db
            .writer()
            .call(|conn| {
                let ok = insert_report_run(
                    conn,
                    "current-month",
                    Some("2024-03-01T00:00:00.000Z"),
                    Some("2024-03-15T10:00:00.000Z"),
                )?;
                complete_report_run(conn, ok, 7)?;

                let bad = insert_report_run(conn, "custom", None, None)?;
                fail_report_run(conn, bad, "Failed to fetch top events")?;

                let pending = insert_report_run(conn, "this-year", None, None)?;
                assert!(pending > bad);

                list_report_runs(conn, 10)
            })
            .await
            .unwrap();

        assert_eq!(runs.len(), 3);

        assert_eq!(runs[0].period_key, "this-year");
        assert_eq!(runs[0].status, "running");
        assert!(runs[0].completed_at.is_none());

        assert_eq!(runs[1].status, "failed");
        assert_eq!(
            runs[1].error_message.as_deref(),
            Some("Failed to fetch top events")
        );
        assert!(runs[1].range_start.is_none());

        assert_eq!(runs[2].status, "completed");
        assert_eq!(runs[2].event_count, Some(7));
        assert_eq!(runs[2].range_start.as_deref(), Some("2024-03-01T00:00:00.000Z"));
        assert!(runs[2].completed_at.is_some());
    }

    #[tokio::test]
    async fn test_list_report_runs_limit() {
        let db = Database::open_memory().await.unwrap();

        let runs = db
            .writer()
            .call(|conn| {
                for _ in 0..5 {
                    insert_report_run(conn, "current-month", None, None)?;
                }
                list_report_runs(conn, 2)
            })
            .await
            .unwrap();

        assert_eq!(runs.len(), 2);
        assert!(runs[0].id > runs[1].id);
    }
}
