pub mod repository;

use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;\
                       PRAGMA foreign_keys=ON;\
                       PRAGMA busy_timeout=5000;";

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("migrations/001_initial.sql"))])
}

/// Report history and stored configuration.
///
/// Holds a writer and a reader connection over the same WAL-mode file.
/// Only the writer runs migrations.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    reader: tokio_rusqlite::Connection,
}

impl Database {
    /// Open `~/.fellowship-reports/reports.db`, creating the directory.
    pub async fn open() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?;
        let dir = home.join(".fellowship-reports");
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::Config(format!("{}: {e}", dir.display())))?;
        Self::open_at(dir.join("reports.db")).await
    }

    pub async fn open_at(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening report database at {}", path.display());

        let writer = tokio_rusqlite::Connection::open(&path).await?;
        prepare(&writer, true).await?;
        let reader = tokio_rusqlite::Connection::open(&path).await?;
        prepare(&reader, false).await?;

        Ok(Self { writer, reader })
    }

    /// In-memory database for tests. Reader and writer are the same
    /// connection since each in-memory connection is its own database.
    pub async fn open_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        prepare(&conn, true).await?;
        Ok(Self {
            reader: conn.clone(),
            writer: conn,
        })
    }

    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.reader
    }
}

async fn prepare(conn: &tokio_rusqlite::Connection, migrate: bool) -> Result<()> {
    conn.call(move |conn| {
        conn.execute_batch(PRAGMAS)?;
        if migrate {
            migrations().to_latest(conn)?;
        }
        Ok::<(), Error>(())
    })
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(db: &Database) -> Vec<String> {
        db.reader()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok::<Vec<String>, rusqlite::Error>(rows.filter_map(|r| r.ok()).collect())
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_memory() {
        let db = Database::open_memory().await.unwrap();
        let tables = table_names(&db).await;

        assert!(tables.contains(&"app_config".to_string()));
        assert!(tables.contains(&"report_runs".to_string()));
    }

    #[tokio::test]
    async fn test_open_at_path_is_reopenable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.db");

        let db = Database::open_at(&path).await.unwrap();
        db.writer()
            .call(|conn| {
                repository::set_config(conn, "api_base_url", "http://localhost/api")?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        drop(db);

        let db = Database::open_at(&path).await.unwrap();
        let value = db
            .reader()
            .call(|conn| repository::get_config(conn, "api_base_url"))
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("http://localhost/api"));
        assert!(table_names(&db).await.contains(&"report_runs".to_string()));
    }
}
