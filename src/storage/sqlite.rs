/// SQLite power archive
///
/// Single connection behind a mutex; every statement runs on the blocking
/// pool so the reactor never waits on disk.
use super::record::PowerRecord;
use super::sink::PersistenceSink;
use crate::errors::PersistenceError;
use crate::logger::{self, LogTag};
use crate::registers::ThreePhase;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Arc;

pub struct SqliteSink {
    conn: Arc<Mutex<Connection>>,
    database_path: String,
}

impl SqliteSink {
    /// Open (or create) the archive at `db_path`
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let path = db_path.as_ref();
        let database_path = path.to_string_lossy().to_string();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| PersistenceError::Open {
                    path: database_path.clone(),
                    reason: e.to_string(),
                })?;
            }
        }

        let conn = Connection::open(path).map_err(|e| PersistenceError::Open {
            path: database_path.clone(),
            reason: e.to_string(),
        })?;

        let sink = Self {
            conn: Arc::new(Mutex::new(conn)),
            database_path,
        };
        sink.initialize_schema()?;

        logger::info(
            LogTag::Storage,
            &format!("Power database initialized at {}", sink.database_path),
        );
        Ok(sink)
    }

    pub fn database_path(&self) -> &str {
        &self.database_path
    }

    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.conn.lock();

        // WAL reports the resulting mode as a row, so read it back
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(5_000))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS power_data (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp     TEXT NOT NULL,
                voltage_r     REAL NOT NULL DEFAULT 0.0,
                voltage_y     REAL NOT NULL DEFAULT 0.0,
                voltage_b     REAL NOT NULL DEFAULT 0.0,
                current_r     REAL NOT NULL DEFAULT 0.0,
                current_y     REAL NOT NULL DEFAULT 0.0,
                current_b     REAL NOT NULL DEFAULT 0.0,
                power_factor  REAL NOT NULL DEFAULT 1.0,
                thd           REAL NOT NULL DEFAULT 0.0,
                active_power  REAL NOT NULL DEFAULT 0.0
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_power_data_timestamp ON power_data(timestamp)",
            [],
        )?;

        Ok(())
    }

    fn insert(conn: &Connection, record: &PowerRecord) -> Result<(), PersistenceError> {
        conn.execute(
            "INSERT INTO power_data (
                timestamp, voltage_r, voltage_y, voltage_b,
                current_r, current_y, current_b,
                power_factor, thd, active_power
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.timestamp.to_rfc3339(),
                record.voltage.r,
                record.voltage.y,
                record.voltage.b,
                record.current.r,
                record.current.y,
                record.current.b,
                record.power_factor,
                record.thd,
                record.active_power,
            ],
        )
        .map_err(|e| PersistenceError::Write(e.to_string()))?;
        Ok(())
    }

    fn select_recent(conn: &Connection, limit: usize) -> Result<Vec<PowerRecord>, PersistenceError> {
        let mut stmt = conn.prepare(
            "SELECT timestamp, voltage_r, voltage_y, voltage_b,
                    current_r, current_y, current_b,
                    power_factor, thd, active_power
             FROM power_data
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], row_to_record)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        Ok(rows)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<PowerRecord> {
    let raw_timestamp: String = row.get(0)?;
    let timestamp = DateTime::parse_from_rfc3339(&raw_timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(PowerRecord {
        timestamp,
        voltage: ThreePhase {
            r: row.get(1)?,
            y: row.get(2)?,
            b: row.get(3)?,
        },
        current: ThreePhase {
            r: row.get(4)?,
            y: row.get(5)?,
            b: row.get(6)?,
        },
        power_factor: row.get(7)?,
        thd: row.get(8)?,
        active_power: row.get(9)?,
    })
}

#[async_trait]
impl PersistenceSink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn write(&self, record: PowerRecord) -> Result<(), PersistenceError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || Self::insert(&conn.lock(), &record))
            .await
            .map_err(|e| PersistenceError::Write(format!("write task failed: {}", e)))?
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PowerRecord>, PersistenceError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || Self::select_recent(&conn.lock(), limit))
            .await
            .map_err(|e| PersistenceError::Query(format!("query task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::ClassifiedSample;
    use chrono::Duration;

    #[tokio::test]
    async fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SqliteSink::open(dir.path().join("power.db")).unwrap();

        let start = Utc::now();
        let voltage = ClassifiedSample::ThreePhaseVoltage(ThreePhase {
            r: 230.5,
            y: 229.5,
            b: 231.0,
        });
        sink.write(PowerRecord::from_sample(&voltage, start).unwrap())
            .await
            .unwrap();
        sink.write(
            PowerRecord::from_sample(
                &ClassifiedSample::ActivePower { value: 1200.0 },
                start + Duration::seconds(5),
            )
            .unwrap(),
        )
        .await
        .unwrap();

        let recent = sink.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].active_power, 1200.0);
        assert_eq!(recent[0].power_factor, 1.0);
        assert_eq!(recent[1].voltage.r, 230.5);
        assert_eq!(recent[1].timestamp.timestamp(), start.timestamp());
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SqliteSink::open(dir.path().join("nested").join("power.db")).unwrap();
        for _ in 0..5 {
            sink.write(PowerRecord::empty(Utc::now())).await.unwrap();
        }
        assert_eq!(sink.recent(3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("power.db");
        {
            let sink = SqliteSink::open(&path).unwrap();
            sink.write(PowerRecord::empty(Utc::now())).await.unwrap();
        }
        let sink = SqliteSink::open(&path).unwrap();
        assert_eq!(sink.recent(10).await.unwrap().len(), 1);
    }
}
