//! DuckDB offline queue store

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use duckdb::{params, params_from_iter, Connection};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{QueueEntry, QueuedTransaction, TransactionPayload};
use crate::migrations::MIGRATIONS;
use crate::ports::QueueStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// Open a DuckDB file, retrying with exponential backoff while another
/// process holds its lock
pub(crate) fn open_with_retry(db_path: &Path) -> anyhow::Result<Connection> {
    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        match try_open_connection(db_path) {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                // Alternate form keeps the DuckDB cause under the context
                let err_msg = format!("{:#}", e);
                if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    eprintln!(
                        "[cybervault] Database busy, retrying in {}ms (attempt {}/{}): {}",
                        delay.as_millis(),
                        attempt + 1,
                        MAX_RETRIES,
                        err_msg
                    );
                    thread::sleep(delay);
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| anyhow!("Failed to open {} after {} retries", db_path.display(), MAX_RETRIES)))
}

fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
    // Extension autoloading stays off; nothing here needs one
    let config = duckdb::Config::default().enable_autoload_extension(false)?;
    let conn = Connection::open_with_flags(db_path, config)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    Ok(conn)
}

enum Backing {
    /// Connection opened per operation and closed right after, so the file
    /// lock is only held while a statement runs. The mutex serialises
    /// operations within this process.
    File { path: PathBuf, guard: Mutex<()> },
    Memory(Mutex<Connection>),
}

/// Offline queue backed by a DuckDB file
///
/// Several `cv` processes share one queue file (a long-running `cv watch`
/// next to one-shot `cv submit` calls), so no connection outlives the
/// operation that opened it.
pub struct DuckDbQueueStore {
    backing: Backing,
}

impl DuckDbQueueStore {
    /// Open (or create) the queue database and bring its schema up to date
    ///
    /// Safe to call repeatedly on the same file: migrations are tracked, so a
    /// second open neither recreates the collection nor touches its rows.
    /// Fails when the file cannot be opened even after retrying.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let store = Self {
            backing: Backing::File {
                path: db_path.to_path_buf(),
                guard: Mutex::new(()),
            },
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// In-memory queue, for tests and throwaway sessions
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        let store = Self {
            backing: Backing::Memory(Mutex::new(conn)),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Run pending migrations
    pub fn ensure_schema(&self) -> anyhow::Result<MigrationResult> {
        match &self.backing {
            Backing::File { path, guard } => {
                let _guard = guard.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
                let conn = open_with_retry(path)?;
                MigrationService::new(&conn, MIGRATIONS).run_pending()
            }
            Backing::Memory(conn) => {
                let conn = conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
                MigrationService::new(&conn, MIGRATIONS).run_pending()
            }
        }
    }

    /// Path of the database file, if file-backed
    pub fn db_path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File { path, .. } => Some(path),
            Backing::Memory(_) => None,
        }
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        match &self.backing {
            Backing::File { path, guard } => {
                let _guard = guard
                    .lock()
                    .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))?;
                let conn = open_with_retry(path).map_err(|e| Error::storage(format!("{:#}", e)))?;
                f(&conn)
            }
            Backing::Memory(conn) => {
                let conn = conn
                    .lock()
                    .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))?;
                f(&conn)
            }
        }
    }
}

#[async_trait]
impl QueueStore for DuckDbQueueStore {
    async fn enqueue(&self, tx: &QueuedTransaction) -> Result<i64> {
        if tx.integrity_hash.is_empty() {
            return Err(Error::validation(
                "Refusing to queue a transaction without an integrity hash",
            ));
        }

        self.with_connection(|conn| {
            let seq: i64 = conn.query_row(
                "INSERT INTO sys_offline_queue (user_id, amount, tx_type, tx_timestamp, integrity_hash)
                 VALUES (?, ?, ?, ?, ?)
                 RETURNING seq",
                params![
                    &tx.user_id,
                    tx.payload.amount.to_string(),
                    &tx.payload.tx_type,
                    &tx.timestamp,
                    &tx.integrity_hash,
                ],
                |row| row.get(0),
            )?;
            Ok(seq)
        })
    }

    async fn drain_all(&self) -> Result<Vec<QueueEntry>> {
        self.with_connection(read_entries)
    }

    async fn remove(&self, seqs: &[i64]) -> Result<usize> {
        if seqs.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; seqs.len()].join(", ");
        let sql = format!(
            "DELETE FROM sys_offline_queue WHERE seq IN ({})",
            placeholders
        );

        self.with_connection(|conn| Ok(conn.execute(&sql, params_from_iter(seqs.iter()))?))
    }

    async fn clear(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM sys_offline_queue", [])?;
            Ok(())
        })
    }

    async fn len(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM sys_offline_queue", [], |row| row.get(0))?;
            Ok(count.max(0) as usize)
        })
    }
}

fn read_entries(conn: &Connection) -> Result<Vec<QueueEntry>> {
    let mut stmt = conn.prepare(
        "SELECT seq, user_id, amount, tx_type, tx_timestamp, integrity_hash
         FROM sys_offline_queue
         ORDER BY seq",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (seq, user_id, amount, tx_type, timestamp, integrity_hash) = row?;
        // Stored text was produced by Decimal::to_string, so this only
        // fails on a hand-edited database
        let amount = Decimal::from_str(&amount).map_err(|e| {
            Error::storage(format!("Corrupt amount in queue entry {}: {}", seq, e))
        })?;
        entries.push(QueueEntry {
            seq,
            transaction: QueuedTransaction {
                user_id,
                payload: TransactionPayload { amount, tx_type },
                timestamp,
                integrity_hash,
            },
        });
    }

    Ok(entries)
}
