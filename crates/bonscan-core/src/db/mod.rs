//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `receipts` - Receipt and item persistence
//! - `mappings` - Keyword-to-category mapping store and category stats
//!
//! The core never manages UI-level transactions; it exposes the operations
//! the scan pipeline needs (add/delete receipts, bulk mapping inserts) and
//! the surrounding layer decides what to persist and when to roll back.

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod mappings;
mod receipts;

pub use receipts::MAX_EXTRACTION_ATTEMPTS;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "BONSCAN_DB_KEY";

/// Derive the SQLCipher key from a passphrase using Argon2.
///
/// The salt is a fixed application constant, so a passphrase maps to the
/// same key no matter where the database file lives; users can move or
/// restore the file without re-keying.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database.
    const APP_SALT: &[u8; 16] = b"bonscan-salt-v1!";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite "YYYY-MM-DD HH:MM:SS" timestamp into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open an encrypted database, taking the passphrase from
    /// `BONSCAN_DB_KEY`. The SQLCipher key is derived via Argon2.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Open an unencrypted database. Meant for development and tests; real
    /// use goes through `new()` with `BONSCAN_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open a database with an explicit passphrase (or none)
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        // foreign_keys is connection-scoped in SQLite; the receipt delete
        // rollback relies on the item cascade, so every pooled connection
        // gets it (and the cipher key, when encrypting) at init.
        let pool = match passphrase {
            Some(pass) => {
                let key = derive_key(pass)?;
                let init = format!(
                    "PRAGMA key = 'x\"{}\"'; PRAGMA foreign_keys = ON;",
                    key
                );
                let manager = manager.with_init(move |conn| {
                    conn.execute_batch(&init)?;
                    Ok(())
                });
                Pool::builder().max_size(10).build(manager)?
            }
            None => {
                let manager = manager.with_init(|conn| {
                    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                    Ok(())
                });
                Pool::builder().max_size(10).build(manager)?
            }
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database for tests.
    ///
    /// Backed by a uniquely named temp file, not `:memory:`; SQLCipher
    /// and the connection pool disagree about in-memory databases.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/bonscan_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Whether encryption is active for this database
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        // An encrypted database answers PRAGMA cipher_version.
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL keeps readers from blocking the scan pipeline's writes
            PRAGMA journal_mode = WAL;

            -- ~8MB page cache
            PRAGMA cache_size = 2000;

            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Scanned receipts
            CREATE TABLE IF NOT EXISTS receipts (
                id INTEGER PRIMARY KEY,
                vendor TEXT NOT NULL,
                store_name TEXT NOT NULL,
                store_address TEXT,
                purchase_date DATE,
                total_amount REAL NOT NULL,
                total_method TEXT NOT NULL DEFAULT 'explicit',  -- explicit, calculated
                discrepancy BOOLEAN NOT NULL DEFAULT 0,
                tax_details TEXT,                          -- JSON: per-rate-class net/tax/gross
                content_hash TEXT UNIQUE,                  -- SHA256 of the raw OCR text
                ocr_text TEXT,                             -- raw OCR text, kept for re-extraction
                ai_attempts INTEGER NOT NULL DEFAULT 0,    -- AI re-extraction budget consumed
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_receipts_date ON receipts(purchase_date);
            CREATE INDEX IF NOT EXISTS idx_receipts_hash ON receipts(content_hash);
            CREATE INDEX IF NOT EXISTS idx_receipts_discrepancy ON receipts(discrepancy);

            -- Line items
            CREATE TABLE IF NOT EXISTS receipt_items (
                id INTEGER PRIMARY KEY,
                receipt_id INTEGER NOT NULL REFERENCES receipts(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                total_price REAL NOT NULL,
                quantity REAL,
                unit_price REAL,
                tax_class TEXT,
                source TEXT NOT NULL DEFAULT 'parser',     -- parser, ai
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_items_receipt ON receipt_items(receipt_id);
            CREATE INDEX IF NOT EXISTS idx_items_category ON receipt_items(category);

            -- Keyword-to-category mappings. The rowid is the insertion order,
            -- which the resolver uses as the substring-match tie-break.
            CREATE TABLE IF NOT EXISTS category_mappings (
                id INTEGER PRIMARY KEY,
                keyword TEXT NOT NULL,
                category TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT 'seed',       -- seed, user, ai
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_mappings_keyword ON category_mappings(keyword);

            -- Per-category item counters
            CREATE TABLE IF NOT EXISTS category_stats (
                category TEXT PRIMARY KEY,
                item_count INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
