// SPDX-License-Identifier: Apache-2.0

use crate::error::StoreError;
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// Embedded migrations, applied in order. Entries are append-only; editing
/// an already-shipped file changes its checksum and startup will refuse the
/// database.
const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_init.sql", include_str!("migrations/0001_init.sql")),
    (
        "0002_github_identity.sql",
        include_str!("migrations/0002_github_identity.sql"),
    ),
    (
        "0003_program_proposals.sql",
        include_str!("migrations/0003_program_proposals.sql"),
    ),
];

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Opens (creating if needed) the database, sets connection pragmas, and
/// brings the schema up to date.
pub fn open(path: &Path) -> Result<Connection, StoreError> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

/// In-memory database with the full schema, for tests.
pub fn open_in_memory() -> Result<Connection, StoreError> {
    let mut conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

/// Applies pending migrations and returns how many ran. Already-applied
/// migrations are re-verified against their recorded checksum; drift is a
/// hard error, not a warning, because it means the embedded SQL no longer
/// matches what shaped the database on disk.
pub fn apply_migrations(conn: &mut Connection) -> Result<usize, StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migrations (
             name TEXT PRIMARY KEY,
             checksum TEXT NOT NULL,
             applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
         );",
    )?;

    let mut applied = 0usize;
    for &(name, sql) in MIGRATIONS {
        let checksum = sha256_hex(sql.as_bytes());
        let recorded: Option<String> = conn
            .query_row(
                "SELECT checksum FROM migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        match recorded {
            Some(stored) if stored == checksum => continue,
            Some(stored) => {
                return Err(StoreError::Backend(format!(
                    "migration {name} checksum drift: recorded {stored}, embedded {checksum}"
                )));
            }
            None => {
                let tx = conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO migrations (name, checksum) VALUES (?1, ?2)",
                    [name, checksum.as_str()],
                )?;
                tx.commit()?;
                info!(migration = name, "applied migration");
                applied += 1;
            }
        }
    }
    Ok(applied)
}

/// Cheap liveness probe for the health endpoint.
pub fn ping(conn: &Connection) -> Result<(), StoreError> {
    conn.query_row("SELECT 1", [], |_| Ok(()))?;
    Ok(())
}
