//! Database schema migrations for the SQLite ledger.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, SystemClock.now_secs() as i64],
            )?;
        }

        tx.commit()?;
        tracing::debug!(version = CURRENT_VERSION, "ledger schema migrated");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: evidence log.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Evidence records, one row per committed append
        CREATE TABLE evidence (
            sequence_id INTEGER PRIMARY KEY,  -- dense, assigned at commit
            locator TEXT NOT NULL,            -- opaque content locator
            fingerprint TEXT NOT NULL         -- lowercase SHA-256 hex
                CHECK (length(fingerprint) = 64),
            submitter TEXT NOT NULL,          -- identity of the writer
            recorded_at INTEGER NOT NULL      -- commit time (Unix seconds)
        );

        CREATE INDEX idx_evidence_fingerprint ON evidence(fingerprint);
        CREATE INDEX idx_evidence_submitter ON evidence(submitter);

        -- Committed records are immutable
        CREATE TRIGGER evidence_no_update BEFORE UPDATE ON evidence
        BEGIN
            SELECT RAISE(ABORT, 'evidence is append-only');
        END;

        CREATE TRIGGER evidence_no_delete BEFORE DELETE ON evidence
        BEGIN
            SELECT RAISE(ABORT, 'evidence is append-only');
        END;
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"evidence".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_evidence_rows_are_immutable() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO evidence (sequence_id, locator, fingerprint, submitter, recorded_at)
             VALUES (0, 'loc', ?1, 'alice', 1)",
            rusqlite::params!["a".repeat(64)],
        )
        .unwrap();

        assert!(conn
            .execute("UPDATE evidence SET locator = 'other' WHERE sequence_id = 0", [])
            .is_err());
        assert!(conn
            .execute("DELETE FROM evidence WHERE sequence_id = 0", [])
            .is_err());
    }

    #[test]
    fn test_rejects_newer_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, 0)",
            rusqlite::params![CURRENT_VERSION + 1],
        )
        .unwrap();
        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
