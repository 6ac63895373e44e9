//! Schema migrations.
//!
//! Migrations run in order and are tracked in the `migrations` table.

use crate::error::StoreResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Runs all pending migrations.
pub(crate) fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version >= CURRENT_VERSION {
        debug!(current_version, "Schema up to date");
        return Ok(());
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_product_and_change_log(conn)?;
    }
    if current_version < 2 {
        migrate_v2_oauth_tokens(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: product table, change log, and the triggers feeding it.
///
/// Column order of `product` is the row-image order consumed by ingestion.
fn migrate_v1_product_and_change_log(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE product (
            uuid TEXT PRIMARY KEY NOT NULL,
            product_name TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0,
            price REAL NOT NULL,
            discount INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT,
            last_updated_by TEXT NOT NULL DEFAULT 'system'
        );

        CREATE TABLE change_log (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT NOT NULL,
            uuid TEXT,
            product_name TEXT,
            quantity INTEGER,
            price REAL,
            discount INTEGER,
            updated_at TEXT,
            last_updated_by TEXT
        );

        CREATE TRIGGER product_log_insert AFTER INSERT ON product
        BEGIN
            INSERT INTO change_log (action, uuid, product_name, quantity, price, discount, updated_at, last_updated_by)
            VALUES ('insert', NEW.uuid, NEW.product_name, NEW.quantity, NEW.price, NEW.discount, NEW.updated_at, NEW.last_updated_by);
        END;

        CREATE TRIGGER product_log_update AFTER UPDATE ON product
        BEGIN
            INSERT INTO change_log (action, uuid, product_name, quantity, price, discount, updated_at, last_updated_by)
            VALUES ('update', NEW.uuid, NEW.product_name, NEW.quantity, NEW.price, NEW.discount, NEW.updated_at, NEW.last_updated_by);
        END;

        CREATE TRIGGER product_log_delete AFTER DELETE ON product
        BEGIN
            INSERT INTO change_log (action, uuid, product_name, quantity, price, discount, updated_at, last_updated_by)
            VALUES ('delete', OLD.uuid, OLD.product_name, OLD.quantity, OLD.price, OLD.discount, OLD.updated_at, OLD.last_updated_by);
        END;
        ",
    )?;
    record_migration(conn, 1, "product_and_change_log")
}

/// V2: OAuth tokens for the mirror.
fn migrate_v2_oauth_tokens(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE oauth_tokens (
            user_email TEXT PRIMARY KEY NOT NULL,
            access_token TEXT NOT NULL,
            refresh_token TEXT NOT NULL DEFAULT '',
            token_type TEXT NOT NULL,
            expiry TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        ",
    )?;
    record_migration(conn, 2, "oauth_tokens")
}
