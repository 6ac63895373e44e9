//! The store handle.

use crate::changelog::{self, ChangeRecord};
use crate::error::StoreResult;
use crate::migrations::run_migrations;
use crate::tokens::{self, OAuthToken, StoredToken};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use sheetsync_protocol::{Attribution, CellValue, Field, ProductRow, ResolvedEdit, SyncPosition};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Timestamp format matching SQLite's `CURRENT_TIMESTAMP`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A product to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    /// Explicit key. Generated when `None`.
    pub uuid: Option<String>,
    /// Display name.
    pub product_name: String,
    /// Stock count.
    pub quantity: i64,
    /// Unit price.
    pub price: f64,
    /// Discount flag.
    pub discount: bool,
}

impl NewProduct {
    /// Creates a product with a generated key.
    pub fn new(product_name: impl Into<String>, quantity: i64, price: f64, discount: bool) -> Self {
        Self {
            uuid: None,
            product_name: product_name.into(),
            quantity,
            price,
            discount,
        }
    }

    /// Sets an explicit key.
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }
}

/// The authoritative store.
///
/// All access goes through one connection guarded by a mutex, so the handle
/// can be shared across threads behind an `Arc`.
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Opens or creates a database file and runs migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!(path = %path.display(), "Opening store");
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Returns the database path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ========================================================================
    // Change log
    // ========================================================================

    /// Returns the current head of the change log.
    pub fn current_position(&self) -> StoreResult<SyncPosition> {
        changelog::current_position(&self.conn.lock())
    }

    /// Returns up to `limit` change records after `offset`, in commit order.
    pub fn changes_since(&self, offset: u64, limit: usize) -> StoreResult<Vec<ChangeRecord>> {
        changelog::changes_since(&self.conn.lock(), offset, limit)
    }

    // ========================================================================
    // Products
    // ========================================================================

    /// Lists all products in insertion order.
    pub fn list_products(&self) -> StoreResult<Vec<ProductRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT uuid, product_name, quantity, price, discount, updated_at, last_updated_by
             FROM product ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], product_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Gets one product by key.
    pub fn get_product(&self, uuid: &str) -> StoreResult<Option<ProductRow>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT uuid, product_name, quantity, price, discount, updated_at, last_updated_by
                 FROM product WHERE uuid = ?1",
                params![uuid],
                product_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Inserts a product and returns its key.
    pub fn create_product(&self, product: &NewProduct, actor: &Attribution) -> StoreResult<String> {
        let uuid = match &product.uuid {
            Some(uuid) => uuid.clone(),
            None => generate_key(),
        };
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO product (uuid, product_name, quantity, price, discount, updated_at, last_updated_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uuid,
                product.product_name,
                product.quantity,
                product.price,
                product.discount,
                now_timestamp(),
                actor.as_str(),
            ],
        )?;
        debug!(uuid = %uuid, actor = %actor, "Product created");
        Ok(uuid)
    }

    /// Updates the given fields of a product in one statement.
    ///
    /// Returns `false` if no product has that key.
    pub fn update_product(
        &self,
        uuid: &str,
        changes: &[(Field, CellValue)],
        actor: &Attribution,
    ) -> StoreResult<bool> {
        if changes.is_empty() {
            return Ok(self.get_product(uuid)?.is_some());
        }

        let mut assignments = Vec::with_capacity(changes.len() + 2);
        let mut values = Vec::with_capacity(changes.len() + 3);
        for (field, value) in changes {
            assignments.push(format!("{} = ?{}", field.column().name(), values.len() + 1));
            values.push(sql_value(value));
        }
        assignments.push(format!("last_updated_by = ?{}", values.len() + 1));
        values.push(Value::Text(actor.as_str().to_string()));
        assignments.push(format!("updated_at = ?{}", values.len() + 1));
        values.push(Value::Text(now_timestamp()));
        let sql = format!(
            "UPDATE product SET {} WHERE uuid = ?{}",
            assignments.join(", "),
            values.len() + 1
        );
        values.push(Value::Text(uuid.to_string()));

        let conn = self.conn.lock();
        let affected = conn.execute(&sql, params_from_iter(values))?;
        Ok(affected > 0)
    }

    /// Deletes a product. Returns `false` if it did not exist.
    pub fn delete_product(&self, uuid: &str) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let affected = conn.execute("DELETE FROM product WHERE uuid = ?1", params![uuid])?;
        Ok(affected > 0)
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    /// Stores or refreshes the token for an account.
    pub fn upsert_token(&self, user_email: &str, token: &OAuthToken) -> StoreResult<()> {
        tokens::upsert_token(&self.conn.lock(), user_email, token, Utc::now())
    }

    /// Returns the most recently stored token.
    pub fn latest_token(&self) -> StoreResult<Option<StoredToken>> {
        tokens::latest_token(&self.conn.lock())
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Executes a function within a transaction.
    ///
    /// If the function returns `Ok`, the transaction is committed.
    /// If it returns `Err`, or the commit fails, the transaction is rolled back.
    pub fn transaction<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&EditTransaction<'_>) -> StoreResult<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let out = f(&EditTransaction { tx: &tx })?;
        tx.commit()?;
        Ok(out)
    }
}

/// Write access inside a store transaction.
pub struct EditTransaction<'a> {
    tx: &'a rusqlite::Transaction<'a>,
}

impl EditTransaction<'_> {
    /// Writes one field of one row, creating the row if needed.
    ///
    /// New rows get placeholder values for the other required columns.
    /// The edit's actor is recorded as `last_updated_by`.
    pub fn upsert_field(&self, edit: &ResolvedEdit) -> StoreResult<()> {
        let sql = upsert_sql(edit.field);
        let mut stmt = self.tx.prepare_cached(sql)?;
        stmt.execute(params![
            edit.key,
            sql_value(&edit.value),
            edit.actor.as_str(),
            now_timestamp(),
        ])?;
        Ok(())
    }
}

/// Static upsert statement per editable field.
fn upsert_sql(field: Field) -> &'static str {
    match field {
        Field::ProductName => {
            "INSERT INTO product (uuid, product_name, price, last_updated_by, updated_at)
             VALUES (?1, ?2, 0.0, ?3, ?4)
             ON CONFLICT(uuid) DO UPDATE SET
                 product_name = excluded.product_name,
                 last_updated_by = excluded.last_updated_by,
                 updated_at = excluded.updated_at"
        }
        Field::Quantity => {
            "INSERT INTO product (uuid, quantity, product_name, price, last_updated_by, updated_at)
             VALUES (?1, ?2, 'New Product', 0.0, ?3, ?4)
             ON CONFLICT(uuid) DO UPDATE SET
                 quantity = excluded.quantity,
                 last_updated_by = excluded.last_updated_by,
                 updated_at = excluded.updated_at"
        }
        Field::Price => {
            "INSERT INTO product (uuid, price, product_name, last_updated_by, updated_at)
             VALUES (?1, ?2, 'New Product', ?3, ?4)
             ON CONFLICT(uuid) DO UPDATE SET
                 price = excluded.price,
                 last_updated_by = excluded.last_updated_by,
                 updated_at = excluded.updated_at"
        }
        Field::Discount => {
            "INSERT INTO product (uuid, discount, product_name, price, last_updated_by, updated_at)
             VALUES (?1, ?2, 'New Product', 0.0, ?3, ?4)
             ON CONFLICT(uuid) DO UPDATE SET
                 discount = excluded.discount,
                 last_updated_by = excluded.last_updated_by,
                 updated_at = excluded.updated_at"
        }
    }
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        uuid: row.get(0)?,
        product_name: row.get(1)?,
        quantity: row.get(2)?,
        price: row.get(3)?,
        discount: row.get::<_, i64>(4)? != 0,
        updated_at: row.get(5)?,
        last_updated_by: row.get(6)?,
    })
}

fn sql_value(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Integer(i64::from(*b)),
        CellValue::Integer(i) => Value::Integer(*i),
        CellValue::Float(f) => Value::Real(*f),
        CellValue::Text(s) => Value::Text(s.clone()),
    }
}

fn generate_key() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("u-{}", &id[..8])
}

fn now_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}
