//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use sheetsync_protocol::{Attribution, ChangeAction, ColumnValue, RowChange, WATCHED_TABLE};
use sheetsync_store::{NewProduct, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A small product catalog used by scenario helpers.
pub const CATALOG: [(&str, i64, f64, bool); 4] = [
    ("Keyboard", 12, 49.9, false),
    ("Mouse", 40, 19.5, true),
    ("Monitor", 5, 229.0, false),
    ("Headset", 0, 89.99, true),
];

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The shared store handle.
    pub store: Arc<Store>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(Store::open_in_memory().expect("Failed to open in-memory store")),
            _temp_dir: None,
        }
    }

    /// Creates a new file-backed test store.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Store::open(temp_dir.path().join("sheetsync.db"))
            .expect("Failed to open file store");
        Self {
            store: Arc::new(store),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database path if file-backed, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.store.path().map(PathBuf::from)
    }

    /// Returns a clone of the shared handle.
    pub fn handle(&self) -> Arc<Store> {
        self.store.clone()
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust,ignore
/// use sheetsync_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|store| {
///         let keys = seed_catalog(store);
///         // ... test operations
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a temporary file-backed store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store, &std::path::Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("File store should have a path");
    f(&test_store.store, &path)
}

/// Inserts [`CATALOG`] as the system actor and returns the generated keys.
pub fn seed_catalog(store: &Store) -> Vec<String> {
    CATALOG
        .iter()
        .map(|(name, quantity, price, discount)| {
            store
                .create_product(
                    &NewProduct::new(*name, *quantity, *price, *discount),
                    &Attribution::system(),
                )
                .expect("Failed to seed product")
        })
        .collect()
}

/// Builds a full `product` row image in column order.
pub fn product_image(
    uuid: &str,
    name: &str,
    quantity: i64,
    price: f64,
    discount: bool,
    actor: &str,
) -> Vec<ColumnValue> {
    vec![
        ColumnValue::Text(uuid.to_string()),
        ColumnValue::Text(name.to_string()),
        ColumnValue::Integer(quantity),
        ColumnValue::Real(price),
        ColumnValue::Integer(i64::from(discount)),
        ColumnValue::Text("2024-01-01 00:00:00".to_string()),
        ColumnValue::Text(actor.to_string()),
    ]
}

/// A replication record for the watched table.
pub fn product_change(action: ChangeAction, image: Vec<ColumnValue>) -> RowChange {
    RowChange::new(WATCHED_TABLE, action, image)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a store with `count` generated products.
    pub fn populated_store(count: usize) -> (TestStore, Vec<String>) {
        let test_store = TestStore::memory();
        let keys = (0..count)
            .map(|i| {
                test_store
                    .create_product(
                        &NewProduct::new(format!("Item {i}"), i as i64, 1.0 + i as f64, i % 2 == 0),
                        &Attribution::system(),
                    )
                    .expect("Failed to create product")
            })
            .collect();
        (test_store, keys)
    }

    /// Creates a store seeded with [`CATALOG`].
    pub fn catalog_store() -> (TestStore, Vec<String>) {
        let test_store = TestStore::memory();
        let keys = seed_catalog(&test_store);
        (test_store, keys)
    }
}
