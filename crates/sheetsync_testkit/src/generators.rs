//! Property-based test generators using proptest.
//!
//! Provides strategies for generating products, mirror edits and store
//! operations that keep the row schema valid.

use proptest::prelude::*;
use sheetsync_protocol::{Attribution, CellValue, Field, FieldEdit, SENTINEL};
use sheetsync_store::{NewProduct, Store};

/// Strategy for generating product names.
pub fn product_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,23}").expect("Invalid regex")
}

/// Strategy for generating prices with two decimals.
pub fn price_strategy() -> impl Strategy<Value = f64> {
    (0u32..100_000).prop_map(|cents| f64::from(cents) / 100.0)
}

/// Strategy for generating new products.
pub fn new_product_strategy() -> impl Strategy<Value = NewProduct> {
    (product_name_strategy(), 0i64..10_000, price_strategy(), any::<bool>()).prop_map(
        |(name, quantity, price, discount)| NewProduct::new(name, quantity, price, discount),
    )
}

/// Strategy for generating editor identities, including empty ones.
pub fn actor_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just(String::new()),
        4 => prop::string::string_regex("[a-z]{1,8}@example\\.com").expect("Invalid regex"),
    ]
}

/// Strategy for generating identities that may claim the sync sentinel.
pub fn actor_or_sentinel_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => actor_strategy(),
        1 => Just(SENTINEL.to_string()),
    ]
}

/// Strategy for generating editable fields.
pub fn field_strategy() -> impl Strategy<Value = Field> {
    prop::sample::select(Field::ALL.to_vec())
}

/// Strategy for a typed value valid for `field`.
pub fn cell_value_strategy(field: Field) -> BoxedStrategy<CellValue> {
    match field {
        Field::ProductName => product_name_strategy().prop_map(CellValue::Text).boxed(),
        Field::Quantity => (0i64..10_000).prop_map(CellValue::Integer).boxed(),
        Field::Price => price_strategy().prop_map(CellValue::Float).boxed(),
        Field::Discount => any::<bool>().prop_map(CellValue::Bool).boxed(),
    }
}

/// Strategy for a field paired with a valid value.
pub fn field_value_strategy() -> impl Strategy<Value = (Field, CellValue)> {
    field_strategy().prop_flat_map(|field| cell_value_strategy(field).prop_map(move |v| (field, v)))
}

/// Strategy for mirror edits whose keys are drawn from `keys`.
///
/// Edits always resolve unless the actor is the sentinel.
pub fn field_edit_strategy(keys: Vec<String>) -> impl Strategy<Value = FieldEdit> {
    (
        prop::sample::select(keys),
        field_value_strategy(),
        actor_or_sentinel_strategy(),
    )
        .prop_map(|(key, (field, value), actor)| {
            FieldEdit::new(key, field.label(), value.to_json(), actor)
        })
}

/// Strategy for batches of mirror edits.
pub fn edit_batch_strategy(
    keys: Vec<String>,
    max_edits: usize,
) -> impl Strategy<Value = Vec<FieldEdit>> {
    prop::collection::vec(field_edit_strategy(keys), 1..max_edits.max(2))
}

/// A store mutation performed by a local writer.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Create a product.
    Create {
        /// Product to insert.
        product: NewProduct,
        /// Writer identity.
        actor: String,
    },
    /// Update one field of an existing product.
    Update {
        /// Index into the keys created so far.
        index: usize,
        /// Field to change.
        field: Field,
        /// New value.
        value: CellValue,
        /// Writer identity.
        actor: String,
    },
    /// Delete an existing product.
    Delete {
        /// Index into the keys created so far.
        index: usize,
    },
}

impl StoreOperation {
    /// Applies the operation, tracking live keys in `keys`.
    ///
    /// Index-based operations are skipped while `keys` is empty.
    pub fn apply(&self, store: &Store, keys: &mut Vec<String>) {
        match self {
            StoreOperation::Create { product, actor } => {
                let key = store
                    .create_product(product, &Attribution::from_actor(Some(actor)))
                    .expect("Failed to create product");
                keys.push(key);
            }
            StoreOperation::Update {
                index,
                field,
                value,
                actor,
            } => {
                if keys.is_empty() {
                    return;
                }
                let key = &keys[index % keys.len()];
                store
                    .update_product(
                        key,
                        &[(*field, value.clone())],
                        &Attribution::from_actor(Some(actor)),
                    )
                    .expect("Failed to update product");
            }
            StoreOperation::Delete { index } => {
                if keys.is_empty() {
                    return;
                }
                let key = keys.remove(index % keys.len());
                store.delete_product(&key).expect("Failed to delete product");
            }
        }
    }
}

/// Strategy for generating store operations.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        3 => (new_product_strategy(), actor_or_sentinel_strategy())
            .prop_map(|(product, actor)| StoreOperation::Create { product, actor }),
        3 => (any::<usize>(), field_value_strategy(), actor_or_sentinel_strategy())
            .prop_map(|(index, (field, value), actor)| StoreOperation::Update {
                index,
                field,
                value,
                actor,
            }),
        1 => any::<usize>().prop_map(|index| StoreOperation::Delete { index }),
    ]
}

/// Strategy for generating a sequence of store operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn product_name_starts_with_letter(name in product_name_strategy()) {
            let first = name.chars().next();
            prop_assert!(first.map_or(false, |c| c.is_ascii_alphabetic()));
        }

        #[test]
        fn generated_values_coerce_to_themselves((field, value) in field_value_strategy()) {
            prop_assert_eq!(field.coerce(&value.to_json()).unwrap(), value);
        }

        #[test]
        fn generated_edits_resolve_unless_sentinel(
            edit in field_edit_strategy(vec!["u-1".to_string(), "u-2".to_string()])
        ) {
            let resolved = edit.resolve();
            if edit.user_email == SENTINEL {
                prop_assert!(resolved.is_err());
            } else {
                prop_assert!(resolved.is_ok());
            }
        }

        #[test]
        fn operations_keep_store_consistent(ops in operation_sequence_strategy(1, 20)) {
            let store = Store::open_in_memory().unwrap();
            let mut keys = Vec::new();
            for op in &ops {
                op.apply(&store, &mut keys);
            }
            prop_assert_eq!(store.list_products().unwrap().len(), keys.len());
        }
    }
}
