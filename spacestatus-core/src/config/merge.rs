//! Recursive structural merge of configuration fragments

use toml::Value;

/// Deep-merge `overlay` onto `base`.
///
/// Nested tables are merged key by key, the overlay winning on
/// conflicts. Any other value kind in the overlay (scalars, arrays)
/// fully replaces the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Table(mut base), Value::Table(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Table(base)
        }
        (_, overlay) => overlay,
    }
}
