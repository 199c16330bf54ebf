use std::collections::HashMap;

use thiserror::Error;

use super::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("cannot assign index {index} of '{name}': value is a {found}, not an array")]
    NotAnArray {
        name: String,
        index: usize,
        found: &'static str,
    },
    #[error("cannot grow '{name}' to hold index {index}")]
    CapacityExceeded { name: String, index: usize },
}

/// Saved copy of every binding, taken before a function call.
#[derive(Debug, Clone, Default)]
pub struct Snapshot(HashMap<String, Value>);

/// Flat name → value mapping. One store is live per execution context.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    variables: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Binds `name`, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.variables.insert(name.into(), value)
    }

    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    /// Element `index` of array `name`; `Null` when absent or not an array.
    pub fn get_indexed(&self, name: &str, index: usize) -> Value {
        self.variables
            .get(name)
            .and_then(Value::as_array)
            .and_then(|items| items.get(index))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Assigns one array element, creating the array when `name` is unbound
    /// or null and padding with `Null` when `index` is past the end.
    pub fn set_indexed(&mut self, name: &str, index: usize, value: Value) -> Result<(), StoreError> {
        let slot = self
            .variables
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if matches!(slot, Value::Null) {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(items) => {
                if index >= items.len() {
                    let capacity_exceeded = || StoreError::CapacityExceeded {
                        name: name.to_string(),
                        index,
                    };
                    let len = index.checked_add(1).ok_or_else(capacity_exceeded)?;
                    items
                        .try_reserve(len - items.len())
                        .map_err(|_| capacity_exceeded())?;
                    items.resize(len, Value::Null);
                }
                items[index] = value;
                Ok(())
            }
            other => Err(StoreError::NotAnArray {
                name: name.to_string(),
                index,
                found: other.type_name(),
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.variables.clone())
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.variables = snapshot.0;
    }

    pub fn merge(&mut self, variables: HashMap<String, Value>) {
        self.variables.extend(variables);
    }

    pub fn clear(&mut self) {
        self.variables.clear();
    }

    pub fn to_map(&self) -> HashMap<String, Value> {
        self.variables.clone()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_get_unset() {
        let mut store = VariableStore::new();
        assert_eq!(store.set("x", Value::Number(1.0)), None);
        assert_eq!(store.set("x", Value::Number(2.0)), Some(Value::Number(1.0)));
        assert_eq!(store.get("x"), Some(&Value::Number(2.0)));
        assert_eq!(store.unset("x"), Some(Value::Number(2.0)));
        assert_eq!(store.get("x"), None);
    }

    #[test]
    fn test_set_indexed_creates_and_pads() {
        let mut store = VariableStore::new();
        store.set_indexed("list", 2, Value::from("c")).unwrap();
        assert_eq!(
            store.get("list"),
            Some(&Value::Array(vec![Value::Null, Value::Null, Value::from("c")]))
        );
        store.set_indexed("list", 0, Value::from("a")).unwrap();
        assert_eq!(store.get_indexed("list", 0), Value::from("a"));
        assert_eq!(store.get_indexed("list", 9), Value::Null);
    }

    #[test]
    fn test_set_indexed_on_scalar_fails() {
        let mut store = VariableStore::new();
        store.set("n", Value::Number(3.0));
        let result = store.set_indexed("n", 0, Value::Null);
        assert!(matches!(result, Err(StoreError::NotAnArray { found: "number", .. })));
    }

    #[test]
    fn test_set_indexed_past_usize_range_fails() {
        let mut store = VariableStore::new();
        let result = store.set_indexed("xs", usize::MAX, Value::Null);
        assert_eq!(
            result,
            Err(StoreError::CapacityExceeded {
                name: "xs".to_string(),
                index: usize::MAX,
            })
        );
        assert_eq!(store.get("xs"), Some(&Value::Array(vec![])));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut store = VariableStore::new();
        store.set("a", Value::Number(1.0));
        let snapshot = store.snapshot();
        store.set("a", Value::Number(99.0));
        store.set("temp", Value::Boolean(true));
        store.restore(snapshot);
        assert_eq!(store.get("a"), Some(&Value::Number(1.0)));
        assert!(!store.contains("temp"));
    }
}
