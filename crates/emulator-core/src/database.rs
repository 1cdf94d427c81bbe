//! Mutable side-database used by functions
//!
//! Unlike the ledger, this store is not tamper-evident: values are
//! overwritten in place and can be deleted.

use std::collections::BTreeMap;

use serde_json::Value;

/// Address of a value in the side-database
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatabaseKey {
    pub namespace: String,
    pub table: String,
    pub key: String,
}

impl DatabaseKey {
    pub fn new(namespace: impl Into<String>, table: impl Into<String>, key: impl Into<String>) -> Self {
        DatabaseKey {
            namespace: namespace.into(),
            table: table.into(),
            key: key.into(),
        }
    }
}

/// Key-value store functions write to
pub trait MutableDatabase {
    fn get(&self, key: &DatabaseKey) -> Option<Value>;
    fn put(&mut self, key: DatabaseKey, value: Value);
    fn delete(&mut self, key: &DatabaseKey) -> Option<Value>;
}

/// In-memory side-database
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    records: BTreeMap<DatabaseKey, Value>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MutableDatabase for MemoryDatabase {
    fn get(&self, key: &DatabaseKey) -> Option<Value> {
        self.records.get(key).cloned()
    }

    fn put(&mut self, key: DatabaseKey, value: Value) {
        tracing::debug!(namespace = %key.namespace, table = %key.table, key = %key.key, "database put");
        self.records.insert(key, value);
    }

    fn delete(&mut self, key: &DatabaseKey) -> Option<Value> {
        self.records.remove(key)
    }
}
