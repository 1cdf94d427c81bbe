//! User-defined functions
//!
//! Functions run after a root contract and write to the mutable
//! side-database rather than the ledger. They are registered and loaded the
//! same way contracts are, but carry no identity stamp and cannot call
//! contracts.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::database::MutableDatabase;
use crate::loader::FunctionLoader;
use crate::registry::now_millis;
use crate::{Error, Result};

/// Business logic of a function
pub trait Function {
    fn invoke(
        &self,
        database: &mut dyn MutableDatabase,
        contract_argument: &Value,
        function_argument: Option<&Value>,
        contract_properties: Option<&Value>,
    ) -> Result<()>;
}

/// The stored form of a function
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionEntry {
    pub id: String,
    pub binary_name: String,
    pub code: Vec<u8>,
    pub registered_at: u64,
}

impl FunctionEntry {
    pub fn new(id: impl Into<String>, binary_name: impl Into<String>, code: Vec<u8>) -> Self {
        FunctionEntry {
            id: id.into(),
            binary_name: binary_name.into(),
            code,
            registered_at: now_millis(),
        }
    }
}

/// Insertion-ordered `id -> function entry` store
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: IndexMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, entry: FunctionEntry) {
        self.functions.insert(entry.id.clone(), entry);
    }

    pub fn unbind(&mut self, id: &str) {
        self.functions.shift_remove(id);
    }

    pub fn lookup(&self, id: &str) -> Option<&FunctionEntry> {
        self.functions.get(id)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Registers functions and hands out cached instances
pub struct FunctionManager {
    registry: FunctionRegistry,
    loader: FunctionLoader,
    cache: HashMap<String, Rc<dyn Function>>,
}

impl FunctionManager {
    pub fn new(loader: FunctionLoader) -> Self {
        FunctionManager {
            registry: FunctionRegistry::new(),
            loader,
            cache: HashMap::new(),
        }
    }

    /// Bind `entry`, replacing any function previously registered under its id.
    ///
    /// An already loaded instance stays cached.
    pub fn register(&mut self, entry: FunctionEntry) {
        tracing::debug!(function_id = %entry.id, binary_name = %entry.binary_name, "register function");
        if self.cache.contains_key(&entry.id) {
            tracing::warn!(function_id = %entry.id, "function re-registered after load; cached instance kept");
        }
        self.registry.bind(entry);
    }

    /// Symbols the loader can materialize, sorted
    pub fn symbols(&self) -> Vec<String> {
        self.loader.symbols().into_iter().map(str::to_string).collect()
    }

    pub fn get(&self, id: &str) -> Result<&FunctionEntry> {
        self.registry
            .lookup(id)
            .ok_or_else(|| Error::MissingFunction(id.to_string()))
    }

    pub fn get_instance(&mut self, id: &str) -> Result<Rc<dyn Function>> {
        if let Some(function) = self.cache.get(id) {
            return Ok(Rc::clone(function));
        }
        let entry = self.get(id)?;
        let function: Rc<dyn Function> = Rc::from(self.loader.load(&entry.binary_name, &entry.code)?);
        self.cache.insert(id.to_string(), Rc::clone(&function));
        Ok(function)
    }
}

impl Default for FunctionManager {
    fn default() -> Self {
        Self::new(FunctionLoader::with_builtins())
    }
}
