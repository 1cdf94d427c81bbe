//! Contract loader: turns artifact code into contract logic
//!
//! Contracts are native Rust types known at build time. An artifact's code
//! is a small descriptor naming the factory to use:
//!
//! ```text
//! native:<binary_name>
//! ```
//!
//! The descriptor must name the same symbol the artifact was registered
//! with, so a renamed or mismatched artifact fails to load instead of
//! silently running different logic.

use std::collections::BTreeMap;

use crate::builtin;
use crate::contract::Contract;
use crate::function::Function;
use crate::{Error, Result};

/// Prefix every loadable descriptor starts with
pub const NATIVE_MARKER: &str = "native:";

/// Creates fresh contract logic
pub type ContractFactory = fn() -> Box<dyn Contract>;

/// Creates fresh function logic
pub type FunctionFactory = fn() -> Box<dyn Function>;

/// Decode a descriptor and check it names `binary_name`.
///
/// Returns the symbol on success.
pub fn parse_descriptor<'a>(binary_name: &str, code: &'a [u8]) -> Result<&'a str> {
    let text = std::str::from_utf8(code)
        .map_err(|e| Error::transformation(binary_name, format!("code is not UTF-8: {}", e)))?;

    let symbol = text.trim().strip_prefix(NATIVE_MARKER).ok_or_else(|| {
        Error::transformation(
            binary_name,
            format!("code does not start with '{}'", NATIVE_MARKER),
        )
    })?;

    let symbol = symbol.trim();
    if symbol != binary_name {
        return Err(Error::transformation(
            binary_name,
            format!("code declares '{}'", symbol),
        ));
    }
    Ok(symbol)
}

/// Build the descriptor that loads `binary_name`
pub fn descriptor(binary_name: &str) -> Vec<u8> {
    format!("{}{}", NATIVE_MARKER, binary_name).into_bytes()
}

// ── Contract Loader ───────────────────────────────────────

/// Build-time table of contract factories keyed by binary name
#[derive(Debug, Clone, Default)]
pub struct ContractLoader {
    factories: BTreeMap<String, ContractFactory>,
}

impl ContractLoader {
    /// An empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader that knows the built-in `get`, `put` and `scan` contracts
    pub fn with_builtins() -> Self {
        let mut loader = Self::new();
        loader.register(builtin::GET_CONTRACT, || Box::new(builtin::GetContract));
        loader.register(builtin::PUT_CONTRACT, || Box::new(builtin::PutContract));
        loader.register(builtin::SCAN_CONTRACT, || Box::new(builtin::ScanContract));
        loader
    }

    pub fn register(&mut self, symbol: impl Into<String>, factory: ContractFactory) {
        self.factories.insert(symbol.into(), factory);
    }

    /// Materialize contract logic from an artifact's code
    pub fn load(&self, binary_name: &str, code: &[u8]) -> Result<Box<dyn Contract>> {
        let symbol = parse_descriptor(binary_name, code)?;
        let factory = self.factories.get(symbol).ok_or_else(|| {
            Error::transformation(binary_name, format!("unknown contract symbol '{}'", symbol))
        })?;
        Ok(factory())
    }

    /// Known symbols, sorted
    pub fn symbols(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

// ── Function Loader ───────────────────────────────────────

/// Build-time table of function factories keyed by binary name
#[derive(Debug, Clone, Default)]
pub struct FunctionLoader {
    factories: BTreeMap<String, FunctionFactory>,
}

impl FunctionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut loader = Self::new();
        loader.register(builtin::STATE_UPDATER_FUNCTION, || {
            Box::new(builtin::StateUpdater)
        });
        loader
    }

    pub fn register(&mut self, symbol: impl Into<String>, factory: FunctionFactory) {
        self.factories.insert(symbol.into(), factory);
    }

    pub fn load(&self, binary_name: &str, code: &[u8]) -> Result<Box<dyn Function>> {
        let symbol = parse_descriptor(binary_name, code)?;
        let factory = self.factories.get(symbol).ok_or_else(|| {
            Error::transformation(binary_name, format!("unknown function symbol '{}'", symbol))
        })?;
        Ok(factory())
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
