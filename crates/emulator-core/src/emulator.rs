//! Emulation engine: registration, loading, stamping and nested dispatch
//!
//! # Call flow
//!
//! ```text
//! register ──▶ ContractRegistry
//!                   │ lookup (first get_instance only)
//!                   ▼
//! get_instance ─▶ ContractLoader ─▶ ContractInstance ─▶ instance cache
//!      │                                 ▲
//!      │ stamp is_root = true,           │ nested invoker (Weak → engine)
//!      │       identity = current        │
//!      ▼                                 │
//!   invoke ──▶ contract logic ──▶ ctx.invoke_contract(id, ..)
//!                                        │
//!                                        ▼
//!                         get_instance(id), then is_root = false
//! ```
//!
//! # Stamping rules
//!
//! - Every `get_instance` re-stamps the instance, cache hit or not, with
//!   `is_root = true` and the identity current at that moment.
//! - A nested call goes through the same `get_instance` and then overwrites
//!   the callee's role with `is_root = false` before invoking it.
//! - Instances are materialized once per id and never evicted.
//!
//! # Threading
//!
//! Engine state lives behind `Rc`/`RefCell`; an [`Emulator`] is confined to
//! the thread that created it. Run one emulator per test for isolation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::builtin::BUILTIN_CONTRACTS;
use crate::contract::{ContractInstance, NestedInvoker};
use crate::database::MutableDatabase;
use crate::function::{FunctionEntry, FunctionManager};
use crate::identity::CertificateIdentity;
use crate::ledger::Ledger;
use crate::loader::{descriptor, ContractLoader, FunctionLoader};
use crate::registry::{ContractArtifact, ContractRegistry};
use crate::{Error, Result};

/// Argument field listing functions to run after the root contract
pub const FUNCTIONS_ATTRIBUTE: &str = "_functions_";

struct EmulatorState {
    registry: RefCell<ContractRegistry>,
    cache: RefCell<HashMap<String, Rc<ContractInstance>>>,
    certificate: RefCell<CertificateIdentity>,
    loader: ContractLoader,
    functions: RefCell<FunctionManager>,
}

impl EmulatorState {
    fn get_instance(self: &Rc<Self>, id: &str) -> Result<Rc<ContractInstance>> {
        let cached = self.cache.borrow().get(id).cloned();
        let instance = match cached {
            Some(instance) => {
                tracing::debug!(contract_id = id, "instance cache hit");
                instance
            }
            None => {
                let instance = Rc::new(self.materialize(id)?);
                self.cache
                    .borrow_mut()
                    .insert(id.to_string(), Rc::clone(&instance));
                instance
            }
        };

        let certificate = self.certificate.borrow().clone();
        tracing::debug!(contract_id = id, certificate = %certificate, "stamp root call");
        instance.stamp(true, certificate);
        Ok(instance)
    }

    fn materialize(self: &Rc<Self>, id: &str) -> Result<ContractInstance> {
        let (binary_name, code, properties) = {
            let registry = self.registry.borrow();
            let artifact = registry.lookup(id)?;
            (
                artifact.binary_name.clone(),
                artifact.code.clone(),
                artifact.properties.clone(),
            )
        };

        let logic = self.loader.load(&binary_name, &code)?;
        let instance =
            ContractInstance::new(id, binary_name.as_str(), logic).with_properties(properties);
        instance.set_nested_invoker(self.nested_invoker());
        tracing::debug!(contract_id = id, binary_name = %binary_name, "materialized contract");
        Ok(instance)
    }

    /// Delegation path handed to every loaded contract
    fn nested_invoker(self: &Rc<Self>) -> NestedInvoker {
        let engine: Weak<EmulatorState> = Rc::downgrade(self);
        Rc::new(
            move |id: &str, ledger: &mut dyn Ledger, argument: &Value| -> Result<Option<Value>> {
                let engine = engine.upgrade().ok_or(Error::EmulatorUnavailable)?;
                engine.invoke_nested(id, ledger, argument)
            },
        )
    }

    fn invoke_nested(
        self: &Rc<Self>,
        id: &str,
        ledger: &mut dyn Ledger,
        argument: &Value,
    ) -> Result<Option<Value>> {
        let callee = self.get_instance(id)?;
        callee.set_root(false);
        tracing::debug!(contract_id = id, "nested invocation");

        callee.invoke(ledger, argument, callee.properties())
    }
}

/// The contract emulator
#[derive(Clone)]
pub struct Emulator {
    state: Rc<EmulatorState>,
}

impl Emulator {
    /// An emulator that can load whatever `loader` knows, with no contracts registered
    pub fn new(loader: ContractLoader) -> Self {
        Self::with_function_loader(loader, FunctionLoader::new())
    }

    pub fn with_function_loader(loader: ContractLoader, functions: FunctionLoader) -> Self {
        Emulator {
            state: Rc::new(EmulatorState {
                registry: RefCell::new(ContractRegistry::new()),
                cache: RefCell::new(HashMap::new()),
                certificate: RefCell::new(CertificateIdentity::default()),
                loader,
                functions: RefCell::new(FunctionManager::new(functions)),
            }),
        }
    }

    /// An emulator with `get`, `put` and `scan` registered and the built-in
    /// functions loadable
    pub fn with_builtins() -> Self {
        let emulator = Self::with_function_loader(
            ContractLoader::with_builtins(),
            FunctionLoader::with_builtins(),
        );
        for (id, binary_name) in BUILTIN_CONTRACTS {
            emulator.register_code(id, binary_name, descriptor(binary_name), None);
        }
        emulator
    }

    // ── Registration ──────────────────────────────────────

    /// Register the contract whose code is stored at `path`
    pub fn register(
        &self,
        id: &str,
        binary_name: &str,
        path: impl AsRef<Path>,
        properties: Option<Value>,
    ) -> Result<()> {
        let code = std::fs::read(path.as_ref()).map_err(|source| Error::RegistryIo {
            id: id.to_string(),
            source,
        })?;
        self.register_code(id, binary_name, code, properties);
        Ok(())
    }

    /// Register a contract from in-memory code
    pub fn register_code(
        &self,
        id: &str,
        binary_name: &str,
        code: Vec<u8>,
        properties: Option<Value>,
    ) {
        self.register_artifact(ContractArtifact::new(id, binary_name, code, properties));
    }

    /// Bind a prebuilt artifact, replacing any artifact under the same id
    pub fn register_artifact(&self, artifact: ContractArtifact) {
        tracing::debug!(
            contract_id = %artifact.id,
            binary_name = %artifact.binary_name,
            digest = %artifact.code_digest(),
            "register contract"
        );
        if self.state.cache.borrow().contains_key(&artifact.id) {
            tracing::warn!(
                contract_id = %artifact.id,
                "contract re-registered after load; cached instance keeps running the earlier code"
            );
        }
        self.state.registry.borrow_mut().bind(artifact);
    }

    pub fn get(&self, id: &str) -> Result<ContractArtifact> {
        self.state.registry.borrow().lookup(id).cloned()
    }

    /// Registered artifacts in registration order
    pub fn scan(&self) -> Vec<ContractArtifact> {
        self.state.registry.borrow().scan()
    }

    // ── Instances ─────────────────────────────────────────

    /// Materialized, freshly stamped instance of contract `id`
    pub fn get_instance(&self, id: &str) -> Result<Rc<ContractInstance>> {
        self.state.get_instance(id)
    }

    /// Symbols the contract loader can materialize
    pub fn loadable_contracts(&self) -> Vec<String> {
        self.state
            .loader
            .symbols()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Symbols the function loader can materialize
    pub fn loadable_functions(&self) -> Vec<String> {
        self.state.functions.borrow().symbols()
    }

    // ── Identity ──────────────────────────────────────────

    pub fn certificate(&self) -> CertificateIdentity {
        self.state.certificate.borrow().clone()
    }

    /// Replace the identity stamped on every subsequent call
    pub fn set_certificate(&self, certificate: CertificateIdentity) {
        tracing::info!(certificate = %certificate, "emulated certificate changed");
        *self.state.certificate.borrow_mut() = certificate;
    }

    pub fn set_identity(&self, holder_id: &str, version: i32) {
        self.set_certificate(CertificateIdentity::new(holder_id, version));
    }

    // ── Functions ─────────────────────────────────────────

    /// Register the function whose code is stored at `path`
    pub fn register_function(
        &self,
        id: &str,
        binary_name: &str,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let code = std::fs::read(path.as_ref()).map_err(|source| Error::RegistryIo {
            id: id.to_string(),
            source,
        })?;
        self.register_function_code(id, binary_name, code);
        Ok(())
    }

    pub fn register_function_code(&self, id: &str, binary_name: &str, code: Vec<u8>) {
        self.state
            .functions
            .borrow_mut()
            .register(FunctionEntry::new(id, binary_name, code));
    }

    // ── Execution ─────────────────────────────────────────

    /// Run contract `id` as a root call, then every function listed in the
    /// argument's `_functions_` array.
    ///
    /// Both receive the properties of the artifact the instance was loaded
    /// from.
    pub fn execute(
        &self,
        id: &str,
        ledger: &mut dyn Ledger,
        database: &mut dyn MutableDatabase,
        argument: &Value,
        function_argument: Option<&Value>,
    ) -> Result<Option<Value>> {
        let instance = self.get_instance(id)?;
        let properties = instance.properties();
        let result = instance.invoke(ledger, argument, properties)?;

        let Some(function_ids) = argument.get(FUNCTIONS_ATTRIBUTE) else {
            return Ok(result);
        };
        let function_ids = function_ids.as_array().ok_or_else(|| {
            Error::ContractContext(format!("{} must be an array", FUNCTIONS_ATTRIBUTE))
        })?;
        for function_id in function_ids {
            let function_id = function_id.as_str().ok_or_else(|| {
                Error::ContractContext(format!("{} must contain strings", FUNCTIONS_ATTRIBUTE))
            })?;
            let function = self.state.functions.borrow_mut().get_instance(function_id)?;
            tracing::debug!(function_id, contract_id = id, "invoke function");
            function.invoke(database, argument, function_argument, properties)?;
        }
        Ok(result)
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for Emulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("contracts", &self.state.registry.borrow().len())
            .field("loaded", &self.state.cache.borrow().len())
            .field("certificate", &*self.state.certificate.borrow())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────
