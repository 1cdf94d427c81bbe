//! Contracts and their materialized instances
//!
//! A [`Contract`] is plain business logic. The emulator wraps each loaded
//! contract in a [`ContractInstance`], which carries the state the engine
//! stamps before every call:
//!
//! - whether the call is the root of its chain or nested inside another
//!   contract,
//! - the certificate identity of the simulated caller,
//! - the delegation path used when the logic calls another contract.
//!
//! Contract logic never mutates that state. It reads it, and reaches other
//! contracts, through the [`ContractContext`] handed to `invoke`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::identity::CertificateIdentity;
use crate::ledger::Ledger;
use crate::{Error, Result};

/// Routes a nested call `(contract_id, ledger, argument)` back to the engine
pub type NestedInvoker = Rc<dyn Fn(&str, &mut dyn Ledger, &Value) -> Result<Option<Value>>>;

/// Business logic of a contract
pub trait Contract {
    fn invoke(
        &self,
        ctx: &ContractContext<'_>,
        ledger: &mut dyn Ledger,
        argument: &Value,
        properties: Option<&Value>,
    ) -> Result<Option<Value>>;
}

impl<F> Contract for F
where
    F: Fn(&ContractContext<'_>, &mut dyn Ledger, &Value, Option<&Value>) -> Result<Option<Value>>,
{
    fn invoke(
        &self,
        ctx: &ContractContext<'_>,
        ledger: &mut dyn Ledger,
        argument: &Value,
        properties: Option<&Value>,
    ) -> Result<Option<Value>> {
        self(ctx, ledger, argument, properties)
    }
}

// ── Context ───────────────────────────────────────────────

/// What a running contract can see of its own invocation.
///
/// Role and identity are captured when the call starts, so a contract that
/// re-enters itself through a nested call still sees its own stamp.
pub struct ContractContext<'a> {
    instance: &'a ContractInstance,
    is_root: bool,
    identity: CertificateIdentity,
}

impl ContractContext<'_> {
    /// Id the running contract was registered under
    pub fn contract_id(&self) -> &str {
        &self.instance.id
    }

    /// `true` for the outermost call of a chain
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Certificate of the simulated caller
    pub fn certificate(&self) -> CertificateIdentity {
        self.identity.clone()
    }

    /// Invoke another registered contract from inside this one.
    ///
    /// The callee observes `is_root() == false` and the current identity.
    pub fn invoke_contract(
        &self,
        contract_id: &str,
        ledger: &mut dyn Ledger,
        argument: &Value,
    ) -> Result<Option<Value>> {
        let invoker = self
            .instance
            .nested_invoker
            .borrow()
            .clone()
            .ok_or(Error::EmulatorUnavailable)?;
        invoker(contract_id, ledger, argument)
    }
}

// ── Instance ──────────────────────────────────────────────

/// A materialized contract, owned by the engine's instance cache
pub struct ContractInstance {
    id: String,
    binary_name: String,
    logic: Box<dyn Contract>,
    properties: Option<Value>,
    is_root: Cell<bool>,
    identity: RefCell<CertificateIdentity>,
    nested_invoker: RefCell<Option<NestedInvoker>>,
}

impl ContractInstance {
    pub(crate) fn new(
        id: impl Into<String>,
        binary_name: impl Into<String>,
        logic: Box<dyn Contract>,
    ) -> Self {
        ContractInstance {
            id: id.into(),
            binary_name: binary_name.into(),
            logic,
            properties: None,
            is_root: Cell::new(true),
            identity: RefCell::new(CertificateIdentity::default()),
            nested_invoker: RefCell::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    /// Properties of the artifact this instance was loaded from
    pub fn properties(&self) -> Option<&Value> {
        self.properties.as_ref()
    }

    /// Role most recently stamped by the engine
    pub fn is_root_call(&self) -> bool {
        self.is_root.get()
    }

    /// Identity most recently stamped by the engine
    pub fn caller_identity(&self) -> CertificateIdentity {
        self.identity.borrow().clone()
    }

    /// Run the contract logic against `ledger`
    pub fn invoke(
        &self,
        ledger: &mut dyn Ledger,
        argument: &Value,
        properties: Option<&Value>,
    ) -> Result<Option<Value>> {
        let ctx = ContractContext {
            instance: self,
            is_root: self.is_root_call(),
            identity: self.caller_identity(),
        };
        self.logic.invoke(&ctx, ledger, argument, properties)
    }

    pub(crate) fn with_properties(mut self, properties: Option<Value>) -> Self {
        self.properties = properties;
        self
    }

    pub(crate) fn stamp(&self, is_root: bool, identity: CertificateIdentity) {
        self.is_root.set(is_root);
        *self.identity.borrow_mut() = identity;
    }

    pub(crate) fn set_root(&self, is_root: bool) {
        self.is_root.set(is_root);
    }

    pub(crate) fn set_nested_invoker(&self, invoker: NestedInvoker) {
        *self.nested_invoker.borrow_mut() = Some(invoker);
    }
}

impl fmt::Debug for ContractInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractInstance")
            .field("id", &self.id)
            .field("binary_name", &self.binary_name)
            .field("is_root", &self.is_root.get())
            .field("identity", &*self.identity.borrow())
            .field("wired", &self.nested_invoker.borrow().is_some())
            .finish()
    }
}
