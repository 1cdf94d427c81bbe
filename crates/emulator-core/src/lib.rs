//! Emulator Core - in-process contract emulation for tests
//!
//! Registers contracts, materializes them once, and runs them against an
//! in-memory ledger while emulating the caller's certificate and whether a
//! call is the root of its chain or nested inside another contract.
//!
//! # Architecture
//!
//! ```text
//! register → ContractRegistry
//!                 ↓
//! get_instance → ContractLoader → ContractInstance (cached, stamped)
//!                                      ↓
//!                                  Contract logic → AssetLedger
//!                                      ↓
//!                       ctx.invoke_contract → Emulator (nested, is_root = false)
//! ```
//!
//! # Guarantees
//!
//! - **Single load**: one instance per contract id for the emulator's lifetime
//! - **Fresh stamp**: role and identity are rewritten before every call
//! - **Isolated**: each [`Emulator`] owns its registry, cache and identity

pub mod builtin;
pub mod contract;
pub mod database;
pub mod emulator;
pub mod error;
pub mod function;
pub mod identity;
pub mod ledger;
pub mod loader;
pub mod registry;

pub use contract::{Contract, ContractContext, ContractInstance};
pub use database::{DatabaseKey, MemoryDatabase, MutableDatabase};
pub use emulator::Emulator;
pub use error::{Error, Result};
pub use function::{Function, FunctionEntry};
pub use identity::CertificateIdentity;
pub use ledger::{Asset, AssetFilter, AssetLedger, Ledger, VersionOrder};
pub use loader::{descriptor, ContractLoader, FunctionLoader};
pub use registry::{ContractArtifact, ContractRegistry};
