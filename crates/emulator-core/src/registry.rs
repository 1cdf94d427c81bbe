//! Contract registry: in-memory store of registered artifacts
//!
//! The emulator assumes a single registrant, so unlike a production
//! registry there is no per-holder partitioning and no versioning:
//! binding an id that already exists replaces its artifact.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Placeholder holder id recorded on every emulated registration
pub const REGISTRANT_HOLDER_ID: &str = "holder_id";

/// Placeholder certificate version recorded on every emulated registration
pub const REGISTRANT_CERT_VERSION: i32 = 1;

/// Placeholder signature; the emulator never verifies signatures
pub const PLACEHOLDER_SIGNATURE: &[u8] = b"signature";

// ── Artifact ──────────────────────────────────────────────

/// The stored form of a contract: its code plus registration metadata
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContractArtifact {
    pub id: String,
    pub binary_name: String,
    pub code: Vec<u8>,
    pub holder_id: String,
    pub cert_version: i32,
    pub properties: Option<serde_json::Value>,
    /// Milliseconds since the Unix epoch
    pub registered_at: u64,
    pub signature: Vec<u8>,
}

impl ContractArtifact {
    /// Build an artifact the way the emulator registers one
    pub fn new(
        id: impl Into<String>,
        binary_name: impl Into<String>,
        code: Vec<u8>,
        properties: Option<serde_json::Value>,
    ) -> Self {
        ContractArtifact {
            id: id.into(),
            binary_name: binary_name.into(),
            code,
            holder_id: REGISTRANT_HOLDER_ID.to_string(),
            cert_version: REGISTRANT_CERT_VERSION,
            properties,
            registered_at: now_millis(),
            signature: PLACEHOLDER_SIGNATURE.to_vec(),
        }
    }

    /// SHA-256 of the contract code, lowercase hex
    pub fn code_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.code);
        format!("{:x}", hasher.finalize())
    }
}

pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Registry ──────────────────────────────────────────────

/// Insertion-ordered `id -> artifact` store
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    contracts: IndexMap<String, ContractArtifact>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the artifact for `artifact.id`.
    ///
    /// An overwritten id keeps its original scan position.
    pub fn bind(&mut self, artifact: ContractArtifact) {
        self.contracts.insert(artifact.id.clone(), artifact);
    }

    /// Remove the artifact for `id`, if any
    pub fn unbind(&mut self, id: &str) {
        self.contracts.shift_remove(id);
    }

    pub fn lookup(&self, id: &str) -> Result<&ContractArtifact> {
        self.contracts
            .get(id)
            .ok_or_else(|| Error::MissingContract(id.to_string()))
    }

    /// All bound artifacts in insertion order
    pub fn scan(&self) -> Vec<ContractArtifact> {
        self.contracts.values().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.contracts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
