//! Certificate identity of the simulated caller
//!
//! Production ledgers authorize contract calls with a certificate. The
//! emulator only carries the `(holder_id, version)` key of that certificate.

use std::fmt;

/// Holder id stamped on contracts until a harness sets another identity
pub const DEFAULT_HOLDER_ID: &str = "default_holder_id";

/// Certificate version paired with [`DEFAULT_HOLDER_ID`]
pub const DEFAULT_CERT_VERSION: i32 = 1;

/// Key of the certificate a contract observes as its caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CertificateIdentity {
    pub holder_id: String,
    pub version: i32,
}

impl CertificateIdentity {
    pub fn new(holder_id: impl Into<String>, version: i32) -> Self {
        CertificateIdentity {
            holder_id: holder_id.into(),
            version,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "holder_id": self.holder_id,
            "version": self.version,
        })
    }
}

impl Default for CertificateIdentity {
    fn default() -> Self {
        CertificateIdentity::new(DEFAULT_HOLDER_ID, DEFAULT_CERT_VERSION)
    }
}

impl fmt::Display for CertificateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.holder_id, self.version)
    }
}
