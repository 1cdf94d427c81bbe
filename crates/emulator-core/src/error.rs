//! Error types for the contract emulator
//!
//! All fallible operations return `Result<T, Error>`.
//! Errors raised by contract logic travel through the engine untouched.

use thiserror::Error;

/// Emulator error types
#[derive(Debug, Error)]
pub enum Error {
    /// Lookup of a contract id that was never registered (or was unbound)
    #[error("contract '{0}' has not been registered")]
    MissingContract(String),

    /// Contract bytes could not be read while registering
    #[error("could not register contract '{id}': {source}")]
    RegistryIo {
        id: String,
        #[source]
        source: std::io::Error,
    },

    /// Artifact code could not be turned into an executable instance
    #[error("could not materialize '{binary_name}': {reason}")]
    Transformation { binary_name: String, reason: String },

    /// Contract arguments are missing or malformed
    #[error("contract context error: {0}")]
    ContractContext(String),

    /// Failure raised by contract logic while running
    #[error("invocation error: {0}")]
    Invocation(String),

    /// Lookup of a function id that was never registered
    #[error("function '{0}' has not been registered")]
    MissingFunction(String),

    /// A nested call was attempted after its emulator was dropped
    #[error("the emulator owning this contract instance is no longer available")]
    EmulatorUnavailable,
}

impl Error {
    pub(crate) fn transformation(binary_name: &str, reason: impl Into<String>) -> Self {
        Error::Transformation {
            binary_name: binary_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for emulator operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_contract_message_names_id() {
        let err = Error::MissingContract("callee".into());
        assert_eq!(err.to_string(), "contract 'callee' has not been registered");
    }

    #[test]
    fn test_registry_io_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::RegistryIo {
            id: "get".into(),
            source: io,
        };
        assert!(err.to_string().starts_with("could not register contract 'get'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_transformation_helper() {
        let err = Error::transformation("emulator.contract.Get", "missing marker");
        match err {
            Error::Transformation {
                binary_name,
                reason,
            } => {
                assert_eq!(binary_name, "emulator.contract.Get");
                assert_eq!(reason, "missing marker");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
