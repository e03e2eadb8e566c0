//! Error types for the connection manager.
//!
//! Transport failures are transient and drive the retry loop; everything
//! else ends [`crate::ConnectionManager::run`].

use std::time::Duration;

use thiserror::Error;

use crate::dispatch::DispatchError;

/// Errors surfaced by the connection manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Name scan finished without a match
    #[error("no device named {name:?} found within {timeout:?}")]
    DeviceNotFound {
        /// Advertised name that was searched for
        name: String,
        /// Scan duration
        timeout: Duration,
    },

    /// Address-only configuration on a platform without address connects
    #[error("this platform cannot connect by address; configure the device `name`")]
    AddressConnectUnsupported,

    /// Connected device lacks the notifying input characteristic
    #[error("input IO characteristic not found")]
    CharacteristicNotFound,

    /// Bounded retry policy ran out of attempts
    #[error("gave up connecting after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        last_error: String,
    },

    /// Underlying transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// Fatal dispatch error
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl AdapterError {
    /// Wrap a transport error.
    pub fn transport(err: impl std::error::Error) -> Self {
        Self::Transport(err.to_string())
    }

    /// Returns true if a fresh connection cycle may succeed.
    ///
    /// Only transport failures are transient. Configuration problems and a
    /// device without the input characteristic never fix themselves.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transient() {
        assert!(AdapterError::Transport("le-connection-abort-by-local".into()).is_transient());
    }

    #[test]
    fn fatal_errors_are_not_transient() {
        assert!(
            !AdapterError::DeviceNotFound { name: "AIO".into(), timeout: Duration::from_secs(60) }
                .is_transient()
        );
        assert!(!AdapterError::AddressConnectUnsupported.is_transient());
        assert!(!AdapterError::CharacteristicNotFound.is_transient());
        assert!(
            !AdapterError::RetriesExhausted { attempts: 3, last_error: "timeout".into() }
                .is_transient()
        );
        assert!(
            !AdapterError::Dispatch(DispatchError::ConflictingRelease { pin: 2 }).is_transient()
        );
    }

    #[test]
    fn conflict_message_names_the_pin() {
        let err = AdapterError::from(DispatchError::ConflictingRelease { pin: 2 });
        assert!(err.to_string().starts_with("pin 2: cannot specify press.auto_release=false"));
    }
}
