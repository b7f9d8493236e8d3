//! Error types for the automation engine.

use crate::patterns::PatternKind;
use crate::peer::PeerId;

/// Result type alias for automation operations.
pub type Result<T> = std::result::Result<T, AutomationError>;

/// Errors surfaced to automation clients.
///
/// Lookups that miss (an item with no cached peer, a dead proxy handle, a
/// container the generator no longer maps) are not errors; they come back as
/// `None`. Only operations that cannot make progress return one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutomationError {
    /// The peer's item is virtualized and the query needs a live container.
    #[error("element is virtualized and not currently available")]
    NotAvailable,

    /// A mutating operation was attempted while the owning control is disabled.
    #[error("element is not enabled")]
    NotEnabled,

    /// The operation cannot be performed in the current state.
    #[error("operation cannot be performed: {0}")]
    InvalidOperation(String),

    /// An indexed argument is outside its valid range.
    #[error("argument '{parameter}' out of range: {value} (limit {limit})")]
    ArgumentOutOfRange {
        parameter: &'static str,
        value: usize,
        limit: usize,
    },

    /// A required argument was not supplied.
    #[error("argument '{0}' must not be null")]
    ArgumentNull(&'static str),

    /// An argument has the wrong shape for the requested operation.
    #[error("invalid argument '{parameter}': {message}")]
    InvalidArgument {
        parameter: &'static str,
        message: String,
    },

    /// The peer id is stale or was never issued by this engine.
    #[error("peer {0:?} no longer exists")]
    InvalidPeer(PeerId),

    /// The peer does not expose the requested pattern.
    #[error("pattern {pattern:?} is not supported by peer {peer:?}")]
    PatternNotSupported { peer: PeerId, pattern: PatternKind },

    /// Engine configuration could not be parsed.
    #[error("invalid engine configuration: {0}")]
    Config(String),
}

impl AutomationError {
    /// Create an invalid-operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Create an out-of-range error.
    pub fn out_of_range(parameter: &'static str, value: usize, limit: usize) -> Self {
        Self::ArgumentOutOfRange {
            parameter,
            value,
            limit,
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            message: message.into(),
        }
    }

    /// Whether this is the virtualized-element failure.
    pub fn is_not_available(&self) -> bool {
        matches!(self, Self::NotAvailable)
    }
}

impl From<toml::de::Error> for AutomationError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
