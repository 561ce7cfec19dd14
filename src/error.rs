//local shortcuts

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// The kind of failure a [`RuntimeError`] represents.
///
/// See the error table in the crate's design notes for the retryability of each kind.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RuntimeErrorKind
{
    /// The adapter refused or failed to open a connection.
    Connection,
    /// A connect, heartbeat, ACK, or RPC operation exceeded its deadline.
    Timeout,
    /// Inbound data was malformed or violated the expected schema.
    Protocol,
    /// An enqueue would exceed queue capacity and eviction is disabled.
    QueueFull,
    /// Authenticated-encryption tag verification or key handling failed.
    Encryption,
    /// Decompression of an inbound frame failed.
    Compression,
    /// The operation was attempted while the runtime was in the wrong state.
    State,
    /// The adapter reported an authentication failure.
    Authentication,
    /// A single-message payload exceeded the configured size cap.
    MessageSize,
}

impl RuntimeErrorKind
{
    /// Whether an error of this kind is worth retrying (per the crate's error handling design).
    pub fn retryable(&self) -> bool
    {
        match self
        {
            RuntimeErrorKind::Connection     => true,
            RuntimeErrorKind::Timeout        => true,
            RuntimeErrorKind::Protocol       => false,
            RuntimeErrorKind::QueueFull      => false,
            RuntimeErrorKind::Encryption     => false,
            RuntimeErrorKind::Compression    => false,
            RuntimeErrorKind::State         => false,
            RuntimeErrorKind::Authentication => false,
            RuntimeErrorKind::MessageSize    => false,
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// The runtime's single error type.
///
/// Carries a [`RuntimeErrorKind`], a human-readable message, and an optional boxed source for diagnostics.
#[derive(Debug)]
pub struct RuntimeError
{
    kind    : RuntimeErrorKind,
    message : String,
    source  : Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RuntimeError
{
    /// Make a new error with no source.
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>) -> Self
    {
        Self{ kind, message: message.into(), source: None }
    }

    /// Make a new error wrapping a source error.
    pub fn with_source(
        kind    : RuntimeErrorKind,
        message : impl Into<String>,
        source  : impl std::error::Error + Send + Sync + 'static,
    ) -> Self
    {
        Self{ kind, message: message.into(), source: Some(Box::new(source)) }
    }

    /// Make a [`RuntimeErrorKind::Timeout`] error carrying the configured duration.
    pub fn timeout(operation: &str, duration: Duration) -> Self
    {
        Self::new(RuntimeErrorKind::Timeout, format!("{operation} timed out after {duration:?}"))
    }

    /// The kind of this error.
    pub fn kind(&self) -> RuntimeErrorKind
    {
        self.kind
    }

    /// Whether this error is worth retrying.
    pub fn retryable(&self) -> bool
    {
        self.kind.retryable()
    }
}

impl std::fmt::Display for RuntimeError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let _ = write!(f, "RuntimeError::");
        match self.kind
        {
            RuntimeErrorKind::Connection     => write!(f, "Connection({})", self.message),
            RuntimeErrorKind::Timeout        => write!(f, "Timeout({})", self.message),
            RuntimeErrorKind::Protocol       => write!(f, "Protocol({})", self.message),
            RuntimeErrorKind::QueueFull      => write!(f, "QueueFull({})", self.message),
            RuntimeErrorKind::Encryption     => write!(f, "Encryption({})", self.message),
            RuntimeErrorKind::Compression    => write!(f, "Compression({})", self.message),
            RuntimeErrorKind::State         => write!(f, "State({})", self.message),
            RuntimeErrorKind::Authentication => write!(f, "Authentication({})", self.message),
            RuntimeErrorKind::MessageSize    => write!(f, "MessageSize({})", self.message),
        }
    }
}

impl std::error::Error for RuntimeError
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)>
    {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn retryability_matches_design_table()
    {
        assert!(RuntimeErrorKind::Connection.retryable());
        assert!(RuntimeErrorKind::Timeout.retryable());
        assert!(!RuntimeErrorKind::Protocol.retryable());
        assert!(!RuntimeErrorKind::QueueFull.retryable());
        assert!(!RuntimeErrorKind::Encryption.retryable());
        assert!(!RuntimeErrorKind::Compression.retryable());
        assert!(!RuntimeErrorKind::State.retryable());
        assert!(!RuntimeErrorKind::Authentication.retryable());
        assert!(!RuntimeErrorKind::MessageSize.retryable());
    }

    #[test]
    fn display_includes_kind_and_message()
    {
        let err = RuntimeError::new(RuntimeErrorKind::QueueFull, "capacity exceeded");
        let rendered = format!("{err}");
        assert!(rendered.contains("QueueFull"));
        assert!(rendered.contains("capacity exceeded"));
    }
}

//-------------------------------------------------------------------------------------------------------------------
