use std::error::Error;

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required configuration value is missing or invalid.
    Config,
    /// Credentials could not be obtained for the call.
    Credentials,
    /// The backend rejected the call due to throttling.
    Throttled,
    /// Any other errors.
    Other,
}

/// The error type for a transport.
pub trait TransportError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}
