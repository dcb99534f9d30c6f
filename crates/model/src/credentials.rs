use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};
use std::future::ready;
use std::time::SystemTime;

use crate::error::{ErrorKind, TransportError};

/// Short-lived credentials for calling the managed backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// The access key id.
    pub access_key_id: String,
    /// The secret access key.
    pub secret_access_key: String,
    /// The session token, for temporary identities.
    pub session_token: Option<String>,
    /// When these credentials expire, if known.
    pub expiration: Option<SystemTime>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| ".."))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// The error returned when credentials cannot be obtained.
#[derive(Debug)]
pub struct CredentialsError {
    message: String,
}

impl CredentialsError {
    /// Creates an error with the given message.
    #[inline]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for CredentialsError {}

impl TransportError for CredentialsError {
    #[inline]
    fn kind(&self) -> ErrorKind {
        ErrorKind::Credentials
    }
}

/// A source of short-lived credentials.
///
/// Credentials may expire between calls, so transports fetch a fresh
/// set before every call instead of caching the result of a previous
/// fetch.
pub trait ProvideCredentials: Send + Sync {
    /// Obtains a fresh set of credentials.
    fn credentials(
        &self,
    ) -> impl Future<Output = Result<Credentials, CredentialsError>> + Send + 'static;
}

/// A provider that always returns the same fixed credentials.
///
/// Useful for tests and for backends fronted by a gateway that does
/// its own authentication.
#[derive(Clone, Debug)]
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    /// Creates a provider from the given credentials.
    #[inline]
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

impl ProvideCredentials for StaticCredentials {
    fn credentials(
        &self,
    ) -> impl Future<Output = Result<Credentials, CredentialsError>> + Send + 'static
    {
        ready(Ok(self.0.clone()))
    }
}
