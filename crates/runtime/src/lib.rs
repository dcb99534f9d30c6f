//! The managed agent-runtime transport.
//!
//! Invokes the hosted agent runtime and exposes its streamed response
//! through the [`AgentTransport`] contract. Fresh credentials are
//! obtained before every call (they may expire between calls, so
//! nothing is cached), and every failure after the call has started
//! is delivered in-band as a single error event. The crate also
//! carries the secondary, non-streaming robot-control call.

#[macro_use]
extern crate tracing;

mod config;
pub mod control;
mod stream;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, Response, header};
use robochat_model::{
    AgentTransport, ErrorKind, ProvideCredentials, TransportError,
    TurnRequest,
};
use robochat_wire::{Chunks, FrameReader};

pub use config::{RuntimeConfig, RuntimeConfigBuilder};
pub use stream::RuntimeEventStream;

/// Error type for [`RuntimeTransport`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl TransportError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Transport for the managed agent runtime.
#[derive(Clone, Debug)]
pub struct RuntimeTransport<C> {
    client: Client,
    config: Arc<RuntimeConfig>,
    credentials: Arc<C>,
}

impl<C: ProvideCredentials> RuntimeTransport<C> {
    /// Creates a new transport with the given configuration and
    /// credential source.
    #[inline]
    pub fn new(config: RuntimeConfig, credentials: C) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
            credentials: Arc::new(credentials),
        }
    }
}

impl<C: ProvideCredentials + 'static> AgentTransport for RuntimeTransport<C> {
    type Error = Error;
    type Stream = RuntimeEventStream;

    fn send_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static
    {
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let credentials = Arc::clone(&self.credentials);
        let req = req.clone();

        async move {
            // A missing runtime identifier is a deployment problem;
            // fail before any stream exists so it surfaces as
            // connection status, not as a chat message.
            if config.runtime_arn.is_empty() {
                return Err(Error::new(
                    "agent runtime identifier is not configured",
                    ErrorKind::Config,
                ));
            }

            let creds = match credentials.credentials().await {
                Ok(creds) => creds,
                Err(err) => {
                    error!("failed to obtain credentials: {err}");
                    return Ok(RuntimeEventStream::failed(format!(
                        "failed to obtain credentials: {err}"
                    )));
                }
            };
            trace!("invoking agent runtime: {:?}", config.runtime_arn);

            // The gateway in front of the runtime authenticates with
            // the session token; request signing is its concern, not
            // ours.
            let token = creds
                .session_token
                .unwrap_or(creds.access_key_id);
            let resp_fut = client
                .post(config.invocation_url())
                .query(&[("qualifier", config.qualifier.as_str())])
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "text/event-stream")
                .json(&req)
                .send();

            let resp = match resp_fut.await.and_then(Response::error_for_status)
            {
                Ok(resp) => resp,
                Err(err) => {
                    error!("agent runtime call failed: {err}");
                    return Ok(RuntimeEventStream::failed(format!(
                        "agent runtime call failed: {err}"
                    )));
                }
            };

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.essence_str() == mime::TEXT_EVENT_STREAM)
                .unwrap_or(false);
            if !is_event_stream {
                return Ok(RuntimeEventStream::failed(format!(
                    "unexpected content type: {content_type:?}"
                )));
            }

            // Here we got a successful streaming response.
            let chunks = Chunks::from_response(resp);
            Ok(RuntimeEventStream::from_reader(FrameReader::new(chunks)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use robochat_model::{
        Credentials, EventStream, StaticCredentials, StreamEvent,
    };

    use super::*;

    fn static_creds() -> StaticCredentials {
        StaticCredentials::new(Credentials {
            access_key_id: "AKID".to_owned(),
            secret_access_key: "secret".to_owned(),
            session_token: Some("token".to_owned()),
            expiration: None,
        })
    }

    #[tokio::test]
    async fn test_missing_runtime_arn_fails_fast() {
        let config = RuntimeConfigBuilder::with_runtime_arn("").build();
        let transport = RuntimeTransport::new(config, static_creds());
        let err = transport
            .send_turn(&TurnRequest::new("hi", "session-1"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_unreachable_runtime_reports_in_band() {
        // An endpoint that refuses connections: the call itself must
        // still succeed and deliver the failure as an error event.
        let config = RuntimeConfigBuilder::with_runtime_arn("arn:aws:x")
            .with_endpoint("http://127.0.0.1:1")
            .build();
        let transport = RuntimeTransport::new(config, static_creds());
        let stream = transport
            .send_turn(&TurnRequest::new("hi", "session-1"))
            .await
            .unwrap();

        let mut stream = pin!(stream);
        let event = poll_fn(|cx| stream.as_mut().poll_next_event(cx))
            .await
            .unwrap();
        assert!(matches!(event, Some(StreamEvent::Error(_))));
        let event = poll_fn(|cx| stream.as_mut().poll_next_event(cx))
            .await
            .unwrap();
        assert_eq!(event, None);
    }
}
