//! The server-sent-events transport.
//!
//! Talks to a plain HTTP backend: turns are POSTed and answered with
//! a streamed `data:` body, and a separate persistent connection
//! delivers server-initiated events. When the persistent connection
//! drops unexpectedly it is reopened with exponential backoff, up to
//! a bounded number of attempts; connection transitions are surfaced
//! through a [`ConnectionStatus`] watch channel, never as chat
//! messages.

#[macro_use]
extern crate tracing;

mod config;
mod stream;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::{Client, Response, header};
use robochat_model::{
    AgentTransport, ErrorKind, TransportError, TurnRequest,
};
use robochat_wire::{Chunks, FrameReader};
use serde_json::json;
use tokio::sync::watch;
use tokio::time::sleep;

pub use config::{SseConfig, SseConfigBuilder};
pub use stream::SseEventStream;

/// Error type for [`SseTransport`].
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

/// The state of the persistent listen connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No connection is open.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The connection is open.
    Connected,
    /// The connection dropped; a reconnect attempt is pending.
    Reconnecting {
        /// Which attempt this is, starting at 1.
        attempt: u32,
    },
    /// All reconnect attempts were exhausted.
    Failed,
}

/// Transport for a server-sent-events chat backend.
#[derive(Clone)]
pub struct SseTransport {
    client: Client,
    config: Arc<SseConfig>,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
}

impl SseTransport {
    /// Creates a new transport with the given configuration.
    pub fn new(config: SseConfig) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            client: Client::new(),
            config: Arc::new(config),
            status_tx: Arc::new(status_tx),
        }
    }

    /// Returns a receiver observing the listen-connection status.
    #[inline]
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    fn set_status(&self, status: ConnectionStatus) {
        trace!("connection status: {status:?}");
        self.status_tx.send_replace(status);
    }

    /// Opens the persistent listen connection.
    ///
    /// The returned listener reconnects on its own when the
    /// connection drops unexpectedly; a clean server close ends it.
    pub async fn listen(&self) -> Result<SseListener, Error> {
        self.set_status(ConnectionStatus::Connecting);
        let reader = match self.open_listen_reader().await {
            Ok(reader) => reader,
            Err(err) => {
                warn!("listen connection failed: {err}");
                self.reconnect().await?
            }
        };
        self.set_status(ConnectionStatus::Connected);
        Ok(SseListener {
            transport: self.clone(),
            reader,
        })
    }

    async fn open_listen_reader(&self) -> Result<FrameReader, Error> {
        let resp = self
            .client
            .get(self.config.listen_url())
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        Ok(FrameReader::new(Chunks::from_response(resp)))
    }

    /// Tries to reopen the listen connection with exponential
    /// backoff, up to the configured number of attempts.
    async fn reconnect(&self) -> Result<FrameReader, Error> {
        let mut schedule = reconnect_schedule(&self.config);
        for attempt in 1..=self.config.max_reconnect_attempts {
            self.set_status(ConnectionStatus::Reconnecting { attempt });
            let delay = schedule
                .next_backoff()
                .unwrap_or(self.config.max_reconnect_delay);
            debug!("reconnect attempt {attempt} in {delay:?}");
            sleep(delay).await;

            match self.open_listen_reader().await {
                Ok(reader) => {
                    self.set_status(ConnectionStatus::Connected);
                    return Ok(reader);
                }
                Err(err) => {
                    warn!("reconnect attempt {attempt} failed: {err}");
                }
            }
        }
        self.set_status(ConnectionStatus::Failed);
        Err(Error::new(
            "exhausted all reconnect attempts",
            ErrorKind::Other,
        ))
    }
}

impl AgentTransport for SseTransport {
    type Error = Error;
    type Stream = SseEventStream;

    fn send_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static
    {
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let body = json!({
            "message": req.prompt,
            "session_id": req.session_id,
            "sender": "user",
            "timestamp": unix_millis(),
        });

        async move {
            // A missing base URL is a deployment problem; fail before
            // any stream exists so it surfaces as connection status,
            // not as a chat message.
            if config.base_url.is_empty() {
                return Err(Error::new(
                    "server base URL is not configured",
                    ErrorKind::Config,
                ));
            }

            let resp = client
                .post(config.turn_url())
                .header(header::CONTENT_TYPE, "application/json")
                .json(&body)
                .send()
                .await
                .and_then(Response::error_for_status);
            let resp = match resp {
                Ok(resp) => resp,
                Err(err) => {
                    error!("turn request failed: {err}");
                    return Ok(SseEventStream::failed(format!(
                        "turn request failed: {err}"
                    )));
                }
            };

            let reader = FrameReader::new(Chunks::from_response(resp));
            Ok(SseEventStream::from_reader(reader))
        }
    }
}

/// Events delivered over the persistent listen connection.
pub struct SseListener {
    transport: SseTransport,
    reader: FrameReader,
}

impl SseListener {
    /// Reads the next server-initiated event.
    ///
    /// Returns `None` when the server closes the connection cleanly.
    /// An unexpected drop triggers transparent reconnection; only
    /// exhausting every attempt surfaces as an error.
    pub async fn next_event(
        &mut self,
    ) -> Result<Option<robochat_model::StreamEvent>, Error> {
        loop {
            match self.reader.next_event().await {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => {
                    self.transport
                        .set_status(ConnectionStatus::Disconnected);
                    return Ok(None);
                }
                Err(err) => {
                    warn!("listen connection dropped: {err}");
                    self.reader = self.transport.reconnect().await?;
                }
            }
        }
    }
}

fn reconnect_schedule(config: &SseConfig) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(config.initial_reconnect_delay)
        .with_multiplier(2.0)
        .with_randomization_factor(0.0)
        .with_max_interval(config.max_reconnect_delay)
        .with_max_elapsed_time(None)
        .build()
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
