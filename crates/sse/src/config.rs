use std::time::Duration;

/// Builder for [`SseConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SseConfigBuilder {
    base_url: String,
    max_reconnect_attempts: Option<u32>,
    initial_reconnect_delay: Option<Duration>,
    max_reconnect_delay: Option<Duration>,
}

impl SseConfigBuilder {
    /// Creates a builder for the given server base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            max_reconnect_attempts: None,
            initial_reconnect_delay: None,
            max_reconnect_delay: None,
        }
    }

    /// Sets how many reconnect attempts are made before giving up.
    #[inline]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Sets the delay before the first reconnect attempt.
    #[inline]
    pub fn with_initial_reconnect_delay(mut self, delay: Duration) -> Self {
        self.initial_reconnect_delay = Some(delay);
        self
    }

    /// Sets the cap on the reconnect delay.
    #[inline]
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay = Some(delay);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SseConfig {
        SseConfig {
            base_url: self.base_url,
            max_reconnect_attempts: self.max_reconnect_attempts.unwrap_or(5),
            initial_reconnect_delay: self
                .initial_reconnect_delay
                .unwrap_or(Duration::from_secs(1)),
            max_reconnect_delay: self
                .max_reconnect_delay
                .unwrap_or(Duration::from_secs(30)),
        }
    }
}

/// Configuration for the SSE transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SseConfig {
    pub(crate) base_url: String,
    pub(crate) max_reconnect_attempts: u32,
    pub(crate) initial_reconnect_delay: Duration,
    pub(crate) max_reconnect_delay: Duration,
}

impl SseConfig {
    pub(crate) fn turn_url(&self) -> String {
        format!("{}/api/chat/stream", self.base_url)
    }

    pub(crate) fn listen_url(&self) -> String {
        format!("{}/api/stream", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config =
            SseConfigBuilder::with_base_url("http://localhost:8000").build();
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.initial_reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(30));
        assert_eq!(
            config.turn_url(),
            "http://localhost:8000/api/chat/stream"
        );
        assert_eq!(config.listen_url(), "http://localhost:8000/api/stream");
    }
}
