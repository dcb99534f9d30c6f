use std::fmt::Debug;

/// Builder for [`RuntimeConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RuntimeConfigBuilder {
    runtime_arn: String,
    qualifier: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
    control_url: Option<String>,
}

impl RuntimeConfigBuilder {
    /// Creates a builder for the given agent runtime identifier.
    #[inline]
    pub fn with_runtime_arn<S: Into<String>>(runtime_arn: S) -> Self {
        Self {
            runtime_arn: runtime_arn.into(),
            qualifier: None,
            region: None,
            endpoint: None,
            control_url: None,
        }
    }

    /// Sets the runtime qualifier (version alias).
    #[inline]
    pub fn with_qualifier<S: Into<String>>(mut self, qualifier: S) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Sets the service region.
    #[inline]
    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets a custom endpoint, overriding the region-derived one.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the endpoint of the secondary robot-control call.
    #[inline]
    pub fn with_control_url<S: Into<String>>(mut self, url: S) -> Self {
        self.control_url = Some(url.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> RuntimeConfig {
        let region =
            self.region.unwrap_or_else(|| "us-west-2".to_string());
        let endpoint = self.endpoint.unwrap_or_else(|| {
            format!("https://bedrock-agentcore.{region}.amazonaws.com")
        });
        RuntimeConfig {
            runtime_arn: self.runtime_arn,
            qualifier: self.qualifier.unwrap_or_else(|| "DEFAULT".to_string()),
            region,
            endpoint,
            control_url: self.control_url,
        }
    }
}

/// Configuration for the managed agent-runtime transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RuntimeConfig {
    pub(crate) runtime_arn: String,
    pub(crate) qualifier: String,
    pub(crate) region: String,
    pub(crate) endpoint: String,
    pub(crate) control_url: Option<String>,
}

impl RuntimeConfig {
    /// The URL that opens a streamed turn against the runtime.
    pub(crate) fn invocation_url(&self) -> String {
        format!(
            "{}/runtimes/{}/invocations",
            self.endpoint,
            encode_path_segment(&self.runtime_arn)
        )
    }
}

/// Percent-encodes a string for use as a single URL path segment.
fn encode_path_segment(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'.'
            | b'_'
            | b'~' => encoded.push(byte as char),
            _ => {
                encoded.push('%');
                encoded.push_str(&format!("{byte:02X}"));
            }
        }
    }
    encoded
}
