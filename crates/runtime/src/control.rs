//! The secondary, non-streaming robot-control call.

use reqwest::header;
use robochat_model::{ErrorKind, ProvideCredentials};
use serde::{Deserialize, Serialize};

use crate::{Error, RuntimeTransport};

/// The expressions the robot can be told to take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RobotAction {
    /// A happy expression.
    Happy,
    /// The neutral expression.
    Neutral,
    /// A sad expression.
    Sad,
    /// An angry expression.
    Angry,
}

/// A robot-control request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ControlRequest {
    /// The action to take.
    pub action: RobotAction,
    /// Optional text accompanying the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Whether the backend should emit debug detail.
    pub debug: bool,
}

impl ControlRequest {
    /// Creates a request for the given action.
    #[inline]
    pub fn new(action: RobotAction) -> Self {
        Self {
            action,
            message: None,
            debug: false,
        }
    }
}

/// The response of a robot-control call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ControlResponse {
    /// The status code reported by the control function.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Whether the action was carried out.
    pub body: bool,
}

impl<C: ProvideCredentials> RuntimeTransport<C> {
    /// Sends a robot-control request and waits for its result.
    ///
    /// Unlike turns, this call is synchronous end to end; failures
    /// are returned to the caller directly since there is no stream
    /// to carry them.
    pub async fn send_control(
        &self,
        req: &ControlRequest,
    ) -> Result<ControlResponse, Error> {
        let Some(control_url) = self.config.control_url.as_deref() else {
            return Err(Error::new(
                "robot control endpoint is not configured",
                ErrorKind::Config,
            ));
        };

        let creds = self
            .credentials
            .credentials()
            .await
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Credentials))?;
        let token = creds.session_token.unwrap_or(creds.access_key_id);

        trace!("sending robot control request: {req:?}");
        let resp = self
            .client
            .post(control_url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .json(req)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| {
                Error::new(
                    format!("robot control call failed: {err}"),
                    ErrorKind::Other,
                )
            })?;

        resp.json::<ControlResponse>().await.map_err(|err| {
            Error::new(
                format!("malformed robot control response: {err}"),
                ErrorKind::Other,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use robochat_model::{Credentials, StaticCredentials};

    use super::*;
    use crate::RuntimeConfigBuilder;

    #[test]
    fn test_action_wire_names() {
        let req = ControlRequest::new(RobotAction::Happy);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["action"], "HAPPY");
        assert_eq!(json["debug"], false);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_response_wire_names() {
        let resp: ControlResponse =
            serde_json::from_str(r#"{"statusCode":200,"body":true}"#)
                .unwrap();
        assert_eq!(resp.status_code, 200);
        assert!(resp.body);
    }

    #[tokio::test]
    async fn test_missing_control_url_fails_fast() {
        let config =
            RuntimeConfigBuilder::with_runtime_arn("arn:aws:x").build();
        let transport = RuntimeTransport::new(
            config,
            StaticCredentials::new(Credentials {
                access_key_id: "AKID".to_owned(),
                secret_access_key: "secret".to_owned(),
                session_token: None,
                expiration: None,
            }),
        );
        let err = transport
            .send_control(&ControlRequest::new(RobotAction::Neutral))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "robot control endpoint is not configured");
    }
}
