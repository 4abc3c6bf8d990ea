//! # homelink-adapter-notify
//!
//! Implements the [`ChangeNotifier`] port against the assistant platform's
//! callback HTTP API: `POST …/callback/state` for changed device state and
//! `POST …/callback/discovery` when the device set itself changes.
//!
//! Delivery is best-effort by contract — the caller decides whether a
//! failure matters. Timeouts are short and fixed; there is no retry here.

pub mod config;

pub use config::NotifierConfig;

use std::future::Future;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

use homelink_app::ports::ChangeNotifier;
use homelink_domain::device::DeviceReport;
use homelink_domain::error::NotifyError;

/// Total request timeout.
const TOTAL_TIMEOUT: Duration = Duration::from_secs(30);
/// Connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors building the client; calling it yields [`NotifyError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum NotifyClientError {
    /// The configured base URL or skill id does not form a valid endpoint.
    #[error("invalid callback endpoint URL")]
    Url(#[from] url::ParseError),

    /// The token cannot be carried in an HTTP header.
    #[error("invalid authorization token")]
    Token(#[from] reqwest::header::InvalidHeaderValue),

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client")]
    Http(#[from] reqwest::Error),
}

/// Body shape of every callback response, success or error.
#[derive(Debug, Default, Deserialize)]
struct CallbackResponse {
    request_id: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
}

/// HTTP client for one linked skill/user pair.
pub struct CallbackClient {
    http: reqwest::Client,
    state_url: Url,
    discovery_url: Url,
    user_id: String,
}

impl CallbackClient {
    /// Build the client and its endpoint URLs.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyClientError`] when the endpoint URL or token is
    /// malformed.
    pub fn new(config: &NotifierConfig) -> Result<Self, NotifyClientError> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(&format!("OAuth {}", config.token))?;
        token.set_sensitive(true);
        headers.insert(AUTHORIZATION, token);

        let http = reqwest::Client::builder()
            .timeout(TOTAL_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .default_headers(headers)
            .build()?;

        let base: Url = format!(
            "{}/{}/callback/",
            config.base_url.trim_end_matches('/'),
            config.skill_id
        )
        .parse()?;

        Ok(Self {
            http,
            state_url: base.join("state")?,
            discovery_url: base.join("discovery")?,
            user_id: config.user_id.clone(),
        })
    }

    async fn post(&self, url: &Url, body: serde_json::Value) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| NotifyError {
                request_id: None,
                code: None,
                message: Some(err.to_string()),
            })?;

        let status = response.status();
        let data: CallbackResponse = response.json().await.unwrap_or_default();
        if status.is_success() {
            tracing::info!(url = %url, request_id = ?data.request_id, "notification accepted");
            return Ok(());
        }

        tracing::error!(
            url = %url,
            status = %status,
            code = ?data.error_code,
            "notification rejected"
        );
        Err(NotifyError {
            request_id: data.request_id,
            code: data.error_code,
            message: data.error_message,
        })
    }
}

/// Seconds since the epoch as the platform expects it.
fn unix_ts() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

impl ChangeNotifier for CallbackClient {
    fn notify_state(
        &self,
        devices: Vec<DeviceReport>,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send {
        let body = serde_json::json!({
            "ts": unix_ts(),
            "payload": {
                "user_id": self.user_id,
                "devices": devices,
            },
        });
        self.post(&self.state_url, body)
    }

    fn notify_discovery(&self) -> impl Future<Output = Result<(), NotifyError>> + Send {
        let body = serde_json::json!({
            "ts": unix_ts(),
            "payload": {
                "user_id": self.user_id,
            },
        });
        self.post(&self.discovery_url, body)
    }
}
