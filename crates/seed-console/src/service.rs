use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceAction {
    Pull,
    Build,
    Start,
    Stop,
    Restart,
    StartAi,
    StopAi,
}

impl ServiceAction {
    pub const ALL: [ServiceAction; 7] = [
        ServiceAction::Pull,
        ServiceAction::Build,
        ServiceAction::Start,
        ServiceAction::Stop,
        ServiceAction::Restart,
        ServiceAction::StartAi,
        ServiceAction::StopAi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Pull => "pull",
            ServiceAction::Build => "build",
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::StartAi => "start_ai",
            ServiceAction::StopAi => "stop_ai",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase().replace('-', "_");
        ServiceAction::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| format!("Unknown service action: {input}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub game: Option<String>,
    #[serde(default)]
    pub ai: Option<String>,
    #[serde(default)]
    pub vnc: Option<String>,
}

impl ServiceStatus {
    pub fn game_running(&self) -> bool {
        self.game.as_deref() == Some("running")
    }

    pub fn ai_running(&self) -> bool {
        self.ai.as_deref() == Some("running")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("invalid service url: {0}")]
    InvalidUrl(String),
    #[error("service request failed: {0}")]
    Http(String),
    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("service response was not understood: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    Status(ServiceStatus),
    ActionDone {
        action: ServiceAction,
        result: Result<ServiceReply, ServiceError>,
    },
}

/// HTTP client for the game/agent control service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base: Url,
}

impl ServiceClient {
    pub fn new(base: &str) -> Result<Self, ServiceError> {
        let mut base = Url::parse(base).map_err(|err| ServiceError::InvalidUrl(err.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ServiceError::Http(err.to_string()))?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base
            .join(path)
            .map_err(|err| ServiceError::InvalidUrl(err.to_string()))
    }

    pub async fn action(&self, action: ServiceAction) -> Result<ServiceReply, ServiceError> {
        let url = self.endpoint(action.as_str())?;
        debug!(event = "service_action_request", action = %action, url = %url);
        let resp = self
            .http
            .post(url)
            .header("content-type", "application/json")
            .send()
            .await
            .map_err(|err| ServiceError::Http(err.to_string()))?;
        read_json(resp).await
    }

    pub async fn status(&self) -> Result<ServiceStatus, ServiceError> {
        let url = self.endpoint("status")?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| ServiceError::Http(err.to_string()))?;
        read_json(resp).await
    }
}

/// Replies carry their own `success` flag, so a JSON body is honored even on
/// an error status.
async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|err| ServiceError::Http(err.to_string()))?;
    match serde_json::from_str::<T>(&body) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ServiceError::Api {
            status: status.as_u16(),
            message: body.trim().to_string(),
        }),
        Err(err) => Err(ServiceError::Parse(err.to_string())),
    }
}

/// Runs one action, then refreshes status. Results arrive on `events` in completion order.
pub fn spawn_action(client: ServiceClient, action: ServiceAction, events: mpsc::Sender<ServiceEvent>) {
    tokio::spawn(async move {
        let result = client.action(action).await;
        if let Err(err) = &result {
            warn!(event = "service_action_error", action = %action, error = %err);
        }
        let _ = events.send(ServiceEvent::ActionDone { action, result }).await;
        refresh_status(&client, &events).await;
    });
}

pub fn spawn_status(client: ServiceClient, events: mpsc::Sender<ServiceEvent>) {
    tokio::spawn(async move {
        refresh_status(&client, &events).await;
    });
}

async fn refresh_status(client: &ServiceClient, events: &mpsc::Sender<ServiceEvent>) {
    match client.status().await {
        Ok(status) => {
            let _ = events.send(ServiceEvent::Status(status)).await;
        }
        Err(err) => {
            warn!(event = "service_status_error", error = %err);
        }
    }
}
