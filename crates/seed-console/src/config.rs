use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DeploymentMode {
    /// Each backend service on its own port.
    Direct,
    /// Everything behind one TLS reverse proxy.
    Proxied,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "seed-console")]
#[command(about = "Terminal console for observing and steering AI-vs-AI matches", long_about = None)]
pub struct Args {
    #[arg(long, env = "SEED_HOST", default_value = "localhost")]
    pub host: String,
    #[arg(long, env = "SEED_DEPLOYMENT", value_enum, default_value_t = DeploymentMode::Direct)]
    pub deployment: DeploymentMode,
    #[arg(long, env = "SEED_WS_URL")]
    pub ws_url: Option<String>,
    #[arg(long, env = "SEED_SERVICE_URL")]
    pub service_url: Option<String>,
    #[arg(long, env = "SEED_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
    #[arg(long, env = "SEED_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 5)]
    pub reconnect_secs: u64,
    #[arg(long, default_value_t = 10)]
    pub status_poll_secs: u64,
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {name} url '{value}': {reason}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ws_url: String,
    pub service_url: String,
    pub vnc_url: String,
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
    pub reconnect_delay: Duration,
    pub status_poll_interval: Duration,
    pub debug: bool,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let host = args.host.trim();
        let host = if host.is_empty() { "localhost" } else { host };

        let ws_url = match args.ws_url.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(url) => url.to_string(),
            None => default_ws_url(args.deployment, host),
        };
        validate_url("socket", &ws_url, &["ws", "wss"])?;

        let service_url = match args
            .service_url
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            Some(url) => url.to_string(),
            None => default_service_url(args.deployment, host),
        };
        validate_url("service", &service_url, &["http", "https"])?;

        let state_dir = args.state_dir.unwrap_or_else(resolve_state_dir);
        let log_dir = args.log_dir.unwrap_or_else(|| state_dir.join("logs"));

        Ok(Self {
            ws_url,
            service_url,
            vnc_url: vnc_url(args.deployment, host),
            state_dir,
            log_dir,
            reconnect_delay: Duration::from_secs(args.reconnect_secs.max(1)),
            status_poll_interval: Duration::from_secs(args.status_poll_secs.max(1)),
            debug: args.debug,
        })
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.state_dir.join(PREFERENCES_FILE)
    }
}

pub fn default_ws_url(mode: DeploymentMode, host: &str) -> String {
    match mode {
        DeploymentMode::Direct => format!("ws://{host}:8090"),
        DeploymentMode::Proxied => format!("wss://{host}/api/"),
    }
}

pub fn default_service_url(mode: DeploymentMode, host: &str) -> String {
    match mode {
        DeploymentMode::Direct => format!("http://{host}:8087/api/"),
        DeploymentMode::Proxied => format!("https://{host}/service/api/"),
    }
}

pub fn vnc_url(mode: DeploymentMode, host: &str) -> String {
    match mode {
        DeploymentMode::Direct => {
            format!("http://{host}:6080/vnc.html?autoconnect=true&resize=scale")
        }
        DeploymentMode::Proxied => {
            format!("https://{host}/vnc/vnc.html?autoconnect=true&resize=scale&path=vnc/")
        }
    }
}

fn validate_url(name: &'static str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|err| invalid(err.to_string()))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(format!(
            "scheme must be one of {}",
            schemes.join(", ")
        )));
    }
    Ok(())
}

pub fn resolve_state_dir() -> PathBuf {
    state_dir_from(
        std::env::var("XDG_STATE_HOME").ok(),
        std::env::var("HOME").ok(),
    )
}

fn state_dir_from(xdg_state_home: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(value) = xdg_state_home {
        if !value.trim().is_empty() {
            return PathBuf::from(value).join("seed");
        }
    }
    if let Some(value) = home {
        return PathBuf::from(value)
            .join(".local")
            .join("state")
            .join("seed");
    }
    PathBuf::from(".seed/state")
}
