use crate::link::ReconnectPolicy;
use clap::{Parser, ValueEnum};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_RECONNECT_MS: u64 = 3000;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 10_000;
pub const DEFAULT_LOG_DIR: &str = ".conveyor/logs";

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "conveyor-monitor", about = "Live dashboard for the conveyor sequencing simulation")]
pub struct Args {
    /// Full WebSocket endpoint; overrides --host/--port.
    #[arg(long, default_value = "")]
    pub url: String,
    #[arg(long, default_value = "")]
    pub host: String,
    #[arg(long)]
    pub port: Option<u16>,
    /// Delay before reconnecting after the link drops.
    #[arg(long)]
    pub reconnect_ms: Option<u64>,
    #[arg(long, value_enum)]
    pub backoff: Option<BackoffMode>,
    #[arg(long, default_value = "")]
    pub log_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackoffMode {
    Fixed,
    Exponential,
}

impl BackoffMode {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(BackoffMode::Fixed),
            "exponential" | "exp" => Ok(BackoffMode::Exponential),
            other => Err(ConfigError::Backoff(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub dir: String,
    pub stdout: bool,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub url: Url,
    pub reconnect: ReconnectPolicy,
    pub log: LogConfig,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid endpoint url {url:?}: {reason}")]
    Url { url: String, reason: String },
    #[error("endpoint must use ws:// or wss://, got {0:?}")]
    Scheme(String),
    #[error("invalid port {0:?}")]
    Port(String),
    #[error("invalid reconnect delay {0:?}")]
    ReconnectDelay(String),
    #[error("unknown backoff mode {0:?} (expected fixed or exponential)")]
    Backoff(String),
}

impl MonitorConfig {
    pub fn from_env(args: Args) -> Result<Self, ConfigError> {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    /// Flags win over environment, environment wins over defaults.
    pub fn resolve<F>(args: Args, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());
        let url = resolve_url(&args, &env)?;
        let reconnect = resolve_reconnect(&args, &env)?;
        let log = LogConfig {
            dir: resolve_log_dir(&args.log_dir, env("CONVEYOR_LOG_DIR")),
            stdout: resolve_log_stdout(env("CONVEYOR_LOG_STDOUT").as_deref()),
            level: env("CONVEYOR_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };
        Ok(Self {
            url,
            reconnect,
            log,
        })
    }
}

fn resolve_url<F>(args: &Args, env: &F) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit = if !args.url.trim().is_empty() {
        Some(args.url.trim().to_string())
    } else {
        env("CONVEYOR_URL")
    };
    let raw = match explicit {
        Some(raw) => raw,
        None => {
            let host = if !args.host.trim().is_empty() {
                args.host.trim().to_string()
            } else {
                env("CONVEYOR_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string())
            };
            let port = match args.port {
                Some(port) => port,
                None => match env("CONVEYOR_PORT") {
                    Some(raw) => raw
                        .trim()
                        .parse::<u16>()
                        .map_err(|_| ConfigError::Port(raw))?,
                    None => DEFAULT_PORT,
                },
            };
            format!("ws://{host}:{port}/ws")
        }
    };
    let url = Url::parse(&raw).map_err(|err| ConfigError::Url {
        url: raw.clone(),
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::Scheme(other.to_string())),
    }
}

fn resolve_reconnect<F>(args: &Args, env: &F) -> Result<ReconnectPolicy, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let delay_ms = match args.reconnect_ms {
        Some(ms) => ms,
        None => match env("CONVEYOR_RECONNECT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::ReconnectDelay(raw))?,
            None => DEFAULT_RECONNECT_MS,
        },
    };
    if delay_ms == 0 {
        return Err(ConfigError::ReconnectDelay("0".to_string()));
    }
    let mode = match args.backoff {
        Some(mode) => mode,
        None => match env("CONVEYOR_BACKOFF") {
            Some(raw) => BackoffMode::parse(&raw)?,
            None => BackoffMode::Fixed,
        },
    };
    let delay = Duration::from_millis(delay_ms);
    Ok(match mode {
        BackoffMode::Fixed => ReconnectPolicy::Fixed(delay),
        BackoffMode::Exponential => ReconnectPolicy::Exponential {
            initial: delay,
            max: delay.max(Duration::from_millis(DEFAULT_BACKOFF_MAX_MS)),
        },
    })
}

fn resolve_log_dir(flag: &str, env_value: Option<String>) -> String {
    if !flag.trim().is_empty() {
        return flag.to_string();
    }
    env_value.unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
}

fn resolve_log_stdout(value: Option<&str>) -> bool {
    matches!(
        value.map(str::trim),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve_with(args: Args, vars: &[(&str, &str)]) -> Result<MonitorConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MonitorConfig::resolve(args, |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_point_at_local_simulation() {
        let config = resolve_with(Args::default(), &[]).expect("config");
        assert_eq!(config.url.as_str(), "ws://localhost:8000/ws");
        assert_eq!(
            config.reconnect,
            ReconnectPolicy::Fixed(Duration::from_millis(3000))
        );
        assert_eq!(config.log.dir, ".conveyor/logs");
        assert!(!config.log.stdout);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn flags_override_environment() {
        let args = Args {
            host: "sim.internal".to_string(),
            port: Some(9001),
            ..Args::default()
        };
        let config = resolve_with(
            args,
            &[("CONVEYOR_HOST", "ignored"), ("CONVEYOR_PORT", "1234")],
        )
        .expect("config");
        assert_eq!(config.url.as_str(), "ws://sim.internal:9001/ws");

        let config = resolve_with(
            Args::default(),
            &[("CONVEYOR_HOST", "10.0.0.5"), ("CONVEYOR_PORT", "8100")],
        )
        .expect("config");
        assert_eq!(config.url.as_str(), "ws://10.0.0.5:8100/ws");
    }

    #[test]
    fn explicit_url_wins_over_host_and_port() {
        let args = Args {
            url: "wss://plant.example/live".to_string(),
            host: "other".to_string(),
            ..Args::default()
        };
        let config = resolve_with(args, &[]).expect("config");
        assert_eq!(config.url.as_str(), "wss://plant.example/live");
    }

    #[test]
    fn rejects_bad_endpoints() {
        let args = Args {
            url: "http://localhost:8000/ws".to_string(),
            ..Args::default()
        };
        assert_eq!(
            resolve_with(args, &[]),
            Err(ConfigError::Scheme("http".to_string()))
        );
        assert!(matches!(
            resolve_with(Args::default(), &[("CONVEYOR_PORT", "eighty")]),
            Err(ConfigError::Port(_))
        ));
        assert!(matches!(
            resolve_with(Args::default(), &[("CONVEYOR_URL", "not a url")]),
            Err(ConfigError::Url { .. })
        ));
    }

    #[test]
    fn exponential_backoff_is_opt_in() {
        let config = resolve_with(
            Args::default(),
            &[("CONVEYOR_BACKOFF", "exponential"), ("CONVEYOR_RECONNECT_MS", "500")],
        )
        .expect("config");
        assert_eq!(
            config.reconnect,
            ReconnectPolicy::Exponential {
                initial: Duration::from_millis(500),
                max: Duration::from_secs(10),
            }
        );
        assert!(matches!(
            resolve_with(Args::default(), &[("CONVEYOR_BACKOFF", "jitter")]),
            Err(ConfigError::Backoff(_))
        ));
        assert!(matches!(
            resolve_with(Args::default(), &[("CONVEYOR_RECONNECT_MS", "0")]),
            Err(ConfigError::ReconnectDelay(_))
        ));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let config = resolve_with(
            Args::default(),
            &[("CONVEYOR_HOST", "  "), ("CONVEYOR_LOG_STDOUT", "yes")],
        )
        .expect("config");
        assert_eq!(config.url.host_str(), Some("localhost"));
        assert!(config.log.stdout);
    }
}
