use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const fn default_interval() -> Duration {
    Duration::from_secs(600)
}

const DEFAULT_NODE_EXPORTER_PORT: u16 = 9100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}, {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Per-generator settings for the blackbox exporter targets file.
#[derive(Clone, Debug)]
pub struct BlackboxConfig {
    pub enabled: bool,
    pub output: PathBuf,
}

/// Per-generator settings for the node exporter targets file.
#[derive(Clone, Debug)]
pub struct NodeExporterConfig {
    pub enabled: bool,
    pub output: PathBuf,
    pub ports: Vec<u16>,
}

/// Process-wide configuration, loaded once at startup and immutable
/// afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the Remnawave API, without a trailing slash.
    pub endpoint: String,
    /// Bearer token for the Remnawave API.
    pub token: String,
    /// Delay between two update cycles.
    pub interval: Duration,
    /// When false, nodes flagged `isDisabled` never reach the generators.
    pub include_disabled: bool,

    pub blackbox: BlackboxConfig,
    pub node_exporter: NodeExporterConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|name| std::env::var(name).ok())
    }

    fn load<L: Fn(&'static str) -> Option<String>>(lookup: L) -> Result<Self, ConfigError> {
        let endpoint = lookup("REMNA_API_URL")
            .ok_or(ConfigError::Missing("REMNA_API_URL"))?
            .trim_end_matches('/')
            .to_string();
        let token = lookup("REMNA_API_TOKEN").ok_or(ConfigError::Missing("REMNA_API_TOKEN"))?;

        let interval = match lookup("UPDATE_INTERVAL") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_err) => {
                    return Err(ConfigError::Invalid {
                        name: "UPDATE_INTERVAL",
                        value,
                        reason: "not a whole number of seconds",
                    });
                }
            },
            None => default_interval(),
        };

        let include_disabled = parse_bool("INCLUDE_DISABLED", &lookup, true)?;

        let blackbox = BlackboxConfig {
            enabled: parse_bool("BLACKBOX_ENABLED", &lookup, true)?,
            output: lookup("BLACKBOX_OUTPUT")
                .unwrap_or_else(|| "generated/blackbox.yml".to_string())
                .into(),
        };

        let node_exporter = NodeExporterConfig {
            enabled: parse_bool("NODE_EXPORTER_ENABLED", &lookup, true)?,
            output: lookup("NODE_EXPORTER_OUTPUT")
                .unwrap_or_else(|| "generated/node_exporter.yml".to_string())
                .into(),
            ports: match lookup("NODE_EXPORTER_PORTS") {
                Some(value) => parse_ports(&value)?,
                None => vec![DEFAULT_NODE_EXPORTER_PORT],
            },
        };

        Ok(Config {
            endpoint,
            token,
            interval,
            include_disabled,
            blackbox,
            node_exporter,
        })
    }
}

fn parse_bool<L: Fn(&'static str) -> Option<String>>(
    name: &'static str,
    lookup: &L,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(name) {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                value,
                reason: "expected true, false, 1 or 0",
            }),
        },
        None => Ok(default),
    }
}

fn parse_ports(value: &str) -> Result<Vec<u16>, ConfigError> {
    let mut ports = Vec::new();

    for part in value.split(',') {
        match part.trim().parse::<u16>() {
            Ok(port) => ports.push(port),
            Err(_err) => {
                return Err(ConfigError::Invalid {
                    name: "NODE_EXPORTER_PORTS",
                    value: value.to_string(),
                    reason: "expected a comma separated list of ports",
                });
            }
        }
    }

    if ports.is_empty() {
        return Err(ConfigError::Invalid {
            name: "NODE_EXPORTER_PORTS",
            value: value.to_string(),
            reason: "port list is empty",
        });
    }

    Ok(ports)
}
