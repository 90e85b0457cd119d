use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::simulation::RewardPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Reads `APP_*` and `SIM_*` variables, after loading a `.env` file when one exists.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port = var_or("APP_PORT", "3000")
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        Ok(Self {
            environment: AppEnvironment::from_str(&var_or("APP_ENV", "development")),
            server: ServerConfig {
                host: var_or("APP_HOST", "127.0.0.1"),
                port,
            },
            telemetry: TelemetryConfig {
                log_level: var_or("APP_LOG_LEVEL", "info"),
            },
            simulation: SimulationConfig::from_env()?,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Engine settings: reward amounts and an optional extra scenario file.
#[derive(Debug, Clone, Default)]
pub struct SimulationConfig {
    pub rewards: RewardPolicy,
    pub scenario_file: Option<PathBuf>,
}

impl SimulationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = RewardPolicy::default();
        let rewards = RewardPolicy {
            beginner_xp: xp_from_env("SIM_XP_BEGINNER", defaults.beginner_xp)?,
            intermediate_xp: xp_from_env("SIM_XP_INTERMEDIATE", defaults.intermediate_xp)?,
            advanced_xp: xp_from_env("SIM_XP_ADVANCED", defaults.advanced_xp)?,
        };
        let scenario_file = env::var("SIM_SCENARIO_FILE")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            rewards,
            scenario_file,
        })
    }
}

fn xp_from_env(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidRewardXp { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRewardXp { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRewardXp { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidRewardXp { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
