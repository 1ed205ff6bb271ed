use std::path::PathBuf;
use std::str::FromStr;

use quarry_client::browser_fetcher::DEFAULT_MAX_BROWSERS;
use quarry_core::AppError;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SITES_PATH: &str = "config/sites.json";

/// Which result cache the server runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Memory,
    Postgres,
    Disabled,
}

impl FromStr for CacheMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            "none" | "disabled" => Ok(Self::Disabled),
            other => Err(AppError::ConfigError(format!(
                "Invalid QUARRY_CACHE '{other}': expected memory, postgres, or none"
            ))),
        }
    }
}

/// Allowed CORS origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            Self::Any
        } else {
            Self::List(origins)
        }
    }
}

/// Server settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub sites_path: PathBuf,
    pub cors: CorsOrigins,
    pub cache: CacheMode,
    pub max_browsers: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let port = match lookup("QUARRY_SERVER_PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid QUARRY_SERVER_PORT '{raw}'"))
            })?,
        };

        let max_browsers = match lookup("QUARRY_MAX_BROWSERS") {
            None => DEFAULT_MAX_BROWSERS,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(AppError::ConfigError(format!(
                        "Invalid QUARRY_MAX_BROWSERS '{raw}': must be a positive integer"
                    )));
                }
            },
        };

        let cache = match lookup("QUARRY_CACHE") {
            None => CacheMode::Memory,
            Some(raw) => raw.parse()?,
        };

        Ok(Self {
            port,
            sites_path: lookup("QUARRY_SITES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SITES_PATH)),
            cors: CorsOrigins::parse(&lookup("CORS_ORIGIN").unwrap_or_else(|| "*".into())),
            cache,
            max_browsers,
        })
    }
}
