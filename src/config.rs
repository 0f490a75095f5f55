// ⚙️ Configuration - secrets and knobs read once at process start

use crate::carriers::CarrierDirectory;
use crate::error::RouteError;
use crate::routing::GoogleDirectionsClient;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_API_KEY: &str = "GOOGLE_MAPS_API_KEY";
pub const ENV_PASSWORD: &str = "APP_PASSWORD";
pub const ENV_CARRIERS_FILE: &str = "ROUTES_CARRIERS_FILE";
pub const ENV_HTTP_TIMEOUT: &str = "ROUTES_HTTP_TIMEOUT_SECS";
pub const ENV_BIND_ADDR: &str = "ROUTES_BIND_ADDR";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directions API key. Absent → routing is unavailable (fatal at startup).
    pub maps_api_key: Option<String>,

    /// Shared dashboard password. Absent → the gate is open (local testing).
    pub password: Option<String>,

    /// Optional JSON file merged over the built-in carrier table
    pub carriers_file: Option<PathBuf>,

    pub http_timeout: Duration,

    pub bind_addr: String,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, RouteError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through any key → value lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RouteError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_timeout = match non_blank(ENV_HTTP_TIMEOUT) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    RouteError::Configuration(format!(
                        "{} must be a whole number of seconds, got {:?}",
                        ENV_HTTP_TIMEOUT, raw
                    ))
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(AppConfig {
            maps_api_key: non_blank(ENV_API_KEY).map(|k| k.trim().to_string()),
            password: lookup(ENV_PASSWORD).filter(|p| !p.is_empty()),
            carriers_file: non_blank(ENV_CARRIERS_FILE).map(PathBuf::from),
            http_timeout,
            bind_addr: non_blank(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }

    /// API key or a configuration error naming the variable to set
    pub fn require_api_key(&self) -> Result<&str, RouteError> {
        self.maps_api_key.as_deref().ok_or_else(|| {
            RouteError::Configuration(format!("{} is not set", ENV_API_KEY))
        })
    }

    /// Directions client every front end needs before it offers anything
    pub fn routing_client(&self) -> Result<GoogleDirectionsClient, RouteError> {
        GoogleDirectionsClient::new(self.require_api_key()?, self.http_timeout)
    }

    /// Built-in carrier table, plus the configured override file if any
    pub fn carrier_directory(&self) -> Result<CarrierDirectory, RouteError> {
        let directory = CarrierDirectory::new();
        match &self.carriers_file {
            Some(path) => directory.load_overrides(path),
            None => Ok(directory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, RouteError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert!(config.maps_api_key.is_none());
        assert!(config.password.is_none());
        assert!(config.carriers_file.is_none());
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_missing_api_key_is_a_configuration_error() {
        let config = config_from(&[(ENV_API_KEY, "   ")]).unwrap();
        let err = config.require_api_key().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains(ENV_API_KEY));
    }

    #[test]
    fn test_routing_client_needs_an_api_key() {
        let err = match config_from(&[]).unwrap().routing_client() {
            Ok(_) => panic!("client built without an API key"),
            Err(e) => e,
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("GOOGLE_MAPS_API_KEY is not set"));

        let config = config_from(&[(ENV_API_KEY, "abc123")]).unwrap();
        assert!(config.routing_client().is_ok());
    }

    #[test]
    fn test_values_are_read() {
        let config = config_from(&[
            (ENV_API_KEY, " abc123 "),
            (ENV_PASSWORD, "segreta"),
            (ENV_HTTP_TIMEOUT, "5"),
            (ENV_BIND_ADDR, "127.0.0.1:8080"),
        ])
        .unwrap();

        assert_eq!(config.require_api_key().unwrap(), "abc123");
        assert_eq!(config.password.as_deref(), Some("segreta"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let err = config_from(&[(ENV_HTTP_TIMEOUT, "soon")]).unwrap_err();
        assert!(matches!(err, RouteError::Configuration(_)));
    }

    #[test]
    fn test_missing_carriers_file_is_fatal() {
        let config = config_from(&[(ENV_CARRIERS_FILE, "/nonexistent/carriers.json")]).unwrap();
        assert!(config.carrier_directory().unwrap_err().is_fatal());
    }
}
