//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError, RouteRule};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "rolegate.toml",
    "config.toml",
    "./config/rolegate.toml",
    "/etc/rolegate/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found), apply environment overrides,
    /// then validate the result
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match self.find_config_file() {
            Some(path) => {
                info!(?path, "Loading configuration from file");
                AppConfig::from_file(&path)?
            }
            None => AppConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("ROLEGATE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        // HTTP
        if let Ok(val) = env::var("ROLEGATE_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http.port = port;
            }
        }
        if let Ok(val) = env::var("ROLEGATE_HTTP_HOST") {
            config.http.host = val;
        }

        // Store
        if let Ok(val) = env::var("ROLEGATE_STORE_BACKEND") {
            config.store.backend = val.parse()?;
        }
        if let Ok(val) = env::var("ROLEGATE_SQLITE_URL") {
            config.store.sqlite_url = val;
        }
        if let Ok(val) = env::var("ROLEGATE_STORE_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                config.store.max_connections = max;
            }
        }
        if let Ok(val) = env::var("ROLEGATE_STORE_QUERY_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                config.store.query_timeout_ms = timeout;
            }
        }

        // Auth
        if let Ok(val) = env::var("ROLEGATE_PRINCIPAL_HEADER") {
            config.auth.principal_header = val;
        }

        // Routes, as `;`-separated compact rules
        if let Ok(val) = env::var("ROLEGATE_ROUTES") {
            config.routes = val
                .split(';')
                .filter(|rule| !rule.trim().is_empty())
                .map(str::parse)
                .collect::<Result<_, _>>()?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a route rule from its compact form `path:include1,include2:exclude1`
impl std::str::FromStr for RouteRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let path = parts.next().unwrap_or_default().trim().to_string();
        let list = |part: Option<&str>| -> Vec<String> {
            part.unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect()
        };
        let include = list(parts.next());
        let exclude = list(parts.next());

        if path.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "route rule '{}' has no path",
                s
            )));
        }

        Ok(RouteRule {
            path,
            include,
            exclude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreBackend;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_explicit_path_and_env_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[http]\nport = 9000\n\n[[routes]]\npath = \"/members\"\ninclude = [\"confirmed\"]"
        )
        .unwrap();

        let loader = ConfigLoader::with_path(file.path());
        let config = loader.load().unwrap();
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.routes.len(), 1);

        // Env overrides are applied on top of the file
        env::set_var("ROLEGATE_STORE_QUERY_TIMEOUT_MS", "250");
        env::set_var("ROLEGATE_PRINCIPAL_HEADER", "x-user");
        let config = loader.load().unwrap();
        assert_eq!(config.store.query_timeout_ms, 250);
        assert_eq!(config.auth.principal_header, "x-user");
        assert_eq!(config.http.port, 9000);

        env::set_var("ROLEGATE_STORE_BACKEND", "sqlite");
        assert_eq!(loader.load().unwrap().store.backend, StoreBackend::Sqlite);

        env::set_var("ROLEGATE_STORE_BACKEND", "postgres");
        assert!(matches!(loader.load(), Err(ConfigError::ValidationError(_))));

        env::set_var("ROLEGATE_STORE_QUERY_TIMEOUT_MS", "0");
        env::remove_var("ROLEGATE_STORE_BACKEND");
        assert!(matches!(loader.load(), Err(ConfigError::ValidationError(_))));

        env::remove_var("ROLEGATE_STORE_QUERY_TIMEOUT_MS");
        env::set_var("ROLEGATE_ROUTES", "/members:confirmed:unconfirmed; /admin:admin");
        let config = loader.load().unwrap();
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[1].path, "/admin");

        env::remove_var("ROLEGATE_ROUTES");
        env::remove_var("ROLEGATE_PRINCIPAL_HEADER");
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[http\nport = ").unwrap();

        let result = ConfigLoader::with_path(file.path()).load();
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_route_rule_compact_form() {
        let rule: RouteRule = "/members:confirmed:unconfirmed".parse().unwrap();
        assert_eq!(rule.path, "/members");
        assert_eq!(rule.include, vec!["confirmed"]);
        assert_eq!(rule.exclude, vec!["unconfirmed"]);

        let rule: RouteRule = "/staff: admin , confirmed".parse().unwrap();
        assert_eq!(rule.include, vec!["admin", "confirmed"]);
        assert!(rule.exclude.is_empty());

        assert!(":admin".parse::<RouteRule>().is_err());
    }
}
