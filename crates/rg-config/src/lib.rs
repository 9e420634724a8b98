//! Rolegate Configuration System
//!
//! TOML-based configuration with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,

    /// Protected route rules
    pub routes: Vec<RouteRule>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Association store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(ConfigError::ValidationError(format!(
                "unknown store backend '{}' (expected memory or sqlite)",
                other
            ))),
        }
    }
}

/// Association store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite_url: String,
    pub max_connections: u32,
    pub query_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            sqlite_url: "sqlite://rolegate.db".to_string(),
            max_connections: 5,
            query_timeout_ms: 5000,
        }
    }
}

impl StoreConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Trusted header carrying the authenticated principal id
    pub principal_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            principal_header: "x-principal-id".to_string(),
        }
    }
}

/// A path guarded by a roles group. Role names are decoded by the
/// application's role type when the server starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteRule {
    pub path: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl RouteRule {
    /// Routing shape of `path` with parameter names erased. Two rules with the
    /// same shape match the same requests and cannot be routed side by side.
    ///
    /// Parameters are whole segments, `{name}` or a trailing `{*name}`.
    pub fn path_shape(&self) -> Result<String, ConfigError> {
        let invalid = |reason: &str| {
            ConfigError::ValidationError(format!("route path '{}' {}", self.path, reason))
        };

        let Some(rest) = self.path.strip_prefix('/') else {
            return Err(invalid("must start with '/'"));
        };

        let segments: Vec<&str> = rest.split('/').collect();
        let mut names = HashSet::new();
        let mut shape = String::new();

        for (i, segment) in segments.iter().enumerate() {
            shape.push('/');

            if segment.starts_with(':') || segment.starts_with('*') {
                return Err(invalid("uses ':' or '*' parameters; write {name} or {*name}"));
            }
            if !segment.contains(|c| c == '{' || c == '}') {
                shape.push_str(segment);
                continue;
            }

            let inner = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .ok_or_else(|| invalid("has a malformed parameter segment"))?;
            let (marker, name) = match inner.strip_prefix('*') {
                Some(name) => ("{*}", name),
                None => ("{}", inner),
            };

            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid("has an invalid parameter name"));
            }
            if marker == "{*}" && i + 1 != segments.len() {
                return Err(invalid("has a catch-all before the last segment"));
            }
            if !names.insert(name) {
                return Err(invalid("repeats a parameter name"));
            }
            shape.push_str(marker);
        }

        Ok(shape)
    }
}

/// Check that `routes` can be mounted on one router. Besides each path being
/// well formed, no two rules may share a shape, and parameters sitting at the
/// same position behind the same prefix must be spelled identically.
pub fn check_route_paths(routes: &[RouteRule]) -> Result<(), ConfigError> {
    let mut shapes = HashSet::new();
    let mut params: HashMap<String, &str> = HashMap::new();

    for (i, route) in routes.iter().enumerate() {
        if !shapes.insert(route.path_shape()?) {
            return Err(ConfigError::ValidationError(format!(
                "routes[{}].path '{}' overlaps an earlier route",
                i, route.path
            )));
        }

        let mut prefix = String::new();
        for segment in route.path.split('/').skip(1) {
            prefix.push('/');
            if !segment.starts_with('{') {
                prefix.push_str(segment);
                continue;
            }
            let seen = params.entry(prefix.clone()).or_insert(segment);
            if *seen != segment {
                return Err(ConfigError::ValidationError(format!(
                    "routes[{}].path '{}' uses {} where an earlier route uses {}",
                    i, route.path, segment, seen
                )));
            }
            prefix.push_str(if segment.starts_with("{*") { "{*}" } else { "{}" });
        }
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the standard locations with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Check values serde cannot reject on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "store.max_connections must be at least 1".to_string(),
            ));
        }
        if self.store.query_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "store.query_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.sqlite_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "store.sqlite_url is required for the sqlite backend".to_string(),
            ));
        }
        if self.auth.principal_header.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.principal_header must not be empty".to_string(),
            ));
        }
        check_route_paths(&self.routes)
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# Rolegate Configuration
# Environment variables (ROLEGATE_*) override these settings

[http]
port = 8080
host = "0.0.0.0"

[store]
backend = "memory"  # memory or sqlite
sqlite_url = "sqlite://rolegate.db"
max_connections = 5
query_timeout_ms = 5000

[auth]
principal_header = "x-principal-id"

# Each rule guards one path with a roles group: the caller must hold at least
# one "include" role and none of the "exclude" roles.
[[routes]]
path = "/members"
include = ["confirmed"]
exclude = ["unconfirmed"]

[[routes]]
path = "/admin"
include = ["admin"]
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.query_timeout(), Duration::from_secs(5));
        assert_eq!(config.auth.principal_header, "x-principal-id");
        assert!(config.routes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_sections() {
        let rendered = toml::to_string(&AppConfig::default()).unwrap();
        let table: toml::Table = toml::from_str(&rendered).unwrap();
        let mut keys: Vec<&str> = table.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["auth", "http", "routes", "store"]);

        let example: toml::Table = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert!(example.keys().all(|key| table.contains_key(key)));
    }

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.routes.len(), 2);
        assert_eq!(
            config.routes[0],
            RouteRule {
                path: "/members".to_string(),
                include: vec!["confirmed".to_string()],
                exclude: vec!["unconfirmed".to_string()],
            }
        );
        assert!(config.routes[1].exclude.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[store]\nbackend = \"sqlite\"\nmax_connections = 2").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.max_connections, 2);
        assert_eq!(config.store.query_timeout_ms, 5000);
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[store]\nbackend = \"mongodb\"");
        assert!(result.is_err());

        let parsed = "mongodb".parse::<StoreBackend>();
        assert!(matches!(parsed, Err(ConfigError::ValidationError(_))));
        assert_eq!("SQLite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        config.store.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = AppConfig::default();
        config.store.query_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.routes.push(RouteRule::default());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.routes.push(RouteRule {
            path: "members".to_string(),
            include: vec!["confirmed".to_string()],
            exclude: vec![],
        });
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.auth.principal_header.clear();
        assert!(config.validate().is_err());
    }

    fn rule(path: &str) -> RouteRule {
        RouteRule {
            path: path.to_string(),
            include: vec!["confirmed".to_string()],
            exclude: vec![],
        }
    }

    #[test]
    fn test_path_shape() {
        assert_eq!(rule("/").path_shape().unwrap(), "/");
        assert_eq!(rule("/members").path_shape().unwrap(), "/members");
        assert_eq!(rule("/teams/{team}/docs").path_shape().unwrap(), "/teams/{}/docs");
        assert_eq!(rule("/files/{*rest}").path_shape().unwrap(), "/files/{*}");
        assert_eq!(
            rule("/{a}/x").path_shape().unwrap(),
            rule("/{b}/x").path_shape().unwrap()
        );
    }

    #[test]
    fn test_path_shape_rejects_unroutable_paths() {
        for path in [
            "",
            "members",
            "/:id",
            "/*rest",
            "/a/{",
            "/a/}",
            "/a/{}",
            "/a/{b}{c}",
            "/a/{b}.json",
            "/{*rest}/x",
            "/{id}/{id}",
        ] {
            let result = rule(path).path_shape();
            assert!(
                matches!(result, Err(ConfigError::ValidationError(_))),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_validate_rejects_overlapping_routes() {
        let mut config = AppConfig::default();
        config.routes = vec![rule("/{a}"), rule("/{b}")];
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        config.routes = vec![rule("/{a}"), rule("/{b}/x")];
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        config.routes = vec![rule("/files/{id}"), rule("/files/{*rest}")];
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        config.routes = vec![rule("/{a}/x"), rule("/{a}/y"), rule("/x"), rule("/x/{b}")];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::from_file("/nonexistent/rolegate.toml");
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
