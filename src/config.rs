//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// TTL in seconds for full listing payloads
    pub result_ttl: i64,
    /// TTL in seconds for listing totals
    pub count_ttl: i64,
    /// TTL in seconds for tag name to id mappings
    pub tag_ttl: i64,
    /// Page size used when a request does not ask for one
    pub default_page_limit: u32,
    /// Upper bound on the page size a request may ask for
    pub max_page_limit: u32,
    /// JSON file holding the catalog snapshot served by the binary
    pub catalog_path: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `RESULT_TTL` - Listing payload TTL in seconds (default: 900)
    /// - `COUNT_TTL` - Listing total TTL in seconds (default: 120)
    /// - `TAG_TTL` - Tag mapping TTL in seconds (default: 86400)
    /// - `DEFAULT_PAGE_LIMIT` - Default page size (default: 20)
    /// - `MAX_PAGE_LIMIT` - Largest accepted page size (default: 100)
    /// - `CATALOG_PATH` - Catalog snapshot file (default: unset, empty catalog)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            result_ttl: env_or("RESULT_TTL", defaults.result_ttl),
            count_ttl: env_or("COUNT_TTL", defaults.count_ttl),
            tag_ttl: env_or("TAG_TTL", defaults.tag_ttl),
            default_page_limit: env_or("DEFAULT_PAGE_LIMIT", defaults.default_page_limit),
            max_page_limit: env_or("MAX_PAGE_LIMIT", defaults.max_page_limit),
            catalog_path: env::var("CATALOG_PATH").ok().filter(|path| !path.is_empty()),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            result_ttl: 900,
            count_ttl: 120,
            tag_ttl: 86_400,
            default_page_limit: 20,
            max_page_limit: 100,
            catalog_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.result_ttl, 900);
        assert_eq!(config.count_ttl, 120);
        assert_eq!(config.tag_ttl, 86_400);
        assert_eq!(config.default_page_limit, 20);
        assert_eq!(config.max_page_limit, 100);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_count_ttl_is_shortest() {
        let config = Config::default();
        assert!(config.count_ttl < config.result_ttl);
        assert!(config.result_ttl < config.tag_ttl);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("CATALOG_PAGER_TEST_PORT", "not-a-port");
        assert_eq!(env_or("CATALOG_PAGER_TEST_PORT", 8080u16), 8080);

        env::set_var("CATALOG_PAGER_TEST_PORT", "9090");
        assert_eq!(env_or("CATALOG_PAGER_TEST_PORT", 8080u16), 9090);

        env::remove_var("CATALOG_PAGER_TEST_PORT");
        assert_eq!(env_or("CATALOG_PAGER_TEST_PORT", 8080u16), 8080);
    }
}
