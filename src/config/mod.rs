use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Prefix of `DATABASE_URL` values that select the in-memory store.
pub const MEMORY_URL_PREFIX: &str = "memory:";

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,
    /// Upper bound for the PostgreSQL connection pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Default tracing filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// File that receives log output while the terminal UI owns the screen
    #[serde(default)]
    pub log_file: Option<String>,
    /// Apply pending migrations on start-up
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if the file exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        Self::from_pairs(std::env::vars())
    }

    /// Build a configuration from explicit key/value pairs
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(pairs)?;

        Ok(config)
    }

    /// Get a direct reference to the database URL
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Whether the configured URL points at the in-memory store
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with(MEMORY_URL_PREFIX)
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = Config::from_pairs(pairs(&[(
            "DATABASE_URL",
            "postgres://localhost/invoices",
        )]))
        .expect("config loads");

        assert_eq!(config.database_url(), "postgres://localhost/invoices");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.log_level, "info");
        assert!(config.log_file.is_none());
        assert!(!config.run_migrations);
        assert!(!config.uses_memory_store());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = Config::from_pairs(pairs(&[
            ("DATABASE_URL", "memory:"),
            ("MAX_CONNECTIONS", "12"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FILE", "/tmp/invoice_desk.log"),
            ("RUN_MIGRATIONS", "true"),
        ]))
        .expect("config loads");

        assert_eq!(config.max_connections, 12);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_file.as_deref(), Some("/tmp/invoice_desk.log"));
        assert!(config.run_migrations);
        assert!(config.uses_memory_store());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert!(Config::from_pairs(pairs(&[("LOG_LEVEL", "warn")])).is_err());
    }
}
