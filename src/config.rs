//! Configuration for the NFL tracking API.

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// PostgreSQL connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Production deployments require TLS; otherwise TLS is opportunistic.
    #[serde(default)]
    pub production: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            name: None,
            user: None,
            password: None,
            production: false,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Analytics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Season served by the games listing
    #[serde(default = "default_season")]
    pub season: i32,
}

fn default_season() -> i32 {
    2023
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            season: default_season(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl AppConfig {
    /// Load configuration from defaults, config file and environment
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env is normal outside local development
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (NFL_SERVER__PORT, NFL_DATABASE__HOST, etc.)
            .add_source(
                config::Environment::with_prefix("NFL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;
        config.apply_deployment_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply the conventional PG*/PORT/RAILWAY_ENVIRONMENT variables.
    ///
    /// These take precedence over everything else since hosting platforms
    /// inject them directly.
    pub fn apply_deployment_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PGHOST").filter(|v| !v.is_empty()) {
            self.database.host = host;
        }
        if let Some(port) = lookup("PGPORT").filter(|v| !v.is_empty()) {
            self.database.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PGPORT {:?}: {}", port, e))?;
        }
        if let Some(name) = lookup("PGDATABASE").filter(|v| !v.is_empty()) {
            self.database.name = Some(name);
        }
        if let Some(user) = lookup("PGUSER").filter(|v| !v.is_empty()) {
            self.database.user = Some(user);
        }
        if let Some(password) = lookup("PGPASSWORD") {
            self.database.password = Some(password);
        }
        if lookup("RAILWAY_ENVIRONMENT").is_some() {
            self.database.production = true;
        }
        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            self.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT {:?}: {}", port, e))?;
        }
        Ok(())
    }
}
