use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URI, e.g. `sqlite:data/files.db?mode=rwc`
    #[serde(default)]
    pub uri: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// S3 bucket and credentials
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, localstack). Switches to path-style addressing.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| env::var(key).ok());
        config.ensure_required()?;
        tracing::info!(
            "Storage config: bucket={}, region={}, endpoint={:?}",
            config.storage.bucket,
            config.storage.region,
            config.storage.endpoint
        );
        Ok(config)
    }

    /// Load configuration from config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using environment only");
        Ok(Config::default())
    }

    /// Apply overrides from `lookup`, normally the process environment.
    ///
    /// Connection and bucket settings use the plain names the deployment
    /// environment provides; server tuning uses `FS_CONF_<SECTION>_<KEY>`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("FS_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("FS_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        if let Some(val) = lookup("DATABASE_URI") {
            self.database.uri = val;
        }
        if let Some(val) = lookup("FS_CONF_DATABASE_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                self.database.max_connections = max;
            }
        }

        if let Some(val) = lookup("BUCKET_NAME") {
            self.storage.bucket = val;
        }
        if let Some(val) = lookup("REGION") {
            self.storage.region = val;
        }
        if let Some(val) = lookup("S3_ENDPOINT") {
            if !val.trim().is_empty() {
                self.storage.endpoint = Some(val);
            }
        }
        if let Some(val) = lookup("AWS_ACCESS_KEY_ID") {
            self.storage.access_key_id = val;
        }
        if let Some(val) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = val;
        }
        if let Some(val) = lookup("AWS_SESSION_TOKEN") {
            if !val.trim().is_empty() {
                self.storage.session_token = Some(val);
            }
        }
    }

    /// Required settings have no defaults; only presence is checked.
    fn ensure_required(&self) -> anyhow::Result<()> {
        let required = [
            ("DATABASE_URI", &self.database.uri),
            ("BUCKET_NAME", &self.storage.bucket),
            ("REGION", &self.storage.region),
            ("AWS_ACCESS_KEY_ID", &self.storage.access_key_id),
            ("AWS_SECRET_ACCESS_KEY", &self.storage.secret_access_key),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            anyhow::bail!("Missing required configuration: {}", missing.join(", "));
        }
        Ok(())
    }
}
