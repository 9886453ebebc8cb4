use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Earthquake bulletin page to scrape
    #[serde(default = "default_bulletin_url")]
    pub bulletin_url: String,

    /// Background poll period in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Snapshot cache TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Total fetch attempts per refresh
    #[serde(default = "default_fetch_max_attempts")]
    pub fetch_max_attempts: u32,

    /// Fixed delay between fetch attempts in seconds
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8060
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bulletin_url() -> String {
    "https://earthquake.phivolcs.dost.gov.ph/".to_string()
}

fn default_poll_interval_secs() -> u64 {
    20
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_fetch_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            bulletin_url: default_bulletin_url(),
            poll_interval_secs: default_poll_interval_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            fetch_max_attempts: default_fetch_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file; a missing file yields the
    /// defaults so the server runs without any local setup.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: Config = toml::from_str(&content)
                    .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path, e))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Config file '{}' not found, using defaults", path);
                Ok(Config::default())
            }
            Err(e) => Err(anyhow::anyhow!("Failed to read config file '{}': {}", path, e)),
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
