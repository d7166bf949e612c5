//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use plebis_core::{HttpConfig, RestartPolicy};
use plebis_erowid::HarvestConfig;
use plebis_search::BatchConfig;
use serde::Deserialize;

/// Global configuration for plebis
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub search: SearchConfig,
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    /// Pause after each page that yielded a report
    pub delay_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let http = HttpConfig::default();
        Self {
            base_url: http.base_url,
            delay_ms: 500,
            connect_timeout_secs: http.connect_timeout.as_secs(),
            request_timeout_secs: http.request_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub url: String,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/plebiscite".to_string(),
            max_connections: 70,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub host: String,
    pub index: String,
    /// Mapping type on bulk action lines; empty omits it
    pub doc_type: String,
    pub flush_interval_ms: u64,
    pub max_batch: usize,
    pub queue_capacity: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let batch = BatchConfig::default();
        Self {
            host: "localhost:9200".to_string(),
            index: "reports".to_string(),
            doc_type: "report".to_string(),
            flush_interval_ms: batch.interval.as_millis() as u64,
            max_batch: batch.max_batch,
            queue_capacity: batch.queue_capacity,
            max_retries: batch.max_retries,
            timeout_secs: 60,
        }
    }
}

impl SearchConfig {
    pub fn doc_type(&self) -> Option<&str> {
        Some(self.doc_type.as_str()).filter(|t| !t.is_empty())
    }

    pub fn batch(&self) -> BatchConfig {
        BatchConfig {
            interval: Duration::from_millis(self.flush_interval_ms),
            max_batch: self.max_batch.max(1),
            queue_capacity: self.queue_capacity,
            max_retries: self.max_retries,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub count: usize,
    pub start: u64,
    pub end: u64,
    /// Consecutive worker failures tolerated while each incarnation
    /// dies within `restart_window_secs`
    pub max_restarts: u32,
    pub restart_window_secs: u64,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        let policy = RestartPolicy::default();
        Self {
            count: 64,
            start: 1,
            end: 200_000,
            max_restarts: policy.max_restarts,
            restart_window_secs: policy.window.as_secs(),
        }
    }
}

/// Deserialize a string that may be an environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    expand_env_var(&s).ok_or_else(|| serde::de::Error::custom(format!("{s} is not set")))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./plebis.toml (current directory)
    /// 2. ~/.config/plebis/config.toml
    ///
    /// If no config file found, returns default config.
    /// `DATABASE_URL` and `ES_HOST` override the file either way.
    pub fn load() -> Result<Self> {
        Ok(Self::find()?.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Load a specific file, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::from_file(path)?.with_env_overrides(|name| std::env::var(name).ok()))
    }

    fn find() -> Result<Self> {
        let local_config = PathBuf::from("plebis.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "plebis") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.store.url = url;
        }
        if let Some(host) = lookup("ES_HOST").filter(|v| !v.is_empty()) {
            self.search.host = host;
        }
        self
    }

    pub fn harvest(&self) -> HarvestConfig {
        HarvestConfig {
            start: self.workers.start,
            end: self.workers.end,
            workers: self.workers.count,
            delay: Duration::from_millis(self.source.delay_ms),
            http: HttpConfig {
                base_url: self.source.base_url.clone(),
                connect_timeout: Duration::from_secs(self.source.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.source.request_timeout_secs),
            },
            index_name: self.search.index.clone(),
            doc_type: self.search.doc_type().map(str::to_string),
            batch: self.search.batch(),
            restart: RestartPolicy {
                max_restarts: self.workers.max_restarts,
                window: Duration::from_secs(self.workers.restart_window_secs),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.store.url, "postgres://localhost:5432/plebiscite");
        assert_eq!(config.search.host, "localhost:9200");
        assert_eq!(config.workers.count, 64);

        let harvest = config.harvest();
        assert_eq!(harvest.id_range(), 1..200_000);
        assert_eq!(harvest.delay, Duration::from_millis(500));
        assert_eq!(harvest.doc_type.as_deref(), Some("report"));
        assert_eq!(harvest.batch.max_batch, 500);
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn env_overrides() {
        let config = Config::default().with_env_overrides(|name| match name {
            "DATABASE_URL" => Some("postgres://db/other".to_string()),
            "ES_HOST" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.store.url, "postgres://db/other");
        assert_eq!(config.search.host, "localhost:9200");
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[source]
delay_ms = 0

[search]
host = "es:9200"
doc_type = ""
max_batch = 100

[workers]
count = 8
start = 1000
end = 2000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.search.host, "es:9200");
        assert_eq!(config.search.doc_type(), None);
        assert_eq!(config.search.index, "reports");

        let harvest = config.harvest();
        assert_eq!(harvest.workers, 8);
        assert_eq!(harvest.id_range(), 1000..2000);
        assert_eq!(harvest.delay, Duration::ZERO);
        assert_eq!(harvest.batch.max_batch, 100);
    }

    #[test]
    fn missing_env_reference_is_an_error() {
        let toml = r#"
[store]
url = "${NONEXISTENT_VAR_12345}"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[workers]\ncount = 2").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.workers.count, 2);
        assert_eq!(config.workers.end, 200_000);
    }

    #[test]
    fn unreadable_file() {
        let err = Config::from_file(Path::new("/nonexistent/plebis.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
