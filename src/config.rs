use anyhow::{anyhow, Context, Result};
use jsonc_parser::{parse_to_serde_value, ParseOptions};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time;

pub const CONFIG_PATH_ENV: &str = "CAPTION_FORGE_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Directory holding the seed list files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub context: ContextConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_completion_model")]
    pub model: String,

    #[serde(default = "default_temperature_min")]
    pub temperature_min: f32,

    #[serde(default = "default_temperature_max")]
    pub temperature_max: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_completion_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextConfig {
    #[serde(default = "default_weather_endpoint")]
    pub weather_endpoint: String,

    #[serde(default = "default_news_endpoint")]
    pub news_endpoint: String,

    #[serde(default = "default_geocode_endpoint")]
    pub geocode_endpoint: String,

    #[serde(default = "default_events_endpoint")]
    pub events_endpoint: String,

    #[serde(default = "default_context_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_event_radius_km")]
    pub event_radius_km: u32,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_completion_endpoint() -> String {
    "https://api.deepseek.com/chat/completions".to_string()
}

fn default_completion_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature_min() -> f32 {
    0.7
}

fn default_temperature_max() -> f32 {
    0.85
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    60
}

fn default_completion_timeout() -> u64 {
    30
}

fn default_weather_endpoint() -> String {
    "https://api.weatherapi.com/v1/current.json".to_string()
}

fn default_news_endpoint() -> String {
    "https://news.google.com/rss/search".to_string()
}

fn default_geocode_endpoint() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_events_endpoint() -> String {
    "https://api.predicthq.com/v1/events/".to_string()
}

fn default_context_timeout() -> u64 {
    5
}

fn default_event_radius_km() -> u32 {
    25
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            data_dir: default_data_dir(),
            completion: CompletionConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            model: default_completion_model(),
            temperature_min: default_temperature_min(),
            temperature_max: default_temperature_max(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_completion_timeout(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            weather_endpoint: default_weather_endpoint(),
            news_endpoint: default_news_endpoint(),
            geocode_endpoint: default_geocode_endpoint(),
            events_endpoint: default_events_endpoint(),
            request_timeout_secs: default_context_timeout(),
            event_radius_km: default_event_radius_km(),
        }
    }
}

#[derive(Clone)]
pub struct ConfigManager {
    inner: Arc<ConfigManagerInner>,
}

struct ConfigManagerInner {
    config: RwLock<Config>,
    config_path: Option<PathBuf>,
    change_tx: watch::Sender<Config>,
    watcher_active: AtomicBool,
}

impl ConfigManager {
    /// Loads `$CAPTION_FORGE_CONFIG`, or `config.jsonc` in the platform
    /// config directory. A default file is written when none exists.
    pub fn load() -> Result<Self> {
        let config_path = match env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => directories::ProjectDirs::from("", "", "caption-forge")
                .context("Failed to get config directory")?
                .config_dir()
                .join("config.jsonc"),
        };

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            Self::read_config_from_disk(path)?
        } else {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            let default_config = Config::default();
            Self::write_config_file(path, &default_config)?;
            tracing::info!("Created default config at: {:?}", path);
            default_config
        };

        tracing::info!("Loaded config from: {:?}", path);
        Ok(Self::build(config, Some(path.to_path_buf())))
    }

    /// In-memory manager with no backing file. Watching is a no-op.
    pub fn from_config(config: Config) -> Self {
        Self::build(config, None)
    }

    fn build(config: Config, config_path: Option<PathBuf>) -> Self {
        let (change_tx, _) = watch::channel(config.clone());

        Self {
            inner: Arc::new(ConfigManagerInner {
                config: RwLock::new(config),
                config_path,
                change_tx,
                watcher_active: AtomicBool::new(false),
            }),
        }
    }

    pub fn start_watching(&self) {
        let Some(config_path) = self.inner.config_path.clone() else {
            return;
        };
        if self.inner.watcher_active.swap(true, Ordering::SeqCst) {
            return;
        }

        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let mut last_state = Self::file_state(&config_path);
            let mut ticker = time::interval(Duration::from_millis(500));

            loop {
                ticker.tick().await;

                let current_state = Self::file_state(&config_path);
                if current_state == last_state {
                    continue;
                }

                last_state = current_state;

                match Self::read_config_from_disk(&config_path) {
                    Ok(new_config) => {
                        let mut guard = inner
                            .config
                            .write()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        if *guard != new_config {
                            *guard = new_config.clone();
                            drop(guard);

                            if inner.change_tx.send(new_config).is_ok() {
                                tracing::info!("Reloaded config from: {:?}", config_path);
                            } else {
                                tracing::debug!("Config reloaded with no subscribers");
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Failed to reload config: {err:#}");
                    }
                }
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<Config> {
        self.inner.change_tx.subscribe()
    }

    pub fn get(&self) -> Config {
        self.inner
            .config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.inner.config_path.as_deref()
    }

    fn read_config_from_disk(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {:?}", path))?;
        parse_config(&content)
    }

    fn write_config_file(path: &Path, config: &Config) -> Result<()> {
        let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write config file at {:?}", path))
    }

    fn file_state(path: &Path) -> Option<(SystemTime, u64)> {
        let metadata = fs::metadata(path).ok()?;
        let modified = metadata.modified().ok()?;
        Some((modified, metadata.len()))
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let value = parse_to_serde_value(content, &ParseOptions::default())
        .context("Failed to parse config as JSONC")?
        .ok_or_else(|| anyhow!("Config file did not contain a JSON value"))?;
    serde_json::from_value(value).context("Failed to deserialize config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_jsonc_with_comments_and_partial_sections() {
        let content = r#"
        {
            // local backend for development
            "completion": {
                "endpoint": "http://127.0.0.1:9000/v1/chat/completions",
                "temperature_max": 0.8,
            },
            /* trailing commas are fine */
            "data_dir": "/srv/captions",
        }
        "#;

        let config = parse_config(content).expect("parse");
        assert_eq!(
            config.completion.endpoint,
            "http://127.0.0.1:9000/v1/chat/completions"
        );
        assert_eq!(config.completion.temperature_min, 0.7);
        assert_eq!(config.completion.temperature_max, 0.8);
        assert_eq!(config.completion.model, "deepseek-chat");
        assert_eq!(config.data_dir, PathBuf::from("/srv/captions"));
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.context.event_radius_km, 25);
        assert_eq!(config.context.request_timeout_secs, 5);
    }

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(parse_config("{}").expect("parse"), Config::default());
    }

    #[test]
    fn rejects_empty_document() {
        assert!(parse_config("   // nothing here\n").is_err());
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.jsonc");

        let manager = ConfigManager::load_from(&path).expect("load");
        assert!(path.exists());
        assert_eq!(manager.get(), Config::default());
        assert_eq!(manager.config_path(), Some(path.as_path()));

        let reloaded = ConfigManager::load_from(&path).expect("reload");
        assert_eq!(reloaded.get(), Config::default());
    }

    #[tokio::test]
    async fn watcher_picks_up_edits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.jsonc");
        let manager = ConfigManager::load_from(&path).expect("load");
        let mut changes = manager.subscribe();
        manager.start_watching();

        tokio::time::sleep(Duration::from_millis(50)).await;
        fs::write(&path, r#"{ "completion": { "max_tokens": 90 } }"#).expect("write");

        tokio::time::timeout(Duration::from_secs(5), changes.changed())
            .await
            .expect("reload within timeout")
            .expect("sender alive");
        assert_eq!(manager.get().completion.max_tokens, 90);
    }
}
