//! Loader for murmur configuration with YAML + environment overlays.
//!
//! Sources are merged in order: YAML files and inline snippets as they were
//! added, then `MURMUR__`-prefixed environment variables on top (env wins).
//! Once merged, every string value goes through `${VAR}` expansion so secrets
//! can stay in the environment while the file only names them.
use config::{Config, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

pub use config::ConfigError;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct MurmurConfig {
    pub credentials: Credentials,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The four user-context secrets. Loaded once and never mutated.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_rest_base")]
    pub rest_base: String,
    #[serde(default = "default_stream_base")]
    pub stream_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Ask the platform to confirm the credentials during authentication.
    #[serde(default = "default_true")]
    pub verify_credentials: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rest_base: default_rest_base(),
            stream_base: default_stream_base(),
            timeout_secs: default_timeout_secs(),
            verify_credentials: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_screen_name")]
    pub screen_name: String,
    #[serde(default = "default_batch_count")]
    pub count: u32,
    /// Rows printed from the top of the table.
    #[serde(default = "default_head")]
    pub head: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            screen_name: default_screen_name(),
            count: default_batch_count(),
            head: default_head(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    #[serde(default)]
    pub track: Vec<String>,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Print every received record to stdout as well.
    #[serde(default)]
    pub echo: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            track: Vec::new(),
            channel_capacity: default_channel_capacity(),
            echo: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub emit_stderr: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            emit_stderr: true,
            filter: default_log_filter(),
            dir: None,
        }
    }
}

fn default_rest_base() -> String {
    "https://api.twitter.com".into()
}
fn default_stream_base() -> String {
    "https://stream.twitter.com".into()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_true() -> bool {
    true
}
fn default_screen_name() -> String {
    "dota2".into()
}
fn default_batch_count() -> u32 {
    20
}
fn default_head() -> usize {
    10
}
fn default_output_file() -> PathBuf {
    PathBuf::from("tweets.json")
}
fn default_channel_capacity() -> usize {
    256
}
fn default_log_format() -> String {
    "text".into()
}
fn default_log_filter() -> String {
    "info".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct MurmurConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for MurmurConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MurmurConfigLoader {
    /// Start empty; `MURMUR__` env overrides are applied last by [`Self::load`].
    ///
    /// ```
    /// use murmur_config::MurmurConfigLoader;
    ///
    /// let config = MurmurConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// credentials:
    ///   consumer_key: "ck"
    ///   consumer_secret: "cs"
    ///   access_token: "at"
    ///   access_token_secret: "ats"
    /// "#,
    ///     )
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.batch.count, 20);
    /// assert_eq!(config.api.rest_base, "https://api.twitter.com");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use murmur_config::MurmurConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_CONSUMER_KEY", "injected-from-env"); }
    ///
    /// let config = MurmurConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// credentials:
    ///   consumer_key: "${DOC_CONSUMER_KEY}"
    ///   consumer_secret: "cs"
    ///   access_token: "at"
    ///   access_token_secret: "ats"
    /// stream:
    ///   track: ["rust", "tokio"]
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.credentials.consumer_key, "injected-from-env");
    /// assert_eq!(config.stream.track, vec!["rust", "tokio"]);
    ///
    /// unsafe { std::env::remove_var("DOC_CONSUMER_KEY"); }
    /// ```
    pub fn load(self) -> Result<MurmurConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("MURMUR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
