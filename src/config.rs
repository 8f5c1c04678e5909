//! Layered settings.
//!
//! Built-in defaults, then an optional TOML file, then `ROUTEWATCH_*`
//! environment variables. Command-line flags are applied on top by the
//! binary.
//!
//! ```toml
//! endpoint = "http://dashboard.internal:8000"
//! experiments = ["exp-a", "exp-b"]
//! poll_interval = "3s"
//! stale_threshold = "10s"
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, Map};
use serde::Deserialize;

use routewatch_types::{ExperimentId, ProtocolVersion};

use crate::aggregator::AggregatorConfig;
use crate::data::duration::parse_duration;

/// Default dashboard API endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Prefix of environment overrides, e.g. `ROUTEWATCH_ENDPOINT`.
pub const ENV_PREFIX: &str = "ROUTEWATCH";

/// Resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: String,
    /// Experiments to cycle through; the first one is polled at startup.
    pub experiments: Vec<ExperimentId>,
    pub aggregator: AggregatorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            experiments: Vec::new(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    endpoint: String,
    experiments: Vec<String>,
    window_sec: u64,
    poll_interval: String,
    buffer_capacity: usize,
    stale_threshold: String,
    fetch_timeout: String,
    agent_version: u8,
    settle_delay: String,
}

impl Settings {
    /// Load settings from defaults, `path` (if any) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`Settings::load`], reading environment overrides from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let defaults = AggregatorConfig::default();

        let mut builder = Config::builder()
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("experiments", Vec::<String>::new())?
            .set_default("window_sec", defaults.window_sec as i64)?
            .set_default("poll_interval", "3s")?
            .set_default("buffer_capacity", defaults.buffer_capacity as i64)?
            .set_default("stale_threshold", "10s")?
            .set_default("fetch_timeout", "3s")?
            .set_default("agent_version", i64::from(defaults.agent_version.number()))?
            .set_default("settle_delay", "500ms")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let raw: RawSettings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("experiments")
                    .source(env),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        raw.resolve()
    }
}

impl RawSettings {
    fn resolve(self) -> Result<Settings> {
        let endpoint = self.endpoint.trim().to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            bail!("endpoint must be an http(s) URL, got {endpoint:?}");
        }
        if self.buffer_capacity == 0 {
            bail!("buffer_capacity must be at least 1");
        }
        if self.window_sec == 0 {
            bail!("window_sec must be at least 1");
        }

        let agent_version = ProtocolVersion::new(self.agent_version);
        if !ProtocolVersion::PRIORITY.contains(&agent_version) {
            bail!("agent_version must be 2 or 3, got {}", self.agent_version);
        }

        let experiments = self
            .experiments
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(ExperimentId::from)
            .collect();

        Ok(Settings {
            endpoint,
            experiments,
            aggregator: AggregatorConfig {
                poll_interval: duration_key("poll_interval", &self.poll_interval)?,
                buffer_capacity: self.buffer_capacity,
                stale_threshold: duration_key("stale_threshold", &self.stale_threshold)?,
                fetch_timeout: duration_key("fetch_timeout", &self.fetch_timeout)?,
                window_sec: self.window_sec,
                agent_version,
                settle_delay: duration_key("settle_delay", &self.settle_delay)?,
            },
        })
    }
}

fn duration_key(key: &str, value: &str) -> Result<std::time::Duration> {
    parse_duration(value).with_context(|| format!("Invalid duration for {key}: {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_sources() {
        let settings = Settings::load_with_env(None, env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.aggregator.poll_interval, Duration::from_secs(3));
        assert_eq!(settings.aggregator.stale_threshold, Duration::from_secs(10));
        assert_eq!(settings.aggregator.settle_delay, Duration::from_millis(500));
    }

    #[test]
    fn file_overrides_defaults() {
        let file = toml_file(
            r#"
endpoint = "http://dash:9000"
experiments = ["exp-a", "exp-b"]
poll_interval = "1s"
buffer_capacity = 30
agent_version = 2
"#,
        );

        let settings = Settings::load_with_env(Some(file.path()), env(&[])).unwrap();
        assert_eq!(settings.endpoint, "http://dash:9000");
        assert_eq!(
            settings.experiments,
            vec![ExperimentId::new("exp-a"), ExperimentId::new("exp-b")]
        );
        assert_eq!(settings.aggregator.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.aggregator.buffer_capacity, 30);
        assert_eq!(settings.aggregator.agent_version, ProtocolVersion::V2);
        assert_eq!(settings.aggregator.window_sec, 60);
    }

    #[test]
    fn environment_overrides_file() {
        let file = toml_file("endpoint = \"http://dash:9000\"\nwindow_sec = 30\n");
        let settings = Settings::load_with_env(
            Some(file.path()),
            env(&[
                ("ROUTEWATCH_ENDPOINT", "https://prod:443"),
                ("ROUTEWATCH_EXPERIMENTS", "a,b,c"),
                ("ROUTEWATCH_STALE_THRESHOLD", "15s"),
                ("ROUTEWATCH_FETCH_TIMEOUT", "2500"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.endpoint, "https://prod:443");
        assert_eq!(settings.experiments.len(), 3);
        assert_eq!(settings.aggregator.window_sec, 30);
        assert_eq!(settings.aggregator.stale_threshold, Duration::from_secs(15));
        assert_eq!(settings.aggregator.fetch_timeout, Duration::from_millis(2_500));
    }

    #[test]
    fn rejects_invalid_values() {
        let bad_duration = Settings::load_with_env(None, env(&[("ROUTEWATCH_POLL_INTERVAL", "soon")]));
        let message = format!("{:#}", bad_duration.unwrap_err());
        assert!(message.contains("poll_interval"), "{message}");

        assert!(Settings::load_with_env(None, env(&[("ROUTEWATCH_AGENT_VERSION", "1")])).is_err());
        assert!(Settings::load_with_env(None, env(&[("ROUTEWATCH_ENDPOINT", "localhost")])).is_err());
        assert!(Settings::load_with_env(None, env(&[("ROUTEWATCH_BUFFER_CAPACITY", "0")])).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Settings::load_with_env(Some(&path), env(&[])).is_err());
    }
}
