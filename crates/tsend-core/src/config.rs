use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::TelemetryKind;
use crate::client::AdmissionPolicy;
use crate::envelope::{Envelope, KeyKind};
use crate::error::ConfigError;
use crate::retry::{ExponentialBackoff, RetryLimits};
use crate::transport::TransportOptions;

/// Converts float seconds from the config file, rejecting NaN, infinities and negatives.
fn secs(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::BadDuration { field, value })
}

fn positive_secs(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    let d = secs(field, value)?;
    if d.is_zero() {
        return Err(ConfigError::BadDuration { field, value });
    }
    Ok(d)
}

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per batch (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry, in seconds (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: f64,
    pub multiplier: f64,
    pub jitter: bool,
    /// Stop retrying once this many seconds have passed since the first attempt.
    pub max_elapsed_secs: Option<f64>,
    /// Wait for a 429's `Retry-After` instead of the computed backoff.
    pub honor_retry_after: bool,
    pub max_retry_after_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_secs: 1.0,
            max_delay_secs: 15.0,
            multiplier: 2.0,
            jitter: true,
            max_elapsed_secs: None,
            honor_retry_after: true,
            max_retry_after_secs: 60.0,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Result<ExponentialBackoff, ConfigError> {
        let base_delay = positive_secs("retry.base_delay_secs", self.base_delay_secs)?;
        let max_delay = positive_secs("retry.max_delay_secs", self.max_delay_secs)?;
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::BadMultiplier(self.multiplier));
        }
        if max_delay < base_delay {
            return Err(ConfigError::CapBelowBase {
                base: self.base_delay_secs,
                max: self.max_delay_secs,
            });
        }
        Ok(ExponentialBackoff {
            base_delay,
            multiplier: self.multiplier,
            max_delay,
            jitter: self.jitter,
        })
    }

    pub fn limits(&self) -> Result<RetryLimits, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        let max_elapsed = self
            .max_elapsed_secs
            .map(|v| positive_secs("retry.max_elapsed_secs", v))
            .transpose()?;
        Ok(RetryLimits {
            max_attempts: self.max_attempts,
            max_elapsed,
            honor_retry_after: self.honor_retry_after,
            max_retry_after: secs("retry.max_retry_after_secs", self.max_retry_after_secs)?,
        })
    }
}

/// Per-exchange timeouts for the curl transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_secs: f64,
    pub timeout_secs: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10.0,
            timeout_secs: 30.0,
        }
    }
}

impl TransportConfig {
    pub fn options(&self) -> Result<TransportOptions, ConfigError> {
        Ok(TransportOptions {
            connect_timeout: positive_secs(
                "transport.connect_timeout_secs",
                self.connect_timeout_secs,
            )?,
            timeout: positive_secs("transport.timeout_secs", self.timeout_secs)?,
        })
    }
}

/// Data center whose ingest hosts are used when no endpoint is overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    pub fn default_endpoint(self, kind: TelemetryKind) -> &'static str {
        match (self, kind) {
            (Region::Us, TelemetryKind::Metrics) => "https://metric-api.newrelic.com/metric/v1",
            (Region::Us, TelemetryKind::Spans) => "https://trace-api.newrelic.com/trace/v1",
            (Region::Us, TelemetryKind::Events) => {
                "https://insights-collector.newrelic.com/v1/accounts/events"
            }
            (Region::Us, TelemetryKind::Logs) => "https://log-api.newrelic.com/log/v1",
            (Region::Eu, TelemetryKind::Metrics) => "https://metric-api.eu.newrelic.com/metric/v1",
            (Region::Eu, TelemetryKind::Spans) => "https://trace-api.eu.newrelic.com/trace/v1",
            (Region::Eu, TelemetryKind::Events) => {
                "https://insights-collector.eu01.nr-data.net/v1/accounts/events"
            }
            (Region::Eu, TelemetryKind::Logs) => "https://log-api.eu.newrelic.com/log/v1",
        }
    }
}

/// Optional per-kind endpoint overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default)]
    pub metrics: Option<String>,
    #[serde(default)]
    pub spans: Option<String>,
    #[serde(default)]
    pub events: Option<String>,
    #[serde(default)]
    pub logs: Option<String>,
}

impl Endpoints {
    pub fn get(&self, kind: TelemetryKind) -> Option<&str> {
        match kind {
            TelemetryKind::Metrics => self.metrics.as_deref(),
            TelemetryKind::Spans => self.spans.as_deref(),
            TelemetryKind::Events => self.events.as_deref(),
            TelemetryKind::Logs => self.logs.as_deref(),
        }
    }

    pub fn set(&mut self, kind: TelemetryKind, url: impl Into<String>) {
        let slot = match kind {
            TelemetryKind::Metrics => &mut self.metrics,
            TelemetryKind::Spans => &mut self.spans,
            TelemetryKind::Events => &mut self.events,
            TelemetryKind::Logs => &mut self.logs,
        };
        *slot = Some(url.into());
    }
}

/// Global configuration loaded from `~/.config/tsend/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsendConfig {
    /// Ingest key; may also be supplied on the command line.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Which header carries the key: "insert" (`Api-Key`) or "license" (`X-License-Key`).
    #[serde(default)]
    pub key_kind: KeyKind,
    #[serde(default)]
    pub region: Region,
    /// Gzip request bodies.
    #[serde(default = "default_true")]
    pub compression: bool,
    /// Log each uncompressed request body at debug level.
    #[serde(default)]
    pub audit_logging: bool,
    /// Extra product token appended to the User-Agent.
    #[serde(default)]
    pub secondary_user_agent: Option<String>,
    /// Maximum batches in flight at once (fragments count against their parent).
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
    /// "reject" fails `send` past the limit; "queue" waits for a slot.
    #[serde(default)]
    pub admission: AdmissionPolicy,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: f64,
    #[serde(default)]
    pub endpoints: Endpoints,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub transport: Option<TransportConfig>,
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_batches() -> usize {
    64
}

fn default_shutdown_timeout_secs() -> f64 {
    10.0
}

impl Default for TsendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            key_kind: KeyKind::default(),
            region: Region::default(),
            compression: true,
            audit_logging: false,
            secondary_user_agent: None,
            max_concurrent_batches: default_max_concurrent_batches(),
            admission: AdmissionPolicy::default(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            endpoints: Endpoints::default(),
            retry: None,
            transport: None,
        }
    }
}

impl TsendConfig {
    /// Override if set, otherwise the region default.
    pub fn endpoint(&self, kind: TelemetryKind) -> &str {
        self.endpoints
            .get(kind)
            .unwrap_or_else(|| self.region.default_endpoint(kind))
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn transport_options(&self) -> Result<TransportOptions, ConfigError> {
        self.transport.clone().unwrap_or_default().options()
    }

    pub fn shutdown_timeout(&self) -> Result<Duration, ConfigError> {
        secs("shutdown_timeout_secs", self.shutdown_timeout_secs)
    }

    /// Checks every value the pipeline depends on. The API key is not checked here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let retry = self.retry_config();
        retry.backoff()?;
        retry.limits()?;
        self.transport_options()?;
        self.shutdown_timeout()?;
        if self.max_concurrent_batches == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        for kind in TelemetryKind::ALL {
            let raw = self.endpoint(kind);
            let parsed = url::Url::parse(raw).map_err(|e| ConfigError::BadEndpoint {
                kind: kind.field_name(),
                url: raw.to_string(),
                reason: e.to_string(),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::BadEndpoint {
                    kind: kind.field_name(),
                    url: raw.to_string(),
                    reason: format!("unsupported scheme {}", parsed.scheme()),
                });
            }
        }
        Ok(())
    }

    /// Request builder for the configured key, endpoints and headers.
    pub fn envelope(&self) -> Result<Envelope, ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        let endpoints: HashMap<TelemetryKind, String> = TelemetryKind::ALL
            .iter()
            .map(|k| (*k, self.endpoint(*k).to_string()))
            .collect();
        Ok(Envelope::new(api_key, endpoints)
            .key_kind(self.key_kind)
            .compress(self.compression)
            .audit_logging(self.audit_logging)
            .secondary_user_agent(self.secondary_user_agent.as_deref()))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tsend")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TsendConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = TsendConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<TsendConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: TsendConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
