//! Run configuration loaded from TOML.
//!
//! Every section is optional; missing keys take the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use serieslab_core::axis::Frequency;
use serieslab_core::data::{SgsSettings, DEFAULT_BASE_URL};

/// Upper bound on `provider.max_retries`; backoff doubles per retry.
pub const MAX_RETRIES: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub run: RunSection,
    pub input: InputSection,
    pub provider: ProviderSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    /// First date of interest (inclusive).
    pub start_date: NaiveDate,
    /// Last date of the axis. `None` means the day the run starts.
    pub end_date: Option<NaiveDate>,
    pub frequency: Frequency,
    /// Identifiers per combined call.
    pub batch_size: usize,
    /// Hard cap on concurrent batch tasks.
    pub max_workers: usize,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or(NaiveDate::MIN),
            end_date: None,
            frequency: Frequency::Monthly,
            batch_size: 10,
            max_workers: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputSection {
    /// Mapping CSV with `Codigo`, `Coluna` and `Aba` columns.
    pub series: PathBuf,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            series: PathBuf::from("input_series.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderSection {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            max_retries: 2,
            retry_base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Workbook directory.
    pub directory: PathBuf,
    /// Where the previous workbook is copied before a run. `None` disables it.
    pub backup: Option<PathBuf>,
    /// Write a Parquet file next to each sheet's CSV.
    pub parquet: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("Resultado_BCB"),
            backup: Some(PathBuf::from("Resultado_BCB_BACKUP")),
            parquet: true,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.batch_size == 0 {
            return Err(ConfigError::Invalid("run.batch_size must be at least 1".into()));
        }
        if self.run.max_workers == 0 {
            return Err(ConfigError::Invalid("run.max_workers must be at least 1".into()));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.base_url is empty".into()));
        }
        if self.provider.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "provider.max_retries must be at most {MAX_RETRIES}"
            )));
        }
        Ok(())
    }

    /// End of the axis, falling back to `today`.
    pub fn end_date_or(&self, today: NaiveDate) -> NaiveDate {
        self.run.end_date.unwrap_or(today)
    }

    /// Provider settings for a run whose window ends at `end`.
    pub fn sgs_settings(&self, end: NaiveDate) -> SgsSettings {
        SgsSettings {
            base_url: self.provider.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(self.provider.timeout_secs),
            max_retries: self.provider.max_retries,
            base_delay: Duration::from_millis(self.provider.retry_base_delay_ms),
            window_end: Some(end),
            ..SgsSettings::default()
        }
    }
}
