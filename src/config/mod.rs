use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::maintenance::report::{is_valid_date_format, DEFAULT_DATE_FORMAT};
use crate::workflows::maintenance::DEFAULT_LOAD_TIMEOUT;

pub const REPORT_FILE_NAME: &str = "property.html";

/// Top-level configuration for a report run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub namespace: Option<String>,
    pub storage: StorageConfig,
    pub report: ReportConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Reads the environment, after loading `<namespace>.env` (when given) and `.env`.
    pub fn load(namespace: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(namespace) = namespace {
            dotenvy::from_filename(format!("{namespace}.env")).ok();
        }
        dotenvy::dotenv().ok();

        let data_file = env::var("REPORT_DATA_FILE").unwrap_or_else(|_| "properties.csv".to_string());
        let directory = env::var("REPORT_OUTPUT_DIR").unwrap_or_else(|_| ".".to_string());

        let load_timeout = match env::var("REPORT_LOAD_TIMEOUT_MS") {
            Ok(raw) => parse_timeout_ms(&raw)?,
            Err(_) => DEFAULT_LOAD_TIMEOUT,
        };

        let date_format =
            env::var("REPORT_DATE_FORMAT").unwrap_or_else(|_| DEFAULT_DATE_FORMAT.to_string());
        if !is_valid_date_format(&date_format) {
            return Err(ConfigError::InvalidDateFormat(date_format));
        }

        let font_family = env::var("REPORT_FONT").unwrap_or_else(|_| "Helvetica".to_string());
        let log_level = env::var("REPORT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            namespace: namespace.map(str::to_string),
            storage: StorageConfig {
                data_file: PathBuf::from(data_file),
            },
            report: ReportConfig {
                directory: PathBuf::from(directory),
                load_timeout,
                date_format,
                font_family,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Location of the property data the store loads.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_file: PathBuf,
}

/// Output and presentation settings.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub directory: PathBuf,
    pub load_timeout: Duration,
    pub date_format: String,
    pub font_family: String,
}

impl ReportConfig {
    pub fn output_path(&self) -> PathBuf {
        self.directory.join(REPORT_FILE_NAME)
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub fn parse_timeout_ms(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
        .ok_or_else(|| ConfigError::InvalidTimeout(raw.to_string()))
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidTimeout(String),
    InvalidDateFormat(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeout(raw) => write!(
                f,
                "REPORT_LOAD_TIMEOUT_MS must be a positive number of milliseconds (got '{raw}')"
            ),
            ConfigError::InvalidDateFormat(raw) => {
                write!(f, "REPORT_DATE_FORMAT '{raw}' is not a valid strftime pattern")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
