//! Runtime configuration.
//!
//! Database credentials come from the `POSTGRES_*` environment variables.
//! Report settings are read from an optional `config/fci_report.toml` file and
//! `FCI_REPORT_*` environment overrides, e.g. `FCI_REPORT_ASSETS_DIR`.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Settings could not be loaded or deserialized.
    #[error("invalid configuration: {0}")]
    Settings(#[from] ::config::ConfigError),
    /// The procedure list could not be read.
    #[error("cannot read procedure file {}: {source}", path.display())]
    ProcedureFile {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The procedure list names no procedure.
    #[error("no procedures listed in {}", path.display())]
    NoProcedures {
        /// File that was read.
        path: PathBuf,
    },
}

/// Connection settings for the snapshot database.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// User name.
    pub user: String,
    /// Password.
    #[serde(default)]
    pub password: String,
    /// Host name.
    pub host: String,
    /// Port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name.
    pub db: String,
}

fn default_port() -> u16 {
    5432
}

impl DatabaseConfig {
    /// Loads the settings from `POSTGRES_USER`, `POSTGRES_PASSWORD`,
    /// `POSTGRES_HOST`, `POSTGRES_PORT` and `POSTGRES_DB`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = ::config::Config::builder()
            .add_source(::config::Environment::with_prefix("POSTGRES").try_parsing(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Builds driver connection options.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.db)
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Directory holding fonts and the logo.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    /// Regular font file name, relative to `assets_dir`.
    #[serde(default = "default_regular_font")]
    pub regular_font: String,
    /// Bold font file name, relative to `assets_dir`.
    #[serde(default = "default_bold_font")]
    pub bold_font: String,
    /// Logo image file name, relative to `assets_dir`.
    #[serde(default = "default_logo")]
    pub logo: String,
    /// Directory for temporary chart images. Defaults to the system temp dir.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    /// Directory the PDF is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Name printed in the page footer.
    #[serde(default = "default_generated_by")]
    pub generated_by: String,
    /// Report date used when neither the argument nor the database provide one.
    #[serde(default = "default_fallback_date")]
    pub fallback_date: NaiveDate,
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_regular_font() -> String {
    "Microsoft Sans Serif.ttf".to_string()
}

fn default_bold_font() -> String {
    "MS Sans Serif Bold.ttf".to_string()
}

fn default_logo() -> String {
    "brand_logo.png".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_generated_by() -> String {
    "Outlier".to_string()
}

fn default_fallback_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 13).unwrap_or_default()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            assets_dir: default_assets_dir(),
            regular_font: default_regular_font(),
            bold_font: default_bold_font(),
            logo: default_logo(),
            scratch_dir: None,
            output_dir: default_output_dir(),
            generated_by: default_generated_by(),
            fallback_date: default_fallback_date(),
        }
    }
}

impl ReportConfig {
    /// Loads settings from `config/fci_report.toml` (optional) and the
    /// `FCI_REPORT_*` environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ::config::Config::builder()
            .add_source(::config::File::with_name("config/fci_report").required(false))
            .add_source(::config::Environment::with_prefix("FCI_REPORT").try_parsing(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Directory chart images are written to.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
