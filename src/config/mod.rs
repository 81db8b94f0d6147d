#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::DashboardError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

/// How the processed table is printed for the tabular display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(DashboardError::InvalidConfigValueError {
                field: "format".to_string(),
                value: other.to_string(),
                reason: "expected 'csv' or 'json'".to_string(),
            }),
        }
    }
}
