use crate::config::toml_config::TomlConfig;
use crate::config::OutputFormat;
use crate::core::fetcher::RetryPolicy;
use crate::core::normalizer::MatchMode;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_file_extension, validate_range, validate_url, Validate};
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "campaign-dash")]
#[command(about = "Fetch campaign data from an API and normalize uploaded CSV exports")]
pub struct CliConfig {
    /// Path to a TOML configuration file; flags given here override it
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub api_endpoint: Option<String>,

    /// Bearer token sent with the API request
    #[arg(long)]
    pub api_token: Option<String>,

    /// CSV export to process
    #[arg(long)]
    pub csv: Option<String>,

    /// First date to include (YYYY-MM-DD); defaults to the earliest date in the file
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD); defaults to the latest date in the file
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Header matching: "relaxed" (trim + case-fold) or "exact"
    #[arg(long)]
    pub match_mode: Option<MatchMode>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Table output: "csv" or "json"
    #[arg(long)]
    pub format: Option<OutputFormat>,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    /// Enable debug logging, including each API connection attempt
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliConfig {
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// Copies every flag that was given onto `config`.
    pub fn apply_to(&self, config: &mut TomlConfig) {
        if let Some(endpoint) = &self.api_endpoint {
            config.source.endpoint = Some(endpoint.clone());
        }
        if let Some(token) = &self.api_token {
            config.source.token = Some(token.clone());
        }
        if let Some(mode) = self.match_mode {
            config.normalize.match_mode = mode;
        }
        if let Some(timeout) = self.timeout_seconds {
            config.source.timeout_seconds = timeout;
        }
        if let Some(retries) = self.max_retries {
            config.source.retry_attempts = retries;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        config.logging.verbose |= self.verbose;
        config.logging.json |= self.json_logs;
    }
}

impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> Option<&str> {
        self.api_endpoint.as_deref()
    }

    fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(30))
    }

    fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(retries) = self.max_retries {
            policy.max_retries = retries;
        }
        policy
    }

    fn match_mode(&self) -> MatchMode {
        self.match_mode.unwrap_or_default()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.api_endpoint {
            validate_url("api_endpoint", endpoint)?;
        }
        if let Some(csv) = &self.csv {
            validate_file_extension("csv", csv, &["csv"])?;
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            crate::domain::model::DateRange::new(start, end)?;
        }
        if let Some(timeout) = self.timeout_seconds {
            validate_range("timeout_seconds", timeout, 1, 600)?;
        }
        if let Some(retries) = self.max_retries {
            validate_range("max_retries", retries, 0, 10)?;
        }
        Ok(())
    }
}
