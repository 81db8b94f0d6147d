use crate::config::OutputFormat;
use crate::core::fetcher::{RetryPolicy, DEFAULT_RETRY_STATUSES};
use crate::core::normalizer::{MatchMode, SynonymTable};
use crate::core::ConfigProvider;
use crate::utils::error::{DashboardError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub source: SourceConfig,
    pub normalize: NormalizeConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub retry_backoff_cap_ms: u64,
    pub retry_statuses: Vec<u16>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            endpoint: None,
            token: None,
            timeout_seconds: 30,
            retry_attempts: policy.max_retries,
            retry_backoff_ms: policy.backoff_base.as_millis() as u64,
            retry_backoff_cap_ms: policy.backoff_cap.as_millis() as u64,
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub match_mode: MatchMode,
    /// canonical column name -> extra spellings
    pub synonyms: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub json: bool,
}

impl LoggingConfig {
    pub fn format(&self) -> LogFormat {
        if self.json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DashboardError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| DashboardError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CAMPAIGN_API_TOKEN})；未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(endpoint) = &self.source.endpoint {
            validate_url("source.endpoint", endpoint)?;
        }

        if let Some(token) = &self.source.token {
            validate_non_empty_string("source.token", token)?;
            if let Some(caps) = env_var_pattern().captures(token) {
                return Err(DashboardError::InvalidConfigValueError {
                    field: "source.token".to_string(),
                    value: token.clone(),
                    reason: format!("environment variable {} is not set", &caps[1]),
                });
            }
        }

        validate_range("source.timeout_seconds", self.source.timeout_seconds, 1, 600)?;
        validate_range("source.retry_attempts", self.source.retry_attempts, 0, 10)?;
        for status in &self.source.retry_statuses {
            validate_range("source.retry_statuses", *status, 100, 599)?;
        }

        SynonymTable::with_extra(&self.normalize.synonyms)?;

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> Option<&str> {
        self.source.endpoint.as_deref()
    }

    fn api_token(&self) -> Option<&str> {
        self.source.token.as_deref()
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.source.retry_attempts,
            backoff_base: Duration::from_millis(self.source.retry_backoff_ms),
            backoff_cap: Duration::from_millis(self.source.retry_backoff_cap_ms),
            retry_statuses: self.source.retry_statuses.clone(),
        }
    }

    fn match_mode(&self) -> MatchMode {
        self.normalize.match_mode
    }

    fn extra_synonyms(&self) -> HashMap<String, Vec<String>> {
        self.normalize.synonyms.clone()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
