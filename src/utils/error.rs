use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    // === Fetch ===
    #[error("HTTP error {status} from {url}")]
    HttpError { url: String, status: u16 },

    #[error("Connection to {url} failed: {source}")]
    ConnectionError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out: {source}")]
    TimeoutError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed: {message}")]
    RequestError { url: String, message: String },

    // === CSV ingestion ===
    #[error("Failed to read the CSV file: no header offset in 0..{attempts} produced a table")]
    UnreadableTableError { attempts: usize },

    #[error("Required column '{column}' not found")]
    MissingColumnError { column: String },

    #[error("Unparseable date '{value}' in row {row}")]
    InvalidDateError { row: usize, value: String },

    #[error("Pipeline error: {message}")]
    PipelineError { message: String },

    // === Configuration ===
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    // === Ambient ===
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Input,
    Schema,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DashboardError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError { .. }
            | Self::ConnectionError { .. }
            | Self::TimeoutError { .. }
            | Self::RequestError { .. } => ErrorCategory::Network,
            Self::UnreadableTableError { .. }
            | Self::InvalidDateError { .. }
            | Self::PipelineError { .. } => ErrorCategory::Input,
            Self::MissingColumnError { .. } => ErrorCategory::Schema,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) | Self::CsvError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Schema => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Message shown to the person using the dashboard.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::HttpError { status, .. } => format!("HTTP error occurred: status {}", status),
            Self::ConnectionError { source, .. } => {
                format!("Connection error occurred: {}", source)
            }
            Self::TimeoutError { source, .. } => format!("Timeout error occurred: {}", source),
            Self::RequestError { message, .. } => format!("An error occurred: {}", message),
            Self::UnreadableTableError { .. } => "Failed to read the CSV file.".to_string(),
            Self::MissingColumnError { column } => format!(
                "The uploaded file has no column recognised as '{}'",
                column
            ),
            other => format!("An error occurred: {}", other),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::HttpError { status, .. } if *status == 401 || *status == 403 => {
                "Check the API token"
            }
            Self::HttpError { .. } => "Check the API endpoint, the service may be unavailable",
            Self::ConnectionError { .. } => "Check network connectivity and the endpoint host",
            Self::TimeoutError { .. } => "Retry later or raise the request timeout",
            Self::RequestError { .. } => "Check that the endpoint returns JSON",
            Self::UnreadableTableError { .. } => {
                "Remove extra banner rows above the header row (at most 4 are tolerated)"
            }
            Self::MissingColumnError { .. } => {
                "Rename the column or add its spelling to [normalize.synonyms]"
            }
            Self::InvalidDateError { .. } => "Use YYYY-MM-DD dates in the date column",
            Self::PipelineError { .. } => "Check the uploaded file contents",
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfigValidationError { .. } => "Fix the configuration and run again",
            Self::IoError(_) => "Check that the file exists and is readable",
            Self::SerializationError(_) | Self::CsvError(_) => "Report this as a bug",
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = DashboardError::HttpError {
            url: "http://x".to_string(),
            status: 404,
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = DashboardError::MissingColumnError {
            column: "conversion".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Schema);
        assert!(err.user_friendly_message().contains("conversion"));
    }

    #[test]
    fn test_unreadable_table_message() {
        let err = DashboardError::UnreadableTableError { attempts: 5 };
        assert_eq!(err.user_friendly_message(), "Failed to read the CSV file.");
        assert!(err.to_string().contains("0..5"));
    }
}
