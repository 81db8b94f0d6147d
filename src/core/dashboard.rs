use crate::core::fetcher::{bearer_headers, Fetcher};
use crate::core::filter::{date_bounds, filter_by_date};
use crate::core::normalizer::{Normalizer, SynonymTable};
use crate::core::reader::read_csv_with_offset_detection;
use crate::core::selector::project;
use crate::domain::model::{DateRange, ProcessedTable};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{DashboardError, Result};
use crate::utils::logger::Logger;
use chrono::NaiveDate;
use serde::Serialize;

/// Result of the CSV path, ready for the chart and table displays.
#[derive(Debug, Clone, Serialize)]
pub struct UploadView {
    /// Range actually applied; the data's own span when none was requested.
    pub range: DateRange,
    pub rows_read: usize,
    pub table: ProcessedTable,
}

/// Wires the API path and the CSV path. The two never share state, so a
/// failure on one does not affect the other.
pub struct Dashboard<C: ConfigProvider> {
    config: C,
    fetcher: Fetcher,
    normalizer: Normalizer,
    logger: Logger,
}

impl<C: ConfigProvider> Dashboard<C> {
    pub fn new(config: C, logger: Logger) -> Result<Self> {
        let synonyms = SynonymTable::with_extra(&config.extra_synonyms())?;
        let fetcher = Fetcher::new(
            config.request_timeout(),
            config.retry_policy(),
            logger.clone(),
        )?;
        let normalizer = Normalizer::new(synonyms, config.match_mode());

        Ok(Self {
            config,
            fetcher,
            normalizer,
            logger,
        })
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// Fetches the configured API endpoint with the bearer token attached.
    pub async fn load_api_data(&self) -> Result<serde_json::Value> {
        let endpoint = self.config.api_endpoint().ok_or_else(|| {
            DashboardError::MissingConfigError {
                field: "api_endpoint".to_string(),
            }
        })?;
        let headers = bearer_headers(self.config.api_token());
        self.fetcher.fetch(endpoint, &headers).await
    }

    /// Reads, normalizes, filters and projects an uploaded CSV export.
    ///
    /// A missing `start` or `end` defaults to the earliest or latest date in
    /// the file. Any failure aborts the whole upload; no partial table is
    /// returned.
    pub fn process_upload(
        &self,
        bytes: &[u8],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<UploadView> {
        self.logger.in_scope(|| {
            tracing::debug!(bytes = bytes.len(), "Processing uploaded CSV");
            let result = self.run_csv_path(bytes, start, end);
            match &result {
                Ok(view) => tracing::info!(
                    rows_read = view.rows_read,
                    rows_shown = view.table.len(),
                    range = %view.range,
                    "✅ Upload processed"
                ),
                Err(e) => tracing::error!(
                    category = ?e.category(),
                    "An error occurred: {}",
                    e
                ),
            }
            result
        })
    }

    fn run_csv_path(
        &self,
        bytes: &[u8],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<UploadView> {
        let raw = read_csv_with_offset_detection(bytes)?;
        let normalized = self.normalizer.normalize(&raw);

        let range = match (start, end) {
            (Some(start), Some(end)) => DateRange::new(start, end)?,
            _ => {
                let bounds = date_bounds(&normalized)?.ok_or_else(|| {
                    DashboardError::PipelineError {
                        message: "no row has a date to derive the range from".to_string(),
                    }
                })?;
                DateRange::new(start.unwrap_or(bounds.start), end.unwrap_or(bounds.end))?
            }
        };

        let filtered = filter_by_date(&normalized, range)?;
        let table = project(&filtered)?;

        Ok(UploadView {
            range,
            rows_read: raw.len(),
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetcher::RetryPolicy;
    use crate::core::normalizer::MatchMode;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::time::Duration;

    struct MockConfig {
        api_endpoint: Option<String>,
        api_token: Option<String>,
        match_mode: MatchMode,
        extra_synonyms: HashMap<String, Vec<String>>,
    }

    impl MockConfig {
        fn new(api_endpoint: Option<String>) -> Self {
            Self {
                api_endpoint,
                api_token: Some("test-token".to_string()),
                match_mode: MatchMode::Relaxed,
                extra_synonyms: HashMap::new(),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn api_endpoint(&self) -> Option<&str> {
            self.api_endpoint.as_deref()
        }

        fn api_token(&self) -> Option<&str> {
            self.api_token.as_deref()
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn retry_policy(&self) -> RetryPolicy {
            RetryPolicy {
                backoff_base: Duration::from_millis(5),
                ..RetryPolicy::default()
            }
        }

        fn match_mode(&self) -> MatchMode {
            self.match_mode
        }

        fn extra_synonyms(&self) -> HashMap<String, Vec<String>> {
            self.extra_synonyms.clone()
        }
    }

    const EXPORT: &str = "Ads Manager export\n\
                          Campaign Name,Impr.,Reach,Link Clicks,Purchases,Day\n\
                          Spring,1000,800,50,5,2024-01-01\n\
                          Summer,2000,1500,90,12,2024-01-05\n\
                          Autumn,1500,1200,70,8,2024-01-10\n";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_process_upload_with_range() {
        let dashboard = Dashboard::new(MockConfig::new(None), Logger::disabled()).unwrap();
        let view = dashboard
            .process_upload(EXPORT.as_bytes(), Some(date(2024, 1, 2)), Some(date(2024, 1, 10)))
            .unwrap();

        assert_eq!(view.rows_read, 3);
        assert_eq!(view.table.len(), 2);
        assert_eq!(
            view.table.columns(),
            ["campaign", "impression", "reach", "clicks", "conversion"]
        );
    }

    #[test]
    fn test_process_upload_defaults_to_data_span() {
        let dashboard = Dashboard::new(MockConfig::new(None), Logger::disabled()).unwrap();

        let view = dashboard.process_upload(EXPORT.as_bytes(), None, None).unwrap();

        assert_eq!(view.range.start, date(2024, 1, 1));
        assert_eq!(view.range.end, date(2024, 1, 10));
        assert_eq!(view.table.len(), 3);
    }

    #[test]
    fn test_process_upload_open_ended_range() {
        let dashboard = Dashboard::new(MockConfig::new(None), Logger::disabled()).unwrap();

        let view = dashboard
            .process_upload(EXPORT.as_bytes(), Some(date(2024, 1, 5)), None)
            .unwrap();

        assert_eq!(view.range.end, date(2024, 1, 10));
        assert_eq!(view.table.len(), 2);
    }

    #[test]
    fn test_process_upload_rejects_inverted_range() {
        let dashboard = Dashboard::new(MockConfig::new(None), Logger::disabled()).unwrap();

        let err = dashboard
            .process_upload(EXPORT.as_bytes(), Some(date(2024, 1, 9)), Some(date(2024, 1, 2)))
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_exact_mode_rejects_capitalised_export() {
        let mut config = MockConfig::new(None);
        config.match_mode = MatchMode::Exact;
        let dashboard = Dashboard::new(config, Logger::disabled()).unwrap();

        let err = dashboard.process_upload(EXPORT.as_bytes(), None, None).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumnError { .. }));
    }

    #[test]
    fn test_invalid_extra_synonym_fails_construction() {
        let mut config = MockConfig::new(None);
        config
            .extra_synonyms
            .insert("budget".to_string(), vec!["Budget".to_string()]);
        assert!(Dashboard::new(config, Logger::disabled()).is_err());
    }

    #[tokio::test]
    async fn test_load_api_data_sends_bearer_token() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/data")
                .header("Authorization", "Bearer test-token");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"total": 3}));
        });

        let dashboard =
            Dashboard::new(MockConfig::new(Some(server.url("/data"))), Logger::disabled())
                .unwrap();
        let data = dashboard.load_api_data().await.unwrap();

        api_mock.assert();
        assert_eq!(data["total"], 3);
    }

    #[tokio::test]
    async fn test_load_api_data_without_endpoint() {
        let dashboard = Dashboard::new(MockConfig::new(None), Logger::disabled()).unwrap();
        let err = dashboard.load_api_data().await.unwrap_err();
        assert!(matches!(err, DashboardError::MissingConfigError { .. }));
    }
}
