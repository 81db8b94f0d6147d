use crate::core::fetcher::RetryPolicy;
use crate::core::normalizer::MatchMode;
use std::collections::HashMap;
use std::time::Duration;

/// Settings every front end (CLI flags, TOML file) must supply to the dashboard.
pub trait ConfigProvider: Send + Sync {
    /// `None` skips the API path.
    fn api_endpoint(&self) -> Option<&str>;
    fn api_token(&self) -> Option<&str>;
    fn request_timeout(&self) -> Duration;
    fn retry_policy(&self) -> RetryPolicy;
    fn match_mode(&self) -> MatchMode;

    /// Additional spellings appended after the built-in synonyms, keyed by
    /// canonical column name.
    fn extra_synonyms(&self) -> HashMap<String, Vec<String>> {
        HashMap::new()
    }
}
