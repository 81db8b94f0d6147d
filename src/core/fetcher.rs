use crate::utils::error::{DashboardError, Result};
use crate::utils::logger::Logger;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Bounded retry budget for transient HTTP statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(250),
            backoff_cap: Duration::from_secs(10),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    /// Delay before retry number `retry` (1-based): base * 2^(retry-1), capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(factor).min(self.backoff_cap)
    }

    fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        retry_after
            .map(|d| d.min(self.backoff_cap))
            .unwrap_or_else(|| self.backoff(retry))
    }
}

/// `Authorization: Bearer <token>` header set, empty when no token is configured.
pub fn bearer_headers(token: Option<&str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    if let Some(token) = token {
        headers.insert("Authorization".to_string(), format!("Bearer {}", token));
    }
    headers
}

/// HTTP GET client that retries transient statuses and classifies failures.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    logger: Logger,
}

impl Fetcher {
    pub fn new(timeout: Duration, policy: RetryPolicy, logger: Logger) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            policy,
            logger,
        })
    }

    /// GETs `url` and returns the JSON body as-is.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<serde_json::Value> {
        self.logger
            .instrument(async {
                self.fetch_with_retries(url, headers)
                    .await
                    .map_err(|e| log_failure(url, e))
            })
            .await
    }

    async fn fetch_with_retries(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<serde_json::Value> {
        let header_map = build_header_map(url, headers)?;
        let mut retries = 0;

        loop {
            tracing::debug!(%url, attempt = retries + 1, "Attempting to connect to {}", url);

            let response = self
                .client
                .get(url)
                .headers(header_map.clone())
                .send()
                .await
                .map_err(|e| classify_transport(url, e))?;

            let status = response.status();
            tracing::debug!(%url, status = status.as_u16(), "API response status");

            if status.is_success() {
                return response
                    .json::<serde_json::Value>()
                    .await
                    .map_err(|e| classify_transport(url, e));
            }

            if self.policy.is_retryable(status) && retries < self.policy.max_retries {
                retries += 1;
                let delay = self.policy.delay_for(retries, retry_after(response.headers()));
                tracing::warn!(
                    %url,
                    status = status.as_u16(),
                    retry = retries,
                    delay_ms = delay.as_millis() as u64,
                    "Transient status, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(DashboardError::HttpError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
    }
}

fn build_header_map(url: &str, headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            DashboardError::RequestError {
                url: url.to_string(),
                message: format!("invalid header name '{}': {}", key, e),
            }
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| DashboardError::RequestError {
            url: url.to_string(),
            message: format!("invalid value for header '{}': {}", key, e),
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn classify_transport(url: &str, error: reqwest::Error) -> DashboardError {
    // connect timeouts report both flags; timeout wins
    if error.is_timeout() {
        DashboardError::TimeoutError {
            url: url.to_string(),
            source: error,
        }
    } else if error.is_connect() {
        DashboardError::ConnectionError {
            url: url.to_string(),
            source: error,
        }
    } else if error.is_decode() {
        DashboardError::RequestError {
            url: url.to_string(),
            message: format!("response body is not valid JSON: {}", error),
        }
    } else {
        DashboardError::RequestError {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

fn log_failure(url: &str, error: DashboardError) -> DashboardError {
    tracing::error!(
        %url,
        category = ?error.category(),
        "Request to {} failed: {}",
        url,
        error
    );
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::{Read, Write};
    use std::sync::{Arc, Mutex};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            backoff_base: Duration::from_millis(5),
            ..RetryPolicy::default()
        }
    }

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(5), fast_policy(), Logger::disabled()).unwrap()
    }

    fn http_response(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
            status,
            body.len(),
            extra_headers,
            body
        )
    }

    /// Serves `responses` in order, one per connection, and reports how many were served.
    fn scripted_server(responses: Vec<String>) -> (String, std::thread::JoinHandle<usize>) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/campaigns", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut served = 0;
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                stream.write_all(response.as_bytes()).unwrap();
                served += 1;
            }
            served
        });
        (url, handle)
    }

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            backoff_base: Duration::from_millis(100),
            backoff_cap: Duration::from_millis(300),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(300));
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(60))),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_retryable_statuses() {
        let policy = RetryPolicy::default();
        for code in [429, 500, 502, 503, 504] {
            assert!(policy.is_retryable(StatusCode::from_u16(code).unwrap()));
        }
        for code in [400, 401, 404, 501] {
            assert!(!policy.is_retryable(StatusCode::from_u16(code).unwrap()));
        }
    }

    #[test]
    fn test_bearer_headers() {
        assert!(bearer_headers(None).is_empty());
        assert_eq!(
            bearer_headers(Some("abc"))["Authorization"],
            "Bearer abc".to_string()
        );
    }

    #[tokio::test]
    async fn test_fetch_returns_json_body_with_bearer_token() {
        let server = MockServer::start();
        let body = serde_json::json!({"campaigns": [{"name": "Spring", "clicks": 10}]});

        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/data")
                .header("Authorization", "Bearer secret");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(body.clone());
        });

        let result = fetcher()
            .fetch(&server.url("/data"), &bearer_headers(Some("secret")))
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(result, body);
    }

    #[tokio::test]
    async fn test_fetch_retries_503_then_succeeds() {
        let (url, served) = scripted_server(vec![
            http_response("503 Service Unavailable", "", "{}"),
            http_response("503 Service Unavailable", "", "{}"),
            http_response("200 OK", "", r#"{"ok":true}"#),
        ]);

        let result = fetcher().fetch(&url, &HashMap::new()).await.unwrap();

        assert_eq!(result, serde_json::json!({"ok": true}));
        assert_eq!(served.join().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_fetch_honours_retry_after_on_429() {
        let (url, served) = scripted_server(vec![
            http_response("429 Too Many Requests", "Retry-After: 0\r\n", "{}"),
            http_response("200 OK", "", "[1,2,3]"),
        ]);
        let slow = RetryPolicy {
            backoff_base: Duration::from_secs(30),
            ..RetryPolicy::default()
        };
        let fetcher = Fetcher::new(Duration::from_secs(5), slow, Logger::disabled()).unwrap();

        let started = std::time::Instant::now();
        let result = fetcher.fetch(&url, &HashMap::new()).await.unwrap();

        assert_eq!(result, serde_json::json!([1, 2, 3]));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(served.join().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fetch_404_fails_without_retry() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let err = fetcher()
            .fetch(&server.url("/missing"), &HashMap::new())
            .await
            .unwrap_err();

        api_mock.assert_hits(1);
        assert!(matches!(err, DashboardError::HttpError { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_retry_budget() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });

        let err = fetcher()
            .fetch(&server.url("/flaky"), &HashMap::new())
            .await
            .unwrap_err();

        api_mock.assert_hits(4);
        assert!(matches!(err, DashboardError::HttpError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_invalid_json_is_request_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html>not json</html>");
        });

        let err = fetcher()
            .fetch(&server.url("/html"), &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DashboardError::RequestError { .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_classified() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .delay(Duration::from_millis(800))
                .json_body(serde_json::json!({}));
        });
        let fetcher =
            Fetcher::new(Duration::from_millis(100), fast_policy(), Logger::disabled()).unwrap();

        let err = fetcher
            .fetch(&server.url("/slow"), &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DashboardError::TimeoutError { .. }));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_classified() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{}/data", port);

        let err = fetcher().fetch(&url, &HashMap::new()).await.unwrap_err();

        assert!(matches!(err, DashboardError::ConnectionError { .. }));
    }

    #[tokio::test]
    async fn test_fetch_logs_attempt_and_failure_to_injected_logger() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(410);
        });
        let buffer = Buffer::default();
        let sink = buffer.clone();
        let logger = Logger::with_writer("debug", move || sink.clone());
        let fetcher = Fetcher::new(Duration::from_secs(5), fast_policy(), logger).unwrap();
        let url = server.url("/gone");

        let _ = fetcher.fetch(&url, &HashMap::new()).await;

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("DEBUG"));
        assert!(output.contains("Attempting to connect to"));
        assert!(output.contains("ERROR"));
        assert!(output.contains(&url));
    }
}
