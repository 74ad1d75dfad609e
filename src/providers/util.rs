use anyhow::{Result, anyhow};
use std::time::Duration;

const USER_AGENT: &str = "tripboard/1.0";

/// Builds the HTTP client shared by a provider. Every request is bounded by
/// `timeout`; upstream calls are not retried.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
}

/// Fails with `"<what> HTTP error: <status>"` unless the response is 2xx.
pub fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("{} HTTP error: {}", what, status));
    }
    Ok(response)
}

/// `base` without a trailing slash, so paths can be appended with `/`.
pub fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_client_sends_user_agent_and_checks_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = http_client(Duration::from_secs(2)).unwrap();
        let response = client.get(mock_server.uri()).send().await.unwrap();
        let err = ensure_success(response, "Exchange rate").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Exchange rate HTTP error: 503 Service Unavailable"
        );
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let client = http_client(Duration::from_millis(50)).unwrap();
        let result = client.get(mock_server.uri()).send().await;
        assert!(result.unwrap_err().is_timeout());
    }

    #[test]
    fn test_trim_base() {
        assert_eq!(trim_base("http://x/"), "http://x");
        assert_eq!(trim_base("http://x"), "http://x");
    }
}
