//! HTTP client for the apilayer `exchangerates_data` API.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{CurrencyCode, RateProvider, RateProviderError, RateTable};

pub const DEFAULT_BASE_URL: &str = "https://api.apilayer.com/exchangerates_data";

#[derive(Debug, Deserialize)]
struct LatestResponse {
    rates: Option<HashMap<String, serde_json::Number>>,
}

/// Rate provider backed by `GET {base_url}/latest?symbols=..&base=..`.
pub struct ApiLayerProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl ApiLayerProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: Client::new(),
        }
    }

    /// Same as [`ApiLayerProvider::new`] with a whole-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RateProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateProviderError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        })
    }
}

fn parse_rate(value: &serde_json::Number) -> Result<Decimal, RateProviderError> {
    let text = value.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| RateProviderError::Decode(format!("invalid rate {}: {}", text, e)))
}

#[async_trait::async_trait]
impl RateProvider for ApiLayerProvider {
    #[tracing::instrument(skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: CurrencyCode) -> Result<RateTable, RateProviderError> {
        let peers = base.peers();
        let symbols = peers
            .iter()
            .map(|c| c.code())
            .collect::<Vec<_>>()
            .join(",");

        let resp = self
            .http
            .get(format!("{}/latest", self.base_url))
            .header("apikey", &self.api_key)
            .query(&[("symbols", symbols.as_str()), ("base", base.code())])
            .send()
            .await
            .map_err(|e| RateProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "rate provider rejected request");
            return Err(RateProviderError::Status(status.as_u16()));
        }

        let body: LatestResponse = resp
            .json()
            .await
            .map_err(|e| RateProviderError::Decode(e.to_string()))?;

        let raw = body.rates.unwrap_or_default();
        let mut rates = Vec::with_capacity(peers.len());
        for (code, value) in &raw {
            // Anything outside the peer set is ignored.
            match CurrencyCode::lookup(code) {
                Some(code) if peers.contains(&code) => rates.push((code, parse_rate(value)?)),
                _ => tracing::debug!(code = %code, "ignoring unrequested currency"),
            }
        }

        if rates.is_empty() {
            return Err(RateProviderError::Empty(base));
        }

        tracing::debug!(count = rates.len(), "fetched rates");
        Ok(RateTable::new(base, rates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", "USD"))
            .and(query_param("symbols", "GBP,EUR,CNY"))
            .and(header("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_fetch_rates_success() {
        let body = r#"{"success": true, "base": "USD", "rates": {"GBP": 0.79, "EUR": 0.92, "CNY": 7.2345678}}"#;
        let server = create_mock_server(200, body).await;
        let provider = ApiLayerProvider::new(server.uri(), "test-key");

        let table = provider.fetch_rates(CurrencyCode::USD).await.unwrap();

        assert_eq!(table.base(), CurrencyCode::USD);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(CurrencyCode::GBP).unwrap().to_string(), "0.790000");
        assert_eq!(table.get(CurrencyCode::CNY).unwrap().to_string(), "7.234568");
    }

    #[tokio::test]
    async fn test_fetch_rates_ignores_unrequested_codes() {
        let body = r#"{"rates": {"GBP": 0.79, "JPY": 150.1}}"#;
        let server = create_mock_server(200, body).await;
        let provider = ApiLayerProvider::new(server.uri(), "test-key");

        let table = provider.fetch_rates(CurrencyCode::USD).await.unwrap();

        assert_eq!(table.len(), 1);
        assert!(table.get(CurrencyCode::GBP).is_some());
    }

    #[tokio::test]
    async fn test_fetch_rates_non_success_status() {
        let server = create_mock_server(401, r#"{"message": "Invalid authentication credentials"}"#).await;
        let provider = ApiLayerProvider::new(server.uri(), "test-key");

        let result = provider.fetch_rates(CurrencyCode::USD).await;

        assert!(matches!(result, Err(RateProviderError::Status(401))));
    }

    #[tokio::test]
    async fn test_fetch_rates_missing_rates_field() {
        let server = create_mock_server(200, r#"{"success": false}"#).await;
        let provider = ApiLayerProvider::new(server.uri(), "test-key");

        let result = provider.fetch_rates(CurrencyCode::USD).await;

        assert!(matches!(result, Err(RateProviderError::Empty(CurrencyCode::USD))));
    }

    #[tokio::test]
    async fn test_fetch_rates_invalid_json() {
        let server = create_mock_server(200, "not json").await;
        let provider = ApiLayerProvider::new(server.uri(), "test-key");

        let result = provider.fetch_rates(CurrencyCode::USD).await;

        assert!(matches!(result, Err(RateProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_rates_unreachable_server() {
        // Nothing listens on port 9 on loopback in the test environment.
        let provider = ApiLayerProvider::new("http://127.0.0.1:9", "test-key");

        let result = provider.fetch_rates(CurrencyCode::USD).await;

        assert!(matches!(result, Err(RateProviderError::Transport(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = ApiLayerProvider::new("http://localhost:8080/", "k");
        assert_eq!(provider.base_url, "http://localhost:8080");
    }
}
