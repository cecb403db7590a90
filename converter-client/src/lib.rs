//! # Converter Client SDK
//!
//! A typed Rust client for the Currency Converter API.

use converter_types::{
    ApiKeyIssued, BootstrapRequest, ConvertRequest, ConvertResponse, ConverterDetailResponse,
    ConverterId, ConverterResponse, CreateConverterRequest, CreateUserRequest,
    UpdateConverterRequest, UserResponse,
};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Currency Converter API client.
pub struct ConverterClient {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl ConverterClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            http: Client::new(),
        }
    }

    /// Sets the API key for authentication.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Creates the first user. Only works against an empty server.
    pub async fn bootstrap(&self, email: &str) -> Result<ApiKeyIssued, ClientError> {
        let req = BootstrapRequest {
            email: email.to_string(),
        };
        self.send(Method::POST, "/api/bootstrap", Some(&req)).await
    }

    /// Registers another user (staff only).
    pub async fn create_user(&self, email: &str, is_staff: bool) -> Result<ApiKeyIssued, ClientError> {
        let req = CreateUserRequest {
            email: email.to_string(),
            is_staff,
        };
        self.send(Method::POST, "/api/users", Some(&req)).await
    }

    /// The user the API key belongs to.
    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        self.send::<_, ()>(Method::GET, "/api/users/me", None).await
    }

    /// Creates a converter for `code`, owned by `converter_user`.
    pub async fn create_converter(
        &self,
        title: &str,
        code: &str,
        converter_user: &str,
    ) -> Result<ConverterResponse, ClientError> {
        let req = CreateConverterRequest {
            title: title.to_string(),
            code: code.to_string(),
            converter_user: converter_user.to_string(),
        };
        self.send(Method::POST, "/converter/create/", Some(&req)).await
    }

    /// Gets a converter with its rates.
    pub async fn get_converter(&self, id: ConverterId) -> Result<ConverterDetailResponse, ClientError> {
        self.send::<_, ()>(Method::GET, &format!("/converter/{}/", id), None)
            .await
    }

    /// Refreshes a converter's rates. `code` must be the converter's own code.
    pub async fn update_converter(
        &self,
        id: ConverterId,
        code: &str,
    ) -> Result<ConverterDetailResponse, ClientError> {
        let req = UpdateConverterRequest {
            code: code.to_string(),
        };
        self.send(Method::PATCH, &format!("/converter/update/{}/", id), Some(&req))
            .await
    }

    /// Converts `amount` units of `base` into `target` with stored rates.
    pub async fn convert(
        &self,
        base: &str,
        target: &str,
        amount: i64,
    ) -> Result<ConvertResponse, ClientError> {
        let req = ConvertRequest {
            base_currency: base.to_string(),
            target_currency: target.to_string(),
            amount,
        };
        self.send(Method::POST, "/converter/get_rate/", Some(&req)).await
    }

    async fn send<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            req = req.json(body);
        }
        if let Some(key) = &self.api_key {
            req = req.header("X-API-Key", key);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Pulls a readable message out of `{"detail": ".."}` or `{"<kind>": [".."]}`.
fn error_message(body: &serde_json::Value) -> Option<String> {
    if let Some(detail) = body.get("detail").and_then(|d| d.as_str()) {
        return Some(detail.to_string());
    }
    let (kind, messages) = body.as_object()?.iter().next()?;
    let first = messages.as_array()?.first()?.as_str()?;
    Some(format!("{}: {}", kind, first))
}
