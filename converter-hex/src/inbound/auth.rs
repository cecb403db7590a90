//! Authentication middleware for API key validation.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use converter_types::error::messages;
use converter_types::{AppError, ConverterRepository, RateProvider};

use super::handlers::{ApiError, AppState};

/// Extracts the API key from the request headers.
/// Accepted: `Authorization: Bearer <api_key>`, `Authorization: <api_key>`
/// or `X-API-Key: <api_key>`.
fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    let key = match headers.get("Authorization").and_then(|v| v.to_str().ok()) {
        Some(header) => header.strip_prefix("Bearer ").unwrap_or(header),
        None => headers.get("X-API-Key").and_then(|v| v.to_str().ok())?,
    };
    let key = key.trim();
    if key.is_empty() { None } else { Some(key) }
}

/// Routes that do not need an identity.
fn is_public(method: &Method, path: &str) -> bool {
    path == "/health"
        || (path == "/api/bootstrap" && *method == Method::POST)
        || path.starts_with("/swagger-ui")
        || path.starts_with("/api-docs")
}

/// Authentication middleware that resolves API keys to users.
///
/// This middleware:
/// 1. Extracts the API key from the request headers
/// 2. Hashes it using SHA-256
/// 3. Resolves the hash to an active key's user
/// 4. Stores the `User` as a request extension for handlers
///
/// A missing key is `401` with the standard "not provided" detail, an unknown
/// key `401` with "Invalid API key.".
pub async fn auth_middleware<R: ConverterRepository, P: RateProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let Some(api_key) = extract_api_key(request.headers()) else {
        return ApiError(AppError::Unauthenticated(messages::NOT_AUTHENTICATED.into()))
            .into_response();
    };

    let key_hash = converter_repo::security::hash_api_key(api_key);

    match state.service.repo().authenticate(&key_hash).await {
        Ok(Some(user)) => {
            tracing::debug!(user_id = %user.id, "Authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => {
            ApiError(AppError::Unauthenticated(messages::INVALID_API_KEY.into())).into_response()
        }
        Err(e) => {
            tracing::error!("API key verification failed: {}", e);
            ApiError(AppError::Internal(e.to_string())).into_response()
        }
    }
}
