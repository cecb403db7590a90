//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{FromRequest, Path, Request, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use converter_types::error::messages;
use converter_types::{
    AppError, BootstrapRequest, ConvertRequest, ConverterId, ConverterRepository,
    CreateConverterRequest, CreateUserRequest, RateProvider, UpdateConverterRequest, User,
    UserResponse,
};

use crate::ConverterService;

/// Application state shared across handlers.
pub struct AppState<R: ConverterRepository, P: RateProvider> {
    pub service: ConverterService<R, P>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
///
/// Validation failures become `{"<kind>": ["<message>"]}`, everything else
/// `{"detail": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            AppError::Validation { kind, message } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ (kind.as_str()): [message] }),
            ),
            AppError::InvalidField { field, message } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ (field): [message] }),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "detail": msg }))
            }
            AppError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                serde_json::json!({ "detail": msg }),
            ),
            AppError::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, serde_json::json!({ "detail": msg }))
            }
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, serde_json::json!({ "detail": msg }))
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, serde_json::json!({ "detail": msg }))
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "detail": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// JSON body extractor whose rejections use the API's error bodies: a
/// missing or mistyped field is a 400 keyed by that field.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ApiJson(value))
            .map_err(|rejection| ApiError(json_rejection(rejection)))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(e) => {
            let (field, message) = field_error(&e.body_text());
            AppError::InvalidField { field, message }
        }
        JsonRejection::MissingJsonContentType(e) => AppError::UnsupportedMediaType(e.body_text()),
        other => AppError::BadRequest(other.body_text()),
    }
}

/// Splits a deserialization failure into the offending field and a message.
///
/// Errors not tied to a single field are keyed `non_field_errors`.
fn field_error(detail: &str) -> (String, String) {
    let detail = detail
        .split_once("target type: ")
        .map_or(detail, |(_, rest)| rest);
    let detail = detail.rfind(" at line ").map_or(detail, |i| &detail[..i]);

    if let Some(rest) = detail.strip_prefix("missing field `") {
        if let Some((field, _)) = rest.split_once('`') {
            return (field.to_string(), messages::FIELD_REQUIRED.to_string());
        }
    }

    match detail.split_once(": ") {
        Some((field, message)) if !field.is_empty() && !field.contains(' ') => {
            (field.to_string(), message.to_string())
        }
        _ => ("non_field_errors".to_string(), detail.to_string()),
    }
}

/// Parses a path id. Anything that is not a known id is simply not found.
fn parse_converter_id(raw: &str) -> Result<ConverterId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(messages::NOT_FOUND.into()))
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// Bootstrap endpoint - creates the first user and their API key.
///
/// This endpoint only works when there are NO existing users in the system.
/// It returns the raw API key (only shown once) that should be saved securely.
#[tracing::instrument(skip(state, req))]
pub async fn bootstrap<R: ConverterRepository, P: RateProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    ApiJson(req): ApiJson<BootstrapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state.service.bootstrap(req).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// Register a user (staff only).
#[tracing::instrument(skip(state, user, req), fields(acting = %user.email))]
pub async fn create_user<R: ConverterRepository, P: RateProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Extension(user): Extension<User>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state.service.create_user(&user, req).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// The authenticated user.
pub async fn me(Extension(user): Extension<User>) -> impl IntoResponse {
    Json(UserResponse::from(&user))
}

// ─────────────────────────────────────────────────────────────────────────────
// Converters
// ─────────────────────────────────────────────────────────────────────────────

/// Create a converter for the authenticated user.
#[tracing::instrument(skip(state, user, req), fields(user = %user.email, code = %req.code))]
pub async fn create_converter<R: ConverterRepository, P: RateProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Extension(user): Extension<User>,
    ApiJson(req): ApiJson<CreateConverterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let converter = state.service.create_converter(&user, req).await?;
    Ok((StatusCode::CREATED, Json(converter)))
}

/// Get converter detail by ID.
#[tracing::instrument(skip(state, user), fields(user = %user.email, converter_id = %id))]
pub async fn get_converter<R: ConverterRepository, P: RateProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let converter_id = parse_converter_id(&id)?;
    let converter = state.service.get_converter(&user, converter_id).await?;
    Ok(Json(converter))
}

/// Refresh a converter's rates.
#[tracing::instrument(skip(state, user, req), fields(user = %user.email, converter_id = %id))]
pub async fn update_converter<R: ConverterRepository, P: RateProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateConverterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let converter_id = parse_converter_id(&id)?;
    let converter = state
        .service
        .update_converter(&user, converter_id, req)
        .await?;
    Ok(Json(converter))
}

/// Convert an amount with the authenticated user's stored rates.
#[tracing::instrument(skip(state, user, req), fields(user = %user.email))]
pub async fn convert<R: ConverterRepository, P: RateProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Extension(user): Extension<User>,
    ApiJson(req): ApiJson<ConvertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.service.convert(&user, req).await?;
    Ok(Json(result))
}
