//! Error types for the converter service.

use crate::domain::CurrencyCode;

/// Machine-readable error kinds. Each one is the key of a 400 response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Currency code outside the supported set, or not added by the user.
    WrongCode,
    /// The user already has a converter for this currency.
    UniqueCode,
    /// Ownership mismatch, or no converter/rate for a conversion.
    ConverterUser,
    /// Upstream rate provider unreachable or returned unusable data.
    ServerApi,
    Title,
    WrongAmount,
    Email,
    Bootstrap,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::WrongCode => "wrong_code",
            ErrorKind::UniqueCode => "unique_code",
            ErrorKind::ConverterUser => "converter_user",
            ErrorKind::ServerApi => "server_api",
            ErrorKind::Title => "title",
            ErrorKind::WrongAmount => "wrong_amount",
            ErrorKind::Email => "email",
            ErrorKind::Bootstrap => "bootstrap",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing messages.
pub mod messages {
    pub const UNSUPPORTED_CURRENCY: &str = "Only currently supported currencies may be used.";
    pub const DUPLICATE_CONVERTER: &str = "You have already added this currency for conversion.";
    pub const FOREIGN_OWNER: &str = "You specified another user.";
    pub const CURRENCY_NOT_ADDED: &str = "You have not added this currency for conversion.";
    pub const NO_CONVERTER_FOR_USER: &str =
        "The user has not added this currency for conversion.";
    pub const RATES_UNAVAILABLE: &str = "The exchange rate server is unavailable.";
    pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
    pub const INVALID_API_KEY: &str = "Invalid API key.";
    pub const FORBIDDEN: &str = "You do not have permission to perform this action.";
    pub const NOT_FOUND: &str = "Not found.";
    pub const FIELD_REQUIRED: &str = "This field is required.";
    pub const INVALID_INTEGER: &str = "A valid integer is required.";
}

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Conversion of {amount} at rate {rate} overflows")]
    AmountOverflow { amount: i64, rate: rust_decimal::Decimal },

    #[error("Provider returned no rate for {0}")]
    MissingRate(CurrencyCode),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{kind}: {message}")]
    Validation { kind: ErrorKind, message: String },

    /// A request body field that is missing or of the wrong type.
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },

    /// A body that is not JSON at all.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(kind: ErrorKind, message: impl Into<String>) -> Self {
        AppError::Validation {
            kind,
            message: message.into(),
        }
    }

    /// The validation kind, if this is a 400-class error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Validation { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidTitle(msg) => AppError::validation(ErrorKind::Title, msg),
            DomainError::InvalidEmail(msg) => AppError::validation(ErrorKind::Email, msg),
            e @ DomainError::AmountOverflow { .. } => {
                AppError::validation(ErrorKind::WrongAmount, e.to_string())
            }
            DomainError::MissingRate(_) => {
                AppError::validation(ErrorKind::ServerApi, messages::RATES_UNAVAILABLE)
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound(messages::NOT_FOUND.into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            // (code, owner) on converters. Email conflicts are mapped by the service.
            RepoError::Conflict(_) => {
                AppError::validation(ErrorKind::UniqueCode, messages::DUPLICATE_CONVERTER)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_conflict_maps_to_unique_code() {
        let err: AppError = RepoError::Conflict("converters_code_owner".into()).into();
        assert_eq!(err.kind(), Some(ErrorKind::UniqueCode));
    }

    #[test]
    fn test_missing_rate_maps_to_server_api() {
        let err: AppError = DomainError::MissingRate(CurrencyCode::EUR).into();
        assert_eq!(err.kind(), Some(ErrorKind::ServerApi));
    }

    #[test]
    fn test_database_error_is_internal() {
        let err: AppError = RepoError::Database("disk I/O error".into()).into();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.kind(), None);
    }
}
