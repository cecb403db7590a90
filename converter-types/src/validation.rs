//! Input validators shared by the create, update and convert operations.

use crate::domain::{CurrencyCode, UserId};
use crate::error::{AppError, ErrorKind, messages};
use crate::ports::ConverterRepository;

/// Upper-cases `raw` and checks it against the supported currency set.
pub fn validate_code(raw: &str) -> Result<CurrencyCode, AppError> {
    CurrencyCode::lookup(raw)
        .ok_or_else(|| AppError::validation(ErrorKind::WrongCode, messages::UNSUPPORTED_CURRENCY))
}

/// Fails with `unique_code` if `user` already has a converter for `code`.
///
/// Only the create path calls this; refreshing writes the same code back.
pub async fn validate_unique<R: ConverterRepository>(
    repo: &R,
    code: CurrencyCode,
    user: UserId,
) -> Result<(), AppError> {
    match repo.find_converter(code, user).await? {
        Some(_) => Err(AppError::validation(
            ErrorKind::UniqueCode,
            messages::DUPLICATE_CONVERTER,
        )),
        None => Ok(()),
    }
}
