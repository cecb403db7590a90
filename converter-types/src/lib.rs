//! # Converter Types
//!
//! Domain types and port traits for the currency converter service.
//! This crate has ZERO IO of its own - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Converter, CurrencyRate, User, Conversion)
//! - `validation/` - Input checks shared by every operation
//! - `policy/` - Ownership-based authorization decisions
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod policy;
pub mod ports;
pub mod validation;

// Re-export commonly used types
pub use domain::{
    ApiKey, ApiKeyId, Conversion, Converter, ConverterId, CurrencyCode, CurrencyRate,
    CurrencyRateId, MAX_TITLE_LEN, User, UserId, now_micros,
};
pub use dto::*;
pub use error::{AppError, DomainError, ErrorKind, RepoError};
pub use policy::{Decision, DenyReason, Operation, assign_owner, authorize};
pub use ports::{ConverterRepository, RateProvider, RateProviderError, RateTable};
