//! # Converter Hex
//!
//! Application service layer and HTTP adapter for the currency converter service.
//!
//! ## Architecture
//!
//! - `service/` - Application service (orchestrates domain operations)
//! - `inbound/` - HTTP adapter (Axum server)
//! - `openapi/` - OpenAPI document served by Swagger UI
//!
//! The service is generic over `R: ConverterRepository` and `P: RateProvider`,
//! allowing different repository and rate source implementations to be injected.

pub mod inbound;
pub mod openapi;
pub mod service;


pub use service::ConverterService;
