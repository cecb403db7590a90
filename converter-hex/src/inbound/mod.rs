//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
mod handlers;
mod rate_limit;
mod server;

pub use handlers::ApiError;
pub use rate_limit::{Caller, RateLimits};
pub use server::HttpServer;
