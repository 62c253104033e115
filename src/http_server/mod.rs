//! # eCRF HTTP Server Module
//!
//! Axum transport over the service facade.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/api/forms/*` - Template catalog
//! - `/api/studies/*` - Studies, bound forms, records and export

pub mod config;
pub mod errors;
pub mod export_stream;
pub mod routes;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult};
pub use routes::ecrf_routes;
pub use server::HttpServer;
