//! ecrf - clinical-trial case report form backend
//!
//! Form templates, study binding, validated record capture with debounced
//! durable storage, and study export as a compressed archive.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod http_server;
pub mod observability;
pub mod records;
pub mod schema;
pub mod service;
pub mod storage;
pub mod study;
pub mod validation;

pub use config::EcrfConfig;
pub use error::{EcrfError, EcrfResult, ResourceKind};
pub use service::EcrfService;
