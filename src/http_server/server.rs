//! # HTTP Server
//!
//! Binds the eCRF router, applies CORS, and flushes state on shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::config::HttpServerConfig;
use super::routes::ecrf_routes;
use crate::observability::Event;
use crate::service::EcrfService;

pub struct HttpServer {
    config: HttpServerConfig,
    service: Arc<EcrfService>,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, service: Arc<EcrfService>) -> Self {
        let router = Self::build_router(&config, service.clone());
        Self {
            config,
            service,
            router,
        }
    }

    /// Router with every endpoint and middleware
    pub fn build_router(config: &HttpServerConfig, service: Arc<EcrfService>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        ecrf_routes(service)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serves until ctrl-c, then writes pending state.
    pub async fn start(self) -> std::io::Result<()> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        info!(event = Event::Serving.as_str(), %addr, "eCRF API listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!(event = Event::ShutdownStart.as_str());
        let service = self.service.clone();
        match tokio::task::spawn_blocking(move || service.flush_now()).await {
            Ok(Ok(())) => info!(event = Event::ShutdownComplete.as_str()),
            Ok(Err(e)) => error!(event = Event::FlushFailed.as_str(), error = %e, "final flush failed"),
            Err(e) => error!(event = Event::FlushFailed.as_str(), error = %e, "final flush panicked"),
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use crate::storage::{ManualScheduler, MemoryBackend, StateStore};

    fn service() -> Arc<EcrfService> {
        let state = StateStore::open(Arc::new(MemoryBackend::new()), Arc::new(ManualScheduler::new())).unwrap();
        Arc::new(EcrfService::new(SchemaRegistry::with_builtin(), state))
    }

    #[test]
    fn test_server_with_custom_port() {
        let server = HttpServer::new(HttpServerConfig::with_port(8080), service());
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_router_builds_with_origin_list() {
        let config = HttpServerConfig {
            cors_origins: vec!["http://localhost:5173".into()],
            ..Default::default()
        };
        let _router = HttpServer::new(config, service()).router();
    }
}
