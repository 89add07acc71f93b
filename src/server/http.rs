//! HTTP listener
//!
//! Binds the configured address and serves the router until Ctrl+C.

use crate::error::ConfigError;
use axum::Router;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

/// Default port for the HTTP API
pub const DEFAULT_HTTP_PORT: u16 = 8640;

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to bind to (e.g., "127.0.0.1:8640")
    pub bind: SocketAddr,
    /// Origins allowed by CORS; empty disables the CORS layer
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_HTTP_PORT)),
            cors_origins: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            ..Default::default()
        }
    }

    /// Create config from host and port strings
    pub fn from_host_port(host: &str, port: u16) -> Result<Self, std::net::AddrParseError> {
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        Ok(Self::new(addr))
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// CORS layer for the configured origins, if any
    pub fn cors_layer(&self) -> Result<Option<CorsLayer>, ConfigError> {
        if self.cors_origins.is_empty() {
            return Ok(None);
        }
        let origins = self
            .cors_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                    message: format!("server.cors_origins entry '{}': {}", origin, e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any),
        ))
    }
}

/// Serve `router` and wait for a shutdown signal
pub async fn run_http(router: Router, config: HttpConfig) -> anyhow::Result<()> {
    let router = match config.cors_layer()? {
        Some(cors) => router.layer(cors),
        None => router,
    };

    let listener = TcpListener::bind(config.bind).await?;
    info!("HTTP API listening on http://{}", listener.local_addr()?);
    info!("Press Ctrl+C to stop the server");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_host_port() {
        let config = HttpConfig::from_host_port("0.0.0.0", 9000).unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert!(HttpConfig::from_host_port("not a host", 9000).is_err());
    }

    #[test]
    fn test_cors_layer() {
        assert!(HttpConfig::default().cors_layer().unwrap().is_none());

        let config =
            HttpConfig::default().with_cors_origins(vec!["http://localhost:5173".to_string()]);
        assert!(config.cors_layer().unwrap().is_some());

        let bad = HttpConfig::default().with_cors_origins(vec!["bad\norigin".to_string()]);
        assert!(bad.cors_layer().is_err());
    }
}
