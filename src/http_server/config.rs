//! HTTP listener configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 5000); `PORT` overrides
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl HttpServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Applies a `PORT`-style override; unparsable values are ignored.
    pub fn apply_port_override(&mut self, raw: Option<&str>) {
        if let Some(port) = raw.and_then(|p| p.trim().parse::<u16>().ok()) {
            self.port = port;
        }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpServerConfig::default();
        assert_eq!(config.socket_addr(), "0.0.0.0:5000");
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_port_override() {
        let mut config = HttpServerConfig::with_port(8080);
        config.apply_port_override(Some("9090"));
        assert_eq!(config.port, 9090);
        config.apply_port_override(Some("not-a-port"));
        assert_eq!(config.port, 9090);
        config.apply_port_override(None);
        assert_eq!(config.port, 9090);
    }
}
