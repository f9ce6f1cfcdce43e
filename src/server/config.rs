//! Gateway configuration
//!
//! Built from defaults, then `STREAMNET_*` environment variables, then CLI
//! flags in the binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::admission::{AdmissionGate, TokenValidator};
use crate::error::{Error, Result};

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5050";

/// Default realtime path
pub const DEFAULT_WS_PATH: &str = "/ws/";

/// Gateway configuration options
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Path that accepts WebSocket upgrades
    pub ws_path: String,

    /// Require `Authorization: Bearer <jwt>` on upgrade
    pub auth_required: bool,

    /// HS256 secret for bearer tokens
    pub jwt_secret: Option<String>,

    /// Per-connection outbound queue size (frames)
    pub outbound_capacity: usize,

    /// Largest accepted inbound message in bytes
    pub max_message_size: usize,

    /// How long shutdown waits for connections to drain
    pub shutdown_timeout: Duration,

    /// Stop a session when the connection that started it closes
    pub bind_sessions_to_connections: bool,

    /// Base URL publishers push media to (stream key is appended)
    pub rtmp_base_url: String,

    /// External media server to launch alongside the gateway
    pub media_command: Option<PathBuf>,

    /// Arguments for the media server
    pub media_args: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5050)),
            ws_path: DEFAULT_WS_PATH.to_string(),
            auth_required: false,
            jwt_secret: None,
            outbound_capacity: 256,
            max_message_size: 1024 * 1024, // 1MB
            shutdown_timeout: Duration::from_secs(5),
            bind_sessions_to_connections: false,
            rtmp_base_url: "rtmp://localhost/live".to_string(),
            media_command: None,
            media_args: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Load from `STREAMNET_*` environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source over the defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("STREAMNET_BIND") {
            config.bind_addr = addr
                .parse()
                .map_err(|_| Error::Config(format!("invalid STREAMNET_BIND: {}", addr)))?;
        }
        if let Some(path) = lookup("STREAMNET_WS_PATH") {
            config.ws_path = path;
        }
        if let Some(flag) = lookup("STREAMNET_AUTH_REQUIRED") {
            config.auth_required = parse_bool("STREAMNET_AUTH_REQUIRED", &flag)?;
        }
        if let Some(secret) = lookup("STREAMNET_JWT_SECRET") {
            config.jwt_secret = Some(secret);
        }
        if let Some(capacity) = lookup("STREAMNET_OUTBOUND_CAPACITY") {
            config.outbound_capacity = capacity.parse().map_err(|_| {
                Error::Config(format!("invalid STREAMNET_OUTBOUND_CAPACITY: {}", capacity))
            })?;
        }
        if let Some(secs) = lookup("STREAMNET_SHUTDOWN_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::Config(format!("invalid STREAMNET_SHUTDOWN_TIMEOUT_SECS: {}", secs))
            })?;
            config.shutdown_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = lookup("STREAMNET_BIND_SESSIONS") {
            config.bind_sessions_to_connections = parse_bool("STREAMNET_BIND_SESSIONS", &flag)?;
        }
        if let Some(url) = lookup("STREAMNET_RTMP_BASE_URL") {
            config.rtmp_base_url = url;
        }
        if let Some(command) = lookup("STREAMNET_MEDIA_COMMAND") {
            config.media_command = Some(PathBuf::from(command));
        }
        if let Some(args) = lookup("STREAMNET_MEDIA_ARGS") {
            config.media_args = args.split_whitespace().map(str::to_string).collect();
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Require bearer tokens signed with `secret`
    pub fn require_auth(mut self, secret: impl Into<String>) -> Self {
        self.auth_required = true;
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Set the per-connection outbound queue size
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Set the shutdown drain timeout
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Tie session lifetime to the connection that started it
    pub fn bind_sessions_to_connections(mut self, bind: bool) -> Self {
        self.bind_sessions_to_connections = bind;
        self
    }

    /// Set the RTMP base URL
    pub fn rtmp_base_url(mut self, url: impl Into<String>) -> Self {
        self.rtmp_base_url = url.into();
        self
    }

    /// Launch an external media server
    pub fn media_server(mut self, command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        self.media_command = Some(command.into());
        self.media_args = args;
        self
    }

    /// Check the configuration for contradictions
    pub fn validate(&self) -> Result<()> {
        if self.auth_required && self.jwt_secret.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Config(
                "authentication is required but no JWT secret is configured".into(),
            ));
        }
        if !self.ws_path.starts_with('/') {
            return Err(Error::Config(format!(
                "websocket path must start with '/': {}",
                self.ws_path
            )));
        }
        Ok(())
    }

    /// Token validator for the configured secret, if any
    pub fn token_validator(&self) -> Option<TokenValidator> {
        self.jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| TokenValidator::new(s.as_bytes()))
    }

    /// Build the admission gate for this configuration
    pub fn admission_gate(&self) -> Result<AdmissionGate> {
        self.validate()?;

        if !self.auth_required {
            return Ok(AdmissionGate::open());
        }

        self.token_validator()
            .map(AdmissionGate::with_auth)
            .ok_or_else(|| Error::Config("missing JWT secret".into()))
    }

    /// Publish URL for a stream key
    pub fn rtmp_url(&self, stream_key: &str) -> String {
        format!("{}/{}", self.rtmp_base_url.trim_end_matches('/'), stream_key)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("invalid {}: {}", name, value))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();

        assert_eq!(config.bind_addr.port(), 5050);
        assert_eq!(config.ws_path, DEFAULT_WS_PATH);
        assert!(!config.auth_required);
        assert!(!config.bind_sessions_to_connections);
        assert_eq!(config.outbound_capacity, 256);
        assert!(config.validate().is_ok());
        assert_eq!(DEFAULT_BIND_ADDR.parse::<SocketAddr>().unwrap(), config.bind_addr);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = GatewayConfig::default()
            .bind(addr)
            .require_auth("secret")
            .outbound_capacity(0)
            .shutdown_timeout(Duration::from_secs(1))
            .bind_sessions_to_connections(true);

        assert_eq!(config.bind_addr, addr);
        assert!(config.auth_required);
        assert_eq!(config.jwt_secret.as_deref(), Some("secret"));
        assert_eq!(config.outbound_capacity, 1);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert!(config.bind_sessions_to_connections);
    }

    #[test]
    fn test_auth_without_secret_is_rejected() {
        let mut config = GatewayConfig::default();
        config.auth_required = true;

        assert!(matches!(config.validate(), Err(Error::Config(_))));
        assert!(config.admission_gate().is_err());
    }

    #[test]
    fn test_admission_gate_follows_auth_flag() {
        let open = GatewayConfig::default().admission_gate().unwrap();
        assert!(!open.requires_auth());

        let closed = GatewayConfig::default()
            .require_auth("secret")
            .admission_gate()
            .unwrap();
        assert!(closed.requires_auth());
    }

    #[test]
    fn test_from_lookup() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("STREAMNET_BIND", "127.0.0.1:6000"),
            ("STREAMNET_AUTH_REQUIRED", "true"),
            ("STREAMNET_JWT_SECRET", "s3cret"),
            ("STREAMNET_BIND_SESSIONS", "yes"),
            ("STREAMNET_SHUTDOWN_TIMEOUT_SECS", "2"),
            ("STREAMNET_MEDIA_COMMAND", "/usr/sbin/nginx"),
            ("STREAMNET_MEDIA_ARGS", "-c rtmp.conf"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 6000);
        assert!(config.auth_required);
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
        assert!(config.bind_sessions_to_connections);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
        assert_eq!(config.media_command, Some(PathBuf::from("/usr/sbin/nginx")));
        assert_eq!(config.media_args, vec!["-c".to_string(), "rtmp.conf".to_string()]);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        assert!(GatewayConfig::from_lookup(lookup(&[("STREAMNET_BIND", "nope")])).is_err());
        assert!(
            GatewayConfig::from_lookup(lookup(&[("STREAMNET_AUTH_REQUIRED", "maybe")])).is_err()
        );
    }

    #[test]
    fn test_rtmp_url() {
        let config = GatewayConfig::default().rtmp_base_url("rtmp://media.example/live/");
        assert_eq!(config.rtmp_url("key1"), "rtmp://media.example/live/key1");
    }
}
