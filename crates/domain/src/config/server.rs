use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_3210")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Off unless configured.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    /// In-flight request cap. A streaming chat holds its slot until the
    /// run ends.
    #[serde(default = "d_256")]
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3210,
            host: "127.0.0.1".into(),
            cors: CorsConfig::default(),
            rate_limit: None,
            max_concurrent_requests: 256,
        }
    }
}

/// Per-client-IP limit on new requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u64,
    pub burst_size: u32,
}

/// Browser origins allowed to call the relay.
///
/// An entry is an exact origin, an origin ending in `:*` (any port on that
/// host), or `*` alone (any origin).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| {
            if allowed == "*" || allowed == origin {
                return true;
            }
            match allowed.strip_suffix('*') {
                Some(prefix) if prefix.ends_with(':') => origin
                    .strip_prefix(prefix)
                    .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())),
                _ => false,
            }
        })
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_3210() -> u16 {
    3210
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_256() -> usize {
    256
}
fn d_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:*".into(),
        "http://127.0.0.1:*".into(),
    ]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_is_a_local_relay() {
        let cfg: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.port, 3210);
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.max_concurrent_requests, 256);
        assert!(cfg.rate_limit.is_none());
        assert!(!cfg.cors.allows_any());
    }

    #[test]
    fn rate_limit_table_enables_limiting() {
        let cfg: ServerConfig = toml::from_str(
            r#"
            [rate_limit]
            requests_per_second = 5
            burst_size = 20
            "#,
        )
        .unwrap();
        let rl = cfg.rate_limit.unwrap();
        assert_eq!((rl.requests_per_second, rl.burst_size), (5, 20));
    }

    #[test]
    fn default_origins_are_local_on_any_port() {
        let cors = CorsConfig::default();
        assert!(cors.allows("http://localhost:5173"));
        assert!(cors.allows("http://127.0.0.1:3000"));
        assert!(!cors.allows("http://localhost:"));
        assert!(!cors.allows("http://localhost:80abc"));
        assert!(!cors.allows("https://orders.example.com"));
    }

    #[test]
    fn exact_and_wildcard_origins() {
        let cors = CorsConfig {
            allowed_origins: vec!["https://orders.example.com".into()],
        };
        assert!(cors.allows("https://orders.example.com"));
        assert!(!cors.allows("https://orders.example.com:8443"));

        let any = CorsConfig {
            allowed_origins: vec!["*".into()],
        };
        assert!(any.allows_any());
        assert!(any.allows("https://anything.test"));
    }
}
