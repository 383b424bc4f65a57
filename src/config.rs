//! Server configuration loaded from environment variables

use crate::types::{RoomSettings, DEFAULT_AI_ANSWER_TEXT};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// 6573 is ascii for "AI"
const DEFAULT_PORT: u16 = 6573;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Directory served for every non-API path (the browser client)
    pub static_dir: String,
    pub room: RoomSettings,
    /// Inbound messages allowed per connection within `rate_limit_window`
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            static_dir: "static".to_string(),
            room: RoomSettings::default(),
            rate_limit_max: 30,
            rate_limit_window: Duration::from_secs(5),
        }
    }
}

/// Read an env var, treating blank values as unset
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Read and parse an env var, falling back (with a warning) when it doesn't parse
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env_string(key) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
                default
            }
        },
        None => default,
    }
}

impl ServerConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let room = RoomSettings {
            max_nickname_chars: env_parse("MAX_NICKNAME_CHARS", defaults.room.max_nickname_chars)
                .max(1),
            max_answer_chars: env_parse("MAX_ANSWER_CHARS", defaults.room.max_answer_chars).max(1),
            max_room_code_chars: env_parse(
                "MAX_ROOM_CODE_CHARS",
                defaults.room.max_room_code_chars,
            )
            .max(1),
            ai_answer_text: env_string("AI_ANSWER_TEXT")
                .unwrap_or_else(|| DEFAULT_AI_ANSWER_TEXT.to_string()),
        };

        let config = Self {
            bind_addr: env_parse("BIND_ADDR", defaults.bind_addr),
            port: env_parse("PORT", defaults.port),
            static_dir: env_string("STATIC_DIR").unwrap_or(defaults.static_dir),
            room,
            rate_limit_max: env_parse("RATE_LIMIT_MAX", defaults.rate_limit_max).max(1),
            rate_limit_window: Duration::from_secs(
                env_parse("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window.as_secs()).max(1),
            ),
        };

        tracing::info!(
            port = config.port,
            static_dir = %config.static_dir,
            rate_limit_max = config.rate_limit_max,
            "Server config loaded"
        );

        config
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
