//! Runtime configuration
//!
//! Defaults overridden by `CHAT_*` environment variables. The WebSocket
//! bind address may also be given as the first command-line argument.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::types::DEFAULT_ROOM;

/// Default WebSocket listen address
pub const DEFAULT_WS_ADDR: &str = "127.0.0.1:3000";

/// Default HTTP API listen address
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3001";

/// Per-session outbound queue size
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 16;

/// Router command queue size
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

/// Broker and listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub ws_addr: String,
    pub http_addr: String,
    pub outbound_capacity: usize,
    pub command_capacity: usize,
    /// Room that exists from startup and catches unnamed broadcasts
    pub default_room: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ws_addr: DEFAULT_WS_ADDR.to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            default_room: DEFAULT_ROOM.to_string(),
        }
    }
}

impl Config {
    /// Load from the process environment and arguments
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok(), env::args().nth(1))
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F, ws_addr_arg: Option<String>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let ws_addr = ws_addr_arg
            .or_else(|| lookup("CHAT_WS_ADDR"))
            .unwrap_or(defaults.ws_addr);
        let http_addr = lookup("CHAT_HTTP_ADDR").unwrap_or(defaults.http_addr);

        Self {
            ws_addr,
            http_addr,
            outbound_capacity: parse_capacity(
                "CHAT_OUTBOUND_CAPACITY",
                lookup("CHAT_OUTBOUND_CAPACITY"),
                defaults.outbound_capacity,
            ),
            command_capacity: parse_capacity(
                "CHAT_COMMAND_CAPACITY",
                lookup("CHAT_COMMAND_CAPACITY"),
                defaults.command_capacity,
            ),
            default_room: defaults.default_room,
        }
    }
}

/// Parse a positive queue size, falling back on anything else
fn parse_capacity(key: &str, raw: Option<String>, default: usize) -> usize {
    let Some(raw) = raw else {
        return default;
    };
    match usize::from_str(raw.trim()) {
        Ok(value) if value > 0 => value,
        _ => {
            warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }
    }
}
