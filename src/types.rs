//! Basic type definitions for the chat broker
//!
//! Provides newtype wrappers and naming helpers:
//! - `ClientId`: UUID-based unique connection identifier
//! - `normalize_room`: canonical form of a room name
//! - `direct_thread` / `group_thread`: inbox thread identifiers

use uuid::Uuid;

/// Room every broadcast without a room name lands in
pub const DEFAULT_ROOM: &str = "general";

/// Unique client identifier (newtype pattern)
///
/// Wraps a UUID v4 generated when a session registers.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a client ID received over the wire
    ///
    /// Only the canonical hyphenated lowercase form is accepted, so a
    /// destination matches exactly the id string a client was given.
    pub fn parse(raw: &str) -> Option<Self> {
        let id = Uuid::parse_str(raw).ok()?;
        (id.hyphenated().to_string() == raw).then_some(Self(id))
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize a room name
///
/// Trims whitespace, then treats the name as a rooted slash-separated path:
/// repeated separators collapse, `.` segments vanish and `..` pops the
/// previous segment (never above the root). The leading separator is
/// stripped. Returns None when nothing is left.
pub fn normalize_room(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Thread identifier of a direct conversation with `peer`
pub fn direct_thread(peer: &str) -> String {
    format!("u:{}", peer)
}

/// Thread identifier of the group conversation of `room`
pub fn group_thread(room: &str) -> String {
    format!("g:{}", room)
}
