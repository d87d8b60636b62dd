//! Drawer Shared Protocol Types
//!
//! This crate provides the wire types, JSON codec and session state machine
//! shared by the drawer device agent and its tests.

pub mod codec;
pub mod state_machine;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Timing parameters for the device
pub mod timing {
    /// Health check attempts before the server is considered unreachable
    pub const HEALTH_CHECK_ATTEMPTS: u32 = 10;

    /// Spacing between health check attempts
    pub const HEALTH_CHECK_INTERVAL_MS: u64 = 1000;

    /// Link connect attempts before giving up
    pub const LINK_CONNECT_ATTEMPTS: u32 = 20;

    /// Spacing between link status checks while connecting
    pub const LINK_CONNECT_INTERVAL_MS: u64 = 500;

    /// Settle time after dropping a stale link before reconnecting
    pub const LINK_RESET_SETTLE_MS: u64 = 1000;

    /// How long a drawer is held open
    pub const DRAWER_PULSE_MS: u64 = 500;

    /// Default spacing between command polls
    pub const POLL_INTERVAL_MS: u64 = 5000;

    /// Default per-request timeout
    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
}

/// Server endpoint paths, relative to the API base URL
pub mod endpoints {
    use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

    pub const HEALTH: &str = "/health";
    pub const AUTH_DEVICE: &str = "/auth/device";

    /// Characters that must be escaped inside a single path segment
    const PATH_SEGMENT: &AsciiSet = &CONTROLS
        .add(b' ')
        .add(b'"')
        .add(b'#')
        .add(b'%')
        .add(b'/')
        .add(b'<')
        .add(b'>')
        .add(b'?')
        .add(b'`')
        .add(b'{')
        .add(b'}');

    /// False for `.` and `..`, which URL parsing resolves away even when
    /// percent-encoded, so no path can carry them as a segment
    pub fn is_addressable(raw: &str) -> bool {
        !matches!(raw, "." | "..")
    }

    fn segment(raw: &str) -> String {
        utf8_percent_encode(raw, PATH_SEGMENT).to_string()
    }

    /// `GET` target for the next pending command of a device
    pub fn next_command(device_id: &str) -> String {
        format!("/devices/{}/next-command", segment(device_id))
    }

    /// `POST` target confirming a command was executed
    pub fn confirm(code: &str) -> String {
        format!("/commands/{}/execute", segment(code))
    }

    /// `POST` target reporting a command failed
    pub fn fail(code: &str) -> String {
        format!("/commands/{}/fail", segment(code))
    }
}

/// Action requested by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open a drawer (`open`, or the older `open_drawer`)
    Open,
    /// Close a drawer. Reserved; always reported as not implemented.
    Close,
    /// Any other verb, kept verbatim for the failure message
    Unknown(String),
}

impl Action {
    /// Map a wire verb to an action
    pub fn from_wire(verb: &str) -> Self {
        match verb {
            "open" | "open_drawer" => Action::Open,
            "close" => Action::Close,
            other => Action::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Open => write!(f, "open"),
            Action::Close => write!(f, "close"),
            Action::Unknown(verb) => write!(f, "{}", verb),
        }
    }
}

/// A command received from the server
///
/// Only constructible through [`codec::parse_command`], which guarantees a
/// non-empty tracking code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    code: String,
    action: Option<Action>,
    drawer: Option<i64>,
}

impl Command {
    /// Server-assigned tracking code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Requested action, `None` when the field was missing
    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    /// Requested drawer (1-based), `None` when missing or not an integer
    pub fn drawer(&self) -> Option<i64> {
        self.drawer
    }
}

/// Result of executing a command, reported back to the server once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub code: String,
    pub succeeded: bool,
    pub error_message: Option<String>,
}

impl CommandOutcome {
    /// Successful execution
    pub fn success(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            succeeded: true,
            error_message: None,
        }
    }

    /// Failed execution with a reason for the server
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            succeeded: false,
            error_message: Some(message.into()),
        }
    }
}
