//! Session State Machine
//!
//! Tracks whether the device holds a bearer credential and which events may
//! change that.

use std::fmt;

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No credential held; only authentication is possible
    Unauthenticated,
    /// A bearer credential is held
    Authenticated,
}

/// Events that can trigger state transitions
#[derive(Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Server issued a credential
    CredentialIssued(String),
    /// Server answered 401/403 to a request made with the credential
    CredentialRejected,
    /// Credential dropped locally (startup, explicit logout)
    Reset,
}

// Keep tokens out of logs
impl fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::CredentialIssued(token) => {
                write!(f, "CredentialIssued({})", redact(token))
            }
            SessionEvent::CredentialRejected => write!(f, "CredentialRejected"),
            SessionEvent::Reset => write!(f, "Reset"),
        }
    }
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid; carries the resulting state
    Success(SessionState),
    /// Transition was invalid from current state
    Invalid { from: SessionState, event: SessionEvent },
}

/// Owns the credential and the state derived from it
#[derive(Default)]
pub struct SessionStateMachine {
    credential: Option<String>,
}

impl fmt::Debug for SessionStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStateMachine")
            .field("state", &self.state())
            .field("credential", &self.credential.as_deref().map(redact))
            .finish()
    }
}

impl SessionStateMachine {
    /// Create a new state machine in Unauthenticated state
    pub fn new() -> Self {
        Self { credential: None }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        match self.credential {
            Some(_) => SessionState::Authenticated,
            None => SessionState::Unauthenticated,
        }
    }

    /// Bearer credential, if authenticated
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Check if a credential is held
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: SessionEvent) -> TransitionResult {
        use SessionState::*;

        match (self.state(), event) {
            (_, SessionEvent::CredentialIssued(token)) if !token.is_empty() => {
                self.credential = Some(token);
                TransitionResult::Success(Authenticated)
            }
            (Authenticated, SessionEvent::CredentialRejected) | (_, SessionEvent::Reset) => {
                self.credential = None;
                TransitionResult::Success(Unauthenticated)
            }
            (from, event) => TransitionResult::Invalid { from, event },
        }
    }
}

/// Shorten a credential for display
pub fn redact(token: &str) -> String {
    const SHOWN: usize = 8;
    match token.char_indices().nth(SHOWN) {
        Some((idx, _)) => format!("{}...", &token[..idx]),
        None => "***".to_string(),
    }
}
