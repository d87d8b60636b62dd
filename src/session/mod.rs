//! Device session with the command server
//!
//! This module handles:
//! - Credential lifecycle (authenticate, hold, clear on 401/403)
//! - Bounded health checks
//! - The poll -> validate -> dispatch -> report cycle
//! - The periodic loop driving all of the above

mod agent;
mod runner;

pub use agent::{PollOutcome, ReportStatus, SessionAgent, SessionConfig};
pub use runner::{AgentLoop, TickOutcome};
