//! Network link management
//!
//! This module handles:
//! - Bringing the link up with bounded retries
//! - Reconnecting on demand before each agent tick
//! - Link status reporting

mod manager;

pub use manager::{Connectivity, LinkConfig, LinkDriver, LinkManager, LinkStatus};
