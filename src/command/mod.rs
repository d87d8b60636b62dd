//! Command execution for the device
//!
//! This module handles:
//! - Validating commands received from the server
//! - Dispatching to the drawer handlers
//! - Turning every result into exactly one outcome for the server

mod executor;
pub mod handlers;

pub use executor::{CommandExecutor, CommandResult};
