//! Drawer device agent
//!
//! Authenticates against a command server, polls it for drawer commands,
//! pulses the matching relay and reports the outcome.

pub mod actuator;
pub mod command;
pub mod config;
pub mod connection;
pub mod delay;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;
