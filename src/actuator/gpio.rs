//! Pin-level access to the drawer relays

use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

/// Output level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Errors raised by a pin driver
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("pin {pin} is not configured as an output")]
    NotConfigured { pin: u8 },

    #[error("pin {pin} did not respond: {reason}")]
    Hardware { pin: u8, reason: String },

    #[error("no pin wired for drawer {index}")]
    InvalidDrawer { index: usize },
}

/// Capability to drive GPIO output pins
///
/// Writes are short and synchronous; the pulse timing lives above this layer.
pub trait PinDriver: Send + Sync {
    /// Configure a pin as an output
    fn set_output(&self, pin: u8) -> Result<(), ActuatorError>;

    /// Drive an output pin to a level
    fn write(&self, pin: u8, level: Level) -> Result<(), ActuatorError>;
}

/// In-memory pin driver for hosts without relay hardware
///
/// Tracks the current level of every configured pin and logs each write.
#[derive(Debug, Default)]
pub struct SimulatedPins {
    levels: Mutex<HashMap<u8, Level>>,
}

impl SimulatedPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level of a pin, `None` if never configured
    pub fn level(&self, pin: u8) -> Option<Level> {
        self.levels
            .lock()
            .ok()
            .and_then(|levels| levels.get(&pin).copied())
    }
}

impl PinDriver for SimulatedPins {
    fn set_output(&self, pin: u8) -> Result<(), ActuatorError> {
        let mut levels = self.levels.lock().map_err(|_| ActuatorError::Hardware {
            pin,
            reason: "pin table poisoned".into(),
        })?;
        levels.entry(pin).or_insert(Level::High);
        info!("[GPIO] pin {} configured as output (simulated)", pin);
        Ok(())
    }

    fn write(&self, pin: u8, level: Level) -> Result<(), ActuatorError> {
        let mut levels = self.levels.lock().map_err(|_| ActuatorError::Hardware {
            pin,
            reason: "pin table poisoned".into(),
        })?;
        match levels.get_mut(&pin) {
            Some(current) => {
                *current = level;
                debug!("[GPIO] pin {} -> {:?} (simulated)", pin, level);
                Ok(())
            }
            None => Err(ActuatorError::NotConfigured { pin }),
        }
    }
}
