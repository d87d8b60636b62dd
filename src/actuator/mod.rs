//! Drawer actuation for the device
//!
//! This module handles:
//! - Pin access behind an injectable driver
//! - Drawer number validation (1-based, fixed count)
//! - Open pulses that always end with the relay back at rest

mod drawer;
mod gpio;

pub use drawer::{Actuator, DrawerController, Polarity};
pub use gpio::{ActuatorError, Level, PinDriver, SimulatedPins};
