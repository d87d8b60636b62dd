//! Drawer controller - validates drawer numbers and pulses relays

use super::gpio::{ActuatorError, Level, PinDriver};
use crate::delay::Delay;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Capability the session agent uses to move drawers
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Number of drawers (N); fixed for the lifetime of the actuator
    fn drawer_count(&self) -> usize;

    /// True iff `1 <= index <= N`
    fn is_valid_index(&self, index: i64) -> bool {
        index >= 1 && (index as u64) <= self.drawer_count() as u64
    }

    /// Open the drawer at a pre-validated 1-based index, hold, then release
    async fn activate(&self, index: usize) -> Result<(), ActuatorError>;
}

/// Relay polarity: which level opens a drawer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    /// LOW opens, HIGH rests (common relay boards)
    #[default]
    ActiveLow,
    /// HIGH opens, LOW rests
    ActiveHigh,
}

impl Polarity {
    fn open_level(self) -> Level {
        match self {
            Polarity::ActiveLow => Level::Low,
            Polarity::ActiveHigh => Level::High,
        }
    }

    fn rest_level(self) -> Level {
        match self {
            Polarity::ActiveLow => Level::High,
            Polarity::ActiveHigh => Level::Low,
        }
    }
}

/// Drives a fixed set of drawer relays, one pulse at a time
pub struct DrawerController {
    pins: Vec<u8>,
    driver: Arc<dyn PinDriver>,
    delay: Arc<dyn Delay>,
    polarity: Polarity,
    pulse: Duration,
    /// Serializes activations
    busy: Mutex<()>,
}

impl DrawerController {
    /// Create a controller and put every drawer pin at rest
    pub fn new(
        pins: Vec<u8>,
        driver: Arc<dyn PinDriver>,
        delay: Arc<dyn Delay>,
        polarity: Polarity,
        pulse: Duration,
    ) -> Result<Self, ActuatorError> {
        for &pin in &pins {
            driver.set_output(pin)?;
            driver.write(pin, polarity.rest_level())?;
        }
        info!(
            "[DRAWER] {} drawers ready on pins {:?} ({:?}, pulse {}ms)",
            pins.len(),
            pins,
            polarity,
            pulse.as_millis()
        );

        Ok(Self {
            pins,
            driver,
            delay,
            polarity,
            pulse,
            busy: Mutex::new(()),
        })
    }

    /// Pin backing a 1-based drawer index
    pub fn pin_for(&self, index: usize) -> Option<u8> {
        index.checked_sub(1).and_then(|i| self.pins.get(i)).copied()
    }
}

#[async_trait]
impl Actuator for DrawerController {
    fn drawer_count(&self) -> usize {
        self.pins.len()
    }

    async fn activate(&self, index: usize) -> Result<(), ActuatorError> {
        let pin = match self.pin_for(index) {
            Some(pin) => pin,
            None => {
                // Callers validate first
                error!("[DRAWER] activate called with invalid drawer {}", index);
                return Err(ActuatorError::InvalidDrawer { index });
            }
        };

        let _busy = self.busy.lock().await;
        info!("[DRAWER] Opening drawer {} (pin {})", index, pin);

        let pulse = Pulse::start(self.driver.as_ref(), pin, self.polarity);
        let opened = self.driver.write(pin, self.polarity.open_level());
        if opened.is_ok() {
            self.delay.sleep(self.pulse).await;
        }
        let released = pulse.release();

        match (opened, released) {
            (Ok(()), Ok(())) => {
                info!("[DRAWER] Drawer {} pulsed and released", index);
                Ok(())
            }
            (Err(e), _) | (Ok(()), Err(e)) => {
                error!("[DRAWER] Drawer {} failed: {}", index, e);
                Err(e)
            }
        }
    }
}

/// Returns a pin to rest when released or dropped
///
/// The rest write happens even if the activation future is dropped mid-pulse.
struct Pulse<'a> {
    driver: &'a dyn PinDriver,
    pin: u8,
    polarity: Polarity,
    released: bool,
}

impl<'a> Pulse<'a> {
    fn start(driver: &'a dyn PinDriver, pin: u8, polarity: Polarity) -> Self {
        Self {
            driver,
            pin,
            polarity,
            released: false,
        }
    }

    fn release(mut self) -> Result<(), ActuatorError> {
        self.released = true;
        self.driver.write(self.pin, self.polarity.rest_level())
    }
}

impl Drop for Pulse<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.driver.write(self.pin, self.polarity.rest_level()) {
                error!("[DRAWER] Failed to return pin {} to rest: {}", self.pin, e);
            }
        }
    }
}
