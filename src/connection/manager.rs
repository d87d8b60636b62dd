//! Link manager with bounded connect retries and reconnect-on-demand

use crate::delay::Delay;
use async_trait::async_trait;
use drawer_shared::timing;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Low-level access to the physical network link
#[async_trait]
pub trait LinkDriver: Send + Sync {
    /// Start bringing the link up; completion is observed via `is_connected`
    async fn begin(&self);

    /// Whether the link is currently up
    async fn is_connected(&self) -> bool;

    /// Tear down the link and forget its configuration
    async fn drop_link(&self);

    /// Local address while connected
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Human-readable name for this link
    fn name(&self) -> &'static str;
}

/// Connectivity capability consumed by the agent loop
#[async_trait]
pub trait Connectivity: Send + Sync {
    /// Bring the link up, retrying a bounded number of times
    async fn connect(&self) -> bool;

    /// Whether the link is currently up
    async fn is_up(&self) -> bool;

    /// Reconnect only if the link is down
    async fn reconnect_if_needed(&self) -> bool {
        if self.is_up().await {
            return true;
        }
        warn!("[LINK] Link down, reconnecting...");
        self.connect().await
    }
}

/// Snapshot of the link for status reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub connected: bool,
    pub local_addr: Option<SocketAddr>,
}

/// Configuration for the link manager
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Status checks while waiting for the link
    pub connect_attempts: u32,
    /// Spacing between status checks
    pub connect_interval: Duration,
    /// Pause after dropping a stale link
    pub reset_settle: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_attempts: timing::LINK_CONNECT_ATTEMPTS,
            connect_interval: Duration::from_millis(timing::LINK_CONNECT_INTERVAL_MS),
            reset_settle: Duration::from_millis(timing::LINK_RESET_SETTLE_MS),
        }
    }
}

/// Keeps the network link up for the agent
pub struct LinkManager<D: LinkDriver> {
    driver: D,
    config: LinkConfig,
    delay: Arc<dyn Delay>,
}

impl<D: LinkDriver> LinkManager<D> {
    pub fn new(driver: D, config: LinkConfig, delay: Arc<dyn Delay>) -> Self {
        Self {
            driver,
            config,
            delay,
        }
    }

    /// Current link status
    pub async fn status(&self) -> LinkStatus {
        let connected = self.driver.is_connected().await;
        LinkStatus {
            connected,
            local_addr: if connected {
                self.driver.local_addr()
            } else {
                None
            },
        }
    }

    /// Tear the link down
    pub async fn disconnect(&self) {
        self.driver.drop_link().await;
        info!("[LINK] {} disconnected", self.driver.name());
    }

    /// Access the underlying driver
    pub fn driver(&self) -> &D {
        &self.driver
    }
}

#[async_trait]
impl<D: LinkDriver> Connectivity for LinkManager<D> {
    async fn connect(&self) -> bool {
        self.driver.drop_link().await;
        self.delay.sleep(self.config.reset_settle).await;

        info!("[LINK] Connecting via {}...", self.driver.name());
        self.driver.begin().await;

        let mut retries = 0;
        let mut connected = self.driver.is_connected().await;
        while !connected && retries < self.config.connect_attempts {
            self.delay.sleep(self.config.connect_interval).await;
            retries += 1;
            connected = self.driver.is_connected().await;
        }

        if connected {
            match self.driver.local_addr() {
                Some(addr) => info!("[LINK] Connected, local address {}", addr),
                None => info!("[LINK] Connected"),
            }
        } else {
            warn!(
                "[LINK] Failed to connect after {} retries",
                self.config.connect_attempts
            );
        }
        connected
    }

    async fn is_up(&self) -> bool {
        self.driver.is_connected().await
    }
}
