//! TCP reachability probe used as the network link driver
//!
//! The host OS owns the physical link; the agent treats the link as up while
//! it can open a TCP connection to the command server.

use crate::connection::LinkDriver;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Link driver probing a server address over TCP
pub struct TcpProbe {
    address: String,
    connect_timeout: Duration,
    local: Mutex<Option<SocketAddr>>,
}

impl TcpProbe {
    /// Create a probe for `host:port`
    pub fn new(address: String, connect_timeout: Duration) -> Self {
        Self {
            address,
            connect_timeout,
            local: Mutex::new(None),
        }
    }

    fn set_local(&self, addr: Option<SocketAddr>) {
        if let Ok(mut local) = self.local.lock() {
            *local = addr;
        }
    }
}

#[async_trait]
impl LinkDriver for TcpProbe {
    async fn begin(&self) {
        self.set_local(None);
    }

    async fn is_connected(&self) -> bool {
        match timeout(self.connect_timeout, TcpStream::connect(self.address.as_str())).await {
            Ok(Ok(stream)) => {
                self.set_local(stream.local_addr().ok());
                true
            }
            Ok(Err(e)) => {
                debug!("[LINK] probe {} failed: {}", self.address, e);
                self.set_local(None);
                false
            }
            Err(_) => {
                debug!("[LINK] probe {} timed out", self.address);
                self.set_local(None);
                false
            }
        }
    }

    async fn drop_link(&self) {
        self.set_local(None);
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local.lock().ok().and_then(|local| *local)
    }

    fn name(&self) -> &'static str {
        "TCP probe"
    }
}
