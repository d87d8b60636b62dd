//! Periodic driver for the session agent
//!
//! One tick at a time: keep the link up, make sure a credential is held,
//! then poll once. Nothing here retries inline; a failed tick waits for the
//! next one.

use super::agent::{PollOutcome, SessionAgent};
use crate::actuator::Actuator;
use crate::connection::Connectivity;
use crate::transport::ServerTransport;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// What happened during one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Link could not be brought up
    LinkDown,
    /// No credential and authentication failed
    AuthFailed,
    /// A poll was made
    Polled(PollOutcome),
}

/// Drives a session agent on a fixed interval
pub struct AgentLoop<T, A: ?Sized, C> {
    agent: SessionAgent<T, A>,
    link: C,
    poll_interval: Duration,
}

impl<T: ServerTransport, A: Actuator + ?Sized, C: Connectivity> AgentLoop<T, A, C> {
    pub fn new(agent: SessionAgent<T, A>, link: C, poll_interval: Duration) -> Self {
        Self {
            agent,
            link,
            poll_interval,
        }
    }

    pub fn agent(&self) -> &SessionAgent<T, A> {
        &self.agent
    }

    /// Bring the link up, check the server, and authenticate once
    ///
    /// Failures are logged and left for the ticks to recover from.
    pub async fn startup(&mut self) -> bool {
        if !self.link.connect().await {
            warn!("[LOOP] Link not up at startup");
            return false;
        }
        if !self.agent.check_reachability().await {
            warn!("[LOOP] Server unreachable at startup");
            return false;
        }
        self.agent.authenticate().await
    }

    /// Run one scheduling step
    pub async fn tick(&mut self) -> TickOutcome {
        if !self.link.reconnect_if_needed().await {
            return TickOutcome::LinkDown;
        }

        if !self.agent.is_authenticated() && !self.agent.authenticate().await {
            return TickOutcome::AuthFailed;
        }

        TickOutcome::Polled(self.agent.poll_for_command().await)
    }

    /// Tick until `shutdown` resolves
    ///
    /// A tick in progress always completes; shutdown is only observed
    /// between ticks.
    pub async fn run<F: Future<Output = ()>>(&mut self, shutdown: F) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "[LOOP] Polling every {}ms as {}",
            self.poll_interval.as_millis(),
            self.agent.device_id()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("[LOOP] Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.tick().await;
                    debug!("[LOOP] Tick: {:?}", outcome);
                }
            }
        }
    }
}
