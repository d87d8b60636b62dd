//! Session agent - credential lifecycle and the poll/dispatch/report cycle

use crate::actuator::Actuator;
use crate::command::CommandExecutor;
use crate::delay::Delay;
use crate::transport::{Reply, ReplyClass, ServerTransport};
use drawer_shared::{
    codec, endpoints,
    state_machine::{redact, SessionEvent, SessionState, SessionStateMachine, TransitionResult},
    timing, CommandOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Identity and retry settings for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Device ID registered with the server
    pub device_id: String,
    /// Shared secret presented at authentication
    pub secret: String,
    /// Health check attempts before giving up
    pub health_attempts: u32,
    /// Spacing between health check attempts
    pub health_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_id: "drawer-001".into(),
            secret: String::new(),
            health_attempts: timing::HEALTH_CHECK_ATTEMPTS,
            health_interval: Duration::from_millis(timing::HEALTH_CHECK_INTERVAL_MS),
        }
    }
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// No credential held; nothing was sent
    Skipped,
    /// Server has no pending command
    NoCommand,
    /// A command was executed (or rejected) and its outcome reported
    Dispatched {
        outcome: CommandOutcome,
        report: ReportStatus,
    },
    /// Command body was unusable and dropped without a report
    Discarded { reason: String },
    /// Server rejected the credential; it has been cleared
    CredentialExpired,
    /// Request failed or the server answered unexpectedly
    TransportError,
}

/// Result of reporting an outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    /// Server accepted the report
    Delivered,
    /// No credential held, or the outcome had no code; nothing was sent
    Skipped,
    /// Server rejected the credential; it has been cleared
    CredentialExpired,
    /// Server does not know the command code
    NotFound,
    /// Server already resolved the command code
    AlreadyProcessed,
    /// Report request could not be built for this code or message
    Unencodable,
    /// Request failed or the server answered unexpectedly
    TransportError,
}

/// Holds the device credential and talks to the command server
///
/// All operations take `&mut self`: the agent runs one operation at a time.
pub struct SessionAgent<T, A: ?Sized> {
    config: SessionConfig,
    transport: T,
    executor: CommandExecutor<A>,
    delay: Arc<dyn Delay>,
    fsm: SessionStateMachine,
}

impl<T: ServerTransport, A: Actuator + ?Sized> SessionAgent<T, A> {
    /// Create an agent without a credential
    pub fn new(
        config: SessionConfig,
        transport: T,
        actuator: Arc<A>,
        delay: Arc<dyn Delay>,
    ) -> Self {
        Self {
            config,
            transport,
            executor: CommandExecutor::new(actuator),
            delay,
            fsm: SessionStateMachine::new(),
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.fsm.state()
    }

    /// Whether a credential is held
    pub fn is_authenticated(&self) -> bool {
        self.fsm.is_authenticated()
    }

    /// The held bearer credential
    pub fn credential(&self) -> Option<&str> {
        self.fsm.credential()
    }

    /// Device ID this agent authenticates as
    pub fn device_id(&self) -> &str {
        &self.config.device_id
    }

    /// Access the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Drop the credential locally
    pub fn reset(&mut self) {
        self.fsm.process_event(SessionEvent::Reset);
    }

    /// Probe the health endpoint until it answers 2xx or attempts run out
    pub async fn check_reachability(&self) -> bool {
        let attempts = self.config.health_attempts;
        info!("[SESSION] Testing server connectivity via {}...", self.transport.name());

        for attempt in 1..=attempts {
            match self.transport.get(endpoints::HEALTH, None).await {
                Ok(reply) if reply.is_success() => {
                    info!("[SESSION] Server is operational (attempt {})", attempt);
                    return true;
                }
                Ok(reply) => {
                    debug!("[SESSION] Health attempt {} -> {}", attempt, reply.status);
                }
                Err(e) => {
                    debug!("[SESSION] Health attempt {} failed: {}", attempt, e);
                }
            }

            if attempt < attempts {
                self.delay.sleep(self.config.health_interval).await;
            }
        }

        error!("[SESSION] Server not responding after {} attempts", attempts);
        false
    }

    /// Exchange device identity for a bearer credential
    pub async fn authenticate(&mut self) -> bool {
        info!("[SESSION] Authenticating as {}...", self.config.device_id);

        let body = match codec::encode_auth_request(&self.config.device_id, &self.config.secret) {
            Ok(body) => body,
            Err(e) => {
                error!("[SESSION] Could not encode auth request: {}", e);
                return false;
            }
        };

        let reply = match self
            .transport
            .post(endpoints::AUTH_DEVICE, None, Some(body))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("[SESSION] Auth request failed: {}", e);
                return false;
            }
        };

        if !reply.is_success() {
            warn!(
                "[SESSION] Authentication rejected - status {}: {}",
                reply.status,
                reply.body_text()
            );
            return false;
        }

        let token = match codec::decode_auth_response(&reply.body) {
            Ok(token) => token,
            Err(e) => {
                warn!("[SESSION] Error extracting token from response: {}", e);
                return false;
            }
        };

        let shown = redact(&token);
        match self.fsm.process_event(SessionEvent::CredentialIssued(token)) {
            TransitionResult::Success(_) => {
                info!("[SESSION] Credential obtained: {}", shown);
                true
            }
            TransitionResult::Invalid { from, event } => {
                error!("[SESSION] Invalid transition {:?} on {:?}", from, event);
                false
            }
        }
    }

    /// Fetch the next command and, if there is one, execute and report it
    pub async fn poll_for_command(&mut self) -> PollOutcome {
        let Some(token) = self.fsm.credential().map(str::to_string) else {
            debug!("[SESSION] No credential, skipping command polling");
            return PollOutcome::Skipped;
        };

        let path = endpoints::next_command(&self.config.device_id);
        let reply = match self.transport.get(&path, Some(&token)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("[SESSION] Poll failed: {}", e);
                return PollOutcome::TransportError;
            }
        };

        match reply.classify() {
            ReplyClass::NoContent => {
                debug!("[SESSION] No pending command");
                PollOutcome::NoCommand
            }
            ReplyClass::Success if reply.body.iter().all(u8::is_ascii_whitespace) => {
                debug!("[SESSION] Empty command body, treating as no command");
                PollOutcome::NoCommand
            }
            ReplyClass::Success => self.dispatch(&reply).await,
            ReplyClass::CredentialRejected => {
                self.invalidate_credential("polling");
                PollOutcome::CredentialExpired
            }
            _ => {
                warn!(
                    "[SESSION] Error during polling - status {}: {}",
                    reply.status,
                    reply.body_text()
                );
                PollOutcome::TransportError
            }
        }
    }

    /// Parse, execute once, report once
    async fn dispatch(&mut self, reply: &Reply) -> PollOutcome {
        let command = match codec::parse_command(&reply.body) {
            Ok(command) => command,
            Err(e) => {
                warn!(
                    "[SESSION] Dropping command payload ({}): {}",
                    e,
                    reply.body_text()
                );
                return PollOutcome::Discarded {
                    reason: e.to_string(),
                };
            }
        };

        info!("[SESSION] Command received: code={}", command.code());
        let outcome = self.executor.execute(&command).await;
        let report = self.report_outcome(&outcome).await;
        PollOutcome::Dispatched { outcome, report }
    }

    /// Send a confirm or fail report for an outcome
    ///
    /// Never touches the actuator, so repeating a report cannot repeat a
    /// physical action.
    pub async fn report_outcome(&mut self, outcome: &CommandOutcome) -> ReportStatus {
        if outcome.code.trim().is_empty() {
            error!("[SESSION] Refusing to report an outcome without a code");
            return ReportStatus::Skipped;
        }
        if !endpoints::is_addressable(&outcome.code) {
            error!("[SESSION] Command code {:?} has no report endpoint", outcome.code);
            return ReportStatus::Unencodable;
        }

        let Some(token) = self.fsm.credential().map(str::to_string) else {
            warn!(
                "[SESSION] No credential, dropping outcome for {}",
                outcome.code
            );
            return ReportStatus::Skipped;
        };

        let (kind, result) = if outcome.succeeded {
            let path = endpoints::confirm(&outcome.code);
            ("confirmation", self.transport.post(&path, Some(&token), None).await)
        } else {
            let message = outcome.error_message.as_deref().unwrap_or_default();
            let body = match codec::encode_failure(message) {
                Ok(body) => body,
                Err(e) => {
                    error!("[SESSION] Could not encode failure for {}: {}", outcome.code, e);
                    return ReportStatus::Unencodable;
                }
            };
            let path = endpoints::fail(&outcome.code);
            ("failure", self.transport.post(&path, Some(&token), Some(body)).await)
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!("[SESSION] Sending {} for {} failed: {}", kind, outcome.code, e);
                return ReportStatus::TransportError;
            }
        };

        match reply.classify() {
            ReplyClass::Success | ReplyClass::NoContent => {
                info!("[SESSION] {} sent for {}", kind, outcome.code);
                ReportStatus::Delivered
            }
            ReplyClass::CredentialRejected => {
                self.invalidate_credential(kind);
                ReportStatus::CredentialExpired
            }
            ReplyClass::NotFound => {
                warn!("[SESSION] Server does not know command {}", outcome.code);
                ReportStatus::NotFound
            }
            ReplyClass::AlreadyProcessed => {
                warn!(
                    "[SESSION] Command {} already processed (status {})",
                    outcome.code, reply.status
                );
                ReportStatus::AlreadyProcessed
            }
            ReplyClass::Unexpected => {
                warn!(
                    "[SESSION] Error sending {} - status {}: {}",
                    kind,
                    reply.status,
                    reply.body_text()
                );
                ReportStatus::TransportError
            }
        }
    }

    fn invalidate_credential(&mut self, during: &str) {
        warn!("[SESSION] Invalid/expired credential during {}, clearing", during);
        if let TransitionResult::Invalid { from, event } =
            self.fsm.process_event(SessionEvent::CredentialRejected)
        {
            debug!("[SESSION] Ignored {:?} in {:?}", event, from);
        }
    }
}
