//! Command executor - validates and dispatches incoming commands

use super::handlers::{self, HandlerContext};
use crate::actuator::Actuator;
use drawer_shared::{now_ms, Action, Command, CommandOutcome};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Command executed successfully
    Completed { message: String },
    /// Command was valid but the hardware failed
    Failed { message: String },
    /// Command rejected before touching hardware
    Rejected { message: String },
}

/// Executes commands received from the server
pub struct CommandExecutor<A: ?Sized> {
    actuator: Arc<A>,
}

impl<A: Actuator + ?Sized> CommandExecutor<A> {
    /// Create a new command executor
    pub fn new(actuator: Arc<A>) -> Self {
        Self { actuator }
    }

    /// Validate a command, run it at most once, and produce its outcome
    pub async fn execute(&self, command: &Command) -> CommandOutcome {
        let start_time = now_ms();

        info!(
            "[CMD] Executing command: code={} action={:?} drawer={:?}",
            command.code(),
            command.action(),
            command.drawer()
        );

        let ctx = HandlerContext {
            code: command.code(),
            actuator: self.actuator.as_ref(),
        };

        let result = match command.action() {
            None => CommandResult::Rejected {
                message: "missing action field".into(),
            },
            Some(Action::Open) => handlers::handle_open(&ctx, command).await,
            Some(Action::Close) => handlers::handle_close(&ctx, command).await,
            Some(Action::Unknown(verb)) => CommandResult::Rejected {
                message: format!("unknown action: {}", verb),
            },
        };

        let processing_time = now_ms().saturating_sub(start_time);

        match result {
            CommandResult::Completed { message } => {
                info!("  Command completed in {}ms: {}", processing_time, message);
                CommandOutcome::success(command.code())
            }
            CommandResult::Failed { message } => {
                warn!("  Command failed: {}", message);
                CommandOutcome::failure(command.code(), message)
            }
            CommandResult::Rejected { message } => {
                warn!("  Command rejected: {}", message);
                CommandOutcome::failure(command.code(), message)
            }
        }
    }
}
