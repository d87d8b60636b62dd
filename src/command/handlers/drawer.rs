//! Drawer command handlers (open, close)

use super::HandlerContext;
use crate::actuator::Actuator;
use crate::command::CommandResult;
use drawer_shared::Command;
use tracing::{info, warn};

/// Handle an `open` command
pub async fn handle_open<A: Actuator + ?Sized>(
    ctx: &HandlerContext<'_, A>,
    command: &Command,
) -> CommandResult {
    let index = match command.drawer() {
        Some(index) if index != 0 => index,
        _ => {
            return CommandResult::Rejected {
                message: "invalid drawer number (must be ≥ 1)".into(),
            };
        }
    };

    if !ctx.actuator.is_valid_index(index) {
        return CommandResult::Rejected {
            message: format!(
                "invalid drawer {}: valid range is [1, {}]",
                index,
                ctx.actuator.drawer_count()
            ),
        };
    }

    info!("  [OPEN] code={} drawer={}", ctx.code, index);

    // is_valid_index guarantees 1..=N
    match ctx.actuator.activate(index as usize).await {
        Ok(()) => CommandResult::Completed {
            message: format!("drawer {} opened", index),
        },
        Err(e) => {
            warn!("  [OPEN] hardware error: {}", e);
            CommandResult::Failed {
                message: format!("hardware failure opening drawer {}", index),
            }
        }
    }
}

/// Handle a `close` command
///
/// Closing is reserved: drawers return to rest on their own after the pulse.
pub async fn handle_close<A: Actuator + ?Sized>(
    ctx: &HandlerContext<'_, A>,
    _command: &Command,
) -> CommandResult {
    info!("  [CLOSE] code={} not implemented", ctx.code);
    CommandResult::Rejected {
        message: "action not implemented: close".into(),
    }
}
