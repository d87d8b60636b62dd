//! Command handlers for different actions

mod drawer;

pub use drawer::{handle_close, handle_open};

/// Context passed to command handlers
pub struct HandlerContext<'a, A: ?Sized> {
    pub code: &'a str,
    pub actuator: &'a A,
}
