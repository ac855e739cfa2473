//! Command trait definition for CLI commands.
//!
//! Commands are dispatched through `enum_dispatch` on the `Subcommand` enum.

use anyhow::Result;
use enum_dispatch::enum_dispatch;

/// Trait implemented by all mapcons CLI commands.
///
/// `command_line` holds the full invocation and is logged by commands that record it.
#[enum_dispatch]
pub trait Command {
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self, command_line: &str) -> Result<()>;
}
