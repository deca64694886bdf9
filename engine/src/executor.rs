//! The side-effecting boundary: something that performs an `ActionCommand`.

use tracing::info;

use crate::action::ActionCommand;

/// Performs actions on the host platform.
pub trait ActionExecutor: Send {
    fn execute(&mut self, action: &ActionCommand) -> anyhow::Result<()>;
}

impl<F> ActionExecutor for F
where
    F: FnMut(&ActionCommand) -> anyhow::Result<()> + Send,
{
    fn execute(&mut self, action: &ActionCommand) -> anyhow::Result<()> {
        self(action)
    }
}

/// Executor that only logs.  Used when no platform backend is attached.
#[derive(Debug, Default)]
pub struct LoggingExecutor {
    pub executed: u64,
}

impl ActionExecutor for LoggingExecutor {
    fn execute(&mut self, action: &ActionCommand) -> anyhow::Result<()> {
        self.executed += 1;
        info!("Execute {}", action.to_sexp());
        Ok(())
    }
}
