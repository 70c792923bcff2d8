//! Command submission.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Argv, CommandHandle};
use crate::cancel::or_cancelled;
use crate::error::{Stage, WinrmExecError};
use crate::logging::Logger;
use crate::session::Shell;
use crate::Result;

/// What to do when the remote host rejects the command submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionErrorPolicy {
    /// Log the rejection and still attempt output capture (degraded
    /// continuation). With no command handle the capture is empty.
    #[default]
    Continue,
    /// Log the rejection and stop before capture.
    Abort,
}

impl FromStr for ExecutionErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown execution error policy: {}", other)),
        }
    }
}

impl fmt::Display for ExecutionErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("continue"),
            Self::Abort => f.write_str("abort"),
        }
    }
}

/// Submits commands to remote shells.
pub struct CommandExecutor {
    logger: Logger,
}

impl CommandExecutor {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Submit `argv` inside `shell`.
    ///
    /// The returned handle keeps a clone of `cancel`, so later stdout reads
    /// are governed by the same signal. A bare command (one token) is
    /// submitted with no arguments.
    pub async fn run<'h>(
        &self,
        shell: &'h Shell<'h>,
        argv: &Argv,
        cancel: &CancellationToken,
    ) -> Result<CommandHandle<'h>> {
        self.logger.in_scope(|| {
            info!(
                shell = %shell.handle(),
                program = argv.program(),
                args = argv.args().len(),
                "Submitting command"
            )
        });

        let id = or_cancelled(
            cancel,
            Stage::SubmitCommand,
            shell
                .transport()
                .submit_command(shell.handle(), argv.program(), argv.args()),
        )
        .await?
        .map_err(WinrmExecError::Execution)?;

        self.logger
            .in_scope(|| debug!(command = %id, "Command accepted"));

        Ok(CommandHandle::new(shell, id, argv.clone(), cancel.clone()))
    }
}
