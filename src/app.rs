//! One invocation end to end: connect, open a shell, run, capture, release.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::WinrmExecError;
use crate::execution::{tokenize, CommandExecutor, ExecutionErrorPolicy};
use crate::logging::Logger;
use crate::output::{render, CaptureMode, OutputCollector};
use crate::session::{Credentials, EndpointDescriptor, Phase, Session, SessionManager, Shell};
use crate::transport::Transport;

/// Validated inputs for one run.
#[derive(Debug)]
pub struct Invocation {
    pub endpoint: EndpointDescriptor,
    pub credentials: Credentials,
    /// Raw command line, split on single spaces before submission.
    pub command_line: String,
    pub capture: CaptureMode,
    pub buffer_size: usize,
    pub on_execution_error: ExecutionErrorPolicy,
}

/// What happened, in the terms the binary needs to report it.
#[derive(Debug)]
pub struct Outcome {
    /// Captured stdout, when the flow reached the point of printing it.
    pub output: Option<Vec<u8>>,
    /// Process exit status.
    pub exit_code: u8,
    /// The failure that determined `exit_code`, if any.
    pub error: Option<WinrmExecError>,
    /// A required input was missing; the caller should print usage.
    pub show_usage: bool,
    /// Phase the invocation ended in.
    pub phase: Phase,
    /// Exit code reported by the remote command.
    pub remote_exit_code: Option<i32>,
}

impl Outcome {
    fn new(phase: Phase, output: Option<Vec<u8>>, error: Option<WinrmExecError>) -> Self {
        Self {
            output,
            exit_code: error.as_ref().map_or(0, WinrmExecError::exit_code),
            error,
            show_usage: false,
            phase,
            remote_exit_code: None,
        }
    }

    /// Header plus captured bytes, ready for stdout.
    pub fn rendered(&self) -> Option<Vec<u8>> {
        self.output.as_deref().map(render)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && !self.show_usage
    }
}

/// Result of everything that happens inside an open shell.
#[derive(Default)]
struct Collected {
    output: Option<Vec<u8>>,
    remote_exit_code: Option<i32>,
    error: Option<WinrmExecError>,
}

/// Drives the session, executor and collector for one invocation.
pub struct App {
    sessions: SessionManager,
    executor: CommandExecutor,
    logger: Logger,
}

impl App {
    pub fn new(transport: Arc<dyn Transport>, logger: Logger) -> Self {
        Self {
            sessions: SessionManager::new(transport, logger.clone()),
            executor: CommandExecutor::new(logger.clone()),
            logger,
        }
    }

    /// Validate `config` and execute it.
    ///
    /// A missing required input is reported and returns an outcome with
    /// `show_usage` set and exit status 0; nothing is contacted.
    pub async fn run(&self, config: &Config, cancel: &CancellationToken) -> Outcome {
        match config.to_invocation() {
            Ok(invocation) => self.execute(&invocation, cancel).await,
            Err(e) => {
                self.logger.in_scope(|| info!("{}", e));
                let mut outcome = Outcome::new(Phase::Finished, None, None);
                outcome.exit_code = e.exit_code();
                outcome.error = Some(e);
                outcome.show_usage = true;
                outcome
            }
        }
    }

    /// Execute a validated invocation.
    ///
    /// Once created, the shell and then the session are closed exactly once,
    /// whatever the outcome.
    pub async fn execute(&self, invocation: &Invocation, cancel: &CancellationToken) -> Outcome {
        let mut phase = Phase::Connecting;
        let identity = invocation.credentials.identity(&self.logger);

        let session = match self
            .sessions
            .connect(
                &invocation.endpoint,
                &identity,
                invocation.credentials.password(),
                cancel,
            )
            .await
        {
            Ok(session) => session,
            Err(e) => {
                self.report(&e, "Error during authentication");
                self.advance(&mut phase, Phase::Finished);
                return Outcome::new(phase, None, Some(e));
            }
        };
        self.advance(&mut phase, Phase::Connected);

        let collected = self
            .within_session(&session, invocation, cancel, &mut phase)
            .await;

        if phase != Phase::Releasing {
            self.advance(&mut phase, Phase::Releasing);
        }
        // Close failures are logged by the session and do not change the outcome.
        let _ = session.close().await;
        self.advance(&mut phase, Phase::Finished);

        let mut outcome = Outcome::new(phase, collected.output, collected.error);
        outcome.remote_exit_code = collected.remote_exit_code;
        outcome
    }

    async fn within_session(
        &self,
        session: &Session,
        invocation: &Invocation,
        cancel: &CancellationToken,
        phase: &mut Phase,
    ) -> Collected {
        let shell = match self.sessions.create_shell(session, cancel).await {
            Ok(shell) => shell,
            Err(e) => {
                self.report(&e, "Error creating shell");
                return Collected {
                    error: Some(e),
                    ..Collected::default()
                };
            }
        };
        self.advance(phase, Phase::ShellOpen);

        let collected = self.within_shell(&shell, invocation, cancel, phase).await;

        self.advance(phase, Phase::Releasing);
        let _ = shell.close().await;
        collected
    }

    async fn within_shell(
        &self,
        shell: &Shell<'_>,
        invocation: &Invocation,
        cancel: &CancellationToken,
        phase: &mut Phase,
    ) -> Collected {
        let argv = tokenize(&invocation.command_line);
        self.advance(phase, Phase::Running);

        let handle = match self.executor.run(shell, &argv, cancel).await {
            Ok(handle) => handle,
            Err(e) if e.is_cancelled() => {
                self.report(&e, "Command cancelled");
                return Collected {
                    error: Some(e),
                    ..Collected::default()
                };
            }
            Err(e) => {
                self.report(&e, "Error during command execution");
                let output = match invocation.on_execution_error {
                    ExecutionErrorPolicy::Continue => {
                        self.advance(phase, Phase::Capturing);
                        self.logger
                            .in_scope(|| warn!("No command handle; command output is empty"));
                        Some(Vec::new())
                    }
                    ExecutionErrorPolicy::Abort => None,
                };
                return Collected {
                    output,
                    error: Some(e),
                    ..Collected::default()
                };
            }
        };

        self.advance(phase, Phase::Capturing);
        let collector = OutputCollector::new(
            invocation.capture,
            invocation.buffer_size,
            self.logger.clone(),
        );
        let capture = collector.capture(&handle).await;

        match capture.error {
            Some(e) if e.is_cancelled() => {
                self.report(&e, "Output capture cancelled");
                Collected {
                    output: None,
                    remote_exit_code: capture.exit_code,
                    error: Some(e),
                }
            }
            error => Collected {
                output: Some(capture.bytes),
                remote_exit_code: capture.exit_code,
                error,
            },
        }
    }

    fn report(&self, e: &WinrmExecError, context: &str) {
        self.logger.in_scope(|| {
            if e.is_cancelled() {
                warn!("{}: {}", context, e)
            } else {
                error!("{}: {}", context, e)
            }
        });
    }

    fn advance(&self, phase: &mut Phase, next: Phase) {
        match phase.transition_to(next) {
            Ok(()) => self.logger.in_scope(|| debug!(phase = ?next, "Phase changed")),
            Err(e) => self.logger.in_scope(|| warn!(error = %e, "Unexpected phase change")),
        }
    }
}

/// Cancel `cancel` when the process receives Ctrl-C.
///
/// The task ends without cancelling if the token is cancelled by some other
/// source first.
pub fn cancel_on_interrupt(cancel: CancellationToken, logger: Logger) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    logger.in_scope(|| warn!("Interrupt received, cancelling"));
                    cancel.cancel();
                }
                Err(e) => logger.in_scope(|| error!("Failed to listen for interrupt: {}", e)),
            },
        }
    })
}

/// Cancel `cancel` once `after` has elapsed.
pub fn arm_deadline(cancel: CancellationToken, after: Duration, logger: Logger) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(after) => {
                logger.in_scope(|| warn!(seconds = after.as_secs_f64(), "Deadline reached, cancelling"));
                cancel.cancel();
            }
        }
    })
}

/// Log the banner line for a run.
pub fn announce(logger: &Logger, invocation: &Invocation) {
    logger.in_scope(|| {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            endpoint = %invocation.endpoint,
            capture = %invocation.capture,
            "winrm-exec starting"
        )
    });
}
