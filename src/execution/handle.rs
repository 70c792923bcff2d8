//! Handle to a submitted remote command.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use futures_util::stream::{self, Stream};
use tokio_util::sync::CancellationToken;

use super::Argv;
use crate::cancel::or_cancelled;
use crate::error::{Stage, WinrmExecError};
use crate::session::Shell;
use crate::transport::CommandId;
use crate::Result;

/// One command running (or finished) inside a [`Shell`].
pub struct CommandHandle<'h> {
    shell: &'h Shell<'h>,
    id: CommandId,
    argv: Argv,
    cancel: CancellationToken,
    exit_code: OnceLock<i32>,
    stdout_finished: AtomicBool,
}

impl<'h> CommandHandle<'h> {
    pub(crate) fn new(
        shell: &'h Shell<'h>,
        id: CommandId,
        argv: Argv,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            shell,
            id,
            argv,
            cancel,
            exit_code: OnceLock::new(),
            stdout_finished: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &CommandId {
        &self.id
    }

    pub fn argv(&self) -> &Argv {
        &self.argv
    }

    /// Exit code, once the remote side has reported termination.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code.get().copied()
    }

    /// Whether stdout has ended or failed.
    pub fn stdout_finished(&self) -> bool {
        self.stdout_finished.load(Ordering::SeqCst)
    }

    /// Pull stdout as a lazy sequence of chunks of at most `chunk_size` bytes.
    ///
    /// Each item is one transport read. The sequence ends after the remote
    /// side reports end of stream or after the first error, and it does not
    /// restart: once finished, further calls yield nothing.
    pub fn stdout(&self, chunk_size: usize) -> impl Stream<Item = Result<Vec<u8>>> + '_ {
        stream::unfold(self.stdout_finished(), move |finished| async move {
            if finished {
                return None;
            }

            let read = or_cancelled(
                &self.cancel,
                Stage::ReadStdout,
                self.shell.transport().read_stdout(&self.id, chunk_size),
            )
            .await;

            match read {
                Ok(Ok(chunk)) => {
                    if chunk.done {
                        if let Some(code) = chunk.exit_code {
                            let _ = self.exit_code.set(code);
                        }
                        self.stdout_finished.store(true, Ordering::SeqCst);
                    }
                    Some((Ok(chunk.data), chunk.done))
                }
                Ok(Err(e)) => {
                    self.stdout_finished.store(true, Ordering::SeqCst);
                    Some((Err(WinrmExecError::Read(e.to_string())), true))
                }
                Err(cancelled) => {
                    self.stdout_finished.store(true, Ordering::SeqCst);
                    Some((Err(cancelled), true))
                }
            }
        })
    }
}

impl fmt::Debug for CommandHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandle")
            .field("id", &self.id)
            .field("argv", &self.argv)
            .field("exit_code", &self.exit_code())
            .field("stdout_finished", &self.stdout_finished())
            .finish_non_exhaustive()
    }
}
