//! In-memory transport with scripted behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    AuthScheme, CommandId, SessionHandle, ShellHandle, StdoutChunk, Transport, TransportError,
};
use crate::error::Stage;
use crate::session::{EndpointDescriptor, Identity};

/// Number of times each transport operation was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub authenticate: usize,
    pub open_shell: usize,
    pub submit_command: usize,
    pub read_stdout: usize,
    pub close_shell: usize,
    pub close_session: usize,
}

#[derive(Debug, Default)]
struct Counters {
    authenticate: AtomicUsize,
    open_shell: AtomicUsize,
    submit_command: AtomicUsize,
    read_stdout: AtomicUsize,
    close_shell: AtomicUsize,
    close_session: AtomicUsize,
}

#[derive(Debug, Default)]
struct Script {
    auth_error: Option<TransportError>,
    shell_error: Option<TransportError>,
    submit_error: Option<TransportError>,
    /// Read index at which stdout fails, and the error returned.
    read_error: Option<(usize, TransportError)>,
    stalls: Vec<Stage>,
    stdout: VecDeque<StdoutChunk>,
    identity: Option<String>,
    scheme: Option<AuthScheme>,
    submitted: Option<(String, Vec<String>)>,
}

/// Transport that replays a script instead of talking to a host.
///
/// Every operation succeeds unless told otherwise. Stdout defaults to an
/// immediately finished, empty stream with exit code 0.
///
/// ```
/// use winrm_exec::transport::{ScriptedTransport, TransportError};
///
/// let transport = ScriptedTransport::new()
///     .with_stdout(b"hi\n".to_vec())
///     .fail_submit(TransportError::Refused("policy".into()));
/// assert_eq!(transport.calls().submit_command, 0);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
    counters: Counters,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `output` as a single final chunk, exit code 0.
    pub fn with_stdout(self, output: impl Into<Vec<u8>>) -> Self {
        self.with_stdout_chunks(vec![StdoutChunk::last(output, 0)])
    }

    /// Deliver stdout as the given sequence of chunks.
    ///
    /// A chunk larger than the requested read size is split; the remainder is
    /// served by the next read.
    pub fn with_stdout_chunks(self, chunks: Vec<StdoutChunk>) -> Self {
        self.edit(|s| s.stdout = chunks.into())
    }

    pub fn fail_authenticate(self, err: TransportError) -> Self {
        self.edit(|s| s.auth_error = Some(err))
    }

    pub fn fail_open_shell(self, err: TransportError) -> Self {
        self.edit(|s| s.shell_error = Some(err))
    }

    pub fn fail_submit(self, err: TransportError) -> Self {
        self.edit(|s| s.submit_error = Some(err))
    }

    /// Fail the read with zero-based index `nth`.
    pub fn fail_read_at(self, nth: usize, err: TransportError) -> Self {
        self.edit(|s| s.read_error = Some((nth, err)))
    }

    /// Never complete the operation at `stage`.
    pub fn stall(self, stage: Stage) -> Self {
        self.edit(|s| s.stalls.push(stage))
    }

    /// How many times each operation has been called.
    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            authenticate: c.authenticate.load(Ordering::SeqCst),
            open_shell: c.open_shell.load(Ordering::SeqCst),
            submit_command: c.submit_command.load(Ordering::SeqCst),
            read_stdout: c.read_stdout.load(Ordering::SeqCst),
            close_shell: c.close_shell.load(Ordering::SeqCst),
            close_session: c.close_session.load(Ordering::SeqCst),
        }
    }

    /// Identity presented to the last `authenticate` call.
    pub fn last_identity(&self) -> Option<String> {
        self.read(|s| s.identity.clone())
    }

    /// Scheme requested by the last `authenticate` call.
    pub fn last_scheme(&self) -> Option<AuthScheme> {
        self.read(|s| s.scheme)
    }

    /// Program and arguments of the last submitted command.
    pub fn submitted(&self) -> Option<(String, Vec<String>)> {
        self.read(|s| s.submitted.clone())
    }

    fn edit(self, f: impl FnOnce(&mut Script)) -> Self {
        if let Ok(mut script) = self.script.lock() {
            f(&mut script);
        }
        self
    }

    fn read<T: Default>(&self, f: impl FnOnce(&Script) -> T) -> T {
        self.script.lock().map(|s| f(&s)).unwrap_or_default()
    }

    fn with_script<T>(&self, f: impl FnOnce(&mut Script) -> T) -> Result<T, TransportError> {
        self.script
            .lock()
            .map(|mut s| f(&mut s))
            .map_err(|_| TransportError::Stream("script lock poisoned".into()))
    }

    async fn maybe_stall(&self, stage: Stage) {
        let stalled = self.read(|s| s.stalls.contains(&stage));
        if stalled {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn authenticate(
        &self,
        endpoint: &EndpointDescriptor,
        identity: &Identity,
        _password: &str,
        scheme: AuthScheme,
    ) -> Result<SessionHandle, TransportError> {
        self.counters.authenticate.fetch_add(1, Ordering::SeqCst);
        self.maybe_stall(Stage::Authenticate).await;

        let err = self.with_script(|s| {
            s.identity = Some(identity.as_str().to_string());
            s.scheme = Some(scheme);
            s.auth_error.clone()
        })?;
        match err {
            Some(err) => Err(err),
            None => Ok(SessionHandle::new(format!("session@{}", endpoint.host()))),
        }
    }

    async fn open_shell(&self, session: &SessionHandle) -> Result<ShellHandle, TransportError> {
        let n = self.counters.open_shell.fetch_add(1, Ordering::SeqCst);
        self.maybe_stall(Stage::OpenShell).await;

        match self.with_script(|s| s.shell_error.clone())? {
            Some(err) => Err(err),
            None => Ok(ShellHandle::new(format!("{}/shell-{}", session, n + 1))),
        }
    }

    async fn submit_command(
        &self,
        shell: &ShellHandle,
        program: &str,
        args: &[String],
    ) -> Result<CommandId, TransportError> {
        let n = self.counters.submit_command.fetch_add(1, Ordering::SeqCst);
        self.maybe_stall(Stage::SubmitCommand).await;

        let err = self.with_script(|s| {
            s.submitted = Some((program.to_string(), args.to_vec()));
            s.submit_error.clone()
        })?;
        match err {
            Some(err) => Err(err),
            None => Ok(CommandId::new(format!("{}/cmd-{}", shell, n + 1))),
        }
    }

    async fn read_stdout(
        &self,
        _command: &CommandId,
        max_bytes: usize,
    ) -> Result<StdoutChunk, TransportError> {
        let n = self.counters.read_stdout.fetch_add(1, Ordering::SeqCst);
        self.maybe_stall(Stage::ReadStdout).await;

        self.with_script(|s| {
            if let Some((at, err)) = &s.read_error {
                if *at == n {
                    return Err(err.clone());
                }
            }

            let Some(mut chunk) = s.stdout.pop_front() else {
                return Ok(StdoutChunk {
                    data: Vec::new(),
                    done: true,
                    exit_code: None,
                });
            };

            if chunk.data.len() > max_bytes {
                let rest = chunk.data.split_off(max_bytes);
                s.stdout.push_front(StdoutChunk {
                    data: rest,
                    done: chunk.done,
                    exit_code: chunk.exit_code,
                });
                chunk.done = false;
                chunk.exit_code = None;
            }
            Ok(chunk)
        })?
    }

    async fn close_shell(&self, _shell: &ShellHandle) -> Result<(), TransportError> {
        self.counters.close_shell.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close_session(&self, _session: &SessionHandle) -> Result<(), TransportError> {
        self.counters.close_session.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
