//! Protocol transport boundary.
//!
//! The WS-Management wire protocol (SOAP envelopes, HTTP exchange, NTLM
//! handshake bytes) lives behind [`Transport`]. The core only ever sees the
//! opaque handles defined here.
//!
//! Two implementations ship with the crate:
//! - [`ScriptedTransport`]: an in-memory transport with scripted replies,
//!   failures, and stalls, used throughout the tests.
//! - [`UnlinkedTransport`]: what the binary links when no wire implementation
//!   is available; every connection attempt fails.

mod scripted;
mod unlinked;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::{EndpointDescriptor, Identity};

pub use scripted::{CallCounts, ScriptedTransport};
pub use unlinked::UnlinkedTransport;

/// Authentication scheme presented to the remote service.
///
/// Fixed to NTLM; it is never negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Ntlm,
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ntlm => f.write_str("NTLM"),
        }
    }
}

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_handle!(
    /// Transport-side identifier of an authenticated connection.
    SessionHandle
);
opaque_handle!(
    /// Transport-side identifier of a remote shell.
    ShellHandle
);
opaque_handle!(
    /// Transport-side identifier of a submitted command.
    CommandId
);

/// One reply to a stdout read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StdoutChunk {
    /// Bytes delivered by this read. May be empty.
    pub data: Vec<u8>,
    /// The remote side reported that stdout is finished.
    pub done: bool,
    /// Exit code, when reported alongside end of stream.
    pub exit_code: Option<i32>,
}

impl StdoutChunk {
    /// A chunk with more output to follow.
    pub fn partial(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            done: false,
            exit_code: None,
        }
    }

    /// The final chunk of a command that exited with `exit_code`.
    pub fn last(data: impl Into<Vec<u8>>, exit_code: i32) -> Self {
        Self {
            data: data.into(),
            done: true,
            exit_code: Some(exit_code),
        }
    }
}

/// Failure reported by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The endpoint could not be reached.
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    /// TLS negotiation or certificate verification failed.
    #[error("TLS failure: {0}")]
    Tls(String),

    /// The remote host refused the request.
    #[error("request refused: {0}")]
    Refused(String),

    /// The output stream failed mid-read.
    #[error("stream error: {0}")]
    Stream(String),

    /// The handle no longer refers to a live remote object.
    #[error("handle closed")]
    Closed,
}

/// Remote-management transport consumed by the core.
///
/// Each method is one network round-trip. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Authenticate against `endpoint` and return a live connection.
    async fn authenticate(
        &self,
        endpoint: &EndpointDescriptor,
        identity: &Identity,
        password: &str,
        scheme: AuthScheme,
    ) -> Result<SessionHandle, TransportError>;

    /// Open a remote shell on an authenticated connection.
    async fn open_shell(&self, session: &SessionHandle) -> Result<ShellHandle, TransportError>;

    /// Start `program` with `args` inside `shell`.
    async fn submit_command(
        &self,
        shell: &ShellHandle,
        program: &str,
        args: &[String],
    ) -> Result<CommandId, TransportError>;

    /// Read at most `max_bytes` of the command's stdout.
    async fn read_stdout(
        &self,
        command: &CommandId,
        max_bytes: usize,
    ) -> Result<StdoutChunk, TransportError>;

    /// Release a remote shell.
    async fn close_shell(&self, shell: &ShellHandle) -> Result<(), TransportError>;

    /// Close an authenticated connection.
    async fn close_session(&self, session: &SessionHandle) -> Result<(), TransportError>;
}
