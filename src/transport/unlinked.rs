//! Placeholder transport for builds without a wire implementation.

use async_trait::async_trait;

use super::{
    AuthScheme, CommandId, SessionHandle, ShellHandle, StdoutChunk, Transport, TransportError,
};
use crate::session::{EndpointDescriptor, Identity};

const REASON: &str = "no WS-Management wire transport is linked into this build";

/// Transport that refuses every connection.
///
/// Authentication always fails with [`TransportError::Unreachable`], so no
/// handle is ever issued and the remaining operations are unreachable in
/// practice; they report [`TransportError::Closed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlinkedTransport;

#[async_trait]
impl Transport for UnlinkedTransport {
    async fn authenticate(
        &self,
        endpoint: &EndpointDescriptor,
        _identity: &Identity,
        _password: &str,
        _scheme: AuthScheme,
    ) -> Result<SessionHandle, TransportError> {
        Err(TransportError::Unreachable(format!(
            "{} (target {})",
            REASON,
            endpoint.url()
        )))
    }

    async fn open_shell(&self, _session: &SessionHandle) -> Result<ShellHandle, TransportError> {
        Err(TransportError::Closed)
    }

    async fn submit_command(
        &self,
        _shell: &ShellHandle,
        _program: &str,
        _args: &[String],
    ) -> Result<CommandId, TransportError> {
        Err(TransportError::Closed)
    }

    async fn read_stdout(
        &self,
        _command: &CommandId,
        _max_bytes: usize,
    ) -> Result<StdoutChunk, TransportError> {
        Err(TransportError::Closed)
    }

    async fn close_shell(&self, _shell: &ShellHandle) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close_session(&self, _session: &SessionHandle) -> Result<(), TransportError> {
        Ok(())
    }
}
