//! Authenticated sessions and the remote shells they own.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{EndpointDescriptor, Identity};
use crate::cancel::or_cancelled;
use crate::error::{Stage, WinrmExecError};
use crate::logging::Logger;
use crate::transport::{AuthScheme, SessionHandle, ShellHandle, Transport, TransportError};
use crate::Result;

/// Opens sessions and shells through a [`Transport`].
///
/// Neither operation retries; the first failure is returned.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    logger: Logger,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, logger: Logger) -> Self {
        Self { transport, logger }
    }

    /// Authenticate against `endpoint` with NTLM.
    pub async fn connect(
        &self,
        endpoint: &EndpointDescriptor,
        identity: &Identity,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<Session> {
        let url = endpoint.url();
        self.logger.in_scope(|| {
            if endpoint.verify_certificate() && !endpoint.use_tls() {
                debug!("certificate verification requested without TLS; ignoring");
            }
            info!(endpoint = %url, identity = %identity, scheme = %AuthScheme::Ntlm, "Connecting");
        });

        let handle = or_cancelled(
            cancel,
            Stage::Authenticate,
            self.transport
                .authenticate(endpoint, identity, password, AuthScheme::Ntlm),
        )
        .await?
        .map_err(|source| WinrmExecError::Connection {
            endpoint: url,
            source,
        })?;

        self.logger
            .in_scope(|| debug!(session = %handle, "Authenticated"));

        Ok(Session {
            transport: Arc::clone(&self.transport),
            handle,
            endpoint: endpoint.clone(),
            identity: identity.clone(),
            logger: self.logger.clone(),
            closed: false,
        })
    }

    /// Open a remote shell owned by `session`.
    pub async fn create_shell<'s>(
        &self,
        session: &'s Session,
        cancel: &CancellationToken,
    ) -> Result<Shell<'s>> {
        let handle = or_cancelled(
            cancel,
            Stage::OpenShell,
            session.transport.open_shell(&session.handle),
        )
        .await?
        .map_err(WinrmExecError::ShellCreation)?;

        self.logger
            .in_scope(|| debug!(shell = %handle, session = %session.handle, "Shell opened"));

        Ok(Shell {
            session,
            handle,
            closed: false,
        })
    }
}

/// One authenticated connection to one endpoint.
///
/// Must be released with [`Session::close`]; dropping it open leaks the
/// remote connection and logs a warning.
pub struct Session {
    transport: Arc<dyn Transport>,
    handle: SessionHandle,
    endpoint: EndpointDescriptor,
    identity: Identity,
    logger: Logger,
    closed: bool,
}

impl Session {
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Close the connection. Not subject to cancellation.
    pub async fn close(mut self) -> std::result::Result<(), TransportError> {
        self.closed = true;
        let result = self.transport.close_session(&self.handle).await;
        self.logger.in_scope(|| match &result {
            Ok(()) => debug!(session = %self.handle, "Session closed"),
            Err(e) => warn!(session = %self.handle, error = %e, "Failed to close session"),
        });
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            self.logger.in_scope(|| {
                warn!(session = %self.handle, "Session dropped without being closed")
            });
        }
    }
}

/// A remote command interpreter inside a [`Session`].
///
/// Must be released with [`Shell::close`] before the session is closed.
pub struct Shell<'s> {
    session: &'s Session,
    handle: ShellHandle,
    closed: bool,
}

impl<'s> Shell<'s> {
    pub fn handle(&self) -> &ShellHandle {
        &self.handle
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.session.transport
    }

    /// Release the remote shell. Not subject to cancellation.
    pub async fn close(mut self) -> std::result::Result<(), TransportError> {
        self.closed = true;
        let result = self.session.transport.close_shell(&self.handle).await;
        self.session.logger.in_scope(|| match &result {
            Ok(()) => debug!(shell = %self.handle, "Shell released"),
            Err(e) => warn!(shell = %self.handle, error = %e, "Failed to release shell"),
        });
        result
    }
}

impl Drop for Shell<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.session.logger.in_scope(|| {
                warn!(shell = %self.handle, "Shell dropped without being released")
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;
    use crate::transport::ScriptedTransport;
    use tracing::Level;

    fn endpoint() -> EndpointDescriptor {
        EndpointDescriptor::builder("srv01").build().unwrap()
    }

    #[tokio::test]
    async fn test_connect_uses_ntlm_and_identity() {
        let transport = Arc::new(ScriptedTransport::new());
        let manager = SessionManager::new(transport.clone(), Logger::disabled());
        let identity = Identity::from_parts("alice", "corp.local");

        let session = manager
            .connect(&endpoint(), &identity, "pw", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(session.identity().as_str(), "alice@corp.local");
        assert_eq!(transport.last_identity().as_deref(), Some("alice@corp.local"));
        assert_eq!(transport.last_scheme(), Some(AuthScheme::Ntlm));
        session.close().await.unwrap();
        assert_eq!(transport.calls().close_session, 1);
    }

    #[tokio::test]
    async fn test_auth_failure_is_connection_error() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fail_authenticate(TransportError::Authentication("401".into())),
        );
        let manager = SessionManager::new(transport.clone(), Logger::disabled());

        let err = manager
            .connect(
                &endpoint(),
                &Identity::from_parts("u", ""),
                "pw",
                &CancellationToken::new(),
            )
            .await
            .err()
            .unwrap();

        assert!(matches!(err, WinrmExecError::Connection { .. }));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(transport.calls().authenticate, 1);
    }

    #[tokio::test]
    async fn test_shell_refusal_is_shell_creation_error() {
        let transport = Arc::new(
            ScriptedTransport::new().fail_open_shell(TransportError::Refused("MaxShells".into())),
        );
        let manager = SessionManager::new(transport.clone(), Logger::disabled());
        let cancel = CancellationToken::new();
        let session = manager
            .connect(&endpoint(), &Identity::from_parts("u", ""), "pw", &cancel)
            .await
            .unwrap();

        let err = manager.create_shell(&session, &cancel).await.err().unwrap();
        assert!(matches!(err, WinrmExecError::ShellCreation(_)));
        assert_eq!(transport.calls().open_shell, 1);

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_connect() {
        let transport = Arc::new(ScriptedTransport::new().stall(Stage::Authenticate));
        let manager = SessionManager::new(transport, Logger::disabled());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = manager
            .connect(&endpoint(), &Identity::from_parts("u", ""), "pw", &cancel)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, WinrmExecError::Cancelled(Stage::Authenticate)));
    }

    #[tokio::test]
    async fn test_dropping_open_shell_warns() {
        let log = MemoryLog::new();
        let transport = Arc::new(ScriptedTransport::new());
        let manager = SessionManager::new(transport.clone(), log.logger());
        let cancel = CancellationToken::new();
        let session = manager
            .connect(&endpoint(), &Identity::from_parts("u", ""), "pw", &cancel)
            .await
            .unwrap();

        {
            let _shell = manager.create_shell(&session, &cancel).await.unwrap();
        }
        assert!(log.contains(Level::WARN, "without being released"));
        assert_eq!(transport.calls().close_shell, 0);

        session.close().await.unwrap();
        assert!(!log.contains(Level::WARN, "Session dropped"));
    }
}
