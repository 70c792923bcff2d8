//! Credentials and the authentication principal derived from them.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::logging::Logger;

/// Username, password and optional AD domain.
pub struct Credentials {
    username: String,
    password: SecretString,
    domain: String,
}

impl Credentials {
    /// An empty `domain` means the target's local account namespace.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            domain: domain.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Whether authentication is scoped to the target's local accounts.
    pub fn is_local(&self) -> bool {
        self.domain.is_empty()
    }

    /// Resolve the principal, warning the operator about local scope.
    pub fn identity(&self, logger: &Logger) -> Identity {
        resolve(&self.username, &self.domain, logger)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("domain", &self.domain)
            .finish()
    }
}

/// Authentication principal presented to the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    /// `username`, or `username@domain` when a domain is given. Silent.
    pub fn from_parts(username: &str, domain: &str) -> Self {
        if domain.is_empty() {
            Self(username.to_string())
        } else {
            Self(format!("{}@{}", username, domain))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compose the principal from `username` and `domain`.
///
/// Never fails. An empty domain yields the bare username and a low-trust
/// warning on `logger`.
pub fn resolve(username: &str, domain: &str, logger: &Logger) -> Identity {
    if domain.is_empty() {
        logger.in_scope(|| {
            warn!(
                username,
                "Missing domain, authentication will be performed LOCALLY!"
            )
        });
    }
    Identity::from_parts(username, domain)
}
