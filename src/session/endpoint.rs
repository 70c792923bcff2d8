//! Where and how to reach the remote management service.

use std::fmt;

use crate::error::{MissingField, WinrmExecError};
use crate::Result;

/// Default WinRM HTTP port.
pub const DEFAULT_PORT: u16 = 5985;

/// Immutable description of a WinRM endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    host: String,
    port: u16,
    use_tls: bool,
    verify_certificate: bool,
}

impl EndpointDescriptor {
    /// Start building an endpoint for `host`.
    pub fn builder(host: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder {
            host: host.into(),
            port: DEFAULT_PORT,
            use_tls: false,
            verify_certificate: false,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    /// The verify flag as supplied, regardless of TLS.
    pub fn verify_certificate(&self) -> bool {
        self.verify_certificate
    }

    /// Whether the transport must verify the server certificate.
    ///
    /// Only meaningful over TLS.
    pub fn verifies_certificate(&self) -> bool {
        self.use_tls && self.verify_certificate
    }

    /// Service URL, e.g. `https://srv01:5986/wsman`.
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}/wsman", scheme, self.host, self.port)
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Builder for [`EndpointDescriptor`].
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    host: String,
    port: u16,
    use_tls: bool,
    verify_certificate: bool,
}

impl EndpointBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn verify_certificate(mut self, verify: bool) -> Self {
        self.verify_certificate = verify;
        self
    }

    /// Finish the endpoint.
    ///
    /// Only an empty host or a zero port is rejected; anything else is left
    /// for the transport to fail on at connect time.
    pub fn build(self) -> Result<EndpointDescriptor> {
        if self.host.is_empty() {
            return Err(WinrmExecError::Validation(MissingField::Server));
        }
        if self.port == 0 {
            return Err(WinrmExecError::Validation(MissingField::Port));
        }

        Ok(EndpointDescriptor {
            host: self.host,
            port: self.port,
            use_tls: self.use_tls,
            verify_certificate: self.verify_certificate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let endpoint = EndpointDescriptor::builder("srv01").build().unwrap();
        assert_eq!(endpoint.host(), "srv01");
        assert_eq!(endpoint.port(), 5985);
        assert!(!endpoint.use_tls());
        assert!(!endpoint.verify_certificate());
        assert_eq!(endpoint.url(), "http://srv01:5985/wsman");
    }

    #[test]
    fn test_tls_url() {
        let endpoint = EndpointDescriptor::builder("srv01.example.local")
            .port(5986)
            .use_tls(true)
            .verify_certificate(true)
            .build()
            .unwrap();
        assert_eq!(endpoint.url(), "https://srv01.example.local:5986/wsman");
        assert!(endpoint.verifies_certificate());
    }

    #[test]
    fn test_verify_ignored_without_tls() {
        let endpoint = EndpointDescriptor::builder("srv01")
            .verify_certificate(true)
            .build()
            .unwrap();
        assert!(endpoint.verify_certificate());
        assert!(!endpoint.verifies_certificate());
    }

    #[test]
    fn test_empty_host_rejected() {
        let err = EndpointDescriptor::builder("").build().unwrap_err();
        assert!(matches!(err, WinrmExecError::Validation(MissingField::Server)));
    }

    #[test]
    fn test_zero_port_rejected() {
        let err = EndpointDescriptor::builder("srv01").port(0).build().unwrap_err();
        assert!(matches!(err, WinrmExecError::Validation(MissingField::Port)));
    }

    #[test]
    fn test_malformed_host_accepted() {
        // Deferred to the transport.
        assert!(EndpointDescriptor::builder("not a host!").build().is_ok());
    }
}
