//! Error types for winrm-exec.

use std::fmt;

use thiserror::Error;

use crate::transport::TransportError;

/// Exit status used when arguments or the config file cannot be read.
pub const EXIT_USAGE: u8 = 64;

/// A required input that was not supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Server,
    Username,
    Password,
    Command,
    /// Port was set to zero.
    Port,
}

impl MissingField {
    /// Name of the flag that supplies this field.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Username => "username",
            Self::Password => "password",
            Self::Command => "command",
            Self::Port => "port",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "Missing server for WinRM connection"),
            Self::Username => write!(f, "Missing username for authentication"),
            Self::Password => write!(f, "Missing password for authentication"),
            Self::Command => write!(f, "Missing command to execute"),
            Self::Port => write!(f, "Invalid port for WinRM connection (must be 1-65535)"),
        }
    }
}

/// A point where an invocation may suspend on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticate,
    OpenShell,
    SubmitCommand,
    ReadStdout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authenticate => "authentication",
            Self::OpenShell => "shell creation",
            Self::SubmitCommand => "command submission",
            Self::ReadStdout => "stdout read",
        };
        f.write_str(name)
    }
}

/// Main error type for winrm-exec operations.
#[derive(Error, Debug)]
pub enum WinrmExecError {
    /// A required input is missing. Handled at the boundary by printing usage.
    #[error("{0}")]
    Validation(MissingField),

    /// Network, TLS or authentication failure while connecting.
    #[error("connection to {endpoint} failed: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// The remote host refused to open a shell.
    #[error("shell creation refused: {0}")]
    ShellCreation(#[source] TransportError),

    /// The remote host rejected the command submission.
    #[error("command submission rejected: {0}")]
    Execution(#[source] TransportError),

    /// Reading the command's stdout failed.
    #[error("failed to read command output: {0}")]
    Read(String),

    /// The invocation's cancellation signal fired during a network wait.
    #[error("{0} cancelled")]
    Cancelled(Stage),
}

impl WinrmExecError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 0,
            Self::Connection { .. } => 1,
            Self::ShellCreation(_) => 2,
            Self::Execution(_) => 3,
            Self::Read(_) => 4,
            Self::Cancelled(_) => 130,
        }
    }

    /// Whether this error came from the cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Convenience Result type for winrm-exec operations.
pub type Result<T> = std::result::Result<T, WinrmExecError>;
