//! Configuration management for winrm-exec.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::Invocation;
use crate::cli::Args;
use crate::error::{MissingField, WinrmExecError};
use crate::execution::ExecutionErrorPolicy;
use crate::logging::DEFAULT_FILTER;
use crate::output::{CaptureMode, DEFAULT_BUFFER_SIZE};
use crate::session::{Credentials, EndpointDescriptor, DEFAULT_PORT};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where to connect.
    pub target: TargetSection,
    /// Who to authenticate as.
    pub auth: AuthSection,
    /// What to run and how to collect its output.
    pub command: CommandSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Target endpoint section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSection {
    /// Host name or address of the WinRM service.
    pub server: String,
    /// Port of the WinRM service.
    pub port: u16,
    /// Use HTTPS.
    pub tls: bool,
    /// Verify the server certificate (HTTPS only).
    pub verify: bool,
}

impl Default for TargetSection {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: DEFAULT_PORT,
            tls: false,
            verify: false,
        }
    }
}

/// Authentication section.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub username: String,
    pub password: String,
    /// Active Directory domain (DNS form). Empty means a local account.
    pub domain: String,
}

impl fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() {
            ""
        } else {
            "[REDACTED]"
        };
        f.debug_struct("AuthSection")
            .field("username", &self.username)
            .field("password", &password)
            .field("domain", &self.domain)
            .finish()
    }
}

/// Command section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSection {
    /// Command line to execute.
    pub line: String,
    /// Output capture mode.
    pub capture: CaptureMode,
    /// Bytes per stdout read.
    pub buffer_size: usize,
    /// Behavior when the command submission is rejected.
    pub on_execution_error: ExecutionErrorPolicy,
    /// Cancel the invocation after this many seconds. No deadline when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for CommandSection {
    fn default() -> Self {
        Self {
            line: String::new(),
            capture: CaptureMode::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            on_execution_error: ExecutionErrorPolicy::default(),
            timeout_secs: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter directive (error, warn, info, debug, trace, or `target=level`).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: DEFAULT_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(server) = lookup("WINRM_EXEC_SERVER") {
            self.target.server = server;
        }

        if let Some(port) = lookup("WINRM_EXEC_PORT") {
            self.target.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("WINRM_EXEC_PORT", port))?;
        }

        if let Some(username) = lookup("WINRM_EXEC_USERNAME") {
            self.auth.username = username;
        }

        if let Some(password) = lookup("WINRM_EXEC_PASSWORD") {
            self.auth.password = password;
        }

        if let Some(domain) = lookup("WINRM_EXEC_DOMAIN") {
            self.auth.domain = domain;
        }

        if let Some(level) = lookup("WINRM_EXEC_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref server) = args.server {
            self.target.server = server.clone();
        }
        if let Some(port) = args.port {
            self.target.port = port;
        }
        if let Some(tls) = args.tls {
            self.target.tls = tls;
        }
        if let Some(verify) = args.verify {
            self.target.verify = verify;
        }

        if let Some(ref username) = args.username {
            self.auth.username = username.clone();
        }
        if let Some(ref password) = args.password {
            self.auth.password = password.clone();
        }
        if let Some(ref domain) = args.domain {
            self.auth.domain = domain.clone();
        }

        if let Some(ref line) = args.command {
            self.command.line = line.clone();
        }
        if let Some(capture) = args.capture {
            self.command.capture = capture;
        }
        if let Some(size) = args.buffer_size {
            self.command.buffer_size = size;
        }
        if args.abort_on_exec_error {
            self.command.on_execution_error = ExecutionErrorPolicy::Abort;
        }
        if let Some(secs) = args.timeout {
            self.command.timeout_secs = Some(secs);
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env()?;
        config.apply_args(args);

        Ok(config)
    }

    /// Validate required inputs and build the invocation.
    ///
    /// Checked in order: server, username, password, command. The first
    /// missing one is reported.
    pub fn to_invocation(&self) -> Result<Invocation, WinrmExecError> {
        let required = [
            (&self.target.server, MissingField::Server),
            (&self.auth.username, MissingField::Username),
            (&self.auth.password, MissingField::Password),
            (&self.command.line, MissingField::Command),
        ];
        if let Some((_, field)) = required.iter().find(|(value, _)| value.is_empty()) {
            return Err(WinrmExecError::Validation(*field));
        }

        let endpoint = EndpointDescriptor::builder(self.target.server.clone())
            .port(self.target.port)
            .use_tls(self.target.tls)
            .verify_certificate(self.target.verify)
            .build()?;

        Ok(Invocation {
            endpoint,
            credentials: Credentials::new(
                self.auth.username.clone(),
                self.auth.password.clone(),
                self.auth.domain.clone(),
            ),
            command_line: self.command.line.clone(),
            capture: self.command.capture,
            buffer_size: self.command.buffer_size,
            on_execution_error: self.command.on_execution_error,
        })
    }

    /// Deadline after which the invocation is cancelled, if configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.command.timeout_secs.map(Duration::from_secs)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Environment variable with an unusable value.
    InvalidValue(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn complete() -> Config {
        let mut config = Config::default();
        config.target.server = "srv01".into();
        config.auth.username = "admin".into();
        config.auth.password = "secret".into();
        config.command.line = "ipconfig".into();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.target.port, 5985);
        assert!(!config.target.tls);
        assert!(!config.target.verify);
        assert_eq!(config.command.capture, CaptureMode::SingleRead);
        assert_eq!(config.command.buffer_size, 4096);
        assert_eq!(config.command.on_execution_error, ExecutionErrorPolicy::Continue);
        assert!(config.deadline().is_none());
        assert_eq!(config.log_filter(), "winrm_exec=info");
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "target": { "server": "srv01.example.local", "port": 5986, "tls": true, "verify": true },
            "auth": { "username": "svc", "password": "pw", "domain": "example.local" },
            "command": { "line": "cmd /c dir", "capture": "drain", "on_execution_error": "abort", "timeout_secs": 30 }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.target.server, "srv01.example.local");
        assert_eq!(config.target.port, 5986);
        assert!(config.target.tls);
        assert_eq!(config.auth.domain, "example.local");
        assert_eq!(config.command.capture, CaptureMode::Drain);
        assert_eq!(config.command.on_execution_error, ExecutionErrorPolicy::Abort);
        assert_eq!(config.deadline(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_config_partial_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "target": { "server": "srv02" } }"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.target.server, "srv02");
        assert_eq!(config.target.port, 5985); // Default
    }

    #[test]
    fn test_config_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WINRM_EXEC_SERVER", "envhost"),
            ("WINRM_EXEC_PORT", "5986"),
            ("WINRM_EXEC_PASSWORD", "from-env"),
            ("RUST_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.target.server, "envhost");
        assert_eq!(config.target.port, 5986);
        assert_eq!(config.auth.password, "from-env");
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_env_invalid_port() {
        let mut config = Config::default();
        let result = config.apply_env_from(|k| {
            (k == "WINRM_EXEC_PORT").then(|| "many".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue("WINRM_EXEC_PORT", _))
        ));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.target.server = "from-file".into();
        let args = Args {
            server: Some("from-cli".into()),
            port: Some(5986),
            tls: Some(true),
            domain: Some("corp.local".into()),
            abort_on_exec_error: true,
            timeout: Some(5),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.target.server, "from-cli");
        assert_eq!(config.target.port, 5986);
        assert!(config.target.tls);
        assert_eq!(config.auth.domain, "corp.local");
        assert_eq!(config.command.on_execution_error, ExecutionErrorPolicy::Abort);
        assert_eq!(config.deadline(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_to_invocation() {
        let invocation = complete().to_invocation().unwrap();
        assert_eq!(invocation.endpoint.url(), "http://srv01:5985/wsman");
        assert_eq!(invocation.credentials.username(), "admin");
        assert_eq!(invocation.command_line, "ipconfig");
    }

    #[test]
    fn test_each_required_field() {
        let cases: [(fn(&mut Config), MissingField); 4] = [
            (|c: &mut Config| c.target.server.clear(), MissingField::Server),
            (|c: &mut Config| c.auth.username.clear(), MissingField::Username),
            (|c: &mut Config| c.auth.password.clear(), MissingField::Password),
            (|c: &mut Config| c.command.line.clear(), MissingField::Command),
        ];

        for (clear, expected) in cases {
            let mut config = complete();
            clear(&mut config);
            match config.to_invocation() {
                Err(WinrmExecError::Validation(field)) => assert_eq!(field, expected),
                _ => panic!("expected validation error for {:?}", expected),
            }
        }
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let mut config = complete();
        config.target.server.clear();
        config.command.line.clear();
        assert!(matches!(
            config.to_invocation(),
            Err(WinrmExecError::Validation(MissingField::Server))
        ));
    }

    #[test]
    fn test_domain_is_optional() {
        let mut config = complete();
        config.auth.domain.clear();
        assert!(config.to_invocation().is_ok());
    }

    #[test]
    fn test_invocation_debug_redacts_password() {
        let invocation = complete().to_invocation().unwrap();
        let rendered = format!("{:?}", invocation);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_auth_debug_redacts_password() {
        let rendered = format!("{:?}", complete().auth);
        assert!(!rendered.contains("secret"));
    }
}
