//! Command-line interface for winrm-exec.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::output::CaptureMode;

/// Command-line arguments.
///
/// Every field is optional here; required inputs are checked after the
/// config file and environment have been merged in.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Server to connect to.
    pub server: Option<String>,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Active Directory domain (DNS form).
    pub domain: Option<String>,
    /// Port of the WinRM service.
    pub port: Option<u16>,
    /// Use TLS.
    pub tls: Option<bool>,
    /// Verify TLS certificates.
    pub verify: Option<bool>,
    /// Command to execute.
    pub command: Option<String>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Output capture mode.
    pub capture: Option<CaptureMode>,
    /// Bytes per stdout read.
    pub buffer_size: Option<usize>,
    /// Stop instead of capturing when the command submission is rejected.
    pub abort_on_exec_error: bool,
    /// Cancel the invocation after this many seconds.
    pub timeout: Option<u64>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Long("server") => {
                result.server = Some(parser.value()?.parse()?);
            }
            Long("username") => {
                result.username = Some(parser.value()?.parse()?);
            }
            Long("password") => {
                result.password = Some(parser.value()?.parse()?);
            }
            Long("domain") => {
                result.domain = Some(parser.value()?.parse()?);
            }
            Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Long("tls") => {
                result.tls = Some(flag_value("tls", parser.optional_value())?);
            }
            Long("verify") => {
                result.verify = Some(flag_value("verify", parser.optional_value())?);
            }
            Long("command") => {
                result.command = Some(parser.value()?.parse()?);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Long("capture") => {
                let value: String = parser.value()?.parse()?;
                result.capture = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("capture", value))?,
                );
            }
            Long("buffer-size") => {
                let value: String = parser.value()?.parse()?;
                result.buffer_size = match value.parse::<usize>() {
                    Ok(size) if size > 0 => Some(size),
                    _ => return Err(ArgsError::InvalidValue("buffer-size", value)),
                };
            }
            Long("abort-on-exec-error") => {
                result.abort_on_exec_error = true;
            }
            Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                result.timeout = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("timeout", value))?,
                );
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Boolean flag: bare `--tls` means true, `--tls=false` is accepted.
fn flag_value(name: &'static str, value: Option<OsString>) -> Result<bool, ArgsError> {
    let Some(value) = value else {
        return Ok(true);
    };
    let value = value.to_string_lossy().into_owned();
    match value.as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ArgsError::InvalidValue(name, value)),
    }
}

/// Usage text.
pub fn usage() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"winrm-exec {version}
Run one command on a Windows host over WinRM and print its output

USAGE:
    winrm-exec --server <HOST> --username <USER> --password <PASS> --command <CMD> [OPTIONS]

    Long options take two dashes; single-dash spellings such as -server
    are read as short flags and rejected.

REQUIRED:
        --server <HOST>         Server to connect to
        --username <USER>       Username for authentication
        --password <PASS>       Password for authentication
        --command <CMD>         Command to execute (split on single spaces)

OPTIONS:
        --domain <DOMAIN>       Active Directory domain (DNS form)
                                Example: example.local
                                Without it, authentication is performed LOCALLY
        --port <PORT>           Port of WinRM service [default: 5985]
        --tls[=<BOOL>]          Use TLS [default: false]
        --verify[=<BOOL>]       Verify TLS certificates [default: false]
        --capture <MODE>        single-read | drain [default: single-read]
        --buffer-size <BYTES>   Bytes per stdout read [default: 4096]
        --abort-on-exec-error   Skip output capture when the command is rejected
        --timeout <SECS>        Cancel the run after SECS seconds
    -c, --config <FILE>         Path to configuration file (JSON)
    -l, --log-level <LVL>       Log level (error, warn, info, debug, trace)
    -h, --help                  Print help
    -V, --version               Print version

ENVIRONMENT VARIABLES:
    WINRM_EXEC_SERVER, WINRM_EXEC_PORT, WINRM_EXEC_USERNAME,
    WINRM_EXEC_PASSWORD, WINRM_EXEC_DOMAIN, WINRM_EXEC_LOG_LEVEL
    RUST_LOG                    Alternative log level setting

EXIT STATUS:
    0  success, or a required option is missing (usage is printed)
    1  connection or authentication failure
    2  the remote host refused to create a shell
    3  the remote host rejected the command
    4  reading the command output failed
    64 invalid arguments or config file
    130 cancelled (interrupt or --timeout)
"#
    )
}

/// Print version.
pub fn print_version() {
    println!("winrm-exec {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("winrm-exec")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.server.is_none());
        assert!(result.port.is_none());
        assert!(result.tls.is_none());
        assert!(!result.abort_on_exec_error);
    }

    #[test]
    fn test_required_flags() {
        let result = parse_args_from(args(&[
            "--server",
            "srv01",
            "--username",
            "admin",
            "--password",
            "pw",
            "--command",
            "cmd /c dir",
        ]))
        .unwrap();

        assert_eq!(result.server.as_deref(), Some("srv01"));
        assert_eq!(result.username.as_deref(), Some("admin"));
        assert_eq!(result.password.as_deref(), Some("pw"));
        assert_eq!(result.command.as_deref(), Some("cmd /c dir"));
    }

    #[test]
    fn test_equals_syntax() {
        let result = parse_args_from(args(&["--server=srv01", "--port=5986"])).unwrap();
        assert_eq!(result.server.as_deref(), Some("srv01"));
        assert_eq!(result.port, Some(5986));
    }

    #[test]
    fn test_bool_flags() {
        let result = parse_args_from(args(&["--tls", "--verify"])).unwrap();
        assert_eq!(result.tls, Some(true));
        assert_eq!(result.verify, Some(true));

        let result = parse_args_from(args(&["--tls=false", "--verify=0"])).unwrap();
        assert_eq!(result.tls, Some(false));
        assert_eq!(result.verify, Some(false));

        assert!(parse_args_from(args(&["--tls=maybe"])).is_err());
    }

    #[test]
    fn test_capture_options() {
        let result = parse_args_from(args(&[
            "--capture",
            "drain",
            "--buffer-size",
            "65536",
            "--abort-on-exec-error",
            "--timeout",
            "30",
        ]))
        .unwrap();

        assert_eq!(result.capture, Some(CaptureMode::Drain));
        assert_eq!(result.buffer_size, Some(65536));
        assert!(result.abort_on_exec_error);
        assert_eq!(result.timeout, Some(30));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse_args_from(args(&["--port", "invalid"])).is_err());
        assert!(parse_args_from(args(&["--port", "70000"])).is_err());
        assert!(parse_args_from(args(&["--capture", "everything"])).is_err());
        assert!(parse_args_from(args(&["--buffer-size", "0"])).is_err());
        assert!(parse_args_from(args(&["--timeout", "-1"])).is_err());
    }

    #[test]
    fn test_single_dash_long_flag_rejected() {
        assert!(parse_args_from(args(&["-server", "srv01"])).is_err());
        assert!(parse_args_from(args(&["-command", "ipconfig"])).is_err());
        assert!(usage().contains("single-dash"));
    }

    #[test]
    fn test_unexpected_positional() {
        let err = parse_args_from(args(&["ipconfig"])).unwrap_err();
        assert!(err.to_string().contains("ipconfig"));
    }

    #[test]
    fn test_help_and_version() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
    }

    #[test]
    fn test_config_and_log_level() {
        let result = parse_args_from(args(&["-c", "/etc/winrm-exec.json", "-l", "debug"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/winrm-exec.json")));
        assert_eq!(result.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_usage_lists_required_flags() {
        let text = usage();
        for flag in ["--server", "--username", "--password", "--command", "--domain"] {
            assert!(text.contains(flag), "usage is missing {}", flag);
        }
    }
}
