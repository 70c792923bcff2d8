//! # winrm-exec
//!
//! Run a single command on a Windows host over WinRM and capture its output.
//!
//! The crate is split into small components that each own one step of an
//! invocation:
//!
//! - **Session**: endpoint description, identity resolution, NTLM connect
//!   and remote shell creation
//! - **Execution**: single-space tokenization and command submission
//! - **Output**: bounded or draining stdout capture and rendering
//! - **Transport**: the seam behind which the WS-Management wire protocol lives
//!
//! Every network wait is raced against one invocation-scoped
//! [`CancellationToken`](tokio_util::sync::CancellationToken), and the shell
//! and session are closed on every exit path.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use winrm_exec::{logging, App, Config};
//! use winrm_exec::transport::ScriptedTransport;
//!
//! #[tokio::main]
//! async fn main() {
//!     let logger = logging::build(None);
//!     let transport = Arc::new(ScriptedTransport::new().with_stdout(b"hi\n".to_vec()));
//!
//!     let mut config = Config::default();
//!     config.target.server = "srv01".into();
//!     config.auth.username = "admin".into();
//!     config.auth.password = "secret".into();
//!     config.command.line = "echo hi".into();
//!
//!     let outcome = App::new(transport, logger)
//!         .run(&config, &CancellationToken::new())
//!         .await;
//!     assert_eq!(outcome.exit_code, 0);
//! }
//! ```

pub mod app;
mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod output;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use app::{App, Invocation, Outcome};
pub use config::Config;
pub use error::{Result, WinrmExecError};
pub use execution::{tokenize, Argv, CommandExecutor, CommandHandle, ExecutionErrorPolicy};
pub use output::{Capture, CaptureMode, OutputCollector};
pub use session::{EndpointDescriptor, Identity, Phase, Session, SessionManager, Shell};
pub use transport::{Transport, TransportError};
