//! Command execution.
//!
//! This module provides:
//! - Command-line tokenization ([`tokenize`])
//! - Submission into a remote shell ([`CommandExecutor`])
//! - A handle exposing the command's stdout as a pull-based stream
//!
//! # Example
//!
//! ```
//! use winrm_exec::execution::tokenize;
//!
//! let argv = tokenize("cmd /c dir");
//! assert_eq!(argv.program(), "cmd");
//! assert_eq!(argv.args(), &["/c".to_string(), "dir".to_string()]);
//! ```

mod command;
mod executor;
mod handle;

pub use command::{tokenize, Argv};
pub use executor::{CommandExecutor, ExecutionErrorPolicy};
pub use handle::CommandHandle;
