//! Output capture and rendering.
//!
//! - [`OutputCollector`] reads a command's stdout in either single-read or
//!   drain mode
//! - [`render`] prefixes the captured bytes for presentation
//!
//! # Example
//!
//! ```
//! use winrm_exec::output::render;
//!
//! assert_eq!(render(b"hi\n"), b"Output of command:\nhi\n");
//! ```

mod collector;
mod render;

pub use collector::{Capture, CaptureMode, OutputCollector, DEFAULT_BUFFER_SIZE};
pub use render::{render, HEADER};
