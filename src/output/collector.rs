//! Stdout capture policy.

use std::fmt;
use std::pin::pin;
use std::str::FromStr;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::WinrmExecError;
use crate::execution::CommandHandle;
use crate::logging::Logger;

/// Capacity of a single stdout read.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// How much of stdout to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    /// Exactly one bounded read. Output past the buffer, or delivered after
    /// the first read, is not captured.
    #[default]
    SingleRead,
    /// Read until the remote side reports end of stream.
    Drain,
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single-read" => Ok(Self::SingleRead),
            "drain" => Ok(Self::Drain),
            other => Err(format!("unknown capture mode: {}", other)),
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleRead => f.write_str("single-read"),
            Self::Drain => f.write_str("drain"),
        }
    }
}

/// Result of a capture: whatever bytes were read, plus the failure if any.
#[derive(Debug, Default)]
pub struct Capture {
    /// Collected stdout bytes, possibly partial.
    pub bytes: Vec<u8>,
    /// Remote exit code, when reported before capture stopped.
    pub exit_code: Option<i32>,
    /// Whether the stream was read to its end without error.
    pub complete: bool,
    /// Read or cancellation failure that stopped the capture.
    pub error: Option<WinrmExecError>,
}

/// Reads a command's stdout according to a [`CaptureMode`].
pub struct OutputCollector {
    mode: CaptureMode,
    buffer_size: usize,
    logger: Logger,
}

impl OutputCollector {
    /// A zero `buffer_size` is treated as one byte.
    pub fn new(mode: CaptureMode, buffer_size: usize, logger: Logger) -> Self {
        Self {
            mode,
            buffer_size: buffer_size.max(1),
            logger,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Collect stdout from `handle`. Never fails; see [`Capture::error`].
    pub async fn capture(&self, handle: &CommandHandle<'_>) -> Capture {
        let mut stdout = pin!(handle.stdout(self.buffer_size));
        let mut bytes = Vec::new();
        let mut failure = None;

        match self.mode {
            CaptureMode::SingleRead => match stdout.next().await {
                Some(Ok(mut chunk)) => {
                    chunk.truncate(self.buffer_size);
                    bytes = chunk;
                }
                Some(Err(e)) => failure = Some(e),
                None => {}
            },
            CaptureMode::Drain => {
                while let Some(item) = stdout.next().await {
                    match item {
                        Ok(chunk) => bytes.extend_from_slice(&chunk),
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }
        }

        let complete = failure.is_none() && handle.stdout_finished();
        self.logger.in_scope(|| match &failure {
            Some(e) => error!(
                command = %handle.id(),
                bytes = bytes.len(),
                error = %e,
                "Failed to read bytes from command output"
            ),
            None => debug!(
                command = %handle.id(),
                mode = %self.mode,
                bytes = bytes.len(),
                complete,
                "Captured command output"
            ),
        });

        Capture {
            bytes,
            exit_code: handle.exit_code(),
            complete,
            error: failure,
        }
    }
}
