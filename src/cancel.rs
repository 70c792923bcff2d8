//! Racing network waits against the invocation's cancellation signal.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{Stage, WinrmExecError};
use crate::Result;

/// Await `fut` unless `cancel` fires first.
///
/// A token that is already cancelled wins without polling `fut`.
pub(crate) async fn or_cancelled<F>(
    cancel: &CancellationToken,
    stage: Stage,
    fut: F,
) -> Result<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WinrmExecError::Cancelled(stage)),
        output = fut => Ok(output),
    }
}
