use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;

use crate::ReconcileError;
use crate::Result;

/// Spawns a named background task and logs its failure instead of dropping it.
pub(crate) fn spawn_task<Fut>(
    name: &str,
    task: Fut,
) -> JoinHandle<()>
where
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    // Clone the name so it can be safely moved into the async block
    let name = name.to_string();
    tokio::spawn(async move {
        match task.await {
            Ok(()) => debug!("spawned task: {name} finished"),
            Err(e) => error!("spawned task: {name} stopped or encountered an error: {:?}", e),
        }
    })
}

/// Runs `task` until it completes, `bound` elapses, or `cancel` fires.
///
/// `None` as bound waits indefinitely for completion or cancellation.
pub(crate) async fn run_bounded<F, T>(
    task: F,
    bound: Option<Duration>,
    cancel: &CancellationToken,
) -> std::result::Result<T, ReconcileError>
where
    F: Future<Output = std::result::Result<T, ReconcileError>>,
{
    let bounded = async {
        match bound {
            Some(limit) => match timeout(limit, task).await {
                Ok(r) => r,
                Err(_) => Err(ReconcileError::Timeout(limit)),
            },
            None => task.await,
        }
    };

    tokio::select! {
        biased;
        r = bounded => r,
        _ = cancel.cancelled() => Err(ReconcileError::Cancelled),
    }
}
