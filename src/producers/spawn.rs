//! Zone-attributed `tokio::spawn`.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::core::{ErrorSource, Zone};
use crate::error::TaskError;
use crate::tasks::{Category, TaskId, TokenTask};

/// Spawns `fut` on the tokio runtime as a `"future"` task of the current zone.
///
/// Every poll runs inside the zone. The task is deleted once the future
/// completes; an `Err` output or a panic is raised as a `ZoneError` on the
/// zone first. Cancelling the task drops the future.
///
/// # Panics
/// Panics when called outside a tokio runtime.
pub fn spawn<F>(fut: F) -> TaskId
where
    F: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    let zone = Zone::current();
    let token = CancellationToken::new();
    let id = zone.insert_next(&Category::FUTURE, TokenTask::arc("future", token.clone()));
    let work = zone.in_zone(AssertUnwindSafe(fut).catch_unwind());

    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            out = work => {
                let failure = match out {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some(err),
                    Err(panic) => Some(TaskError::from_panic(panic)),
                };
                if let Some(err) = failure {
                    if zone.has_in(&Category::FUTURE, id) {
                        zone.raise_error(err, ErrorSource::Task);
                    }
                }
                zone.delete_in(&Category::FUTURE, id);
            }
        }
    });
    id
}
