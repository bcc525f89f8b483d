// SPDX-License-Identifier: Apache-2.0

use std::future::Future;

use futures::FutureExt;
use tokio::task::JoinHandle;

/// Spawns `future` and logs a panic instead of letting it vanish silently. Every background
/// worker in this crate (write queue, dependency notifier, bootstrap connections) goes through
/// this helper so a crashed task always leaves a trace.
pub fn spawn_monitored<F>(name: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(panic) = std::panic::AssertUnwindSafe(future).catch_unwind().await {
            tracing::error!(task = name, ?panic, "monitored task panicked");
        }
    })
}
