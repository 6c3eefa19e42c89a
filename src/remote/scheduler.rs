use super::source::RemoteSource;
use crate::plugin::SetKind;
use std::sync::Arc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Spawns the periodic refresher of `source` on `tracker`.
///
/// Ticks are serialized: the next tick is only awaited once the current
/// refresh has finished, and ticks missed meanwhile are skipped. The task
/// stops when `token` is cancelled, abandoning an in-flight refresh.
/// Does nothing if the source's interval is zero.
pub fn spawn_refresher<S: SetKind>(
    source: Arc<RemoteSource<S>>,
    token: CancellationToken,
    tracker: &TaskTracker,
) {
    let period = source.interval();
    if period.is_zero() {
        return;
    }

    tracker.spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            debug!("Scheduled refresh of {}", source.url());
            tokio::select! {
                _ = token.cancelled() => break,
                res = source.refresh() => match res {
                    Ok(rules) => info!("Refreshed {} ({} rules)", source.url(), rules),
                    Err(e) => warn!(
                        url = %source.url(),
                        error = %e,
                        "Remote rule file refresh failed, keeping previous rules"
                    ),
                }
            }
        }

        debug!("Refresher of {} stopped", source.url());
    });
}
