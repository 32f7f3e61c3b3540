use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::services::{PublicStats, StatsSource};

/// Forwards only the last value pushed within a quiet period.
///
/// The background task is aborted when the debouncer is dropped; a value still waiting
/// out its quiet period is discarded. Use [`Debouncer::close`] to release it instead.
pub struct Debouncer<T> {
    input: Option<mpsc::UnboundedSender<T>>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Send + 'static,
{
    pub fn new(quiet: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (input, mut pending) = mpsc::unbounded_channel::<T>();
        let (output, settled) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            loop {
                let Some(mut value) = pending.recv().await else {
                    return;
                };
                loop {
                    tokio::select! {
                        next = pending.recv() => match next {
                            Some(newer) => value = newer,
                            None => {
                                let _ = output.send(value);
                                return;
                            }
                        },
                        () = tokio::time::sleep(quiet) => break,
                    }
                }
                if output.send(value).is_err() {
                    return;
                }
            }
        });

        (Self { input: Some(input), task }, settled)
    }

    /// Returns `false` once the debouncer can no longer deliver values.
    pub fn push(&self, value: T) -> bool {
        self.input.as_ref().is_some_and(|input| input.send(value).is_ok())
    }

    /// Stops accepting values. A pending value is forwarded without waiting out the quiet
    /// period, then the settled channel closes.
    pub fn close(&mut self) {
        self.input = None;
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Periodically refreshes public usage stats. A failed poll keeps the last good value.
pub struct StatsPoller {
    latest: watch::Receiver<PublicStats>,
    task: JoinHandle<()>,
}

impl StatsPoller {
    pub fn spawn(source: Arc<dyn StatsSource>, every: Duration, fallback_checks: u64) -> Self {
        let (publish, latest) = watch::channel(PublicStats::fallback(fallback_checks));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match source.stats().await {
                    Ok(stats) => {
                        if publish.send(stats).is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        tracing::debug!(
                            event_name = "stats.poll_failed",
                            error = %error,
                            "keeping previous stats"
                        );
                    }
                }
            }
        });

        Self { latest, task }
    }

    pub fn latest(&self) -> PublicStats {
        *self.latest.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PublicStats> {
        self.latest.clone()
    }
}

impl Drop for StatsPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}
