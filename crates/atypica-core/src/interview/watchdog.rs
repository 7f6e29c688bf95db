use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::store::SessionId;

/// Wall-clock guard for one run. Samples elapsed time every `tick` and
/// cancels `target` once it exceeds `timeout`.
pub struct Watchdog {
    handle: JoinHandle<()>,
    stop: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl Watchdog {
    pub fn spawn(
        session_id: SessionId,
        timeout: Duration,
        tick: Duration,
        target: CancellationToken,
    ) -> Self {
        let stop = CancellationToken::new();
        let fired = Arc::new(AtomicBool::new(false));
        let start = Instant::now();

        let handle = tokio::spawn({
            let stop = stop.clone();
            let fired = fired.clone();
            async move {
                let mut interval = tokio::time::interval(tick);
                loop {
                    tokio::select! {
                        biased;
                        () = stop.cancelled() => break,
                        () = target.cancelled() => break,
                        _ = interval.tick() => {
                            let elapsed = start.elapsed();
                            if elapsed > timeout {
                                warn!(
                                    target: "interview::watchdog",
                                    %session_id,
                                    elapsed_secs = elapsed.as_secs(),
                                    "Interview timeout"
                                );
                                fired.store(true, Ordering::SeqCst);
                                target.cancel();
                                break;
                            }
                            debug!(
                                target: "interview::watchdog",
                                %session_id,
                                "Interview is ongoing, {} seconds",
                                elapsed.as_secs()
                            );
                        }
                    }
                }
            }
        });

        Self {
            handle,
            stop,
            fired,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Stop sampling and report whether the timeout was hit.
    pub async fn finish(mut self) -> bool {
        self.stop.cancel();
        let _ = (&mut self.handle).await;
        self.has_fired()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_the_ceiling() {
        let target = CancellationToken::new();
        let watchdog = Watchdog::spawn(
            SessionId(1),
            Duration::from_secs(600),
            Duration::from_secs(5),
            target.clone(),
        );

        tokio::time::sleep(Duration::from_secs(599)).await;
        assert!(!target.is_cancelled());

        target.cancelled().await;
        assert!(watchdog.finish().await);
    }

    #[tokio::test(start_paused = true)]
    async fn finishing_early_does_not_fire() {
        let target = CancellationToken::new();
        let watchdog = Watchdog::spawn(
            SessionId(1),
            Duration::from_secs(600),
            Duration::from_secs(5),
            target.clone(),
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!watchdog.finish().await);
        assert!(!target.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn outside_cancellation_stops_sampling() {
        let target = CancellationToken::new();
        let watchdog = Watchdog::spawn(
            SessionId(1),
            Duration::from_secs(600),
            Duration::from_secs(5),
            target.clone(),
        );

        target.cancel();
        assert!(!watchdog.finish().await);
    }
}
