use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Inactivity watchdog for the polling loop and the bulk screendump
/// collector.
///
/// A background task sleeps until the current deadline and then sets a
/// latching flag. [`rearm`](Self::rearm) pushes the deadline forward after
/// productive I/O; once the flag is set, re-arming has no effect. The main
/// control flow polls [`expired`](Self::expired) between I/O operations.
pub struct IdleTimer {
    period: Duration,
    expired: Arc<AtomicBool>,
    rearm_tx: watch::Sender<Instant>,
    task: JoinHandle<()>,
}

impl IdleTimer {
    pub fn new(period: Duration) -> Self {
        let expired = Arc::new(AtomicBool::new(false));
        let (rearm_tx, mut rearm_rx) = watch::channel(Instant::now() + period);
        let flag = Arc::clone(&expired);
        let task = tokio::spawn(async move {
            loop {
                let deadline = *rearm_rx.borrow_and_update();
                tokio::select! {
                    _ = time::sleep_until(deadline) => {
                        flag.store(true, Ordering::SeqCst);
                        return;
                    }
                    changed = rearm_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
        });
        Self {
            period,
            expired,
            rearm_tx,
            task,
        }
    }

    /// Restart the inactivity period from now.
    pub fn rearm(&self) {
        let _ = self.rearm_tx.send(Instant::now() + self.period);
    }

    pub fn expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expires_without_rearm() {
        let timer = IdleTimer::new(Duration::from_secs(2));
        assert!(!timer.expired());
        time::sleep(Duration::from_secs(3)).await;
        assert!(timer.expired());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_defers_expiry() {
        let timer = IdleTimer::new(Duration::from_secs(2));
        time::sleep(Duration::from_secs(1)).await;
        timer.rearm();
        time::sleep(Duration::from_secs(1)).await;
        // 2s after construction but only 1s after the rearm.
        assert!(!timer.expired());
        time::sleep(Duration::from_secs(2)).await;
        assert!(timer.expired());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_latches() {
        let timer = IdleTimer::new(Duration::from_secs(2));
        time::sleep(Duration::from_secs(3)).await;
        assert!(timer.expired());
        timer.rearm();
        time::sleep(Duration::from_millis(10)).await;
        assert!(timer.expired());
    }
}
