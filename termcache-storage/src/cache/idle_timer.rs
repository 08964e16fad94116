//! Single-shot restartable timer used to clear the whole cache after a period
//! without match-object lookups.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// Holds at most one scheduled action. Restarting cancels the previous
/// schedule; dropping the timer cancels whatever is pending.
#[derive(Debug, Default)]
pub struct IdleTimer {
    handle: Option<JoinHandle<()>>,
}

impl IdleTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `action` to run once `delay` elapses without another restart.
    /// Must be called from within a tokio runtime.
    pub fn restart<F>(&mut self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            sleep(delay).await;
            action.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether an action is scheduled and has not yet run.
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_action(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = IdleTimer::new();
        timer.restart(Duration::from_millis(100), counting_action(&fired));
        assert!(timer.is_armed());

        sleep(Duration::from_millis(99)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_postpones() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = IdleTimer::new();
        timer.restart(Duration::from_millis(100), counting_action(&fired));

        sleep(Duration::from_millis(60)).await;
        timer.restart(Duration::from_millis(100), counting_action(&fired));

        sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(41)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = IdleTimer::new();
        timer.restart(Duration::from_millis(10), counting_action(&fired));
        drop(timer);

        sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
