use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// A cancellable delayed task. At most one is pending at a time:
/// scheduling again cancels the previous one.
///
/// Only the delay can be cancelled. Once the delay has elapsed the task runs
/// on its own and is never aborted by `schedule`, `cancel` or drop.
#[derive(Default)]
pub struct DelayedTask {
    timer: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicUsize>,
}

struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DelayedTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` unless cancelled or rescheduled first.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let running = self.running.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            running.fetch_add(1, Ordering::SeqCst);
            let guard = RunningGuard(running);
            tokio::spawn(async move {
                let _guard = guard;
                task.await;
            });
        });

        if let Ok(mut slot) = self.timer.lock() {
            if let Some(previous) = slot.replace(timer) {
                previous.abort();
            }
        }
    }

    /// Drop the pending task if its delay has not elapsed yet.
    pub fn cancel(&self) {
        if let Ok(mut slot) = self.timer.lock() {
            if let Some(previous) = slot.take() {
                previous.abort();
            }
        }
    }

    /// True while a scheduled task is waiting or running.
    pub fn is_pending(&self) -> bool {
        let waiting = self
            .timer
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false);
        waiting || self.running.load(Ordering::SeqCst) > 0
    }
}

impl Drop for DelayedTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_restarts_timer() {
        let task = DelayedTask::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for value in 1..=5 {
            let fired = fired.clone();
            task.schedule(Duration::from_millis(100), async move {
                fired.store(value, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(task.is_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let task = DelayedTask::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        task.schedule(Duration::from_millis(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        task.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!task.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_started_task_survives_reschedule_and_cancel() {
        let task = DelayedTask::new();
        let finished = Arc::new(AtomicUsize::new(0));

        let counter = finished.clone();
        task.schedule(Duration::from_millis(10), async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(task.is_pending());

        task.schedule(Duration::from_secs(60), async {});
        task.cancel();
        assert!(task.is_pending());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(!task.is_pending());
    }
}
