use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, TryRecvError},
    },
    thread,
    time::{Duration, Instant},
};

use crate::api::FetchError;

pub type FetchOutcome<T> = Result<T, FetchError>;

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Bails out of a worker before it starts another request.
    pub fn check(&self) -> Result<(), FetchError> {
        if self.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A request cycle running on a worker thread.
///
/// Dropping the job cancels it; a cancelled worker never delivers its result.
pub struct PendingJob<T> {
    receiver: Receiver<FetchOutcome<T>>,
    token: CancelToken,
}

impl<T: Send + 'static> PendingJob<T> {
    pub fn spawn<F>(label: &'static str, work: F) -> Self
    where
        F: FnOnce(&CancelToken) -> FetchOutcome<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let token = CancelToken::new();
        let worker_token = token.clone();
        thread::spawn(move || {
            let outcome = work(&worker_token);
            if worker_token.is_cancelled() {
                log::debug!("Discarding result of cancelled {label} job");
                return;
            }
            let _ = tx.send(outcome);
        });
        Self {
            receiver: rx,
            token,
        }
    }

    pub fn try_take(&self) -> Option<FetchOutcome<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(FetchError::BackgroundWorkerGone)),
        }
    }

    #[cfg(test)]
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

impl<T> Drop for PendingJob<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Exponential stretch of the poll interval after failed cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    pub max_interval: Duration,
}

/// Decides when the next automatic query is due.
pub struct PollScheduler {
    interval: Duration,
    backoff: Option<Backoff>,
    last_run: Option<Instant>,
    consecutive_failures: u32,
}

impl PollScheduler {
    pub fn new(interval: Duration, backoff: Option<Backoff>) -> Self {
        Self {
            interval,
            backoff,
            last_run: None,
            consecutive_failures: 0,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(instant) => now.saturating_duration_since(instant) >= self.current_interval(),
        }
    }

    pub fn mark_triggered(&mut self, now: Instant) {
        self.last_run = Some(now);
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn current_interval(&self) -> Duration {
        let Some(backoff) = self.backoff else {
            return self.interval;
        };
        // 2^16 already dwarfs any sensible cap.
        let factor = 1u32 << self.consecutive_failures.min(16);
        self.interval
            .saturating_mul(factor)
            .min(backoff.max_interval.max(self.interval))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::sync_channel;

    use super::*;

    fn wait_for<T: Send + 'static>(job: &PendingJob<T>) -> FetchOutcome<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(outcome) = job.try_take() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "job did not finish in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn job_delivers_worker_result() {
        let job = PendingJob::spawn("test", |_| Ok(21 * 2));
        assert_eq!(wait_for(&job).expect("result"), 42);
    }

    #[test]
    fn dropping_a_job_cancels_its_token() {
        let (release_tx, release_rx) = sync_channel::<()>(0);
        let job = PendingJob::spawn("test", move |token| {
            let _ = release_rx.recv();
            token.check()?;
            Ok(())
        });
        let token = job.token();
        assert!(!token.is_cancelled());
        drop(job);
        assert!(token.is_cancelled());
        let _ = release_tx.send(());
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(matches!(token.check(), Err(FetchError::Cancelled)));
    }

    #[test]
    fn scheduler_waits_for_full_interval() {
        let start = Instant::now();
        let mut scheduler = PollScheduler::new(Duration::from_secs(30), None);
        assert!(scheduler.is_due(start));
        scheduler.mark_triggered(start);
        assert!(!scheduler.is_due(start + Duration::from_secs(29)));
        assert!(scheduler.is_due(start + Duration::from_secs(30)));
    }

    #[test]
    fn scheduler_without_backoff_ignores_failures() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(30), None);
        scheduler.record_failure();
        scheduler.record_failure();
        assert_eq!(scheduler.current_interval(), Duration::from_secs(30));
    }

    #[test]
    fn backoff_doubles_until_cap_and_resets() {
        let mut scheduler = PollScheduler::new(
            Duration::from_secs(30),
            Some(Backoff {
                max_interval: Duration::from_secs(100),
            }),
        );
        scheduler.record_failure();
        assert_eq!(scheduler.current_interval(), Duration::from_secs(60));
        scheduler.record_failure();
        assert_eq!(scheduler.current_interval(), Duration::from_secs(100));
        for _ in 0..40 {
            scheduler.record_failure();
        }
        assert_eq!(scheduler.current_interval(), Duration::from_secs(100));
        scheduler.record_success();
        assert_eq!(scheduler.current_interval(), Duration::from_secs(30));
    }
}
