//! Concurrent fan-out of per-item batch work
//!
//! Every batch operation spawns one task per input item, optionally bounded by
//! a semaphore and a per-item deadline, and joins all of them before
//! returning. Results are written into positional slots so `results[i]`
//! always corresponds to `items[i]`, regardless of completion order.
//!
//! A worker that panics, times out or is cancelled does not fail the batch.
//! It is converted into an item result through the caller-supplied failure
//! constructor.
//!
//! Directory calls issued from inside a batch item draw from a second pool of
//! the same size, so an item holding a batch permit never waits on another
//! batch permit.

use crate::ClientConfig;
use crate::error::ErrorKind;
use crate::progress::{NullProvider, ProgressProvider, ProgressUpdate};
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinError;

/// A per-item batch result that knows whether it succeeded
pub trait BatchItem {
    fn is_success(&self) -> bool;
}

/// Failure of the fan-out machinery for one item
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("worker was cancelled before completing")]
    Cancelled,
}

impl WorkerFailure {
    /// Worker failures are never attributable to the remote entity
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::TransientOrUnknown
    }

    pub(crate) fn from_join_error(err: JoinError) -> Self {
        if !err.is_panic() {
            return Self::Cancelled;
        }
        let payload = err.into_panic();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

/// Runs one task per item and collects positional results
#[derive(Clone)]
pub struct BatchRunner {
    limit: Option<usize>,
    semaphore: Option<Arc<Semaphore>>,
    calls: Option<Arc<Semaphore>>,
    timeout: Option<Duration>,
    progress: Arc<dyn ProgressProvider>,
}

impl std::fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner")
            .field("max_concurrency", &self.limit)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BatchRunner {
    /// Create a runner from client configuration
    ///
    /// `max_concurrency` of `None` (or zero) leaves the fan-out unbounded.
    pub fn new(config: &ClientConfig) -> Self {
        let limit = config.max_concurrency.filter(|&n| n > 0);
        let semaphore = limit.map(|n| Arc::new(Semaphore::new(n)));
        let calls = limit.map(|n| Arc::new(Semaphore::new(n)));
        let timeout = config
            .operation_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);

        Self {
            limit,
            semaphore,
            calls,
            timeout,
            progress: Arc::new(NullProvider),
        }
    }

    /// Report item completions to the given provider
    pub fn with_progress(mut self, progress: Arc<dyn ProgressProvider>) -> Self {
        self.progress = progress;
        self
    }

    /// Override the per-item deadline
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn progress(&self) -> &Arc<dyn ProgressProvider> {
        &self.progress
    }

    /// The pool bounding directory calls made inside one batch item
    pub(crate) fn call_permits(&self) -> Option<Arc<Semaphore>> {
        self.calls.clone()
    }

    /// Fan `items` out to one task each and join them all
    ///
    /// `label` names an item for progress and failure reporting, `work` builds
    /// the item's future and `on_failure` turns a [`WorkerFailure`] into the
    /// item's result. The returned vector has the same length and order as
    /// `items`.
    pub async fn run<I, R, L, F, Fut, E>(
        &self,
        operation: &str,
        items: Vec<I>,
        label: L,
        work: F,
        on_failure: E,
    ) -> Vec<R>
    where
        R: BatchItem + Send + 'static,
        L: Fn(&I) -> String,
        F: Fn(I) -> Fut,
        Fut: Future<Output = R> + Send + 'static,
        E: Fn(&str, WorkerFailure) -> R,
    {
        self.run_keyed(operation, items, label, work, |key: &String, failure| {
            on_failure(key, failure)
        })
        .await
    }

    /// Like [`run`](Self::run), but each item is identified by a typed key
    ///
    /// The key is displayed in logs and progress, and handed back to
    /// `on_failure` untouched.
    pub async fn run_keyed<I, K, R, L, F, Fut, E>(
        &self,
        operation: &str,
        items: Vec<I>,
        key: L,
        work: F,
        on_failure: E,
    ) -> Vec<R>
    where
        K: Display,
        R: BatchItem + Send + 'static,
        L: Fn(&I) -> K,
        F: Fn(I) -> Fut,
        Fut: Future<Output = R> + Send + 'static,
        E: Fn(&K, WorkerFailure) -> R,
    {
        let total = items.len();
        let keys: Vec<K> = items.iter().map(&key).collect();
        let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();

        log::debug!(
            "{operation}: fanning out {total} items (limit: {:?}, timeout: {:?})",
            self.limit,
            self.timeout
        );

        let mut workers = FuturesUnordered::new();
        for (index, item) in items.into_iter().enumerate() {
            let semaphore = self.semaphore.clone();
            let timeout = self.timeout;
            let task = work(item);

            let handle = tokio::spawn(async move {
                // The deadline starts once the permit is granted
                let _permit = acquire(semaphore).await?;

                match timeout {
                    Some(limit) => tokio::time::timeout(limit, task)
                        .await
                        .map_err(|_| WorkerFailure::TimedOut(limit)),
                    None => Ok(task.await),
                }
            });

            workers.push(async move { (index, handle.await) });
        }

        let mut completed = 0usize;
        while let Some((index, joined)) = workers.next().await {
            let result = match joined {
                Ok(Ok(result)) => result,
                Ok(Err(failure)) => {
                    log::warn!("{operation}: item '{}' failed: {failure}", keys[index]);
                    on_failure(&keys[index], failure)
                }
                Err(join_error) => {
                    let failure = WorkerFailure::from_join_error(join_error);
                    log::warn!("{operation}: item '{}' failed: {failure}", keys[index]);
                    on_failure(&keys[index], failure)
                }
            };

            completed += 1;
            self.progress.report(ProgressUpdate::BatchProgress {
                operation: operation.to_string(),
                completed,
                total,
                item: Some(keys[index].to_string()),
                succeeded: result.is_success(),
            });
            slots[index] = Some(result);
        }

        log::debug!("{operation}: joined {completed}/{total} items");

        slots
            .into_iter()
            .zip(keys)
            .map(|(slot, key)| slot.unwrap_or_else(|| on_failure(&key, WorkerFailure::Cancelled)))
            .collect()
    }
}

/// Wait for a permit from an optional pool
pub(crate) async fn acquire(
    semaphore: Option<Arc<Semaphore>>,
) -> Result<Option<OwnedSemaphorePermit>, WorkerFailure> {
    match semaphore {
        Some(semaphore) => semaphore
            .acquire_owned()
            .await
            .map(Some)
            .map_err(|_| WorkerFailure::Cancelled),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    struct Outcome {
        label: String,
        success: bool,
        failure: Option<WorkerFailure>,
    }

    impl BatchItem for Outcome {
        fn is_success(&self) -> bool {
            self.success
        }
    }

    fn ok(label: &str) -> Outcome {
        Outcome {
            label: label.to_string(),
            success: true,
            failure: None,
        }
    }

    fn failed(label: &str, failure: WorkerFailure) -> Outcome {
        Outcome {
            label: label.to_string(),
            success: false,
            failure: Some(failure),
        }
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let runner = BatchRunner::new(&ClientConfig::default());
        // Later items finish first
        let items: Vec<(String, u64)> = (0..8).map(|i| (format!("item{i}"), 80 - i * 10)).collect();

        let results = runner
            .run(
                "ordering",
                items,
                |(name, _)| name.clone(),
                |(name, delay)| async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    ok(&name)
                },
                failed,
            )
            .await;

        let labels: Vec<_> = results.iter().map(|r| r.label.clone()).collect();
        let expected: Vec<_> = (0..8).map(|i| format!("item{i}")).collect();
        assert_eq!(labels, expected);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let runner = BatchRunner::new(&ClientConfig::default());
        let results = runner
            .run(
                "empty",
                Vec::<String>::new(),
                |s| s.clone(),
                |s| async move { ok(&s) },
                failed,
            )
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_worker_is_isolated() {
        let runner = BatchRunner::new(&ClientConfig::default());
        let items = vec!["a".to_string(), "boom".to_string(), "c".to_string()];

        let results = runner
            .run(
                "panics",
                items,
                |s| s.clone(),
                |s| async move {
                    if s == "boom" {
                        panic!("remote client exploded");
                    }
                    ok(&s)
                },
                failed,
            )
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(results[2].success);
        assert_eq!(results[1].label, "boom");
        assert_eq!(
            results[1].failure,
            Some(WorkerFailure::Panicked("remote client exploded".to_string()))
        );
    }

    #[tokio::test]
    async fn test_hung_worker_times_out() {
        let runner = BatchRunner::new(&ClientConfig::default())
            .with_timeout(Some(Duration::from_millis(50)));
        let items = vec!["fast".to_string(), "hung".to_string()];

        let start = Instant::now();
        let results = runner
            .run(
                "timeouts",
                items,
                |s| s.clone(),
                |s| async move {
                    if s == "hung" {
                        futures::future::pending::<()>().await;
                    }
                    ok(&s)
                },
                failed,
            )
            .await;

        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(results[0].success);
        assert_eq!(
            results[1].failure,
            Some(WorkerFailure::TimedOut(Duration::from_millis(50)))
        );
    }

    #[tokio::test]
    async fn test_semaphore_bounds_concurrency() {
        let config = ClientConfig {
            max_concurrency: Some(2),
            ..ClientConfig::default()
        };
        let runner = BatchRunner::new(&config);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = runner
            .run(
                "bounded",
                (0..10).map(|i| i.to_string()).collect(),
                |s| s.clone(),
                |s| {
                    let active = active.clone();
                    let peak = peak.clone();
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        ok(&s)
                    }
                },
                failed,
            )
            .await;

        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| r.success));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_progress_reports_every_item() {
        use std::sync::Mutex;

        struct Recorder(Mutex<Vec<ProgressUpdate>>);

        impl ProgressProvider for Recorder {
            fn report(&self, update: ProgressUpdate) {
                self.0.lock().unwrap().push(update);
            }
            fn complete(&self) {}
        }

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let runner = BatchRunner::new(&ClientConfig::default()).with_progress(recorder.clone());

        runner
            .run(
                "progress",
                vec!["x".to_string(), "y".to_string()],
                |s| s.clone(),
                |s| async move { ok(&s) },
                failed,
            )
            .await;

        let updates = recorder.0.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert!(matches!(
            updates.last(),
            Some(ProgressUpdate::BatchProgress {
                completed: 2,
                total: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_keyed_failure_gets_its_own_key() {
        #[derive(Debug, Clone, PartialEq)]
        struct Pair(String, String);

        impl Display for Pair {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} <- {}", self.0, self.1)
            }
        }

        let runner = BatchRunner::new(&ClientConfig::default());
        // Both pairs display as "a <- b <- c"
        let items = vec![
            Pair("a <- b".to_string(), "c".to_string()),
            Pair("a".to_string(), "b <- c".to_string()),
        ];

        let results = runner
            .run_keyed(
                "keyed",
                items,
                |pair| pair.clone(),
                |pair| async move {
                    if !pair.0.is_empty() {
                        panic!("lost connection");
                    }
                    ok(&pair.1)
                },
                |pair: &Pair, failure| failed(&format!("{}|{}", pair.0, pair.1), failure),
            )
            .await;

        assert_eq!(results[0].label, "a <- b|c");
        assert_eq!(results[1].label, "a|b <- c");
        assert!(matches!(results[1].failure, Some(WorkerFailure::Panicked(_))));
    }

    #[test]
    fn test_call_pool_matches_batch_limit() {
        let unbounded = BatchRunner::new(&ClientConfig::default());
        assert!(unbounded.call_permits().is_none());

        let config = ClientConfig {
            max_concurrency: Some(3),
            ..ClientConfig::default()
        };
        let runner = BatchRunner::new(&config);
        let calls = runner.call_permits().unwrap();
        assert_eq!(calls.available_permits(), 3);
        assert!(!Arc::ptr_eq(&calls, runner.semaphore.as_ref().unwrap()));
    }

    #[test]
    fn test_worker_failure_kind() {
        assert_eq!(WorkerFailure::Cancelled.kind(), ErrorKind::TransientOrUnknown);
        assert!(
            WorkerFailure::TimedOut(Duration::from_secs(3))
                .to_string()
                .contains("timed out")
        );
    }
}
