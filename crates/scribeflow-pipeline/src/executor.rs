//! Bounded fan-out executor.

use std::future::Future;
use std::sync::Arc;

use scribeflow_common::{Error, Result};
use tokio::sync::Semaphore;

/// Run `f` over every item with at most `limit` invocations in flight.
///
/// Each item runs in its own task and waits for a semaphore permit before
/// calling `f`. Results come back in input order regardless of completion
/// order. A failing or panicking item only produces its own `Err`; sibling
/// items are never cancelled. No retries happen here.
pub async fn run_all<T, O, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<Result<O>>
where
    T: Send + 'static,
    O: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    let limit = if limit == 0 {
        tracing::warn!("Concurrency limit of 0 requested; using 1");
        1
    } else {
        limit
    };

    let total = items.len();
    tracing::info!("Running {total} item(s) with concurrency {limit}");

    let semaphore = Arc::new(Semaphore::new(limit));
    let f = Arc::new(f);
    let mut handles = Vec::with_capacity(total);

    for item in items {
        let sem = Arc::clone(&semaphore);
        let f = Arc::clone(&f);
        handles.push(tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|e| Error::Internal(format!("semaphore closed: {e}")))?;
            f(item).await
        }));
    }

    let mut results = Vec::with_capacity(total);
    for (i, handle) in handles.into_iter().enumerate() {
        let result = match handle.await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Item {i} task failed: {e}");
                Err(Error::Internal(format!("task join error: {e}")))
            }
        };
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records how many invocations are running at once.
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_limit() {
        let gauge = Arc::new(Gauge::default());
        let g = Arc::clone(&gauge);

        let results = run_all((0..20).collect(), 3, move |i: u64| {
            let g = Arc::clone(&g);
            async move {
                g.enter();
                tokio::time::sleep(Duration::from_millis(5 + (i % 4) * 3)).await;
                g.exit();
                Ok(i)
            }
        })
        .await;

        assert_eq!(results.len(), 20);
        assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn preserves_input_order() {
        // Earlier items sleep longer so they finish last.
        let results = run_all(vec![40u64, 30, 20, 10, 0], 5, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(ms)
        })
        .await;

        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![40, 30, 20, 10, 0]);
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let results = run_all(vec![1, 2, 3, 4], 2, |i: i32| async move {
            if i % 2 == 0 {
                Err(Error::transient(format!("item {i} failed")))
            } else {
                Ok(i * 10)
            }
        })
        .await;

        assert_eq!(results[0].as_ref().unwrap(), &10);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap(), &30);
        assert!(results[3].is_err());
    }

    #[tokio::test]
    async fn panic_is_captured_as_item_failure() {
        let results = run_all(vec![0, 1, 2], 1, |i: i32| async move {
            if i == 1 {
                panic!("boom");
            }
            Ok(i)
        })
        .await;

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Internal(_))));
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn zero_limit_is_clamped() {
        let results = run_all(vec![1, 2], 0, |i: i32| async move { Ok(i) }).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn empty_input_returns_empty() {
        let results: Vec<Result<i32>> = run_all(Vec::<i32>::new(), 2, |i| async move { Ok(i) }).await;
        assert!(results.is_empty());
    }
}
