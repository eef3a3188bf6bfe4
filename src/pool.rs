//! Bounded worker pools. Every task is submitted up front and results are
//! drained in completion order; there is no ordering contract between tasks.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{error, warn};

pub fn progress_bar(len: usize, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb.set_message(label.to_string());
    pb
}

/// Run async tasks with at most `workers` in flight. Returns once every task
/// has resolved; a task that panics contributes no result.
pub async fn run_unordered<T, R, F, Fut>(
    items: Vec<T>,
    workers: usize,
    pb: &ProgressBar,
    task: F,
) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let workers = workers.max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    let task = Arc::new(task);
    let (tx, mut rx) = tokio::sync::mpsc::channel::<R>(workers * 2);

    for item in items {
        let sem = Arc::clone(&semaphore);
        let task = Arc::clone(&task);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire_owned().await else {
                return;
            };
            let result = task(item).await;
            let _ = tx.send(result).await;
        });
    }

    // rx closes once every spawned task has dropped its sender
    drop(tx);

    let mut results = Vec::new();
    while let Some(result) = rx.recv().await {
        results.push(result);
        pb.inc(1);
    }
    results
}

/// Run blocking tasks on a dedicated rayon pool of `workers` threads, draining
/// results on the calling thread. A task that panics is logged and contributes
/// no result; the remaining tasks still run.
pub fn run_blocking_unordered<T, R, F>(
    items: Vec<T>,
    workers: usize,
    pb: &ProgressBar,
    task: F,
) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("claim-worker-{}", i))
        .build()?;
    let task = Arc::new(task);
    let (tx, rx) = std::sync::mpsc::channel::<R>();

    let submitted = items.len();
    for item in items {
        let task = Arc::clone(&task);
        let tx = tx.clone();
        pool.spawn(move || match panic::catch_unwind(AssertUnwindSafe(|| task(item))) {
            Ok(result) => {
                let _ = tx.send(result);
            }
            Err(payload) => error!("Worker task panicked: {}", panic_message(&*payload)),
        });
    }
    drop(tx);

    let results: Vec<R> = rx
        .iter()
        .inspect(|_| pb.inc(1))
        .collect();
    if results.len() < submitted {
        warn!(
            submitted,
            completed = results.len(),
            "Some tasks ended without a result"
        );
    }
    Ok(results)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
