/// Fixed-size worker pool over bounded channels
///
/// `WorkerPool::start` spawns N workers that pull jobs from a shared bounded
/// queue and push results into a results channel. The results channel closes
/// on its own once every worker has exited, so callers drain it with a plain
/// `while let Some(..) = results.recv().await` loop. A detached coordination
/// task joins the workers and surfaces panics in the log.
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

/// Sending and receiving ends of a running pool
pub struct PoolHandle<J, R> {
    /// Queue jobs here; drop (or let the feeder task drop) to signal no more
    pub jobs: mpsc::Sender<J>,

    /// Results arrive here in completion order, not submission order
    pub results: mpsc::Receiver<R>,
}

pub struct WorkerPool;

impl WorkerPool {
    /// Starts `workers` tasks that each run `worker_fn` on jobs from the
    /// shared queue
    ///
    /// Channel capacity equals the worker count, so a caller that keeps at
    /// most `workers` jobs outstanding never blocks on send. Callers feeding
    /// unbounded job lists should send from a separate task while draining
    /// results.
    pub fn start<J, R, F, Fut>(workers: usize, worker_fn: F) -> PoolHandle<J, R>
    where
        J: Send + 'static,
        R: Send + 'static,
        F: Fn(J) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let capacity = workers.max(1);
        let (job_tx, job_rx) = mpsc::channel::<J>(capacity);
        let (result_tx, result_rx) = mpsc::channel::<R>(capacity);

        let shared_rx = Arc::new(Mutex::new(job_rx));
        let mut handles = Vec::with_capacity(capacity);

        for worker_id in 0..capacity {
            let rx = Arc::clone(&shared_rx);
            let tx = result_tx.clone();
            let work = worker_fn.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else { break };

                    let result = work(job).await;
                    if tx.send(result).await.is_err() {
                        break;
                    }
                }
                tracing::debug!(worker_id, "worker finished");
            }));
        }

        // The spawned workers hold the only result senders; joining them here
        // keeps panics visible without blocking the caller.
        drop(result_tx);
        tokio::spawn(async move {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!("worker task failed: {}", e);
                }
            }
        });

        PoolHandle {
            jobs: job_tx,
            results: result_rx,
        }
    }
}
