use crate::{Error, Result};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Bounded set of inference slots with a per-request deadline.
///
/// The deadline covers both the wait for a slot and the model call. A job on
/// the blocking pool keeps its slot until it returns, even when the request
/// that started it has already timed out.
#[derive(Debug, Clone)]
pub struct InferencePool {
    name: &'static str,
    permits: Arc<Semaphore>,
    workers: usize,
    timeout: Duration,
}

impl InferencePool {
    pub fn new(name: &'static str, workers: usize, timeout: Duration) -> Self {
        Self {
            name,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            timeout,
        }
    }

    /// Slots not currently held by a running job.
    pub fn idle(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs a blocking job on tokio's blocking threads. A panic inside the job
    /// is reported as an inference error.
    pub async fn run_blocking<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let name = self.name;

        let work = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|_| Error::internal(format!("{} pool is closed", name)))?;

            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                job()
            })
            .await
            .map_err(|e| {
                if e.is_panic() {
                    Error::inference(format!("{} worker panicked", name))
                } else {
                    Error::inference(format!("{} worker was cancelled", name))
                }
            })?
        };

        self.with_deadline(work).await
    }

    /// Runs an async job while holding a slot.
    pub async fn run<T, Fut>(&self, job: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let work = async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| Error::internal(format!("{} pool is closed", self.name)))?;
            job.await
        };

        self.with_deadline(work).await
    }

    async fn with_deadline<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        debug!(
            "{} pool: {} of {} slots idle",
            self.name,
            self.idle(),
            self.workers
        );

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} request exceeded its {}s deadline",
                    self.name,
                    self.timeout.as_secs()
                );
                Err(Error::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}
