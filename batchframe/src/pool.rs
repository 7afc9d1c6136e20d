use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;
use snafu::Snafu;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError};

/// A unit of work for [`run_batch`]: a label for log lines and progress
/// reporting, and the job body itself. Consumed exactly once.
pub struct Task<T, E> {
    label: String,
    job: Box<dyn FnOnce() -> Result<T, E> + Send + 'static>,
}

impl<T, E> Task<T, E> {
    pub fn new<F>(label: impl Into<String>, job: F) -> Task<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        Task {
            label: label.into(),
            job: Box::new(job),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Why a task did not produce a value. A panic on the worker is contained
/// and reported like any other failure, so one task can never take the rest
/// of the batch down with it.
#[derive(Debug, Snafu)]
pub enum TaskError<E: std::error::Error + 'static> {
    #[snafu(display("task returned an error: {source}"))]
    Failed { source: E },
    #[snafu(display("task panicked: {message}"))]
    Panicked { message: String },
}

/// The terminal state of one submitted task.
#[derive(Debug)]
pub struct Outcome<T, E: std::error::Error + 'static> {
    pub label: String,
    pub result: Result<T, TaskError<E>>,
}

impl<T, E: std::error::Error + 'static> Outcome<T, E> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Worker count used when the caller does not ask for a specific one: the
/// host CPU count, at least 1.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Runs a batch of independent tasks and waits for all of them.
///
/// All tasks are submitted eagerly; a semaphore of `workers` permits caps
/// how many run at once, each on its own blocking worker with no shared
/// state. `on_done` fires once per task in completion order, which is
/// workload-dependent and carries no guarantee. The returned outcomes are in
/// submission order. A task that returns an error or panics still counts as
/// completed; there is no retry, no timeout and no cancellation.
pub async fn run_batch<T, E>(
    tasks: Vec<Task<T, E>>,
    workers: usize,
    mut on_done: impl FnMut(&Outcome<T, E>),
) -> Vec<Outcome<T, E>>
where
    T: Send + 'static,
    E: std::error::Error + Send + 'static,
{
    let total = tasks.len();
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut in_flight = FuturesUnordered::new();
    for (slot, task) in tasks.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        in_flight.push(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("batch semaphore closed");
            let Task { label, job } = task;
            let result = match task::spawn_blocking(job).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(source)) => Err(TaskError::Failed { source }),
                Err(join_error) => Err(TaskError::Panicked {
                    message: panic_message(join_error),
                }),
            };
            (slot, Outcome { label, result })
        });
    }

    let mut slots: Vec<Option<Outcome<T, E>>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);
    while let Some((slot, outcome)) = in_flight.next().await {
        debug!("task {} completed, ok={}", outcome.label, outcome.is_ok());
        on_done(&outcome);
        slots[slot] = Some(outcome);
    }
    // Every submitted future has yielded exactly once into its slot.
    slots.into_iter().flatten().collect()
}

fn panic_message(error: JoinError) -> String {
    if error.is_panic() {
        let payload = error.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        }
    } else {
        error.to_string()
    }
}
