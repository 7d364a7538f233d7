//! Background processing workers
//!
//! A fixed number of workers consume a bounded job queue. Each job moves
//! its task PENDING → PROCESSING, runs the report pipeline on the blocking
//! thread pool, then records COMPLETED or FAILED. A panic inside the
//! pipeline is caught and recorded as a failure; the worker keeps running.
//!
//! Shutdown signals the workers to stop taking new jobs and waits (with a
//! timeout) for in-flight jobs. Jobs still queued stay PENDING.

use rowcheck_common::config::WorkerSettings;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::services::pipeline::ReportPipeline;
use crate::store::TaskStore;

/// Default time allowed for in-flight jobs at shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// One unit of work: process the stored upload of a task
#[derive(Debug, Clone)]
pub struct Job {
    pub task_id: Uuid,
    pub input_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Job queue is closed")]
    Closed,
}

/// Submission handle onto the job queue
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sender: mpsc::Sender<Job>,
}

impl Dispatcher {
    /// Enqueue a job, waiting for room if the queue is full
    pub async fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        self.sender.send(job).await.map_err(|_| DispatchError::Closed)
    }
}

/// Fixed-size pool of processing workers
pub struct WorkerPool {
    dispatcher: Dispatcher,
    stop: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn workers on the current Tokio runtime
    pub fn start(
        settings: WorkerSettings,
        store: Arc<TaskStore>,
        pipeline: Arc<ReportPipeline>,
    ) -> Self {
        let worker_count = settings.worker_count.max(1);
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let (stop, _) = watch::channel(false);

        let handles = (0..worker_count)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let store = Arc::clone(&store);
                let pipeline = Arc::clone(&pipeline);
                let stop = stop.subscribe();
                tokio::spawn(worker_loop(worker_id, receiver, stop, store, pipeline))
            })
            .collect();

        info!(
            workers = worker_count,
            queue_capacity = settings.queue_capacity,
            "Worker pool started"
        );

        Self {
            dispatcher: Dispatcher { sender },
            stop,
            handles,
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Stop taking jobs and wait up to `timeout` in total for in-flight ones
    pub async fn shutdown(self, timeout: Duration) {
        info!("Shutting down worker pool");
        let _ = self.stop.send(true);
        join_workers(self.handles, timeout).await;
        info!("Worker pool shut down");
    }
}

/// Join worker handles against one shared deadline
async fn join_workers(handles: Vec<JoinHandle<()>>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    for (idx, handle) in handles.into_iter().enumerate() {
        match tokio::time::timeout_at(deadline, handle).await {
            Ok(Ok(())) => debug!("Worker {} stopped", idx),
            Ok(Err(e)) => error!("Worker {} join failed: {}", idx, e),
            Err(_) => warn!("Worker {} did not stop within {:?}", idx, timeout),
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    mut stop: watch::Receiver<bool>,
    store: Arc<TaskStore>,
    pipeline: Arc<ReportPipeline>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if *stop.borrow() {
            break;
        }

        let job = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;
                _ = stop.changed() => None,
                job = receiver.recv() => job,
            }
        };

        match job {
            Some(job) => run_job(worker_id, job, &store, &pipeline).await,
            None => break,
        }
    }

    debug!("Worker {} exiting", worker_id);
}

/// Drive one job through PROCESSING to a terminal state
pub async fn run_job(worker_id: usize, job: Job, store: &TaskStore, pipeline: &Arc<ReportPipeline>) {
    let task_id = job.task_id;

    match store.update(&task_id, |task| task.start_processing()).await {
        Some(Ok(_)) => {}
        Some(Err(e)) => {
            warn!(task_id = %task_id, "Skipping job: {}", e);
            return;
        }
        None => {
            warn!(task_id = %task_id, "Skipping job for unknown task");
            return;
        }
    }
    debug!(task_id = %task_id, worker = worker_id, "Task processing");

    let blocking_pipeline = Arc::clone(pipeline);
    let input_path = job.input_path;
    let outcome = tokio::task::spawn_blocking(move || {
        blocking_pipeline.process(task_id, &input_path)
    })
    .await;

    let result = match outcome {
        Ok(Ok(output)) => store
            .update(&task_id, |task| task.complete(output.processed_filename))
            .await,
        Ok(Err(e)) => {
            error!(task_id = %task_id, "Processing failed: {}", e);
            store.update(&task_id, |task| task.fail(e.to_string())).await
        }
        Err(e) => {
            error!(task_id = %task_id, "Processing aborted: {}", e);
            store
                .update(&task_id, |task| task.fail(format!("processing aborted: {}", e)))
                .await
        }
    };

    match result {
        Some(Ok(transition)) => {
            info!(task_id = %task_id, status = %transition.new_status, "Task finished")
        }
        Some(Err(e)) => warn!(task_id = %task_id, "Could not record outcome: {}", e),
        None => warn!(task_id = %task_id, "Task disappeared during processing"),
    }
}
