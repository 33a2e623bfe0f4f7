//! Per-subject population workers
//!
//! Each captured subject gets one worker task, created on first use and
//! reused until released:
//! - Jobs for one subject run one at a time, in submission order
//! - Jobs run on the blocking pool, off the instrumented call's thread
//! - Distinct subjects run independently
//!
//! Callers wait for a job's answer only up to a budget.

use crate::error::CaptureError;
use dashmap::DashMap;
use snaptest_values::{ObjectId, TypeRef};
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Queue depth of one worker
const QUEUE_DEPTH: usize = 64;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// What a capture is about: the receiver instance, or the declaring class
/// of a call without one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    /// Receiver object
    Instance(ObjectId),
    /// Declaring class
    Class(String),
}

impl Subject {
    /// Subject of a call on `receiver`, or of a call declared by `declaring`
    #[must_use]
    pub fn of(receiver: Option<ObjectId>, declaring: &TypeRef) -> Self {
        match receiver {
            Some(id) => Self::Instance(id),
            None => Self::Class(declaring.erasure().to_string()),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(id) => write!(f, "object {id}"),
            Self::Class(name) => write!(f, "class {name}"),
        }
    }
}

/// Handle to a worker's queue
#[derive(Debug, Clone)]
struct WorkerHandle {
    sender: mpsc::Sender<Job>,
}

/// Worker registry keyed by subject
#[derive(Debug, Default)]
pub struct Sequencer {
    workers: DashMap<Subject, WorkerHandle>,
}

impl Sequencer {
    /// Create an empty sequencer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `job` behind earlier jobs of `subject`
    ///
    /// Must be called within a tokio runtime. The returned receiver yields
    /// the job's result once it has run.
    ///
    /// # Errors
    /// Returns [`CaptureError::Cancelled`] if the worker is gone.
    pub async fn submit<T, F>(&self, subject: &Subject, job: F) -> Result<oneshot::Receiver<T>, CaptureError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let _ = tx.send(job());
        });
        let worker = self.worker(subject);
        worker.sender.send(job).await.map_err(|_| {
            self.workers.remove(subject);
            CaptureError::Cancelled
        })?;
        Ok(rx)
    }

    /// Run `job` on the subject's worker, waiting at most `budget`
    ///
    /// On timeout the job is not interrupted; its result is dropped.
    ///
    /// # Errors
    /// Returns [`CaptureError::PopulationTimeout`] when the budget runs out
    /// and [`CaptureError::Cancelled`] if the job never answers.
    pub async fn run<T, F>(&self, subject: &Subject, budget: Duration, job: F) -> Result<T, CaptureError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let rx = self.submit(subject, job).await?;
        match tokio::time::timeout(budget, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(CaptureError::Cancelled),
            Err(_) => Err(CaptureError::PopulationTimeout {
                ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// Drop the subject's worker once its queued jobs have run
    pub fn release(&self, subject: &Subject) -> bool {
        let released = self.workers.remove(subject).is_some();
        if released {
            tracing::debug!(%subject, "released population worker");
        }
        released
    }

    /// Release every worker
    pub fn release_all(&self) {
        self.workers.clear();
    }

    /// Number of live workers
    #[inline]
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Check if `subject` has a worker
    #[inline]
    #[must_use]
    pub fn has_worker(&self, subject: &Subject) -> bool {
        self.workers.contains_key(subject)
    }

    fn worker(&self, subject: &Subject) -> WorkerHandle {
        self.workers
            .entry(subject.clone())
            .or_insert_with(|| {
                let (sender, receiver) = mpsc::channel(QUEUE_DEPTH);
                tokio::spawn(worker_task(subject.clone(), receiver));
                tracing::debug!(%subject, "started population worker");
                WorkerHandle { sender }
            })
            .clone()
    }
}

/// Worker loop (runs in its own tokio task)
async fn worker_task(subject: Subject, mut receiver: mpsc::Receiver<Job>) {
    while let Some(job) = receiver.recv().await {
        if let Err(err) = tokio::task::spawn_blocking(job).await {
            tracing::warn!(%subject, error = %err, "population job panicked");
        }
    }
    tracing::debug!(%subject, "population worker stopped");
}
