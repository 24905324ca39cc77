//! # Ancestor propagation
//!
//! After a comment is stored, every ancestor up to the root post gets its
//! `updatedAt` set to the comment's timestamp. [`AncestorWalk`] performs
//! one walk; [`Propagator`] decides when it runs:
//!
//! - inline: the walk completes before the write is acknowledged and its
//!   failure is the caller's failure;
//! - background: jobs go onto a bounded `mpsc` queue drained by one worker
//!   task. Failed walks are retried with linear backoff, and the outcome of
//!   every job is counted in [`PropagationSnapshot`]. Submitting never
//!   waits: a job that finds the queue full or closed is dropped and
//!   counted. The caller never sees a background failure.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use domains::{CommentRepository, DomainError, DomainResult, PostRepository, Timestamp};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// One unit of propagation: start at `start` (the new comment's parent)
/// and stamp `at` on it and every ancestor above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationJob {
    pub start: Uuid,
    pub at: Timestamp,
}

pub struct AncestorWalk {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl AncestorWalk {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    /// Stamps every level from `job.start` to the root post. Returns the
    /// number of documents touched.
    ///
    /// Fails with `NotFound` when the chain ends at an id that is neither
    /// a comment nor a post, and with `Conflict` when it loops.
    #[instrument(skip(self), fields(start = %job.start))]
    pub async fn run(&self, job: PropagationJob) -> DomainResult<usize> {
        let mut visited = HashSet::new();
        let mut current = job.start;

        loop {
            if !visited.insert(current) {
                return Err(DomainError::Conflict(format!(
                    "ancestor chain of {} loops at {current}",
                    job.start
                )));
            }

            if let Some(comment) = self.comments.get_comment(current).await? {
                self.comments.touch_comment(current, job.at).await?;
                current = comment.parent_id;
                continue;
            }

            if self.posts.touch_post(current, job.at).await? {
                debug!(levels = visited.len(), "ancestor chain stamped");
                return Ok(visited.len());
            }
            return Err(DomainError::not_found("post", current));
        }
    }
}

/// Retry and sizing knobs for the background queue.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Default)]
struct PropagationStats {
    completed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of the propagation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationSnapshot {
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
    /// Jobs never queued because the queue was full or closed.
    pub dropped: u64,
}

impl PropagationStats {
    fn snapshot(&self) -> PropagationSnapshot {
        PropagationSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone)]
enum Dispatch {
    Inline(Arc<AncestorWalk>),
    Queue(mpsc::Sender<PropagationJob>),
}

/// Handle the write path uses to schedule propagation. Cheap to clone.
#[derive(Clone)]
pub struct Propagator {
    dispatch: Dispatch,
    stats: Arc<PropagationStats>,
}

impl Propagator {
    pub fn inline(walk: Arc<AncestorWalk>) -> Self {
        Self {
            dispatch: Dispatch::Inline(walk),
            stats: Arc::default(),
        }
    }

    /// Spawns the queue worker on the current runtime.
    pub fn background(walk: Arc<AncestorWalk>, policy: RetryPolicy) -> (Self, PropagationWorker) {
        let (tx, rx) = mpsc::channel(policy.queue_capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let stats = Arc::new(PropagationStats::default());

        let worker = QueueWorker {
            walk,
            policy,
            stats: Arc::clone(&stats),
        };
        let handle = tokio::spawn(worker.run(rx, stop_rx));

        let propagator = Self {
            dispatch: Dispatch::Queue(tx),
            stats,
        };
        (propagator, PropagationWorker { handle, stop: stop_tx })
    }

    pub fn is_background(&self) -> bool {
        matches!(self.dispatch, Dispatch::Queue(_))
    }

    /// Inline: runs the walk and returns its outcome. Background: enqueues
    /// without waiting and returns `Ok` even when the job had to be dropped.
    pub async fn submit(&self, job: PropagationJob) -> DomainResult<()> {
        match &self.dispatch {
            Dispatch::Inline(walk) => match walk.run(job).await {
                Ok(_) => {
                    self.stats.completed.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                Err(err) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    Err(err)
                }
            },
            Dispatch::Queue(tx) => {
                match tx.try_send(job) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                        warn!(start = %job.start, "propagation queue full, job dropped");
                    }
                    Err(TrySendError::Closed(_)) => {
                        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                        warn!(start = %job.start, "propagation queue closed, job dropped");
                    }
                }
                Ok(())
            }
        }
    }

    pub fn stats(&self) -> PropagationSnapshot {
        self.stats.snapshot()
    }
}

/// Owner of the background worker task. Dropping it leaves the worker
/// running until every `Propagator` clone is gone.
pub struct PropagationWorker {
    handle: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

impl PropagationWorker {
    /// Closes the queue to new jobs, then waits for the queued ones.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(err) = self.handle.await {
            error!(error = %err, "propagation worker terminated abnormally");
        }
    }
}

struct QueueWorker {
    walk: Arc<AncestorWalk>,
    policy: RetryPolicy,
    stats: Arc<PropagationStats>,
}

impl QueueWorker {
    async fn run(self, mut rx: mpsc::Receiver<PropagationJob>, mut stop: oneshot::Receiver<()>) {
        info!(capacity = self.policy.queue_capacity, "propagation worker started");

        // A dropped worker handle disarms the stop branch; the worker then
        // runs until every sender is gone.
        let mut stop_armed = true;
        loop {
            tokio::select! {
                job = rx.recv() => match job {
                    Some(job) => self.process(job).await,
                    None => break,
                },
                signal = &mut stop, if stop_armed => {
                    if signal.is_err() {
                        stop_armed = false;
                        continue;
                    }
                    rx.close();
                    while let Some(job) = rx.recv().await {
                        self.process(job).await;
                    }
                    break;
                }
            }
        }

        info!(stats = ?self.stats.snapshot(), "propagation worker stopped");
    }

    async fn process(&self, job: PropagationJob) {
        let mut attempt = 1;
        loop {
            match self.walk.run(job).await {
                Ok(_) => {
                    self.stats.completed.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(err) if is_retryable(&err) && attempt < self.policy.max_attempts => {
                    self.stats.retried.fetch_add(1, Ordering::Relaxed);
                    warn!(start = %job.start, attempt, error = %err, "propagation failed, retrying");
                    tokio::time::sleep(self.policy.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(start = %job.start, attempt, error = %err, "propagation abandoned");
                    return;
                }
            }
        }
    }
}

/// Store hiccups are worth another try; a broken chain is not.
fn is_retryable(err: &DomainError) -> bool {
    matches!(err, DomainError::Store(_) | DomainError::Timeout(_))
}
