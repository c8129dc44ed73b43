//! Priority-ordered, bounded-concurrency background indexing queue.
//!
//! Jobs run in priority order (`High` before `Normal` before `Low`) and
//! FIFO within a priority tier. A background driver task, spawned once
//! when the queue is created, pops the next eligible job and dispatches
//! it as soon as a concurrency permit is free — grounded in the
//! teacher's actor-per-service pattern of spawning one long-lived task
//! driven by a channel, generalized here to a priority heap instead of an
//! mpsc channel since job order depends on more than arrival time.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use dashmap::DashMap;
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;

use crate::domain::types::{IndexingJob, JobPriority, JobStatus};
use crate::indexing::indexer::Indexer;

/// Maximum number of finished jobs retained for `recent_completions`.
/// Older entries are dropped on a FIFO basis once this is reached.
const COMPLETED_RING_CAPACITY: usize = 100;

struct QueuedEntry {
    priority: JobPriority,
    sequence: u64,
    job_id: String,
}

impl PartialEq for QueuedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl Eq for QueuedEntry {}

impl PartialOrd for QueuedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEntry {
    /// `BinaryHeap` is a max-heap; higher priority must compare greater,
    /// and within equal priority the lower (earlier) sequence number
    /// must compare greater so it pops first, preserving FIFO order.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct QueueState {
    heap: Mutex<BinaryHeap<QueuedEntry>>,
    jobs: DashMap<String, IndexingJob>,
    completed: Mutex<VecDeque<IndexingJob>>,
    notify: Notify,
    semaphore: Arc<Semaphore>,
    sequence: AtomicU64,
    indexer: Arc<Indexer>,
}

/// A priority queue of indexing jobs, run with bounded concurrency by a
/// background driver task.
#[derive(Clone)]
pub struct IndexingQueue {
    state: Arc<QueueState>,
}

impl IndexingQueue {
    /// Build a queue backed by `indexer`, running at most
    /// `max_concurrent` jobs at once, and spawn its driver task.
    pub fn new(indexer: Arc<Indexer>, max_concurrent: usize) -> Self {
        let state = Arc::new(QueueState {
            heap: Mutex::new(BinaryHeap::new()),
            jobs: DashMap::new(),
            completed: Mutex::new(VecDeque::with_capacity(COMPLETED_RING_CAPACITY)),
            notify: Notify::new(),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            sequence: AtomicU64::new(0),
            indexer,
        });

        let driver_state = state.clone();
        tokio::spawn(async move { Self::drive(driver_state).await });

        Self { state }
    }

    /// Submit a project to be indexed and return its job id.
    pub fn enqueue(&self, project: &str, root_path: &Path, priority: JobPriority) -> String {
        let job_id = Uuid::new_v4().to_string();
        let sequence = self.state.sequence.fetch_add(1, Ordering::Relaxed);

        self.state.jobs.insert(
            job_id.clone(),
            IndexingJob {
                id: job_id.clone(),
                project: project.to_string(),
                root_path: root_path.to_string_lossy().into_owned(),
                priority,
                status: JobStatus::Queued,
                submitted_at: SystemTime::now(),
            },
        );

        self.state.heap.lock().expect("queue mutex poisoned").push(QueuedEntry {
            priority,
            sequence,
            job_id: job_id.clone(),
        });
        self.state.notify.notify_one();

        job_id
    }

    /// Current state of a single job, by id.
    pub fn status(&self, job_id: &str) -> Option<IndexingJob> {
        self.state.jobs.get(job_id).map(|e| e.clone())
    }

    /// The most recent completed jobs, newest last, capped at
    /// [`COMPLETED_RING_CAPACITY`].
    pub fn recent_completions(&self) -> Vec<IndexingJob> {
        self.state
            .completed
            .lock()
            .expect("queue mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }

    async fn drive(state: Arc<QueueState>) {
        loop {
            let next = { state.heap.lock().expect("queue mutex poisoned").pop() };
            let Some(entry) = next else {
                state.notify.notified().await;
                continue;
            };

            let permit = state
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore is never closed");

            let task_state = state.clone();
            tokio::spawn(async move {
                let _permit = permit;
                Self::run_job(&task_state, &entry.job_id).await;
            });
        }
    }

    async fn run_job(state: &Arc<QueueState>, job_id: &str) {
        let Some(mut job) = state.jobs.get(job_id).map(|e| e.clone()) else {
            return;
        };
        job.status = JobStatus::Running;
        state.jobs.insert(job_id.to_string(), job.clone());

        let root_path = PathBuf::from(&job.root_path);
        let result = state.indexer.index(&job.project, &root_path).await;

        job.status = match result {
            Ok(outcome) => JobStatus::Completed {
                chunks_indexed: outcome.chunks_indexed,
            },
            Err(err) => JobStatus::Failed {
                message: err.to_string(),
            },
        };
        state.jobs.insert(job_id.to_string(), job.clone());

        let mut completed = state.completed.lock().expect("queue mutex poisoned");
        if completed.len() == COMPLETED_RING_CAPACITY {
            completed.pop_front();
        }
        completed.push_back(job);
    }
}
