//! Indexing worker pool
//!
//! A fixed set of named threads consuming one unbounded FIFO of files. The
//! pool can be stopped and started again: [`WorkerPool::stop`] lets workers
//! drain whatever is queued, then joins them, which is the barrier segment
//! rotation needs before flushing.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, trace, warn};
use zearch_core::{Error, Result};

use super::accumulator::Accumulator;
use crate::config::IndexConfig;
use crate::segment::SegmentWriter;

/// One file to index into one segment.
pub(crate) struct IndexJob {
    pub(crate) path: String,
    pub(crate) segment: Arc<SegmentWriter>,
}

struct PoolInner {
    queue: Mutex<VecDeque<IndexJob>>,
    work_ready: Condvar,
    stopping: AtomicBool,
    config: IndexConfig,
    indexed: AtomicU64,
    skipped: AtomicU64,
    failure: Mutex<Option<Error>>,
}

/// Restartable pool of indexing threads.
pub(crate) struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Vec<JoinHandle<()>>,
    num_threads: usize,
}

impl WorkerPool {
    /// Create a pool of `num_threads` workers. No thread runs until
    /// [`WorkerPool::start`].
    pub(crate) fn new(num_threads: usize, config: IndexConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                queue: Mutex::new(VecDeque::new()),
                work_ready: Condvar::new(),
                stopping: AtomicBool::new(false),
                config,
                indexed: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
                failure: Mutex::new(None),
            }),
            workers: Vec::with_capacity(num_threads),
            num_threads: num_threads.max(1),
        }
    }

    /// Spawn the worker threads, named `zearch-indexer-0`, `zearch-indexer-1`, ...
    pub(crate) fn start(&mut self) -> Result<()> {
        if !self.workers.is_empty() {
            return Err(Error::InvalidOperation(
                "indexing workers already running".into(),
            ));
        }
        self.inner.stopping.store(false, Ordering::Release);
        for i in 0..self.num_threads {
            let inner = Arc::clone(&self.inner);
            let handle = std::thread::Builder::new()
                .name(format!("zearch-indexer-{}", i))
                .spawn(move || worker_loop(&inner))?;
            self.workers.push(handle);
        }
        Ok(())
    }

    /// Queue a file.
    pub(crate) fn submit(&self, job: IndexJob) {
        self.inner.queue.lock().push_back(job);
        self.inner.work_ready.notify_one();
    }

    /// Let the workers finish the queue, then join them.
    pub(crate) fn stop(&mut self) {
        self.inner.stopping.store(true, Ordering::Release);
        // Notify under the queue lock so no worker misses the flag between
        // its check and its wait.
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!(target: "zearch::indexer", "Indexing worker exited abnormally");
            }
        }
    }

    /// First fatal error a worker hit since the last call, if any.
    pub(crate) fn take_failure(&self) -> Option<Error> {
        self.inner.failure.lock().take()
    }

    /// Files indexed so far.
    pub(crate) fn indexed(&self) -> u64 {
        self.inner.indexed.load(Ordering::Relaxed)
    }

    /// Files skipped so far.
    pub(crate) fn skipped(&self) -> u64 {
        self.inner.skipped.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    let mut acc = Accumulator::new(&inner.config);
    loop {
        let job = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    break job;
                }
                if inner.stopping.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let content = match std::fs::read(&job.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(target: "zearch::indexer", path = %job.path, error = %e, "Skipping unreadable file");
                inner.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            acc.add_content(&String::from_utf8_lossy(&content));
            acc.add_path(Path::new(&job.path));
            job.segment.add_document(&job.path, acc.terms())
        }));
        let terms = acc.len();
        acc.clear();

        match outcome {
            Ok(Ok(ordinal)) => {
                trace!(target: "zearch::indexer", path = %job.path, ordinal, terms, "Indexed file");
                inner.indexed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                error!(target: "zearch::indexer", path = %job.path, error = %e, "Failed to add document");
                inner.skipped.fetch_add(1, Ordering::Relaxed);
                inner.failure.lock().get_or_insert(e);
            }
            Err(panic) => {
                error!(
                    target: "zearch::indexer",
                    path = %job.path,
                    "Indexing panicked: {}",
                    panic
                        .downcast_ref::<&str>()
                        .copied()
                        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                        .unwrap_or("(non-string panic)")
                );
                inner.skipped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
