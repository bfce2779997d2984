use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};

use crate::error::TaskError;
use crate::thread_pool::builder::Builder;
use crate::thread_pool::handle::{self, TaskHandle};
use crate::thread_pool::ThreadPool;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct JobQueue {
    jobs: VecDeque<Job>,
    stopping: bool,
}

struct Shared {
    queue: Mutex<JobQueue>,
    job_available: Condvar,
    active: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, JobQueue> {
        // jobs never run under the lock, a poisoned guard still holds a valid queue
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A fixed set of worker threads fed from one FIFO queue.
///
/// Jobs are handed to workers in submission order. Dropping the pool (or
/// calling [`shutdown`](WorkerPool::shutdown)) lets the workers drain whatever
/// is still queued, then joins them.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    thread_count: usize,
}

impl WorkerPool {
    pub fn new(count: usize) -> Result<Self> {
        Builder::new().num_threads(count).build()
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    pub(crate) fn spawn_workers(builder: &Builder) -> Result<Self> {
        let count = builder.threads();
        let mut pool = WorkerPool {
            shared: Arc::new(Shared {
                queue: Mutex::new(JobQueue {
                    jobs: VecDeque::new(),
                    stopping: false,
                }),
                job_available: Condvar::new(),
                active: AtomicUsize::new(0),
            }),
            workers: Vec::with_capacity(count),
            thread_count: count,
        };

        for id in 0..count {
            let shared = Arc::clone(&pool.shared);
            let mut worker_thread =
                thread::Builder::new().name(format!("{}-{}", builder.name_prefix(), id));
            if let Some(size) = builder.stack_size_bytes() {
                worker_thread = worker_thread.stack_size(size);
            }
            // on error `pool` is dropped here, which stops and joins the workers spawned so far
            let worker = worker_thread
                .spawn(move || run_jobs(&shared))
                .with_context(|| format!("failed to spawn worker {}", id))?;
            pool.workers.push(worker);
        }

        log::debug!("started pool with {} workers", count);
        Ok(pool)
    }

    /// A panic inside `task` surfaces as [`TaskError::Panicked`]; the worker keeps running.
    pub fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (completer, handle) = handle::channel();
        self.push(Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(task)).map_err(|payload| {
                let err = TaskError::from_panic(payload);
                log::error!("job has error: {}", err);
                err
            });
            completer.complete(result);
        }));
        handle
    }

    fn push(&self, job: Job) {
        {
            let mut queue = self.shared.lock();
            queue.jobs.push_back(job);
            log::trace!("queued job, {} waiting", queue.jobs.len());
        }
        self.shared.job_available.notify_one();
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn active_count(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    pub fn queued_count(&self) -> usize {
        self.shared.lock().jobs.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queued_count() == 0 && self.active_count() == 0
    }

    /// Handles of dropped jobs resolve to [`TaskError::Cancelled`].
    pub fn clear_queue(&self) -> usize {
        let dropped = std::mem::take(&mut self.shared.lock().jobs);
        let count = dropped.len();
        // job destructors run outside the lock
        drop(dropped);
        if count > 0 {
            log::debug!("cleared {} queued jobs", count);
        }
        count
    }

    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.shared.lock().stopping = true;
        self.shared.job_available.notify_all();

        let current = thread::current().id();
        let mut dropped_on_worker = false;
        for worker in self.workers.drain(..) {
            // the last owner may go away inside a job, that worker drains and exits on its own
            if worker.thread().id() == current {
                dropped_on_worker = true;
                continue;
            }
            let name = worker.thread().name().unwrap_or("worker").to_owned();
            if worker.join().is_err() {
                log::error!("{} exited with a panic", name);
            }
        }

        if dropped_on_worker {
            return;
        }
        // only a pool without workers can still hold jobs here
        let leftover = self.clear_queue();
        if leftover > 0 {
            log::debug!("{} jobs never ran, pool has no workers", leftover);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("thread_count", &self.thread_count())
            .field("active_count", &self.active_count())
            .field("queued_count", &self.queued_count())
            .finish()
    }
}

impl ThreadPool for WorkerPool {
    fn new(num: u32) -> Result<Self> {
        WorkerPool::new(num as usize)
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let _ = self.submit(job);
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn run_jobs(shared: &Shared) {
    log::debug!("{} started", thread::current().name().unwrap_or("worker"));
    loop {
        let (job, guard) = {
            let mut queue = shared.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    // counted busy before the lock is released so that
                    // queued_count and active_count never both miss this job
                    shared.active.fetch_add(1, Ordering::SeqCst);
                    break (job, ActiveGuard(&shared.active));
                }
                if queue.stopping {
                    log::debug!("{} exiting", thread::current().name().unwrap_or("worker"));
                    return;
                }
                queue = shared
                    .job_available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        job();
        drop(guard);
    }
}
