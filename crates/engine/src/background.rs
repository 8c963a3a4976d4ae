//! Background flush worker.
//!
//! Closed generations are encoded and written off the ingestion path. A
//! single worker thread runs submitted tasks in FIFO order, so blocks reach
//! disk in the order their generations were handed off.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::error;

/// Error returned when submitting to a scheduler that has shut down.
#[derive(Debug, thiserror::Error)]
#[error("flush scheduler has shut down")]
pub struct SchedulerClosed;

/// Scheduler metrics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks waiting in the queue.
    pub queue_depth: usize,
    /// Tasks currently running.
    pub active_tasks: usize,
    /// Tasks finished since creation, panicked ones included.
    pub tasks_completed: u64,
    /// Tasks that panicked.
    pub tasks_panicked: u64,
}

type Task = Box<dyn FnOnce() + Send>;

struct SchedulerInner {
    queue: Mutex<VecDeque<Task>>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    tasks_completed: AtomicU64,
    tasks_panicked: AtomicU64,
}

/// Single-threaded FIFO task runner.
pub struct FlushScheduler {
    inner: Arc<SchedulerInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl FlushScheduler {
    /// Start the worker thread, named `thread_name`.
    pub fn new(thread_name: &str) -> io::Result<Self> {
        let inner = Arc::new(SchedulerInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
        });

        let worker_inner = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || worker_loop(&worker_inner))?;

        Ok(Self {
            inner,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Queue a task behind everything already submitted.
    pub fn submit(&self, work: impl FnOnce() + Send + 'static) -> Result<(), SchedulerClosed> {
        {
            let mut queue = self.inner.queue.lock();
            // Checked under the lock so a task can't slip in after the worker exits
            if self.inner.shutdown.load(Ordering::Acquire) {
                return Err(SchedulerClosed);
            }
            queue.push_back(Box::new(work));
            self.inner.queue_depth.fetch_add(1, Ordering::Release);
        }

        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until all queued and in-flight tasks have completed.
    ///
    /// The worker keeps running afterwards.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while self.inner.queue_depth.load(Ordering::Acquire) > 0
            || self.inner.active_tasks.load(Ordering::Acquire) > 0
        {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Run remaining tasks, stop the worker and join it. Idempotent.
    pub fn shutdown(&self) {
        {
            let _queue = self.inner.queue.lock();
            self.inner.shutdown.store(true, Ordering::Release);
            self.inner.work_ready.notify_all();
        }

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!(target: "pancarte::flush", "flush worker exited abnormally");
            }
        }
    }

    /// Whether `shutdown` has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Return a snapshot of scheduler metrics.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queue_depth: self.inner.queue_depth.load(Ordering::Relaxed),
            active_tasks: self.inner.active_tasks.load(Ordering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(Ordering::Relaxed),
            tasks_panicked: self.inner.tasks_panicked.load(Ordering::Relaxed),
        }
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decrements `active_tasks` and wakes drain waiters, even if the task panicked.
struct ActiveTaskGuard<'a> {
    inner: &'a SchedulerInner,
}

impl Drop for ActiveTaskGuard<'_> {
    fn drop(&mut self) {
        let prev_active = self.inner.active_tasks.fetch_sub(1, Ordering::Release);
        self.inner.tasks_completed.fetch_add(1, Ordering::Relaxed);

        // drain() checks and waits while holding the queue lock
        if prev_active == 1 && self.inner.queue_depth.load(Ordering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &SchedulerInner) {
    loop {
        let task = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    inner.queue_depth.fetch_sub(1, Ordering::Release);
                    inner.active_tasks.fetch_add(1, Ordering::Release);
                    break task;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { inner };

        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
            inner.tasks_panicked.fetch_add(1, Ordering::Relaxed);
            let msg: &str = if let Some(s) = e.downcast_ref::<&str>() {
                s
            } else if let Some(s) = e.downcast_ref::<String>() {
                s
            } else {
                "(non-string panic)"
            };
            error!(target: "pancarte::flush", panic = msg, "flush task panicked");
        }
    }
}
