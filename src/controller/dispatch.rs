//! Notification contexts.
//!
//! Every state mutation that follows a completed load, and every delegate
//! callback, runs as a [`Task`] on the controller's [`Dispatcher`]. A
//! dispatcher runs the tasks handed to it one at a time, in submission
//! order.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, ReentrantMutex};

/// Unit of work marshalled onto a notification context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A serialized execution context.
///
/// Implementations must never run two tasks concurrently and must run tasks
/// in the order they were dispatched.
pub trait Dispatcher: Send + Sync {
    /// Schedules `task` to run on this context.
    fn dispatch(&self, task: Task);
}

/// Runs tasks immediately on the dispatching thread.
///
/// Tasks dispatched from different threads are serialized by a reentrant
/// lock, so a task may itself dispatch (for example a delegate that requests
/// another page) without deadlocking.
#[derive(Default)]
pub struct InlineDispatcher {
    serial: ReentrantMutex<()>,
}

impl InlineDispatcher {
    /// Creates an inline dispatcher.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) {
        let _serial = self.serial.lock();
        task();
    }
}

impl fmt::Debug for InlineDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineDispatcher").finish()
    }
}

/// Caller-driven task queue.
///
/// Any thread may dispatch; tasks only run when the owning thread calls
/// [`run_pending`](Self::run_pending), [`run_until_idle`](Self::run_until_idle)
/// or [`wait_and_run`](Self::wait_and_run). No threads are spawned. Clones
/// share the same queue.
#[derive(Clone, Default)]
pub struct SerialQueue {
    inner: Arc<QueueInner>,
}

#[derive(Default)]
struct QueueInner {
    tasks: Mutex<VecDeque<Task>>,
    ready: Condvar,
    runner: ReentrantMutex<()>,
}

impl SerialQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    /// Returns `true` if no tasks are waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.tasks.lock().is_empty()
    }

    /// Runs the tasks that were queued when the call started and returns how
    /// many ran. Tasks queued by those tasks wait for the next call.
    pub fn run_pending(&self) -> usize {
        let _runner = self.inner.runner.lock();
        let budget = self.len();
        let mut ran = 0;
        while ran < budget {
            let Some(task) = self.inner.tasks.lock().pop_front() else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    /// Runs tasks until the queue is empty, including tasks queued while
    /// running. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_pending();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }

    /// Blocks up to `timeout` for at least one task to arrive, then runs the
    /// pending tasks. Returns how many ran; zero means the wait timed out.
    pub fn wait_and_run(&self, timeout: Duration) -> usize {
        let deadline = Instant::now().checked_add(timeout);
        {
            let mut tasks = self.inner.tasks.lock();
            while tasks.is_empty() {
                match deadline {
                    Some(deadline) => {
                        if self.inner.ready.wait_until(&mut tasks, deadline).timed_out() {
                            break;
                        }
                    }
                    // Past the clock's range: wait without a deadline.
                    None => self.inner.ready.wait(&mut tasks),
                }
            }
        }
        self.run_pending()
    }
}

impl Dispatcher for SerialQueue {
    fn dispatch(&self, task: Task) {
        self.inner.tasks.lock().push_back(task);
        self.inner.ready.notify_one();
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("pending", &self.len())
            .finish()
    }
}
