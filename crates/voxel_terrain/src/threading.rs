//! Task execution services for generation jobs.
//!
//! The pipeline only sees [`TaskService`]: submit a closure, get a
//! [`TaskId`], poll it later. There is no cancellation; callers detect stale
//! results themselves when they arrive.
//!
//! - [`TaskExecutor`]: rayon thread pool, one channel per task.
//! - [`InlineTaskService`]: runs the task during `submit`.
//! - [`DeferredTaskService`]: queues tasks until the owner runs them, for
//!   deterministic stepping.
//!
//! # Usage
//!
//! ```ignore
//! let mut executor = TaskExecutor::new();
//!
//! // Queue work (non-blocking)
//! let task_id = executor.submit(Box::new(move || expensive_computation()));
//!
//! // Poll for results each frame
//! if let TaskPoll::Done(result) = executor.poll(task_id) {
//!     // Use result
//! }
//! ```

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::error::{ConfigError, TaskFailure};

/// Unique identifier for a submitted task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
  fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

/// Boxed unit of work.
pub type Task<T> = Box<dyn FnOnce() -> T + Send + 'static>;

/// Outcome of polling a task.
#[derive(Debug)]
pub enum TaskPoll<T> {
  Pending,
  Done(T),
  Failed(TaskFailure),
}

/// Generic asynchronous execution service.
pub trait TaskService<T: Send + 'static>: Send {
  /// Queue `task`; never blocks.
  fn submit(&mut self, task: Task<T>) -> TaskId;

  /// Check on a task. A terminal answer (`Done`/`Failed`) is given once;
  /// later polls of the same id report [`TaskFailure::Unknown`].
  fn poll(&mut self, task: TaskId) -> TaskPoll<T>;

  /// Tasks submitted and not yet reported.
  fn in_flight(&self) -> usize;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "non-string panic payload".to_string()
  }
}

fn run_caught<T>(task: Task<T>) -> TaskPoll<T> {
  match catch_unwind(AssertUnwindSafe(task)) {
    Ok(value) => TaskPoll::Done(value),
    Err(payload) => TaskPoll::Failed(TaskFailure::Panicked(panic_message(payload.as_ref()))),
  }
}

// =============================================================================
// Rayon executor
// =============================================================================

/// Rayon-backed executor.
///
/// Each task reports through its own bounded channel, so completion order
/// across tasks is irrelevant and a dropped executor never blocks workers.
pub struct TaskExecutor<T> {
  pool: Option<Arc<rayon::ThreadPool>>,
  pending: HashMap<TaskId, Receiver<thread::Result<T>>>,
}

impl<T: Send + 'static> TaskExecutor<T> {
  /// Executor on rayon's global pool.
  pub fn new() -> Self {
    Self {
      pool: None,
      pending: HashMap::new(),
    }
  }

  /// Executor on a dedicated pool of `num_threads` workers (0 = global pool).
  pub fn with_threads(num_threads: usize) -> Result<Self, ConfigError> {
    if num_threads == 0 {
      return Ok(Self::new());
    }
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(num_threads)
      .thread_name(|index| format!("terrain-worker-{index}"))
      .build()?;
    Ok(Self {
      pool: Some(Arc::new(pool)),
      pending: HashMap::new(),
    })
  }

  /// Number of worker threads available to this executor.
  pub fn num_threads(&self) -> usize {
    match &self.pool {
      Some(pool) => pool.current_num_threads(),
      None => rayon::current_num_threads(),
    }
  }
}

impl<T: Send + 'static> Default for TaskExecutor<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + 'static> TaskService<T> for TaskExecutor<T> {
  fn submit(&mut self, task: Task<T>) -> TaskId {
    let task_id = TaskId::next();
    let (sender, receiver) = crossbeam_channel::bounded(1);
    let job = move || {
      let result = catch_unwind(AssertUnwindSafe(task));
      // Receiver dropped means the executor is gone; nothing left to tell.
      let _ = sender.send(result);
    };
    match &self.pool {
      Some(pool) => pool.spawn(job),
      None => rayon::spawn(job),
    }
    self.pending.insert(task_id, receiver);
    task_id
  }

  fn poll(&mut self, task: TaskId) -> TaskPoll<T> {
    let Some(receiver) = self.pending.get(&task) else {
      return TaskPoll::Failed(TaskFailure::Unknown);
    };
    let outcome = match receiver.try_recv() {
      Err(TryRecvError::Empty) => return TaskPoll::Pending,
      Ok(Ok(value)) => TaskPoll::Done(value),
      Ok(Err(payload)) => TaskPoll::Failed(TaskFailure::Panicked(panic_message(payload.as_ref()))),
      Err(TryRecvError::Disconnected) => TaskPoll::Failed(TaskFailure::Lost),
    };
    self.pending.remove(&task);
    outcome
  }

  fn in_flight(&self) -> usize {
    self.pending.len()
  }
}

// =============================================================================
// Inline service
// =============================================================================

/// Runs every task synchronously inside `submit`.
pub struct InlineTaskService<T> {
  finished: HashMap<TaskId, TaskPoll<T>>,
}

impl<T> InlineTaskService<T> {
  pub fn new() -> Self {
    Self {
      finished: HashMap::new(),
    }
  }
}

impl<T> Default for InlineTaskService<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + 'static> TaskService<T> for InlineTaskService<T> {
  fn submit(&mut self, task: Task<T>) -> TaskId {
    let task_id = TaskId::next();
    self.finished.insert(task_id, run_caught(task));
    task_id
  }

  fn poll(&mut self, task: TaskId) -> TaskPoll<T> {
    self
      .finished
      .remove(&task)
      .unwrap_or(TaskPoll::Failed(TaskFailure::Unknown))
  }

  fn in_flight(&self) -> usize {
    self.finished.len()
  }
}

// =============================================================================
// Deferred service
// =============================================================================

struct DeferredQueue<T> {
  queued: VecDeque<(TaskId, Task<T>)>,
  finished: HashMap<TaskId, TaskPoll<T>>,
}

/// Queues tasks until [`run_next`](Self::run_next) or
/// [`run_all`](Self::run_all) is called.
///
/// Clones share the same queue, so a caller can keep a handle while the
/// pipeline owns another.
pub struct DeferredTaskService<T> {
  inner: Arc<Mutex<DeferredQueue<T>>>,
}

impl<T> Clone for DeferredTaskService<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T> Default for DeferredTaskService<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> DeferredTaskService<T> {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(DeferredQueue {
        queued: VecDeque::new(),
        finished: HashMap::new(),
      })),
    }
  }

  fn lock(&self) -> MutexGuard<'_, DeferredQueue<T>> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Tasks submitted and not yet run.
  pub fn queued(&self) -> usize {
    self.lock().queued.len()
  }

  /// Run the oldest queued task. Returns false when the queue is empty.
  pub fn run_next(&self) -> bool {
    // Run outside the lock so tasks may submit more work.
    let Some((task_id, task)) = self.lock().queued.pop_front() else {
      return false;
    };
    let outcome = run_caught(task);
    self.lock().finished.insert(task_id, outcome);
    true
  }

  /// Run every queued task; returns how many ran.
  pub fn run_all(&self) -> usize {
    let mut ran = 0;
    while self.run_next() {
      ran += 1;
    }
    ran
  }

  /// Drop the oldest queued task without running it; its poll reports
  /// [`TaskFailure::Lost`].
  pub fn lose_next(&self) -> bool {
    let mut queue = self.lock();
    let Some((task_id, _task)) = queue.queued.pop_front() else {
      return false;
    };
    queue
      .finished
      .insert(task_id, TaskPoll::Failed(TaskFailure::Lost));
    true
  }
}

impl<T: Send + 'static> TaskService<T> for DeferredTaskService<T> {
  fn submit(&mut self, task: Task<T>) -> TaskId {
    let task_id = TaskId::next();
    self.lock().queued.push_back((task_id, task));
    task_id
  }

  fn poll(&mut self, task: TaskId) -> TaskPoll<T> {
    let mut queue = self.lock();
    if let Some(outcome) = queue.finished.remove(&task) {
      return outcome;
    }
    if queue.queued.iter().any(|(queued, _)| *queued == task) {
      TaskPoll::Pending
    } else {
      TaskPoll::Failed(TaskFailure::Unknown)
    }
  }

  fn in_flight(&self) -> usize {
    let queue = self.lock();
    queue.queued.len() + queue.finished.len()
  }
}

// =============================================================================
// Tests
// =============================================================================
