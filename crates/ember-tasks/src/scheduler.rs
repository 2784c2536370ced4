// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The worker pool and its priority queue.
//!
//! The queue is ordered by `(priority desc, ready-time asc, insertion seq)`.
//! Workers pick the highest-priority entry whose ready time has passed; if
//! none is ready they park on a condition variable until the earliest ready
//! time or a wake. A picked entry moves into a reserved set so no other
//! worker can claim it. Stale heap entries left behind by reschedules are
//! skipped through a per-entry stamp (lazy deletion).

use crate::task::{RunState, Task, TaskRun, TaskState};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Errors returned by [`Scheduler::add`].
#[derive(Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// The task is already on the queue.
    AlreadyScheduled,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::AlreadyScheduled => write!(f, "task is already scheduled"),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Configuration for the scheduler pool.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Prefix for worker thread names.
    pub thread_name_prefix: &'static str,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            thread_name_prefix: "ember-worker",
        }
    }
}

// Tasks are identified by the address of their shared allocation.
type TaskKey = usize;

fn key_of(task: &Arc<dyn Task>) -> TaskKey {
    Arc::as_ptr(task) as *const () as usize
}

struct EntryData {
    task: Arc<dyn Task>,
    shared: Arc<RunState>,
    priority: i32,
    ready: Instant,
    seq: u64,
    // Bumped on every (re)queue and reorder; heap snapshots carrying an
    // older stamp are dead.
    stamp: u64,
}

struct HeapEntry {
    priority: i32,
    ready: Instant,
    seq: u64,
    key: TaskKey,
    stamp: u64,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.ready.cmp(&self.ready))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for HeapEntry {}

struct Inner {
    queue: BinaryHeap<HeapEntry>,
    entries: HashMap<TaskKey, EntryData>,
    reserved: HashSet<TaskKey>,
    running: usize,
    next_seq: u64,
    shutdown: bool,
}

impl Inner {
    fn is_live(&self, entry: &HeapEntry) -> bool {
        !self.reserved.contains(&entry.key)
            && self
                .entries
                .get(&entry.key)
                .is_some_and(|data| data.stamp == entry.stamp)
    }

    fn push_snapshot(&mut self, key: TaskKey) {
        if let Some(data) = self.entries.get(&key) {
            self.queue.push(HeapEntry {
                priority: data.priority,
                ready: data.ready,
                seq: data.seq,
                key,
                stamp: data.stamp,
            });
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    cond: Condvar,
}

/// The background task scheduler.
///
/// Cheap to share (`Arc<Scheduler>`); dropped last, it shuts the pool down
/// and joins the workers.
pub struct Scheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl Scheduler {
    /// Starts a pool with the given configuration.
    pub fn new(config: SchedulerConfig) -> Arc<Self> {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                queue: BinaryHeap::new(),
                entries: HashMap::new(),
                reserved: HashSet::new(),
                running: 0,
                next_seq: 0,
                shutdown: false,
            }),
            cond: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(config.workers);
        for index in 0..config.workers.max(1) {
            let shared = Arc::clone(&shared);
            let name = format!("{}-{index}", config.thread_name_prefix);
            let handle = thread::Builder::new()
                .name(name)
                .spawn(move || worker_loop(shared))
                .expect("failed to spawn scheduler worker");
            workers.push(handle);
        }
        log::info!("Task scheduler started with {} workers.", config.workers.max(1));

        Arc::new(Self {
            shared,
            workers: Mutex::new(workers),
        })
    }

    /// Starts a pool with default configuration.
    pub fn with_workers(workers: usize) -> Arc<Self> {
        Self::new(SchedulerConfig {
            workers,
            ..SchedulerConfig::default()
        })
    }

    /// Enqueues a task at `priority` (higher runs sooner), ready
    /// immediately. Fails if the task is already on the queue.
    pub fn add(&self, task: Arc<dyn Task>, priority: i32) -> Result<(), ScheduleError> {
        self.add_after(task, priority, Duration::ZERO)
    }

    /// Enqueues a task that becomes ready after `delay`.
    pub fn add_after(
        &self,
        task: Arc<dyn Task>,
        priority: i32,
        delay: Duration,
    ) -> Result<(), ScheduleError> {
        let key = key_of(&task);
        let mut inner = self.lock();
        if inner.entries.contains_key(&key) {
            return Err(ScheduleError::AlreadyScheduled);
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            EntryData {
                task,
                shared: Arc::new(RunState::new()),
                priority,
                ready: Instant::now() + delay,
                seq,
                stamp: 0,
            },
        );
        inner.push_snapshot(key);
        self.shared.cond.notify_one();
        Ok(())
    }

    /// Best-effort removal. Returns `true` if the task came off the queue;
    /// a task currently running is flagged to stop (its `should_continue`
    /// turns false) and is dropped once its current run returns.
    pub fn remove(&self, task: &Arc<dyn Task>) -> bool {
        let key = key_of(task);
        let mut inner = self.lock();
        let Some(data) = inner.entries.get(&key) else {
            log::warn!("Removing task '{}' that is not scheduled", task.name());
            return false;
        };
        let shared = Arc::clone(&data.shared);
        if inner.reserved.contains(&key) {
            shared.keep_going.store(false, std::sync::atomic::Ordering::Release);
            shared.force(TaskState::Cancelled);
            return false;
        }
        inner.entries.remove(&key);
        shared.force(TaskState::Cancelled);
        true
    }

    /// Updates a queued task's priority (and refreshes its queue position).
    /// Does not preempt a task currently running. Returns whether the task
    /// was found.
    pub fn reschedule(&self, task: &Arc<dyn Task>, priority: Option<i32>) -> bool {
        let key = key_of(task);
        let mut inner = self.lock();
        let reserved = inner.reserved.contains(&key);
        let Some(data) = inner.entries.get_mut(&key) else {
            log::warn!("Rescheduling task '{}' that is not scheduled", task.name());
            return false;
        };
        if let Some(priority) = priority {
            data.priority = priority;
        }
        data.stamp += 1;
        if !reserved {
            inner.push_snapshot(key);
            self.shared.cond.notify_one();
        }
        true
    }

    /// Moves a queued task's ready time to `now + delay`; it will not be
    /// dispatched before then. Returns whether the task was found.
    pub fn schedule_after(&self, task: &Arc<dyn Task>, delay: Duration) -> bool {
        let key = key_of(task);
        let mut inner = self.lock();
        let reserved = inner.reserved.contains(&key);
        let Some(data) = inner.entries.get_mut(&key) else {
            log::warn!("Delaying task '{}' that is not scheduled", task.name());
            return false;
        };
        data.ready = Instant::now() + delay;
        data.stamp += 1;
        if !reserved {
            inner.push_snapshot(key);
            self.shared.cond.notify_one();
        }
        true
    }

    /// Number of tasks on the queue (including reserved/running ones).
    pub fn task_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Number of tasks currently inside `run`.
    pub fn running(&self) -> usize {
        self.lock().running
    }

    /// Number of queued tasks whose ready time has passed but that no
    /// worker has claimed yet.
    pub fn overdue_count(&self) -> usize {
        let inner = self.lock();
        let now = Instant::now();
        inner
            .entries
            .iter()
            .filter(|(key, data)| data.ready <= now && !inner.reserved.contains(*key))
            .count()
    }

    /// The current state of a task, if it is known to the scheduler.
    pub fn state_of(&self, task: &Arc<dyn Task>) -> Option<TaskState> {
        let inner = self.lock();
        inner.entries.get(&key_of(task)).map(|data| data.shared.state())
    }

    /// Stops the workers and joins them. Queued tasks that never started are
    /// dropped. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut inner = self.lock();
            if inner.shutdown {
                return;
            }
            inner.shutdown = true;
        }
        self.shared.cond.notify_all();
        let mut workers = self.workers.lock().expect("worker list lock poisoned");
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
        log::info!("Task scheduler stopped.");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.shared.inner.lock().expect("scheduler lock poisoned")
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum Picked {
    Run {
        key: TaskKey,
        task: Arc<dyn Task>,
        shared: Arc<RunState>,
    },
    Sleep(Option<Instant>),
}

fn pick(inner: &mut Inner) -> Picked {
    let now = Instant::now();
    let mut deferred = Vec::new();
    let mut earliest: Option<Instant> = None;
    let mut picked = None;

    while let Some(top) = inner.queue.pop() {
        if !inner.is_live(&top) {
            continue;
        }
        if top.ready <= now {
            picked = Some(top.key);
            break;
        }
        earliest = Some(match earliest {
            Some(e) if e <= top.ready => e,
            _ => top.ready,
        });
        deferred.push(top);
    }
    for entry in deferred {
        inner.queue.push(entry);
    }

    match picked {
        Some(key) => {
            inner.reserved.insert(key);
            inner.running += 1;
            let data = &inner.entries[&key];
            Picked::Run {
                key,
                task: Arc::clone(&data.task),
                shared: Arc::clone(&data.shared),
            }
        }
        None => Picked::Sleep(earliest),
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let (key, task, run_state) = {
            let mut inner = shared.inner.lock().expect("scheduler lock poisoned");
            loop {
                if inner.shutdown {
                    return;
                }
                match pick(&mut inner) {
                    Picked::Run {
                        key,
                        task,
                        shared: run_state,
                    } => break (key, task, run_state),
                    Picked::Sleep(Some(deadline)) => {
                        let timeout = deadline.saturating_duration_since(Instant::now());
                        let (guard, _) = shared
                            .cond
                            .wait_timeout(inner, timeout)
                            .expect("scheduler lock poisoned");
                        inner = guard;
                    }
                    Picked::Sleep(None) => {
                        inner = shared.cond.wait(inner).expect("scheduler lock poisoned");
                    }
                }
            }
        };

        run_state.transition(TaskState::Waiting, TaskState::Running);
        let run = TaskRun {
            shared: Arc::clone(&run_state),
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| task.run(&run)));
        if outcome.is_err() {
            log::error!("Task '{}' panicked; marking it done.", task.name());
            run_state.force(TaskState::Done);
        }

        let mut inner = shared.inner.lock().expect("scheduler lock poisoned");
        inner.reserved.remove(&key);
        inner.running -= 1;
        match run_state.state() {
            TaskState::Waiting | TaskState::Running => {
                run_state.force(TaskState::Waiting);
                let delay = run_state.take_delay().unwrap_or(Duration::ZERO);
                if let Some(data) = inner.entries.get_mut(&key) {
                    data.ready = Instant::now() + delay;
                    data.stamp += 1;
                }
                inner.push_snapshot(key);
                shared.cond.notify_one();
            }
            TaskState::Done | TaskState::Cancelled => {
                inner.entries.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::FnTask;

    #[test]
    fn add_twice_is_rejected() {
        let scheduler = Scheduler::with_workers(1);
        let task: Arc<dyn Task> = FnTask::once("noop", |_| {});
        // Park the worker so the entry stays queued.
        scheduler
            .add_after(Arc::clone(&task), 0, Duration::from_secs(60))
            .unwrap();
        assert_eq!(
            scheduler.add(Arc::clone(&task), 0),
            Err(ScheduleError::AlreadyScheduled)
        );
        assert_eq!(scheduler.task_count(), 1);
        scheduler.shutdown();
    }

    #[test]
    fn removed_before_start_never_runs() {
        let scheduler = Scheduler::with_workers(1);
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);
        let task: Arc<dyn Task> = FnTask::once("later", move |_| {
            ran2.fetch_add(1, Ordering::SeqCst);
        });
        scheduler
            .add_after(Arc::clone(&task), 0, Duration::from_millis(200))
            .unwrap();
        assert!(scheduler.remove(&task));
        thread::sleep(Duration::from_millis(400));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.task_count(), 0);
        scheduler.shutdown();
    }

    #[test]
    fn not_dispatched_before_ready_time() {
        let scheduler = Scheduler::with_workers(2);
        let started = Arc::new(Mutex::new(None::<Instant>));
        let started2 = Arc::clone(&started);
        let task: Arc<dyn Task> = FnTask::once("delayed", move |_| {
            *started2.lock().unwrap() = Some(Instant::now());
        });
        let queued_at = Instant::now();
        scheduler
            .add_after(task, 0, Duration::from_millis(150))
            .unwrap();
        thread::sleep(Duration::from_millis(600));
        let started_at = started.lock().unwrap().expect("task never ran");
        assert!(started_at.duration_since(queued_at) >= Duration::from_millis(150));
        scheduler.shutdown();
    }

    #[test]
    fn repeating_task_runs_until_removed() {
        let scheduler = Scheduler::with_workers(1);
        let runs = Arc::new(AtomicUsize::new(0));
        let runs2 = Arc::clone(&runs);
        let task: Arc<dyn Task> =
            FnTask::repeating("tick", Duration::from_millis(10), move |_| {
                runs2.fetch_add(1, Ordering::SeqCst);
            });
        scheduler.add(Arc::clone(&task), 0).unwrap();
        thread::sleep(Duration::from_millis(300));
        scheduler.remove(&task);
        let seen = runs.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several runs, saw {seen}");
        thread::sleep(Duration::from_millis(100));
        assert_eq!(scheduler.task_count(), 0);
        scheduler.shutdown();
    }

    #[test]
    fn overdue_ignores_reserved_entries() {
        let scheduler = Scheduler::with_workers(1);
        let task: Arc<dyn Task> = FnTask::once("sleepy", |_| {
            thread::sleep(Duration::from_millis(200));
        });
        scheduler.add(task, 0).unwrap();
        // Give the worker time to claim it.
        thread::sleep(Duration::from_millis(80));
        assert_eq!(scheduler.running(), 1);
        assert_eq!(scheduler.overdue_count(), 0);
        scheduler.shutdown();
    }
}
