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

//! The task trait and its per-run control block.

use std::panic::RefUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The observable lifecycle state of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Queued, not yet picked by a worker.
    Waiting = 0,
    /// A worker is inside `run`.
    Running = 1,
    /// Finished; will not be re-queued.
    Done = 2,
    /// Cancelled; will not be re-queued.
    Cancelled = 3,
}

impl TaskState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Waiting,
            1 => Self::Running,
            2 => Self::Done,
            _ => Self::Cancelled,
        }
    }
}

/// A unit of deferred work.
///
/// Tasks are shared (`Arc<dyn Task>`) between the scheduler and their
/// owners. `run` is invoked by one worker at a time; the [`TaskRun`] gives
/// the task its cooperative controls: finishing, cancelling, rescheduling
/// itself, and observing removal between sub-steps.
pub trait Task: Send + Sync {
    /// Performs (one step of) the work.
    fn run(&self, run: &TaskRun);

    /// A short name used in worker logs.
    fn name(&self) -> &str {
        "task"
    }
}

// Shared between the scheduler's entry and the TaskRun handed to `run`.
#[derive(Debug)]
pub(crate) struct RunState {
    pub(crate) state: AtomicU8,
    pub(crate) keep_going: AtomicBool,
    // Delay requested by `reschedule_after`, in ms, +1 so 0 means "unset".
    next_delay_ms: AtomicU64,
}

impl RunState {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(TaskState::Waiting as u8),
            keep_going: AtomicBool::new(true),
            next_delay_ms: AtomicU64::new(0),
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// CAS helper; transitions only from `from`.
    pub(crate) fn transition(&self, from: TaskState, to: TaskState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn force(&self, to: TaskState) {
        self.state.store(to as u8, Ordering::Release);
    }

    pub(crate) fn take_delay(&self) -> Option<Duration> {
        let raw = self.next_delay_ms.swap(0, Ordering::AcqRel);
        (raw != 0).then(|| Duration::from_millis(raw - 1))
    }
}

/// The control block a worker passes into [`Task::run`].
#[derive(Debug)]
pub struct TaskRun {
    pub(crate) shared: Arc<RunState>,
}

impl TaskRun {
    /// `false` once the task has been removed or cancelled; long tasks check
    /// this between sub-steps and abort cleanly.
    pub fn should_continue(&self) -> bool {
        self.shared.keep_going.load(Ordering::Acquire)
            && !matches!(self.shared.state(), TaskState::Cancelled)
    }

    /// Marks the task finished; the worker drops it instead of re-queuing.
    pub fn finish(&self) {
        self.shared.force(TaskState::Done);
    }

    /// Marks the task cancelled.
    pub fn cancel(&self) {
        self.shared.force(TaskState::Cancelled);
    }

    /// Asks to run again after `delay` instead of immediately. Only
    /// meaningful while the task is still waiting/running at return.
    pub fn reschedule_after(&self, delay: Duration) {
        let ms = delay.as_millis().min(u64::MAX as u128 - 1) as u64;
        self.shared.next_delay_ms.store(ms + 1, Ordering::Release);
    }

    /// The task's current state.
    pub fn state(&self) -> TaskState {
        self.shared.state()
    }
}

/// A task built from a closure.
///
/// `once` tasks finish after a single run; `repeating` tasks re-schedule
/// themselves with a fixed period until removed or until the closure calls
/// [`TaskRun::finish`].
pub struct FnTask<F> {
    name: &'static str,
    period: Option<Duration>,
    f: F,
}

impl<F> FnTask<F>
where
    F: Fn(&TaskRun) + Send + Sync + RefUnwindSafe + 'static,
{
    /// A one-shot task.
    pub fn once(name: &'static str, f: F) -> Arc<Self> {
        Arc::new(Self {
            name,
            period: None,
            f,
        })
    }

    /// A recurring task with a fixed period between runs.
    pub fn repeating(name: &'static str, period: Duration, f: F) -> Arc<Self> {
        Arc::new(Self {
            name,
            period: Some(period),
            f,
        })
    }
}

impl<F> Task for FnTask<F>
where
    F: Fn(&TaskRun) + Send + Sync + RefUnwindSafe + 'static,
{
    fn run(&self, run: &TaskRun) {
        (self.f)(run);
        match self.period {
            Some(period) => {
                // Respect an explicit finish/cancel from the closure.
                if run.should_continue() && run.state() != TaskState::Done {
                    run.reschedule_after(period);
                }
            }
            None => {
                if run.state() != TaskState::Cancelled {
                    run.finish();
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}
