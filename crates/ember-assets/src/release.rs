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

//! The periodic release pass over registered mipmaps.

use crate::mipmap::Mipmap;
use ember_core::FrameClock;
use ember_tasks::{Scheduler, Task, TaskRun};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Scheduler priority of the release pass; it yields to all real work.
pub const PRIORITY_RELEASE: i32 = -10;

/// Weakly tracks every live mipmap so the release task can sweep them.
///
/// Registration holds only a [`Weak`]; a mipmap dropped by the application
/// disappears from the registry on the next sweep.
#[derive(Default)]
pub struct MipmapRegistry {
    inner: Mutex<Vec<Weak<Mipmap>>>,
}

impl MipmapRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a mipmap for periodic eviction sweeps.
    pub fn register(&self, mipmap: &Arc<Mipmap>) {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .push(Arc::downgrade(mipmap));
    }

    /// Number of still-live registered mipmaps.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Whether no live mipmaps are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts cold levels across all live mipmaps and drops dead entries.
    /// Returns the number of levels freed.
    pub fn sweep(&self, clock: &FrameClock, expiration_secs: f64) -> usize {
        let mut guard = self.inner.lock().expect("registry lock poisoned");
        let mut freed = 0;
        guard.retain(|weak| match weak.upgrade() {
            Some(mipmap) => {
                freed += mipmap.evict_cold(clock, expiration_secs);
                true
            }
            None => false,
        });
        freed
    }
}

struct ReleaseTask {
    registry: Arc<MipmapRegistry>,
    clock: Arc<FrameClock>,
    expiration_secs: f64,
    period: Duration,
}

impl Task for ReleaseTask {
    fn run(&self, run: &TaskRun) {
        let freed = self.registry.sweep(&self.clock, self.expiration_secs);
        if freed > 0 {
            log::debug!("Release pass freed {freed} mipmap levels.");
        }
        run.reschedule_after(self.period);
    }

    fn name(&self) -> &str {
        "mipmap-release"
    }
}

/// Schedules the recurring release pass. Returns the task handle so callers
/// can remove it at shutdown.
pub fn spawn_release_task(
    scheduler: &Scheduler,
    registry: Arc<MipmapRegistry>,
    clock: Arc<FrameClock>,
    expiration_secs: f64,
    period: Duration,
) -> Arc<dyn Task> {
    let task: Arc<dyn Task> = Arc::new(ReleaseTask {
        registry,
        clock,
        expiration_secs,
        period,
    });
    if let Err(e) = scheduler.add(Arc::clone(&task), PRIORITY_RELEASE) {
        log::warn!("Could not schedule the mipmap release pass: {e}");
    }
    task
}
