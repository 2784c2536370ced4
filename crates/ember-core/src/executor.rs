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

//! The per-render-thread "after flush" executor.
//!
//! GL objects must be created, locked, and destroyed on the thread that owns
//! the GL context. Asynchronous producers (the shared-texture bridge, handle
//! finalizers on other threads) therefore never touch GL directly; they post
//! closures here, and the owning render context drains the queue between the
//! driver's replay segments and the end of the frame.

use crate::driver::GlDriver;

/// A deferred GL-only task. Runs on the render thread that owns the queue,
/// with exclusive access to that thread's driver.
pub type GlTask = Box<dyn FnOnce(&mut dyn GlDriver) + Send>;

/// The sending half of an after-flush queue. Cheap to clone and safe to hold
/// from any thread.
pub type AfterFlushSender = flume::Sender<GlTask>;

/// A single-consumer queue of GL-only callbacks owned by one render context.
#[derive(Debug)]
pub struct AfterFlushQueue {
    sender: flume::Sender<GlTask>,
    receiver: flume::Receiver<GlTask>,
}

impl AfterFlushQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Returns a sender other threads can post tasks through.
    pub fn sender(&self) -> AfterFlushSender {
        self.sender.clone()
    }

    /// Posts a task from the owning thread itself.
    pub fn post(&self, task: GlTask) {
        // Send on a queue we hold both ends of cannot fail.
        let _ = self.sender.send(task);
    }

    /// Runs every queued task against the owning thread's driver. Returns
    /// the number of tasks executed.
    pub fn drain(&self, driver: &mut dyn GlDriver) -> usize {
        let mut ran = 0;
        for task in self.receiver.try_iter() {
            task(driver);
            ran += 1;
        }
        ran
    }

    /// Number of tasks currently queued.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for AfterFlushQueue {
    fn default() -> Self {
        Self::new()
    }
}
