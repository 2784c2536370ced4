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

//! # Ember Tasks
//!
//! The engine's background task scheduler: a priority-ordered queue executed
//! by a pool of worker threads, with timed scheduling, best-effort removal,
//! and cooperative cancellation. Everything deferred in the engine — mipmap
//! generation, glyph rasterization, background uploads, periodic release
//! passes — runs here at differentiated priorities.

#![warn(missing_docs)]

mod scheduler;
mod task;

pub use scheduler::{ScheduleError, Scheduler, SchedulerConfig};
pub use task::{FnTask, Task, TaskRun, TaskState};
