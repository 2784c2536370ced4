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

//! The engine frame clock.
//!
//! Expiration of GPU handles and mipmap levels is expressed in seconds of
//! disuse, and per-level last-used epochs are frame numbers. Both are served
//! by a single shared clock that the render thread advances in `pre_frame` /
//! `post_frame`. Tests inject time by constructing the clock with an offset.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Frame numbers 0 and 1 are reserved as the `NEW` / `LOADING` tags of the
/// per-level atomic state machine, so the clock starts counting at 2.
pub const FIRST_FRAME: u64 = 2;

/// A shared, monotonic frame clock.
///
/// `frame()` is the number of the frame currently being recorded; `now_secs`
/// is wall time since engine start. Both are cheap enough for hot paths.
#[derive(Debug)]
pub struct FrameClock {
    started: Instant,
    frame: AtomicU64,
    // Seconds added to `now_secs`, used by eviction tests to fast-forward.
    skew_ms: AtomicU64,
}

impl FrameClock {
    /// Creates a clock positioned at [`FIRST_FRAME`].
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            frame: AtomicU64::new(FIRST_FRAME),
            skew_ms: AtomicU64::new(0),
        }
    }

    /// The current frame number (always `>= FIRST_FRAME`).
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Relaxed)
    }

    /// Advances to the next frame and returns its number.
    pub fn advance(&self) -> u64 {
        self.frame.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Seconds elapsed since the clock was created, plus any injected skew.
    pub fn now_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64() + self.skew_ms.load(Ordering::Relaxed) as f64 / 1_000.0
    }

    /// Fast-forwards the clock by `secs`. Intended for eviction tests; the
    /// engine itself never skews the clock.
    pub fn skew_by_secs(&self, secs: f64) {
        self.skew_ms
            .fetch_add((secs * 1_000.0) as u64, Ordering::Relaxed);
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_start_past_reserved_tags() {
        let clock = FrameClock::new();
        assert!(clock.frame() >= FIRST_FRAME);
        let next = clock.advance();
        assert_eq!(next, FIRST_FRAME + 1);
        assert_eq!(clock.frame(), next);
    }

    #[test]
    fn skew_moves_time_forward() {
        let clock = FrameClock::new();
        let before = clock.now_secs();
        clock.skew_by_secs(30.0);
        assert!(clock.now_secs() >= before + 30.0);
    }
}
