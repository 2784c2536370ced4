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

//! End-to-end mipmap pipeline tests: ping, cache generation, on-demand
//! level loads, load-once racing, and the eviction cycle.

use ember_assets::{dds, AssetContext, CacheDirs, LevelState, Mipmap, MipmapRegistry};
use ember_core::{FrameClock, PixelFormat, RenderSettings, ResourceManager};
use ember_tasks::Scheduler;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn write_source_png(dir: &Path, name: &str, size: u32) -> PathBuf {
    let path = dir.join(name);
    let img = image::RgbaImage::from_fn(size, size, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 255])
    });
    img.save(&path).unwrap();
    path
}

fn context(cache_dir: &Path) -> AssetContext {
    AssetContext {
        scheduler: Scheduler::with_workers(2),
        resources: Arc::new(ResourceManager::default()),
        cache: Arc::new(CacheDirs::with_base(cache_dir)),
        clock: Arc::new(FrameClock::new()),
        settings: RenderSettings {
            use_compressed_mipmaps: true,
            ..RenderSettings::default()
        },
    }
}

fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn pipeline_pings_generates_and_loads() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source_png(dir.path(), "brick.png", 128);
    let ctx = context(&dir.path().join("cache"));

    let mipmap = Mipmap::new(&source);
    mipmap.start(&ctx);
    wait_until("ready", || mipmap.is_ready());

    let info = mipmap.info().unwrap();
    assert_eq!(info.level1.max_side(), 64);
    assert_eq!(info.max_level, 6);
    assert_eq!(info.format, PixelFormat::Dxt5); // png source carries alpha

    // One cache entry per level, each holding a surface of the level's size.
    for level in 0..=info.max_level {
        let entry = ctx.cache.level_entry(&source, level, "dds");
        let file = dds::read(&entry).unwrap();
        assert_eq!(file.format, PixelFormat::Dxt5);
        let expected = if level == 0 { 128 } else { 64 >> (level - 1) };
        assert_eq!(file.width, expected.max(1), "level {level}");
    }

    // Request a mid footprint; the wanted level becomes resident.
    let req = mipmap.request(&ctx, 40.0).unwrap();
    assert_eq!(req.wanted.level, 1);
    assert!(req.started_load);
    wait_until("level 1 resident", || {
        matches!(mipmap.level_state(1), Some(LevelState::Resident(_)))
    });
    let req = mipmap.request(&ctx, 40.0).unwrap();
    let resident = req.resident.expect("level 1 is resident");
    assert_eq!(resident.level, 1);
    assert_eq!(resident.extent.max_side(), 64);

    ctx.scheduler.shutdown();
}

#[test]
fn missing_source_marks_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir.path().join("cache"));
    let mipmap = Mipmap::new(dir.path().join("no-such.png"));
    mipmap.start(&ctx);
    wait_until("invalid", || mipmap.is_invalid());
    assert!(mipmap.request(&ctx, 100.0).is_none());
    ctx.scheduler.shutdown();
}

// Racing requests for the same cold level start exactly one load.
#[test]
fn concurrent_requests_load_once() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source_png(dir.path(), "race.png", 256);
    let ctx = context(&dir.path().join("cache"));

    let mipmap = Mipmap::new(&source);
    mipmap.start(&ctx);
    wait_until("ready", || mipmap.is_ready());

    let started: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mipmap = Arc::clone(&mipmap);
                let ctx = ctx.clone();
                s.spawn(move || {
                    mipmap
                        .request(&ctx, 70.0)
                        .map(|r| r.started_load as usize)
                        .unwrap_or(0)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });
    assert_eq!(started, 1);
    ctx.scheduler.shutdown();
}

// While a wanted level loads, a resident neighbour is served as placeholder.
#[test]
fn placeholder_is_served_while_loading() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source_png(dir.path(), "hold.png", 128);
    let ctx = context(&dir.path().join("cache"));

    let mipmap = Mipmap::new(&source);
    mipmap.start(&ctx);
    wait_until("ready", || mipmap.is_ready());

    // Make the smallest level resident first.
    mipmap.request(&ctx, 1.0);
    wait_until("max level resident", || {
        matches!(mipmap.level_state(6), Some(LevelState::Resident(_)))
    });

    let req = mipmap.request(&ctx, 40.0).unwrap();
    assert_eq!(req.wanted.level, 1);
    if let Some(placeholder) = req.resident {
        assert_ne!(placeholder.level, 1);
    }
    ctx.scheduler.shutdown();
}

// A cache entry older than its source is regenerated on the next start.
#[test]
fn stale_cache_entries_regenerate() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source_png(dir.path(), "edit.png", 64);
    let ctx = context(&dir.path().join("cache"));

    let mipmap = Mipmap::new(&source);
    mipmap.start(&ctx);
    wait_until("ready", || mipmap.is_ready());

    // Backdate one entry behind the source's mtime.
    let entry = ctx.cache.level_entry(&source, 0, "dds");
    let file = std::fs::File::options().write(true).open(&entry).unwrap();
    let past = std::time::SystemTime::now() - Duration::from_secs(60);
    file.set_modified(past).unwrap();
    drop(file);

    let again = Mipmap::new(&source);
    again.start(&ctx);
    wait_until("regenerated", || again.is_ready());
    let rewritten = std::fs::metadata(&entry).unwrap().modified().unwrap();
    assert!(rewritten > past, "stale level 0 entry was not regenerated");
}

// Eviction cycle: a cold level returns to NEW, the smallest level is pinned
// and survives, and a freshly used level is never evicted.
#[test]
fn eviction_frees_cold_levels_but_pins_smallest() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source_png(dir.path(), "cold.png", 128);
    let ctx = context(&dir.path().join("cache"));
    let registry = MipmapRegistry::new();

    let mipmap = Mipmap::new(&source);
    registry.register(&mipmap);
    mipmap.start(&ctx);
    wait_until("ready", || mipmap.is_ready());

    mipmap.request(&ctx, 40.0); // level 1
    mipmap.request(&ctx, 1.0); // level 6 (smallest)
    wait_until("levels resident", || {
        matches!(mipmap.level_state(1), Some(LevelState::Resident(_)))
            && matches!(mipmap.level_state(6), Some(LevelState::Resident(_)))
    });

    // A sweep inside the expiration window frees nothing.
    assert_eq!(registry.sweep(&ctx.clock, 3.0), 0);
    assert!(matches!(
        mipmap.level_state(1),
        Some(LevelState::Resident(_))
    ));

    // Fast-forward past the window; only the unpinned level goes.
    ctx.clock.skew_by_secs(31.0);
    let freed = registry.sweep(&ctx.clock, 3.0);
    assert_eq!(freed, 1);
    assert_eq!(mipmap.level_state(1), Some(LevelState::New));
    assert!(matches!(
        mipmap.level_state(6),
        Some(LevelState::Resident(_))
    ));

    // A later request retries the load.
    let req = mipmap.request(&ctx, 40.0).unwrap();
    assert!(req.started_load);
    ctx.scheduler.shutdown();
}
