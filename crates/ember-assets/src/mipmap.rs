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

//! The asynchronous mipmap pipeline.
//!
//! A [`Mipmap`] goes through three background steps:
//!
//! 1. *Ping*: read the source's dimensions and lay out the level pyramid.
//! 2. *Generate* (compressed path only): decode the source once, downscale
//!    every level, block-compress and write one cache entry per level.
//! 3. *Level loads*: individual levels are loaded on first request.
//!
//! Each level slot carries an atomic epoch: `0` (`NEW`), `1` (`LOADING`), or
//! the frame number of last use. All transitions are compare-and-swap, so
//! two renderers racing on a cold level start exactly one load, and the
//! release task can never evict a level mid-load.

use crate::cache::CacheDirs;
use crate::dds::{self, DdsFile};
use crate::dxt;
use crate::error::AssetError;
use ember_core::resource::{PixelSource, TextureDesc, TextureInit};
use ember_core::{Extent2D, FrameClock, PixelFormat, RenderSettings, ResourceManager};
use ember_tasks::{Scheduler, Task, TaskRun};
use image::imageops::FilterType;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::SystemTime;

/// Scheduler priority of level loads; a visible texture is waiting on them.
pub const PRIORITY_LEVEL_LOAD: i32 = 20;
/// Scheduler priority of metadata pings.
pub const PRIORITY_PING: i32 = 10;
/// Scheduler priority of DXT cache generation.
pub const PRIORITY_GENERATE: i32 = 5;

// Level 1 is rounded up to a multiple of 2^5 so five further halvings stay
// exact; the pyramid therefore tops out at level 6.
const HALVINGS: u32 = 5;
const SLOT_NEW: u64 = 0;
const SLOT_LOADING: u64 = 1;

/// Everything the pipeline tasks need from the rest of the engine.
#[derive(Clone)]
pub struct AssetContext {
    /// The background worker pool.
    pub scheduler: Arc<Scheduler>,
    /// The process-wide descriptor registry.
    pub resources: Arc<ResourceManager>,
    /// Cache path layout.
    pub cache: Arc<CacheDirs>,
    /// The engine frame clock.
    pub clock: Arc<FrameClock>,
    /// Engine settings (compressed-mipmap toggle, expirations).
    pub settings: RenderSettings,
}

/// The pyramid layout derived by the ping step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    /// The source image's pixel size.
    pub native: Extent2D,
    /// Level 1 size: half the native size rounded up to a multiple of 32.
    pub level1: Extent2D,
    /// Index of the smallest level.
    pub max_level: u32,
    /// Whether the source carries an alpha channel.
    pub has_alpha: bool,
    /// The format level uploads use.
    pub format: PixelFormat,
}

/// The outcome of [`select_level`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSelection {
    /// The level whose resolution best matches the footprint.
    pub level: u32,
    /// Trilinear blend weight toward the next smaller level.
    pub blend: f32,
}

/// Observable state of one level slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelState {
    /// Nothing loaded, no load in flight.
    New,
    /// A load task owns the slot.
    Loading,
    /// Resident; value is the frame number of last use.
    Resident(u64),
}

/// What a renderer gets back from [`Mipmap::request`].
#[derive(Debug, Clone)]
pub struct LevelRequest {
    /// The level the footprint asked for.
    pub wanted: LevelSelection,
    /// The texture to draw with right now, if any level is resident. May be
    /// a coarser or finer placeholder while the wanted level loads.
    pub resident: Option<ResidentLevel>,
    /// Whether this call started a load for the wanted level.
    pub started_load: bool,
}

/// A resident level usable this frame.
#[derive(Debug, Clone)]
pub struct ResidentLevel {
    /// The level index actually returned.
    pub level: u32,
    /// Its pixel size.
    pub extent: Extent2D,
    /// The texture descriptor holding its pixels.
    pub texture: Arc<TextureDesc>,
}

/// Pipeline phase of the whole mipmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Created, ping not yet run.
    New = 0,
    /// Ping scheduled or running.
    Pinging = 1,
    /// DXT cache generation in flight.
    Generating = 2,
    /// Levels can be requested.
    Ready = 3,
    /// The source is missing or undecodable; requests return nothing.
    Invalid = 4,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::New,
            1 => Self::Pinging,
            2 => Self::Generating,
            3 => Self::Ready,
            _ => Self::Invalid,
        }
    }
}

struct LevelSlot {
    epoch: AtomicU64,
    // Engine seconds (*1000) at last touch; drives eviction, which is
    // expressed in seconds while epochs are frame numbers.
    touched_ms: AtomicU64,
    image: Mutex<Option<ResidentLevel>>,
}

impl LevelSlot {
    fn new() -> Self {
        Self {
            epoch: AtomicU64::new(SLOT_NEW),
            touched_ms: AtomicU64::new(0),
            image: Mutex::new(None),
        }
    }
}

/// A lazily loaded multi-level texture pyramid for one source image.
pub struct Mipmap {
    path: PathBuf,
    phase: AtomicU8,
    info: OnceLock<SourceInfo>,
    slots: OnceLock<Vec<LevelSlot>>,
}

/// Rounds half the native size up to a multiple of 32 per side.
pub fn level1_extent(native: Extent2D) -> Extent2D {
    let round = |side: u32| -> u32 {
        let half = side.div_ceil(2);
        half.div_ceil(1 << HALVINGS) << HALVINGS
    };
    Extent2D::new(round(native.width), round(native.height))
}

/// The number of the smallest level for a given level-1 size.
pub fn max_level_for(level1: Extent2D) -> u32 {
    let mut level = 1;
    let mut side = level1.max_side();
    while level < 1 + HALVINGS && side > 1 {
        side >>= 1;
        level += 1;
    }
    level
}

/// The pixel size of `level` (0 = native).
pub fn extent_for_level(info: &SourceInfo, level: u32) -> Extent2D {
    if level == 0 {
        return info.native;
    }
    let shift = level - 1;
    Extent2D::new(
        (info.level1.width >> shift).max(1),
        (info.level1.height >> shift).max(1),
    )
}

/// Maps an on-screen pixel footprint to a level and trilinear blend weight.
///
/// For footprints at or above the level-1 size the native level is returned,
/// blending toward level 1 as the footprint shrinks from native down to
/// level-1 size. Below the smallest level's size the smallest level is
/// returned with no blend. In between, `log2(level1 / footprint)` picks the
/// level and its fractional part is the blend weight.
pub fn select_level(info: &SourceInfo, footprint: f32) -> LevelSelection {
    let native = info.native.max_side() as f32;
    let f = info.level1.max_side() as f32;

    if footprint >= f {
        let blend = if native > f {
            (1.0 - (footprint - f) / (native - f)).max(0.0)
        } else {
            0.0
        };
        return LevelSelection { level: 0, blend };
    }
    if footprint <= f / (1u32 << info.max_level) as f32 || footprint <= 0.0 {
        return LevelSelection {
            level: info.max_level,
            blend: 0.0,
        };
    }

    let t = (f / footprint).log2();
    let level = (t.ceil() as u32).clamp(1, info.max_level);
    let blend = if level == info.max_level { 0.0 } else { t.fract() };
    LevelSelection { level, blend }
}

impl Mipmap {
    /// Creates a mipmap for `path`. Nothing is read until [`Mipmap::start`].
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            phase: AtomicU8::new(Phase::New as u8),
            info: OnceLock::new(),
            slots: OnceLock::new(),
        })
    }

    /// The source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current pipeline phase.
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Whether levels can be requested.
    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    /// Whether the source turned out to be unusable.
    pub fn is_invalid(&self) -> bool {
        self.phase() == Phase::Invalid
    }

    /// The pyramid layout, once the ping has completed.
    pub fn info(&self) -> Option<SourceInfo> {
        self.info.get().copied()
    }

    /// Observable state of one level slot.
    pub fn level_state(&self, level: u32) -> Option<LevelState> {
        let slot = self.slots.get()?.get(level as usize)?;
        Some(match slot.epoch.load(Ordering::Acquire) {
            SLOT_NEW => LevelState::New,
            SLOT_LOADING => LevelState::Loading,
            frame => LevelState::Resident(frame),
        })
    }

    /// Schedules the ping task. Idempotent; only the first call schedules.
    pub fn start(self: &Arc<Self>, ctx: &AssetContext) {
        if self
            .phase
            .compare_exchange(
                Phase::New as u8,
                Phase::Pinging as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }
        let task: Arc<dyn Task> = Arc::new(PingTask {
            mipmap: Arc::clone(self),
            ctx: ctx.clone(),
        });
        if let Err(e) = ctx.scheduler.add(task, PRIORITY_PING) {
            log::warn!("Could not schedule ping for '{}': {e}", self.path.display());
        }
    }

    /// Maps `footprint` to a level, touches it, and returns what is drawable
    /// right now. If the wanted level is cold, a load task is started and
    /// the nearest resident level (preferring smaller ones) is returned as a
    /// placeholder.
    pub fn request(self: &Arc<Self>, ctx: &AssetContext, footprint: f32) -> Option<LevelRequest> {
        if !self.is_ready() {
            return None;
        }
        let info = *self.info.get()?;
        let wanted = select_level(&info, footprint);
        let slots = self.slots.get()?;
        let slot = &slots[wanted.level as usize];

        let now_ms = (ctx.clock.now_secs() * 1_000.0) as u64;
        slot.touched_ms.store(now_ms, Ordering::Release);

        let mut started_load = false;
        let epoch = slot.epoch.load(Ordering::Acquire);
        match epoch {
            SLOT_NEW => {
                if slot
                    .epoch
                    .compare_exchange(SLOT_NEW, SLOT_LOADING, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    started_load = true;
                    self.spawn_level_load(ctx, wanted.level);
                }
            }
            SLOT_LOADING => {}
            _ => {
                // Refresh last-used to the current frame.
                let _ = slot.epoch.compare_exchange(
                    epoch,
                    ctx.clock.frame(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                let image = slot.image.lock().expect("level slot lock poisoned");
                if let Some(resident) = image.clone() {
                    return Some(LevelRequest {
                        wanted,
                        resident: Some(resident),
                        started_load,
                    });
                }
            }
        }

        Some(LevelRequest {
            wanted,
            resident: self.placeholder_near(ctx, wanted.level, info.max_level),
            started_load,
        })
    }

    // Searches outward from `level` for any resident slot, checking coarser
    // levels first at each distance (they are cheapest to have kept).
    fn placeholder_near(
        &self,
        ctx: &AssetContext,
        level: u32,
        max_level: u32,
    ) -> Option<ResidentLevel> {
        let slots = self.slots.get()?;
        for distance in 1..=max_level {
            for candidate in [level as i64 + distance as i64, level as i64 - distance as i64] {
                if candidate < 0 || candidate > max_level as i64 {
                    continue;
                }
                let slot = &slots[candidate as usize];
                let epoch = slot.epoch.load(Ordering::Acquire);
                if epoch > SLOT_LOADING {
                    let _ = slot.epoch.compare_exchange(
                        epoch,
                        ctx.clock.frame(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                    let image = slot.image.lock().expect("level slot lock poisoned");
                    if let Some(resident) = image.clone() {
                        return Some(resident);
                    }
                }
            }
        }
        None
    }

    fn spawn_level_load(self: &Arc<Self>, ctx: &AssetContext, level: u32) {
        let task: Arc<dyn Task> = Arc::new(LevelLoadTask {
            mipmap: Arc::clone(self),
            ctx: ctx.clone(),
            level,
        });
        if let Err(e) = ctx.scheduler.add(task, PRIORITY_LEVEL_LOAD) {
            log::warn!(
                "Could not schedule level {level} load for '{}': {e}",
                self.path.display()
            );
            self.reset_slot(level);
        }
    }

    /// Evicts levels untouched for longer than `expiration_secs`. The
    /// smallest level stays pinned so a placeholder always survives.
    /// Returns how many levels were freed.
    pub fn evict_cold(&self, clock: &FrameClock, expiration_secs: f64) -> usize {
        let Some(info) = self.info.get() else {
            return 0;
        };
        let Some(slots) = self.slots.get() else {
            return 0;
        };
        if expiration_secs <= 0.0 {
            return 0;
        }
        let now_ms = (clock.now_secs() * 1_000.0) as u64;
        let window_ms = (expiration_secs * 1_000.0) as u64;
        let mut freed = 0;

        for (level, slot) in slots.iter().enumerate() {
            if level as u32 == info.max_level {
                continue; // pinned
            }
            let epoch = slot.epoch.load(Ordering::Acquire);
            if epoch <= SLOT_LOADING {
                continue;
            }
            let touched = slot.touched_ms.load(Ordering::Acquire);
            if now_ms.saturating_sub(touched) <= window_ms {
                continue;
            }
            // frame -> LOADING claims the slot, then the image drops and the
            // slot publishes NEW. A racing request that bumped the epoch in
            // between makes the CAS fail and the level survives.
            if slot
                .epoch
                .compare_exchange(epoch, SLOT_LOADING, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let dropped = slot
                    .image
                    .lock()
                    .expect("level slot lock poisoned")
                    .take();
                if let Some(resident) = dropped {
                    // Release the descriptor so GPU caches reap it too.
                    freed += 1;
                    log::debug!(
                        "Evicted level {level} of '{}' (id {:?})",
                        self.path.display(),
                        resident.texture.id()
                    );
                }
                slot.epoch.store(SLOT_NEW, Ordering::Release);
            }
        }
        freed
    }

    fn publish_info(&self, info: SourceInfo) {
        let _ = self.info.set(info);
        let _ = self.slots.set(
            (0..=info.max_level).map(|_| LevelSlot::new()).collect(),
        );
    }

    fn mark_invalid(&self) {
        self.phase.store(Phase::Invalid as u8, Ordering::Release);
    }

    fn reset_slot(&self, level: u32) {
        if let Some(slots) = self.slots.get() {
            slots[level as usize].epoch.store(SLOT_NEW, Ordering::Release);
        }
    }

    fn install_level(
        &self,
        ctx: &AssetContext,
        level: u32,
        extent: Extent2D,
        format: PixelFormat,
        bytes: Vec<u8>,
        translucent: bool,
    ) {
        let texture = ctx.resources.create_texture(TextureInit {
            size: extent.into(),
            format,
            translucent,
            expiration_secs: ctx.settings.handle_expiration_secs,
            pixels: Some(PixelSource::from_vec(bytes)),
            ..TextureInit::default()
        });
        let slots = self.slots.get().expect("slots exist past ping");
        let slot = &slots[level as usize];
        *slot.image.lock().expect("level slot lock poisoned") = Some(ResidentLevel {
            level,
            extent,
            texture,
        });
        // Publish: only the owning load task holds LOADING, so this CAS can
        // only fail if the mipmap was torn down meanwhile.
        if slot
            .epoch
            .compare_exchange(
                SLOT_LOADING,
                ctx.clock.frame(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            *slot.image.lock().expect("level slot lock poisoned") = None;
        }
    }
}

impl std::fmt::Debug for Mipmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mipmap")
            .field("path", &self.path)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Pipeline tasks
// ---------------------------------------------------------------------------

struct PingTask {
    mipmap: Arc<Mipmap>,
    ctx: AssetContext,
}

impl Task for PingTask {
    fn run(&self, run: &TaskRun) {
        run.finish();
        if !run.should_continue() {
            return;
        }
        match ping(&self.mipmap.path) {
            Ok((native, has_alpha)) => {
                let level1 = level1_extent(native);
                let max_level = max_level_for(level1);
                let format = if self.ctx.settings.use_compressed_mipmaps {
                    dxt::format_for_alpha(has_alpha)
                } else {
                    PixelFormat::Rgba8
                };
                self.mipmap.publish_info(SourceInfo {
                    native,
                    level1,
                    max_level,
                    has_alpha,
                    format,
                });

                if self.ctx.settings.use_compressed_mipmaps
                    && !cache_complete(&self.ctx, &self.mipmap)
                {
                    self.mipmap
                        .phase
                        .store(Phase::Generating as u8, Ordering::Release);
                    let task: Arc<dyn Task> = Arc::new(GenerateTask {
                        mipmap: Arc::clone(&self.mipmap),
                        ctx: self.ctx.clone(),
                    });
                    if let Err(e) = self.ctx.scheduler.add(task, PRIORITY_GENERATE) {
                        log::warn!(
                            "Could not schedule cache generation for '{}': {e}",
                            self.mipmap.path.display()
                        );
                        self.mipmap.mark_invalid();
                    }
                } else {
                    self.mipmap.phase.store(Phase::Ready as u8, Ordering::Release);
                }
            }
            Err(e) => {
                log::error!("Ping of '{}' failed: {e}", self.mipmap.path.display());
                self.mipmap.mark_invalid();
            }
        }
    }

    fn name(&self) -> &str {
        "mipmap-ping"
    }
}

struct GenerateTask {
    mipmap: Arc<Mipmap>,
    ctx: AssetContext,
}

impl Task for GenerateTask {
    fn run(&self, run: &TaskRun) {
        run.finish();
        match generate_cache(&self.ctx, &self.mipmap, run) {
            Ok(true) => self
                .mipmap
                .phase
                .store(Phase::Ready as u8, Ordering::Release),
            Ok(false) => {} // cancelled mid-way; a later start may retry
            Err(e) => {
                log::error!(
                    "Cache generation for '{}' failed: {e}",
                    self.mipmap.path.display()
                );
                self.mipmap.mark_invalid();
            }
        }
    }

    fn name(&self) -> &str {
        "mipmap-generate"
    }
}

struct LevelLoadTask {
    mipmap: Arc<Mipmap>,
    ctx: AssetContext,
    level: u32,
}

impl Task for LevelLoadTask {
    fn run(&self, run: &TaskRun) {
        run.finish();
        if !run.should_continue() {
            self.mipmap.reset_slot(self.level);
            return;
        }
        if let Err(e) = load_level(&self.ctx, &self.mipmap, self.level) {
            // Back to NEW so a later request retries.
            log::error!(
                "Loading level {} of '{}' failed: {e}",
                self.level,
                self.mipmap.path.display()
            );
            self.mipmap.reset_slot(self.level);
        }
    }

    fn name(&self) -> &str {
        "mipmap-level-load"
    }
}

// ---------------------------------------------------------------------------
// Task bodies
// ---------------------------------------------------------------------------

fn ping(path: &Path) -> Result<(Extent2D, bool), AssetError> {
    let reader = image::ImageReader::open(path)
        .map_err(|e| AssetError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| AssetError::io(path, e))?;
    let (width, height) = reader.into_dimensions().map_err(|e| AssetError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if width == 0 || height == 0 {
        return Err(AssetError::Decode {
            path: path.to_path_buf(),
            reason: "degenerate image size".into(),
        });
    }
    // Alpha is only knowable cheaply from the color type, which `image`
    // exposes on decode; PNG is the only alpha-bearing source the engine
    // feeds this pipeline, so extension is a reliable signal here.
    let has_alpha = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    Ok((Extent2D::new(width, height), has_alpha))
}

// A cache entry is only usable if it postdates the source it was cut from;
// an edited source regenerates its chain on the next ping.
fn entry_is_fresh(entry: &Path, source_modified: Option<SystemTime>) -> bool {
    let Ok(meta) = fs::metadata(entry) else {
        return false;
    };
    match (meta.modified().ok(), source_modified) {
        (Some(entry_time), Some(source_time)) => entry_time >= source_time,
        // Filesystems without mtimes fall back to existence.
        _ => true,
    }
}

fn source_modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

fn cache_complete(ctx: &AssetContext, mipmap: &Mipmap) -> bool {
    let Some(info) = mipmap.info.get() else {
        return false;
    };
    let modified = source_modified(&mipmap.path);
    (0..=info.max_level).all(|level| {
        entry_is_fresh(&ctx.cache.level_entry(&mipmap.path, level, "dds"), modified)
    })
}

fn generate_cache(ctx: &AssetContext, mipmap: &Mipmap, run: &TaskRun) -> Result<bool, AssetError> {
    let info = *mipmap.info.get().expect("generate runs after ping");
    let decoded = image::open(&mipmap.path)
        .map_err(|e| AssetError::Decode {
            path: mipmap.path.clone(),
            reason: e.to_string(),
        })?
        .into_rgba8();
    let modified = source_modified(&mipmap.path);

    for level in 0..=info.max_level {
        if !run.should_continue() {
            return Ok(false);
        }
        let entry = ctx.cache.level_entry(&mipmap.path, level, "dds");
        if entry_is_fresh(&entry, modified) {
            continue;
        }
        let extent = extent_for_level(&info, level);
        let surface = if extent == info.native {
            decoded.clone()
        } else {
            image::imageops::resize(&decoded, extent.width, extent.height, FilterType::Triangle)
        };
        let blocks = dxt::encode_surface(info.format, extent.width, extent.height, &surface);
        dds::write(
            &entry,
            &DdsFile {
                format: info.format,
                width: extent.width,
                height: extent.height,
                levels: vec![blocks],
            },
        )?;
        log::debug!(
            "Cached level {level} of '{}' as {}",
            mipmap.path.display(),
            entry.display()
        );
    }
    Ok(true)
}

fn load_level(ctx: &AssetContext, mipmap: &Mipmap, level: u32) -> Result<(), AssetError> {
    let info = *mipmap.info.get().expect("load runs after ping");
    let extent = extent_for_level(&info, level);

    if info.format.is_compressed() {
        let entry = ctx.cache.level_entry(&mipmap.path, level, "dds");
        let file = dds::read(&entry)?;
        if (file.width, file.height) != (extent.width, extent.height) || file.format != info.format
        {
            return Err(AssetError::InvalidContainer {
                path: entry,
                reason: format!(
                    "expected {}x{} {:?}, found {}x{} {:?}",
                    extent.width, extent.height, info.format, file.width, file.height, file.format
                ),
            });
        }
        let bytes = file.levels.into_iter().next().ok_or_else(|| {
            AssetError::InvalidContainer {
                path: ctx.cache.level_entry(&mipmap.path, level, "dds"),
                reason: "no surface payload".into(),
            }
        })?;
        mipmap.install_level(ctx, level, extent, info.format, bytes, info.has_alpha);
    } else {
        let decoded = image::open(&mipmap.path)
            .map_err(|e| AssetError::Decode {
                path: mipmap.path.clone(),
                reason: e.to_string(),
            })?
            .into_rgba8();
        let surface = if extent == info.native {
            decoded
        } else {
            image::imageops::resize(&decoded, extent.width, extent.height, FilterType::Triangle)
        };
        mipmap.install_level(
            ctx,
            level,
            extent,
            PixelFormat::Rgba8,
            surface.into_raw(),
            info.has_alpha,
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_1024() -> SourceInfo {
        let native = Extent2D::new(1024, 1024);
        let level1 = level1_extent(native);
        SourceInfo {
            native,
            level1,
            max_level: max_level_for(level1),
            has_alpha: false,
            format: PixelFormat::Dxt1,
        }
    }

    #[test]
    fn layout_of_1024_square() {
        let info = info_1024();
        assert_eq!(info.level1, Extent2D::new(512, 512));
        assert_eq!(info.max_level, 6);
        assert_eq!(extent_for_level(&info, 6), Extent2D::new(16, 16));
    }

    #[test]
    fn level1_rounds_up_to_32() {
        let lvl1 = level1_extent(Extent2D::new(1000, 70));
        assert_eq!(lvl1, Extent2D::new(512, 64));
        let lvl1 = level1_extent(Extent2D::new(66, 66));
        assert_eq!(lvl1, Extent2D::new(64, 64));
    }

    #[test]
    fn footprint_300_of_1024_selects_level_1() {
        let info = info_1024();
        let sel = select_level(&info, 300.0);
        assert_eq!(sel.level, 1);
        let expected = (512.0f32 / 300.0).log2();
        assert!((sel.blend - expected).abs() < 1e-4, "blend {}", sel.blend);
        assert!((sel.blend - 0.77).abs() < 0.01);
    }

    #[test]
    fn native_footprint_selects_level_0() {
        let info = info_1024();
        assert_eq!(select_level(&info, 1024.0), LevelSelection { level: 0, blend: 0.0 });
        let at_f = select_level(&info, 512.0);
        assert_eq!(at_f.level, 0);
        assert!((at_f.blend - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tiny_footprint_selects_max_level() {
        let info = info_1024();
        let sel = select_level(&info, 4.0);
        assert_eq!(sel.level, info.max_level);
        assert_eq!(sel.blend, 0.0);
    }

    // Larger footprints never select a smaller (higher-index) level.
    #[test]
    fn selection_is_monotonic_in_footprint() {
        let info = info_1024();
        let mut last_level = u32::MAX;
        for p in 1..1600 {
            let sel = select_level(&info, p as f32);
            assert!(
                sel.level <= last_level,
                "footprint {p} jumped from level {last_level} to {}",
                sel.level
            );
            last_level = sel.level;
        }
    }

    // The 32-alignment floor means even tiny sources get a full pyramid
    // whose smallest level bottoms out at one pixel.
    #[test]
    fn tiny_sources_still_round_up() {
        let lvl1 = level1_extent(Extent2D::new(40, 40));
        assert_eq!(lvl1, Extent2D::new(32, 32));
        assert_eq!(max_level_for(lvl1), 6);
        let info = SourceInfo {
            native: Extent2D::new(40, 40),
            level1: lvl1,
            max_level: 6,
            has_alpha: false,
            format: PixelFormat::Dxt1,
        };
        assert_eq!(extent_for_level(&info, 6), Extent2D::new(1, 1));
    }
}
