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

//! End-to-end recording and replay against the headless driver.

use ember_core::pipeline::{BlendState, ClearFlags, ClearValue, PrimitiveTopology, Viewport};
use ember_core::resource::{BufferKind, UsageHint};
use ember_core::{FrameClock, Rect, RenderSettings, ResourceId, ResourceManager};
use ember_render::{
    CallRecord, DrawSpec, HeadlessDriver, RenderContext, StateKey, MAX_TEXTURE_UNITS,
};
use std::sync::Arc;

const UNIFORM_ALIGN: usize = 256;

struct Fixture {
    resources: Arc<ResourceManager>,
    clock: Arc<FrameClock>,
    ctx: RenderContext,
    driver: HeadlessDriver,
}

fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let resources = Arc::new(ResourceManager::new());
    let clock = Arc::new(FrameClock::new());
    let ctx = RenderContext::new(
        Arc::clone(&resources),
        Arc::clone(&clock),
        RenderSettings::default(),
        UNIFORM_ALIGN,
    );
    Fixture {
        resources,
        clock,
        ctx,
        driver: HeadlessDriver::new(),
    }
}

impl Fixture {
    fn key(&self, program: ResourceId, vertex_array: ResourceId) -> StateKey {
        StateKey {
            program,
            vertex_array,
            textures: [ResourceId::INVALID; MAX_TEXTURE_UNITS],
        }
    }

    // A program and an (empty) vertex array to draw with.
    fn drawable(&self) -> (ResourceId, ResourceId) {
        let program = self.resources.create_program(Vec::new(), 0.0).id();
        let vao = self.resources.create_vertex_array(Vec::new(), None, 0.0).id();
        (program, vao)
    }

    // Records a trivial non-indexed draw with a distinguishing vertex count.
    fn draw(&mut self, key: StateKey, count: u32, translucent: bool) {
        let cmd = self
            .ctx
            .create_render_command(&DrawSpec {
                topology: PrimitiveTopology::Triangles,
                vertex_count: count,
                ..DrawSpec::default()
            })
            .expect("ring pools rejected a trivial draw");
        self.ctx.submit(key, cmd, translucent);
    }
}

fn draw_counts(driver: &HeadlessDriver) -> Vec<u32> {
    driver.draws().iter().map(|p| p.count).collect()
}

#[test]
fn opaque_groups_replay_newest_first_then_translucent_in_order() {
    let mut f = fixture();
    let (p1, vao) = f.drawable();
    let p2 = f.resources.create_program(Vec::new(), 0.0).id();
    let key1 = f.key(p1, vao);
    let key2 = f.key(p2, vao);

    f.ctx.clear(
        ClearFlags::COLOR.with(ClearFlags::DEPTH),
        ClearValue::default(),
    );
    // Interleaved submissions; replay regroups them by key.
    f.draw(key1.clone(), 3, false);
    f.draw(key2.clone(), 12, false);
    f.draw(key1.clone(), 6, false);
    f.draw(key2.clone(), 15, false);
    f.draw(key1.clone(), 9, false);

    f.ctx.set_blend(BlendState::ADD);
    f.draw(key1.clone(), 18, true);
    f.draw(key2.clone(), 21, true);

    f.ctx.flush(&mut f.driver);

    // Opaque groups in first-key order, newest submission first inside each
    // group; translucent draws keep their exact order.
    assert_eq!(draw_counts(&f.driver), vec![9, 6, 3, 15, 12, 18, 21]);

    let calls = f.driver.calls();
    let clear_at = calls
        .iter()
        .position(|c| matches!(c, CallRecord::Clear(..)))
        .expect("no clear recorded");
    let first_draw_at = calls
        .iter()
        .position(|c| matches!(c, CallRecord::Draw(_)))
        .unwrap();
    assert!(clear_at < first_draw_at);

    // The blend change sits between the opaque and translucent draws.
    let blend_at = calls
        .iter()
        .position(|c| matches!(c, CallRecord::SetBlend(s) if *s == BlendState::ADD))
        .expect("additive blend never applied");
    let opaque_last = calls
        .iter()
        .position(|c| matches!(c, CallRecord::Draw(p) if p.count == 12))
        .unwrap();
    let translucent_first = calls
        .iter()
        .position(|c| matches!(c, CallRecord::Draw(p) if p.count == 18))
        .unwrap();
    assert!(opaque_last < blend_at && blend_at < translucent_first);
}

#[test]
fn pipeline_command_is_a_barrier_between_draws() {
    let mut f = fixture();
    let (program, vao) = f.drawable();
    let key = f.key(program, vao);

    f.draw(key.clone(), 3, false);
    f.ctx
        .set_viewport(Viewport::of(Rect::new(0, 0, 640, 480)));
    f.draw(key.clone(), 6, false);

    f.ctx.flush(&mut f.driver);

    let calls = f.driver.calls();
    let first = calls
        .iter()
        .position(|c| matches!(c, CallRecord::Draw(p) if p.count == 3))
        .unwrap();
    let viewport_at = calls
        .iter()
        .position(|c| matches!(c, CallRecord::SetViewport(_)))
        .unwrap();
    let second = calls
        .iter()
        .position(|c| matches!(c, CallRecord::Draw(p) if p.count == 6))
        .unwrap();
    assert!(first < viewport_at && viewport_at < second);
}

#[test]
fn depth_values_decrease_within_unit_range() {
    let mut f = fixture();
    let (program, vao) = f.drawable();
    let key = f.key(program, vao);

    // Warm-up frame establishes the per-draw depth step.
    for count in [3, 3, 3, 3] {
        f.draw(key.clone(), count, false);
    }
    f.ctx.flush(&mut f.driver);

    let spec = DrawSpec {
        vertex_count: 3,
        ..DrawSpec::default()
    };
    let mut depths = Vec::new();
    for _ in 0..4 {
        let cmd = f.ctx.create_render_command(&spec).unwrap();
        depths.push(cmd.depth);
        f.ctx.submit(key.clone(), cmd, false);
    }
    f.ctx.flush(&mut f.driver);

    assert!((depths[0] - 0.99999).abs() < 1e-6);
    for pair in depths.windows(2) {
        assert!(pair[1] < pair[0], "depth must strictly decrease: {depths:?}");
    }
    for d in &depths {
        assert!((0.0..1.0).contains(d), "depth out of range: {d}");
    }
}

#[test]
fn per_draw_uniforms_bind_aligned_ring_ranges() {
    let mut f = fixture();
    let (program, vao) = f.drawable();
    let key = f.key(program, vao);

    let block = [7u8; 64];
    for _ in 0..2 {
        let cmd = f
            .ctx
            .create_render_command(&DrawSpec {
                vertex_count: 3,
                uniforms: Some(&block),
                uniform_slot: 1,
                ..DrawSpec::default()
            })
            .unwrap();
        f.ctx.submit(key.clone(), cmd, false);
    }
    f.ctx.flush(&mut f.driver);

    let ranges: Vec<(u32, usize, usize)> = f
        .driver
        .calls()
        .iter()
        .filter_map(|c| match c {
            CallRecord::BindUniformRange(slot, _, offset, size) => Some((*slot, *offset, *size)),
            _ => None,
        })
        .collect();
    // 64-byte blocks round up to the 256-byte UBO offset alignment, and the
    // two draws replay newest-first.
    assert_eq!(ranges, vec![(1, 256, 256), (1, 0, 256)]);

    // The ring slab's staged writes were uploaded before the draws read
    // them.
    let calls = f.driver.calls();
    let upload_at = calls
        .iter()
        .position(|c| matches!(c, CallRecord::UploadBuffer(..)))
        .expect("uniform slab never uploaded");
    let first_draw_at = calls
        .iter()
        .position(|c| matches!(c, CallRecord::Draw(_)))
        .unwrap();
    assert!(upload_at < first_draw_at);
}

#[test]
fn handles_are_created_once_and_reap_on_release() {
    let mut f = fixture();
    let buffer = f
        .resources
        .create_buffer(BufferKind::Vertex, 64, UsageHint::STATIC_DRAW, 0.0);
    buffer.write(0, &[1u8; 64]);
    let vao = f
        .resources
        .create_vertex_array(
            vec![ember_core::resource::VertexBinding {
                buffer: buffer.id(),
                layout: ember_core::resource::VertexLayout::new(Vec::new()),
            }],
            None,
            0.0,
        )
        .id();
    let program = f.resources.create_program(Vec::new(), 0.0).id();
    let key = f.key(program, vao);

    f.draw(key.clone(), 3, false);
    f.ctx.flush(&mut f.driver);
    let creates = |d: &HeadlessDriver| {
        d.calls()
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    CallRecord::CreateBuffer(..)
                        | CallRecord::CreateProgram(_)
                        | CallRecord::CreateVertexArray(_)
                )
            })
            .count()
    };
    assert_eq!(creates(&f.driver), 3);

    // Second frame reuses every handle.
    f.driver.reset_log();
    f.draw(key.clone(), 3, false);
    f.ctx.flush(&mut f.driver);
    assert_eq!(creates(&f.driver), 0);

    // Releasing the descriptors reaps the handles on the next flush, the
    // buffer included once the vertex array stops pinning it.
    assert!(f.resources.release(vao));
    assert!(f.resources.release(buffer.id()));
    assert!(f.resources.release(program));
    f.driver.reset_log();
    f.ctx.flush(&mut f.driver);
    let calls = f.driver.calls();
    assert!(calls
        .iter()
        .any(|c| matches!(c, CallRecord::DeleteVertexArray(_))));
    assert!(calls.iter().any(|c| matches!(c, CallRecord::DeleteBuffer(_))));
    assert!(calls
        .iter()
        .any(|c| matches!(c, CallRecord::DeleteProgram(_))));
}

#[test]
fn content_changes_reupload_without_recreating() {
    let mut f = fixture();
    let buffer = f
        .resources
        .create_buffer(BufferKind::Vertex, 64, UsageHint::DYNAMIC_DRAW, 0.0);
    buffer.write(0, &[1u8; 64]);
    let vao = f
        .resources
        .create_vertex_array(
            vec![ember_core::resource::VertexBinding {
                buffer: buffer.id(),
                layout: ember_core::resource::VertexLayout::new(Vec::new()),
            }],
            None,
            0.0,
        )
        .id();
    let program = f.resources.create_program(Vec::new(), 0.0).id();
    let key = f.key(program, vao);

    f.draw(key.clone(), 3, false);
    f.ctx.flush(&mut f.driver);

    buffer.write(0, &[2u8; 64]);
    f.driver.reset_log();
    f.draw(key.clone(), 3, false);
    f.ctx.flush(&mut f.driver);

    let calls = f.driver.calls();
    assert!(!calls
        .iter()
        .any(|c| matches!(c, CallRecord::CreateBuffer(..))));
    assert!(calls
        .iter()
        .any(|c| matches!(c, CallRecord::UploadBuffer(..))));
}

#[test]
fn idle_handles_expire_after_their_window() {
    let mut f = fixture();
    let program = f.resources.create_program(Vec::new(), 1.0).id();
    let vao = f.resources.create_vertex_array(Vec::new(), None, 1.0).id();
    let key = f.key(program, vao);

    f.draw(key.clone(), 3, false);
    f.ctx.flush(&mut f.driver);

    // Idle past the expiration window; descriptors stay registered.
    f.clock.skew_by_secs(2.0);
    f.driver.reset_log();
    f.ctx.flush(&mut f.driver);
    let calls = f.driver.calls();
    assert!(calls
        .iter()
        .any(|c| matches!(c, CallRecord::DeleteProgram(_))));
    assert!(calls
        .iter()
        .any(|c| matches!(c, CallRecord::DeleteVertexArray(_))));

    // Drawing again rebuilds the handles transparently.
    f.driver.reset_log();
    f.draw(key.clone(), 3, false);
    f.ctx.flush(&mut f.driver);
    assert!(f
        .driver
        .calls()
        .iter()
        .any(|c| matches!(c, CallRecord::CreateProgram(_))));
}

#[test]
fn streamed_geometry_lands_in_ring_slabs() {
    let mut f = fixture();
    let (program, _) = f.drawable();

    // Stream two quads' worth of vertices; both draws share the slab the
    // first allocation created.
    let vertices = [0u8; 4 * 16];
    let cmd1 = f
        .ctx
        .create_render_command(&DrawSpec {
            vertices: Some(ember_render::VertexData {
                bytes: &vertices,
                stride: 16,
            }),
            indices: Some(&[0, 1, 2, 2, 1, 3]),
            ..DrawSpec::default()
        })
        .unwrap();
    let slab = cmd1.vertices.as_ref().unwrap().buffer.id();
    let cmd2 = f
        .ctx
        .create_render_command(&DrawSpec {
            vertices: Some(ember_render::VertexData {
                bytes: &vertices,
                stride: 16,
            }),
            indices: Some(&[0, 1, 2, 2, 1, 3]),
            ..DrawSpec::default()
        })
        .unwrap();
    assert_eq!(slab, cmd2.vertices.as_ref().unwrap().buffer.id());
    // The second draw starts after the first one's four vertices.
    assert_eq!(cmd2.params.base_vertex, 4);
    assert_eq!(cmd2.params.count, 6);
    assert!(cmd2.params.indexed);

    // A vertex array over the slab makes the stream drawable.
    let vao = f
        .resources
        .create_vertex_array(
            vec![ember_core::resource::VertexBinding {
                buffer: slab,
                layout: ember_core::resource::VertexLayout::new(Vec::new()),
            }],
            None,
            0.0,
        )
        .id();
    let key = f.key(program, vao);
    f.ctx.submit(key.clone(), cmd1, false);
    f.ctx.submit(key, cmd2, false);
    f.ctx.flush(&mut f.driver);

    assert_eq!(f.driver.draws().len(), 2);
}
