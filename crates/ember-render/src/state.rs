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

//! Redundant-bind elimination.
//!
//! Tracks what the driver last bound and short-circuits repeat binds, so
//! replaying a grouped segment touches the API once per distinct state.

use crate::command::MAX_TEXTURE_UNITS;
use ember_core::pipeline::{BlendState, CullMode, DepthState, FrontFace, StencilState};
use ember_core::{GlDriver, RawFramebuffer, RawProgram, RawTexture, RawVertexArray};

/// Last-bound GPU state, mirrored CPU-side.
#[derive(Debug, Default)]
pub struct StateCache {
    program: Option<RawProgram>,
    vertex_array: Option<RawVertexArray>,
    framebuffer: Option<RawFramebuffer>,
    textures: [Option<RawTexture>; MAX_TEXTURE_UNITS],
    blend: Option<BlendState>,
    depth: Option<DepthState>,
    stencil: Option<StencilState>,
    cull: Option<CullMode>,
    front_face: Option<FrontFace>,
}

impl StateCache {
    /// Creates a cache with nothing assumed bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `program` unless it already is.
    pub fn bind_program(&mut self, driver: &mut dyn GlDriver, program: Option<RawProgram>) {
        if self.program != program {
            driver.bind_program(program);
            self.program = program;
        }
    }

    /// Binds `vertex_array` unless it already is.
    pub fn bind_vertex_array(
        &mut self,
        driver: &mut dyn GlDriver,
        vertex_array: Option<RawVertexArray>,
    ) {
        if self.vertex_array != vertex_array {
            driver.bind_vertex_array(vertex_array);
            self.vertex_array = vertex_array;
        }
    }

    /// Binds `framebuffer` unless it already is.
    pub fn bind_framebuffer(
        &mut self,
        driver: &mut dyn GlDriver,
        framebuffer: Option<RawFramebuffer>,
    ) {
        if self.framebuffer != framebuffer {
            driver.bind_framebuffer(framebuffer);
            self.framebuffer = framebuffer;
        }
    }

    /// Binds `texture` to `unit` unless it already is.
    pub fn bind_texture(&mut self, driver: &mut dyn GlDriver, unit: u32, texture: Option<RawTexture>) {
        let slot = unit as usize;
        debug_assert!(slot < MAX_TEXTURE_UNITS);
        if self.textures[slot] != texture {
            driver.bind_texture(unit, texture);
            self.textures[slot] = texture;
        }
    }

    /// Applies `state` unless it is already in effect.
    pub fn set_blend(&mut self, driver: &mut dyn GlDriver, state: &BlendState) {
        if self.blend != Some(*state) {
            driver.set_blend(state);
            self.blend = Some(*state);
        }
    }

    /// Applies `state` unless it is already in effect.
    pub fn set_depth(&mut self, driver: &mut dyn GlDriver, state: &DepthState) {
        if self.depth != Some(*state) {
            driver.set_depth(state);
            self.depth = Some(*state);
        }
    }

    /// Applies `state` unless it is already in effect.
    pub fn set_stencil(&mut self, driver: &mut dyn GlDriver, state: &StencilState) {
        if self.stencil != Some(*state) {
            driver.set_stencil(state);
            self.stencil = Some(*state);
        }
    }

    /// Applies `mode` unless it is already in effect.
    pub fn set_cull(&mut self, driver: &mut dyn GlDriver, mode: CullMode) {
        if self.cull != Some(mode) {
            driver.set_cull(mode);
            self.cull = Some(mode);
        }
    }

    /// Applies `front` unless it is already in effect.
    pub fn set_front_face(&mut self, driver: &mut dyn GlDriver, front: FrontFace) {
        if self.front_face != Some(front) {
            driver.set_front_face(front);
            self.front_face = Some(front);
        }
    }

    /// Forgets everything the cache believes is bound. Call after external
    /// code may have touched the context behind our back.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// Asserts the fixed-function defaults a frame starts from and resets
    /// the mirror to them. The guaranteed baseline: opaque blend, depth
    /// test and write on, stencil off, back-face culling,
    /// counter-clockwise front faces.
    pub fn set_default_state(&mut self, driver: &mut dyn GlDriver) {
        self.invalidate();
        driver.set_blend(&BlendState::OPAQUE);
        driver.set_depth(&DepthState::default());
        driver.set_stencil(&StencilState::default());
        driver.set_cull(CullMode::Back);
        driver.set_front_face(FrontFace::CounterClockwise);
        driver.set_scissor(None);
        self.blend = Some(BlendState::OPAQUE);
        self.depth = Some(DepthState::default());
        self.stencil = Some(StencilState::default());
        self.cull = Some(CullMode::Back);
        self.front_face = Some(FrontFace::CounterClockwise);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{CallRecord, HeadlessDriver};

    fn blend_records(driver: &HeadlessDriver) -> usize {
        driver
            .calls()
            .iter()
            .filter(|c| matches!(c, CallRecord::SetBlend(_)))
            .count()
    }

    #[test]
    fn repeated_identical_state_is_set_once() {
        let mut driver = HeadlessDriver::new();
        let mut cache = StateCache::new();
        cache.set_blend(&mut driver, &BlendState::ALPHA);
        cache.set_blend(&mut driver, &BlendState::ALPHA);
        cache.set_blend(&mut driver, &BlendState::ALPHA);
        assert_eq!(blend_records(&driver), 1);

        cache.set_blend(&mut driver, &BlendState::ADD);
        assert_eq!(blend_records(&driver), 2);
    }

    #[test]
    fn default_state_is_remembered_by_the_mirror() {
        let mut driver = HeadlessDriver::new();
        let mut cache = StateCache::new();
        cache.set_default_state(&mut driver);
        let total = driver.calls().len();

        // Re-asserting the baseline must not touch the driver again.
        cache.set_blend(&mut driver, &BlendState::OPAQUE);
        cache.set_depth(&mut driver, &DepthState::default());
        cache.set_cull(&mut driver, CullMode::Back);
        assert_eq!(driver.calls().len(), total);

        cache.invalidate();
        cache.set_blend(&mut driver, &BlendState::OPAQUE);
        assert_eq!(driver.calls().len(), total + 1);
    }

    #[test]
    fn repeated_binds_short_circuit() {
        let mut driver = HeadlessDriver::new();
        let mut cache = StateCache::new();
        let program = Some(ember_core::RawProgram(7));
        cache.bind_program(&mut driver, program);
        cache.bind_program(&mut driver, program);
        assert_eq!(driver.calls().len(), 1);

        cache.bind_program(&mut driver, None);
        assert_eq!(driver.calls().len(), 2);
    }
}
