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

//! Frames the render pass state of a frame.

use crate::render_pass_state::RenderPassState;
use strata_core::math::Viewport;
use strata_core::token::{context_keys, prim_types, scene_keys};
use strata_core::{DirtyBits, PrimPath, TaskContext, Token};
use strata_data::{RenderIndex, Task, TaskError};

/// Inputs of a [`RenderSetupTask`], read from its scene delegate.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSetupParams {
    /// Camera sprim to frame with. `None` uses the fallback camera.
    pub camera_id: Option<PrimPath>,
    /// Target rectangle.
    pub viewport: Viewport,
    /// Render tags drawn. Empty draws every tag.
    pub render_tags: Vec<Token>,
    /// Color of wire reprs.
    pub wireframe_color: [f32; 4],
}

impl Default for RenderSetupParams {
    fn default() -> Self {
        Self {
            camera_id: None,
            viewport: Viewport::default(),
            render_tags: Vec::new(),
            wireframe_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Publishes a [`RenderPassState`] under
/// [`context_keys::RENDER_PASS_STATE`] for the render tasks that follow.
///
/// Params are pulled from the scene delegate the task was inserted through,
/// under [`scene_keys::TASK_PARAMS`], whenever they are marked dirty. The
/// camera is read on every sync since sprims sync first.
#[derive(Debug)]
pub struct RenderSetupTask {
    id: PrimPath,
    params: RenderSetupParams,
    state: RenderPassState,
}

impl RenderSetupTask {
    /// Creates a task whose params come from the scene.
    pub fn new(id: PrimPath) -> Self {
        Self::with_params(id, RenderSetupParams::default())
    }

    /// Creates a task with initial params.
    pub fn with_params(id: PrimPath, params: RenderSetupParams) -> Self {
        Self {
            id,
            params,
            state: RenderPassState::default(),
        }
    }

    /// Current params.
    pub fn params(&self) -> &RenderSetupParams {
        &self.params
    }

    /// State published by the last sync.
    pub fn state(&self) -> &RenderPassState {
        &self.state
    }

    fn pull_params(&mut self, index: &RenderIndex) -> Result<(), TaskError> {
        let scene_delegate =
            index
                .scene_delegate_for_task(&self.id)
                .ok_or_else(|| TaskError::InvalidParams {
                    task: self.id.clone(),
                    reason: "scene delegate is gone".to_string(),
                })?;
        let value = scene_delegate
            .get(&self.id, &scene_keys::TASK_PARAMS)
            .ok_or_else(|| TaskError::InvalidParams {
                task: self.id.clone(),
                reason: "no params authored".to_string(),
            })?;
        self.params =
            value
                .cloned::<RenderSetupParams>()
                .ok_or_else(|| TaskError::InvalidParams {
                    task: self.id.clone(),
                    reason: format!("expected render setup params, found {}", value.type_name()),
                })?;
        log::debug!("RenderSetupTask {}: params updated", self.id);
        Ok(())
    }

    fn frame_camera(&mut self, index: &RenderIndex) {
        let camera = self.params.camera_id.as_ref().and_then(|camera_id| {
            let camera = index.get_sprim(&prim_types::CAMERA, camera_id);
            if camera.is_none() {
                log::warn!(
                    "RenderSetupTask {}: camera {camera_id} not found, using the fallback camera",
                    self.id
                );
            }
            camera.map(|camera| (camera_id.clone(), camera))
        });
        match camera {
            Some((camera_id, camera)) => self.state.set_camera(Some(camera_id), camera),
            None => {
                if let Some(fallback) = index.fallback_sprim(&prim_types::CAMERA) {
                    self.state.set_camera(None, fallback);
                }
            }
        }
    }
}

impl Task for RenderSetupTask {
    fn id(&self) -> &PrimPath {
        &self.id
    }

    fn sync(&mut self, index: &mut RenderIndex, ctx: &mut TaskContext) -> Result<(), TaskError> {
        let bits = index.change_tracker().task_dirty_bits(&self.id);
        if bits.contains(DirtyBits::DIRTY_PARAMS) {
            self.pull_params(index)?;
            index
                .change_tracker_mut()
                .mark_task_clean(&self.id, bits.without(DirtyBits::DIRTY_PARAMS));
        }

        // The viewport must be set before the camera so the projection is
        // conformed to the right aspect.
        self.state.set_viewport(self.params.viewport);
        self.state.set_render_tags(self.params.render_tags.clone());
        self.state.set_wireframe_color(self.params.wireframe_color);
        self.frame_camera(index);

        ctx.insert(context_keys::RENDER_PASS_STATE, self.state.clone());
        Ok(())
    }

    fn execute(&mut self, _index: &RenderIndex, _ctx: &mut TaskContext) -> Result<(), TaskError> {
        Ok(())
    }
}
