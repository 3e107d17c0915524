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

//! Camera and raster state shared by the passes of a frame.

use strata_core::math::{DMat4, DVec4, Viewport};
use strata_core::token::camera_values;
use strata_core::{PassParams, PrimPath, Sprim, Token, WindowPolicy};

/// Camera framing, viewport and filtering used to execute render passes.
///
/// Published in the task context by a setup task and read by every render
/// task of the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassState {
    camera_id: Option<PrimPath>,
    view_matrix: DMat4,
    projection_matrix: DMat4,
    viewport: Viewport,
    clip_planes: Vec<DVec4>,
    wireframe_color: [f32; 4],
    render_tags: Vec<Token>,
}

impl Default for RenderPassState {
    fn default() -> Self {
        Self {
            camera_id: None,
            view_matrix: DMat4::IDENTITY,
            projection_matrix: DMat4::IDENTITY,
            viewport: Viewport::default(),
            clip_planes: Vec::new(),
            wireframe_color: [0.0, 0.0, 0.0, 1.0],
            render_tags: Vec::new(),
        }
    }
}

impl RenderPassState {
    /// Creates a state with identity matrices and the default viewport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads matrices and clip planes from a camera sprim.
    ///
    /// The projection is conformed to the current viewport with the camera's
    /// window policy. Values the camera does not provide keep their previous
    /// setting.
    ///
    /// # Arguments
    ///
    /// * `camera_id`: The camera path, or `None` when `camera` is a fallback.
    /// * `camera`: The camera sprim to read from.
    pub fn set_camera(&mut self, camera_id: Option<PrimPath>, camera: &dyn Sprim) {
        self.camera_id = camera_id;
        if let Some(view) = camera
            .get(&camera_values::WORLD_TO_VIEW_MATRIX)
            .and_then(|v| v.cloned::<DMat4>())
        {
            self.view_matrix = view;
        }
        let policy = camera
            .get(&camera_values::WINDOW_POLICY)
            .and_then(|v| v.cloned::<WindowPolicy>())
            .unwrap_or_default();
        if let Some(projection) = camera
            .get(&camera_values::PROJECTION_MATRIX)
            .and_then(|v| v.cloned::<DMat4>())
        {
            self.projection_matrix = policy.conform(projection, self.viewport.aspect_ratio());
        }
        if let Some(planes) = camera
            .get(&camera_values::CLIP_PLANES)
            .and_then(|v| v.cloned::<Vec<DVec4>>())
        {
            self.clip_planes = planes;
        }
    }

    /// Sets the matrices directly.
    pub fn set_camera_matrices(&mut self, view: DMat4, projection: DMat4) {
        self.view_matrix = view;
        self.projection_matrix = projection;
    }

    /// Sets the viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Sets the render tags drawn. An empty list draws every tag.
    pub fn set_render_tags(&mut self, render_tags: Vec<Token>) {
        self.render_tags = render_tags;
    }

    /// Sets the color of wire reprs.
    pub fn set_wireframe_color(&mut self, color: [f32; 4]) {
        self.wireframe_color = color;
    }

    /// Camera the state was last framed with.
    pub fn camera_id(&self) -> Option<&PrimPath> {
        self.camera_id.as_ref()
    }

    /// World to view.
    pub fn view_matrix(&self) -> DMat4 {
        self.view_matrix
    }

    /// View to clip, conformed to the viewport.
    pub fn projection_matrix(&self) -> DMat4 {
        self.projection_matrix
    }

    /// Target rectangle.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Clip planes.
    pub fn clip_planes(&self) -> &[DVec4] {
        &self.clip_planes
    }

    /// Render tags drawn.
    pub fn render_tags(&self) -> &[Token] {
        &self.render_tags
    }

    /// Returns `true` if items tagged `tag` are drawn.
    pub fn is_tag_drawn(&self, tag: &Token) -> bool {
        self.render_tags.is_empty() || self.render_tags.contains(tag)
    }

    /// Backend parameters for a pass over `collection`.
    pub fn to_pass_params(&self, collection: &Token) -> PassParams {
        PassParams {
            collection: collection.clone(),
            view_matrix: self.view_matrix,
            projection_matrix: self.projection_matrix,
            viewport: self.viewport,
            clip_planes: self.clip_planes.clone(),
            wireframe_color: self.wireframe_color,
            render_tags: self.render_tags.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::token::render_tags;

    #[test]
    fn test_empty_tag_list_draws_everything() {
        let mut state = RenderPassState::new();
        assert!(state.is_tag_drawn(&render_tags::GUIDE));
        state.set_render_tags(vec![render_tags::GEOMETRY]);
        assert!(state.is_tag_drawn(&render_tags::GEOMETRY));
        assert!(!state.is_tag_drawn(&render_tags::GUIDE));
    }

    #[test]
    fn test_pass_params_carry_state() {
        let mut state = RenderPassState::new();
        state.set_viewport(Viewport::new(800.0, 600.0));
        state.set_wireframe_color([1.0, 0.0, 0.0, 1.0]);
        let params = state.to_pass_params(&render_tags::GEOMETRY);
        assert_eq!(params.collection, render_tags::GEOMETRY);
        assert_eq!(params.viewport.width, 800.0);
        assert_eq!(params.wireframe_color, [1.0, 0.0, 0.0, 1.0]);
    }
}
