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

//! Camera sprim.

use std::any::Any;
use strata_core::math::{DMat4, DVec4};
use strata_core::token::{camera_values, scene_keys};
use strata_core::{
    CameraMatrices, DirtyBits, PrimPath, SceneDelegate, Sprim, SyncContext, Token, Value,
    WindowPolicy,
};

/// View and projection matrices changed.
pub const DIRTY_MATRICES: DirtyBits = DirtyBits::DIRTY_PARAMS;

/// Camera of the stream backend.
///
/// Caches the matrices, window policy and clip planes pulled from the scene.
/// A fallback camera serves identity matrices.
#[derive(Debug)]
pub struct StreamCamera {
    id: PrimPath,
    view: DMat4,
    view_inverse: DMat4,
    projection: DMat4,
    window_policy: WindowPolicy,
    clip_planes: Vec<DVec4>,
}

impl StreamCamera {
    /// Creates a camera with identity matrices.
    pub fn new(id: PrimPath) -> Self {
        Self {
            id,
            view: DMat4::IDENTITY,
            view_inverse: DMat4::IDENTITY,
            projection: DMat4::IDENTITY,
            window_policy: WindowPolicy::default(),
            clip_planes: Vec::new(),
        }
    }

    /// World to view.
    pub fn view_matrix(&self) -> DMat4 {
        self.view
    }

    /// View to world.
    pub fn view_inverse_matrix(&self) -> DMat4 {
        self.view_inverse
    }

    /// View to clip, as authored.
    pub fn projection_matrix(&self) -> DMat4 {
        self.projection
    }

    /// How the frustum is fitted to the viewport.
    pub fn window_policy(&self) -> WindowPolicy {
        self.window_policy
    }

    /// User clip planes.
    pub fn clip_planes(&self) -> &[DVec4] {
        &self.clip_planes
    }

    /// The projection adjusted to a viewport of aspect ratio `aspect`
    /// (width over height) according to the window policy.
    pub fn conformed_projection(&self, aspect: f64) -> DMat4 {
        self.window_policy.conform(self.projection, aspect)
    }

    fn pull_matrices(&mut self, scene: &dyn SceneDelegate) {
        let matrices = scene
            .get(&self.id, &scene_keys::CAMERA_MATRICES)
            .and_then(|v| v.cloned::<CameraMatrices>())
            .unwrap_or_default();
        self.view = matrices.view;
        self.projection = matrices.projection;
        self.view_inverse = if matrices.view.determinant().abs() > f64::EPSILON {
            matrices.view.inverse()
        } else {
            log::warn!("StreamCamera {}: view matrix is singular", self.id);
            DMat4::IDENTITY
        };
    }
}

impl Sprim for StreamCamera {
    fn id(&self) -> &PrimPath {
        &self.id
    }

    fn initial_dirty_bits_mask(&self) -> DirtyBits {
        DIRTY_MATRICES | DirtyBits::DIRTY_WINDOW_POLICY | DirtyBits::DIRTY_CLIP_PLANES
    }

    fn sync(&mut self, ctx: &mut SyncContext<'_>, dirty_bits: &mut DirtyBits) {
        let scene = ctx.scene_delegate;
        if dirty_bits.contains(DIRTY_MATRICES) {
            self.pull_matrices(scene);
        }
        if dirty_bits.contains(DirtyBits::DIRTY_WINDOW_POLICY) {
            self.window_policy = scene
                .get(&self.id, &scene_keys::WINDOW_POLICY)
                .and_then(|v| v.cloned::<WindowPolicy>())
                .unwrap_or_default();
        }
        if dirty_bits.contains(DirtyBits::DIRTY_CLIP_PLANES) {
            self.clip_planes = scene.clip_planes(&self.id);
        }
        *dirty_bits = DirtyBits::CLEAN;
    }

    fn get(&self, key: &Token) -> Option<Value> {
        if *key == camera_values::WORLD_TO_VIEW_MATRIX {
            Some(Value::new(self.view))
        } else if *key == camera_values::WORLD_TO_VIEW_INVERSE_MATRIX {
            Some(Value::new(self.view_inverse))
        } else if *key == camera_values::PROJECTION_MATRIX {
            Some(Value::new(self.projection))
        } else if *key == camera_values::WINDOW_POLICY {
            Some(Value::new(self.window_policy))
        } else if *key == camera_values::CLIP_PLANES {
            Some(Value::new(self.clip_planes.clone()))
        } else {
            None
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemorySceneDelegate;
    use approx::assert_relative_eq;
    use strata_core::math::DVec3;
    use strata_core::{ChangeTracker, InstancerMap};

    fn sync(camera: &mut StreamCamera, scene: &MemorySceneDelegate, bits: DirtyBits) {
        let mut tracker = ChangeTracker::new();
        let instancers = InstancerMap::new();
        let mut ctx = SyncContext {
            scene_delegate: scene,
            render_param: None,
            tracker: &mut tracker,
            instancers: &instancers,
        };
        let mut bits = bits;
        camera.sync(&mut ctx, &mut bits);
        assert_eq!(bits, DirtyBits::CLEAN);
    }

    #[test]
    fn test_fallback_serves_identity() {
        let camera = StreamCamera::new(PrimPath::empty());
        let view = camera
            .get(&camera_values::WORLD_TO_VIEW_MATRIX)
            .and_then(|v| v.cloned::<DMat4>());
        assert_eq!(view, Some(DMat4::IDENTITY));
        assert!(camera.get(&Token::from_static("focalLength")).is_none());
    }

    #[test]
    fn test_sync_pulls_matrices_and_inverse() {
        let id = PrimPath::new("/scene/cam").unwrap();
        let scene = MemorySceneDelegate::new(PrimPath::new("/scene").unwrap());
        let view = DMat4::look_at_rh(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO, DVec3::Y);
        let projection = DMat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        scene.set_camera(&id, CameraMatrices { view, projection });
        scene.set(&id, scene_keys::WINDOW_POLICY, WindowPolicy::Crop);
        scene.set(&id, scene_keys::CLIP_PLANES, vec![DVec4::new(0.0, 1.0, 0.0, 2.0)]);

        let mut camera = StreamCamera::new(id);
        let mask = camera.initial_dirty_bits_mask();
        sync(&mut camera, &scene, mask);

        assert_eq!(camera.view_matrix(), view);
        assert_eq!(camera.projection_matrix(), projection);
        assert_eq!(camera.window_policy(), WindowPolicy::Crop);
        assert_eq!(camera.clip_planes().len(), 1);
        let round_trip = camera.view_inverse_matrix() * view;
        assert_relative_eq!(round_trip.x_axis.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(round_trip.w_axis.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_conformed_projection_follows_policy() {
        let mut camera = StreamCamera::new(PrimPath::empty());
        camera.projection = DMat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        camera.window_policy = WindowPolicy::Crop;
        assert_eq!(
            camera.conformed_projection(2.0),
            WindowPolicy::Crop.conform(camera.projection, 2.0)
        );
    }
}
