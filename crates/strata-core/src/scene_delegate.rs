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

//! The pull interface through which primitives read scene data.

use crate::math::{DMat4, DVec4};
use crate::path::PrimPath;
use crate::token::{render_tags, scene_keys, Token};
use crate::value::Value;

/// How a camera's frustum is fitted to a viewport of a different aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowPolicy {
    /// Keep the vertical extent, widen or narrow horizontally.
    MatchVertically,
    /// Keep the horizontal extent, widen or narrow vertically.
    MatchHorizontally,
    /// Grow the frustum so the original one fits inside.
    #[default]
    Fit,
    /// Shrink the frustum so it fills the viewport.
    Crop,
    /// Use the frustum unmodified.
    DontConform,
}

impl WindowPolicy {
    /// Adjusts `projection` to a viewport of aspect ratio `aspect` (width
    /// over height).
    ///
    /// Only the scale terms are touched; off-center frusta keep their
    /// offsets.
    pub fn conform(self, projection: DMat4, aspect: f64) -> DMat4 {
        if projection.x_axis.x == 0.0 || aspect <= 0.0 || !aspect.is_finite() {
            return projection;
        }
        let current = projection.y_axis.y / projection.x_axis.x;
        let policy = match self {
            WindowPolicy::Fit if aspect > current => WindowPolicy::MatchVertically,
            WindowPolicy::Fit => WindowPolicy::MatchHorizontally,
            WindowPolicy::Crop if aspect > current => WindowPolicy::MatchHorizontally,
            WindowPolicy::Crop => WindowPolicy::MatchVertically,
            other => other,
        };

        let mut conformed = projection;
        match policy {
            WindowPolicy::MatchVertically => conformed.x_axis.x = projection.y_axis.y / aspect,
            WindowPolicy::MatchHorizontally => conformed.y_axis.y = projection.x_axis.x * aspect,
            _ => {}
        }
        conformed
    }
}

/// View and projection matrices as authored on a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    /// World to view.
    pub view: DMat4,
    /// View to clip.
    pub projection: DMat4,
}

impl Default for CameraMatrices {
    fn default() -> Self {
        Self {
            view: DMat4::IDENTITY,
            projection: DMat4::IDENTITY,
        }
    }
}

/// Topology of a polygonal mesh.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeshTopology {
    /// Number of vertices of each face.
    pub face_vertex_counts: Vec<u32>,
    /// Point indices of all faces, concatenated.
    pub face_vertex_indices: Vec<u32>,
}

impl MeshTopology {
    /// Number of triangles after fan triangulation.
    pub fn triangle_count(&self) -> usize {
        self.face_vertex_counts
            .iter()
            .map(|&n| n.saturating_sub(2) as usize)
            .sum()
    }
}

/// Supplies authoritative scene data to primitives.
///
/// Scene delegates are owned by the caller. A render index only keeps a weak
/// association with each one, and primitives only ever pull from it during
/// their sync step, guided by their dirty bits.
pub trait SceneDelegate: Send + Sync {
    /// Identity of this delegate. Prims inserted through it usually live
    /// under this path.
    fn delegate_id(&self) -> &PrimPath;

    /// Generic value lookup.
    fn get(&self, id: &PrimPath, key: &Token) -> Option<Value>;

    /// Local to world transform.
    fn transform(&self, id: &PrimPath) -> DMat4 {
        self.get(id, &scene_keys::TRANSFORM)
            .and_then(|v| v.cloned::<DMat4>())
            .unwrap_or(DMat4::IDENTITY)
    }

    /// Visibility, defaulting to visible.
    fn visible(&self, id: &PrimPath) -> bool {
        self.get(id, &scene_keys::VISIBILITY)
            .and_then(|v| v.cloned::<bool>())
            .unwrap_or(true)
    }

    /// Render tag, defaulting to `geometry`.
    fn render_tag(&self, id: &PrimPath) -> Token {
        self.get(id, &scene_keys::RENDER_TAG)
            .and_then(|v| v.cloned::<Token>())
            .unwrap_or(render_tags::GEOMETRY)
    }

    /// Bound material, if any.
    fn material_id(&self, id: &PrimPath) -> Option<PrimPath> {
        self.get(id, &scene_keys::MATERIAL_ID)
            .and_then(|v| v.cloned::<PrimPath>())
    }

    /// Mesh topology.
    fn mesh_topology(&self, id: &PrimPath) -> Option<MeshTopology> {
        self.get(id, &scene_keys::TOPOLOGY)
            .and_then(|v| v.cloned::<MeshTopology>())
    }

    /// User clip planes of a camera, as `(a, b, c, d)` plane equations.
    fn clip_planes(&self, camera_id: &PrimPath) -> Vec<DVec4> {
        self.get(camera_id, &scene_keys::CLIP_PLANES)
            .and_then(|v| v.cloned::<Vec<DVec4>>())
            .unwrap_or_default()
    }

    /// Per-instance transforms of an instancer.
    fn instance_transforms(&self, instancer_id: &PrimPath) -> Vec<DMat4> {
        self.get(instancer_id, &scene_keys::INSTANCE_TRANSFORMS)
            .and_then(|v| v.cloned::<Vec<DMat4>>())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_window_policy_conform() {
        let projection = DMat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let focal = projection.y_axis.y;

        // A wide viewport keeps the vertical extent when fitting.
        let fit = WindowPolicy::Fit.conform(projection, 2.0);
        assert_relative_eq!(fit.x_axis.x, focal / 2.0);
        assert_relative_eq!(fit.y_axis.y, focal);

        let crop = WindowPolicy::Crop.conform(projection, 2.0);
        assert_relative_eq!(crop.x_axis.x, focal);
        assert_relative_eq!(crop.y_axis.y, focal * 2.0);

        assert_eq!(WindowPolicy::DontConform.conform(projection, 2.0), projection);
        assert_eq!(WindowPolicy::Fit.conform(projection, 0.0), projection);
    }

    #[test]
    fn test_triangle_count() {
        let topology = MeshTopology {
            face_vertex_counts: vec![3, 4, 2],
            face_vertex_indices: vec![0; 9],
        };
        assert_eq!(topology.triangle_count(), 3);
    }
}
