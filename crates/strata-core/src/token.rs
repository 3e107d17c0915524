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

//! Cheap string keys and the well-known names shared across the engine.
//!
//! | Module          | Used for                                           |
//! |-----------------|----------------------------------------------------|
//! | [`prim_types`]  | Primitive type identifiers handed to factories     |
//! | [`scene_keys`]  | Keys passed to [`SceneDelegate::get`](crate::SceneDelegate::get) |
//! | [`context_keys`]| Conventional [`TaskContext`](crate::TaskContext) keys |
//! | [`perf_counters`]| Counter names recorded in [`PerfLog`](crate::PerfLog) |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::{Borrow, Cow};
use std::fmt;

/// A string key. Well-known tokens are `const` and never allocate.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(Cow<'static, str>);

impl Token {
    /// Creates a token from any string.
    pub fn new(text: impl Into<String>) -> Self {
        Self(Cow::Owned(text.into()))
    }

    /// Creates a token from a static string without allocating.
    pub const fn from_static(text: &'static str) -> Self {
        Self(Cow::Borrowed(text))
    }

    /// The token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty token.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::from_static("")
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Token {
    fn from(text: String) -> Self {
        Self(Cow::Owned(text))
    }
}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?})", self.as_str())
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Token::from(String::deserialize(deserializer)?))
    }
}

/// Primitive type identifiers.
pub mod prim_types {
    use super::Token;

    /// Polygonal mesh rprim.
    pub const MESH: Token = Token::from_static("mesh");
    /// Curve rprim.
    pub const BASIS_CURVES: Token = Token::from_static("basisCurves");
    /// Point cloud rprim.
    pub const POINTS: Token = Token::from_static("points");
    /// Camera sprim.
    pub const CAMERA: Token = Token::from_static("camera");
    /// Light sprim.
    pub const LIGHT: Token = Token::from_static("light");
    /// Offscreen draw target sprim.
    pub const DRAW_TARGET: Token = Token::from_static("drawTarget");
    /// Surface shader sprim.
    pub const SHADER: Token = Token::from_static("shader");
    /// Texture bprim.
    pub const TEXTURE: Token = Token::from_static("texture");
}

/// Keys understood by scene delegates.
#[allow(missing_docs)]
pub mod scene_keys {
    use super::Token;

    pub const POINTS: Token = Token::from_static("points");
    pub const NORMALS: Token = Token::from_static("normals");
    pub const TOPOLOGY: Token = Token::from_static("topology");
    pub const CURVE_VERTEX_COUNTS: Token = Token::from_static("curveVertexCounts");
    pub const TRANSFORM: Token = Token::from_static("transform");
    pub const VISIBILITY: Token = Token::from_static("visibility");
    pub const WIDTHS: Token = Token::from_static("widths");
    pub const RENDER_TAG: Token = Token::from_static("renderTag");
    pub const MATERIAL_ID: Token = Token::from_static("materialId");
    pub const CAMERA_MATRICES: Token = Token::from_static("matrices");
    pub const WINDOW_POLICY: Token = Token::from_static("windowPolicy");
    pub const CLIP_PLANES: Token = Token::from_static("clipPlanes");
    pub const LIGHT_PARAMS: Token = Token::from_static("params");
    pub const DRAW_TARGET_PARAMS: Token = Token::from_static("drawTargetParams");
    pub const SURFACE_SHADER_SOURCE: Token = Token::from_static("surfaceShaderSource");
    pub const TEXTURE_RESOURCE: Token = Token::from_static("textureResource");
    pub const INSTANCE_TRANSFORMS: Token = Token::from_static("instanceTransforms");
    pub const TASK_PARAMS: Token = Token::from_static("params");
    pub const COLLECTION: Token = Token::from_static("collection");
    pub const RENDER_TAGS: Token = Token::from_static("renderTags");
}

/// Render tags and representation names.
pub mod render_tags {
    use super::Token;

    /// Regular scene geometry.
    pub const GEOMETRY: Token = Token::from_static("geometry");
    /// Guides, gizmos and other helper geometry.
    pub const GUIDE: Token = Token::from_static("guide");
    /// Hidden unless explicitly requested.
    pub const HIDDEN: Token = Token::from_static("hidden");

    /// Flat shaded hull representation.
    pub const HULL: Token = Token::from_static("hull");
    /// Smooth shaded representation.
    pub const SMOOTH_HULL: Token = Token::from_static("smoothHull");
    /// Wireframe representation.
    pub const WIRE: Token = Token::from_static("wire");
    /// Wireframe over a shaded hull.
    pub const WIRE_ON_SURF: Token = Token::from_static("wireOnSurf");
    /// Refined surface representation.
    pub const REFINED: Token = Token::from_static("refined");
    /// Wireframe of the refined surface.
    pub const REFINED_WIRE: Token = Token::from_static("refinedWire");
    /// Refined wireframe over the refined surface.
    pub const REFINED_WIRE_ON_SURF: Token = Token::from_static("refinedWireOnSurf");
}

/// Values cached by camera sprims.
#[allow(missing_docs)]
pub mod camera_values {
    use super::Token;

    pub const WORLD_TO_VIEW_MATRIX: Token = Token::from_static("worldToViewMatrix");
    pub const WORLD_TO_VIEW_INVERSE_MATRIX: Token = Token::from_static("worldToViewInverseMatrix");
    pub const PROJECTION_MATRIX: Token = Token::from_static("projectionMatrix");
    pub const WINDOW_POLICY: Token = Token::from_static("windowPolicy");
    pub const CLIP_PLANES: Token = Token::from_static("clipPlanes");
}

/// Conventional keys placed in a [`TaskContext`](crate::TaskContext) by tasks.
pub mod context_keys {
    use super::Token;

    /// The render pass state published by a setup task.
    pub const RENDER_PASS_STATE: Token = Token::from_static("renderPassState");
    /// Per-frame statistics accumulated by render tasks.
    pub const PASS_STATS: Token = Token::from_static("passStats");
}

/// Counter names recorded in [`PerfLog`](crate::PerfLog).
#[allow(missing_docs)]
pub mod perf_counters {
    use super::Token;

    pub const RPRIMS_SYNCED: Token = Token::from_static("rprimsSynced");
    pub const SPRIMS_SYNCED: Token = Token::from_static("sprimsSynced");
    pub const BPRIMS_SYNCED: Token = Token::from_static("bprimsSynced");
    pub const INSTANCERS_SYNCED: Token = Token::from_static("instancersSynced");
    pub const DIRTY_LISTS_REBUILT: Token = Token::from_static("dirtyListsRebuilt");
    pub const DRAW_ITEMS_REBUILT: Token = Token::from_static("drawItemsRebuilt");
    pub const DRAW_ITEMS_FETCHED: Token = Token::from_static("drawItemsFetched");
    pub const PRIM_ID_COMPACTIONS: Token = Token::from_static("primIdCompactions");
    pub const GARBAGE_COLLECTED: Token = Token::from_static("garbageCollected");
    pub const TASKS_SYNCED: Token = Token::from_static("tasksSynced");
    pub const TASKS_EXECUTED: Token = Token::from_static("tasksExecuted");
    pub const TASK_FAILURES: Token = Token::from_static("taskFailures");
    pub const ENGINE_EXECUTIONS: Token = Token::from_static("engineExecutions");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn static_and_owned_tokens_compare_equal() {
        assert_eq!(prim_types::MESH, Token::new("mesh"));
        assert_eq!(&prim_types::MESH, "mesh");
    }

    #[test]
    fn tokens_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Token::new("camera"), 1);
        assert_eq!(map.get("camera"), Some(&1));
    }
}
