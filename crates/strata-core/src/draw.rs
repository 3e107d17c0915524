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

//! Draw items and the parameters of a render pass submission.

use crate::math::{DMat4, DVec4, Viewport};
use crate::path::PrimPath;
use crate::token::Token;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Opaque handle to a backend-resident resource range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(pub u64);

/// Per-repr drawing state an rprim updates in place during sync.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItemData {
    /// Instance id used for picking.
    pub prim_id: u32,
    /// Bound material.
    pub material_id: Option<PrimPath>,
    /// Local to world transform.
    pub world_transform: DMat4,
    /// Number of instances drawn, `1` for non-instanced prims.
    pub instance_count: u32,
    /// Geometry storage, if the backend allocated any.
    pub geometry: Option<ResourceHandle>,
    /// Number of primitives (triangles, segments, points) to draw.
    pub element_count: u32,
}

impl Default for DrawItemData {
    fn default() -> Self {
        Self {
            prim_id: 0,
            material_id: None,
            world_transform: DMat4::IDENTITY,
            instance_count: 1,
            geometry: None,
            element_count: 0,
        }
    }
}

/// Drawing state shared between an rprim and the draw items it handed out.
pub type SharedDrawItemData = Arc<RwLock<DrawItemData>>;

/// One drawable unit produced by an rprim for a given repr.
///
/// The grouping fields (owner, repr, render tag) are fixed at creation. The
/// drawing state is shared with the rprim, so a draw item kept in a cached
/// view observes every later sync of its owner.
#[derive(Debug, Clone)]
pub struct DrawItem {
    rprim_id: PrimPath,
    repr: Token,
    render_tag: Token,
    data: SharedDrawItemData,
}

impl DrawItem {
    /// Creates a draw item over shared state.
    pub fn new(rprim_id: PrimPath, repr: Token, render_tag: Token, data: SharedDrawItemData) -> Self {
        Self {
            rprim_id,
            repr,
            render_tag,
            data,
        }
    }

    /// The rprim that owns this item.
    pub fn rprim_id(&self) -> &PrimPath {
        &self.rprim_id
    }

    /// Repr the item was built for.
    pub fn repr(&self) -> &Token {
        &self.repr
    }

    /// Render tag the item is grouped under.
    pub fn render_tag(&self) -> &Token {
        &self.render_tag
    }

    /// Copy of the current drawing state.
    pub fn snapshot(&self) -> DrawItemData {
        self.data
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns `true` if both items share the same drawing state.
    pub fn shares_data_with(&self, other: &DrawItem) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

/// Draw items of a collection, grouped by render tag.
pub type DrawItemView = HashMap<Token, Vec<DrawItem>>;

/// Camera and target state of a render pass submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PassParams {
    /// Collection the items were drawn from.
    pub collection: Token,
    /// World to view.
    pub view_matrix: DMat4,
    /// View to clip.
    pub projection_matrix: DMat4,
    /// Target rectangle.
    pub viewport: Viewport,
    /// Clip planes in view space.
    pub clip_planes: Vec<DVec4>,
    /// Color used by wire reprs.
    pub wireframe_color: [f32; 4],
    /// Render tags drawn; empty means all.
    pub render_tags: Vec<Token>,
}

impl Default for PassParams {
    fn default() -> Self {
        Self {
            collection: Token::from_static("geometry"),
            view_matrix: DMat4::IDENTITY,
            projection_matrix: DMat4::IDENTITY,
            viewport: Viewport::default(),
            clip_planes: Vec::new(),
            wireframe_color: [0.0, 0.0, 0.0, 1.0],
            render_tags: Vec::new(),
        }
    }
}

/// Statistics returned by a backend after executing a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Draw items submitted.
    pub draw_items: usize,
    /// Instances drawn across all items.
    pub instances: u64,
    /// Primitives (triangles, segments, points) drawn.
    pub elements: u64,
}

impl std::ops::AddAssign for PassStats {
    fn add_assign(&mut self, rhs: Self) {
        self.draw_items += rhs.draw_items;
        self.instances += rhs.instances;
        self.elements += rhs.elements;
    }
}
