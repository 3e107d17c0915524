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

//! Geometry rprims: meshes, basis curves and points.
//!
//! One [`StreamRprim`] type serves every geometry kind. Each repr the prim is
//! asked for gets its own draw state, configured from a static table that
//! maps repr names to a [`GeomStyle`]. Buffers are staged into the resource
//! registry during sync and uploaded by the next commit.

use crate::render_delegate::StreamRenderParam;
use crate::resource_registry::{BufferRange, BufferSource, GeometricShader, ResourceRegistry};
use glam::Vec3;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::math::DMat4;
use strata_core::token::{prim_types, render_tags, scene_keys};
use strata_core::{
    DirtyBits, DrawItem, PrimPath, Rprim, SceneDelegate, SharedDrawItemData, SyncContext, Token,
};

/// Segments each curve segment is split into by the refined reprs.
pub const CURVE_REFINE_LEVEL: usize = 8;

mod roles {
    use strata_core::Token;

    pub const POINTS: Token = Token::from_static("points");
    pub const INDICES: Token = Token::from_static("indices");
    pub const NORMALS: Token = Token::from_static("normals");
    pub const WIDTHS: Token = Token::from_static("widths");
}

/// The geometry family an rprim draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Polygonal mesh.
    Mesh,
    /// Linear curves.
    BasisCurves,
    /// Point cloud.
    Points,
}

impl GeometryKind {
    /// The kind created for rprim type `type_id`.
    pub fn from_type(type_id: &Token) -> Option<Self> {
        if *type_id == prim_types::MESH {
            Some(Self::Mesh)
        } else if *type_id == prim_types::BASIS_CURVES {
            Some(Self::BasisCurves)
        } else if *type_id == prim_types::POINTS {
            Some(Self::Points)
        } else {
            None
        }
    }

    /// Rprim type token of this kind.
    pub fn type_id(self) -> Token {
        match self {
            Self::Mesh => prim_types::MESH,
            Self::BasisCurves => prim_types::BASIS_CURVES,
            Self::Points => prim_types::POINTS,
        }
    }
}

/// How a repr draws its geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeomStyle {
    /// Shaded coarse triangles.
    Hull,
    /// Edges of the coarse faces.
    HullEdgeOnly,
    /// Coarse triangles with edges on top.
    HullEdgeOnSurf,
    /// Shaded refined surface.
    Surf,
    /// Edges of the refined surface.
    EdgeOnly,
    /// Refined surface with edges on top.
    EdgeOnSurf,
    /// Curve segments as lines.
    Line,
    /// Tessellated curve segments.
    Refined,
    /// One sprite per point.
    Points,
}

/// Drawing configuration of one repr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReprDesc {
    /// Geometry style.
    pub style: GeomStyle,
    /// Whether normals are averaged per point.
    pub smooth_normals: bool,
}

static MESH_REPRS: [(Token, GeomStyle, bool); 7] = [
    (render_tags::HULL, GeomStyle::Hull, false),
    (render_tags::SMOOTH_HULL, GeomStyle::Hull, true),
    (render_tags::WIRE, GeomStyle::HullEdgeOnly, true),
    (render_tags::WIRE_ON_SURF, GeomStyle::HullEdgeOnSurf, true),
    (render_tags::REFINED, GeomStyle::Surf, true),
    (render_tags::REFINED_WIRE, GeomStyle::EdgeOnly, true),
    (render_tags::REFINED_WIRE_ON_SURF, GeomStyle::EdgeOnSurf, true),
];

static CURVE_REPRS: [(Token, GeomStyle, bool); 7] = [
    (render_tags::HULL, GeomStyle::Line, false),
    (render_tags::SMOOTH_HULL, GeomStyle::Line, false),
    (render_tags::WIRE, GeomStyle::Line, false),
    (render_tags::WIRE_ON_SURF, GeomStyle::Line, false),
    (render_tags::REFINED, GeomStyle::Refined, false),
    (render_tags::REFINED_WIRE, GeomStyle::Line, false),
    (render_tags::REFINED_WIRE_ON_SURF, GeomStyle::Refined, false),
];

static POINT_REPRS: [(Token, GeomStyle, bool); 7] = [
    (render_tags::HULL, GeomStyle::Points, false),
    (render_tags::SMOOTH_HULL, GeomStyle::Points, false),
    (render_tags::WIRE, GeomStyle::Points, false),
    (render_tags::WIRE_ON_SURF, GeomStyle::Points, false),
    (render_tags::REFINED, GeomStyle::Points, false),
    (render_tags::REFINED_WIRE, GeomStyle::Points, false),
    (render_tags::REFINED_WIRE_ON_SURF, GeomStyle::Points, false),
];

impl ReprDesc {
    /// Configuration of `repr` for `kind`, or `None` for unknown reprs.
    pub fn lookup(kind: GeometryKind, repr: &Token) -> Option<Self> {
        let table: &[(Token, GeomStyle, bool)] = match kind {
            GeometryKind::Mesh => &MESH_REPRS,
            GeometryKind::BasisCurves => &CURVE_REPRS,
            GeometryKind::Points => &POINT_REPRS,
        };
        table
            .iter()
            .find(|(name, _, _)| name == repr)
            .map(|(_, style, smooth)| ReprDesc {
                style: *style,
                smooth_normals: *smooth,
            })
    }
}

#[derive(Debug)]
struct ReprState {
    desc: ReprDesc,
    data: SharedDrawItemData,
    shader: Option<Arc<GeometricShader>>,
}

/// Geometry rprim of the stream backend.
#[derive(Debug)]
pub struct StreamRprim {
    id: PrimPath,
    instancer_id: Option<PrimPath>,
    kind: GeometryKind,
    prim_id: u32,

    visible: bool,
    render_tag: Token,
    material_id: Option<PrimPath>,
    transform: DMat4,
    instance_count: u32,

    points: Vec<Vec3>,
    indices: Vec<u32>,
    triangle_count: usize,
    edge_count: usize,
    segment_count: usize,

    points_range: Option<BufferRange>,
    index_range: Option<BufferRange>,
    normals_range: Option<BufferRange>,
    widths_range: Option<BufferRange>,
    smooth_normals_staged: Option<bool>,

    reprs: HashMap<Token, ReprState>,
}

impl StreamRprim {
    /// Creates an unsynced rprim.
    pub fn new(kind: GeometryKind, id: PrimPath, instancer_id: Option<PrimPath>) -> Self {
        Self {
            id,
            instancer_id,
            kind,
            prim_id: 0,
            visible: true,
            render_tag: render_tags::GEOMETRY,
            material_id: None,
            transform: DMat4::IDENTITY,
            instance_count: 1,
            points: Vec::new(),
            indices: Vec::new(),
            triangle_count: 0,
            edge_count: 0,
            segment_count: 0,
            points_range: None,
            index_range: None,
            normals_range: None,
            widths_range: None,
            smooth_normals_staged: None,
            reprs: HashMap::new(),
        }
    }

    /// Geometry family.
    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Visibility as last synced.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Point positions as last synced.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Triangle (meshes) or segment (curves) indices.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Instances drawn per draw item.
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Bound material as last synced.
    pub fn material_id(&self) -> Option<&PrimPath> {
        self.material_id.as_ref()
    }

    /// Range holding the points.
    pub fn points_range(&self) -> Option<&BufferRange> {
        self.points_range.as_ref()
    }

    /// Range holding the indices.
    pub fn index_range(&self) -> Option<&BufferRange> {
        self.index_range.as_ref()
    }

    /// Range holding the normals.
    pub fn normals_range(&self) -> Option<&BufferRange> {
        self.normals_range.as_ref()
    }

    /// Geometric shader bound to `repr`.
    pub fn geometric_shader(&self, repr: &Token) -> Option<&Arc<GeometricShader>> {
        self.reprs.get(repr).and_then(|state| state.shader.as_ref())
    }

    fn element_count(&self, style: GeomStyle) -> u32 {
        let count = match style {
            GeomStyle::Hull | GeomStyle::HullEdgeOnSurf | GeomStyle::Surf | GeomStyle::EdgeOnSurf => {
                self.triangle_count
            }
            GeomStyle::HullEdgeOnly | GeomStyle::EdgeOnly => self.edge_count,
            GeomStyle::Line => self.segment_count,
            GeomStyle::Refined => self.segment_count * CURVE_REFINE_LEVEL,
            GeomStyle::Points => self.points.len(),
        };
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn rebuild_indices(&mut self, scene: &dyn SceneDelegate) {
        self.indices.clear();
        self.triangle_count = 0;
        self.edge_count = 0;
        self.segment_count = 0;
        match self.kind {
            GeometryKind::Mesh => {
                let topology = scene.mesh_topology(&self.id).unwrap_or_default();
                let mut offset = 0;
                for &count in &topology.face_vertex_counts {
                    let count = count as usize;
                    let Some(face) = topology.face_vertex_indices.get(offset..offset + count) else {
                        log::warn!(
                            "StreamRprim {}: face at offset {offset} runs past the index list",
                            self.id
                        );
                        break;
                    };
                    for k in 1..count.saturating_sub(1) {
                        self.indices.extend([face[0], face[k], face[k + 1]]);
                    }
                    self.edge_count += count;
                    offset += count;
                }
                self.triangle_count = self.indices.len() / 3;
            }
            GeometryKind::BasisCurves => {
                let counts = scene
                    .get(&self.id, &scene_keys::CURVE_VERTEX_COUNTS)
                    .and_then(|v| v.cloned::<Vec<u32>>())
                    .unwrap_or_else(|| vec![self.points.len() as u32]);
                let mut offset = 0u32;
                for count in counts {
                    let Some(end) = offset
                        .checked_add(count)
                        .filter(|&end| end as usize <= self.points.len())
                    else {
                        log::warn!(
                            "StreamRprim {}: curve of {count} vertices at offset {offset} runs past the {} points",
                            self.id,
                            self.points.len()
                        );
                        break;
                    };
                    self.indices
                        .extend((offset..end.saturating_sub(1)).flat_map(|v| [v, v + 1]));
                    offset = end;
                }
                self.segment_count = self.indices.len() / 2;
            }
            GeometryKind::Points => {}
        }
    }

    fn update_draw_data(&self) {
        let geometry = match self.kind {
            GeometryKind::Points => self.points_range.as_ref(),
            _ => self.index_range.as_ref(),
        }
        .map(BufferRange::handle);

        for state in self.reprs.values() {
            let mut data = state.data.write().unwrap_or_else(|e| e.into_inner());
            data.prim_id = self.prim_id;
            data.material_id = self.material_id.clone();
            data.world_transform = self.transform;
            data.instance_count = self.instance_count;
            data.geometry = geometry;
            data.element_count = self.element_count(state.desc.style);
        }
    }
}

/// Stages `source` into the range in `slot`, allocating a fresh range when
/// the slot is empty or `reallocate` is set. Returns `true` if a previous
/// range was released.
fn stage(
    registry: &mut ResourceRegistry,
    slot: &mut Option<BufferRange>,
    role: Token,
    source: BufferSource,
    reallocate: bool,
) -> bool {
    let mut released = false;
    if reallocate || slot.is_none() {
        released = slot.replace(registry.allocate_range(role)).is_some();
    }
    if let Some(range) = slot {
        if let Err(e) = registry.add_source(range, source) {
            log::error!("StreamRprim: failed to stage {} source: {e}", range.role());
        }
    }
    released
}

impl Rprim for StreamRprim {
    fn id(&self) -> &PrimPath {
        &self.id
    }

    fn instancer_id(&self) -> Option<&PrimPath> {
        self.instancer_id.as_ref()
    }

    fn prim_id(&self) -> u32 {
        self.prim_id
    }

    fn set_prim_id(&mut self, prim_id: u32) {
        self.prim_id = prim_id;
        for state in self.reprs.values() {
            state.data.write().unwrap_or_else(|e| e.into_inner()).prim_id = prim_id;
        }
    }

    fn render_tag(&self) -> Token {
        self.render_tag.clone()
    }

    fn has_repr(&self, repr: &Token) -> bool {
        self.reprs.contains_key(repr)
    }

    fn sync(&mut self, ctx: &mut SyncContext<'_>, dirty_bits: &mut DirtyBits, repr: &Token) {
        let Some(param) = ctx.render_param_as::<StreamRenderParam>() else {
            log::error!("StreamRprim {}: synced without a stream render param", self.id);
            *dirty_bits = DirtyBits::CLEAN;
            return;
        };
        let scene = ctx.scene_delegate;
        let bits = *dirty_bits;
        let mut registry = param.registry();

        let mut repr_added = false;
        if !self.reprs.contains_key(repr) {
            match ReprDesc::lookup(self.kind, repr) {
                Some(desc) => {
                    self.reprs.insert(
                        repr.clone(),
                        ReprState {
                            desc,
                            data: SharedDrawItemData::default(),
                            shader: None,
                        },
                    );
                    repr_added = true;
                }
                None => log::warn!(
                    "StreamRprim {}: repr '{repr}' is not supported by {:?}",
                    self.id,
                    self.kind
                ),
            }
        }
        if repr_added || bits.contains(DirtyBits::DIRTY_REPR) {
            for state in self.reprs.values_mut() {
                let key = format!("{}:{:?}", self.kind.type_id(), state.desc.style);
                state.shader = Some(registry.register_geometric_shader(&key));
            }
        }

        if bits.contains(DirtyBits::DIRTY_VISIBILITY) {
            self.visible = scene.visible(&self.id);
        }
        if bits.contains(DirtyBits::DIRTY_RENDER_TAG) {
            self.render_tag = scene.render_tag(&self.id);
        }
        if bits.contains(DirtyBits::DIRTY_TRANSFORM) {
            self.transform = scene.transform(&self.id);
        }
        if bits.contains(DirtyBits::DIRTY_MATERIAL_ID) {
            self.material_id = scene.material_id(&self.id);
        }
        if bits.intersects(DirtyBits::DIRTY_INSTANCER | DirtyBits::DIRTY_INSTANCE_INDEX) {
            self.instance_count = match &self.instancer_id {
                Some(instancer_id) => ctx
                    .instancers
                    .get(instancer_id)
                    .map(|instancer| instancer.total_instance_count(ctx.instancers))
                    .unwrap_or(0),
                None => 1,
            };
        }

        let mut released = false;
        let points_dirty = bits.contains(DirtyBits::DIRTY_POINTS);
        let mut points_resized = false;
        if points_dirty {
            let points: Vec<Vec3> = scene
                .get(&self.id, &scene_keys::POINTS)
                .and_then(|v| v.cloned())
                .unwrap_or_default();
            points_resized = points.len() != self.points.len();
            self.points = points;
            released |= stage(
                &mut registry,
                &mut self.points_range,
                roles::POINTS,
                BufferSource::Points(self.points.clone()),
                points_resized,
            );
        }

        // Curves without authored vertex counts form one curve over all points.
        let topology_dirty = bits.contains(DirtyBits::DIRTY_TOPOLOGY)
            || (self.kind == GeometryKind::BasisCurves && points_dirty);
        if topology_dirty && self.kind != GeometryKind::Points {
            let previous = self.indices.len();
            self.rebuild_indices(scene);
            released |= stage(
                &mut registry,
                &mut self.index_range,
                roles::INDICES,
                BufferSource::Indices(self.indices.clone()),
                self.indices.len() != previous,
            );
        }

        if self.kind == GeometryKind::Mesh {
            let smooth = self.reprs.values().any(|state| state.desc.smooth_normals);
            if points_dirty
                || topology_dirty
                || bits.contains(DirtyBits::DIRTY_NORMALS)
                || self.smooth_normals_staged != Some(smooth)
            {
                let authored = scene
                    .get(&self.id, &scene_keys::NORMALS)
                    .and_then(|v| v.cloned::<Vec<Vec3>>());
                let source = match authored {
                    Some(normals) => BufferSource::Points(normals),
                    None if smooth => BufferSource::SmoothNormals {
                        points: self.points.clone(),
                        indices: self.indices.clone(),
                    },
                    None => BufferSource::FlatNormals {
                        points: self.points.clone(),
                        indices: self.indices.clone(),
                    },
                };
                released |= stage(
                    &mut registry,
                    &mut self.normals_range,
                    roles::NORMALS,
                    source,
                    points_resized || topology_dirty,
                );
                self.smooth_normals_staged = Some(smooth);
            }
        } else if bits.contains(DirtyBits::DIRTY_WIDTHS) {
            let widths: Vec<f32> = scene
                .get(&self.id, &scene_keys::WIDTHS)
                .and_then(|v| v.cloned())
                .unwrap_or_else(|| vec![1.0]);
            released |= stage(
                &mut registry,
                &mut self.widths_range,
                roles::WIDTHS,
                BufferSource::Widths(widths),
                false,
            );
        }
        drop(registry);

        if released {
            ctx.tracker.mark_garbage_collection_needed();
        }
        self.update_draw_data();
        *dirty_bits = DirtyBits::CLEAN;
    }

    fn draw_items(&self, repr: &Token) -> Vec<DrawItem> {
        if !self.visible {
            return Vec::new();
        }
        self.reprs
            .get(repr)
            .map(|state| {
                vec![DrawItem::new(
                    self.id.clone(),
                    repr.clone(),
                    self.render_tag.clone(),
                    Arc::clone(&state.data),
                )]
            })
            .unwrap_or_default()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
