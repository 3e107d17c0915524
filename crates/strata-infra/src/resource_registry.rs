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

//! CPU-side staging and backend storage of the stream backend.
//!
//! Primitives allocate [`BufferRange`]s and attach pending
//! [`BufferSource`]s to them during sync. [`ResourceRegistry::commit`]
//! resolves every pending source (computing derived data such as flat
//! normals) and copies the result into backend storage. Ranges are reference
//! counted: once no primitive holds a range, garbage collection reclaims it.

use glam::Vec3;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strata_core::{ResourceHandle, StreamSettings, Token};
use thiserror::Error;

/// An error raised while staging or resolving buffer data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The range was already reclaimed.
    #[error("Buffer range {0:?} is not allocated")]
    UnknownRange(ResourceHandle),

    /// A computation referenced a point outside the point array.
    #[error("Index {index} out of range for {point_count} points")]
    IndexOutOfRange {
        /// The offending index.
        index: u32,
        /// Number of points available.
        point_count: usize,
    },
}

/// CPU data waiting to be resolved and uploaded.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferSource {
    /// Point positions.
    Points(Vec<Vec3>),
    /// Element indices.
    Indices(Vec<u32>),
    /// Per-element scalar widths.
    Widths(Vec<f32>),
    /// Raw texel bytes.
    Texels(Vec<u8>),
    /// One normal per triangle, computed from positions and indices.
    FlatNormals {
        /// Point positions.
        points: Vec<Vec3>,
        /// Triangle list indices.
        indices: Vec<u32>,
    },
    /// One normal per point, averaged over the triangles sharing it.
    SmoothNormals {
        /// Point positions.
        points: Vec<Vec3>,
        /// Triangle list indices.
        indices: Vec<u32>,
    },
}

impl BufferSource {
    /// Resolves the source into the bytes stored by the backend.
    pub fn resolve(&self) -> Result<Vec<u8>, RegistryError> {
        match self {
            BufferSource::Points(points) => Ok(bytemuck::cast_slice(points).to_vec()),
            BufferSource::Indices(indices) => Ok(bytemuck::cast_slice(indices).to_vec()),
            BufferSource::Widths(widths) => Ok(bytemuck::cast_slice(widths).to_vec()),
            BufferSource::Texels(texels) => Ok(texels.clone()),
            BufferSource::FlatNormals { points, indices } => {
                let normals = flat_normals(points, indices)?;
                Ok(bytemuck::cast_slice(&normals).to_vec())
            }
            BufferSource::SmoothNormals { points, indices } => {
                let normals = smooth_normals(points, indices)?;
                Ok(bytemuck::cast_slice(&normals).to_vec())
            }
        }
    }
}

/// Computes one normal per triangle of a triangle list.
///
/// Degenerate triangles get a zero normal. A trailing partial triangle is
/// ignored.
pub fn flat_normals(points: &[Vec3], indices: &[u32]) -> Result<Vec<Vec3>, RegistryError> {
    let fetch = |i: u32| {
        points
            .get(i as usize)
            .copied()
            .ok_or(RegistryError::IndexOutOfRange {
                index: i,
                point_count: points.len(),
            })
    };
    indices
        .chunks_exact(3)
        .map(|tri| {
            let (a, b, c) = (fetch(tri[0])?, fetch(tri[1])?, fetch(tri[2])?);
            Ok((b - a).cross(c - a).normalize_or_zero())
        })
        .collect()
}

/// Computes one normal per point by summing the area-weighted normals of
/// the triangles that reference it.
pub fn smooth_normals(points: &[Vec3], indices: &[u32]) -> Result<Vec<Vec3>, RegistryError> {
    let mut normals = vec![Vec3::ZERO; points.len()];
    for tri in indices.chunks_exact(3) {
        let mut corners = [Vec3::ZERO; 3];
        for (corner, &i) in corners.iter_mut().zip(tri) {
            *corner = *points.get(i as usize).ok_or(RegistryError::IndexOutOfRange {
                index: i,
                point_count: points.len(),
            })?;
        }
        let face = (corners[1] - corners[0]).cross(corners[2] - corners[0]);
        for &i in tri {
            normals[i as usize] += face;
        }
    }
    Ok(normals.into_iter().map(Vec3::normalize_or_zero).collect())
}

#[derive(Debug)]
struct RangeInfo {
    handle: ResourceHandle,
    role: Token,
}

/// A reference-counted handle to backend storage.
///
/// Cloning shares the range. The registry reclaims it during garbage
/// collection once only the registry itself still holds it.
#[derive(Debug, Clone)]
pub struct BufferRange(Arc<RangeInfo>);

impl BufferRange {
    /// Handle used by draw items.
    pub fn handle(&self) -> ResourceHandle {
        self.0.handle
    }

    /// What the range stores (points, indices, ...).
    pub fn role(&self) -> &Token {
        &self.0.role
    }
}

/// Indirect draw command storage, shared with whoever records into it.
#[derive(Debug)]
pub struct DispatchBuffer {
    /// Number of commands the buffer holds.
    pub command_count: usize,
    /// Words per command.
    pub command_stride: usize,
}

/// Geometry-kind specific program, cached by key.
#[derive(Debug, PartialEq, Eq)]
pub struct GeometricShader {
    /// Cache key the shader was built for.
    pub key: String,
    /// Registry generation the shader was built in.
    pub generation: u64,
}

/// Counters describing registry activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of commits.
    pub commits: u64,
    /// Sources resolved across all commits.
    pub sources_resolved: u64,
    /// Sources that failed to resolve.
    pub sources_failed: u64,
    /// Bytes copied to backend storage.
    pub bytes_uploaded: u64,
    /// Ranges reclaimed by garbage collection.
    pub ranges_collected: u64,
    /// Dispatch buffers reclaimed.
    pub dispatch_buffers_collected: u64,
    /// Geometric shader cache invalidations.
    pub shader_invalidations: u64,
}

/// Staging area and storage of the stream backend.
#[derive(Debug)]
pub struct ResourceRegistry {
    settings: StreamSettings,
    next_handle: u64,
    ranges: BTreeMap<ResourceHandle, BufferRange>,
    storage: HashMap<ResourceHandle, Vec<u8>>,
    pending: Vec<(ResourceHandle, BufferSource)>,
    dispatch_buffers: Vec<Arc<DispatchBuffer>>,
    geometric_shaders: HashMap<String, Arc<GeometricShader>>,
    shader_generation: u64,
    stats: RegistryStats,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new(settings: StreamSettings) -> Self {
        Self {
            settings,
            next_handle: 1,
            ranges: BTreeMap::new(),
            storage: HashMap::new(),
            pending: Vec::new(),
            dispatch_buffers: Vec::new(),
            geometric_shaders: HashMap::new(),
            shader_generation: 0,
            stats: RegistryStats::default(),
        }
    }

    /// Allocates an empty range.
    pub fn allocate_range(&mut self, role: Token) -> BufferRange {
        let handle = ResourceHandle(self.next_handle);
        self.next_handle += 1;
        let range = BufferRange(Arc::new(RangeInfo { handle, role }));
        self.ranges.insert(handle, range.clone());
        range
    }

    /// Stages `source` for upload into `range` at the next commit.
    pub fn add_source(
        &mut self,
        range: &BufferRange,
        source: BufferSource,
    ) -> Result<(), RegistryError> {
        if !self.ranges.contains_key(&range.handle()) {
            return Err(RegistryError::UnknownRange(range.handle()));
        }
        self.pending.push((range.handle(), source));
        Ok(())
    }

    /// Resolves every pending source and uploads the results.
    ///
    /// Above the configured threshold sources are resolved on the rayon
    /// thread pool. Sources that fail to resolve are logged and dropped. Returns
    /// the number of sources uploaded.
    pub fn commit(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        self.stats.commits += 1;
        if pending.is_empty() {
            return 0;
        }

        let resolved = if pending.len() > self.settings.parallel_resolve_threshold {
            resolve_parallel(&pending)
        } else {
            pending
                .iter()
                .map(|(handle, source)| (*handle, source.resolve()))
                .collect()
        };

        let mut uploaded = 0;
        for (handle, result) in resolved {
            match result {
                // A range collected between staging and commit is skipped.
                Ok(bytes) if self.ranges.contains_key(&handle) => {
                    self.stats.bytes_uploaded += bytes.len() as u64;
                    self.storage.insert(handle, bytes);
                    uploaded += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("ResourceRegistry: failed to resolve source for {handle:?}: {e}");
                    self.stats.sources_failed += 1;
                }
            }
        }
        self.stats.sources_resolved += uploaded as u64;
        log::trace!("ResourceRegistry: committed {uploaded} sources");
        uploaded
    }

    /// Reclaims every range no primitive holds anymore. Returns the number
    /// of ranges reclaimed.
    pub fn garbage_collect(&mut self) -> usize {
        let unused: Vec<ResourceHandle> = self
            .ranges
            .iter()
            .filter(|(_, range)| Arc::strong_count(&range.0) == 1)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in &unused {
            self.ranges.remove(handle);
            self.storage.remove(handle);
        }
        self.pending
            .retain(|(handle, _)| self.ranges.contains_key(handle));
        self.stats.ranges_collected += unused.len() as u64;
        log::debug!(
            "ResourceRegistry: garbage collected {} ranges, {} live",
            unused.len(),
            self.ranges.len()
        );
        unused.len()
    }

    /// Registers a dispatch buffer.
    pub fn register_dispatch_buffer(
        &mut self,
        command_count: usize,
        command_stride: usize,
    ) -> Arc<DispatchBuffer> {
        let buffer = Arc::new(DispatchBuffer {
            command_count,
            command_stride,
        });
        self.dispatch_buffers.push(Arc::clone(&buffer));
        buffer
    }

    /// Releases dispatch buffers nobody else holds.
    pub fn garbage_collect_dispatch_buffers(&mut self) -> usize {
        let before = self.dispatch_buffers.len();
        self.dispatch_buffers
            .retain(|buffer| Arc::strong_count(buffer) > 1);
        let collected = before - self.dispatch_buffers.len();
        self.stats.dispatch_buffers_collected += collected as u64;
        collected
    }

    /// The cached geometric shader for `key`, building it on a miss.
    pub fn register_geometric_shader(&mut self, key: &str) -> Arc<GeometricShader> {
        let generation = self.shader_generation;
        Arc::clone(
            self.geometric_shaders
                .entry(key.to_owned())
                .or_insert_with(|| {
                    log::trace!("ResourceRegistry: building geometric shader '{key}'");
                    Arc::new(GeometricShader {
                        key: key.to_owned(),
                        generation,
                    })
                }),
        )
    }

    /// Drops every cached geometric shader so they are rebuilt on next use.
    pub fn invalidate_geometric_shader_registry(&mut self) {
        self.geometric_shaders.clear();
        self.shader_generation += 1;
        self.stats.shader_invalidations += 1;
        log::debug!("ResourceRegistry: geometric shader registry invalidated");
    }

    /// Uploaded bytes of a range, if it was committed.
    pub fn buffer_data(&self, handle: ResourceHandle) -> Option<&[u8]> {
        self.storage.get(&handle).map(Vec::as_slice)
    }

    /// Returns `true` if the range is still allocated.
    pub fn is_allocated(&self, handle: ResourceHandle) -> bool {
        self.ranges.contains_key(&handle)
    }

    /// Number of allocated ranges.
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Number of sources waiting for a commit.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of live dispatch buffers.
    pub fn dispatch_buffer_count(&self) -> usize {
        self.dispatch_buffers.len()
    }

    /// Number of cached geometric shaders.
    pub fn geometric_shader_count(&self) -> usize {
        self.geometric_shaders.len()
    }

    /// Activity counters.
    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    /// Settings the registry was built with.
    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }
}

fn resolve_parallel(
    pending: &[(ResourceHandle, BufferSource)],
) -> Vec<(ResourceHandle, Result<Vec<u8>, RegistryError>)> {
    pending
        .par_iter()
        .map(|(handle, source)| (*handle, source.resolve()))
        .collect()
}
