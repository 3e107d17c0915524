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

//! Instancers: per-instance data shared by one or more rprims.

use crate::dirty::DirtyBits;
use crate::math::DMat4;
use crate::path::PrimPath;
use crate::scene_delegate::SceneDelegate;
use std::collections::HashMap;

/// Instancers of a render index, keyed by id.
pub type InstancerMap = HashMap<PrimPath, Instancer>;

/// Per-instance transforms for the rprims drawn through it.
///
/// Instancers may nest: an instancer with a parent is itself instanced by
/// that parent, multiplying the number of drawn instances.
#[derive(Debug, Clone)]
pub struct Instancer {
    id: PrimPath,
    parent_id: Option<PrimPath>,
    instance_transforms: Vec<DMat4>,
}

impl Instancer {
    /// Creates an instancer with no instances.
    pub fn new(id: PrimPath, parent_id: Option<PrimPath>) -> Self {
        Self {
            id,
            parent_id,
            instance_transforms: Vec::new(),
        }
    }

    /// The instancer's identity.
    pub fn id(&self) -> &PrimPath {
        &self.id
    }

    /// Parent instancer, if nested.
    pub fn parent_id(&self) -> Option<&PrimPath> {
        self.parent_id.as_ref()
    }

    /// Transforms of the instances at this level.
    pub fn instance_transforms(&self) -> &[DMat4] {
        &self.instance_transforms
    }

    /// Number of instances at this level.
    pub fn instance_count(&self) -> u32 {
        self.instance_transforms.len() as u32
    }

    /// Number of instances once every ancestor instancer is applied.
    pub fn total_instance_count(&self, instancers: &InstancerMap) -> u32 {
        let mut count = self.instance_count();
        let mut parent = self.parent_id.as_ref();
        // Bounded by the map size to tolerate accidental cycles.
        for _ in 0..instancers.len() {
            let Some(next) = parent.and_then(|p| instancers.get(p)) else {
                break;
            };
            count = count.saturating_mul(next.instance_count());
            parent = next.parent_id.as_ref();
        }
        count
    }

    /// Pulls instance data for the dirty bits given and clears them.
    pub fn sync(&mut self, scene_delegate: &dyn SceneDelegate, dirty_bits: &mut DirtyBits) {
        if dirty_bits.intersects(
            DirtyBits::DIRTY_TRANSFORM | DirtyBits::DIRTY_INSTANCE_INDEX | DirtyBits::DIRTY_PRIMVAR,
        ) {
            self.instance_transforms = scene_delegate.instance_transforms(&self.id);
            log::trace!(
                "Instancer {} synced {} instances",
                self.id,
                self.instance_transforms.len()
            );
        }
        *dirty_bits = DirtyBits::CLEAN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instancer(path: &str, parent: Option<&str>, count: usize) -> Instancer {
        let mut inst = Instancer::new(
            PrimPath::new(path).unwrap(),
            parent.map(|p| PrimPath::new(p).unwrap()),
        );
        inst.instance_transforms = vec![DMat4::IDENTITY; count];
        inst
    }

    #[test]
    fn test_nested_instance_count() {
        let mut map = InstancerMap::new();
        let outer = instancer("/outer", None, 3);
        let inner = instancer("/outer/inner", Some("/outer"), 4);
        map.insert(outer.id().clone(), outer);
        map.insert(inner.id().clone(), inner.clone());
        assert_eq!(inner.total_instance_count(&map), 12);
    }

    #[test]
    fn test_missing_parent_counts_own_instances() {
        let map = InstancerMap::new();
        let orphan = instancer("/orphan", Some("/gone"), 2);
        assert_eq!(orphan.total_instance_count(&map), 2);
    }
}
