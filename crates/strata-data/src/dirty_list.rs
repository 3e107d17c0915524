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

//! Cached, versioned lists of rprims that need a sync.

use crate::collection::RprimCollection;
use crate::render_index::RenderIndex;
use std::sync::{Arc, Mutex};
use strata_core::token::perf_counters;
use strata_core::{DirtyBits, PrimPath};

/// A dirty list shared between the task that owns it and the render index
/// sync queue.
pub type SharedDirtyList = Arc<Mutex<DirtyList>>;

/// The rprims of one collection that need visiting on the next sync.
///
/// The list is rebuilt lazily from the change tracker versions:
///
/// * when the collection version moved, every member that is dirty, varying
///   or missing the collection's repr is gathered;
/// * when only the varying state version moved, the members in the varying
///   set are gathered;
/// * otherwise the previous list is reused as is.
#[derive(Debug)]
pub struct DirtyList {
    collection: RprimCollection,
    collection_version: Option<u64>,
    varying_state_version: Option<u64>,
    dirty_ids: Vec<PrimPath>,
}

impl DirtyList {
    /// Creates a list that rebuilds on first use.
    pub fn new(collection: RprimCollection) -> Self {
        Self {
            collection,
            collection_version: None,
            varying_state_version: None,
            dirty_ids: Vec::new(),
        }
    }

    /// Creates a list wrapped for sharing.
    pub fn shared(collection: RprimCollection) -> SharedDirtyList {
        Arc::new(Mutex::new(Self::new(collection)))
    }

    /// The tracked collection.
    pub fn collection(&self) -> &RprimCollection {
        &self.collection
    }

    /// Switches to another collection and forces a full rebuild.
    pub fn apply_edit(&mut self, collection: RprimCollection) {
        if self.collection != collection {
            log::debug!(
                "DirtyList: collection '{}' replaced by '{}'",
                self.collection.name(),
                collection.name()
            );
            self.collection = collection;
        }
        self.collection_version = None;
        self.varying_state_version = None;
    }

    /// Ids gathered by the last [`update`](Self::update).
    pub fn dirty_ids(&self) -> &[PrimPath] {
        &self.dirty_ids
    }

    /// Brings the list up to date with `index` and returns it.
    pub fn update(&mut self, index: &RenderIndex) -> &[PrimPath] {
        let tracker = index.change_tracker();
        let collection_version = tracker.collection_version(self.collection.name());
        let varying_state_version = tracker.varying_state_version();

        if self.collection_version != Some(collection_version) {
            let repr = self.collection.repr();
            self.dirty_ids = index
                .collection_members(&self.collection)
                .into_iter()
                .filter(|id| {
                    let bits = tracker.rprim_dirty_bits(id);
                    // Varying members stay listed: re-dirtying them later does not
                    // bump the varying version.
                    bits.is_dirty()
                        || bits.contains(DirtyBits::VARYING)
                        || index.get_rprim(id).is_some_and(|rprim| !rprim.has_repr(repr))
                })
                .collect();
            log::trace!(
                "DirtyList '{}': rebuilt for collection version {collection_version}, {} dirty",
                self.collection.name(),
                self.dirty_ids.len()
            );
            index.perf_log().increment(&perf_counters::DIRTY_LISTS_REBUILT);
        } else if self.varying_state_version != Some(varying_state_version) {
            self.dirty_ids = index
                .collection_members(&self.collection)
                .into_iter()
                .filter(|id| tracker.rprim_dirty_bits(id).contains(DirtyBits::VARYING))
                .collect();
            log::trace!(
                "DirtyList '{}': rebuilt varying set, {} varying",
                self.collection.name(),
                self.dirty_ids.len()
            );
            index.perf_log().increment(&perf_counters::DIRTY_LISTS_REBUILT);
        }

        self.collection_version = Some(collection_version);
        self.varying_state_version = Some(varying_state_version);
        &self.dirty_ids
    }
}
