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

//! A collection bound to a dirty list, drawn through the render delegate.

use crate::render_pass_state::RenderPassState;
use strata_core::{DrawItem, PassStats, RenderDelegateError};
use strata_data::{DirtyList, RenderIndex, RprimCollection, SharedDirtyList};

/// Draws the items of one collection.
///
/// Clones share the dirty list, so every clone keeps the same rprims synced.
#[derive(Clone)]
pub struct RenderPass {
    dirty_list: SharedDirtyList,
}

impl RenderPass {
    /// Creates a pass over `collection`.
    pub fn new(collection: RprimCollection) -> Self {
        Self {
            dirty_list: DirtyList::shared(collection),
        }
    }

    /// The collection drawn.
    pub fn collection(&self) -> RprimCollection {
        self.dirty_list
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .collection()
            .clone()
    }

    /// Replaces the collection. Members are gathered again on next sync.
    pub fn set_collection(&mut self, collection: RprimCollection) {
        let mut dirty_list = self.dirty_list.lock().unwrap_or_else(|e| e.into_inner());
        if *dirty_list.collection() != collection {
            dirty_list.apply_edit(collection);
        }
    }

    /// The dirty list keeping the collection synced.
    pub fn dirty_list(&self) -> &SharedDirtyList {
        &self.dirty_list
    }

    /// Queues the pass's dirty list on the index.
    pub fn sync(&self, index: &mut RenderIndex) {
        index.queue_sync(self.dirty_list.clone());
    }

    /// Submits the collection's draw items whose tag `state` draws.
    ///
    /// Tags are submitted in name order so passes are reproducible.
    pub fn execute(
        &self,
        index: &RenderIndex,
        state: &RenderPassState,
    ) -> Result<PassStats, RenderDelegateError> {
        let collection = self.collection();
        let view = index.draw_items(&collection);

        let mut tags: Vec<_> = view.keys().filter(|tag| state.is_tag_drawn(tag)).collect();
        tags.sort();
        let items: Vec<&DrawItem> = tags
            .into_iter()
            .filter_map(|tag| view.get(tag))
            .flatten()
            .collect();

        log::trace!(
            "RenderPass: submitting {} draw items of '{}'",
            items.len(),
            collection.name()
        );
        let params = state.to_pass_params(collection.name());
        index.render_delegate().execute_pass(&params, &items)
    }
}

impl std::fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPass")
            .field("collection", &self.collection())
            .finish()
    }
}
