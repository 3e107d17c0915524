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

//! Draws one collection with the pass state published earlier in the frame.

use crate::render_pass::RenderPass;
use crate::render_pass_state::RenderPassState;
use strata_core::token::{context_keys, scene_keys};
use strata_core::{DirtyBits, PassStats, PrimPath, TaskContext, Token};
use strata_data::{RenderIndex, RprimCollection, Task, TaskError};

/// Adds `stats` to the running totals of the frame in `ctx`.
pub(crate) fn accumulate_pass_stats(ctx: &mut TaskContext, stats: PassStats) {
    let mut total = ctx
        .get_as::<PassStats>(&context_keys::PASS_STATS)
        .copied()
        .unwrap_or_default();
    total += stats;
    ctx.insert(context_keys::PASS_STATS, total);
}

/// Keeps a collection synced and submits its draw items.
///
/// When its collection is dirty the task pulls a [`RprimCollection`] from
/// its scene delegate under [`scene_keys::COLLECTION`]. Params may override
/// the render tags of the pass state with a `Vec<Token>` under
/// [`scene_keys::RENDER_TAGS`].
#[derive(Debug)]
pub struct RenderTask {
    id: PrimPath,
    pass: RenderPass,
    render_tags: Option<Vec<Token>>,
    state_key: Token,
}

impl RenderTask {
    /// Creates a task drawing `collection` until the scene provides one.
    pub fn new(id: PrimPath, collection: RprimCollection) -> Self {
        Self {
            id,
            pass: RenderPass::new(collection),
            render_tags: None,
            state_key: context_keys::RENDER_PASS_STATE,
        }
    }

    /// Reads the pass state from another context key.
    pub fn with_state_key(mut self, state_key: Token) -> Self {
        self.state_key = state_key;
        self
    }

    /// The pass the task draws.
    pub fn pass(&self) -> &RenderPass {
        &self.pass
    }

    fn pull_inputs(&mut self, index: &RenderIndex, bits: DirtyBits) -> Result<(), TaskError> {
        let Some(scene_delegate) = index.scene_delegate_for_task(&self.id) else {
            log::warn!("RenderTask {}: scene delegate is gone, keeping previous inputs", self.id);
            return Ok(());
        };

        if bits.contains(DirtyBits::DIRTY_COLLECTION) {
            if let Some(value) = scene_delegate.get(&self.id, &scene_keys::COLLECTION) {
                let collection =
                    value
                        .cloned::<RprimCollection>()
                        .ok_or_else(|| TaskError::InvalidParams {
                            task: self.id.clone(),
                            reason: format!("expected a collection, found {}", value.type_name()),
                        })?;
                self.pass.set_collection(collection);
            }
        }

        if bits.contains(DirtyBits::DIRTY_PARAMS) {
            self.render_tags = scene_delegate
                .get(&self.id, &scene_keys::RENDER_TAGS)
                .and_then(|value| value.cloned::<Vec<Token>>());
        }
        Ok(())
    }
}

impl Task for RenderTask {
    fn id(&self) -> &PrimPath {
        &self.id
    }

    fn sync(&mut self, index: &mut RenderIndex, _ctx: &mut TaskContext) -> Result<(), TaskError> {
        let bits = index.change_tracker().task_dirty_bits(&self.id);
        if bits.intersects(DirtyBits::DIRTY_COLLECTION | DirtyBits::DIRTY_PARAMS) {
            self.pull_inputs(index, bits)?;
            index.change_tracker_mut().mark_task_clean(
                &self.id,
                bits.without(DirtyBits::DIRTY_COLLECTION | DirtyBits::DIRTY_PARAMS),
            );
        }
        self.pass.sync(index);
        Ok(())
    }

    fn execute(&mut self, index: &RenderIndex, ctx: &mut TaskContext) -> Result<(), TaskError> {
        let mut state = ctx
            .get_as::<RenderPassState>(&self.state_key)
            .cloned()
            .ok_or_else(|| TaskError::MissingContextData(self.state_key.clone()))?;
        if let Some(render_tags) = &self.render_tags {
            state.set_render_tags(render_tags.clone());
        }

        let stats = self.pass.execute(index, &state)?;
        log::trace!(
            "RenderTask {}: drew {} items ({} instances)",
            self.id,
            stats.draw_items,
            stats.instances
        );
        accumulate_pass_stats(ctx, stats);
        Ok(())
    }
}
