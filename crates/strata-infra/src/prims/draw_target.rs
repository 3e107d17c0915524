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

//! Draw target sprim.

use std::any::Any;
use strata_core::token::{render_tags, scene_keys};
use strata_core::{DirtyBits, PrimPath, Sprim, SyncContext, Token, Value};

/// Parameters of an offscreen render target.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawTargetParams {
    /// Whether the target is rendered at all.
    pub enabled: bool,
    /// Size in pixels.
    pub resolution: [u32; 2],
    /// Camera rendering into the target.
    pub camera: Option<PrimPath>,
    /// Collection drawn into the target.
    pub collection: Token,
    /// Names of the attachments (color, depth, ...).
    pub attachments: Vec<Token>,
}

impl Default for DrawTargetParams {
    fn default() -> Self {
        Self {
            enabled: true,
            resolution: [512, 512],
            camera: None,
            collection: render_tags::GEOMETRY,
            attachments: Vec::new(),
        }
    }
}

/// Draw target of the stream backend.
#[derive(Debug)]
pub struct StreamDrawTarget {
    id: PrimPath,
    params: DrawTargetParams,
}

impl StreamDrawTarget {
    /// Creates a draw target with default parameters.
    pub fn new(id: PrimPath) -> Self {
        Self {
            id,
            params: DrawTargetParams::default(),
        }
    }

    /// Parameters as last synced.
    pub fn params(&self) -> &DrawTargetParams {
        &self.params
    }
}

impl Sprim for StreamDrawTarget {
    fn id(&self) -> &PrimPath {
        &self.id
    }

    fn initial_dirty_bits_mask(&self) -> DirtyBits {
        DirtyBits::DIRTY_PARAMS
    }

    fn sync(&mut self, ctx: &mut SyncContext<'_>, dirty_bits: &mut DirtyBits) {
        if dirty_bits.contains(DirtyBits::DIRTY_PARAMS) {
            let params = ctx
                .scene_delegate
                .get(&self.id, &scene_keys::DRAW_TARGET_PARAMS)
                .and_then(|v| v.cloned::<DrawTargetParams>())
                .unwrap_or_default();
            // Passes drawing the old or the new collection must re-gather.
            if params.collection != self.params.collection {
                ctx.tracker.mark_collection_dirty(&self.params.collection);
                ctx.tracker.mark_collection_dirty(&params.collection);
            }
            self.params = params;
        }
        *dirty_bits = DirtyBits::CLEAN;
    }

    fn get(&self, key: &Token) -> Option<Value> {
        (*key == scene_keys::DRAW_TARGET_PARAMS).then(|| Value::new(self.params.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemorySceneDelegate;
    use strata_core::{ChangeTracker, InstancerMap};

    #[test]
    fn test_collection_change_invalidates_both_collections() {
        let id = PrimPath::new("/scene/target").unwrap();
        let scene = MemorySceneDelegate::new(PrimPath::new("/scene").unwrap());
        let guides = Token::from_static("guides");
        scene.set(
            &id,
            scene_keys::DRAW_TARGET_PARAMS,
            DrawTargetParams {
                collection: guides.clone(),
                resolution: [64, 32],
                ..Default::default()
            },
        );

        let mut tracker = ChangeTracker::new();
        let geometry_version = tracker.collection_version(&render_tags::GEOMETRY);
        let guides_version = tracker.collection_version(&guides);
        let instancers = InstancerMap::new();
        let mut target = StreamDrawTarget::new(id);
        let mut ctx = SyncContext {
            scene_delegate: &scene,
            render_param: None,
            tracker: &mut tracker,
            instancers: &instancers,
        };
        let mut bits = DirtyBits::DIRTY_PARAMS;
        target.sync(&mut ctx, &mut bits);

        assert_eq!(target.params().resolution, [64, 32]);
        assert!(tracker.collection_version(&render_tags::GEOMETRY) > geometry_version);
        assert!(tracker.collection_version(&guides) > guides_version);
        let cached = target
            .get(&scene_keys::DRAW_TARGET_PARAMS)
            .and_then(|v| v.cloned::<DrawTargetParams>());
        assert_eq!(cached.map(|p| p.collection), Some(guides));
    }
}
