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

//! Light sprim.

use std::any::Any;
use strata_core::math::DMat4;
use strata_core::token::scene_keys;
use strata_core::{DirtyBits, PrimPath, Sprim, SyncContext, Token, Value};

/// Light of the stream backend. Light parameters are opaque to the backend
/// and cached as authored.
#[derive(Debug)]
pub struct StreamLight {
    id: PrimPath,
    params: Option<Value>,
    transform: DMat4,
}

impl StreamLight {
    /// Creates a light with no parameters.
    pub fn new(id: PrimPath) -> Self {
        Self {
            id,
            params: None,
            transform: DMat4::IDENTITY,
        }
    }

    /// Local to world transform.
    pub fn transform(&self) -> DMat4 {
        self.transform
    }
}

impl Sprim for StreamLight {
    fn id(&self) -> &PrimPath {
        &self.id
    }

    fn initial_dirty_bits_mask(&self) -> DirtyBits {
        DirtyBits::DIRTY_PARAMS | DirtyBits::DIRTY_TRANSFORM
    }

    fn sync(&mut self, ctx: &mut SyncContext<'_>, dirty_bits: &mut DirtyBits) {
        let scene = ctx.scene_delegate;
        if dirty_bits.contains(DirtyBits::DIRTY_PARAMS) {
            self.params = scene.get(&self.id, &scene_keys::LIGHT_PARAMS);
        }
        if dirty_bits.contains(DirtyBits::DIRTY_TRANSFORM) {
            self.transform = scene.transform(&self.id);
        }
        *dirty_bits = DirtyBits::CLEAN;
    }

    fn get(&self, key: &Token) -> Option<Value> {
        if *key == scene_keys::LIGHT_PARAMS {
            self.params.clone()
        } else if *key == scene_keys::TRANSFORM {
            Some(Value::new(self.transform))
        } else {
            None
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
