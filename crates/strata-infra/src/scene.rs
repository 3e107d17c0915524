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

//! An in-memory scene delegate.

use glam::Vec3;
use std::any::Any;
use std::collections::HashMap;
use std::sync::RwLock;
use strata_core::token::scene_keys;
use strata_core::{CameraMatrices, MeshTopology, PrimPath, SceneDelegate, Token, Value};

/// A scene delegate backed by a map of `(prim, key) -> value`.
///
/// Values are set from any thread; primitives read them during sync. The
/// delegate does not track changes itself: whoever edits it is expected to
/// mark the edited prims dirty on the render index's change tracker.
#[derive(Debug)]
pub struct MemorySceneDelegate {
    delegate_id: PrimPath,
    values: RwLock<HashMap<PrimPath, HashMap<Token, Value>>>,
}

impl MemorySceneDelegate {
    /// Creates an empty delegate.
    pub fn new(delegate_id: PrimPath) -> Self {
        Self {
            delegate_id,
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Stores `value` under `(id, key)`.
    pub fn set<T: Any + Send + Sync>(&self, id: &PrimPath, key: Token, value: T) {
        self.set_value(id, key, Value::new(value));
    }

    /// Stores an already wrapped value under `(id, key)`.
    pub fn set_value(&self, id: &PrimPath, key: Token, value: Value) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id.clone())
            .or_default()
            .insert(key, value);
    }

    /// Removes `(id, key)`.
    pub fn remove(&self, id: &PrimPath, key: &Token) {
        if let Some(values) = self
            .values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(id)
        {
            values.remove(key);
        }
    }

    /// Removes every value of `id`.
    pub fn remove_prim(&self, id: &PrimPath) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    /// Stores the points and topology of a mesh.
    pub fn set_mesh(&self, id: &PrimPath, points: Vec<Vec3>, topology: MeshTopology) {
        self.set(id, scene_keys::POINTS, points);
        self.set(id, scene_keys::TOPOLOGY, topology);
    }

    /// Stores the view and projection matrices of a camera.
    pub fn set_camera(&self, id: &PrimPath, matrices: CameraMatrices) {
        self.set(id, scene_keys::CAMERA_MATRICES, matrices);
    }
}

impl SceneDelegate for MemorySceneDelegate {
    fn delegate_id(&self) -> &PrimPath {
        &self.delegate_id
    }

    fn get(&self, id: &PrimPath, key: &Token) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)?
            .get(key)
            .cloned()
    }
}
