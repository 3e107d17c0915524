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

//! Surface shader sprim.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use strata_core::token::scene_keys;
use strata_core::{DirtyBits, PrimPath, Sprim, SyncContext, Token, Value};

/// Source used by the fallback shader and by shaders with no authored source.
pub const FALLBACK_SURFACE_SOURCE: &str =
    "vec4 surfaceShader(vec4 Peye, vec3 Neye, vec4 color) { return color; }";

/// A compiled surface program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderProgram {
    /// Hash of the source the program was built from.
    pub source_hash: u64,
    /// Number of reloads before this build.
    pub generation: u32,
}

/// Surface shader of the stream backend.
#[derive(Debug)]
pub struct StreamShader {
    id: PrimPath,
    source: String,
    program: Option<ShaderProgram>,
    generation: u32,
}

impl StreamShader {
    /// Creates a shader that has not pulled its source yet.
    pub fn new(id: PrimPath) -> Self {
        Self {
            id,
            source: String::new(),
            program: None,
            generation: 0,
        }
    }

    /// The fallback shader, built from the built-in source.
    pub fn fallback() -> Self {
        let mut shader = Self::new(PrimPath::empty());
        shader.source = FALLBACK_SURFACE_SOURCE.to_owned();
        shader.build();
        shader
    }

    /// Current source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Current program, if built.
    pub fn program(&self) -> Option<ShaderProgram> {
        self.program
    }

    fn build(&mut self) {
        let mut hasher = DefaultHasher::new();
        self.source.hash(&mut hasher);
        self.program = Some(ShaderProgram {
            source_hash: hasher.finish(),
            generation: self.generation,
        });
    }
}

impl Sprim for StreamShader {
    fn id(&self) -> &PrimPath {
        &self.id
    }

    fn initial_dirty_bits_mask(&self) -> DirtyBits {
        DirtyBits::DIRTY_PARAMS | DirtyBits::DIRTY_SHADER
    }

    fn sync(&mut self, ctx: &mut SyncContext<'_>, dirty_bits: &mut DirtyBits) {
        if dirty_bits.intersects(DirtyBits::DIRTY_PARAMS | DirtyBits::DIRTY_SHADER) {
            self.source = ctx
                .scene_delegate
                .get(&self.id, &scene_keys::SURFACE_SHADER_SOURCE)
                .and_then(|v| v.cloned::<String>())
                .unwrap_or_else(|| FALLBACK_SURFACE_SOURCE.to_owned());
            self.build();
        }
        *dirty_bits = DirtyBits::CLEAN;
    }

    fn get(&self, key: &Token) -> Option<Value> {
        (*key == scene_keys::SURFACE_SHADER_SOURCE).then(|| Value::new(self.source.clone()))
    }

    fn reload(&mut self) {
        self.generation += 1;
        if !self.source.is_empty() {
            self.build();
        }
        log::debug!("StreamShader {}: reloaded (generation {})", self.id, self.generation);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_built() {
        let shader = StreamShader::fallback();
        assert_eq!(shader.source(), FALLBACK_SURFACE_SOURCE);
        assert_eq!(shader.program().map(|p| p.generation), Some(0));
    }

    #[test]
    fn test_reload_rebuilds_program() {
        let mut shader = StreamShader::fallback();
        let before = shader.program().unwrap();
        shader.reload();
        let after = shader.program().unwrap();
        assert_eq!(after.source_hash, before.source_hash);
        assert_eq!(after.generation, 1);
    }

    #[test]
    fn test_unsynced_shader_has_no_program() {
        let mut shader = StreamShader::new(PrimPath::new("/mat/s").unwrap());
        shader.reload();
        assert!(shader.program().is_none());
    }
}
