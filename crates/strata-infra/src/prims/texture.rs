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

//! Texture bprim.

use crate::render_delegate::StreamRenderParam;
use crate::resource_registry::{BufferRange, BufferSource};
use std::any::Any;
use strata_core::token::scene_keys;
use strata_core::{Bprim, DirtyBits, PrimPath, ResourceHandle, SyncContext, Token, Value};

const TEXELS: Token = Token::from_static("texels");

/// RGBA8 texel data as authored in the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureResource {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Row-major RGBA8 texels.
    pub texels: Vec<u8>,
}

impl TextureResource {
    /// A texture filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            texels: rgba.repeat(count),
        }
    }

    /// Returns `true` if the texel data matches the dimensions.
    pub fn is_valid(&self) -> bool {
        self.texels.len() == self.width as usize * self.height as usize * 4
    }
}

/// Texture of the stream backend.
#[derive(Debug)]
pub struct StreamTexture {
    id: PrimPath,
    resource: TextureResource,
    range: Option<BufferRange>,
}

impl StreamTexture {
    /// Creates an empty texture.
    pub fn new(id: PrimPath) -> Self {
        Self {
            id,
            resource: TextureResource::solid(0, 0, [0; 4]),
            range: None,
        }
    }

    /// The fallback texture: a single white texel.
    pub fn fallback() -> Self {
        Self {
            id: PrimPath::empty(),
            resource: TextureResource::solid(1, 1, [255; 4]),
            range: None,
        }
    }

    /// Texel data as last synced.
    pub fn resource(&self) -> &TextureResource {
        &self.resource
    }

    /// Storage of the texels, once staged.
    pub fn handle(&self) -> Option<ResourceHandle> {
        self.range.as_ref().map(BufferRange::handle)
    }
}

impl Bprim for StreamTexture {
    fn id(&self) -> &PrimPath {
        &self.id
    }

    fn initial_dirty_bits_mask(&self) -> DirtyBits {
        DirtyBits::DIRTY_TEXTURE | DirtyBits::DIRTY_PARAMS
    }

    fn sync(&mut self, ctx: &mut SyncContext<'_>, dirty_bits: &mut DirtyBits) {
        if !dirty_bits.intersects(DirtyBits::DIRTY_TEXTURE | DirtyBits::DIRTY_PARAMS) {
            *dirty_bits = DirtyBits::CLEAN;
            return;
        }
        let Some(param) = ctx.render_param_as::<StreamRenderParam>() else {
            log::error!("StreamTexture {}: synced without a stream render param", self.id);
            *dirty_bits = DirtyBits::CLEAN;
            return;
        };

        let resource = ctx
            .scene_delegate
            .get(&self.id, &scene_keys::TEXTURE_RESOURCE)
            .and_then(|v| v.cloned::<TextureResource>())
            .unwrap_or_else(|| TextureResource::solid(0, 0, [0; 4]));
        if !resource.is_valid() {
            log::warn!(
                "StreamTexture {}: {}x{} texture has {} bytes of texels, ignoring",
                self.id,
                resource.width,
                resource.height,
                resource.texels.len()
            );
            *dirty_bits = DirtyBits::CLEAN;
            return;
        }

        let resized = (resource.width, resource.height) != (self.resource.width, self.resource.height);
        let mut registry = param.registry();
        if resized || self.range.is_none() {
            if self.range.replace(registry.allocate_range(TEXELS)).is_some() {
                ctx.tracker.mark_garbage_collection_needed();
            }
        }
        if let Some(range) = &self.range {
            if let Err(e) = registry.add_source(range, BufferSource::Texels(resource.texels.clone())) {
                log::error!("StreamTexture {}: failed to stage texels: {e}", self.id);
            }
        }
        self.resource = resource;
        *dirty_bits = DirtyBits::CLEAN;
    }

    fn get(&self, key: &Token) -> Option<Value> {
        (*key == scene_keys::TEXTURE_RESOURCE).then(|| Value::new(self.resource.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_delegate::StreamRenderDelegate;
    use crate::scene::MemorySceneDelegate;
    use strata_core::{ChangeTracker, InstancerMap, RenderDelegate, StreamSettings};

    fn sync(
        texture: &mut StreamTexture,
        scene: &MemorySceneDelegate,
        delegate: &StreamRenderDelegate,
        tracker: &mut ChangeTracker,
    ) {
        let instancers = InstancerMap::new();
        let mut ctx = SyncContext {
            scene_delegate: scene,
            render_param: delegate.render_param(),
            tracker,
            instancers: &instancers,
        };
        let mut bits = DirtyBits::DIRTY_TEXTURE;
        texture.sync(&mut ctx, &mut bits);
        assert_eq!(bits, DirtyBits::CLEAN);
    }

    #[test]
    fn test_upload_and_resize() {
        let id = PrimPath::new("/tex/checker").unwrap();
        let scene = MemorySceneDelegate::new(PrimPath::new("/tex").unwrap());
        let mut delegate = StreamRenderDelegate::new(StreamSettings::default());
        let mut tracker = ChangeTracker::new();
        let mut texture = StreamTexture::new(id.clone());

        scene.set(&id, scene_keys::TEXTURE_RESOURCE, TextureResource::solid(2, 2, [9; 4]));
        sync(&mut texture, &scene, &delegate, &mut tracker);
        let first = texture.handle().unwrap();
        assert!(!tracker.is_garbage_collection_needed());

        delegate.commit_resources(&mut tracker);
        assert_eq!(
            delegate.resource_registry().buffer_data(first).map(<[u8]>::len),
            Some(16)
        );

        scene.set(&id, scene_keys::TEXTURE_RESOURCE, TextureResource::solid(4, 4, [9; 4]));
        sync(&mut texture, &scene, &delegate, &mut tracker);
        assert_ne!(texture.handle(), Some(first));
        assert!(tracker.is_garbage_collection_needed());
        assert_eq!(texture.resource().width, 4);
    }

    #[test]
    fn test_malformed_texels_are_ignored() {
        let id = PrimPath::new("/tex/bad").unwrap();
        let scene = MemorySceneDelegate::new(PrimPath::new("/tex").unwrap());
        let delegate = StreamRenderDelegate::new(StreamSettings::default());
        let mut tracker = ChangeTracker::new();
        let mut texture = StreamTexture::new(id.clone());
        scene.set(
            &id,
            scene_keys::TEXTURE_RESOURCE,
            TextureResource {
                width: 2,
                height: 2,
                texels: vec![0; 3],
            },
        );
        sync(&mut texture, &scene, &delegate, &mut tracker);
        assert!(texture.handle().is_none());
    }

    #[test]
    fn test_fallback_is_white() {
        let fallback = StreamTexture::fallback();
        assert!(fallback.id().is_empty());
        assert_eq!(fallback.resource().texels, vec![255; 4]);
    }
}
