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

//! The stream render delegate.
//!
//! A CPU-side backend: prims stage their buffers into a
//! [`ResourceRegistry`] during sync, `commit_resources` resolves and uploads
//! them, and every executed pass is captured by a [`FrameRecorder`].

use crate::frame_recorder::{DrawCommand, FrameRecorder, RecordedPass};
use crate::prims::{
    GeometryKind, StreamCamera, StreamDrawTarget, StreamLight, StreamRprim, StreamShader,
    StreamTexture,
};
use crate::resource_registry::ResourceRegistry;
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};
use strata_core::token::prim_types;
use strata_core::{
    Bprim, ChangeTracker, DrawItem, IdColor, PassParams, PassStats, PrimKind, PrimPath,
    RenderDelegate, RenderDelegateError, RenderParam, Rprim, Sprim, StreamSettings, Token,
};

/// Words per indirect draw command.
pub const DRAW_COMMAND_STRIDE: usize = 5;

static SUPPORTED_RPRIM_TYPES: [Token; 3] = [
    prim_types::MESH,
    prim_types::BASIS_CURVES,
    prim_types::POINTS,
];

static SUPPORTED_SPRIM_TYPES: [Token; 4] = [
    prim_types::CAMERA,
    prim_types::LIGHT,
    prim_types::DRAW_TARGET,
    prim_types::SHADER,
];

static SUPPORTED_BPRIM_TYPES: [Token; 1] = [prim_types::TEXTURE];

/// Backend state shared with primitives during sync.
#[derive(Debug, Clone)]
pub struct StreamRenderParam {
    registry: Arc<Mutex<ResourceRegistry>>,
}

impl StreamRenderParam {
    /// Locks the resource registry.
    pub fn registry(&self) -> MutexGuard<'_, ResourceRegistry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RenderParam for StreamRenderParam {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Number of live primitives created by a delegate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimCounts {
    /// Live rprims.
    pub rprims: usize,
    /// Live sprims, fallbacks included.
    pub sprims: usize,
    /// Live bprims, fallbacks included.
    pub bprims: usize,
}

/// Render delegate of the stream backend.
#[derive(Debug)]
pub struct StreamRenderDelegate {
    settings: StreamSettings,
    render_param: StreamRenderParam,
    recorder: FrameRecorder,
    live: PrimCounts,
}

impl StreamRenderDelegate {
    /// Creates a delegate with an empty registry.
    pub fn new(settings: StreamSettings) -> Self {
        let registry = ResourceRegistry::new(settings);
        Self {
            settings,
            render_param: StreamRenderParam {
                registry: Arc::new(Mutex::new(registry)),
            },
            recorder: FrameRecorder::default(),
            live: PrimCounts::default(),
        }
    }

    /// Locks the resource registry.
    pub fn resource_registry(&self) -> MutexGuard<'_, ResourceRegistry> {
        self.render_param.registry()
    }

    /// Passes executed so far.
    pub fn frame_recorder(&self) -> &FrameRecorder {
        &self.recorder
    }

    /// Live primitive counts.
    pub fn prim_counts(&self) -> PrimCounts {
        self.live
    }

    fn new_sprim(type_id: &Token, id: PrimPath) -> Option<Box<dyn Sprim>> {
        let sprim: Box<dyn Sprim> = if *type_id == prim_types::CAMERA {
            Box::new(StreamCamera::new(id))
        } else if *type_id == prim_types::LIGHT {
            Box::new(StreamLight::new(id))
        } else if *type_id == prim_types::DRAW_TARGET {
            Box::new(StreamDrawTarget::new(id))
        } else if *type_id == prim_types::SHADER {
            Box::new(StreamShader::new(id))
        } else {
            return None;
        };
        Some(sprim)
    }

    fn unknown(kind: PrimKind, type_id: &Token) -> RenderDelegateError {
        RenderDelegateError::UnknownPrimType {
            kind,
            type_id: type_id.clone(),
        }
    }
}

impl RenderDelegate for StreamRenderDelegate {
    fn delegate_type(&self) -> &str {
        "stream"
    }

    fn supported_rprim_types(&self) -> &[Token] {
        &SUPPORTED_RPRIM_TYPES
    }

    fn supported_sprim_types(&self) -> &[Token] {
        &SUPPORTED_SPRIM_TYPES
    }

    fn supported_bprim_types(&self) -> &[Token] {
        &SUPPORTED_BPRIM_TYPES
    }

    fn render_param(&self) -> Option<&dyn RenderParam> {
        Some(&self.render_param)
    }

    fn create_rprim(
        &mut self,
        type_id: &Token,
        id: &PrimPath,
        instancer_id: Option<&PrimPath>,
    ) -> Result<Box<dyn Rprim>, RenderDelegateError> {
        let kind =
            GeometryKind::from_type(type_id).ok_or_else(|| Self::unknown(PrimKind::Rprim, type_id))?;
        self.live.rprims += 1;
        Ok(Box::new(StreamRprim::new(
            kind,
            id.clone(),
            instancer_id.cloned(),
        )))
    }

    fn destroy_rprim(&mut self, rprim: Box<dyn Rprim>) {
        log::trace!("StreamRenderDelegate: destroying rprim {}", rprim.id());
        self.live.rprims = self.live.rprims.saturating_sub(1);
    }

    fn create_sprim(
        &mut self,
        type_id: &Token,
        id: &PrimPath,
    ) -> Result<Box<dyn Sprim>, RenderDelegateError> {
        let sprim = Self::new_sprim(type_id, id.clone())
            .ok_or_else(|| Self::unknown(PrimKind::Sprim, type_id))?;
        self.live.sprims += 1;
        Ok(sprim)
    }

    fn create_fallback_sprim(
        &mut self,
        type_id: &Token,
    ) -> Result<Box<dyn Sprim>, RenderDelegateError> {
        let sprim: Box<dyn Sprim> = if *type_id == prim_types::SHADER {
            Box::new(StreamShader::fallback())
        } else {
            Self::new_sprim(type_id, PrimPath::empty())
                .ok_or_else(|| Self::unknown(PrimKind::Sprim, type_id))?
        };
        self.live.sprims += 1;
        Ok(sprim)
    }

    fn destroy_sprim(&mut self, sprim: Box<dyn Sprim>) {
        log::trace!("StreamRenderDelegate: destroying sprim {}", sprim.id());
        self.live.sprims = self.live.sprims.saturating_sub(1);
    }

    fn create_bprim(
        &mut self,
        type_id: &Token,
        id: &PrimPath,
    ) -> Result<Box<dyn Bprim>, RenderDelegateError> {
        if *type_id != prim_types::TEXTURE {
            return Err(Self::unknown(PrimKind::Bprim, type_id));
        }
        self.live.bprims += 1;
        Ok(Box::new(StreamTexture::new(id.clone())))
    }

    fn create_fallback_bprim(
        &mut self,
        type_id: &Token,
    ) -> Result<Box<dyn Bprim>, RenderDelegateError> {
        if *type_id != prim_types::TEXTURE {
            return Err(Self::unknown(PrimKind::Bprim, type_id));
        }
        self.live.bprims += 1;
        Ok(Box::new(StreamTexture::fallback()))
    }

    fn destroy_bprim(&mut self, bprim: Box<dyn Bprim>) {
        log::trace!("StreamRenderDelegate: destroying bprim {}", bprim.id());
        self.live.bprims = self.live.bprims.saturating_sub(1);
    }

    fn commit_resources(&mut self, tracker: &mut ChangeTracker) {
        let mut registry = self.render_param.registry();
        registry.commit();

        if tracker.is_garbage_collection_needed() {
            registry.garbage_collect();
            tracker.clear_garbage_collection_needed();
            // Reclaimed ranges invalidate cached draw batches.
            tracker.mark_all_collections_dirty();
        }

        if self.settings.collect_dispatch_buffers {
            registry.garbage_collect_dispatch_buffers();
        }
    }

    fn invalidate_shader_registry(&mut self) {
        self.render_param
            .registry()
            .invalidate_geometric_shader_registry();
    }

    fn execute_pass(
        &self,
        params: &PassParams,
        items: &[&DrawItem],
    ) -> Result<PassStats, RenderDelegateError> {
        let mut registry = self.render_param.registry();
        let mut stats = PassStats::default();
        let mut commands = Vec::with_capacity(items.len());

        for item in items {
            let data = item.snapshot();
            if let Some(handle) = data.geometry {
                if registry.buffer_data(handle).is_none() {
                    return Err(RenderDelegateError::ExecutionFailed(format!(
                        "draw item of {} references non-resident buffer {handle:?}",
                        item.rprim_id()
                    )));
                }
            }
            stats.draw_items += 1;
            stats.instances += u64::from(data.instance_count);
            stats.elements += u64::from(data.element_count) * u64::from(data.instance_count);
            commands.push(DrawCommand {
                rprim_id: item.rprim_id().clone(),
                repr: item.repr().clone(),
                render_tag: item.render_tag().clone(),
                prim_id: data.prim_id,
                id_color: IdColor::encode(data.prim_id),
                instance_count: data.instance_count,
                element_count: data.element_count,
                geometry: data.geometry,
                world_transform: data.world_transform,
            });
        }

        let dispatch_buffer = registry.register_dispatch_buffer(commands.len(), DRAW_COMMAND_STRIDE);
        drop(registry);

        log::trace!(
            "StreamRenderDelegate: executed pass '{}' with {} draw items",
            params.collection,
            stats.draw_items
        );
        self.recorder.record(RecordedPass {
            params: params.clone(),
            commands,
            dispatch_buffer,
        });
        Ok(stats)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::RwLock;
    use strata_core::DrawItemData;

    fn path(p: &str) -> PrimPath {
        PrimPath::new(p).unwrap()
    }

    #[test]
    fn test_supported_types() {
        let delegate = StreamRenderDelegate::new(StreamSettings::default());
        assert!(delegate.supported_rprim_types().contains(&prim_types::MESH));
        assert!(delegate.supported_sprim_types().contains(&prim_types::CAMERA));
        assert_eq!(delegate.supported_bprim_types(), &[prim_types::TEXTURE]);
        assert!(delegate.render_param().is_some());
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        let mut delegate = StreamRenderDelegate::new(StreamSettings::default());
        let volume = Token::from_static("volume");
        assert!(matches!(
            delegate.create_rprim(&volume, &path("/v"), None),
            Err(RenderDelegateError::UnknownPrimType {
                kind: PrimKind::Rprim,
                ..
            })
        ));
        assert!(delegate.create_sprim(&volume, &path("/v")).is_err());
        assert!(delegate.create_fallback_bprim(&volume).is_err());
        assert_eq!(delegate.prim_counts(), PrimCounts::default());
    }

    #[test]
    fn test_live_counts_follow_create_and_destroy() {
        let mut delegate = StreamRenderDelegate::new(StreamSettings::default());
        let mesh = delegate
            .create_rprim(&prim_types::MESH, &path("/m"), None)
            .unwrap();
        let camera = delegate.create_fallback_sprim(&prim_types::CAMERA).unwrap();
        assert!(camera.id().is_empty());
        assert_eq!(delegate.prim_counts().rprims, 1);
        assert_eq!(delegate.prim_counts().sprims, 1);
        delegate.destroy_rprim(mesh);
        delegate.destroy_sprim(camera);
        assert_eq!(delegate.prim_counts(), PrimCounts::default());
    }

    #[test]
    fn test_commit_collects_when_requested() {
        let mut delegate = StreamRenderDelegate::new(StreamSettings::default());
        let range = delegate.resource_registry().allocate_range(Token::from_static("points"));
        let handle = range.handle();
        drop(range);

        let mut tracker = ChangeTracker::new();
        let version = tracker.global_collection_version();
        delegate.commit_resources(&mut tracker);
        assert!(delegate.resource_registry().is_allocated(handle));

        tracker.mark_garbage_collection_needed();
        delegate.commit_resources(&mut tracker);
        assert!(!delegate.resource_registry().is_allocated(handle));
        assert!(!tracker.is_garbage_collection_needed());
        assert!(tracker.global_collection_version() > version);
    }

    #[test]
    fn test_execute_pass_records_commands() {
        let delegate = StreamRenderDelegate::new(StreamSettings::default());
        let data = Arc::new(RwLock::new(DrawItemData {
            prim_id: 7,
            instance_count: 3,
            element_count: 2,
            ..Default::default()
        }));
        let item = DrawItem::new(
            path("/m"),
            Token::from_static("hull"),
            Token::from_static("geometry"),
            data,
        );

        let stats = delegate
            .execute_pass(&PassParams::default(), &[&item])
            .unwrap();
        assert_eq!(stats.draw_items, 1);
        assert_eq!(stats.instances, 3);
        assert_eq!(stats.elements, 6);

        let pass = delegate.frame_recorder().last_pass().unwrap();
        assert_eq!(pass.commands.len(), 1);
        assert_eq!(pass.commands[0].id_color, IdColor::encode(7));
        assert_eq!(pass.dispatch_buffer.command_count, 1);
    }

    #[test]
    fn test_execute_pass_fails_on_missing_buffers() {
        let delegate = StreamRenderDelegate::new(StreamSettings::default());
        let data = Arc::new(RwLock::new(DrawItemData {
            geometry: Some(strata_core::ResourceHandle(99)),
            ..Default::default()
        }));
        let item = DrawItem::new(
            path("/m"),
            Token::from_static("hull"),
            Token::from_static("geometry"),
            data,
        );
        let result = delegate.execute_pass(&PassParams::default(), &[&item]);
        assert!(matches!(result, Err(RenderDelegateError::ExecutionFailed(_))));
        assert_eq!(delegate.frame_recorder().pass_count(), 0);
    }
}
