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

//! The backend contract consumed by the render index and the engine.

use crate::change_tracker::ChangeTracker;
use crate::draw::{DrawItem, PassParams, PassStats};
use crate::error::RenderDelegateError;
use crate::path::PrimPath;
use crate::prim::{Bprim, RenderParam, Rprim, Sprim};
use crate::token::Token;
use std::any::Any;

/// Factory and resource committer of one rendering backend.
///
/// The render index owns exactly one delegate and never depends on its
/// concrete type. Every primitive the index holds was created by this trait
/// and is handed back to it for destruction.
pub trait RenderDelegate: Send + Sync {
    /// Short backend name, for logs.
    fn delegate_type(&self) -> &str;

    /// Rprim types this backend can create.
    fn supported_rprim_types(&self) -> &[Token];

    /// Sprim types this backend can create. The index creates one fallback
    /// sprim for each.
    fn supported_sprim_types(&self) -> &[Token];

    /// Bprim types this backend can create. The index creates one fallback
    /// bprim for each.
    fn supported_bprim_types(&self) -> &[Token];

    /// Backend state shared with primitives during sync.
    fn render_param(&self) -> Option<&dyn RenderParam> {
        None
    }

    /// Creates an rprim of `type_id`.
    fn create_rprim(
        &mut self,
        type_id: &Token,
        id: &PrimPath,
        instancer_id: Option<&PrimPath>,
    ) -> Result<Box<dyn Rprim>, RenderDelegateError>;

    /// Releases an rprim and its backend resources.
    fn destroy_rprim(&mut self, rprim: Box<dyn Rprim>);

    /// Creates an sprim of `type_id`.
    fn create_sprim(
        &mut self,
        type_id: &Token,
        id: &PrimPath,
    ) -> Result<Box<dyn Sprim>, RenderDelegateError>;

    /// Creates the fallback sprim of `type_id`.
    fn create_fallback_sprim(
        &mut self,
        type_id: &Token,
    ) -> Result<Box<dyn Sprim>, RenderDelegateError>;

    /// Releases an sprim.
    fn destroy_sprim(&mut self, sprim: Box<dyn Sprim>);

    /// Creates a bprim of `type_id`.
    fn create_bprim(
        &mut self,
        type_id: &Token,
        id: &PrimPath,
    ) -> Result<Box<dyn Bprim>, RenderDelegateError>;

    /// Creates the fallback bprim of `type_id`.
    fn create_fallback_bprim(
        &mut self,
        type_id: &Token,
    ) -> Result<Box<dyn Bprim>, RenderDelegateError>;

    /// Releases a bprim.
    fn destroy_bprim(&mut self, bprim: Box<dyn Bprim>);

    /// Resolves pending computations and uploads their results.
    ///
    /// When the tracker asks for garbage collection the backend reclaims
    /// unreferenced resources, clears the request and marks all collections
    /// dirty.
    fn commit_resources(&mut self, tracker: &mut ChangeTracker);

    /// Drops cached shader programs so they are rebuilt on next use.
    fn invalidate_shader_registry(&mut self) {}

    /// Draws `items` with the given pass parameters.
    fn execute_pass(
        &self,
        params: &PassParams,
        items: &[&DrawItem],
    ) -> Result<PassStats, RenderDelegateError>;

    /// Returns `self` as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}
