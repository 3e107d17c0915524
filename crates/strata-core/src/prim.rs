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

//! Primitive contracts implemented by render backends.
//!
//! A render index owns boxed primitives created by the render delegate and
//! drives their sync step. Primitives consume the bits they handled from the
//! `dirty_bits` argument; whatever remains is written back to the change
//! tracker, so a primitive that forgets to clear a bit is visited again on
//! the next sync.

use crate::change_tracker::ChangeTracker;
use crate::dirty::DirtyBits;
use crate::draw::DrawItem;
use crate::instancer::InstancerMap;
use crate::path::PrimPath;
use crate::scene_delegate::SceneDelegate;
use crate::token::{render_tags, Token};
use crate::value::Value;
use std::any::Any;

/// Backend state shared with primitives during sync.
///
/// Render delegates hand one out through
/// [`RenderDelegate::render_param`](crate::RenderDelegate::render_param);
/// primitives downcast it to the backend's concrete type.
pub trait RenderParam: Send + Sync {
    /// Returns `self` as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Everything a primitive can reach while it syncs.
pub struct SyncContext<'a> {
    /// Delegate owning the primitive being synced.
    pub scene_delegate: &'a dyn SceneDelegate,
    /// Backend state, if the delegate exposes any.
    pub render_param: Option<&'a dyn RenderParam>,
    /// Change tracker of the index, for cross-object invalidation.
    pub tracker: &'a mut ChangeTracker,
    /// Instancers of the index, already synced for this pass.
    pub instancers: &'a InstancerMap,
}

impl<'a> SyncContext<'a> {
    /// Downcasts the render param to a backend type.
    pub fn render_param_as<T: Any>(&self) -> Option<&'a T> {
        self.render_param.and_then(|p| p.as_any().downcast_ref::<T>())
    }
}

/// A drawable primitive.
pub trait Rprim: Send + Sync {
    /// The rprim's identity.
    fn id(&self) -> &PrimPath;

    /// Instancer drawing this rprim, if any.
    fn instancer_id(&self) -> Option<&PrimPath>;

    /// Instance id used for picking. `0` until the index assigns one.
    fn prim_id(&self) -> u32;

    /// Stores the instance id assigned by the index.
    fn set_prim_id(&mut self, prim_id: u32);

    /// Bits the rprim starts with when inserted.
    fn initial_dirty_bits_mask(&self) -> DirtyBits {
        DirtyBits::ALL_DIRTY
    }

    /// Render tag the rprim's draw items are grouped under.
    fn render_tag(&self) -> Token {
        render_tags::GEOMETRY
    }

    /// Returns `true` once draw items for `repr` exist.
    fn has_repr(&self, repr: &Token) -> bool;

    /// Pulls changed data and updates backend resources for `repr`.
    fn sync(&mut self, ctx: &mut SyncContext<'_>, dirty_bits: &mut DirtyBits, repr: &Token);

    /// Draw items of `repr`. Empty if the repr was never synced or the prim
    /// is invisible.
    fn draw_items(&self, repr: &Token) -> Vec<DrawItem>;

    /// Returns `self` as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A state primitive: camera, light, draw target, shader.
pub trait Sprim: Send + Sync {
    /// The sprim's identity. Empty for fallback instances.
    fn id(&self) -> &PrimPath;

    /// Bits the sprim starts with when inserted.
    fn initial_dirty_bits_mask(&self) -> DirtyBits {
        DirtyBits::ALL_DIRTY
    }

    /// Pulls changed data, consuming the handled bits.
    fn sync(&mut self, ctx: &mut SyncContext<'_>, dirty_bits: &mut DirtyBits);

    /// Cached value for `key`, as pulled during the last sync.
    fn get(&self, key: &Token) -> Option<Value>;

    /// Rebuilds derived programs or caches. Used when shaders are reloaded.
    fn reload(&mut self) {}

    /// Returns `self` as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A buffer primitive: textures and other raw backend data.
pub trait Bprim: Send + Sync {
    /// The bprim's identity. Empty for fallback instances.
    fn id(&self) -> &PrimPath;

    /// Bits the bprim starts with when inserted.
    fn initial_dirty_bits_mask(&self) -> DirtyBits {
        DirtyBits::ALL_DIRTY
    }

    /// Pulls changed data, consuming the handled bits.
    fn sync(&mut self, ctx: &mut SyncContext<'_>, dirty_bits: &mut DirtyBits);

    /// Cached value for `key`.
    fn get(&self, _key: &Token) -> Option<Value> {
        None
    }

    /// Returns `self` as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}
