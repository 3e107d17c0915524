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

//! Per-object change bits.

use crate::strata_bitflags;

strata_bitflags! {
    /// Which categories of an object's data changed since it last synced.
    ///
    /// Bits are shared between primitive families; a sprim ignores the bits
    /// that only make sense for geometry and vice versa. Backends may define
    /// their own bits starting at [`DirtyBits::CUSTOM_BITS_BEGIN`].
    pub struct DirtyBits: u32 {
        const INIT_REPR = 1 << 0;
        /// Set while an rprim takes part in the varying set scanned by dirty lists.
        const VARYING = 1 << 1;
        const DIRTY_PRIM_ID = 1 << 2;
        const DIRTY_EXTENT = 1 << 3;
        const DIRTY_DISPLAY_STYLE = 1 << 4;
        const DIRTY_POINTS = 1 << 5;
        const DIRTY_PRIMVAR = 1 << 6;
        const DIRTY_MATERIAL_ID = 1 << 7;
        const DIRTY_TOPOLOGY = 1 << 8;
        const DIRTY_TRANSFORM = 1 << 9;
        const DIRTY_VISIBILITY = 1 << 10;
        const DIRTY_NORMALS = 1 << 11;
        const DIRTY_DOUBLE_SIDED = 1 << 12;
        const DIRTY_CULL_STYLE = 1 << 13;
        const DIRTY_WIDTHS = 1 << 15;
        const DIRTY_INSTANCER = 1 << 16;
        const DIRTY_INSTANCE_INDEX = 1 << 17;
        const DIRTY_REPR = 1 << 18;
        const DIRTY_RENDER_TAG = 1 << 19;
        /// Parameters of a sprim, bprim or task.
        const DIRTY_PARAMS = 1 << 20;
        /// The collection a task draws.
        const DIRTY_COLLECTION = 1 << 21;
        const DIRTY_CLIP_PLANES = 1 << 22;
        const DIRTY_WINDOW_POLICY = 1 << 23;
        const DIRTY_TEXTURE = 1 << 24;
        const DIRTY_SHADER = 1 << 25;
        /// Everything except [`DirtyBits::VARYING`].
        const ALL_DIRTY = !(1 << 1);
    }
}

impl DirtyBits {
    /// No pending change.
    pub const CLEAN: Self = Self::EMPTY;

    /// First bit available to backend-specific change categories.
    pub const CUSTOM_BITS_BEGIN: u32 = 1 << 26;

    /// Changes that can alter how draw items group into collections.
    pub const AFFECTS_COLLECTIONS: Self = Self::from_bits_truncate(
        Self::DIRTY_TOPOLOGY.bits()
            | Self::DIRTY_VISIBILITY.bits()
            | Self::DIRTY_RENDER_TAG.bits()
            | Self::DIRTY_REPR.bits()
            | Self::DIRTY_INSTANCER.bits()
            | Self::DIRTY_PRIM_ID.bits(),
    );

    /// Returns `true` if nothing but the varying marker is set.
    pub const fn is_clean(&self) -> bool {
        self.without(Self::VARYING).is_empty()
    }

    /// Returns `true` if at least one change bit is set.
    pub const fn is_dirty(&self) -> bool {
        !self.is_clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_dirty_excludes_varying() {
        assert!(!DirtyBits::ALL_DIRTY.contains(DirtyBits::VARYING));
        assert!(DirtyBits::ALL_DIRTY.contains(DirtyBits::DIRTY_POINTS));
        assert!(DirtyBits::ALL_DIRTY.contains(DirtyBits::DIRTY_SHADER));
    }

    #[test]
    fn varying_alone_is_clean() {
        assert!(DirtyBits::VARYING.is_clean());
        assert!(DirtyBits::CLEAN.is_clean());
        assert!((DirtyBits::VARYING | DirtyBits::DIRTY_TRANSFORM).is_dirty());
    }

    #[test]
    fn debug_lists_named_bits() {
        let bits = DirtyBits::DIRTY_POINTS | DirtyBits::DIRTY_TRANSFORM;
        assert_eq!(
            format!("{bits:?}"),
            "DirtyBits { DIRTY_POINTS | DIRTY_TRANSFORM }"
        );
    }
}
