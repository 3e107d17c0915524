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

//! Errors raised by the render index.

use strata_core::{PrimKind, PrimPath, RenderDelegateError, SettingsError, Token};
use thiserror::Error;

/// An error raised by [`RenderIndex`](crate::RenderIndex) operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The settings passed at construction are unusable.
    #[error("Invalid index settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    /// The render delegate does not support a requested primitive type.
    #[error("Render delegate '{delegate}' does not support {kind} type '{type_id}'")]
    UnsupportedPrimType {
        /// Backend name.
        delegate: String,
        /// Primitive family.
        kind: PrimKind,
        /// Requested type.
        type_id: Token,
    },

    /// The render delegate failed to create a primitive.
    #[error("Render delegate error: {0}")]
    Delegate(#[from] RenderDelegateError),

    /// No instance id is left even after compaction.
    #[error("Instance id space exhausted while inserting {id} (max id {max})")]
    PrimIdSpaceExhausted {
        /// The rprim that could not be given an id.
        id: PrimPath,
        /// Largest representable id.
        max: u32,
    },
}
