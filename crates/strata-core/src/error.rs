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

//! Error types shared by every layer that talks to a render backend.

use crate::token::Token;
use std::fmt;

/// An error raised when a string cannot be parsed into a [`PrimPath`](crate::PrimPath).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Paths must start at the absolute root.
    NotAbsolute(String),
    /// A path contained an empty component (`//`) or a trailing separator.
    EmptyComponent(String),
    /// A path component contained a character outside `[A-Za-z0-9_.:-]`.
    InvalidCharacter {
        /// The offending path.
        path: String,
        /// The rejected character.
        character: char,
    },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::NotAbsolute(path) => {
                write!(f, "Prim path '{path}' is not absolute")
            }
            PathError::EmptyComponent(path) => {
                write!(f, "Prim path '{path}' contains an empty component")
            }
            PathError::InvalidCharacter { path, character } => {
                write!(f, "Prim path '{path}' contains invalid character '{character}'")
            }
        }
    }
}

impl std::error::Error for PathError {}

/// The family of primitive a render delegate was asked to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimKind {
    /// Drawable primitive.
    Rprim,
    /// State primitive.
    Sprim,
    /// Buffer primitive.
    Bprim,
}

impl fmt::Display for PrimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimKind::Rprim => write!(f, "Rprim"),
            PrimKind::Sprim => write!(f, "Sprim"),
            PrimKind::Bprim => write!(f, "Bprim"),
        }
    }
}

/// An error reported by a [`RenderDelegate`](crate::RenderDelegate).
#[derive(Debug)]
pub enum RenderDelegateError {
    /// The backend has no factory for the requested primitive type.
    UnknownPrimType {
        /// Which primitive family was requested.
        kind: PrimKind,
        /// The unsupported type token.
        type_id: Token,
    },
    /// The backend failed while submitting draw work.
    ExecutionFailed(String),
    /// An error originating from the specific backend implementation.
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for RenderDelegateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderDelegateError::UnknownPrimType { kind, type_id } => {
                write!(f, "Unknown {kind} type '{type_id}'")
            }
            RenderDelegateError::ExecutionFailed(msg) => {
                write!(f, "Backend execution failed: {msg}")
            }
            RenderDelegateError::Backend(err) => write!(f, "Backend error: {err}"),
        }
    }
}

impl std::error::Error for RenderDelegateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderDelegateError::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
