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

//! # Strata Core
//!
//! Foundational crate containing scene identities, change tracking, and the
//! contracts between the render index, its primitives, scene delegates and
//! render backends.

#![warn(missing_docs)]

pub mod change_tracker;
pub mod dirty;
pub mod draw;
pub mod error;
pub mod id_color;
pub mod instancer;
pub mod math;
pub mod path;
pub mod perf;
pub mod prim;
pub mod render_delegate;
pub mod scene_delegate;
pub mod settings;
pub mod task_context;
pub mod token;
pub mod utils;
pub mod value;

pub use change_tracker::ChangeTracker;
pub use dirty::DirtyBits;
pub use draw::{
    DrawItem, DrawItemData, DrawItemView, PassParams, PassStats, ResourceHandle, SharedDrawItemData,
};
pub use error::{PathError, PrimKind, RenderDelegateError};
pub use id_color::IdColor;
pub use instancer::{Instancer, InstancerMap};
pub use path::PrimPath;
pub use perf::PerfLog;
pub use prim::{Bprim, RenderParam, Rprim, Sprim, SyncContext};
pub use render_delegate::RenderDelegate;
pub use scene_delegate::{CameraMatrices, MeshTopology, SceneDelegate, WindowPolicy};
pub use settings::{EngineSettings, IndexSettings, SettingsError, StrataConfig, StreamSettings};
pub use task_context::TaskContext;
pub use token::Token;
pub use value::Value;
