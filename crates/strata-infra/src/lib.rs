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

//! # Strata Infra
//!
//! Concrete implementations of the core contracts: the `stream` render
//! backend with its resource registry and primitives, and an in-memory
//! scene delegate.

#![warn(missing_docs)]

pub mod frame_recorder;
pub mod prims;
pub mod render_delegate;
pub mod resource_registry;
pub mod scene;

pub use frame_recorder::{DrawCommand, FrameRecorder, RecordedPass};
pub use render_delegate::{PrimCounts, StreamRenderDelegate, StreamRenderParam};
pub use resource_registry::{
    BufferRange, BufferSource, RegistryError, RegistryStats, ResourceRegistry,
};
pub use scene::MemorySceneDelegate;
