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

//! # Strata Data
//!
//! The render index and the structures it manages: per-type primitive
//! registries, rprim collections, versioned dirty lists, and the task
//! contract driven by the engine.

#![warn(missing_docs)]

pub mod collection;
pub mod dirty_list;
pub mod error;
pub mod prim_type_index;
pub mod render_index;
pub mod task;

pub use collection::RprimCollection;
pub use dirty_list::{DirtyList, SharedDirtyList};
pub use error::IndexError;
pub use prim_type_index::{PrimEntry, PrimTypeIndex};
pub use render_index::{PickResult, RenderIndex};
pub use task::{shared_task, SharedTask, Task, TaskError, TaskState};
