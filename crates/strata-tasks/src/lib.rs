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

//! Render passes and the tasks the engine runs each frame.
//!
//! A frame usually inserts one [`RenderSetupTask`] followed by one
//! [`RenderTask`] per collection. The setup task publishes the camera
//! framing in the task context during sync and the render tasks read it
//! back when they execute.

#![warn(missing_docs)]

pub mod draw_task;
pub mod render_pass;
pub mod render_pass_state;
pub mod render_setup_task;
pub mod render_task;

pub use draw_task::DrawTask;
pub use render_pass::RenderPass;
pub use render_pass_state::RenderPassState;
pub use render_setup_task::{RenderSetupParams, RenderSetupTask};
pub use render_task::RenderTask;
