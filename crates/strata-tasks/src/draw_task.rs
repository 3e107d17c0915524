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

//! A task over an explicit pass and state.

use crate::render_pass::RenderPass;
use crate::render_pass_state::RenderPassState;
use crate::render_task::accumulate_pass_stats;
use strata_core::{PrimPath, TaskContext};
use strata_data::{RenderIndex, Task, TaskError};

/// Draws a caller-owned [`RenderPass`] with a fixed [`RenderPassState`].
///
/// Not registered in the render index, so it has no dirty state of its own.
#[derive(Debug)]
pub struct DrawTask {
    id: PrimPath,
    pass: RenderPass,
    state: RenderPassState,
}

impl DrawTask {
    /// Wraps `pass` and `state`. The pass shares its dirty list with the
    /// caller's copy.
    pub fn new(pass: &RenderPass, state: RenderPassState) -> Self {
        Self {
            id: PrimPath::empty(),
            pass: pass.clone(),
            state,
        }
    }
}

impl Task for DrawTask {
    fn id(&self) -> &PrimPath {
        &self.id
    }

    fn sync(&mut self, index: &mut RenderIndex, _ctx: &mut TaskContext) -> Result<(), TaskError> {
        self.pass.sync(index);
        Ok(())
    }

    fn execute(&mut self, index: &RenderIndex, ctx: &mut TaskContext) -> Result<(), TaskError> {
        let stats = self.pass.execute(index, &self.state)?;
        accumulate_pass_stats(ctx, stats);
        Ok(())
    }
}
