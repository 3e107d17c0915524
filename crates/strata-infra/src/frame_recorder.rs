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

//! Records what the stream backend was asked to draw.

use crate::resource_registry::DispatchBuffer;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use strata_core::math::DMat4;
use strata_core::{IdColor, PassParams, PrimPath, ResourceHandle, Token};

/// Passes kept by a recorder created with [`FrameRecorder::default`].
pub const DEFAULT_RECORDER_CAPACITY: usize = 64;

/// One draw submitted for a draw item.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// The rprim that produced the item.
    pub rprim_id: PrimPath,
    /// Repr the item was built for.
    pub repr: Token,
    /// Render tag of the item.
    pub render_tag: Token,
    /// Instance id of the rprim.
    pub prim_id: u32,
    /// `prim_id` encoded for the id buffer.
    pub id_color: IdColor,
    /// Instances drawn.
    pub instance_count: u32,
    /// Elements per instance.
    pub element_count: u32,
    /// Geometry storage.
    pub geometry: Option<ResourceHandle>,
    /// Local to world transform.
    pub world_transform: DMat4,
}

/// Everything submitted by one `execute_pass` call.
#[derive(Debug, Clone)]
pub struct RecordedPass {
    /// Parameters the pass ran with.
    pub params: PassParams,
    /// Draw commands in submission order.
    pub commands: Vec<DrawCommand>,
    /// Indirect buffer the commands were written to.
    pub dispatch_buffer: Arc<DispatchBuffer>,
}

/// Bounded history of executed passes.
///
/// Old passes are dropped once the capacity is reached, which releases their
/// dispatch buffers for collection.
#[derive(Debug)]
pub struct FrameRecorder {
    capacity: usize,
    passes: Mutex<VecDeque<RecordedPass>>,
}

impl Default for FrameRecorder {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RECORDER_CAPACITY)
    }
}

impl FrameRecorder {
    /// Creates a recorder keeping at most `capacity` passes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            passes: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends a pass, evicting the oldest one when full.
    pub fn record(&self, pass: RecordedPass) {
        let mut passes = self.passes.lock().unwrap_or_else(|e| e.into_inner());
        if passes.len() == self.capacity {
            passes.pop_front();
        }
        passes.push_back(pass);
    }

    /// Copies of the recorded passes, oldest first.
    pub fn passes(&self) -> Vec<RecordedPass> {
        self.passes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// The most recent pass.
    pub fn last_pass(&self) -> Option<RecordedPass> {
        self.passes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .back()
            .cloned()
    }

    /// Number of recorded passes.
    pub fn pass_count(&self) -> usize {
        self.passes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Forgets every recorded pass.
    pub fn clear(&self) {
        self.passes.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
