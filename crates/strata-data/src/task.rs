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

//! # Task Abstraction
//!
//! A **Task** is a unit of render work with a two-phase contract:
//!
//! 1. **Sync**: reads and writes the shared [`TaskContext`], reads params
//!    from its scene delegate and queues the dirty lists it needs synced. It
//!    receives the render index mutably.
//! 2. **Execute**: issues backend work. It only sees the render index
//!    immutably, so it cannot alter scene dirty state.
//!
//! All tasks of an invocation sync before any of them executes.
//!
//! ```rust
//! use strata_data::{shared_task, RenderIndex, SharedTask, Task, TaskError};
//! use strata_core::{PrimPath, TaskContext, Token};
//!
//! struct FrameCounter { id: PrimPath, frames: u64 }
//!
//! impl Task for FrameCounter {
//!     fn id(&self) -> &PrimPath { &self.id }
//!
//!     fn sync(&mut self, _index: &mut RenderIndex, ctx: &mut TaskContext) -> Result<(), TaskError> {
//!         self.frames += 1;
//!         ctx.insert(Token::new("frame"), self.frames);
//!         Ok(())
//!     }
//!
//!     fn execute(&mut self, _index: &RenderIndex, _ctx: &mut TaskContext) -> Result<(), TaskError> {
//!         Ok(())
//!     }
//! }
//!
//! let task: SharedTask = shared_task(FrameCounter {
//!     id: PrimPath::new("/tasks/frames").unwrap(),
//!     frames: 0,
//! });
//! assert_eq!(task.lock().unwrap().id().as_str(), "/tasks/frames");
//! ```

use crate::render_index::RenderIndex;
use std::fmt;
use std::sync::{Arc, Mutex};
use strata_core::{PrimPath, RenderDelegateError, TaskContext, Token};
use thiserror::Error;

/// A task shared between the caller, the render index and the engine.
pub type SharedTask = Arc<Mutex<dyn Task>>;

/// Wraps a task for sharing.
pub fn shared_task<T: Task + 'static>(task: T) -> SharedTask {
    Arc::new(Mutex::new(task))
}

/// An error raised by a task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A context entry the task depends on is absent or has the wrong type.
    #[error("Task context entry '{0}' is missing or has an unexpected type")]
    MissingContextData(Token),

    /// The task's params could not be read from its scene delegate.
    #[error("Task {task} has no usable params: {reason}")]
    InvalidParams {
        /// The failing task.
        task: PrimPath,
        /// What went wrong.
        reason: String,
    },

    /// Another thread panicked while holding the task.
    #[error("Task lock poisoned")]
    Poisoned,

    /// The backend rejected the task's work.
    #[error("Render delegate error: {0}")]
    Delegate(#[from] RenderDelegateError),

    /// A lifecycle transition was attempted out of order.
    #[error("Invalid task transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: TaskState,
        /// Requested state.
        to: TaskState,
    },
}

/// Where a task stands within one engine invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskState {
    /// Created or reset for a new invocation; not synced yet.
    #[default]
    Constructed,
    /// Sync succeeded.
    Synced,
    /// Execute ran.
    Executed,
    /// Sync or execute failed.
    Failed,
}

impl TaskState {
    /// Checks and performs a transition.
    ///
    /// Transitions are linear within an invocation. A task that executed or
    /// failed may sync again in the next invocation, and any state may fail.
    pub fn transition(self, to: TaskState) -> Result<TaskState, TaskError> {
        use TaskState::*;
        let allowed = matches!(
            (self, to),
            (Constructed | Executed | Failed, Synced) | (Synced, Executed) | (_, Failed)
        );
        if allowed {
            Ok(to)
        } else {
            Err(TaskError::InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Constructed => write!(f, "Constructed"),
            TaskState::Synced => write!(f, "Synced"),
            TaskState::Executed => write!(f, "Executed"),
            TaskState::Failed => write!(f, "Failed"),
        }
    }
}

/// A unit of render work.
pub trait Task: Send {
    /// The task's identity in the render index.
    fn id(&self) -> &PrimPath;

    /// Pulls inputs and prepares the dirty lists this task needs.
    fn sync(&mut self, index: &mut RenderIndex, ctx: &mut TaskContext) -> Result<(), TaskError>;

    /// Issues the task's backend work.
    fn execute(&mut self, index: &RenderIndex, ctx: &mut TaskContext) -> Result<(), TaskError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_transitions() {
        let state = TaskState::Constructed;
        let state = state.transition(TaskState::Synced).unwrap();
        let state = state.transition(TaskState::Executed).unwrap();
        assert_eq!(state, TaskState::Executed);
        // Next invocation.
        assert!(state.transition(TaskState::Synced).is_ok());
    }

    #[test]
    fn test_backward_transitions_are_rejected() {
        assert!(TaskState::Constructed
            .transition(TaskState::Executed)
            .is_err());
        assert!(TaskState::Synced
            .transition(TaskState::Constructed)
            .is_err());
        assert!(TaskState::Failed.transition(TaskState::Executed).is_err());
    }

    #[test]
    fn test_any_state_may_fail() {
        for state in [
            TaskState::Constructed,
            TaskState::Synced,
            TaskState::Executed,
        ] {
            assert_eq!(state.transition(TaskState::Failed).unwrap(), TaskState::Failed);
        }
    }
}
