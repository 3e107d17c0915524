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

//! Outcome of one engine invocation.

use std::fmt;
use std::time::Duration;
use strata_core::{PassStats, PrimPath};
use strata_data::{TaskError, TaskState};

/// The phase a task failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pulling scene data and queueing dirty lists.
    Sync,
    /// Issuing backend work.
    Execute,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Sync => write!(f, "sync"),
            Phase::Execute => write!(f, "execute"),
        }
    }
}

/// A task that did not complete.
#[derive(Debug)]
pub struct TaskFailure {
    /// Id of the failing task.
    pub task: PrimPath,
    /// Where it failed.
    pub phase: Phase,
    /// Why.
    pub error: TaskError,
}

/// Wall time spent in each phase.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseTimings {
    /// Sync phase.
    pub sync: Duration,
    /// Commit phase.
    pub commit: Duration,
    /// Execute phase.
    pub execute: Duration,
}

impl PhaseTimings {
    /// Sum of all phases.
    pub fn total(&self) -> Duration {
        self.sync + self.commit + self.execute
    }
}

/// What happened to each task during one invocation.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Final state of each task, in the order the tasks were given.
    pub task_states: Vec<(PrimPath, TaskState)>,
    /// Tasks that failed, with their errors.
    pub failures: Vec<TaskFailure>,
    /// Time spent per phase.
    pub timings: PhaseTimings,
    /// Draw statistics accumulated by the executed passes.
    pub pass_stats: PassStats,
}

impl ExecutionReport {
    /// Returns `true` if every task executed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of tasks that reached [`TaskState::Executed`].
    pub fn executed_count(&self) -> usize {
        self.task_states
            .iter()
            .filter(|(_, state)| *state == TaskState::Executed)
            .count()
    }

    /// State of the task with id `task`.
    pub fn state_of(&self, task: &PrimPath) -> Option<TaskState> {
        self.task_states
            .iter()
            .find(|(id, _)| id == task)
            .map(|(_, state)| *state)
    }
}
