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

//! Phase orchestration over a render index.

use crate::report::{ExecutionReport, Phase, PhaseTimings, TaskFailure};
use std::time::Instant;
use strata_core::token::{context_keys, perf_counters, prim_types};
use strata_core::{DirtyBits, EngineSettings, PassStats, PrimPath, TaskContext, Token, Value};
use strata_data::{shared_task, RenderIndex, SharedTask, TaskError, TaskState};
use strata_tasks::{DrawTask, RenderPass, RenderPassState};

/// Drives tasks over a [`RenderIndex`].
///
/// Each call to [`Engine::execute`] runs three phases in order:
///
/// 1. **Sync**: the index syncs its prims, every task syncs, then the
///    dirty lists the tasks queued are synced.
/// 2. **Commit**: the render delegate resolves pending resources and
///    collects garbage when asked to.
/// 3. **Execute**: every task that synced executes, in the given order.
///
/// The engine owns the task context shared by all tasks. Entries persist
/// between invocations, except the pass statistics which restart at every
/// call.
#[derive(Debug, Default)]
pub struct Engine {
    settings: EngineSettings,
    task_context: TaskContext,
}

impl Engine {
    /// Creates an engine with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with explicit settings.
    pub fn with_settings(settings: EngineSettings) -> Self {
        Self {
            settings,
            task_context: TaskContext::new(),
        }
    }

    /// The engine's settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set_task_context_data(&mut self, key: Token, value: Value) {
        self.task_context.set(key, value);
    }

    /// Removes the value under `key`. Unknown keys are ignored.
    pub fn remove_task_context_data(&mut self, key: &Token) {
        self.task_context.remove(key);
    }

    /// The value under `key`.
    pub fn task_context_data(&self, key: &Token) -> Option<&Value> {
        self.task_context.get(key)
    }

    /// The shared task context.
    pub fn task_context(&self) -> &TaskContext {
        &self.task_context
    }

    /// Runs one sync, commit and execute cycle over `tasks`.
    ///
    /// A task failing to sync is not executed; the remaining tasks still
    /// run. Failures are logged and collected in the report.
    pub fn execute(&mut self, index: &mut RenderIndex, tasks: &[SharedTask]) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let mut states = vec![TaskState::Constructed; tasks.len()];
        self.task_context.remove(&context_keys::PASS_STATS);
        index
            .perf_log()
            .increment(&perf_counters::ENGINE_EXECUTIONS);

        // --- Sync ---
        let start = Instant::now();
        let results = index.sync_all(tasks, &mut self.task_context);
        for ((task, state), result) in tasks.iter().zip(states.iter_mut()).zip(results) {
            let next = match result {
                Ok(()) => TaskState::Synced,
                Err(error) => {
                    report.failures.push(TaskFailure {
                        task: task_id(task),
                        phase: Phase::Sync,
                        error,
                    });
                    TaskState::Failed
                }
            };
            *state = advance(*state, next);
        }
        report.timings.sync = start.elapsed();

        // --- Commit ---
        let start = Instant::now();
        index.commit_resources();
        report.timings.commit = start.elapsed();

        // --- Execute ---
        let start = Instant::now();
        let mut executed = 0u64;
        for (task, state) in tasks.iter().zip(states.iter_mut()) {
            if *state != TaskState::Synced {
                continue;
            }
            let result = match task.lock() {
                Ok(mut task) => task.execute(index, &mut self.task_context),
                Err(_) => Err(TaskError::Poisoned),
            };
            let next = match result {
                Ok(()) => {
                    executed += 1;
                    TaskState::Executed
                }
                Err(error) => {
                    let id = task_id(task);
                    log::error!("Engine: execution of task {id} failed: {error}");
                    report.failures.push(TaskFailure {
                        task: id,
                        phase: Phase::Execute,
                        error,
                    });
                    TaskState::Failed
                }
            };
            *state = advance(*state, next);
        }
        report.timings.execute = start.elapsed();

        let perf = index.perf_log();
        perf.add(&perf_counters::TASKS_EXECUTED, executed);
        perf.add(&perf_counters::TASK_FAILURES, report.failures.len() as u64);

        report.task_states = tasks.iter().map(task_id).zip(states).collect();
        report.pass_stats = self
            .task_context
            .get_as::<PassStats>(&context_keys::PASS_STATS)
            .copied()
            .unwrap_or_default();
        self.log_timings(&report.timings);
        report
    }

    /// Syncs and draws a single pass with an explicit state.
    pub fn draw(
        &mut self,
        index: &mut RenderIndex,
        render_pass: &RenderPass,
        state: &RenderPassState,
    ) -> ExecutionReport {
        let task = shared_task(DrawTask::new(render_pass, state.clone()));
        self.execute(index, &[task])
    }

    /// Forces every rprim and shader to rebuild on the next frame.
    ///
    /// Marks all rprims and shader sprims fully dirty, drops the backend's
    /// shader cache and reloads the fallback shader.
    pub fn reload_all_shaders(&mut self, index: &mut RenderIndex) {
        log::info!("Engine: reloading all shaders");
        index
            .change_tracker_mut()
            .mark_all_rprims_dirty(DirtyBits::ALL_DIRTY);

        let shaders = index.sprim_subtree(&prim_types::SHADER, &PrimPath::absolute_root());
        for id in &shaders {
            index
                .change_tracker_mut()
                .mark_sprim_dirty(id, DirtyBits::ALL_DIRTY);
        }

        index.render_delegate_mut().invalidate_shader_registry();
        match index.fallback_sprim_mut(&prim_types::SHADER) {
            Some(fallback) => fallback.reload(),
            None => log::warn!("Engine: render delegate has no fallback shader to reload"),
        }
    }

    fn log_timings(&self, timings: &PhaseTimings) {
        if self.settings.log_phase_timings {
            log::debug!(
                "Engine: sync {:?}, commit {:?}, execute {:?} (total {:?})",
                timings.sync,
                timings.commit,
                timings.execute,
                timings.total()
            );
        } else {
            log::trace!("Engine: frame took {:?}", timings.total());
        }
    }
}

fn task_id(task: &SharedTask) -> PrimPath {
    task.lock()
        .map(|task| task.id().clone())
        .unwrap_or_else(|e| e.into_inner().id().clone())
}

fn advance(from: TaskState, to: TaskState) -> TaskState {
    from.transition(to).unwrap_or_else(|e| {
        log::error!("Engine: {e}");
        TaskState::Failed
    })
}
