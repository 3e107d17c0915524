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

//! Per-object dirty state and the global versions derived state is keyed on.
//!
//! The tracker never talks to primitives. Scene-side code marks objects
//! dirty, primitives consume bits during their sync step, and the render
//! index writes whatever bits remain back through the `mark_*_clean` calls.
//! Consumers that cache derived data (dirty lists, draw item views, batches)
//! compare the versions exposed here against the versions they cached.

use crate::dirty::DirtyBits;
use crate::path::PrimPath;
use crate::token::Token;
use std::collections::{BTreeSet, HashMap};

/// Dirty bits for every object in a render index plus the change versions.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    rprim_state: HashMap<PrimPath, DirtyBits>,
    sprim_state: HashMap<PrimPath, DirtyBits>,
    bprim_state: HashMap<PrimPath, DirtyBits>,
    instancer_state: HashMap<PrimPath, DirtyBits>,
    task_state: HashMap<PrimPath, DirtyBits>,
    // instancer -> rprims drawn through it
    instancer_rprims: HashMap<PrimPath, BTreeSet<PrimPath>>,
    collection_state: HashMap<Token, u64>,
    index_version: u64,
    all_collections_version: u64,
    varying_state_version: u64,
    change_count: u64,
    needs_garbage_collection: bool,
}

fn mark_in(
    state: &mut HashMap<PrimPath, DirtyBits>,
    id: &PrimPath,
    bits: DirtyBits,
    kind: &str,
) -> bool {
    match state.get_mut(id) {
        Some(current) => {
            current.insert(bits);
            true
        }
        None => {
            log::trace!("ChangeTracker: ignoring dirty mark for unknown {kind} {id}");
            false
        }
    }
}

fn clean_in(state: &mut HashMap<PrimPath, DirtyBits>, id: &PrimPath, remaining: DirtyBits) {
    if let Some(current) = state.get_mut(id) {
        *current = remaining;
    }
}

impl ChangeTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Rprims ---

    /// Starts tracking an rprim with its initial dirty bits.
    pub fn rprim_inserted(&mut self, id: &PrimPath, initial_bits: DirtyBits) {
        self.rprim_state
            .insert(id.clone(), initial_bits | DirtyBits::VARYING);
        self.index_version += 1;
        self.varying_state_version += 1;
        self.change_count += 1;
    }

    /// Stops tracking an rprim.
    pub fn rprim_removed(&mut self, id: &PrimPath) {
        if self.rprim_state.remove(id).is_some() {
            self.index_version += 1;
            self.change_count += 1;
        }
        for rprims in self.instancer_rprims.values_mut() {
            rprims.remove(id);
        }
    }

    /// Adds `bits` to an rprim's dirty state.
    ///
    /// An rprim entering the dirty state joins the varying set, which bumps
    /// the varying state version. Bits in [`DirtyBits::AFFECTS_COLLECTIONS`]
    /// also invalidate every cached collection.
    pub fn mark_rprim_dirty(&mut self, id: &PrimPath, bits: DirtyBits) {
        if bits.is_clean() {
            log::warn!("ChangeTracker: mark_rprim_dirty called with clean bits for {id}");
            return;
        }
        let Some(current) = self.rprim_state.get_mut(id) else {
            log::trace!("ChangeTracker: ignoring dirty mark for unknown rprim {id}");
            return;
        };
        if !current.contains(DirtyBits::VARYING) {
            current.insert(DirtyBits::VARYING);
            self.varying_state_version += 1;
        }
        current.insert(bits);
        self.change_count += 1;
        if bits.intersects(DirtyBits::AFFECTS_COLLECTIONS) {
            self.all_collections_version += 1;
        }
    }

    /// Marks every tracked rprim dirty with `bits`.
    pub fn mark_all_rprims_dirty(&mut self, bits: DirtyBits) {
        if bits.is_clean() {
            return;
        }
        for current in self.rprim_state.values_mut() {
            current.insert(bits | DirtyBits::VARYING);
        }
        self.varying_state_version += 1;
        self.change_count += 1;
        if bits.intersects(DirtyBits::AFFECTS_COLLECTIONS) {
            self.all_collections_version += 1;
        }
    }

    /// The rprim's current bits, or [`DirtyBits::CLEAN`] if it is unknown.
    pub fn rprim_dirty_bits(&self, id: &PrimPath) -> DirtyBits {
        self.rprim_state.get(id).copied().unwrap_or(DirtyBits::CLEAN)
    }

    /// Returns `true` if the rprim has pending changes.
    pub fn is_rprim_dirty(&self, id: &PrimPath) -> bool {
        self.rprim_dirty_bits(id).is_dirty()
    }

    /// Replaces the rprim's change bits with `remaining`, keeping the
    /// varying marker.
    pub fn mark_rprim_clean(&mut self, id: &PrimPath, remaining: DirtyBits) {
        if let Some(current) = self.rprim_state.get_mut(id) {
            *current = (*current & DirtyBits::VARYING) | remaining.without(DirtyBits::VARYING);
        }
    }

    /// Drops clean rprims out of the varying set.
    pub fn reset_varying_state(&mut self) {
        for current in self.rprim_state.values_mut() {
            if current.is_clean() {
                current.remove(DirtyBits::VARYING);
            }
        }
        self.varying_state_version += 1;
        log::trace!("ChangeTracker: varying state reset");
    }

    // --- Sprims ---

    /// Starts tracking an sprim with its initial dirty bits.
    pub fn sprim_inserted(&mut self, id: &PrimPath, initial_bits: DirtyBits) {
        self.sprim_state.insert(id.clone(), initial_bits);
        self.change_count += 1;
    }

    /// Stops tracking an sprim.
    pub fn sprim_removed(&mut self, id: &PrimPath) {
        self.sprim_state.remove(id);
        self.change_count += 1;
    }

    /// Adds `bits` to an sprim's dirty state.
    pub fn mark_sprim_dirty(&mut self, id: &PrimPath, bits: DirtyBits) {
        if mark_in(&mut self.sprim_state, id, bits, "sprim") {
            self.change_count += 1;
        }
    }

    /// The sprim's current bits.
    pub fn sprim_dirty_bits(&self, id: &PrimPath) -> DirtyBits {
        self.sprim_state.get(id).copied().unwrap_or(DirtyBits::CLEAN)
    }

    /// Replaces the sprim's bits with `remaining`.
    pub fn mark_sprim_clean(&mut self, id: &PrimPath, remaining: DirtyBits) {
        clean_in(&mut self.sprim_state, id, remaining);
    }

    // --- Bprims ---

    /// Starts tracking a bprim with its initial dirty bits.
    pub fn bprim_inserted(&mut self, id: &PrimPath, initial_bits: DirtyBits) {
        self.bprim_state.insert(id.clone(), initial_bits);
        self.change_count += 1;
    }

    /// Stops tracking a bprim.
    pub fn bprim_removed(&mut self, id: &PrimPath) {
        self.bprim_state.remove(id);
        self.change_count += 1;
    }

    /// Adds `bits` to a bprim's dirty state.
    pub fn mark_bprim_dirty(&mut self, id: &PrimPath, bits: DirtyBits) {
        if mark_in(&mut self.bprim_state, id, bits, "bprim") {
            self.change_count += 1;
        }
    }

    /// The bprim's current bits.
    pub fn bprim_dirty_bits(&self, id: &PrimPath) -> DirtyBits {
        self.bprim_state.get(id).copied().unwrap_or(DirtyBits::CLEAN)
    }

    /// Replaces the bprim's bits with `remaining`.
    pub fn mark_bprim_clean(&mut self, id: &PrimPath, remaining: DirtyBits) {
        clean_in(&mut self.bprim_state, id, remaining);
    }

    // --- Instancers ---

    /// Starts tracking an instancer. New instancers are fully dirty.
    pub fn instancer_inserted(&mut self, id: &PrimPath) {
        self.instancer_state.insert(id.clone(), DirtyBits::ALL_DIRTY);
        self.change_count += 1;
    }

    /// Stops tracking an instancer and forgets its dependents.
    pub fn instancer_removed(&mut self, id: &PrimPath) {
        self.instancer_state.remove(id);
        self.instancer_rprims.remove(id);
        self.change_count += 1;
    }

    /// Records that `rprim` draws through `instancer`.
    pub fn add_instancer_rprim_dependency(&mut self, instancer: &PrimPath, rprim: &PrimPath) {
        self.instancer_rprims
            .entry(instancer.clone())
            .or_default()
            .insert(rprim.clone());
    }

    /// Marks an instancer dirty and flags every dependent rprim with
    /// [`DirtyBits::DIRTY_INSTANCER`].
    pub fn mark_instancer_dirty(&mut self, id: &PrimPath, bits: DirtyBits) {
        if !mark_in(&mut self.instancer_state, id, bits, "instancer") {
            return;
        }
        self.change_count += 1;
        let dependents: Vec<PrimPath> = self
            .instancer_rprims
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        for rprim in dependents {
            self.mark_rprim_dirty(&rprim, DirtyBits::DIRTY_INSTANCER);
        }
    }

    /// The instancer's current bits.
    pub fn instancer_dirty_bits(&self, id: &PrimPath) -> DirtyBits {
        self.instancer_state
            .get(id)
            .copied()
            .unwrap_or(DirtyBits::CLEAN)
    }

    /// Replaces the instancer's bits with `remaining`.
    pub fn mark_instancer_clean(&mut self, id: &PrimPath, remaining: DirtyBits) {
        clean_in(&mut self.instancer_state, id, remaining);
    }

    // --- Tasks ---

    /// Starts tracking a task. New tasks have dirty params and collection.
    pub fn task_inserted(&mut self, id: &PrimPath) {
        self.task_state.insert(
            id.clone(),
            DirtyBits::DIRTY_PARAMS | DirtyBits::DIRTY_COLLECTION,
        );
        self.change_count += 1;
    }

    /// Stops tracking a task.
    pub fn task_removed(&mut self, id: &PrimPath) {
        self.task_state.remove(id);
        self.change_count += 1;
    }

    /// Adds `bits` to a task's dirty state.
    pub fn mark_task_dirty(&mut self, id: &PrimPath, bits: DirtyBits) {
        if mark_in(&mut self.task_state, id, bits, "task") {
            self.change_count += 1;
        }
    }

    /// The task's current bits.
    pub fn task_dirty_bits(&self, id: &PrimPath) -> DirtyBits {
        self.task_state.get(id).copied().unwrap_or(DirtyBits::CLEAN)
    }

    /// Replaces the task's bits with `remaining`.
    pub fn mark_task_clean(&mut self, id: &PrimPath, remaining: DirtyBits) {
        clean_in(&mut self.task_state, id, remaining);
    }

    // --- Collections ---

    /// Registers a named collection so it gets its own version counter.
    pub fn add_collection(&mut self, name: &Token) {
        self.collection_state.entry(name.clone()).or_insert(0);
    }

    /// Invalidates one collection.
    pub fn mark_collection_dirty(&mut self, name: &Token) {
        *self.collection_state.entry(name.clone()).or_insert(0) += 1;
    }

    /// Invalidates every collection.
    pub fn mark_all_collections_dirty(&mut self) {
        self.all_collections_version += 1;
    }

    /// Version a cache built for collection `name` must match to stay valid.
    pub fn collection_version(&self, name: &Token) -> u64 {
        self.global_collection_version() + self.collection_state.get(name).copied().unwrap_or(0)
    }

    /// Version bumped by any change that invalidates every collection:
    /// rprim insert/remove, instance id reassignment, collection-affecting
    /// dirty bits and garbage collection.
    pub fn global_collection_version(&self) -> u64 {
        self.index_version + self.all_collections_version
    }

    /// Signals that instance ids were reassigned.
    pub fn mark_prim_ids_reassigned(&mut self) {
        self.index_version += 1;
    }

    // --- Misc versions ---

    /// Bumped whenever an rprim joins or leaves the varying set.
    pub fn varying_state_version(&self) -> u64 {
        self.varying_state_version
    }

    /// Bumped on every recorded change.
    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    // --- Garbage collection ---

    /// Returns `true` if unreferenced backend resources should be reclaimed.
    pub fn is_garbage_collection_needed(&self) -> bool {
        self.needs_garbage_collection
    }

    /// Requests a garbage collection at the next commit.
    pub fn mark_garbage_collection_needed(&mut self) {
        self.needs_garbage_collection = true;
    }

    /// Clears the garbage collection request.
    pub fn clear_garbage_collection_needed(&mut self) {
        self.needs_garbage_collection = false;
    }

    /// Forgets all object state while keeping versions monotonic, so caches
    /// built before the reset are seen as stale.
    pub fn clear(&mut self) {
        self.rprim_state.clear();
        self.sprim_state.clear();
        self.bprim_state.clear();
        self.instancer_state.clear();
        self.task_state.clear();
        self.instancer_rprims.clear();
        self.index_version += 1;
        self.all_collections_version += 1;
        self.varying_state_version += 1;
        self.change_count += 1;
        self.needs_garbage_collection = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    #[test]
    fn test_inserted_rprim_is_dirty_and_varying() {
        let mut tracker = ChangeTracker::new();
        let id = p("/mesh");
        tracker.rprim_inserted(&id, DirtyBits::ALL_DIRTY);
        let bits = tracker.rprim_dirty_bits(&id);
        assert!(bits.contains(DirtyBits::VARYING));
        assert!(bits.contains(DirtyBits::DIRTY_POINTS));
    }

    #[test]
    fn test_clean_keeps_varying_and_remaining_bits() {
        let mut tracker = ChangeTracker::new();
        let id = p("/mesh");
        tracker.rprim_inserted(&id, DirtyBits::DIRTY_POINTS | DirtyBits::DIRTY_TRANSFORM);
        tracker.mark_rprim_clean(&id, DirtyBits::DIRTY_TRANSFORM);
        let bits = tracker.rprim_dirty_bits(&id);
        assert!(!bits.contains(DirtyBits::DIRTY_POINTS));
        assert!(bits.contains(DirtyBits::DIRTY_TRANSFORM));
        assert!(bits.contains(DirtyBits::VARYING));
    }

    #[test]
    fn test_varying_version_moves_only_on_set_changes() {
        let mut tracker = ChangeTracker::new();
        let id = p("/mesh");
        tracker.rprim_inserted(&id, DirtyBits::DIRTY_POINTS);
        tracker.mark_rprim_clean(&id, DirtyBits::CLEAN);
        tracker.reset_varying_state();
        let before = tracker.varying_state_version();

        tracker.mark_rprim_dirty(&id, DirtyBits::DIRTY_POINTS);
        assert_eq!(tracker.varying_state_version(), before + 1);

        // Already varying: no new version.
        tracker.mark_rprim_dirty(&id, DirtyBits::DIRTY_TRANSFORM);
        assert_eq!(tracker.varying_state_version(), before + 1);
    }

    #[test]
    fn test_collection_versions() {
        let mut tracker = ChangeTracker::new();
        let name = Token::new("geometry");
        tracker.add_collection(&name);
        let v0 = tracker.collection_version(&name);

        tracker.mark_collection_dirty(&name);
        let v1 = tracker.collection_version(&name);
        assert!(v1 > v0);

        let global = tracker.global_collection_version();
        tracker.mark_all_collections_dirty();
        assert!(tracker.global_collection_version() > global);
        assert!(tracker.collection_version(&name) > v1);
    }

    #[test]
    fn test_topology_change_invalidates_collections_but_points_do_not() {
        let mut tracker = ChangeTracker::new();
        let id = p("/mesh");
        tracker.rprim_inserted(&id, DirtyBits::CLEAN);
        let v0 = tracker.global_collection_version();
        tracker.mark_rprim_dirty(&id, DirtyBits::DIRTY_POINTS);
        assert_eq!(tracker.global_collection_version(), v0);
        tracker.mark_rprim_dirty(&id, DirtyBits::DIRTY_TOPOLOGY);
        assert!(tracker.global_collection_version() > v0);
    }

    #[test]
    fn test_instancer_dirt_propagates_to_dependents() {
        let mut tracker = ChangeTracker::new();
        let instancer = p("/instancer");
        let proto = p("/instancer/proto");
        tracker.instancer_inserted(&instancer);
        tracker.rprim_inserted(&proto, DirtyBits::CLEAN);
        tracker.add_instancer_rprim_dependency(&instancer, &proto);
        tracker.mark_rprim_clean(&proto, DirtyBits::CLEAN);

        tracker.mark_instancer_dirty(&instancer, DirtyBits::DIRTY_TRANSFORM);
        assert!(tracker
            .rprim_dirty_bits(&proto)
            .contains(DirtyBits::DIRTY_INSTANCER));
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut tracker = ChangeTracker::new();
        let ghost = p("/ghost");
        tracker.mark_rprim_dirty(&ghost, DirtyBits::DIRTY_POINTS);
        tracker.mark_sprim_dirty(&ghost, DirtyBits::DIRTY_PARAMS);
        assert_eq!(tracker.rprim_dirty_bits(&ghost), DirtyBits::CLEAN);
        assert_eq!(tracker.sprim_dirty_bits(&ghost), DirtyBits::CLEAN);
    }

    #[test]
    fn test_garbage_collection_flag() {
        let mut tracker = ChangeTracker::new();
        assert!(!tracker.is_garbage_collection_needed());
        tracker.mark_garbage_collection_needed();
        assert!(tracker.is_garbage_collection_needed());
        tracker.clear_garbage_collection_needed();
        assert!(!tracker.is_garbage_collection_needed());
    }
}
