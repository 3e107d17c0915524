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

//! The render index: the registry of everything a backend draws.
//!
//! The index owns every primitive, instancer and task registration together
//! with the change tracker, and is the only place that mutates them. Scene
//! delegates are held weakly; their owner decides how long they live.

use crate::collection::RprimCollection;
use crate::dirty_list::{DirtyList, SharedDirtyList};
use crate::error::IndexError;
use crate::prim_type_index::PrimTypeIndex;
use crate::task::{SharedTask, TaskError};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, Weak};
use strata_core::path::subtree_keys;
use strata_core::token::perf_counters;
use strata_core::{
    Bprim, ChangeTracker, DirtyBits, DrawItemView, IdColor, IndexSettings, Instancer,
    InstancerMap, PerfLog, PrimKind, PrimPath, RenderDelegate, Rprim, SceneDelegate, Sprim,
    SyncContext, TaskContext, Token,
};

struct RprimEntry {
    type_id: Token,
    delegate_id: PrimPath,
    scene_delegate: Weak<dyn SceneDelegate>,
    rprim: Box<dyn Rprim>,
}

struct TaskEntry {
    task: SharedTask,
    scene_delegate: Weak<dyn SceneDelegate>,
}

struct DrawItemCacheEntry {
    collection: RprimCollection,
    version: u64,
    view: Arc<DrawItemView>,
}

/// The rprim (and instance) a pick sample resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickResult {
    /// The picked rprim.
    pub prim_path: PrimPath,
    /// Index of the picked instance, for instanced rprims only.
    pub instance_index: Option<u32>,
}

/// Central registry mediating between scene delegates, primitives and the
/// render delegate.
pub struct RenderIndex {
    render_delegate: Box<dyn RenderDelegate>,
    settings: IndexSettings,
    tracker: ChangeTracker,

    rprims: BTreeMap<PrimPath, RprimEntry>,
    prim_id_map: BTreeMap<u32, PrimPath>,
    next_prim_id: u64,

    sprim_index: PrimTypeIndex<dyn Sprim>,
    bprim_index: PrimTypeIndex<dyn Bprim>,

    instancers: InstancerMap,
    instancer_delegates: HashMap<PrimPath, Weak<dyn SceneDelegate>>,

    tasks: BTreeMap<PrimPath, TaskEntry>,
    sync_queue: Vec<SharedDirtyList>,

    draw_item_cache: Mutex<HashMap<Token, DrawItemCacheEntry>>,
    perf_log: Arc<PerfLog>,
}

impl RenderIndex {
    /// Creates an index bound to `render_delegate`.
    ///
    /// One fallback sprim and bprim is created for every type the delegate
    /// supports. Fails if the settings are invalid or a fallback cannot be
    /// built.
    pub fn new(
        render_delegate: Box<dyn RenderDelegate>,
        settings: IndexSettings,
    ) -> Result<Self, IndexError> {
        if let Err(e) = settings.validate() {
            log::error!("RenderIndex: refusing to build index: {e}");
            return Err(e.into());
        }

        let sprim_index = PrimTypeIndex::new(render_delegate.supported_sprim_types());
        let bprim_index = PrimTypeIndex::new(render_delegate.supported_bprim_types());

        let mut index = Self {
            render_delegate,
            settings,
            tracker: ChangeTracker::new(),
            rprims: BTreeMap::new(),
            prim_id_map: BTreeMap::new(),
            next_prim_id: 1,
            sprim_index,
            bprim_index,
            instancers: InstancerMap::new(),
            instancer_delegates: HashMap::new(),
            tasks: BTreeMap::new(),
            sync_queue: Vec::new(),
            draw_item_cache: Mutex::new(HashMap::new()),
            perf_log: Arc::new(PerfLog::new()),
        };
        index.create_fallback_prims()?;

        log::info!(
            "RenderIndex created with '{}' render delegate ({} instance id bits)",
            index.render_delegate.delegate_type(),
            index.settings.prim_id_bits
        );
        Ok(index)
    }

    fn create_fallback_prims(&mut self) -> Result<(), IndexError> {
        let sprim_types: Vec<Token> = self.sprim_index.types().cloned().collect();
        for type_id in sprim_types {
            let prim = self
                .render_delegate
                .create_fallback_sprim(&type_id)
                .inspect_err(|e| log::error!("RenderIndex: no fallback sprim '{type_id}': {e}"))?;
            if let Some(old) = self.sprim_index.set_fallback(&type_id, prim) {
                self.render_delegate.destroy_sprim(old);
            }
        }

        let bprim_types: Vec<Token> = self.bprim_index.types().cloned().collect();
        for type_id in bprim_types {
            let prim = self
                .render_delegate
                .create_fallback_bprim(&type_id)
                .inspect_err(|e| log::error!("RenderIndex: no fallback bprim '{type_id}': {e}"))?;
            if let Some(old) = self.bprim_index.set_fallback(&type_id, prim) {
                self.render_delegate.destroy_bprim(old);
            }
        }
        Ok(())
    }

    fn unsupported(&self, kind: PrimKind, type_id: &Token, id: &PrimPath) -> IndexError {
        log::error!(
            "RenderIndex: '{}' render delegate cannot create {kind} '{type_id}' for {id}",
            self.render_delegate.delegate_type()
        );
        IndexError::UnsupportedPrimType {
            delegate: self.render_delegate.delegate_type().to_owned(),
            kind,
            type_id: type_id.clone(),
        }
    }

    // --- Accessors ---

    /// The bound render delegate.
    pub fn render_delegate(&self) -> &dyn RenderDelegate {
        self.render_delegate.as_ref()
    }

    /// Mutable access to the bound render delegate.
    pub fn render_delegate_mut(&mut self) -> &mut dyn RenderDelegate {
        self.render_delegate.as_mut()
    }

    /// The change tracker.
    pub fn change_tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Mutable access to the change tracker, for scene delegates marking
    /// changes and tasks consuming their own bits.
    pub fn change_tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }

    /// Settings the index was built with.
    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Performance counters of this index.
    pub fn perf_log(&self) -> &Arc<PerfLog> {
        &self.perf_log
    }

    // --- Rprims ---

    /// Returns `true` if the render delegate can create rprims of `type_id`.
    pub fn is_rprim_type_supported(&self, type_id: &Token) -> bool {
        self.render_delegate
            .supported_rprim_types()
            .contains(type_id)
    }

    /// Inserts an rprim of `type_id`, replacing any rprim already at `id`.
    ///
    /// The rprim receives the next instance id, compacting the id space
    /// first if it is exhausted.
    pub fn insert_rprim(
        &mut self,
        type_id: &Token,
        scene_delegate: &Arc<dyn SceneDelegate>,
        id: &PrimPath,
        instancer_id: Option<&PrimPath>,
    ) -> Result<(), IndexError> {
        if !self.is_rprim_type_supported(type_id) {
            return Err(self.unsupported(PrimKind::Rprim, type_id, id));
        }
        if self.rprims.contains_key(id) {
            log::warn!("RenderIndex: rprim {id} inserted twice, replacing the previous one");
            self.remove_rprim(id);
        }

        let mut rprim = self
            .render_delegate
            .create_rprim(type_id, id, instancer_id)?;
        let prim_id = match self.allocate_prim_id(id) {
            Ok(prim_id) => prim_id,
            Err(e) => {
                self.render_delegate.destroy_rprim(rprim);
                return Err(e);
            }
        };
        rprim.set_prim_id(prim_id);

        self.tracker
            .rprim_inserted(id, rprim.initial_dirty_bits_mask());
        if let Some(instancer_id) = instancer_id {
            self.tracker.add_instancer_rprim_dependency(instancer_id, id);
        }
        self.prim_id_map.insert(prim_id, id.clone());
        self.rprims.insert(
            id.clone(),
            RprimEntry {
                type_id: type_id.clone(),
                delegate_id: scene_delegate.delegate_id().clone(),
                scene_delegate: Arc::downgrade(scene_delegate),
                rprim,
            },
        );
        log::trace!("RenderIndex: inserted {type_id} {id} with prim id {prim_id}");
        Ok(())
    }

    /// Removes an rprim, releasing its instance id. Unknown ids are ignored.
    pub fn remove_rprim(&mut self, id: &PrimPath) {
        let Some(entry) = self.rprims.remove(id) else {
            return;
        };
        let prim_id = entry.rprim.prim_id();
        if self.prim_id_map.get(&prim_id) == Some(id) {
            self.prim_id_map.remove(&prim_id);
        }
        self.tracker.rprim_removed(id);
        self.tracker.mark_garbage_collection_needed();
        self.render_delegate.destroy_rprim(entry.rprim);
        log::trace!("RenderIndex: removed rprim {id}");
    }

    /// Returns `true` if an rprim is registered at `id`.
    pub fn has_rprim(&self, id: &PrimPath) -> bool {
        self.rprims.contains_key(id)
    }

    /// The rprim at `id`.
    pub fn get_rprim(&self, id: &PrimPath) -> Option<&dyn Rprim> {
        self.rprims.get(id).map(|entry| entry.rprim.as_ref())
    }

    /// Type the rprim at `id` was inserted with.
    pub fn rprim_type_id(&self, id: &PrimPath) -> Option<&Token> {
        self.rprims.get(id).map(|entry| &entry.type_id)
    }

    /// All rprim ids in path order.
    pub fn rprim_ids(&self) -> Vec<PrimPath> {
        self.rprims.keys().cloned().collect()
    }

    /// Number of registered rprims.
    pub fn rprim_count(&self) -> usize {
        self.rprims.len()
    }

    /// Rprim ids at or below `root`, in path order.
    pub fn rprim_subtree(&self, root: &PrimPath) -> Vec<PrimPath> {
        subtree_keys(&self.rprims, root)
    }

    /// The scene delegate an rprim was inserted through, if still alive.
    pub fn scene_delegate_for_rprim(&self, id: &PrimPath) -> Option<Arc<dyn SceneDelegate>> {
        self.rprims.get(id)?.scene_delegate.upgrade()
    }

    /// The delegate id and instancer id recorded for an rprim.
    pub fn scene_delegate_and_instancer_ids(
        &self,
        id: &PrimPath,
    ) -> Option<(PrimPath, Option<PrimPath>)> {
        self.rprims.get(id).map(|entry| {
            (
                entry.delegate_id.clone(),
                entry.rprim.instancer_id().cloned(),
            )
        })
    }

    /// Rprims inserted through the delegate identified by `delegate_id`.
    pub fn delegate_rprim_ids(&self, delegate_id: &PrimPath) -> Vec<PrimPath> {
        self.rprims
            .iter()
            .filter(|(_, entry)| entry.delegate_id == *delegate_id)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids of the delegates owning at least one rprim with a bit of `mask`.
    pub fn delegate_ids_with_dirty_rprims(&self, mask: DirtyBits) -> Vec<PrimPath> {
        self.rprims
            .iter()
            .filter(|(id, _)| self.tracker.rprim_dirty_bits(id).intersects(mask))
            .map(|(_, entry)| entry.delegate_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns `true` if `id` is a registered rprim inside `collection`.
    pub fn is_in_collection(&self, id: &PrimPath, collection: &RprimCollection) -> bool {
        self.rprims.contains_key(id) && collection.contains(id)
    }

    /// Registered rprims inside `collection`, in path order.
    pub fn collection_members(&self, collection: &RprimCollection) -> Vec<PrimPath> {
        let mut members: Vec<PrimPath> = collection
            .root_paths()
            .iter()
            .flat_map(|root| subtree_keys(&self.rprims, root))
            .filter(|id| {
                !collection
                    .exclude_paths()
                    .iter()
                    .any(|ex| id.has_prefix(ex))
            })
            .collect();
        if collection.root_paths().len() > 1 {
            members.sort();
            members.dedup();
        }
        members
    }

    // --- Instance ids ---

    fn allocate_prim_id(&mut self, id: &PrimPath) -> Result<u32, IndexError> {
        let max = self.settings.max_prim_id();
        if self.next_prim_id > u64::from(max) {
            self.compact_prim_ids();
        }
        if self.next_prim_id > u64::from(max) {
            log::error!(
                "RenderIndex: {} bit instance id space exhausted by {} live rprims",
                self.settings.prim_id_bits,
                self.rprims.len()
            );
            return Err(IndexError::PrimIdSpaceExhausted {
                id: id.clone(),
                max,
            });
        }
        let prim_id = self.next_prim_id as u32;
        self.next_prim_id += 1;
        Ok(prim_id)
    }

    /// Reassigns dense instance ids `1..=n` to the live rprims in path order.
    fn compact_prim_ids(&mut self) {
        self.prim_id_map.clear();
        let mut next = 1u64;
        for (id, entry) in self.rprims.iter_mut() {
            let prim_id = next as u32;
            entry.rprim.set_prim_id(prim_id);
            self.prim_id_map.insert(prim_id, id.clone());
            self.tracker.mark_rprim_dirty(id, DirtyBits::DIRTY_PRIM_ID);
            next += 1;
        }
        self.next_prim_id = next;
        self.tracker.mark_prim_ids_reassigned();
        self.perf_log.increment(&perf_counters::PRIM_ID_COMPACTIONS);
        log::info!(
            "RenderIndex: compacted instance ids, {} rprims renumbered",
            self.rprims.len()
        );
    }

    /// The rprim owning `prim_id`. Id `0` and released ids resolve to `None`.
    pub fn prim_path_from_prim_id(&self, prim_id: u32) -> Option<&PrimPath> {
        if prim_id == 0 {
            return None;
        }
        self.prim_id_map.get(&prim_id)
    }

    /// Resolves an id buffer sample back to an rprim and instance.
    ///
    /// Returns `None` for background samples and stale ids. The instance
    /// index is only reported for rprims drawn through an instancer.
    pub fn get_prim_path_from_prim_id_color(
        &self,
        id_color: IdColor,
        instance_id_color: IdColor,
    ) -> Option<PickResult> {
        let prim_path = self.prim_path_from_prim_id(id_color.decode())?;
        let instance_index = self
            .rprims
            .get(prim_path)
            .and_then(|entry| entry.rprim.instancer_id())
            .map(|_| instance_id_color.decode());
        Some(PickResult {
            prim_path: prim_path.clone(),
            instance_index,
        })
    }

    // --- Sprims ---

    /// Returns `true` if the render delegate can create sprims of `type_id`.
    pub fn is_sprim_type_supported(&self, type_id: &Token) -> bool {
        self.sprim_index.is_supported(type_id)
    }

    /// Inserts an sprim, replacing any sprim of the same type at `id`.
    pub fn insert_sprim(
        &mut self,
        type_id: &Token,
        scene_delegate: &Arc<dyn SceneDelegate>,
        id: &PrimPath,
    ) -> Result<(), IndexError> {
        if !self.sprim_index.is_supported(type_id) {
            return Err(self.unsupported(PrimKind::Sprim, type_id, id));
        }
        let sprim = self.render_delegate.create_sprim(type_id, id)?;
        let initial_bits = sprim.initial_dirty_bits_mask();
        match self
            .sprim_index
            .insert(type_id, id, Arc::downgrade(scene_delegate), sprim)
        {
            Ok(Some(old)) => {
                log::warn!("RenderIndex: sprim {type_id} {id} inserted twice, replacing the previous one");
                self.render_delegate.destroy_sprim(old);
                self.tracker.mark_garbage_collection_needed();
            }
            Ok(None) => {}
            Err(rejected) => {
                self.render_delegate.destroy_sprim(rejected);
                return Err(self.unsupported(PrimKind::Sprim, type_id, id));
            }
        }
        self.tracker.sprim_inserted(id, initial_bits);
        Ok(())
    }

    /// Removes an sprim. Unknown ids are ignored.
    pub fn remove_sprim(&mut self, type_id: &Token, id: &PrimPath) {
        if let Some(sprim) = self.sprim_index.remove(type_id, id) {
            self.tracker.sprim_removed(id);
            self.tracker.mark_garbage_collection_needed();
            self.render_delegate.destroy_sprim(sprim);
        }
    }

    /// Returns `true` if an sprim of `type_id` is registered at `id`.
    pub fn has_sprim(&self, type_id: &Token, id: &PrimPath) -> bool {
        self.sprim_index.contains(type_id, id)
    }

    /// The sprim of `type_id` at `id`.
    pub fn get_sprim(&self, type_id: &Token, id: &PrimPath) -> Option<&dyn Sprim> {
        self.sprim_index.get(type_id, id)
    }

    /// Sprim ids of `type_id` at or below `root`. An empty root selects all.
    pub fn sprim_subtree(&self, type_id: &Token, root: &PrimPath) -> Vec<PrimPath> {
        self.sprim_index.subtree_ids(type_id, root)
    }

    /// The fallback sprim of `type_id`.
    pub fn fallback_sprim(&self, type_id: &Token) -> Option<&dyn Sprim> {
        self.sprim_index.fallback(type_id)
    }

    /// Mutable access to the fallback sprim of `type_id`.
    pub fn fallback_sprim_mut(&mut self, type_id: &Token) -> Option<&mut (dyn Sprim + 'static)> {
        self.sprim_index.fallback_mut(type_id)
    }

    // --- Bprims ---

    /// Returns `true` if the render delegate can create bprims of `type_id`.
    pub fn is_bprim_type_supported(&self, type_id: &Token) -> bool {
        self.bprim_index.is_supported(type_id)
    }

    /// Inserts a bprim, replacing any bprim of the same type at `id`.
    pub fn insert_bprim(
        &mut self,
        type_id: &Token,
        scene_delegate: &Arc<dyn SceneDelegate>,
        id: &PrimPath,
    ) -> Result<(), IndexError> {
        if !self.bprim_index.is_supported(type_id) {
            return Err(self.unsupported(PrimKind::Bprim, type_id, id));
        }
        let bprim = self.render_delegate.create_bprim(type_id, id)?;
        let initial_bits = bprim.initial_dirty_bits_mask();
        match self
            .bprim_index
            .insert(type_id, id, Arc::downgrade(scene_delegate), bprim)
        {
            Ok(Some(old)) => {
                log::warn!("RenderIndex: bprim {type_id} {id} inserted twice, replacing the previous one");
                self.render_delegate.destroy_bprim(old);
                self.tracker.mark_garbage_collection_needed();
            }
            Ok(None) => {}
            Err(rejected) => {
                self.render_delegate.destroy_bprim(rejected);
                return Err(self.unsupported(PrimKind::Bprim, type_id, id));
            }
        }
        self.tracker.bprim_inserted(id, initial_bits);
        Ok(())
    }

    /// Removes a bprim. Unknown ids are ignored.
    pub fn remove_bprim(&mut self, type_id: &Token, id: &PrimPath) {
        if let Some(bprim) = self.bprim_index.remove(type_id, id) {
            self.tracker.bprim_removed(id);
            self.tracker.mark_garbage_collection_needed();
            self.render_delegate.destroy_bprim(bprim);
        }
    }

    /// Returns `true` if a bprim of `type_id` is registered at `id`.
    pub fn has_bprim(&self, type_id: &Token, id: &PrimPath) -> bool {
        self.bprim_index.contains(type_id, id)
    }

    /// The bprim of `type_id` at `id`.
    pub fn get_bprim(&self, type_id: &Token, id: &PrimPath) -> Option<&dyn Bprim> {
        self.bprim_index.get(type_id, id)
    }

    /// Bprim ids of `type_id` at or below `root`. An empty root selects all.
    pub fn bprim_subtree(&self, type_id: &Token, root: &PrimPath) -> Vec<PrimPath> {
        self.bprim_index.subtree_ids(type_id, root)
    }

    /// The fallback bprim of `type_id`.
    pub fn fallback_bprim(&self, type_id: &Token) -> Option<&dyn Bprim> {
        self.bprim_index.fallback(type_id)
    }

    // --- Instancers ---

    /// Inserts an instancer, optionally nested under `parent_id`.
    pub fn insert_instancer(
        &mut self,
        scene_delegate: &Arc<dyn SceneDelegate>,
        id: &PrimPath,
        parent_id: Option<&PrimPath>,
    ) {
        if self.instancers.contains_key(id) {
            log::warn!("RenderIndex: instancer {id} inserted twice, replacing the previous one");
        }
        self.instancers
            .insert(id.clone(), Instancer::new(id.clone(), parent_id.cloned()));
        self.instancer_delegates
            .insert(id.clone(), Arc::downgrade(scene_delegate));
        self.tracker.instancer_inserted(id);
    }

    /// Removes an instancer. Unknown ids are ignored.
    pub fn remove_instancer(&mut self, id: &PrimPath) {
        if self.instancers.remove(id).is_some() {
            self.instancer_delegates.remove(id);
            self.tracker.instancer_removed(id);
        }
    }

    /// Returns `true` if an instancer is registered at `id`.
    pub fn has_instancer(&self, id: &PrimPath) -> bool {
        self.instancers.contains_key(id)
    }

    /// The instancer at `id`.
    pub fn get_instancer(&self, id: &PrimPath) -> Option<&Instancer> {
        self.instancers.get(id)
    }

    // --- Tasks ---

    /// Registers a task under `id`, replacing any task already there.
    pub fn insert_task(
        &mut self,
        scene_delegate: &Arc<dyn SceneDelegate>,
        id: &PrimPath,
        task: SharedTask,
    ) {
        let previous = self.tasks.insert(
            id.clone(),
            TaskEntry {
                task,
                scene_delegate: Arc::downgrade(scene_delegate),
            },
        );
        if previous.is_some() {
            log::warn!("RenderIndex: task {id} inserted twice, replacing the previous one");
        }
        self.tracker.task_inserted(id);
    }

    /// Unregisters a task. Unknown ids are ignored.
    pub fn remove_task(&mut self, id: &PrimPath) {
        if self.tasks.remove(id).is_some() {
            self.tracker.task_removed(id);
        }
    }

    /// Returns `true` if a task is registered at `id`.
    pub fn has_task(&self, id: &PrimPath) -> bool {
        self.tasks.contains_key(id)
    }

    /// The task registered at `id`.
    pub fn get_task(&self, id: &PrimPath) -> Option<SharedTask> {
        self.tasks.get(id).map(|entry| Arc::clone(&entry.task))
    }

    /// The scene delegate a task was registered through, if still alive.
    pub fn scene_delegate_for_task(&self, id: &PrimPath) -> Option<Arc<dyn SceneDelegate>> {
        self.tasks.get(id)?.scene_delegate.upgrade()
    }

    // --- Draw items ---

    /// Draw items of `collection`, grouped by render tag.
    ///
    /// Views are memoized per collection name and rebuilt only once the
    /// collection's change version moved. Items share their drawing state
    /// with the rprims, so a reused view still reflects the latest sync.
    pub fn draw_items(&self, collection: &RprimCollection) -> Arc<DrawItemView> {
        let version = self.tracker.collection_version(collection.name());
        let mut cache = self
            .draw_item_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        if let Some(entry) = cache.get(collection.name()) {
            if entry.version == version && entry.collection == *collection {
                self.perf_log.increment(&perf_counters::DRAW_ITEMS_FETCHED);
                return Arc::clone(&entry.view);
            }
        }

        let mut view = DrawItemView::new();
        for id in self.collection_members(collection) {
            let Some(entry) = self.rprims.get(&id) else {
                continue;
            };
            for item in entry.rprim.draw_items(collection.repr()) {
                view.entry(item.render_tag().clone())
                    .or_default()
                    .push(item);
            }
        }
        let view = Arc::new(view);
        cache.insert(
            collection.name().clone(),
            DrawItemCacheEntry {
                collection: collection.clone(),
                version,
                view: Arc::clone(&view),
            },
        );
        self.perf_log.increment(&perf_counters::DRAW_ITEMS_REBUILT);
        log::trace!(
            "RenderIndex: rebuilt draw items of '{}' at version {version}",
            collection.name()
        );
        view
    }

    // --- Sync ---

    /// Queues a dirty list to be synced once every task has synced.
    pub fn queue_sync(&mut self, dirty_list: SharedDirtyList) {
        if !self
            .sync_queue
            .iter()
            .any(|queued| Arc::ptr_eq(queued, &dirty_list))
        {
            self.sync_queue.push(dirty_list);
        }
    }

    /// Syncs exactly the rprims named by `dirty_list`.
    pub fn sync(&mut self, dirty_list: &mut DirtyList) {
        let ids = dirty_list.update(self).to_vec();
        let repr = dirty_list.collection().repr().clone();
        self.sync_rprims(&ids, &repr);
    }

    /// Syncs bprims, sprims and instancers, then every task, then the rprims
    /// of every dirty list the tasks queued.
    ///
    /// Returns one result per task, in order. A failing task does not stop
    /// the others.
    pub fn sync_all(
        &mut self,
        tasks: &[SharedTask],
        ctx: &mut TaskContext,
    ) -> Vec<Result<(), TaskError>> {
        self.sync_bprims();
        self.sync_sprims();
        self.sync_instancers();

        let results: Vec<Result<(), TaskError>> = tasks
            .iter()
            .map(|task| {
                let mut task = task.lock().map_err(|_| TaskError::Poisoned)?;
                let result = task.sync(self, ctx);
                if let Err(e) = &result {
                    log::error!("RenderIndex: sync of task {} failed: {e}", task.id());
                }
                result
            })
            .collect();
        self.perf_log
            .add(&perf_counters::TASKS_SYNCED, results.iter().filter(|r| r.is_ok()).count() as u64);

        let queue = std::mem::take(&mut self.sync_queue);
        for dirty_list in &queue {
            let mut dirty_list = dirty_list.lock().unwrap_or_else(|e| e.into_inner());
            self.sync(&mut dirty_list);
        }
        results
    }

    fn sync_rprims(&mut self, ids: &[PrimPath], repr: &Token) {
        let render_param = self.render_delegate.render_param();
        let mut found_dirty = false;
        let mut synced = 0u64;

        for id in ids {
            let Some(entry) = self.rprims.get_mut(id) else {
                continue;
            };
            let mut bits = self.tracker.rprim_dirty_bits(id);
            if bits.is_clean() && entry.rprim.has_repr(repr) {
                continue;
            }
            found_dirty = true;
            let Some(scene_delegate) = entry.scene_delegate.upgrade() else {
                log::warn!("RenderIndex: scene delegate of rprim {id} is gone, skipping sync");
                continue;
            };
            let mut ctx = SyncContext {
                scene_delegate: scene_delegate.as_ref(),
                render_param,
                tracker: &mut self.tracker,
                instancers: &self.instancers,
            };
            entry.rprim.sync(&mut ctx, &mut bits, repr);
            self.tracker.mark_rprim_clean(id, bits);
            synced += 1;
        }

        if !found_dirty && !ids.is_empty() {
            self.tracker.reset_varying_state();
        }
        self.perf_log.add(&perf_counters::RPRIMS_SYNCED, synced);
    }

    fn sync_sprims(&mut self) {
        let render_param = self.render_delegate.render_param();
        let mut synced = 0u64;
        for (type_id, id, entry) in self.sprim_index.entries_mut() {
            let mut bits = self.tracker.sprim_dirty_bits(id);
            if bits.is_clean() {
                continue;
            }
            let Some(scene_delegate) = entry.scene_delegate.upgrade() else {
                log::warn!("RenderIndex: scene delegate of sprim {type_id} {id} is gone, skipping sync");
                continue;
            };
            let mut ctx = SyncContext {
                scene_delegate: scene_delegate.as_ref(),
                render_param,
                tracker: &mut self.tracker,
                instancers: &self.instancers,
            };
            entry.prim.sync(&mut ctx, &mut bits);
            self.tracker.mark_sprim_clean(id, bits);
            synced += 1;
        }
        self.perf_log.add(&perf_counters::SPRIMS_SYNCED, synced);
    }

    fn sync_bprims(&mut self) {
        let render_param = self.render_delegate.render_param();
        let mut synced = 0u64;
        for (type_id, id, entry) in self.bprim_index.entries_mut() {
            let mut bits = self.tracker.bprim_dirty_bits(id);
            if bits.is_clean() {
                continue;
            }
            let Some(scene_delegate) = entry.scene_delegate.upgrade() else {
                log::warn!("RenderIndex: scene delegate of bprim {type_id} {id} is gone, skipping sync");
                continue;
            };
            let mut ctx = SyncContext {
                scene_delegate: scene_delegate.as_ref(),
                render_param,
                tracker: &mut self.tracker,
                instancers: &self.instancers,
            };
            entry.prim.sync(&mut ctx, &mut bits);
            self.tracker.mark_bprim_clean(id, bits);
            synced += 1;
        }
        self.perf_log.add(&perf_counters::BPRIMS_SYNCED, synced);
    }

    fn sync_instancers(&mut self) {
        let mut synced = 0u64;
        for (id, instancer) in self.instancers.iter_mut() {
            let mut bits = self.tracker.instancer_dirty_bits(id);
            if bits.is_clean() {
                continue;
            }
            let Some(scene_delegate) = self.instancer_delegates.get(id).and_then(Weak::upgrade)
            else {
                log::warn!("RenderIndex: scene delegate of instancer {id} is gone, skipping sync");
                continue;
            };
            instancer.sync(scene_delegate.as_ref(), &mut bits);
            self.tracker.mark_instancer_clean(id, bits);
            synced += 1;
        }
        self.perf_log.add(&perf_counters::INSTANCERS_SYNCED, synced);
    }

    // --- Commit ---

    /// Lets the render delegate resolve and upload pending resources.
    pub fn commit_resources(&mut self) {
        let collection_requested = self.tracker.is_garbage_collection_needed();
        self.render_delegate.commit_resources(&mut self.tracker);
        if collection_requested && !self.tracker.is_garbage_collection_needed() {
            self.perf_log.increment(&perf_counters::GARBAGE_COLLECTED);
        }
    }

    // --- Teardown ---

    /// Removes every prim, instancer and task at or below `root`.
    pub fn remove_subtree(&mut self, root: &PrimPath) {
        for id in subtree_keys(&self.rprims, root) {
            self.remove_rprim(&id);
        }
        for (_, id, sprim) in self.sprim_index.remove_subtree(root) {
            self.tracker.sprim_removed(&id);
            self.render_delegate.destroy_sprim(sprim);
        }
        for (_, id, bprim) in self.bprim_index.remove_subtree(root) {
            self.tracker.bprim_removed(&id);
            self.render_delegate.destroy_bprim(bprim);
        }
        let instancers: Vec<PrimPath> = self
            .instancers
            .keys()
            .filter(|id| id.has_prefix(root))
            .cloned()
            .collect();
        for id in instancers {
            self.remove_instancer(&id);
        }
        for id in subtree_keys(&self.tasks, root) {
            self.remove_task(&id);
        }
        self.tracker.mark_garbage_collection_needed();
    }

    /// Destroys every primitive through the render delegate and resets ids
    /// and dirty state. Fallback prims survive.
    pub fn clear(&mut self) {
        for (_, entry) in std::mem::take(&mut self.rprims) {
            self.render_delegate.destroy_rprim(entry.rprim);
        }
        for (_, sprim) in self.sprim_index.drain() {
            self.render_delegate.destroy_sprim(sprim);
        }
        for (_, bprim) in self.bprim_index.drain() {
            self.render_delegate.destroy_bprim(bprim);
        }
        self.instancers.clear();
        self.instancer_delegates.clear();
        self.tasks.clear();
        self.sync_queue.clear();
        self.prim_id_map.clear();
        self.next_prim_id = 1;
        self.tracker.clear();
        self.draw_item_cache
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        log::debug!("RenderIndex: cleared");
    }
}

impl Drop for RenderIndex {
    fn drop(&mut self) {
        self.clear();
        for sprim in self.sprim_index.take_fallbacks() {
            self.render_delegate.destroy_sprim(sprim);
        }
        for bprim in self.bprim_index.take_fallbacks() {
            self.render_delegate.destroy_bprim(bprim);
        }
        log::debug!("RenderIndex dropped");
    }
}
