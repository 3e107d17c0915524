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

use std::sync::Arc;
use strata_core::math::{DMat4, DVec3, Vec3};
use strata_core::token::{perf_counters, prim_types, render_tags, scene_keys};
use strata_core::{
    DirtyBits, IdColor, IndexSettings, MeshTopology, PassParams, PrimPath, RenderDelegate,
    SceneDelegate, StreamSettings, TaskContext, Token,
};
use strata_data::{
    shared_task, DirtyList, IndexError, PickResult, RenderIndex, RprimCollection, SharedDirtyList,
    Task, TaskError,
};
use strata_infra::{MemorySceneDelegate, StreamRenderDelegate};

// --- Helpers ---

fn path(p: &str) -> PrimPath {
    PrimPath::new(p).unwrap()
}

fn new_index(prim_id_bits: u32) -> RenderIndex {
    let delegate = StreamRenderDelegate::new(StreamSettings::default());
    match RenderIndex::new(Box::new(delegate), IndexSettings { prim_id_bits }) {
        Ok(index) => index,
        Err(e) => panic!("index creation failed: {e}"),
    }
}

fn new_scene() -> (Arc<MemorySceneDelegate>, Arc<dyn SceneDelegate>) {
    let scene = Arc::new(MemorySceneDelegate::new(path("/scene")));
    let handle: Arc<dyn SceneDelegate> = scene.clone();
    (scene, handle)
}

fn stream(index: &RenderIndex) -> &StreamRenderDelegate {
    index
        .render_delegate()
        .as_any()
        .downcast_ref::<StreamRenderDelegate>()
        .unwrap()
}

fn insert_quad(index: &mut RenderIndex, scene: &MemorySceneDelegate, sd: &Arc<dyn SceneDelegate>, id: &PrimPath) {
    scene.set_mesh(
        id,
        vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
        MeshTopology {
            face_vertex_counts: vec![4],
            face_vertex_indices: vec![0, 1, 2, 3],
        },
    );
    index.insert_rprim(&prim_types::MESH, sd, id, None).unwrap();
}

fn sync_and_commit(index: &mut RenderIndex, list: &mut DirtyList) {
    index.sync(list);
    index.commit_resources();
}

fn prim_id(index: &RenderIndex, id: &str) -> u32 {
    index.get_rprim(&path(id)).unwrap().prim_id()
}

// --- Registration ---

#[test]
fn test_insert_and_remove_rprims() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    let id = path("/scene/quad");

    insert_quad(&mut index, &scene, &sd, &id);
    assert!(index.has_rprim(&id));
    assert_eq!(index.rprim_type_id(&id), Some(&prim_types::MESH));
    assert_eq!(index.rprim_count(), 1);
    assert!(index.change_tracker().is_rprim_dirty(&id));
    assert_eq!(stream(&index).prim_counts().rprims, 1);

    index.remove_rprim(&id);
    assert!(!index.has_rprim(&id));
    assert!(index.get_rprim(&id).is_none());
    assert_eq!(stream(&index).prim_counts().rprims, 0);
    assert!(index.change_tracker().is_garbage_collection_needed());

    // Removing twice is a no-op.
    index.remove_rprim(&id);
    assert_eq!(index.rprim_count(), 0);
}

#[test]
fn test_duplicate_insert_replaces_previous_rprim() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    let id = path("/scene/quad");

    insert_quad(&mut index, &scene, &sd, &id);
    let first = prim_id(&index, "/scene/quad");
    insert_quad(&mut index, &scene, &sd, &id);

    assert_eq!(index.rprim_count(), 1);
    assert_eq!(stream(&index).prim_counts().rprims, 1);
    let second = prim_id(&index, "/scene/quad");
    assert_ne!(first, second);
    assert!(index.prim_path_from_prim_id(first).is_none());
    assert_eq!(index.prim_path_from_prim_id(second), Some(&id));
}

#[test]
fn test_unsupported_types_are_rejected() {
    let mut index = new_index(24);
    let (_scene, sd) = new_scene();
    let volume = Token::from_static("volume");

    let result = index.insert_rprim(&volume, &sd, &path("/scene/v"), None);
    assert!(matches!(
        result,
        Err(IndexError::UnsupportedPrimType { ref type_id, .. }) if *type_id == volume
    ));
    assert!(index
        .insert_sprim(&volume, &sd, &path("/scene/v"))
        .is_err());
    assert!(index
        .insert_bprim(&volume, &sd, &path("/scene/v"))
        .is_err());
    assert_eq!(index.rprim_count(), 0);
}

#[test]
fn test_invalid_settings_are_refused() {
    let delegate = StreamRenderDelegate::new(StreamSettings::default());
    let result = RenderIndex::new(Box::new(delegate), IndexSettings { prim_id_bits: 0 });
    assert!(matches!(result, Err(IndexError::InvalidSettings(_))));
}

#[test]
fn test_fallback_prims_exist_for_every_type() {
    let index = new_index(24);
    for type_id in [
        prim_types::CAMERA,
        prim_types::LIGHT,
        prim_types::DRAW_TARGET,
        prim_types::SHADER,
    ] {
        assert!(index.fallback_sprim(&type_id).is_some(), "no fallback {type_id}");
    }
    assert!(index.fallback_bprim(&prim_types::TEXTURE).is_some());

    let view = index
        .fallback_sprim(&prim_types::CAMERA)
        .and_then(|cam| cam.get(&strata_core::token::camera_values::WORLD_TO_VIEW_MATRIX))
        .and_then(|v| v.cloned::<DMat4>());
    assert_eq!(view, Some(DMat4::IDENTITY));
}

#[test]
fn test_remove_subtree() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    insert_quad(&mut index, &scene, &sd, &path("/scene/a/m1"));
    insert_quad(&mut index, &scene, &sd, &path("/scene/a/m2"));
    insert_quad(&mut index, &scene, &sd, &path("/scene/b/m3"));
    index
        .insert_sprim(&prim_types::CAMERA, &sd, &path("/scene/a/cam"))
        .unwrap();
    index.insert_instancer(&sd, &path("/scene/a/inst"), None);

    index.remove_subtree(&path("/scene/a"));

    assert_eq!(index.rprim_ids(), vec![path("/scene/b/m3")]);
    assert!(!index.has_sprim(&prim_types::CAMERA, &path("/scene/a/cam")));
    assert!(!index.has_instancer(&path("/scene/a/inst")));
    assert_eq!(stream(&index).prim_counts().rprims, 1);
}

#[test]
fn test_clear_destroys_everything_but_fallbacks() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    insert_quad(&mut index, &scene, &sd, &path("/scene/m1"));
    insert_quad(&mut index, &scene, &sd, &path("/scene/m2"));
    index
        .insert_sprim(&prim_types::LIGHT, &sd, &path("/scene/key"))
        .unwrap();
    index
        .insert_bprim(&prim_types::TEXTURE, &sd, &path("/scene/tex"))
        .unwrap();

    index.clear();

    let counts = stream(&index).prim_counts();
    assert_eq!(counts.rprims, 0);
    assert_eq!(counts.sprims, 4, "only the fallback sprims remain");
    assert_eq!(counts.bprims, 1, "only the fallback bprim remains");
    assert_eq!(index.rprim_count(), 0);

    // Ids restart after a clear.
    insert_quad(&mut index, &scene, &sd, &path("/scene/m3"));
    assert_eq!(prim_id(&index, "/scene/m3"), 1);
}

// --- Sync ---

#[test]
fn test_sync_consumes_dirty_bits() {
    // --- 1. ARRANGE ---
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    let id = path("/scene/quad");
    insert_quad(&mut index, &scene, &sd, &id);
    let mut list = DirtyList::new(RprimCollection::geometry());

    // --- 2. ACT ---
    sync_and_commit(&mut index, &mut list);

    // --- 3. ASSERT ---
    let bits = index.change_tracker().rprim_dirty_bits(&id);
    assert!(bits.is_clean(), "sync left {bits:?}");
    assert!(index.get_rprim(&id).unwrap().has_repr(&render_tags::HULL));
    assert_eq!(index.perf_log().get(&perf_counters::RPRIMS_SYNCED), 1);
}

#[test]
fn test_varying_state_settles() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    let id = path("/scene/quad");
    insert_quad(&mut index, &scene, &sd, &id);
    let mut list = DirtyList::new(RprimCollection::geometry());

    // Frame 1 syncs the new prim, frame 2 finds nothing dirty in the reused
    // list and resets the varying set, frame 3 gathers the empty varying set.
    for _ in 0..3 {
        sync_and_commit(&mut index, &mut list);
    }
    assert!(list.dirty_ids().is_empty());
    assert!(!index
        .change_tracker()
        .rprim_dirty_bits(&id)
        .contains(DirtyBits::VARYING));

    let rebuilt = index.perf_log().get(&perf_counters::DIRTY_LISTS_REBUILT);
    for _ in 0..5 {
        sync_and_commit(&mut index, &mut list);
    }
    assert_eq!(
        index.perf_log().get(&perf_counters::DIRTY_LISTS_REBUILT),
        rebuilt,
        "a quiet scene must not rebuild dirty lists"
    );

    // An edit brings the prim back into the varying set.
    index
        .change_tracker_mut()
        .mark_rprim_dirty(&id, DirtyBits::DIRTY_TRANSFORM);
    index.sync(&mut list);
    assert_eq!(list.dirty_ids(), &[id.clone()]);
    assert!(index.change_tracker().rprim_dirty_bits(&id).is_clean());
}

#[test]
fn test_collection_rebuild_keeps_varying_members() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    let a = path("/scene/a");
    let b = path("/scene/b");
    insert_quad(&mut index, &scene, &sd, &a);
    insert_quad(&mut index, &scene, &sd, &b);
    let mut list = DirtyList::new(RprimCollection::geometry());
    sync_and_commit(&mut index, &mut list);

    index
        .change_tracker_mut()
        .mark_rprim_dirty(&a, DirtyBits::DIRTY_VISIBILITY);
    sync_and_commit(&mut index, &mut list);
    assert!(list.dirty_ids().contains(&b), "clean but varying member dropped");

    // `b` is already varying, so this edit leaves the varying version alone.
    index
        .change_tracker_mut()
        .mark_rprim_dirty(&b, DirtyBits::DIRTY_TRANSFORM);
    sync_and_commit(&mut index, &mut list);
    assert!(index.change_tracker().rprim_dirty_bits(&b).is_clean());
}

#[test]
fn test_dead_scene_delegate_skips_sync() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    let id = path("/scene/quad");
    insert_quad(&mut index, &scene, &sd, &id);
    drop(scene);
    drop(sd);

    let mut list = DirtyList::new(RprimCollection::geometry());
    index.sync(&mut list);
    assert!(index.scene_delegate_for_rprim(&id).is_none());
    assert!(index.change_tracker().is_rprim_dirty(&id));
}

#[test]
fn test_sprims_and_bprims_sync_before_tasks() {
    struct CameraWatcher {
        id: PrimPath,
        camera: PrimPath,
        list: SharedDirtyList,
        seen: Option<DMat4>,
    }

    impl Task for CameraWatcher {
        fn id(&self) -> &PrimPath {
            &self.id
        }

        fn sync(&mut self, index: &mut RenderIndex, _ctx: &mut TaskContext) -> Result<(), TaskError> {
            self.seen = index
                .get_sprim(&prim_types::CAMERA, &self.camera)
                .and_then(|cam| cam.get(&strata_core::token::camera_values::WORLD_TO_VIEW_MATRIX))
                .and_then(|v| v.cloned::<DMat4>());
            index.queue_sync(Arc::clone(&self.list));
            // Queuing twice is harmless.
            index.queue_sync(Arc::clone(&self.list));
            Ok(())
        }

        fn execute(&mut self, _index: &RenderIndex, _ctx: &mut TaskContext) -> Result<(), TaskError> {
            Ok(())
        }
    }

    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    let camera = path("/scene/cam");
    let view = DMat4::from_translation(DVec3::new(0.0, 0.0, -3.0));
    scene.set_camera(
        &camera,
        strata_core::CameraMatrices {
            view,
            projection: DMat4::IDENTITY,
        },
    );
    index.insert_sprim(&prim_types::CAMERA, &sd, &camera).unwrap();
    insert_quad(&mut index, &scene, &sd, &path("/scene/quad"));

    let list = DirtyList::shared(RprimCollection::geometry());
    let watcher = Arc::new(std::sync::Mutex::new(CameraWatcher {
        id: path("/tasks/camera_watch"),
        camera,
        list: Arc::clone(&list),
        seen: None,
    }));
    let task: strata_data::SharedTask = watcher.clone();
    let mut ctx = TaskContext::new();

    let results = index.sync_all(&[task], &mut ctx);

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(watcher.lock().unwrap().seen, Some(view));
    assert!(index
        .change_tracker()
        .rprim_dirty_bits(&path("/scene/quad"))
        .is_clean());
    assert_eq!(list.lock().unwrap().dirty_ids().len(), 1);
}

#[test]
fn test_failing_task_does_not_stop_others() {
    struct Failing(PrimPath);
    impl Task for Failing {
        fn id(&self) -> &PrimPath {
            &self.0
        }
        fn sync(&mut self, _: &mut RenderIndex, _: &mut TaskContext) -> Result<(), TaskError> {
            Err(TaskError::InvalidParams {
                task: self.0.clone(),
                reason: "no camera".into(),
            })
        }
        fn execute(&mut self, _: &RenderIndex, _: &mut TaskContext) -> Result<(), TaskError> {
            Ok(())
        }
    }

    struct Marker(PrimPath);
    impl Task for Marker {
        fn id(&self) -> &PrimPath {
            &self.0
        }
        fn sync(&mut self, _: &mut RenderIndex, ctx: &mut TaskContext) -> Result<(), TaskError> {
            ctx.insert(Token::from_static("marker"), true);
            Ok(())
        }
        fn execute(&mut self, _: &RenderIndex, _: &mut TaskContext) -> Result<(), TaskError> {
            Ok(())
        }
    }

    let mut index = new_index(24);
    let mut ctx = TaskContext::new();
    let tasks = [
        shared_task(Failing(path("/tasks/a"))),
        shared_task(Marker(path("/tasks/b"))),
    ];
    let results = index.sync_all(&tasks, &mut ctx);
    assert!(results[0].is_err());
    assert!(results[1].is_ok());
    assert!(ctx.contains(&Token::from_static("marker")));
}

// --- Instance ids and picking ---

#[test]
fn test_prim_ids_are_monotonic_and_compact_on_exhaustion() {
    // Two bits leave ids 1..=3.
    let mut index = new_index(2);
    let (scene, sd) = new_scene();
    for name in ["/scene/A", "/scene/B", "/scene/C"] {
        insert_quad(&mut index, &scene, &sd, &path(name));
    }
    assert_eq!(prim_id(&index, "/scene/A"), 1);
    assert_eq!(prim_id(&index, "/scene/B"), 2);
    assert_eq!(prim_id(&index, "/scene/C"), 3);

    index.remove_rprim(&path("/scene/B"));
    insert_quad(&mut index, &scene, &sd, &path("/scene/D"));
    assert_eq!(prim_id(&index, "/scene/A"), 1);
    assert_eq!(prim_id(&index, "/scene/C"), 2);
    assert_eq!(prim_id(&index, "/scene/D"), 3);
    assert_eq!(index.perf_log().get(&perf_counters::PRIM_ID_COMPACTIONS), 1);
    assert!(index
        .change_tracker()
        .rprim_dirty_bits(&path("/scene/C"))
        .contains(DirtyBits::DIRTY_PRIM_ID));

    let result = index.insert_rprim(&prim_types::MESH, &sd, &path("/scene/E"), None);
    assert!(matches!(
        result,
        Err(IndexError::PrimIdSpaceExhausted { max: 3, .. })
    ));
    assert!(!index.has_rprim(&path("/scene/E")));
    assert_eq!(stream(&index).prim_counts().rprims, 3);
}

#[test]
fn test_pick_round_trip_through_executed_pass() {
    // --- 1. ARRANGE ---
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    insert_quad(&mut index, &scene, &sd, &path("/scene/a"));
    insert_quad(&mut index, &scene, &sd, &path("/scene/b"));
    let collection = RprimCollection::geometry();
    let mut list = DirtyList::new(collection.clone());
    sync_and_commit(&mut index, &mut list);

    // --- 2. ACT ---
    let view = index.draw_items(&collection);
    let items: Vec<_> = view.values().flatten().collect();
    index
        .render_delegate()
        .execute_pass(&PassParams::default(), &items)
        .unwrap();

    // --- 3. ASSERT ---
    let pass = stream(&index).frame_recorder().last_pass().unwrap();
    assert_eq!(pass.commands.len(), 2);
    for command in &pass.commands {
        let picked = index.get_prim_path_from_prim_id_color(command.id_color, IdColor::BACKGROUND);
        assert_eq!(
            picked,
            Some(PickResult {
                prim_path: command.rprim_id.clone(),
                instance_index: None,
            })
        );
    }
    assert!(index
        .get_prim_path_from_prim_id_color(IdColor::BACKGROUND, IdColor::BACKGROUND)
        .is_none());
}

#[test]
fn test_stale_and_instanced_picks() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    let instancer = path("/scene/inst");
    scene.set(&instancer, scene_keys::INSTANCE_TRANSFORMS, vec![DMat4::IDENTITY; 3]);
    index.insert_instancer(&sd, &instancer, None);
    scene.set_mesh(&path("/scene/copies"), vec![Vec3::ZERO; 3], MeshTopology::default());
    index
        .insert_rprim(&prim_types::MESH, &sd, &path("/scene/copies"), Some(&instancer))
        .unwrap();
    insert_quad(&mut index, &scene, &sd, &path("/scene/gone"));

    let copies = IdColor::encode(prim_id(&index, "/scene/copies"));
    let picked = index
        .get_prim_path_from_prim_id_color(copies, IdColor::encode(2))
        .unwrap();
    assert_eq!(picked.instance_index, Some(2));

    let gone = IdColor::encode(prim_id(&index, "/scene/gone"));
    index.remove_rprim(&path("/scene/gone"));
    assert!(index
        .get_prim_path_from_prim_id_color(gone, IdColor::BACKGROUND)
        .is_none());
}

// --- Draw items and garbage collection ---

#[test]
fn test_draw_items_are_memoized_until_the_collection_changes() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    let id = path("/scene/quad");
    insert_quad(&mut index, &scene, &sd, &id);
    let collection = RprimCollection::geometry();
    let mut list = DirtyList::new(collection.clone());
    sync_and_commit(&mut index, &mut list);

    let first = index.draw_items(&collection);
    let second = index.draw_items(&collection);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(index.perf_log().get(&perf_counters::DRAW_ITEMS_FETCHED), 1);

    // Transform edits reuse the view but the items see the new state.
    let moved = DMat4::from_translation(DVec3::new(1.0, 0.0, 0.0));
    scene.set(&id, scene_keys::TRANSFORM, moved);
    index
        .change_tracker_mut()
        .mark_rprim_dirty(&id, DirtyBits::DIRTY_TRANSFORM);
    sync_and_commit(&mut index, &mut list);
    let third = index.draw_items(&collection);
    assert!(Arc::ptr_eq(&first, &third));
    let item = &third[&render_tags::GEOMETRY][0];
    assert_eq!(item.snapshot().world_transform, moved);

    // Visibility affects membership and forces a rebuild.
    scene.set(&id, scene_keys::VISIBILITY, false);
    index
        .change_tracker_mut()
        .mark_rprim_dirty(&id, DirtyBits::DIRTY_VISIBILITY);
    sync_and_commit(&mut index, &mut list);
    let fourth = index.draw_items(&collection);
    assert!(!Arc::ptr_eq(&first, &fourth));
    assert!(fourth.values().all(Vec::is_empty));
}

#[test]
fn test_garbage_collection_bumps_collection_versions() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    insert_quad(&mut index, &scene, &sd, &path("/scene/keep"));
    insert_quad(&mut index, &scene, &sd, &path("/scene/drop"));
    let mut list = DirtyList::new(RprimCollection::geometry());
    sync_and_commit(&mut index, &mut list);
    let ranges = stream(&index).resource_registry().range_count();

    index.remove_rprim(&path("/scene/drop"));
    assert!(index.change_tracker().is_garbage_collection_needed());
    let version = index
        .change_tracker()
        .collection_version(&render_tags::GEOMETRY);

    index.commit_resources();

    assert!(!index.change_tracker().is_garbage_collection_needed());
    assert!(
        index
            .change_tracker()
            .collection_version(&render_tags::GEOMETRY)
            > version
    );
    assert_eq!(index.perf_log().get(&perf_counters::GARBAGE_COLLECTED), 1);
    assert!(stream(&index).resource_registry().range_count() < ranges);
}

// --- Queries ---

#[test]
fn test_queries_by_delegate_and_subtree() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    let other = Arc::new(MemorySceneDelegate::new(path("/other")));
    let other_sd: Arc<dyn SceneDelegate> = other.clone();
    let instancer = path("/scene/props/inst");
    index.insert_instancer(&sd, &instancer, None);
    scene.set_mesh(&path("/scene/props/rock"), vec![Vec3::ZERO; 3], MeshTopology::default());
    index
        .insert_rprim(&prim_types::MESH, &sd, &path("/scene/props/rock"), Some(&instancer))
        .unwrap();
    insert_quad(&mut index, &scene, &sd, &path("/scene/floor"));
    insert_quad(&mut index, &other, &other_sd, &path("/other/wall"));

    assert_eq!(
        index.rprim_subtree(&path("/scene/props")),
        vec![path("/scene/props/rock")]
    );
    assert_eq!(
        index.scene_delegate_and_instancer_ids(&path("/scene/props/rock")),
        Some((path("/scene"), Some(instancer.clone())))
    );
    assert!(index.get_instancer(&instancer).is_some());
    assert_eq!(index.delegate_rprim_ids(&path("/other")), vec![path("/other/wall")]);
    assert_eq!(
        index.delegate_ids_with_dirty_rprims(DirtyBits::DIRTY_POINTS),
        vec![path("/other"), path("/scene")]
    );

    let props = RprimCollection::geometry().with_root_paths(vec![path("/scene/props")]);
    assert!(index.is_in_collection(&path("/scene/props/rock"), &props));
    assert!(!index.is_in_collection(&path("/scene/floor"), &props));
    assert!(!index.is_in_collection(&path("/scene/props/missing"), &props));

    // Only the other delegate's prims stay dirty after syncing the scene.
    let mut list = DirtyList::new(RprimCollection::geometry().with_root_paths(vec![path("/scene")]));
    sync_and_commit(&mut index, &mut list);
    assert_eq!(
        index.delegate_ids_with_dirty_rprims(DirtyBits::ALL_DIRTY),
        vec![path("/other")]
    );
}

#[test]
fn test_sprim_bprim_and_task_bookkeeping() {
    let mut index = new_index(24);
    let (_scene, sd) = new_scene();
    assert!(index.is_sprim_type_supported(&prim_types::LIGHT));
    assert!(!index.is_sprim_type_supported(&prim_types::MESH));
    assert!(index.is_bprim_type_supported(&prim_types::TEXTURE));

    let key = path("/scene/lights/key");
    let tex = path("/scene/textures/albedo");
    index.insert_sprim(&prim_types::LIGHT, &sd, &key).unwrap();
    index.insert_bprim(&prim_types::TEXTURE, &sd, &tex).unwrap();
    assert_eq!(
        index.sprim_subtree(&prim_types::LIGHT, &path("/scene/lights")),
        vec![key.clone()]
    );
    assert_eq!(
        index.bprim_subtree(&prim_types::TEXTURE, &path("/scene")),
        vec![tex.clone()]
    );
    assert!(index.get_bprim(&prim_types::TEXTURE, &tex).is_some());

    let mut ctx = TaskContext::new();
    index.sync_all(&[], &mut ctx);
    assert!(index.change_tracker().bprim_dirty_bits(&tex).is_clean());
    index
        .change_tracker_mut()
        .mark_bprim_dirty(&tex, DirtyBits::DIRTY_TEXTURE);
    index.sync_all(&[], &mut ctx);
    assert!(index.change_tracker().bprim_dirty_bits(&tex).is_clean());
    assert_eq!(index.perf_log().get(&perf_counters::BPRIMS_SYNCED), 2);

    index.remove_sprim(&prim_types::LIGHT, &key);
    index.remove_bprim(&prim_types::TEXTURE, &tex);
    assert!(!index.has_sprim(&prim_types::LIGHT, &key));
    assert!(!index.has_bprim(&prim_types::TEXTURE, &tex));
    assert_eq!(stream(&index).prim_counts().sprims, 4);
    assert_eq!(stream(&index).prim_counts().bprims, 1);

    let task_id = path("/scene/tasks/noop");
    index.insert_task(&sd, &task_id, shared_task(Noop(task_id.clone())));
    assert!(index.has_task(&task_id));
    assert!(index.get_task(&task_id).is_some());
    index.change_tracker_mut().mark_task_clean(&task_id, DirtyBits::CLEAN);
    index
        .change_tracker_mut()
        .mark_task_dirty(&task_id, DirtyBits::DIRTY_PARAMS);
    assert!(index
        .change_tracker()
        .task_dirty_bits(&task_id)
        .contains(DirtyBits::DIRTY_PARAMS));
    index.remove_task(&task_id);
    assert!(!index.has_task(&task_id));
    assert!(index.get_task(&task_id).is_none());
}

#[test]
fn test_draw_items_of_different_collections_share_state() {
    let mut index = new_index(24);
    let (scene, sd) = new_scene();
    insert_quad(&mut index, &scene, &sd, &path("/scene/quad"));
    let geometry = RprimCollection::geometry();
    let picking = RprimCollection::new(Token::from_static("picking"), render_tags::HULL);
    let mut list = DirtyList::new(geometry.clone());
    sync_and_commit(&mut index, &mut list);

    let a = index.draw_items(&geometry);
    let b = index.draw_items(&picking);
    let a = &a[&render_tags::GEOMETRY][0];
    let b = &b[&render_tags::GEOMETRY][0];
    assert!(a.shares_data_with(b));
}

struct Noop(PrimPath);

impl Task for Noop {
    fn id(&self) -> &PrimPath {
        &self.0
    }

    fn sync(&mut self, _index: &mut RenderIndex, _ctx: &mut TaskContext) -> Result<(), TaskError> {
        Ok(())
    }

    fn execute(&mut self, _index: &RenderIndex, _ctx: &mut TaskContext) -> Result<(), TaskError> {
        Ok(())
    }
}
