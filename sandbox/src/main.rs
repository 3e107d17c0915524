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

// Strata Sandbox
// Builds a small scene, runs a few frames and picks the drawn prims.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use strata_core::math::{DMat4, DVec3, Vec3, Viewport};
use strata_core::token::{prim_types, render_tags, scene_keys};
use strata_core::{
    CameraMatrices, DirtyBits, IdColor, MeshTopology, PrimPath, SceneDelegate, StrataConfig,
};
use strata_data::{shared_task, RenderIndex, RprimCollection, SharedTask};
use strata_engine::Engine;
use strata_infra::{MemorySceneDelegate, StreamRenderDelegate};
use strata_tasks::{RenderSetupParams, RenderSetupTask, RenderTask};

#[derive(Parser, Debug)]
#[command(version, about = "Headless Strata frame loop")]
struct Args {
    /// JSON configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to run.
    #[arg(short, long, default_value_t = 8)]
    frames: u32,

    /// Quads per side of the grid.
    #[arg(short, long, default_value_t = 4)]
    grid: u32,
}

fn path(p: &str) -> Result<PrimPath> {
    PrimPath::new(p).with_context(|| format!("invalid prim path '{p}'"))
}

fn load_config(args: &Args) -> Result<StrataConfig> {
    match &args.config {
        Some(file) => StrataConfig::from_file(file)
            .map_err(|e| anyhow!("failed to load {}: {e}", file.display())),
        None => Ok(StrataConfig::default()),
    }
}

struct Scene {
    data: Arc<MemorySceneDelegate>,
    delegate: Arc<dyn SceneDelegate>,
    quads: Vec<PrimPath>,
}

fn build_scene(index: &mut RenderIndex, grid: u32) -> Result<Scene> {
    let data = Arc::new(MemorySceneDelegate::new(path("/world")?));
    let delegate: Arc<dyn SceneDelegate> = data.clone();

    let camera = path("/world/camera")?;
    data.set_camera(
        &camera,
        CameraMatrices {
            view: DMat4::look_at_rh(DVec3::new(0.0, 0.0, 10.0), DVec3::ZERO, DVec3::Y),
            projection: DMat4::perspective_rh(45f64.to_radians(), 1.0, 0.1, 100.0),
        },
    );
    index.insert_sprim(&prim_types::CAMERA, &delegate, &camera)?;

    let mut quads = Vec::new();
    for row in 0..grid {
        for col in 0..grid {
            let id = path(&format!("/world/grid/quad_{row}_{col}"))?;
            data.set_mesh(
                &id,
                vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
                MeshTopology {
                    face_vertex_counts: vec![4],
                    face_vertex_indices: vec![0, 1, 2, 3],
                },
            );
            data.set(
                &id,
                scene_keys::TRANSFORM,
                DMat4::from_translation(DVec3::new(col as f64 * 1.5, row as f64 * 1.5, 0.0)),
            );
            index.insert_rprim(&prim_types::MESH, &delegate, &id, None)?;
            quads.push(id);
        }
    }

    // A guide curve that the render setup filters out.
    let curve = path("/world/guides/axis")?;
    data.set(&curve, scene_keys::POINTS, vec![Vec3::ZERO, Vec3::X * 4.0]);
    data.set(&curve, scene_keys::RENDER_TAG, render_tags::GUIDE);
    index.insert_rprim(&prim_types::BASIS_CURVES, &delegate, &curve, None)?;

    // Instanced points.
    let instancer = path("/world/scatter")?;
    data.set(
        &instancer,
        scene_keys::INSTANCE_TRANSFORMS,
        (0..3)
            .map(|i| DMat4::from_translation(DVec3::new(0.0, -2.0, i as f64)))
            .collect::<Vec<_>>(),
    );
    index.insert_instancer(&delegate, &instancer, None);
    let pebbles = path("/world/scatter/pebbles")?;
    data.set(&pebbles, scene_keys::POINTS, vec![Vec3::ZERO, Vec3::Y]);
    index.insert_rprim(&prim_types::POINTS, &delegate, &pebbles, Some(&instancer))?;

    Ok(Scene {
        data,
        delegate,
        quads,
    })
}

fn build_tasks(index: &mut RenderIndex, scene: &Scene) -> Result<Vec<SharedTask>> {
    let setup_id = path("/world/tasks/setup")?;
    scene.data.set(
        &setup_id,
        scene_keys::TASK_PARAMS,
        RenderSetupParams {
            camera_id: Some(path("/world/camera")?),
            viewport: Viewport::new(1280.0, 720.0),
            render_tags: vec![render_tags::GEOMETRY],
            ..Default::default()
        },
    );
    let setup = shared_task(RenderSetupTask::new(setup_id.clone()));
    index.insert_task(&scene.delegate, &setup_id, setup.clone());

    let render_id = path("/world/tasks/render")?;
    let render = shared_task(RenderTask::new(
        render_id.clone(),
        RprimCollection::new(render_tags::GEOMETRY, render_tags::SMOOTH_HULL),
    ));
    index.insert_task(&scene.delegate, &render_id, render.clone());

    Ok(vec![setup, render])
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = load_config(&args)?;
    log::info!("Starting sandbox with {config:?}");

    let delegate = StreamRenderDelegate::new(config.stream);
    let mut index = RenderIndex::new(Box::new(delegate), config.index)?;
    let scene = build_scene(&mut index, args.grid)?;
    let tasks = build_tasks(&mut index, &scene)?;
    let mut engine = Engine::with_settings(config.engine);

    for frame in 0..args.frames {
        // Move one quad per frame.
        if let Some(id) = scene.quads.get(frame as usize % scene.quads.len().max(1)) {
            scene.data.set(
                id,
                scene_keys::TRANSFORM,
                DMat4::from_translation(DVec3::new(0.0, 0.0, frame as f64 * 0.1)),
            );
            index
                .change_tracker_mut()
                .mark_rprim_dirty(id, DirtyBits::DIRTY_TRANSFORM);
        }

        let report = engine.execute(&mut index, &tasks);
        for failure in &report.failures {
            log::error!(
                "Frame {frame}: task {} failed during {}: {}",
                failure.task,
                failure.phase,
                failure.error
            );
        }
        log::info!(
            "Frame {frame}: {} draw items, {} instances in {:?}",
            report.pass_stats.draw_items,
            report.pass_stats.instances,
            report.timings.total()
        );
    }

    // Pick every prim of the last recorded pass back from its id color.
    let stream = index
        .render_delegate()
        .as_any()
        .downcast_ref::<StreamRenderDelegate>()
        .ok_or_else(|| anyhow!("unexpected render delegate"))?;
    if let Some(pass) = stream.frame_recorder().last_pass() {
        for command in &pass.commands {
            match index.get_prim_path_from_prim_id_color(command.id_color, IdColor::BACKGROUND) {
                Some(pick) => log::info!("Picked {} from {:?}", pick.prim_path, command.id_color),
                None => log::warn!("Id color {:?} resolves to nothing", command.id_color),
            }
        }
    }

    engine.reload_all_shaders(&mut index);
    let report = engine.execute(&mut index, &tasks);
    log::info!("After shader reload: {} draw items", report.pass_stats.draw_items);

    let counters = serde_json::to_string_pretty(&index.perf_log().snapshot())?;
    log::info!("Performance counters:\n{counters}");
    Ok(())
}
