//! The demo stage: a penguin on a rock floor under three coloured lights.

use crate::light::LightKind;
use crate::scene::{Scene, SceneError, ShadowTechnique};
use glam::Vec3;
use stagehand_assets::{MaterialLibrary, MeshStore, PlaneDesc, build_box};
use stagehand_common::{CameraId, Color, LightId, NodeId, TransformSpace, ViewportId};

pub const ENTITY_MESH: &str = "penguin.mesh";
pub const ENTITY_NODE: &str = "entityNode";
pub const GROUND_MESH: &str = "ground";
pub const GROUND_MATERIAL: &str = "Examples/Rockwall";
pub const SPOT_LIGHT: &str = "SpotLight";
pub const DIRECTIONAL_LIGHT: &str = "DirectionalLight";
pub const POINT_LIGHT: &str = "PointLight";
pub const PLAYER_CAMERA: &str = "PlayerCam";

/// Handles the per-frame code needs, resolved once when the stage is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageHandles {
    pub entity_node: NodeId,
    pub spotlight: LightId,
    pub camera: CameraId,
    pub viewport: ViewportId,
}

/// Everything the stage owns.
#[derive(Debug, Clone)]
pub struct Stage {
    pub scene: Scene,
    pub meshes: MeshStore,
    pub materials: MaterialLibrary,
    pub handles: StageHandles,
}

/// Build the stage into a fresh scene, with a viewport of `width` x `height`.
pub fn build_stage(
    materials: MaterialLibrary,
    width: u32,
    height: u32,
) -> Result<Stage, SceneError> {
    let mut scene = Scene::new();
    let mut meshes = MeshStore::new();

    let entity_node = create_scene(&mut scene, &mut meshes, &materials)?;
    let camera = create_camera(&mut scene)?;
    let viewport = create_viewports(&mut scene, camera, width, height)?;
    let spotlight = scene.light_by_name(SPOT_LIGHT)?;

    tracing::info!(
        "stage built: {} nodes, {} meshes, viewport {}x{}",
        scene.node_count(),
        meshes.len(),
        width,
        height
    );

    Ok(Stage {
        scene,
        meshes,
        materials,
        handles: StageHandles {
            entity_node,
            spotlight,
            camera,
            viewport,
        },
    })
}

/// Populate the scene. Returns the node carrying the controllable entity.
pub fn create_scene(
    scene: &mut Scene,
    meshes: &mut MeshStore,
    materials: &MaterialLibrary,
) -> Result<NodeId, SceneError> {
    scene.set_ambient(Color::BLACK);
    scene.set_shadow_technique(ShadowTechnique::StencilAdditive);

    // The entity mesh is procedural: a box about the size of the penguin,
    // centred on its node so that at height 25 it stands on the ground.
    let body = meshes.register(build_box(ENTITY_MESH, Vec3::new(12.0, 25.0, 10.0)))?;
    let entity = scene.create_entity(None, body)?;
    scene.entity_mut(entity)?.cast_shadows = true;
    let entity_node = scene.create_child_node(Scene::ROOT, Some(ENTITY_NODE))?;
    scene.attach(entity_node, entity)?;
    scene.translate(entity_node, Vec3::new(0.0, 25.0, 0.0), TransformSpace::Parent)?;

    let plane = PlaneDesc::new(Vec3::Y, 0.0, 1500.0, 1500.0)
        .segments(20, 20)
        .tiling(5.0, 5.0)
        .up(Vec3::Z);
    let ground_mesh = meshes.create_plane(GROUND_MESH, &plane)?;
    let ground = scene.create_entity(Some(GROUND_MESH), ground_mesh)?;
    let ground_node = scene.create_child_node(Scene::ROOT, None)?;
    scene.attach(ground_node, ground)?;
    // Fail here rather than at draw time if the material is missing.
    materials.get(GROUND_MATERIAL)?;
    let entity = scene.entity_mut(ground)?;
    entity.cast_shadows = false;
    entity.material = Some(GROUND_MATERIAL.to_string());

    let spot = scene.create_light(
        SPOT_LIGHT,
        LightKind::Spot {
            inner: 0.0,
            outer: 0.0,
        },
    )?;
    let light = scene.light_mut(spot)?;
    light.set_colour(Color::rgb(0.0, 0.5, 1.0));
    light.set_direction(Vec3::new(-1.0, -1.0, 0.0));
    light.position = Vec3::new(200.0, 200.0, 0.0);
    light.set_spot_range(35.0_f32.to_radians(), 50.0_f32.to_radians());

    let directional = scene.create_light(DIRECTIONAL_LIGHT, LightKind::Directional)?;
    let light = scene.light_mut(directional)?;
    light.set_colour(Color::rgb(0.4, 0.0, 0.0));
    light.set_direction(Vec3::new(0.0, -1.0, 1.0));

    let point = scene.create_light(POINT_LIGHT, LightKind::Point)?;
    let light = scene.light_mut(point)?;
    light.set_colour(Color::rgb(0.3, 0.3, 0.3));
    light.position = Vec3::new(0.0, 150.0, 250.0);

    Ok(entity_node)
}

pub fn create_camera(scene: &mut Scene) -> Result<CameraId, SceneError> {
    let id = scene.create_camera(PLAYER_CAMERA)?;
    let camera = scene.camera_mut(id)?;
    camera.position = Vec3::new(0.0, 300.0, 500.0);
    camera.look_at(Vec3::ZERO);
    camera.near = 5.0;
    Ok(id)
}

/// One full-window viewport with a black background; the camera takes its
/// aspect ratio from it.
pub fn create_viewports(
    scene: &mut Scene,
    camera: CameraId,
    width: u32,
    height: u32,
) -> Result<ViewportId, SceneError> {
    let vp = scene.add_viewport(camera, width, height)?;
    scene.viewport_mut(vp)?.background = Color::BLACK;
    let aspect = scene.viewport(vp)?.aspect_ratio();
    scene.camera_mut(camera)?.aspect = aspect;
    Ok(vp)
}
