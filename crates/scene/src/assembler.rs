use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use std::f64::consts::TAU;

use glam::{Vec2, Vec3};
use painter::{
    BrickPattern, GlyphSource, GridPattern, NameTag, RasterSurface, SamplingParams,
    SurfaceAllocError, SunStripes, BRICK_SURFACE_SIZE, GRID_REPEAT, GRID_SURFACE_SIZE,
    NAME_TAG_HEIGHT, NAME_TAG_WIDTH, SUN_SURFACE_SIZE,
};

use crate::camera::{OrbitController, PerspectiveCamera};
use crate::geometry::{self, Geometry, GeometryId};
use crate::graph::{DrawItem, Drawable, NodeId, SceneGraph, Transform};
use crate::material::{srgb_hex, Material, MaterialId, SurfaceId};
use crate::post::{Environment, PostSettings};

const PYRAMID_RADIUS: f32 = 1.5;
const PYRAMID_HEIGHT: f32 = 2.0;
const PYRAMID_SIDES: u32 = 4;
const PYRAMID_SCALE: f32 = 1.3;
const PYRAMID_LIFT: f32 = 0.5;
/// Y rotation per tick.
pub const PYRAMID_SPIN_STEP: f64 = 0.002;
/// Vertical texture scroll per second of elapsed time.
pub const FLOOR_SCROLL_SPEED: f64 = 0.15;

pub const CAMERA_EYE: Vec3 = Vec3::new(0.0, 1.5, 4.0);

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Surface(#[from] SurfaceAllocError),
}

/// Inputs the host supplies when building the scene.
#[derive(Debug)]
pub struct SceneOptions {
    pub viewport: (u32, u32),
    pub pixel_size: u32,
    pub glyphs: GlyphSource,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            viewport: (1280, 720),
            pixel_size: 3,
            glyphs: GlyphSource::Bitmap,
        }
    }
}

/// Ids of the nodes, materials and surfaces the animation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneHandles {
    pub root: NodeId,
    pub pyramid: NodeId,
    pub pyramid_body: NodeId,
    pub pyramid_edges: NodeId,
    pub markers: [NodeId; 5],
    pub floor: NodeId,
    pub sun: NodeId,
    pub name_tag: NodeId,
    pub floor_material: MaterialId,
    pub brick_surface: SurfaceId,
    pub grid_surface: SurfaceId,
    pub sun_surface: SurfaceId,
    pub name_surface: SurfaceId,
}

/// The whole application state: scene graph, GPU-facing resources,
/// camera and post-processing settings, plus the painters that refresh the
/// dynamic surfaces.
#[derive(Debug)]
pub struct AvatarScene {
    graph: SceneGraph,
    geometries: Vec<Geometry>,
    materials: Vec<Material>,
    surfaces: Vec<RasterSurface>,
    camera: PerspectiveCamera,
    controls: OrbitController,
    post: PostSettings,
    environment: Environment,
    handles: SceneHandles,
    sun: SunStripes,
    name_tag: NameTag,
    pyramid_spin: f64,
    floor_offset: f64,
}

/// Marker positions on the unscaled pyramid: apex first, then the base
/// corners.
pub fn marker_positions() -> [Vec3; 5] {
    let corners = geometry::cone_corners(PYRAMID_RADIUS, PYRAMID_HEIGHT, PYRAMID_SIDES, FRAC_PI_4);
    [
        Vec3::new(0.0, PYRAMID_HEIGHT / 2.0, 0.0),
        corners[0],
        corners[1],
        corners[2],
        corners[3],
    ]
}

struct Builder {
    geometries: Vec<Geometry>,
    materials: Vec<Material>,
    surfaces: Vec<RasterSurface>,
}

impl Builder {
    fn geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.push(geometry);
        GeometryId(self.geometries.len() - 1)
    }

    fn material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    fn surface(&mut self, surface: RasterSurface) -> SurfaceId {
        self.surfaces.push(surface);
        SurfaceId(self.surfaces.len() - 1)
    }
}

/// Builds the fixed avatar scene. Static surfaces are painted here; the
/// sun and name tag are painted on the first tick.
pub fn assemble(options: SceneOptions) -> Result<AvatarScene, SceneError> {
    let mut builder = Builder {
        geometries: Vec::new(),
        materials: Vec::new(),
        surfaces: Vec::new(),
    };

    let mut bricks = RasterSurface::new(
        "bricks",
        BRICK_SURFACE_SIZE,
        BRICK_SURFACE_SIZE,
        SamplingParams::TILED,
    )?;
    let pattern = BrickPattern::default();
    bricks.repaint(|pixmap| pattern.paint(pixmap));

    let mut grid = RasterSurface::new(
        "grid",
        GRID_SURFACE_SIZE,
        GRID_SURFACE_SIZE,
        SamplingParams::TILED,
    )?;
    let lines = GridPattern::default();
    grid.repaint(|pixmap| lines.paint(pixmap));

    let sun_surface = RasterSurface::new(
        "sun",
        SUN_SURFACE_SIZE,
        SUN_SURFACE_SIZE,
        SamplingParams {
            filter: painter::FilterMode::Nearest,
            ..SamplingParams::SMOOTH
        },
    )?;
    let name_surface = RasterSurface::new(
        "name-tag",
        NAME_TAG_WIDTH,
        NAME_TAG_HEIGHT,
        SamplingParams::SMOOTH,
    )?;

    let brick_surface = builder.surface(bricks);
    let grid_surface = builder.surface(grid);
    let sun_surface = builder.surface(sun_surface);
    let name_surface = builder.surface(name_surface);

    let pyramid_geometry = geometry::cone(PYRAMID_RADIUS, PYRAMID_HEIGHT, PYRAMID_SIDES, FRAC_PI_4);
    let edge_geometry = geometry::edges(&pyramid_geometry, 1.0);
    let pyramid_geometry = builder.geometry(pyramid_geometry);
    let edge_geometry = builder.geometry(edge_geometry);
    let marker_geometry = builder.geometry(geometry::sphere(0.06, 16, 16));
    let floor_geometry = builder.geometry(geometry::plane(100.0, 100.0));
    let sun_geometry = builder.geometry(geometry::circle(4.0, 32));
    let sprite_geometry = builder.geometry(geometry::quad());

    let brick_material = builder.material(
        Material::basic("bricks", Vec3::ONE)
            .with_texture(brick_surface)
            .with_polygon_offset(1.0, 1.0),
    );
    let edge_material = builder.material(Material::line("edges", srgb_hex(0x00ffff)));
    let marker_material = builder.material(Material::basic("markers", srgb_hex(0xff00ff)));
    let floor_material = builder.material(
        Material::basic("floor", Vec3::ONE)
            .with_texture(grid_surface)
            .with_uv_repeat(Vec2::from_array(GRID_REPEAT))
            .transparent(1.0)
            .double_sided(),
    );
    let sun_material = builder.material(
        Material::basic("sun", Vec3::ONE)
            .with_texture(sun_surface)
            .transparent(1.0)
            .billboard(),
    );
    let name_material = builder.material(
        Material::basic("name-tag", Vec3::ONE)
            .with_texture(name_surface)
            .transparent(0.95)
            .billboard(),
    );

    let mut graph = SceneGraph::new("root");
    let root = graph.root();
    let group = graph.add(root, "pyramid-group", Transform::default(), None);
    let pyramid = graph.add(
        group,
        "pyramid",
        Transform::from_translation(Vec3::new(0.0, PYRAMID_LIFT, 0.0))
            .with_scale(Vec3::splat(PYRAMID_SCALE)),
        None,
    );
    let pyramid_body = graph.add(
        pyramid,
        "pyramid-body",
        Transform::default(),
        Some(Drawable {
            geometry: pyramid_geometry,
            material: brick_material,
        }),
    );
    let pyramid_edges = graph.add(
        pyramid,
        "pyramid-edges",
        Transform::default(),
        Some(Drawable {
            geometry: edge_geometry,
            material: edge_material,
        }),
    );
    let markers = marker_positions().map(|position| {
        graph.add(
            pyramid,
            "marker",
            Transform::from_translation(position),
            Some(Drawable {
                geometry: marker_geometry,
                material: marker_material,
            }),
        )
    });

    let floor = graph.add(
        root,
        "floor",
        Transform::from_translation(Vec3::new(0.0, -1.0, 0.0))
            .with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0)),
        Some(Drawable {
            geometry: floor_geometry,
            material: floor_material,
        }),
    );
    let sun = graph.add(
        root,
        "sun",
        Transform::from_translation(Vec3::new(0.0, 3.0, -8.0)),
        Some(Drawable {
            geometry: sun_geometry,
            material: sun_material,
        }),
    );
    let name_tag = graph.add(
        root,
        "name-tag",
        Transform::from_translation(Vec3::new(0.0, -0.5, 2.5)).with_scale(Vec3::new(6.0, 1.5, 1.0)),
        Some(Drawable {
            geometry: sprite_geometry,
            material: name_material,
        }),
    );

    let (width, height) = options.viewport;
    let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
    camera.set_viewport(width, height);

    tracing::debug!(
        nodes = graph.len(),
        geometries = builder.geometries.len(),
        surfaces = builder.surfaces.len(),
        "assembled avatar scene"
    );

    Ok(AvatarScene {
        graph,
        geometries: builder.geometries,
        materials: builder.materials,
        surfaces: builder.surfaces,
        camera,
        controls: OrbitController::new(CAMERA_EYE, Vec3::ZERO),
        post: PostSettings::new(options.pixel_size),
        environment: Environment::default(),
        handles: SceneHandles {
            root,
            pyramid,
            pyramid_body,
            pyramid_edges,
            markers,
            floor,
            sun,
            name_tag,
            floor_material,
            brick_surface,
            grid_surface,
            sun_surface,
            name_surface,
        },
        sun: SunStripes::default(),
        name_tag: NameTag::new(options.glyphs),
        pyramid_spin: 0.0,
        floor_offset: 0.0,
    })
}

impl AvatarScene {
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn handles(&self) -> &SceneHandles {
        &self.handles
    }

    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    pub fn geometry(&self, id: GeometryId) -> &Geometry {
        &self.geometries[id.0]
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0]
    }

    pub fn surfaces(&self) -> &[RasterSurface] {
        &self.surfaces
    }

    pub fn surface(&self, id: SurfaceId) -> &RasterSurface {
        &self.surfaces[id.0]
    }

    /// Pairs every surface with its id.
    pub fn surface_ids(&self) -> impl Iterator<Item = (SurfaceId, &RasterSurface)> {
        self.surfaces
            .iter()
            .enumerate()
            .map(|(index, surface)| (SurfaceId(index), surface))
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitController {
        &self.controls
    }

    pub fn post(&self) -> &PostSettings {
        &self.post
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn draw_list(&self) -> Vec<DrawItem> {
        self.graph.draw_list()
    }

    /// Accumulated pyramid Y rotation in `[0, 2pi)`.
    pub fn pyramid_spin(&self) -> f64 {
        self.pyramid_spin
    }

    /// Vertical scroll of the floor texture in `[0, 1)`.
    pub fn floor_offset(&self) -> f64 {
        self.floor_offset
    }

    pub(crate) fn scroll_floor(&mut self, delta_seconds: f64) {
        self.floor_offset =
            (self.floor_offset - FLOOR_SCROLL_SPEED * delta_seconds).rem_euclid(1.0);
        let material = &mut self.materials[self.handles.floor_material.0];
        material.uv.offset.y = self.floor_offset as f32;
    }

    /// Repaints the sun every time and the name tag when its content
    /// changed. Returns which surfaces were repainted.
    pub(crate) fn repaint_dynamic(&mut self, elapsed: f64) -> (bool, bool) {
        let elapsed = elapsed as f32;
        let sun = &self.sun;
        self.surfaces[self.handles.sun_surface.0].repaint(|pixmap| sun.paint(pixmap, elapsed));
        let name_repainted = self
            .name_tag
            .update(&mut self.surfaces[self.handles.name_surface.0], elapsed);
        (true, name_repainted)
    }

    pub(crate) fn spin_pyramid(&mut self, elapsed: f64) {
        self.pyramid_spin = (self.pyramid_spin + PYRAMID_SPIN_STEP).rem_euclid(TAU);
        let tilt = (elapsed * 0.3).sin() * 0.05;
        let transform = self.graph.transform_mut(self.handles.pyramid);
        transform.rotation.y = self.pyramid_spin as f32;
        transform.rotation.x = tilt as f32;
    }

    pub(crate) fn update_controls(&mut self) {
        self.controls.update();
    }

    pub(crate) fn controls_mut(&mut self) -> &mut OrbitController {
        &mut self.controls
    }

    pub(crate) fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }

    pub(crate) fn post_mut(&mut self) -> &mut PostSettings {
        &mut self.post
    }

    pub(crate) fn set_glyphs(&mut self, glyphs: GlyphSource) {
        self.name_tag.set_glyphs(glyphs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Topology;
    use crate::material::Blending;

    fn scene() -> AvatarScene {
        assemble(SceneOptions::default()).unwrap()
    }

    #[test]
    fn markers_sit_on_apex_and_corners() {
        let positions = marker_positions();
        assert!((positions[0] - Vec3::Y).length() < 1e-6);
        for corner in &positions[1..] {
            assert!((corner.x.abs() - 1.06).abs() < 0.01);
            assert!((corner.z.abs() - 1.06).abs() < 0.01);
            assert_eq!(corner.y, -1.0);
        }
    }

    #[test]
    fn every_node_hangs_off_the_root() {
        let scene = scene();
        let graph = scene.graph();
        let handles = scene.handles();
        for item in scene.draw_list() {
            let mut current = item.node;
            while let Some(parent) = graph.node(current).parent() {
                current = parent;
            }
            assert_eq!(current, handles.root);
        }
        // body, edges, five markers, floor, sun and name tag
        assert_eq!(scene.draw_list().len(), 10);
    }

    #[test]
    fn pyramid_layers_share_the_scaled_group() {
        let scene = scene();
        let handles = *scene.handles();
        let world = scene.graph().world_matrix(handles.markers[0]);
        let apex = world.transform_point3(Vec3::ZERO);
        assert!((apex - Vec3::new(0.0, 0.5 + 1.3, 0.0)).length() < 1e-5);

        let edges = scene.graph().node(handles.pyramid_edges).drawable.unwrap();
        assert_eq!(scene.geometry(edges.geometry).topology, Topology::Lines);
        let body = scene.graph().node(handles.pyramid_body).drawable.unwrap();
        assert!(scene.material(body.material).polygon_offset.is_some());
    }

    #[test]
    fn billboards_and_floor_are_transparent() {
        let scene = scene();
        let handles = *scene.handles();
        for node in [handles.floor, handles.sun, handles.name_tag] {
            let drawable = scene.graph().node(node).drawable.unwrap();
            assert_eq!(scene.material(drawable.material).blending, Blending::Transparent);
        }
        let name = scene.graph().node(handles.name_tag).drawable.unwrap();
        assert_eq!(scene.material(name.material).opacity, 0.95);
        assert!(scene.material(name.material).billboard);
        assert!(scene.material(handles.floor_material).double_sided);
    }

    #[test]
    fn static_surfaces_are_painted_once_at_assembly() {
        let scene = scene();
        let handles = scene.handles();
        assert_eq!(scene.surface(handles.brick_surface).version(), 1);
        assert_eq!(scene.surface(handles.grid_surface).version(), 1);
        assert_eq!(scene.surface(handles.sun_surface).version(), 0);
        assert_eq!(scene.surface(handles.name_surface).version(), 0);
    }

    #[test]
    fn floor_scroll_wraps_into_unit_range() {
        let mut scene = scene();
        scene.scroll_floor(1.0);
        assert!((scene.floor_offset() - 0.85).abs() < 1e-12);
        scene.scroll_floor(100.0);
        let expected = (-0.15_f64 * 101.0).rem_euclid(1.0);
        assert!((scene.floor_offset() - expected).abs() < 1e-9);
        let material = scene.material(scene.handles().floor_material);
        assert!((material.uv.offset.y as f64 - expected).abs() < 1e-6);
    }
}
