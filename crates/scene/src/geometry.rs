//! Mesh builders for the handful of primitives the scene uses.
//!
//! Layouts (vertex order, UVs, winding) follow the conventional
//! parametric constructions so textures land the same way a typical web
//! engine would place them.

use std::collections::HashMap;
use std::f32::consts::{PI, TAU};

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub(crate) usize);

impl GeometryId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub label: &'static str,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Geometry {
    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::Lines => 0,
        }
    }

    pub fn segment_count(&self) -> usize {
        match self.topology {
            Topology::Lines => self.indices.len() / 2,
            Topology::Triangles => 0,
        }
    }

    fn triangle(&self, index: usize) -> [u32; 3] {
        [
            self.indices[index * 3],
            self.indices[index * 3 + 1],
            self.indices[index * 3 + 2],
        ]
    }
}

/// Base corners of a `segments`-sided cone at half height `-height / 2`.
pub fn cone_corners(radius: f32, height: f32, segments: u32, theta_start: f32) -> Vec<Vec3> {
    (0..segments)
        .map(|index| {
            let theta = theta_start + index as f32 / segments as f32 * TAU;
            Vec3::new(radius * theta.sin(), -height / 2.0, radius * theta.cos())
        })
        .collect()
}

/// Cone with its apex on +Y, centred on the origin. With four segments and
/// `theta_start = PI / 4` the base is an axis-aligned square.
pub fn cone(radius: f32, height: f32, segments: u32, theta_start: f32) -> Geometry {
    let segments = segments.max(3);
    let half = height / 2.0;
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    // slanted side: row 0 is the apex ring, row 1 the base ring
    for row in 0..=1u32 {
        let v = row as f32;
        let ring_radius = v * radius;
        for column in 0..=segments {
            let u = column as f32 / segments as f32;
            let theta = theta_start + u * TAU;
            vertices.push(Vertex::new(
                [
                    ring_radius * theta.sin(),
                    -v * height + half,
                    ring_radius * theta.cos(),
                ],
                [u, 1.0 - v],
            ));
        }
    }
    let stride = segments + 1;
    for column in 0..segments {
        let b = stride + column;
        let c = stride + column + 1;
        let d = column + 1;
        indices.extend_from_slice(&[b, c, d]);
    }

    // base cap
    let centre_start = vertices.len() as u32;
    for _ in 0..segments {
        vertices.push(Vertex::new([0.0, -half, 0.0], [0.5, 0.5]));
    }
    let rim_start = vertices.len() as u32;
    for column in 0..=segments {
        let theta = theta_start + column as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        vertices.push(Vertex::new(
            [radius * sin, -half, radius * cos],
            [cos * 0.5 + 0.5, -sin * 0.5 + 0.5],
        ));
    }
    for column in 0..segments {
        let centre = centre_start + column;
        let rim = rim_start + column;
        indices.extend_from_slice(&[rim + 1, rim, centre]);
    }

    Geometry {
        label: "cone",
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

/// Line segments along the edges of `source` where the adjacent faces meet
/// at more than `threshold_degrees`, plus every edge with a single face.
pub fn edges(source: &Geometry, threshold_degrees: f32) -> Geometry {
    // positions are welded at four decimal places
    fn key(position: Vec3) -> (i64, i64, i64) {
        let scale = 1.0e4;
        (
            (position.x * scale).round() as i64,
            (position.y * scale).round() as i64,
            (position.z * scale).round() as i64,
        )
    }

    struct EdgeRecord {
        start: Vec3,
        end: Vec3,
        normal: Vec3,
        matched: bool,
    }

    let threshold_dot = threshold_degrees.to_radians().cos();
    let mut pending: HashMap<((i64, i64, i64), (i64, i64, i64)), EdgeRecord> = HashMap::new();
    let mut order: Vec<((i64, i64, i64), (i64, i64, i64))> = Vec::new();
    let mut segments: Vec<(Vec3, Vec3)> = Vec::new();

    for triangle in 0..source.triangle_count() {
        let corners = source
            .triangle(triangle)
            .map(|index| source.vertices[index as usize].position());
        let keys = corners.map(key);
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[2] == keys[0] {
            continue;
        }
        let normal = (corners[1] - corners[0])
            .cross(corners[2] - corners[0])
            .normalize_or_zero();

        for side in 0..3 {
            let next = (side + 1) % 3;
            let (a, b) = (keys[side], keys[next]);
            let reverse = (b, a);
            if let Some(record) = pending.get_mut(&reverse) {
                if !record.matched {
                    record.matched = true;
                    if normal.dot(record.normal) <= threshold_dot {
                        segments.push((record.start, record.end));
                    }
                    continue;
                }
            }
            if !pending.contains_key(&(a, b)) {
                order.push((a, b));
                pending.insert(
                    (a, b),
                    EdgeRecord {
                        start: corners[side],
                        end: corners[next],
                        normal,
                        matched: false,
                    },
                );
            }
        }
    }

    for edge in order {
        if let Some(record) = pending.get(&edge) {
            if !record.matched {
                segments.push((record.start, record.end));
            }
        }
    }

    let mut vertices = Vec::with_capacity(segments.len() * 2);
    for (start, end) in segments {
        vertices.push(Vertex::new(start.to_array(), [0.0, 0.0]));
        vertices.push(Vertex::new(end.to_array(), [0.0, 0.0]));
    }
    let indices = (0..vertices.len() as u32).collect();

    Geometry {
        label: "edges",
        vertices,
        indices,
        topology: Topology::Lines,
    }
}

/// UV sphere centred on the origin.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);
    let mut vertices = Vec::new();
    let mut grid: Vec<Vec<u32>> = Vec::new();

    for row in 0..=height_segments {
        let v = row as f32 / height_segments as f32;
        let u_offset = if row == 0 {
            0.5 / width_segments as f32
        } else if row == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };

        let mut indices_row = Vec::with_capacity(width_segments as usize + 1);
        for column in 0..=width_segments {
            let u = column as f32 / width_segments as f32;
            let phi = u * TAU;
            let theta = v * PI;
            indices_row.push(vertices.len() as u32);
            vertices.push(Vertex::new(
                [
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                ],
                [u + u_offset, 1.0 - v],
            ));
        }
        grid.push(indices_row);
    }

    let mut indices = Vec::new();
    for row in 0..height_segments as usize {
        for column in 0..width_segments as usize {
            let a = grid[row][column + 1];
            let b = grid[row][column];
            let c = grid[row + 1][column];
            let d = grid[row + 1][column + 1];
            if row != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if row != height_segments as usize - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Geometry {
        label: "sphere",
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

/// Single quad in the XY plane facing +Z.
pub fn plane(width: f32, height: f32) -> Geometry {
    let (hw, hh) = (width / 2.0, height / 2.0);
    Geometry {
        label: "plane",
        vertices: vec![
            Vertex::new([-hw, hh, 0.0], [0.0, 1.0]),
            Vertex::new([hw, hh, 0.0], [1.0, 1.0]),
            Vertex::new([-hw, -hh, 0.0], [0.0, 0.0]),
            Vertex::new([hw, -hh, 0.0], [1.0, 0.0]),
        ],
        indices: vec![0, 2, 1, 2, 3, 1],
        topology: Topology::Triangles,
    }
}

/// Filled disc in the XY plane facing +Z.
pub fn circle(radius: f32, segments: u32) -> Geometry {
    let segments = segments.max(3);
    let mut vertices = vec![Vertex::new([0.0, 0.0, 0.0], [0.5, 0.5])];
    for step in 0..=segments {
        let theta = step as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        vertices.push(Vertex::new(
            [radius * cos, radius * sin, 0.0],
            [(cos + 1.0) / 2.0, (sin + 1.0) / 2.0],
        ));
    }
    let mut indices = Vec::with_capacity(segments as usize * 3);
    for step in 1..=segments {
        indices.extend_from_slice(&[step, step + 1, 0]);
    }

    Geometry {
        label: "circle",
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

/// Unit quad centred on the origin, used for sprites.
pub fn quad() -> Geometry {
    Geometry {
        label: "quad",
        vertices: vec![
            Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0]),
            Vertex::new([0.5, -0.5, 0.0], [1.0, 0.0]),
            Vertex::new([0.5, 0.5, 0.0], [1.0, 1.0]),
            Vertex::new([-0.5, 0.5, 0.0], [0.0, 1.0]),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
        topology: Topology::Triangles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn pyramid_corners_sit_on_the_diagonals() {
        let corners = cone_corners(1.5, 2.0, 4, FRAC_PI_4);
        assert_eq!(corners.len(), 4);
        for corner in corners {
            assert!((corner.y + 1.0).abs() < 1e-6);
            assert!((corner.x.abs() - 1.0607).abs() < 1e-3, "{corner}");
            assert!((corner.z.abs() - 1.0607).abs() < 1e-3, "{corner}");
            assert!((corner.x * corner.x - 1.5 * 1.5 * 0.5).abs() < 1e-4);
            assert!((corner.z * corner.z - 1.5 * 1.5 * 0.5).abs() < 1e-4);
        }
    }

    #[test]
    fn cone_has_four_sides_and_a_cap() {
        let cone = cone(1.5, 2.0, 4, FRAC_PI_4);
        assert_eq!(cone.triangle_count(), 8);
        let apex = cone.vertices[0].position();
        assert!((apex - Vec3::Y).length() < 1e-6);
        // side faces point outward
        let [a, b, c] = cone.triangle(0).map(|i| cone.vertices[i as usize].position());
        let normal = (b - a).cross(c - a);
        let centre = (a + b + c) / 3.0;
        assert!(normal.dot(Vec3::new(centre.x, 0.0, centre.z)) > 0.0);
    }

    #[test]
    fn pyramid_edges_skip_flat_cap_diagonals() {
        let cone = cone(1.5, 2.0, 4, FRAC_PI_4);
        let edges = edges(&cone, 1.0);
        assert_eq!(edges.topology, Topology::Lines);
        // four slanted edges plus the four base edges
        assert_eq!(edges.segment_count(), 8);
        for vertex in &edges.vertices {
            let p = vertex.position();
            let on_apex = (p - Vec3::Y).length() < 1e-4;
            let on_base = (p.y + 1.0).abs() < 1e-4 && p.x.abs() > 1.0;
            assert!(on_apex || on_base, "unexpected edge vertex {p}");
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = sphere(0.06, 16, 16);
        assert_eq!(sphere.vertices.len(), 17 * 17);
        assert_eq!(sphere.triangle_count(), 16 * 16 * 2 - 32);
        for vertex in &sphere.vertices {
            assert!((vertex.position().length() - 0.06).abs() < 1e-6);
        }
    }

    #[test]
    fn circle_fans_from_the_centre() {
        let disc = circle(4.0, 32);
        assert_eq!(disc.vertices.len(), 34);
        assert_eq!(disc.triangle_count(), 32);
        assert!(disc.vertices[1..]
            .iter()
            .all(|vertex| (vertex.position().length() - 4.0).abs() < 1e-5));
    }

    #[test]
    fn plane_spans_its_size() {
        let plane = plane(100.0, 100.0);
        let xs: Vec<f32> = plane.vertices.iter().map(|v| v.position[0]).collect();
        assert_eq!(xs, vec![-50.0, 50.0, -50.0, 50.0]);
        assert_eq!(plane.triangle_count(), 2);
    }
}
