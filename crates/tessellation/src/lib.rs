//! Planar triangulation and mesh export for the kernel's BREP store.
//!
//! Curved surfaces exist in the topology but are not triangulated here;
//! `tessellate_planar_face` only handles `Surface::Plane` faces, matching
//! the kernel's current boolean/modeling scope.

pub mod stl;

use serde::{Deserialize, Serialize};
use solidtype_kernel::geometry::point::Point3d;
use solidtype_kernel::geometry::vector::Vec3;
use solidtype_kernel::topology::brep::*;

/// A triangle mesh for rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions [x, y, z, x, y, z, ...]
    pub positions: Vec<f32>,
    /// Vertex normals [nx, ny, nz, ...]
    pub normals: Vec<f32>,
    /// Triangle indices [i0, i1, i2, ...]
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn add_vertex(&mut self, pos: Point3d, normal: Vec3) -> u32 {
        let idx = self.vertex_count() as u32;
        self.positions.push(pos.x as f32);
        self.positions.push(pos.y as f32);
        self.positions.push(pos.z as f32);
        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);
        idx
    }

    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.vertex_count() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        for &idx in &other.indices {
            self.indices.push(idx + offset);
        }
    }
}

/// Error produced by the ear-clip triangulator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TessellationError {
    #[error("polygon loop self-touches at a shared vertex without crossing, which ear-clipping cannot resolve")]
    SelfTouchingLoop,
}

/// Tessellate a single planar face into triangles using ear-clipping.
///
/// Ear-clipping correctly handles concave polygons, unlike fan triangulation
/// which produces crossing triangles on non-convex shapes (e.g. L-profiles).
/// Inner loops (holes) are bridged into the outer loop before clipping.
pub fn tessellate_planar_face(store: &EntityStore, face_id: FaceId) -> TriangleMesh {
    let face = &store.faces[face_id];
    let mut mesh = TriangleMesh::new();

    let outer: Vec<VertexId> = loop_start_vertices(store, face.outer_loop);
    if outer.len() < 3 {
        return mesh;
    }

    let normal = face.surface.normal_at(0.0, 0.0);
    let face_normal = if face.same_sense { normal } else { -normal };

    let holes: Vec<Vec<VertexId>> = face
        .inner_loops
        .iter()
        .map(|&lid| loop_start_vertices(store, lid))
        .filter(|h| h.len() >= 3)
        .collect();

    let ordered = bridge_holes(store, &outer, &holes, &face_normal);

    let vertices: Vec<Point3d> = ordered.iter().map(|&v| store.vertices[v].point).collect();
    let base_idx: Vec<u32> = vertices.iter().map(|p| mesh.add_vertex(*p, face_normal)).collect();

    let projected = project_to_2d(&vertices, &face_normal);
    let triangles = ear_clip(&projected);
    for (a, b, c) in triangles {
        mesh.add_triangle(base_idx[a], base_idx[b], base_idx[c]);
    }

    mesh
}

fn loop_start_vertices(store: &EntityStore, loop_id: LoopId) -> Vec<VertexId> {
    store.loops[loop_id]
        .half_edges
        .iter()
        .map(|&he_id| store.half_edges[he_id].start_vertex)
        .collect()
}

/// Bridge hole loops into the outer loop via a zero-width cut, producing a
/// single simple polygon ear-clipping can consume directly. Each hole is
/// connected at its vertex nearest to the outer loop's first vertex.
fn bridge_holes(
    store: &EntityStore,
    outer: &[VertexId],
    holes: &[Vec<VertexId>],
    _normal: &Vec3,
) -> Vec<VertexId> {
    if holes.is_empty() {
        return outer.to_vec();
    }

    let mut result = outer.to_vec();
    for hole in holes {
        let anchor = result[0];
        let anchor_pt = store.vertices[anchor].point;
        let (bridge_idx, _) = hole
            .iter()
            .enumerate()
            .map(|(i, &v)| (i, store.vertices[v].point.distance_to(&anchor_pt)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap();

        let mut rotated: Vec<VertexId> = hole[bridge_idx..].to_vec();
        rotated.extend_from_slice(&hole[..bridge_idx]);

        let mut bridged = vec![anchor];
        bridged.extend(rotated.iter().copied());
        bridged.push(rotated[0]);
        bridged.push(anchor);

        let mut rebuilt = vec![result[0]];
        rebuilt.extend(bridged);
        rebuilt.extend_from_slice(&result[1..]);
        result = rebuilt;
    }
    result
}

/// Project 3D polygon vertices onto a 2D plane defined by the face normal.
fn project_to_2d(vertices: &[Point3d], normal: &Vec3) -> Vec<(f64, f64)> {
    let u_axis = if normal.x.abs() < 0.9 {
        Vec3::new(1.0, 0.0, 0.0).cross(normal).normalize()
    } else {
        Vec3::new(0.0, 1.0, 0.0).cross(normal).normalize()
    };
    let v_axis = normal.cross(&u_axis);

    vertices
        .iter()
        .map(|p| {
            let v = Vec3::new(p.x, p.y, p.z);
            (v.dot(&u_axis), v.dot(&v_axis))
        })
        .collect()
}

/// Ear-clipping triangulation for a simple polygon (may be concave).
///
/// Returns triangle indices into the original vertex list.
fn ear_clip(polygon: &[(f64, f64)]) -> Vec<(usize, usize, usize)> {
    let n = polygon.len();
    if n < 3 {
        return vec![];
    }
    if n == 3 {
        return vec![(0, 1, 2)];
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut result = Vec::new();

    let signed_area: f64 = indices
        .windows(2)
        .map(|w| {
            let (x0, y0) = polygon[w[0]];
            let (x1, y1) = polygon[w[1]];
            (x1 - x0) * (y1 + y0)
        })
        .sum::<f64>()
        + {
            let (x0, y0) = polygon[*indices.last().unwrap()];
            let (x1, y1) = polygon[indices[0]];
            (x1 - x0) * (y1 + y0)
        };
    let ccw = signed_area < 0.0;

    let mut iterations = 0;
    let max_iterations = n * n;

    while indices.len() > 3 && iterations < max_iterations {
        iterations += 1;
        let len = indices.len();
        let mut found_ear = false;

        for i in 0..len {
            let prev = indices[(i + len - 1) % len];
            let curr = indices[i];
            let next = indices[(i + 1) % len];

            if !is_ear(polygon, &indices, prev, curr, next, ccw) {
                continue;
            }

            result.push((prev, curr, next));
            indices.remove(i);
            found_ear = true;
            break;
        }

        if !found_ear {
            for i in 1..(indices.len() - 1) {
                result.push((indices[0], indices[i], indices[i + 1]));
            }
            break;
        }
    }

    if indices.len() == 3 {
        result.push((indices[0], indices[1], indices[2]));
    }

    result
}

fn is_ear(
    polygon: &[(f64, f64)],
    indices: &[usize],
    prev: usize,
    curr: usize,
    next: usize,
    ccw: bool,
) -> bool {
    let (ax, ay) = polygon[prev];
    let (bx, by) = polygon[curr];
    let (cx, cy) = polygon[next];

    let cross = (bx - ax) * (cy - ay) - (by - ay) * (cx - ax);
    if ccw && cross <= 0.0 {
        return false;
    }
    if !ccw && cross >= 0.0 {
        return false;
    }

    for &idx in indices {
        if idx == prev || idx == curr || idx == next {
            continue;
        }
        if point_in_triangle(polygon[idx], (ax, ay), (bx, by), (cx, cy)) {
            return false;
        }
    }

    true
}

fn point_in_triangle(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let (px, py) = p;
    let d1 = sign(px, py, a.0, a.1, b.0, b.1);
    let d2 = sign(px, py, b.0, b.1, c.0, c.1);
    let d3 = sign(px, py, c.0, c.1, a.0, a.1);

    let has_neg = (d1 < 0.0) || (d2 < 0.0) || (d3 < 0.0);
    let has_pos = (d1 > 0.0) || (d2 > 0.0) || (d3 > 0.0);

    !(has_neg && has_pos)
}

fn sign(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (px - x2) * (y1 - y2) - (x1 - x2) * (py - y2)
}

/// Tessellate an entire solid into a triangle mesh.
pub fn tessellate_solid(store: &EntityStore, solid_id: SolidId) -> TriangleMesh {
    let solid = &store.solids[solid_id];
    let mut mesh = TriangleMesh::new();

    for &shell_id in &solid.shells {
        let shell = &store.shells[shell_id];
        for &face_id in &shell.faces {
            let face_mesh = tessellate_planar_face(store, face_id);
            mesh.merge(&face_mesh);
        }
    }

    mesh
}

/// Tessellate a parametric surface by sampling on a UV grid.
pub fn tessellate_surface_grid(
    surface: &solidtype_kernel::geometry::surfaces::Surface,
    u_range: (f64, f64),
    v_range: (f64, f64),
    u_divisions: usize,
    v_divisions: usize,
) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    let mut indices_grid = vec![vec![0u32; v_divisions + 1]; u_divisions + 1];

    for i in 0..=u_divisions {
        for j in 0..=v_divisions {
            let u = u_range.0 + (u_range.1 - u_range.0) * (i as f64 / u_divisions as f64);
            let v = v_range.0 + (v_range.1 - v_range.0) * (j as f64 / v_divisions as f64);

            let pos = surface.evaluate(u, v);
            let normal = surface.normal_at(u, v);
            indices_grid[i][j] = mesh.add_vertex(pos, normal);
        }
    }

    for i in 0..u_divisions {
        for j in 0..v_divisions {
            let i00 = indices_grid[i][j];
            let i10 = indices_grid[i + 1][j];
            let i01 = indices_grid[i][j + 1];
            let i11 = indices_grid[i + 1][j + 1];

            mesh.add_triangle(i00, i10, i11);
            mesh.add_triangle(i00, i11, i01);
        }
    }

    mesh
}
