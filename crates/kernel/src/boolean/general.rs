//! General planar boolean pipeline: face-pair candidate selection,
//! face-face intersection with UV clipping, per-face segment collection,
//! DCEL arrangement, stabbing-ray piece classification, per-operation piece
//! selection, and stitching.
//!
//! The axis-aligned-box fast path in `engine.rs` is an optimization that
//! runs before this; this module is the fallback for any pair of
//! planar-only solids, including non-axis-aligned ones.

use std::collections::HashMap;

use slotmap::Key;

use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Plane, Surface};
use crate::geometry::transform::BoundingBox;
use crate::numerics::{snap_point3, GridPoint3};
use crate::topology::brep::*;
use crate::Tolerance;

use super::classify::{classify_point, PointClassification};
use super::dcel::{build_arrangement, SourceBody, TaggedSegment};
use super::engine::{BoolOp, BooleanFailure};

struct Piece {
    body: SourceBody,
    plane: Plane,
    polygon: Vec<(f64, f64)>,
}

/// Run the general planar boolean pipeline. Returns `IntersectionFailed` if
/// either solid has a non-planar face — curved-surface boolean support is a
/// documented extension hook, not implemented here.
pub fn planar_boolean_general(
    store: &mut EntityStore,
    solid_a: SolidId,
    solid_b: SolidId,
    op: BoolOp,
    tol: &Tolerance,
) -> Result<SolidId, BooleanFailure> {
    if !all_faces_planar(store, solid_a) || !all_faces_planar(store, solid_b) {
        return Err(BooleanFailure::IntersectionFailed {
            reason: "general planar boolean pipeline requires all-planar faces on both solids"
                .to_string(),
        });
    }

    let faces_a = collect_faces(store, solid_a);
    let faces_b = collect_faces(store, solid_b);

    // Per-face segment collection, seeded with each face's own boundary.
    let mut seg_a: HashMap<FaceId, Vec<TaggedSegment>> = faces_a
        .iter()
        .map(|&f| (f, boundary_segments(store, f, SourceBody::A)))
        .collect();
    let mut seg_b: HashMap<FaceId, Vec<TaggedSegment>> = faces_b
        .iter()
        .map(|&f| (f, boundary_segments(store, f, SourceBody::B)))
        .collect();

    // Step 1: face-pair candidate selection via AABB overlap.
    for &fa in &faces_a {
        let bb_a = face_bounding_box(store, fa);
        for &fb in &faces_b {
            let bb_b = face_bounding_box(store, fb);
            if !bb_a.intersects(&bb_b) {
                continue;
            }
            // Step 2: face-face intersection + UV clipping.
            if let Some((world_p0, world_p1)) = face_face_intersection(store, fa, fb, tol) {
                let plane_a = plane_of(store, fa);
                let plane_b = plane_of(store, fb);
                let ua0 = plane_a.parameters_of(&world_p0);
                let ua1 = plane_a.parameters_of(&world_p1);
                let ub0 = plane_b.parameters_of(&world_p0);
                let ub1 = plane_b.parameters_of(&world_p1);
                seg_a
                    .get_mut(&fa)
                    .unwrap()
                    .push(TaggedSegment::intersection(ua0, ua1, SourceBody::A));
                seg_b
                    .get_mut(&fb)
                    .unwrap()
                    .push(TaggedSegment::intersection(ub0, ub1, SourceBody::B));
            }
        }
    }

    // Step 4: DCEL build per face.
    let mut pieces: Vec<Piece> = Vec::new();
    for (&face_id, segs) in &seg_a {
        let plane = plane_of(store, face_id);
        for arr in build_arrangement(segs, tol) {
            pieces.push(Piece {
                body: SourceBody::A,
                plane,
                polygon: arr.vertices,
            });
        }
    }
    for (&face_id, segs) in &seg_b {
        let plane = plane_of(store, face_id);
        for arr in build_arrangement(segs, tol) {
            pieces.push(Piece {
                body: SourceBody::B,
                plane,
                polygon: arr.vertices,
            });
        }
    }

    if pieces.is_empty() {
        return Err(BooleanFailure::DegenerateResult);
    }

    // Step 5: piece classification.
    let keep_on_same_from_a = solid_key(solid_a) <= solid_key(solid_b);
    let mut kept: Vec<&Piece> = Vec::new();
    for piece in &pieces {
        let centroid_uv = polygon_centroid(&piece.polygon);
        let centroid_world = piece.plane.evaluate(centroid_uv.0, centroid_uv.1);
        let other = match piece.body {
            SourceBody::A => solid_b,
            SourceBody::B => solid_a,
        };
        let class = classify_with_retry(store, other, &piece.plane, centroid_uv, tol);

        let keep = match (op, piece.body, class) {
            (BoolOp::Union, _, PointClassification::Outside) => true,
            (BoolOp::Union, SourceBody::A, PointClassification::OnBoundary) => keep_on_same_from_a,
            (BoolOp::Union, SourceBody::B, PointClassification::OnBoundary) => !keep_on_same_from_a,
            (BoolOp::Union, _, PointClassification::Inside) => false,

            (BoolOp::Intersection, _, PointClassification::Inside) => true,
            (BoolOp::Intersection, SourceBody::A, PointClassification::OnBoundary) => keep_on_same_from_a,
            (BoolOp::Intersection, SourceBody::B, PointClassification::OnBoundary) => !keep_on_same_from_a,
            (BoolOp::Intersection, _, PointClassification::Outside) => false,

            (BoolOp::Difference, SourceBody::A, PointClassification::Outside) => true,
            (BoolOp::Difference, SourceBody::A, PointClassification::OnBoundary) => keep_on_same_from_a,
            (BoolOp::Difference, SourceBody::A, PointClassification::Inside) => false,
            (BoolOp::Difference, SourceBody::B, PointClassification::Inside) => true,
            (BoolOp::Difference, SourceBody::B, PointClassification::OnBoundary) => !keep_on_same_from_a,
            (BoolOp::Difference, SourceBody::B, PointClassification::Outside) => false,
        };
        if keep {
            kept.push(piece);
        }
    }

    if kept.is_empty() {
        return Err(BooleanFailure::DegenerateResult);
    }

    // Step 7: stitch. A global vertex table keyed by nanometer-grid point
    // guarantees that the shared intersection edge emitted by face A's
    // arrangement and face B's arrangement reference the same VertexId, so
    // `stitch_twins` below pairs them automatically.
    let result_solid = store.solids.insert(Solid { shells: vec![] });
    let shell_id = store.shells.insert(Shell {
        faces: vec![],
        orientation: ShellOrientation::Outward,
        solid: result_solid,
    });
    store.solids[result_solid].shells.push(shell_id);

    let mut vertex_table: HashMap<GridPoint3, VertexId> = HashMap::new();
    let flip_b = matches!(op, BoolOp::Difference);

    for piece in &kept {
        let flip = flip_b && piece.body == SourceBody::B;
        build_piece_face(store, shell_id, piece, &mut vertex_table, flip);
    }

    crate::topology::stitch::stitch_twins(store, shell_id);

    // Step 8: heal & validate.
    let report = crate::validation::BRepValidator::new(crate::validation::ValidationConfig::default())
        .validate(store, result_solid);
    if !report.errors.is_empty() {
        return Err(BooleanFailure::TopologyCorrupted {
            audit: audit_solid(store, result_solid),
        });
    }

    Ok(result_solid)
}

fn solid_key(id: SolidId) -> u64 {
    id.data().as_ffi()
}

/// Re-run classification with a small offset along the piece's plane if the
/// sample point lands ambiguously on a boundary, up to 3 retries, offsetting
/// further each time.
fn classify_with_retry(
    store: &EntityStore,
    other: SolidId,
    plane: &Plane,
    centroid_uv: (f64, f64),
    tol: &Tolerance,
) -> PointClassification {
    let point = plane.evaluate(centroid_uv.0, centroid_uv.1);
    let class = classify_point(store, other, &point, tol.coincidence);
    if class != PointClassification::OnBoundary {
        return class;
    }
    for attempt in 1..=3 {
        let nudge = tol.coincidence * 10.0 * attempt as f64;
        let nudged_uv = (centroid_uv.0 + nudge, centroid_uv.1 + nudge * 0.5);
        let nudged_point = plane.evaluate(nudged_uv.0, nudged_uv.1);
        let retry = classify_point(store, other, &nudged_point, tol.coincidence);
        if retry != PointClassification::OnBoundary {
            return retry;
        }
    }
    PointClassification::OnBoundary
}

fn all_faces_planar(store: &EntityStore, solid_id: SolidId) -> bool {
    collect_faces(store, solid_id)
        .iter()
        .all(|&f| matches!(store.faces[f].surface, Surface::Plane(_)))
}

fn collect_faces(store: &EntityStore, solid_id: SolidId) -> Vec<FaceId> {
    let mut faces = Vec::new();
    for &shell_id in &store.solids[solid_id].shells {
        faces.extend(store.shells[shell_id].faces.iter());
    }
    faces
}

fn plane_of(store: &EntityStore, face_id: FaceId) -> Plane {
    match &store.faces[face_id].surface {
        Surface::Plane(p) => *p,
        _ => unreachable!("all_faces_planar checked before calling plane_of"),
    }
}

fn face_bounding_box(store: &EntityStore, face_id: FaceId) -> BoundingBox {
    let face = &store.faces[face_id];
    let pts: Vec<Point3d> = store.loops[face.outer_loop]
        .half_edges
        .iter()
        .map(|&he| store.vertices[store.half_edges[he].start_vertex].point)
        .collect();
    BoundingBox::from_points(&pts)
}

/// The face's own boundary, in its own UV space, tagged as non-intersection.
fn boundary_segments(store: &EntityStore, face_id: FaceId, body: SourceBody) -> Vec<TaggedSegment> {
    let face = &store.faces[face_id];
    let plane = plane_of(store, face_id);
    let verts: Vec<(f64, f64)> = store.loops[face.outer_loop]
        .half_edges
        .iter()
        .map(|&he| {
            let p = store.vertices[store.half_edges[he].start_vertex].point;
            plane.parameters_of(&p)
        })
        .collect();
    let n = verts.len();
    (0..n)
        .map(|i| TaggedSegment::boundary(verts[i], verts[(i + 1) % n], body))
        .collect()
}

/// Plane-plane intersection clipped to both faces' polygons: compute the
/// infinite intersection line, clip it against each face's 2D boundary
/// separately, then intersect the two resulting parameter intervals.
/// Returns `None` when the planes are parallel, or the clipped intervals
/// don't overlap.
fn face_face_intersection(
    store: &EntityStore,
    face_a: FaceId,
    face_b: FaceId,
    tol: &Tolerance,
) -> Option<(Point3d, Point3d)> {
    let plane_a = plane_of(store, face_a);
    let plane_b = plane_of(store, face_b);
    let line = crate::numerics::plane_plane_intersection(&plane_a, &plane_b, tol.angular)?;

    let range_a = clip_line_to_face(store, face_a, &plane_a, &line, tol)?;
    let range_b = clip_line_to_face(store, face_b, &plane_b, &line, tol)?;

    let t0 = range_a.0.max(range_b.0);
    let t1 = range_a.1.min(range_b.1);
    if t1 - t0 < tol.coincidence {
        return None;
    }

    let p0 = snap_point3_to_point(line.evaluate(t0));
    let p1 = snap_point3_to_point(line.evaluate(t1));
    if p0.distance_to(&p1) < tol.coincidence {
        return None;
    }
    Some((p0, p1))
}

fn snap_point3_to_point(p: Point3d) -> Point3d {
    crate::numerics::unsnap_point3(&snap_point3(&p))
}

/// Clip an infinite 3D line (assumed to lie in `face`'s plane) against the
/// face's outer-loop polygon, returning the `[t0, t1]` range of the line
/// parameter that lies inside the polygon. Handles simply-connected
/// (possibly non-convex, single-run) polygons: every boundary crossing is
/// found, then the runs between consecutive crossings are kept if their
/// midpoint is inside the polygon.
fn clip_line_to_face(
    store: &EntityStore,
    face_id: FaceId,
    plane: &Plane,
    line: &crate::geometry::curves::Line3d,
    tol: &Tolerance,
) -> Option<(f64, f64)> {
    let face = &store.faces[face_id];
    let poly: Vec<(f64, f64)> = store.loops[face.outer_loop]
        .half_edges
        .iter()
        .map(|&he| {
            let p = store.vertices[store.half_edges[he].start_vertex].point;
            plane.parameters_of(&p)
        })
        .collect();
    let n = poly.len();
    if n < 3 {
        return None;
    }

    let p0_uv = plane.parameters_of(&line.origin);
    let p1_uv = plane.parameters_of(&line.evaluate(1.0));
    let dir_uv = (p1_uv.0 - p0_uv.0, p1_uv.1 - p0_uv.1);

    let mut ts: Vec<f64> = Vec::new();
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        if let Some(t) = line_edge_param(p0_uv, dir_uv, a, b, tol) {
            ts.push(t);
        }
    }
    if ts.is_empty() {
        return None;
    }
    ts.sort_by(|x, y| x.partial_cmp(y).unwrap());

    let mut best: Option<(f64, f64)> = None;
    for w in ts.windows(2) {
        let (t0, t1) = (w[0], w[1]);
        let mid = t0 + (t1 - t0) * 0.5;
        let mp = (p0_uv.0 + mid * dir_uv.0, p0_uv.1 + mid * dir_uv.1);
        if point_in_polygon(mp, &poly) {
            best = match best {
                None => Some((t0, t1)),
                Some((b0, b1)) => Some((b0.min(t0), b1.max(t1))),
            };
        }
    }
    best
}

/// Parametrize where the infinite line `p0 + t*dir` crosses segment `[a,b]`.
fn line_edge_param(
    p0: (f64, f64),
    dir: (f64, f64),
    a: (f64, f64),
    b: (f64, f64),
    tol: &Tolerance,
) -> Option<f64> {
    let seg_dir = (b.0 - a.0, b.1 - a.1);
    let denom = dir.0 * seg_dir.1 - dir.1 * seg_dir.0;
    if denom.abs() < tol.angular {
        return None;
    }
    let w = (a.0 - p0.0, a.1 - p0.1);
    let s = (w.0 * dir.1 - w.1 * dir.0) / denom; // param on segment [a,b]
    if !(-1e-9..=1.0 + 1e-9).contains(&s) {
        return None;
    }
    let t = (w.0 * seg_dir.1 - w.1 * seg_dir.0) / denom; // param on line
    Some(t)
}

fn point_in_polygon(p: (f64, f64), poly: &[(f64, f64)]) -> bool {
    let n = poly.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = poly[i];
        let (xj, yj) = poly[j];
        if ((yi > p.1) != (yj > p.1)) && (p.0 < (xj - xi) * (p.1 - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn polygon_centroid(poly: &[(f64, f64)]) -> (f64, f64) {
    let n = poly.len() as f64;
    let sx: f64 = poly.iter().map(|p| p.0).sum();
    let sy: f64 = poly.iter().map(|p| p.1).sum();
    (sx / n, sy / n)
}

/// Materialize one kept DCEL piece as a new planar face in `store`, sharing
/// vertices with any other piece whose 3D point snaps to the same
/// nanometer-grid cell (this is what lets `stitch_twins` find the twin half
/// of a shared intersection edge).
fn build_piece_face(
    store: &mut EntityStore,
    shell_id: ShellId,
    piece: &Piece,
    vertex_table: &mut HashMap<GridPoint3, VertexId>,
    flip_winding: bool,
) {
    let mut polygon = piece.polygon.clone();
    if flip_winding {
        polygon.reverse();
    }

    let world_pts: Vec<Point3d> = polygon
        .iter()
        .map(|&(u, v)| piece.plane.evaluate(u, v))
        .collect();

    let vertex_ids: Vec<VertexId> = world_pts
        .iter()
        .map(|p| {
            let grid = snap_point3(p);
            *vertex_table.entry(grid).or_insert_with(|| {
                store.vertices.insert(Vertex {
                    point: crate::numerics::unsnap_point3(&grid),
                    tolerance: 1e-7,
                })
            })
        })
        .collect();

    let loop_id = store.loops.insert(Loop {
        half_edges: vec![],
        face: FaceId::default(),
    });
    let face_id = store.faces.insert(Face {
        surface: Surface::Plane(piece.plane),
        outer_loop: loop_id,
        inner_loops: vec![],
        same_sense: true,
        shell: shell_id,
    });
    store.loops[loop_id].face = face_id;
    store.shells[shell_id].faces.push(face_id);

    let n = vertex_ids.len();
    let mut he_ids = Vec::with_capacity(n);
    for i in 0..n {
        let start = vertex_ids[i];
        let end = vertex_ids[(i + 1) % n];
        let p_start = store.vertices[start].point;
        let p_end = store.vertices[end].point;
        let line = crate::geometry::curves::Line3d::from_points(p_start, p_end);
        let dist = p_start.distance_to(&p_end);

        let he_id = store.half_edges.insert_with_key(|_| HalfEdge {
            edge: EdgeId::default(),
            twin: HalfEdgeId::default(),
            face: face_id,
            loop_id,
            start_vertex: start,
            end_vertex: end,
            t_start: 0.0,
            t_end: dist,
            forward: true,
        });
        let edge_id = store.edges.insert(Edge {
            curve: crate::geometry::curves::Curve::Line(line),
            half_edges: (he_id, he_id),
            start_vertex: start,
            end_vertex: end,
        });
        store.half_edges[he_id].edge = edge_id;
        he_ids.push(he_id);
    }
    store.loops[loop_id].half_edges = he_ids;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::make_box;

    /// Exercises the general pipeline directly (bypassing the AABB fast
    /// path in `engine.rs`) on a pair of overlapping boxes, so the DCEL
    /// arrangement, classification, and stitching steps are validated even
    /// though the input shapes happen to be axis-aligned.
    #[test]
    fn general_union_of_overlapping_boxes_has_plausible_volume() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 2.0, 2.0, 2.0);
        let b = make_box(&mut store, 1.0, 1.0, 1.0, 3.0, 3.0, 3.0);
        let tol = Tolerance::default();
        let result = planar_boolean_general(&mut store, a, b, BoolOp::Union, &tol)
            .expect("general union should succeed for overlapping boxes");
        let volume = super::super::engine::estimate_volume(&store, result, 20_000);
        // Each box has volume 8, overlap cube is 1x1x1=1, so union is 15.
        assert!((volume - 15.0).abs() < 2.0, "union volume {volume} not near 15.0");
    }

    #[test]
    fn general_intersection_of_overlapping_boxes_has_plausible_volume() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 2.0, 2.0, 2.0);
        let b = make_box(&mut store, 1.0, 1.0, 1.0, 3.0, 3.0, 3.0);
        let tol = Tolerance::default();
        let result = planar_boolean_general(&mut store, a, b, BoolOp::Intersection, &tol)
            .expect("general intersection should succeed for overlapping boxes");
        let volume = super::super::engine::estimate_volume(&store, result, 20_000);
        assert!((volume - 1.0).abs() < 0.5, "intersection volume {volume} not near 1.0");
    }

    #[test]
    fn general_difference_of_overlapping_boxes_has_plausible_volume() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 2.0, 2.0, 2.0);
        let b = make_box(&mut store, 1.0, 1.0, 1.0, 3.0, 3.0, 3.0);
        let tol = Tolerance::default();
        let result = planar_boolean_general(&mut store, a, b, BoolOp::Difference, &tol)
            .expect("general difference should succeed for overlapping boxes");
        let volume = super::super::engine::estimate_volume(&store, result, 20_000);
        assert!((volume - 7.0).abs() < 1.0, "difference volume {volume} not near 7.0");
    }
}
