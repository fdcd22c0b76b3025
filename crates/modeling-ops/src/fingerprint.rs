//! Builds [`TopoSignature`] fingerprints for faces and edges (§3 "persistent
//! naming", §4.7). Fingerprints are computed from the live `EntityStore` and
//! compared with [`crate::types::signature_similarity`] when a forward
//! evolution trace doesn't land on exactly one successor.

use solidtype_kernel::geometry::surfaces::Surface;
use solidtype_kernel::topology::brep::{EdgeId, EntityStore, FaceId};
use solidtype_types::TopoSignature;

fn surface_kind_name(surface: &Surface) -> &'static str {
    match surface {
        Surface::Plane(_) => "plane",
        Surface::Cylinder(_) => "cylinder",
        Surface::Cone(_) => "cone",
        Surface::Sphere(_) => "sphere",
        Surface::Torus(_) => "torus",
        Surface::Nurbs(_) => "nurbs",
    }
}

/// Fingerprint a face: surface kind, centroid, outward normal at the
/// centroid's projection, and the boundary vertex count of the outer loop.
pub fn face_signature(store: &EntityStore, face_id: FaceId) -> TopoSignature {
    let face = &store.faces[face_id];
    let loop_data = &store.loops[face.outer_loop];

    let mut centroid = solidtype_kernel::geometry::vector::Vec3::new(0.0, 0.0, 0.0);
    let mut count = 0usize;
    for &he_id in &loop_data.half_edges {
        let he = &store.half_edges[he_id];
        let p = store.vertices[he.start_vertex].point;
        centroid = centroid + solidtype_kernel::geometry::vector::Vec3::new(p.x, p.y, p.z);
        count += 1;
    }
    let centroid = if count > 0 {
        centroid * (1.0 / count as f64)
    } else {
        centroid
    };
    let centroid_pt = solidtype_kernel::geometry::point::Point3d::new(centroid.x, centroid.y, centroid.z);

    let normal = store.face_normal(face_id, 0.0, 0.0);

    TopoSignature {
        surface_type: Some(surface_kind_name(&face.surface).to_string()),
        area: None,
        centroid: Some([
            crate::types::round_to_grid(centroid_pt.x),
            crate::types::round_to_grid(centroid_pt.y),
            crate::types::round_to_grid(centroid_pt.z),
        ]),
        normal: Some([normal.x, normal.y, normal.z]),
        bbox: None,
        adjacency_hash: Some(loop_vertex_count_hash(count, face.inner_loops.len())),
        length: None,
    }
}

/// Fingerprint an edge: curve kind (approximated by endpoint positions,
/// since `Curve` doesn't expose a stable kind tag the way `Surface` does)
/// plus its two endpoint positions, rounded to the nanometer grid.
pub fn edge_signature(store: &EntityStore, edge_id: EdgeId) -> TopoSignature {
    let edge = &store.edges[edge_id];
    let p0 = store.vertices[edge.start_vertex].point;
    let p1 = store.vertices[edge.end_vertex].point;
    let length = p0.distance_to(&p1);

    let mid = solidtype_kernel::geometry::point::Point3d::new(
        (p0.x + p1.x) / 2.0,
        (p0.y + p1.y) / 2.0,
        (p0.z + p1.z) / 2.0,
    );

    TopoSignature {
        surface_type: None,
        area: None,
        centroid: Some([
            crate::types::round_to_grid(mid.x),
            crate::types::round_to_grid(mid.y),
            crate::types::round_to_grid(mid.z),
        ]),
        normal: None,
        bbox: None,
        adjacency_hash: None,
        length: Some(crate::types::round_to_grid(length)),
    }
}

fn loop_vertex_count_hash(outer_count: usize, inner_loop_count: usize) -> u64 {
    (outer_count as u64) << 8 | (inner_loop_count as u64)
}
