//! Twin-stitching pass shared by the primitive constructors, extrude, and
//! revolve: each of those builds faces independently (one boundary
//! half-edge per profile edge per face), so every boundary edge starts out
//! as its own unlinked `Edge` with a self-referential twin. This pass groups
//! half-edges by their undirected vertex-pair key and pairs up every group
//! of exactly two into true twins sharing one `Edge`, as required by the
//! "every edge has exactly two half-edges" invariant.

use std::collections::HashMap;

use super::brep::*;

/// Outcome of a stitching pass over a shell.
#[derive(Debug, Clone, Default)]
pub struct StitchReport {
    /// Number of half-edge pairs successfully linked as twins.
    pub paired: usize,
    /// Half-edges whose vertex-pair key did not have exactly one partner
    /// (boundary edges or non-manifold groups) — diagnostic only.
    pub unpaired: Vec<HalfEdgeId>,
}

fn vertex_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    use slotmap::Key;
    if a.data().as_ffi() <= b.data().as_ffi() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Stitch twins for every face currently in `shell_id`. Safe to call after
/// constructing all the faces of a primitive/extrude/revolve solid: each
/// half-edge still pointing at its own self-twinned edge is matched against
/// the other half-edge sharing its endpoints (which must traverse the edge
/// in the opposite direction); the two are merged onto a single `Edge` and
/// linked as twins. Groups that don't resolve to exactly two half-edges are
/// left untouched and reported as `unpaired` (a genuine boundary, or a bug
/// in the caller's face construction).
pub fn stitch_twins(store: &mut EntityStore, shell_id: ShellId) -> StitchReport {
    let mut groups: HashMap<(VertexId, VertexId), Vec<HalfEdgeId>> = HashMap::new();

    let face_ids: Vec<FaceId> = store.shells[shell_id].faces.clone();
    for face_id in face_ids {
        let face = &store.faces[face_id];
        let mut loop_ids = vec![face.outer_loop];
        loop_ids.extend(face.inner_loops.iter().copied());
        for loop_id in loop_ids {
            let he_ids = store.loops[loop_id].half_edges.clone();
            for he_id in he_ids {
                let he = store.half_edges[he_id];
                groups
                    .entry(vertex_key(he.start_vertex, he.end_vertex))
                    .or_default()
                    .push(he_id);
            }
        }
    }

    let mut report = StitchReport::default();

    for (_key, members) in groups {
        if members.len() != 2 {
            report.unpaired.extend(members);
            continue;
        }
        let (a, b) = (members[0], members[1]);
        if store.half_edges[a].start_vertex == store.half_edges[b].start_vertex {
            // Both half-edges run the same direction: not a valid twin pair
            // (this happens only for degenerate/duplicate geometry).
            report.unpaired.push(a);
            report.unpaired.push(b);
            continue;
        }

        let edge_a = store.half_edges[a].edge;
        let edge_b = store.half_edges[b].edge;

        // Keep edge_a, retarget b's half-edge onto it, drop edge_b.
        store.half_edges[a].twin = b;
        store.half_edges[b].twin = a;
        store.half_edges[b].edge = edge_a;
        store.edges[edge_a].half_edges = (a, b);
        if edge_a != edge_b {
            store.edges.remove(edge_b);
        }
        report.paired += 1;
    }

    report
}
