//! Planar arrangement builder used by the general boolean pipeline. Builds
//! a doubly-connected edge list from a multiset of 2D segments on one
//! face's surface and re-extracts the bounded faces it divides the plane
//! into.
//!
//! The source segments are tagged with which body they came from and
//! whether they are an intersection segment or an original boundary
//! segment; `build_arrangement` only needs their endpoints to build the
//! subdivision, but callers keep the tag around on the input so pieces can
//! be traced back to their origin after extraction.

use std::collections::HashMap;

use crate::numerics::{snap_point2, GridPoint2};
use crate::Tolerance;

/// Which solid a segment originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceBody {
    A,
    B,
}

/// A 2D segment in a face's UV space, tagged with origin and whether it
/// came from a face-face intersection or the face's own boundary.
#[derive(Debug, Clone)]
pub struct TaggedSegment {
    pub a: (f64, f64),
    pub b: (f64, f64),
    pub source_body: SourceBody,
    pub is_intersection: bool,
}

impl TaggedSegment {
    pub fn boundary(a: (f64, f64), b: (f64, f64), source_body: SourceBody) -> Self {
        Self {
            a,
            b,
            source_body,
            is_intersection: false,
        }
    }

    pub fn intersection(a: (f64, f64), b: (f64, f64), source_body: SourceBody) -> Self {
        Self {
            a,
            b,
            source_body,
            is_intersection: true,
        }
    }
}

/// A bounded face recovered from the arrangement: its vertex loop (in
/// traversal order) and the signed area that decided it was bounded.
#[derive(Debug, Clone)]
pub struct ArrangementFace {
    pub vertices: Vec<(f64, f64)>,
    pub signed_area: f64,
}

struct HalfEdgeRec {
    origin: usize,
    twin: usize,
    next: Option<usize>,
    visited: bool,
}

/// Build the planar subdivision of a single face's UV plane given its
/// boundary + intersection segments, and return the bounded (positive
/// signed-area) faces.
///
/// Pipeline: split-at-intersections, snap+dedup onto the nanometer grid
/// (a hash-map lookup in place of a union-find merge — the grid snap
/// already makes coincident endpoints bit-identical, so the merge is just a
/// lookup), half-edge construction, angular sort, turn-left next/prev, and
/// shoelace-signed-area face extraction.
pub fn build_arrangement(segments: &[TaggedSegment], tol: &Tolerance) -> Vec<ArrangementFace> {
    if segments.len() < 3 {
        return Vec::new();
    }

    let split = split_at_intersections(segments, tol);
    let dedup = snap_and_dedup(&split, tol);
    if dedup.len() < 3 {
        return Vec::new();
    }

    let (vertices, vertex_index) = build_vertex_table(&dedup);
    let mut half_edges = build_half_edges(&dedup, &vertex_index);
    link_next_via_turn_left(&vertices, &mut half_edges);
    extract_bounded_faces(&vertices, &half_edges)
}

/// Split every segment at its intersections with every other segment,
/// producing a set of non-crossing sub-segments.
fn split_at_intersections(segments: &[TaggedSegment], tol: &Tolerance) -> Vec<(f64, f64, (f64, f64))> {
    let mut splits: Vec<Vec<f64>> = segments.iter().map(|_| vec![0.0, 1.0]).collect();

    for i in 0..segments.len() {
        for j in 0..segments.len() {
            if i == j {
                continue;
            }
            let si = &segments[i];
            let sj = &segments[j];
            if let Some(hit) = crate::numerics::segment2d_intersect(si.a, si.b, sj.a, sj.b, tol.coincidence) {
                let candidates: Vec<GridPoint2> = match hit {
                    crate::numerics::SegmentIntersection::Point(g) => vec![g],
                    crate::numerics::SegmentIntersection::Overlap(g0, g1) => vec![g0, g1],
                };
                for g in candidates {
                    if let Some(t) = param_of_point_on_segment(si.a, si.b, g) {
                        if t > 1e-9 && t < 1.0 - 1e-9 {
                            splits[i].push(t);
                        }
                    }
                }
            }
        }
    }

    let mut result = Vec::new();
    for (i, seg) in segments.iter().enumerate() {
        let mut ts = splits[i].clone();
        ts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        ts.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        for w in ts.windows(2) {
            let p0 = lerp2(seg.a, seg.b, w[0]);
            let p1 = lerp2(seg.a, seg.b, w[1]);
            result.push((p0.0, p0.1, p1));
        }
    }
    result
}

fn lerp2(a: (f64, f64), b: (f64, f64), t: f64) -> (f64, f64) {
    (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
}

/// Recover the parameter `t` of a grid-snapped point along a segment,
/// assuming the point was produced by `segment2d_intersect` on that segment.
fn param_of_point_on_segment(a: (f64, f64), b: (f64, f64), g: GridPoint2) -> Option<f64> {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let len2 = dx * dx + dy * dy;
    if len2 < 1e-20 {
        return None;
    }
    let (px, py) = crate::numerics::unsnap_point2(&g);
    let t = ((px - a.0) * dx + (py - a.1) * dy) / len2;
    Some(t)
}

/// Snap sub-segment endpoints to the grid, drop near-zero-length pieces,
/// and remove direction-independent duplicates.
fn snap_and_dedup(
    subsegments: &[(f64, f64, (f64, f64))],
    tol: &Tolerance,
) -> Vec<(GridPoint2, GridPoint2)> {
    let min_len = 2.0 * tol.coincidence;
    let mut seen: HashMap<(GridPoint2, GridPoint2), ()> = HashMap::new();
    let mut out = Vec::new();

    for &(ax, ay, b) in subsegments {
        let ga = snap_point2(ax, ay);
        let gb = snap_point2(b.0, b.1);
        if ga == gb {
            continue;
        }
        let (pa_x, pa_y) = crate::numerics::unsnap_point2(&ga);
        let (pb_x, pb_y) = crate::numerics::unsnap_point2(&gb);
        let len = ((pb_x - pa_x).powi(2) + (pb_y - pa_y).powi(2)).sqrt();
        if len < min_len {
            continue;
        }
        let key = if ga <= gb { (ga, gb) } else { (gb, ga) };
        if seen.insert(key, ()).is_none() {
            out.push(key);
        }
    }
    out
}

fn build_vertex_table(
    edges: &[(GridPoint2, GridPoint2)],
) -> (Vec<(f64, f64)>, HashMap<GridPoint2, usize>) {
    let mut vertices = Vec::new();
    let mut index = HashMap::new();
    for &(a, b) in edges {
        for g in [a, b] {
            index.entry(g).or_insert_with(|| {
                vertices.push(crate::numerics::unsnap_point2(&g));
                vertices.len() - 1
            });
        }
    }
    (vertices, index)
}

fn build_half_edges(
    edges: &[(GridPoint2, GridPoint2)],
    vertex_index: &HashMap<GridPoint2, usize>,
) -> Vec<HalfEdgeRec> {
    let mut half_edges = Vec::with_capacity(edges.len() * 2);
    for &(a, b) in edges {
        let va = vertex_index[&a];
        let vb = vertex_index[&b];
        let h_fwd = half_edges.len();
        let h_bwd = h_fwd + 1;
        half_edges.push(HalfEdgeRec {
            origin: va,
            twin: h_bwd,
            next: None,
            visited: false,
        });
        half_edges.push(HalfEdgeRec {
            origin: vb,
            twin: h_fwd,
            next: None,
            visited: false,
        });
    }
    half_edges
}

/// Sort each vertex's outgoing half-edges by angle and link `next` using
/// the "turn-left" rule: for half-edge `h` arriving at `v`, `h.next` is the
/// outgoing half-edge immediately clockwise of `h`'s twin in `v`'s
/// angularly-sorted outgoing list.
fn link_next_via_turn_left(vertices: &[(f64, f64)], half_edges: &mut [HalfEdgeRec]) {
    let mut outgoing_by_vertex: HashMap<usize, Vec<usize>> = HashMap::new();
    for (h, he) in half_edges.iter().enumerate() {
        outgoing_by_vertex.entry(he.origin).or_default().push(h);
    }
    for (_, outs) in outgoing_by_vertex.iter_mut() {
        outs.sort_by(|&h1, &h2| {
            let o1 = vertices[half_edges[h1].origin];
            let d1 = vertices[half_edges[half_edges[h1].twin].origin];
            let o2 = vertices[half_edges[h2].origin];
            let d2 = vertices[half_edges[half_edges[h2].twin].origin];
            let a1 = crate::numerics::angle_of(d1.0 - o1.0, d1.1 - o1.1);
            let a2 = crate::numerics::angle_of(d2.0 - o2.0, d2.1 - o2.1);
            a1.partial_cmp(&a2).unwrap()
        });
    }

    let n = half_edges.len();
    for h in 0..n {
        let twin = half_edges[h].twin;
        let dest = half_edges[twin].origin;
        let outs = &outgoing_by_vertex[&dest];
        let i = outs.iter().position(|&x| x == twin).unwrap();
        let k = outs.len();
        let prev_idx = (i + k - 1) % k;
        half_edges[h].next = Some(outs[prev_idx]);
    }
}

/// Walk every half-edge cycle once, keeping cycles with positive shoelace
/// area (the bounded pieces; negative-area cycles are the unbounded outer
/// face or holes and are excluded).
fn extract_bounded_faces(
    vertices: &[(f64, f64)],
    half_edges: &mut [HalfEdgeRec],
) -> Vec<ArrangementFace> {
    let n = half_edges.len();
    let max_steps = n.max(1) * 4 + 16;
    let mut faces = Vec::new();

    for start in 0..n {
        if half_edges[start].visited {
            continue;
        }
        let mut cycle = Vec::new();
        let mut h = start;
        let mut steps = 0;
        loop {
            if half_edges[h].visited {
                break;
            }
            half_edges[h].visited = true;
            cycle.push(half_edges[h].origin);
            h = half_edges[h].next.expect("next must be linked");
            steps += 1;
            if h == start || steps > max_steps {
                break;
            }
        }
        if cycle.len() < 3 {
            continue;
        }
        let pts: Vec<(f64, f64)> = cycle.iter().map(|&v| vertices[v]).collect();
        let area = shoelace_signed_area(&pts);
        if area > 1e-15 {
            faces.push(ArrangementFace {
                vertices: pts,
                signed_area: area,
            });
        }
    }
    faces
}

fn shoelace_signed_area(pts: &[(f64, f64)]) -> f64 {
    let n = pts.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += pts[i].0 * pts[j].1 - pts[j].0 * pts[i].1;
    }
    area * 0.5
}
