//! Bridges the document-model [`solidtype_types::Sketch`] (entity-id keyed,
//! serializable, feature-tree facing) to [`solidtype_solver::Sketch`] (the
//! solver's flat parameter-vector representation), runs the constraint
//! solver, and extracts closed profiles realized as 3D point loops ready for
//! `extrude`/`revolve` (§4.5 "sketchToProfile").

use std::collections::{HashMap, HashSet};

use solidtype_kernel::geometry::point::Point3d;
use solidtype_kernel::geometry::surfaces::Plane;
use solidtype_solver::constraint::Constraint as SolverConstraint;
use solidtype_solver::solver::{solve_sketch_driven, DrivenPoint, SolverConfig, SolverError};
use solidtype_solver::sketch::Sketch as SolverSketch;
use solidtype_types::sketch::{ClosedProfile, SketchConstraint, SketchEntity, SolveStatus};
use solidtype_types::Sketch as DocSketch;

use crate::types::OpError;

/// Solves a document sketch in place: populates `solved_positions`,
/// `solved_profiles` and `solve_status`. Unsupported constraint kinds (see
/// DESIGN.md) are dropped with a warning rather than failing the solve.
pub fn solve_document_sketch(sketch: &mut DocSketch, config: &SolverConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let (mut solver_sketch, id_to_index, point_ids, constraint_origin) =
        build_solver_sketch(sketch, &mut warnings);

    let dof_before_solve = solver_sketch.approximate_dof();

    let driven: Vec<DrivenPoint> = sketch
        .constraints
        .iter()
        .filter_map(|c| match c {
            SketchConstraint::Dragged { point } => {
                let &entity = id_to_index.get(point)?;
                let (x, y) = point_position_by_id(sketch, *point)?;
                Some(DrivenPoint { entity, x, y })
            }
            _ => None,
        })
        .collect();

    let solve_result = solve_sketch_driven(&mut solver_sketch, config, &driven);

    sketch.solved_positions = point_ids
        .iter()
        .filter_map(|(&id, &idx)| match &solver_sketch.entities[idx] {
            SketchEntity_Solver::Point { param_index } => Some((
                id,
                (
                    solver_sketch.params[*param_index],
                    solver_sketch.params[param_index + 1],
                ),
            )),
            _ => None,
        })
        .collect();

    // Circle/arc centers aren't in `point_ids` (they're synthesized params,
    // not document Point entities) but their solved center still needs to
    // reach profile realization; stash those too, keyed by the owning
    // circle/arc's own entity id so `profile_to_world_points` can look them up.
    for entity in &sketch.entities {
        match entity {
            SketchEntity::Circle { id, .. } | SketchEntity::Arc { id, .. } => {
                if let Some(&idx) = id_to_index.get(id) {
                    if let Some((cx, cy)) = solver_center(&solver_sketch, idx) {
                        sketch.solved_positions.entry(*id).or_insert((cx, cy));
                    }
                }
            }
            _ => {}
        }
    }

    sketch.solve_status = match &solve_result {
        Ok(_) => {
            let dof = solver_sketch.approximate_dof();
            if dof <= 0 {
                SolveStatus::FullyConstrained
            } else {
                SolveStatus::UnderConstrained { dof: dof as u32 }
            }
        }
        Err(SolverError::DidNotConverge { residual, .. }) => SolveStatus::SolveFailed {
            reason: format!("did not converge, residual = {residual:e}"),
        },
        Err(SolverError::UnderConstrained { dof }) => {
            SolveStatus::UnderConstrained { dof: (*dof).max(0) as u32 }
        }
        Err(SolverError::OverConstrained { conflicts }) => SolveStatus::OverConstrained {
            conflicts: conflicts
                .iter()
                .filter_map(|&i| constraint_origin.get(i).map(|&d| d as u32))
                .collect(),
        },
    };
    let _ = dof_before_solve;

    sketch.solved_profiles = extract_closed_profiles(sketch);

    warnings
}

/// Local alias so the match above reads naturally without colliding with
/// the document-model `SketchEntity` imported under the same name.
use solidtype_solver::constraint::SketchEntity as SketchEntity_Solver;

fn solver_center(solver_sketch: &SolverSketch, idx: usize) -> Option<(f64, f64)> {
    match &solver_sketch.entities[idx] {
        SketchEntity_Solver::Circle { center_param, .. } => Some((
            solver_sketch.params[*center_param],
            solver_sketch.params[center_param + 1],
        )),
        SketchEntity_Solver::Arc { center_param, .. } => Some((
            solver_sketch.params[*center_param],
            solver_sketch.params[center_param + 1],
        )),
        _ => None,
    }
}

/// Converts document entities/constraints into a solver-ready sketch.
/// Returns the solver sketch, an `entity_id -> solver_index` map, the subset
/// of that map restricted to `Point` entities (used to read back solved
/// positions keyed by the document's u32 ids), and a `solver constraint
/// index -> document constraint index` table (since `translate_constraint`
/// drops unsupported kinds, the two lists aren't index-aligned).
fn build_solver_sketch(
    sketch: &DocSketch,
    warnings: &mut Vec<String>,
) -> (SolverSketch, HashMap<u32, usize>, HashMap<u32, usize>, Vec<usize>) {
    let mut solver_sketch = SolverSketch::new();
    let mut id_to_index = HashMap::new();
    let mut point_ids = HashMap::new();

    for entity in &sketch.entities {
        match entity {
            SketchEntity::Point { id, x, y, .. } => {
                let idx = solver_sketch.add_point(*x, *y);
                id_to_index.insert(*id, idx);
                point_ids.insert(*id, idx);
            }
            _ => {}
        }
    }
    for entity in &sketch.entities {
        match entity {
            SketchEntity::Line { id, start_id, end_id, .. } => {
                let (Some(&s), Some(&e)) = (id_to_index.get(start_id), id_to_index.get(end_id)) else {
                    warnings.push(format!("line {id}: endpoint not found, skipped"));
                    continue;
                };
                let idx = solver_sketch.add_line(s, e);
                id_to_index.insert(*id, idx);
            }
            SketchEntity::Circle { id, center_id, radius, .. } => {
                let (cx, cy) = center_position(sketch, *center_id).unwrap_or((0.0, 0.0));
                let idx = solver_sketch.add_circle(cx, cy, *radius);
                id_to_index.insert(*id, idx);
            }
            SketchEntity::Arc { id, center_id, start_id, end_id, .. } => {
                let (cx, cy) = center_position(sketch, *center_id).unwrap_or((0.0, 0.0));
                let (sx, sy) = point_position_by_id(sketch, *start_id).unwrap_or((0.0, 0.0));
                let (ex, ey) = point_position_by_id(sketch, *end_id).unwrap_or((0.0, 0.0));
                let radius = ((sx - cx).powi(2) + (sy - cy).powi(2)).sqrt();
                let start_angle = (sy - cy).atan2(sx - cx);
                let end_angle = (ey - cy).atan2(ex - cx);
                let idx = solver_sketch.add_arc(cx, cy, radius, start_angle, end_angle);
                id_to_index.insert(*id, idx);
            }
            SketchEntity::Point { .. } => {}
        }
    }

    let mut constraint_origin = Vec::new();
    for (doc_index, constraint) in sketch.constraints.iter().enumerate() {
        if let Some(solver_constraint) = translate_constraint(constraint, &id_to_index, warnings) {
            solver_sketch.add_constraint(solver_constraint);
            constraint_origin.push(doc_index);
        }
    }

    (solver_sketch, id_to_index, point_ids, constraint_origin)
}

fn center_position(sketch: &DocSketch, center_id: u32) -> Option<(f64, f64)> {
    point_position_by_id(sketch, center_id)
}

fn point_position_by_id(sketch: &DocSketch, id: u32) -> Option<(f64, f64)> {
    sketch.entities.iter().find_map(|e| match e {
        SketchEntity::Point { id: pid, x, y, .. } if *pid == id => Some((*x, *y)),
        _ => None,
    })
}

/// Best-effort translation of a document constraint into the solver's
/// (smaller) constraint vocabulary. Constraints with no solver counterpart
/// (symmetric-about-axis shorthands, dimensional ratios, drag hints, ...)
/// are dropped with a warning rather than rejected outright — §4.4 treats
/// "unsupported constraint type" as a warning-level situation, not a hard
/// failure, since sketches are still useful partially constrained.
fn translate_constraint(
    constraint: &SketchConstraint,
    id_to_index: &HashMap<u32, usize>,
    warnings: &mut Vec<String>,
) -> Option<SolverConstraint> {
    let idx = |id: u32| id_to_index.get(&id).copied();

    match constraint {
        SketchConstraint::Coincident { point_a, point_b } => Some(SolverConstraint::Coincident {
            point_a: idx(*point_a)?,
            point_b: idx(*point_b)?,
        }),
        SketchConstraint::Horizontal { entity } => {
            Some(SolverConstraint::Horizontal { line: idx(*entity)? })
        }
        SketchConstraint::Vertical { entity } => {
            Some(SolverConstraint::Vertical { line: idx(*entity)? })
        }
        SketchConstraint::Parallel { line_a, line_b } => Some(SolverConstraint::Parallel {
            line_a: idx(*line_a)?,
            line_b: idx(*line_b)?,
        }),
        SketchConstraint::Perpendicular { line_a, line_b } => Some(SolverConstraint::Perpendicular {
            line_a: idx(*line_a)?,
            line_b: idx(*line_b)?,
        }),
        SketchConstraint::Tangent { line, curve } => Some(SolverConstraint::Tangent {
            entity_a: idx(*line)?,
            entity_b: idx(*curve)?,
        }),
        SketchConstraint::Equal { entity_a, entity_b } => Some(SolverConstraint::Equal {
            entity_a: idx(*entity_a)?,
            entity_b: idx(*entity_b)?,
        }),
        SketchConstraint::Symmetric { entity_a, entity_b, symmetry_line } => {
            Some(SolverConstraint::Symmetric {
                point_a: idx(*entity_a)?,
                point_b: idx(*entity_b)?,
                axis: idx(*symmetry_line)?,
            })
        }
        SketchConstraint::Distance { entity_a, entity_b, value } => Some(SolverConstraint::Distance {
            point_a: idx(*entity_a)?,
            point_b: idx(*entity_b)?,
            value: *value,
        }),
        SketchConstraint::Angle { line_a, line_b, value_degrees } => Some(SolverConstraint::Angle {
            line_a: idx(*line_a)?,
            line_b: idx(*line_b)?,
            value: value_degrees.to_radians(),
        }),
        SketchConstraint::Radius { entity, value } => {
            Some(SolverConstraint::Radius { entity: idx(*entity)?, value: *value })
        }
        SketchConstraint::Diameter { entity, value } => {
            Some(SolverConstraint::Radius { entity: idx(*entity)?, value: value / 2.0 })
        }
        SketchConstraint::OnEntity { point, entity } => Some(SolverConstraint::PointOnEntity {
            point: idx(*point)?,
            entity: idx(*entity)?,
        }),
        // Dragged points aren't a constraint row at all: they become a
        // `DrivenPoint` pin, collected separately in `solve_document_sketch`.
        SketchConstraint::Dragged { .. } => None,
        SketchConstraint::Midpoint { point, line } => Some(SolverConstraint::Midpoint {
            point: idx(*point)?,
            line: idx(*line)?,
        }),
        SketchConstraint::Concentric { entity_a, entity_b } => Some(SolverConstraint::Concentric {
            entity_a: idx(*entity_a)?,
            entity_b: idx(*entity_b)?,
        }),
        SketchConstraint::SymmetricH { point_a, point_b } => Some(SolverConstraint::SymmetricH {
            point_a: idx(*point_a)?,
            point_b: idx(*point_b)?,
        }),
        SketchConstraint::SymmetricV { point_a, point_b } => Some(SolverConstraint::SymmetricV {
            point_a: idx(*point_a)?,
            point_b: idx(*point_b)?,
        }),
        SketchConstraint::EqualPointToLine { point_a, point_b, line } => {
            Some(SolverConstraint::EqualPointToLineDistance {
                point_a: idx(*point_a)?,
                point_b: idx(*point_b)?,
                line: idx(*line)?,
            })
        }
        SketchConstraint::EqualAngle { .. }
        | SketchConstraint::Ratio { .. }
        | SketchConstraint::SameOrientation { .. } => {
            warnings.push(format!("constraint {constraint:?} has no solver counterpart, skipped"));
            None
        }
    }
}

/// Finds every closed loop of (non-construction) lines/arcs, plus every
/// standalone circle, as a [`ClosedProfile`]. The loop with the largest
/// unsigned shoelace area is marked `is_outer`; the rest are holes, per
/// §4.5 "profiles may nest (outer boundary plus island holes)".
fn extract_closed_profiles(sketch: &DocSketch) -> Vec<ClosedProfile> {
    let mut adjacency: HashMap<u32, Vec<(u32, u32)>> = HashMap::new(); // point_id -> [(other_point_id, entity_id)]
    let mut chain_entities: HashSet<u32> = HashSet::new();

    for entity in &sketch.entities {
        match entity {
            SketchEntity::Line { id, start_id, end_id, construction } if !construction => {
                adjacency.entry(*start_id).or_default().push((*end_id, *id));
                adjacency.entry(*end_id).or_default().push((*start_id, *id));
                chain_entities.insert(*id);
            }
            SketchEntity::Arc { id, start_id, end_id, construction, .. } if !construction => {
                adjacency.entry(*start_id).or_default().push((*end_id, *id));
                adjacency.entry(*end_id).or_default().push((*start_id, *id));
                chain_entities.insert(*id);
            }
            _ => {}
        }
    }

    let mut used_entities: HashSet<u32> = HashSet::new();
    let mut loops: Vec<Vec<u32>> = Vec::new();

    for entity in &sketch.entities {
        let (start_point, entity_id) = match entity {
            SketchEntity::Line { id, start_id, construction, .. } if !construction => (*start_id, *id),
            SketchEntity::Arc { id, start_id, construction, .. } if !construction => (*start_id, *id),
            _ => continue,
        };
        if used_entities.contains(&entity_id) {
            continue;
        }
        if let Some(loop_entities) = trace_loop(start_point, &adjacency, &mut used_entities) {
            loops.push(loop_entities);
        }
    }

    for entity in &sketch.entities {
        if let SketchEntity::Circle { id, construction, .. } = entity {
            if !construction && !chain_entities.contains(id) {
                loops.push(vec![*id]);
            }
        }
    }

    let areas: Vec<f64> = loops.iter().map(|ids| profile_area(sketch, ids)).collect();
    let outer_index = areas
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.abs().partial_cmp(&b.abs()).unwrap())
        .map(|(i, _)| i);

    loops
        .into_iter()
        .enumerate()
        .map(|(i, entity_ids)| ClosedProfile {
            entity_ids,
            is_outer: Some(i) == outer_index,
        })
        .collect()
}

/// Walks the adjacency graph starting at `start_point`, returning the
/// ordered entity ids of a closed loop, or `None` if the chain dead-ends
/// without returning to `start_point`.
fn trace_loop(
    start_point: u32,
    adjacency: &HashMap<u32, Vec<(u32, u32)>>,
    used_entities: &mut HashSet<u32>,
) -> Option<Vec<u32>> {
    let mut entity_ids = Vec::new();
    let mut current = start_point;
    loop {
        let edges = adjacency.get(&current)?;
        let next = edges.iter().find(|(_, eid)| !used_entities.contains(eid));
        let Some(&(next_point, entity_id)) = next else {
            return None;
        };
        used_entities.insert(entity_id);
        entity_ids.push(entity_id);
        current = next_point;
        if current == start_point {
            return Some(entity_ids);
        }
    }
}

/// Shoelace-formula area over a profile's solved point positions, treating
/// arcs as their chord (sufficient for outer/hole ranking; not used for
/// tessellation).
fn profile_area(sketch: &DocSketch, entity_ids: &[u32]) -> f64 {
    let points = profile_chord_points(sketch, entity_ids);
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % points.len()];
        sum += x0 * y1 - x1 * y0;
    }
    sum * 0.5
}

fn profile_chord_points(sketch: &DocSketch, entity_ids: &[u32]) -> Vec<(f64, f64)> {
    if entity_ids.len() == 1 {
        if let Some(SketchEntity::Circle { center_id, radius, .. }) =
            sketch.entities.iter().find(|e| e.id() == entity_ids[0])
        {
            let (cx, cy) = sketch
                .solved_positions
                .get(center_id)
                .copied()
                .unwrap_or_else(|| center_position(sketch, *center_id).unwrap_or((0.0, 0.0)));
            let n = 16;
            return (0..n)
                .map(|i| {
                    let t = std::f64::consts::TAU * (i as f64) / (n as f64);
                    (cx + radius * t.cos(), cy + radius * t.sin())
                })
                .collect();
        }
        return Vec::new();
    }

    let mut points = Vec::new();
    for &eid in entity_ids {
        let entity = sketch.entities.iter().find(|e| e.id() == eid);
        let start_id = match entity {
            Some(SketchEntity::Line { start_id, .. }) => Some(*start_id),
            Some(SketchEntity::Arc { start_id, .. }) => Some(*start_id),
            _ => None,
        };
        if let Some(pid) = start_id {
            if let Some(&pos) = sketch.solved_positions.get(&pid) {
                points.push(pos);
            } else if let Some(pos) = point_position_by_id(sketch, pid) {
                points.push(pos);
            }
        }
    }
    points
}

/// Realizes a closed profile as a 3D point loop on `plane`, sampling arcs
/// into `arc_segments` chords and full circles into `circle_segments`
/// points, ready for [`crate::kernel_bundle::KernelBundle::execute_extrude`]
/// or `execute_revolve`.
pub fn profile_to_world_points(
    sketch: &DocSketch,
    profile: &ClosedProfile,
    plane: &Plane,
) -> Result<Vec<Point3d>, OpError> {
    let to_world = |x: f64, y: f64| -> Point3d { plane.evaluate(x, y) };

    if profile.entity_ids.len() == 1 {
        if let Some(SketchEntity::Circle { center_id, radius, .. }) =
            sketch.entities.iter().find(|e| e.id() == profile.entity_ids[0])
        {
            let (cx, cy) = sketch
                .solved_positions
                .get(center_id)
                .copied()
                .ok_or_else(|| OpError::Operation("circle center has no solved position".into()))?;
            const SEGMENTS: usize = 32;
            return Ok((0..SEGMENTS)
                .map(|i| {
                    let t = std::f64::consts::TAU * (i as f64) / (SEGMENTS as f64);
                    to_world(cx + radius * t.cos(), cy + radius * t.sin())
                })
                .collect());
        }
        return Err(OpError::Operation("single-entity profile is not a circle".into()));
    }

    let mut points = Vec::new();
    for &eid in &profile.entity_ids {
        let entity = sketch
            .entities
            .iter()
            .find(|e| e.id() == eid)
            .ok_or_else(|| OpError::Operation(format!("profile references unknown entity {eid}")))?;
        match entity {
            SketchEntity::Line { start_id, .. } => {
                let (x, y) = sketch
                    .solved_positions
                    .get(start_id)
                    .copied()
                    .ok_or_else(|| OpError::Operation(format!("point {start_id} has no solved position")))?;
                points.push(to_world(x, y));
            }
            SketchEntity::Arc { center_id, start_id, end_id, .. } => {
                let (cx, cy) = sketch
                    .solved_positions
                    .get(center_id)
                    .copied()
                    .ok_or_else(|| OpError::Operation("arc center has no solved position".into()))?;
                let (sx, sy) = sketch
                    .solved_positions
                    .get(start_id)
                    .copied()
                    .ok_or_else(|| OpError::Operation("arc start has no solved position".into()))?;
                let (ex, ey) = sketch
                    .solved_positions
                    .get(end_id)
                    .copied()
                    .ok_or_else(|| OpError::Operation("arc end has no solved position".into()))?;
                let radius = ((sx - cx).powi(2) + (sy - cy).powi(2)).sqrt();
                let start_angle = (sy - cy).atan2(sx - cx);
                let mut end_angle = (ey - cy).atan2(ex - cx);
                if end_angle < start_angle {
                    end_angle += std::f64::consts::TAU;
                }
                const ARC_SEGMENTS: usize = 8;
                for i in 0..ARC_SEGMENTS {
                    let t = start_angle + (end_angle - start_angle) * (i as f64) / (ARC_SEGMENTS as f64);
                    points.push(to_world(cx + radius * t.cos(), cy + radius * t.sin()));
                }
            }
            SketchEntity::Circle { .. } | SketchEntity::Point { .. } => {}
        }
    }
    Ok(points)
}
