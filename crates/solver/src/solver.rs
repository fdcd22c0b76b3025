use std::collections::HashMap;

use nalgebra::DMatrix;
use thiserror::Error;

use crate::constraint::{Constraint, SketchEntity};
use crate::sketch::{Attachment, AttachmentCurve, Sketch};

/// Outcome of solving a sketch or one of its connected components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Every residual in scope is within tolerance.
    Converged,
    /// Some components converged, others did not.
    Partial,
    /// The Jacobian rank analysis found constraint rows that cannot be
    /// simultaneously satisfied.
    OverConstrained,
    /// The solver ran out of iterations without converging and the system
    /// isn't over-constrained (e.g. a poor initial guess or a genuinely
    /// under-constrained component that still didn't settle).
    Diverged,
}

/// A point pinned to an explicit (x, y) target with effectively infinite
/// stiffness, used for drag-to-solve: the point is excluded from the free
/// parameter set entirely, so every other point in its component solves
/// around it.
#[derive(Debug, Clone, Copy)]
pub struct DrivenPoint {
    pub entity: usize,
    pub x: f64,
    pub y: f64,
}

/// Report for one connected component of the constraint graph.
#[derive(Debug, Clone)]
pub struct ComponentResult {
    pub entities: Vec<usize>,
    /// Rank-based degrees of freedom: free parameters minus the numerical
    /// rank of the component's Jacobian at the initial guess.
    pub dof: i64,
    pub outcome: SolveOutcome,
    pub iterations: usize,
    pub residual_norm: f64,
    /// Constraint indices (into the sketch's `constraints`) whose row is
    /// linearly dependent on the others but whose residual vanished at the
    /// solution — a harmless duplicate.
    pub redundant_constraints: Vec<usize>,
    /// Constraint indices whose row is linearly dependent but whose
    /// residual did not vanish — a genuine contradiction.
    pub conflicting_constraints: Vec<usize>,
}

/// Result of running the constraint solver.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub status: SolveOutcome,
    pub iterations: usize,
    pub residual_norm: f64,
    pub component_results: Vec<ComponentResult>,
    pub params: Vec<f64>,
    /// Convenience flag mirroring `status == SolveOutcome::Converged`.
    pub converged: bool,
    /// Convenience alias for `residual_norm * residual_norm`.
    pub final_residual: f64,
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver did not converge after {max_iterations} iterations (residual: {residual})")]
    DidNotConverge {
        max_iterations: usize,
        residual: f64,
    },
    #[error("Under-constrained system: {dof} degrees of freedom remain")]
    UnderConstrained { dof: i64 },
    #[error("Over-constrained system: constraints {conflicts:?} are contradictory")]
    OverConstrained { conflicts: Vec<usize> },
}

/// Configuration for the Gauss-Newton / Levenberg-Marquardt solver.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub lambda_initial: f64,
    pub lambda_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-10,
            lambda_initial: 1e-3,
            lambda_factor: 10.0,
        }
    }
}

/// Solve sketch constraints using Gauss-Newton with Levenberg-Marquardt damping.
///
/// Each constraint produces one or more scalar residual equations r_i(x) where r_i = 0
/// when satisfied. We build the Jacobian J analytically and solve:
///   (J^T J + lambda * I) * dx = -J^T * r
/// for the parameter update dx.
///
/// The constraint graph is partitioned into connected components first;
/// each component is solved independently against its own free parameters.
pub fn solve_sketch(sketch: &mut Sketch, config: &SolverConfig) -> Result<SolverResult, SolverError> {
    solve_sketch_driven(sketch, config, &[])
}

/// Like [`solve_sketch`] but with a set of points pinned to explicit drag
/// targets (infinite-weight residuals: the point simply never enters the
/// free parameter set).
pub fn solve_sketch_driven(
    sketch: &mut Sketch,
    config: &SolverConfig,
    driven: &[DrivenPoint],
) -> Result<SolverResult, SolverError> {
    let driven_by_entity: HashMap<usize, (f64, f64)> =
        driven.iter().map(|d| (d.entity, (d.x, d.y))).collect();

    let components = partition_components(sketch);

    let mut component_results = Vec::with_capacity(components.len());
    let mut max_iterations = 0usize;
    let mut total_residual_sq = 0.0;

    for comp in &components {
        let result = solve_component(sketch, comp, config, &driven_by_entity);
        max_iterations = max_iterations.max(result.iterations);
        total_residual_sq += result.residual_norm * result.residual_norm;
        component_results.push(result);
    }

    let residual_norm = total_residual_sq.sqrt();
    let converged_count = component_results
        .iter()
        .filter(|c| c.outcome == SolveOutcome::Converged)
        .count();

    let status = if component_results.is_empty() || converged_count == component_results.len() {
        SolveOutcome::Converged
    } else if component_results
        .iter()
        .any(|c| c.outcome == SolveOutcome::OverConstrained)
    {
        SolveOutcome::OverConstrained
    } else if converged_count > 0 {
        SolveOutcome::Partial
    } else {
        SolveOutcome::Diverged
    };

    let result = SolverResult {
        status,
        iterations: max_iterations,
        residual_norm,
        params: sketch.params.clone(),
        converged: status == SolveOutcome::Converged,
        final_residual: total_residual_sq,
        component_results,
    };

    match status {
        SolveOutcome::Converged | SolveOutcome::Partial => Ok(result),
        SolveOutcome::OverConstrained => {
            let conflicts: Vec<usize> = result
                .component_results
                .iter()
                .flat_map(|c| c.conflicting_constraints.iter().copied())
                .collect();
            Err(SolverError::OverConstrained { conflicts })
        }
        SolveOutcome::Diverged => {
            let under_constrained_dof = result
                .component_results
                .iter()
                .find(|c| c.outcome == SolveOutcome::Diverged && c.dof > 0)
                .map(|c| c.dof);
            match under_constrained_dof {
                Some(dof) => Err(SolverError::UnderConstrained { dof }),
                None => Err(SolverError::DidNotConverge {
                    max_iterations: config.max_iterations,
                    residual: residual_norm,
                }),
            }
        }
    }
}

/// One connected component of the constraint graph: a set of raw parameter
/// indices plus the constraints whose touched parameters all fall inside it.
struct Component {
    entities: Vec<usize>,
    constraints: Vec<usize>,
    param_indices: Vec<usize>,
}

fn find(parent: &mut [usize], x: usize) -> usize {
    if parent[x] != x {
        parent[x] = find(parent, parent[x]);
    }
    parent[x]
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

fn union_all(parent: &mut [usize], indices: &[usize]) {
    for w in indices.windows(2) {
        union(parent, w[0], w[1]);
    }
}

/// Partition a sketch's constraint graph into independently-solvable
/// connected components (§4.4). Partitioning happens over raw parameter
/// indices rather than entity indices: a `Line` entity owns no parameters
/// of its own, so grouping by entity index alone would fail to connect a
/// line's endpoint points to whatever the line is constrained against.
fn partition_components(sketch: &Sketch) -> Vec<Component> {
    let n_params = sketch.params.len();
    let mut parent: Vec<usize> = (0..n_params).collect();

    // Keep each entity's own parameters together even if nothing constrains
    // it yet (an unconstrained point's x and y shouldn't split into two
    // singleton "components").
    for idx in 0..sketch.entities.len() {
        union_all(&mut parent, &entity_param_set(&sketch.entities, idx));
    }

    for c in &sketch.constraints {
        union_all(&mut parent, &constraint_touched_params(c, &sketch.entities));
    }

    for att in &sketch.attachments {
        let mut touched = vec![
            point_param_x(&sketch.entities, att.point),
            point_param_y(&sketch.entities, att.point),
        ];
        touched.extend(curve_touched_params(&sketch.entities, &att.curve));
        union_all(&mut parent, &touched);
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for p in 0..n_params {
        let root = find(&mut parent, p);
        groups.entry(root).or_default().push(p);
    }

    let mut constraints_by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    for (ci, c) in sketch.constraints.iter().enumerate() {
        let touched = constraint_touched_params(c, &sketch.entities);
        if let Some(&first) = touched.first() {
            let root = find(&mut parent, first);
            constraints_by_root.entry(root).or_default().push(ci);
        }
    }

    groups
        .into_iter()
        .map(|(root, mut param_indices)| {
            param_indices.sort_unstable();
            let entities: Vec<usize> = (0..sketch.entities.len())
                .filter(|&e| {
                    let owned = entity_param_set(&sketch.entities, e);
                    match owned.first() {
                        Some(&first) => find(&mut parent.clone(), first) == root,
                        None => false,
                    }
                })
                .collect();
            Component {
                entities,
                constraints: constraints_by_root.remove(&root).unwrap_or_default(),
                param_indices,
            }
        })
        .collect()
}

/// Entity indices a constraint references (for graph connectivity, not math).
fn constraint_entities(c: &Constraint) -> Vec<usize> {
    match c {
        Constraint::Coincident { point_a, point_b } => vec![*point_a, *point_b],
        Constraint::PointOnEntity { point, entity } => vec![*point, *entity],
        Constraint::Parallel { line_a, line_b } => vec![*line_a, *line_b],
        Constraint::Perpendicular { line_a, line_b } => vec![*line_a, *line_b],
        Constraint::Horizontal { line } => vec![*line],
        Constraint::Vertical { line } => vec![*line],
        Constraint::Equal { entity_a, entity_b } => vec![*entity_a, *entity_b],
        Constraint::Tangent { entity_a, entity_b } => vec![*entity_a, *entity_b],
        Constraint::Symmetric { point_a, point_b, axis } => vec![*point_a, *point_b, *axis],
        Constraint::Distance { point_a, point_b, .. } => vec![*point_a, *point_b],
        Constraint::Angle { line_a, line_b, .. } => vec![*line_a, *line_b],
        Constraint::Radius { entity, .. } => vec![*entity],
        Constraint::Fixed { point, .. } => vec![*point],
        Constraint::Midpoint { point, line } => vec![*point, *line],
        Constraint::Concentric { entity_a, entity_b } => vec![*entity_a, *entity_b],
        Constraint::SymmetricH { point_a, point_b } => vec![*point_a, *point_b],
        Constraint::SymmetricV { point_a, point_b } => vec![*point_a, *point_b],
        Constraint::EqualPointToLineDistance { point_a, point_b, line } => {
            vec![*point_a, *point_b, *line]
        }
    }
}

/// Raw parameter indices a constraint's residual actually depends on.
fn constraint_touched_params(c: &Constraint, entities: &[SketchEntity]) -> Vec<usize> {
    let mut params: Vec<usize> = constraint_entities(c)
        .iter()
        .flat_map(|&e| entity_param_set(entities, e))
        .collect();
    params.sort_unstable();
    params.dedup();
    params
}

fn curve_touched_params(entities: &[SketchEntity], curve: &AttachmentCurve) -> Vec<usize> {
    let entity = match curve {
        AttachmentCurve::Line { entity } | AttachmentCurve::Circle { entity } => *entity,
    };
    entity_param_set(entities, entity)
}

/// Raw parameter indices owned (directly or via referenced endpoints) by an
/// entity. A `Line` owns none of its own but spans its endpoints' params.
fn entity_param_set(entities: &[SketchEntity], idx: usize) -> Vec<usize> {
    match &entities[idx] {
        SketchEntity::Point { param_index } => vec![*param_index, param_index + 1],
        SketchEntity::Circle { center_param, radius_param } => {
            vec![*center_param, center_param + 1, *radius_param]
        }
        SketchEntity::Arc {
            center_param,
            radius_param,
            start_angle_param,
            end_angle_param,
        } => vec![
            *center_param,
            center_param + 1,
            *radius_param,
            *start_angle_param,
            *end_angle_param,
        ],
        SketchEntity::Line { start_param, end_param } => {
            vec![*start_param, start_param + 1, *end_param, end_param + 1]
        }
    }
}

fn point_param_x(entities: &[SketchEntity], idx: usize) -> usize {
    match &entities[idx] {
        SketchEntity::Point { param_index } => *param_index,
        _ => 0,
    }
}

fn point_param_y(entities: &[SketchEntity], idx: usize) -> usize {
    point_param_x(entities, idx) + 1
}

/// Solve one connected component's free parameters against its own
/// constraints and attachments, pinning any driven points in the process.
fn solve_component(
    sketch: &mut Sketch,
    comp: &Component,
    config: &SolverConfig,
    driven: &HashMap<usize, (f64, f64)>,
) -> ComponentResult {
    let mut driven_params: Vec<usize> = Vec::new();
    for &e in &comp.entities {
        if let Some(&(x, y)) = driven.get(&e) {
            if let SketchEntity::Point { param_index } = &sketch.entities[e] {
                let pi = *param_index;
                sketch.params[pi] = x;
                sketch.params[pi + 1] = y;
                driven_params.push(pi);
                driven_params.push(pi + 1);
            }
        }
    }

    let free_params: Vec<usize> = comp
        .param_indices
        .iter()
        .copied()
        .filter(|p| !driven_params.contains(p))
        .collect();
    let local_index_of: HashMap<usize, usize> =
        free_params.iter().enumerate().map(|(i, &p)| (p, i)).collect();
    let n_local = free_params.len();

    let attachments: Vec<Attachment> = sketch
        .attachments
        .iter()
        .copied()
        .filter(|a| comp.entities.contains(&a.point))
        .collect();

    if comp.constraints.is_empty() && attachments.is_empty() {
        return ComponentResult {
            entities: comp.entities.clone(),
            dof: n_local as i64,
            outcome: SolveOutcome::Converged,
            iterations: 0,
            residual_norm: 0.0,
            redundant_constraints: Vec::new(),
            conflicting_constraints: Vec::new(),
        };
    }

    let (row_to_constraint, m0) = assemble_row_mapping(sketch, &comp.constraints, &attachments);
    let jac0 = assemble_local_jacobian(sketch, &comp.constraints, &attachments, &local_index_of, n_local, m0);
    let rank0 = matrix_rank(&jac0, m0, n_local);
    let dof = n_local as i64 - rank0 as i64;

    let mut dependent_rows: Vec<usize> = Vec::new();
    if m0 > rank0 {
        for row in 0..m0 {
            let reduced = remove_row(&jac0, m0, n_local, row);
            if matrix_rank(&reduced, m0 - 1, n_local) == rank0 {
                dependent_rows.push(row);
            }
        }
    }

    if n_local == 0 {
        let residuals = collect_component_residuals(sketch, &comp.constraints, &attachments);
        let residual_norm = residuals.iter().map(|r| r * r).sum::<f64>().sqrt();
        let outcome = if residual_norm * residual_norm < config.tolerance {
            SolveOutcome::Converged
        } else {
            SolveOutcome::OverConstrained
        };
        let conflicting = if outcome == SolveOutcome::OverConstrained {
            dependent_rows
                .iter()
                .filter_map(|&r| row_to_constraint[r])
                .collect()
        } else {
            Vec::new()
        };
        return ComponentResult {
            entities: comp.entities.clone(),
            dof,
            outcome,
            iterations: 0,
            residual_norm,
            redundant_constraints: Vec::new(),
            conflicting_constraints: conflicting,
        };
    }

    let mut local_params: Vec<f64> = free_params.iter().map(|&p| sketch.params[p]).collect();
    let mut lambda = config.lambda_initial;
    let mut iterations_used = 0;
    let mut converged = false;

    for iteration in 0..config.max_iterations {
        iterations_used = iteration;
        write_back(sketch, &free_params, &local_params);
        let residuals = collect_component_residuals(sketch, &comp.constraints, &attachments);
        let m = residuals.len();
        let total_sq: f64 = residuals.iter().map(|r| r * r).sum();

        if total_sq < config.tolerance {
            converged = true;
            break;
        }

        let jac =
            assemble_local_jacobian(sketch, &comp.constraints, &attachments, &local_index_of, n_local, m);

        let mut jtr = vec![0.0; n_local];
        for j in 0..n_local {
            for i in 0..m {
                jtr[j] += jac[i * n_local + j] * residuals[i];
            }
        }
        let mut jtj = vec![0.0; n_local * n_local];
        for i in 0..n_local {
            for j in 0..n_local {
                let mut sum = 0.0;
                for k in 0..m {
                    sum += jac[k * n_local + i] * jac[k * n_local + j];
                }
                jtj[i * n_local + j] = sum;
            }
        }

        let mut found_better = false;
        for _ in 0..10 {
            let mut damped = jtj.clone();
            for i in 0..n_local {
                damped[i * n_local + i] += lambda;
            }
            if let Some(dx) = solve_linear_system(&damped, &jtr, n_local) {
                let mut trial = local_params.clone();
                for i in 0..n_local {
                    trial[i] -= dx[i];
                }
                write_back(sketch, &free_params, &trial);
                let trial_res = collect_component_residuals(sketch, &comp.constraints, &attachments);
                let trial_sq: f64 = trial_res.iter().map(|r| r * r).sum();
                if trial_sq < total_sq {
                    local_params = trial;
                    lambda = (lambda / config.lambda_factor).max(1e-15);
                    found_better = true;
                    break;
                }
            }
            lambda *= config.lambda_factor;
        }

        if !found_better {
            let grad_norm_sq: f64 = jtr.iter().map(|g| g * g).sum();
            if grad_norm_sq > 1e-20 {
                let step = 0.01 / grad_norm_sq.sqrt();
                for i in 0..n_local {
                    local_params[i] -= step * jtr[i];
                }
            }
            lambda *= config.lambda_factor;
        }
    }

    write_back(sketch, &free_params, &local_params);
    let final_residuals = collect_component_residuals(sketch, &comp.constraints, &attachments);
    let final_sq: f64 = final_residuals.iter().map(|r| r * r).sum();
    let last_residual_norm = final_sq.sqrt();
    if final_sq < config.tolerance {
        converged = true;
    }

    let mut redundant_constraints = Vec::new();
    let mut conflicting_constraints = Vec::new();
    for &row in &dependent_rows {
        let Some(ci) = row_to_constraint.get(row).copied().flatten() else {
            continue;
        };
        if row >= final_residuals.len() {
            continue;
        }
        if final_residuals[row].abs() < config.tolerance.sqrt() {
            if !redundant_constraints.contains(&ci) {
                redundant_constraints.push(ci);
            }
        } else if !conflicting_constraints.contains(&ci) {
            conflicting_constraints.push(ci);
        }
    }

    let outcome = if converged {
        SolveOutcome::Converged
    } else if dof < 0 || !conflicting_constraints.is_empty() {
        SolveOutcome::OverConstrained
    } else {
        SolveOutcome::Diverged
    };

    ComponentResult {
        entities: comp.entities.clone(),
        dof,
        outcome,
        iterations: iterations_used,
        residual_norm: last_residual_norm,
        redundant_constraints,
        conflicting_constraints,
    }
}

fn write_back(sketch: &mut Sketch, free_params: &[usize], values: &[f64]) {
    for (i, &p) in free_params.iter().enumerate() {
        sketch.params[p] = values[i];
    }
}

/// Residuals for a component: its own constraints followed by two rows per
/// attachment (the projection gap in x and y).
fn collect_component_residuals(
    sketch: &Sketch,
    local_constraints: &[usize],
    attachments: &[Attachment],
) -> Vec<f64> {
    let mut out = Vec::new();
    for &ci in local_constraints {
        constraint_residuals(&sketch.constraints[ci], &sketch.params, &sketch.entities, &mut out);
    }
    for att in attachments {
        let (px, py) = entity_point(&sketch.entities, att.point, &sketch.params);
        let (tx, ty) = project_attachment(sketch, att);
        out.push(px - tx);
        out.push(py - ty);
    }
    out
}

/// Maps each residual row to the sketch-level constraint index that
/// produced it (`None` for attachment rows, which aren't sketch
/// constraints). Row counts must stay in lockstep with
/// `collect_component_residuals`/`assemble_local_jacobian`.
fn assemble_row_mapping(
    sketch: &Sketch,
    local_constraints: &[usize],
    attachments: &[Attachment],
) -> (Vec<Option<usize>>, usize) {
    let mut mapping = Vec::new();
    for &ci in local_constraints {
        let mut tmp = Vec::new();
        constraint_residuals(&sketch.constraints[ci], &sketch.params, &sketch.entities, &mut tmp);
        for _ in 0..tmp.len() {
            mapping.push(Some(ci));
        }
    }
    for _ in attachments {
        mapping.push(None);
        mapping.push(None);
    }
    let m = mapping.len();
    (mapping, m)
}

fn assemble_local_jacobian(
    sketch: &Sketch,
    local_constraints: &[usize],
    attachments: &[Attachment],
    local_index_of: &HashMap<usize, usize>,
    n_local: usize,
    m: usize,
) -> Vec<f64> {
    let n_global = sketch.params.len();
    let mut jac_local = vec![0.0; m * n_local];
    let mut row = 0;

    for &ci in local_constraints {
        let c = &sketch.constraints[ci];
        let mut tmp_res = Vec::new();
        constraint_residuals(c, &sketch.params, &sketch.entities, &mut tmp_res);
        let rows = tmp_res.len();
        if rows == 0 {
            continue;
        }
        let mut full = vec![0.0; rows * n_global];
        constraint_jacobian(c, &sketch.params, &sketch.entities, n_global, &mut full, 0);
        for r in 0..rows {
            for (&gidx, &lidx) in local_index_of {
                let v = full[r * n_global + gidx];
                if v != 0.0 {
                    jac_local[(row + r) * n_local + lidx] = v;
                }
            }
        }
        row += rows;
    }

    for att in attachments {
        if let Some(&lx) = local_index_of.get(&point_param_x(&sketch.entities, att.point)) {
            jac_local[row * n_local + lx] = 1.0;
        }
        if let Some(&ly) = local_index_of.get(&point_param_y(&sketch.entities, att.point)) {
            jac_local[(row + 1) * n_local + ly] = 1.0;
        }
        row += 2;
    }

    jac_local
}

/// Closest point on the attachment's target curve to the attached point's
/// current position, recomputed fresh every call (the solver calls this
/// once per outer iteration so the target tracks the curve as it moves).
fn project_attachment(sketch: &Sketch, att: &Attachment) -> (f64, f64) {
    let (px, py) = entity_point(&sketch.entities, att.point, &sketch.params);
    match att.curve {
        AttachmentCurve::Line { entity } => {
            if let SketchEntity::Line { start_param, end_param } = &sketch.entities[entity] {
                let ax = sketch.params[*start_param];
                let ay = sketch.params[start_param + 1];
                let bx = sketch.params[*end_param];
                let by = sketch.params[end_param + 1];
                project_onto_line(px, py, ax, ay, bx, by)
            } else {
                (px, py)
            }
        }
        AttachmentCurve::Circle { entity } => {
            if let SketchEntity::Circle { center_param, radius_param } = &sketch.entities[entity] {
                let cx = sketch.params[*center_param];
                let cy = sketch.params[center_param + 1];
                let r = sketch.params[*radius_param];
                project_onto_circle(px, py, cx, cy, r)
            } else {
                (px, py)
            }
        }
    }
}

fn project_onto_line(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> (f64, f64) {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-20 {
        return (ax, ay);
    }
    let t = ((px - ax) * dx + (py - ay) * dy) / len_sq;
    (ax + t * dx, ay + t * dy)
}

fn project_onto_circle(px: f64, py: f64, cx: f64, cy: f64, r: f64) -> (f64, f64) {
    let dx = px - cx;
    let dy = py - cy;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < 1e-15 {
        return (cx + r, cy);
    }
    (cx + dx / dist * r, cy + dy / dist * r)
}

/// Numerical rank of an `m x n` row-major matrix via SVD, thresholding
/// singular values relative to the largest one.
fn matrix_rank(values: &[f64], m: usize, n: usize) -> usize {
    if m == 0 || n == 0 {
        return 0;
    }
    let mat = DMatrix::from_row_slice(m, n, values);
    let svd = mat.svd(false, false);
    let max_sv = svd.singular_values.iter().cloned().fold(0.0_f64, f64::max);
    if max_sv <= 0.0 {
        return 0;
    }
    let eps = max_sv * 1e-9 * (m.max(n) as f64);
    svd.singular_values.iter().filter(|&&s| s > eps).count()
}

fn remove_row(values: &[f64], m: usize, n: usize, row: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity((m.saturating_sub(1)) * n);
    for r in 0..m {
        if r == row {
            continue;
        }
        out.extend_from_slice(&values[r * n..(r + 1) * n]);
    }
    out
}

/// Produce individual residuals for a constraint (r_i = 0 when satisfied).
fn constraint_residuals(c: &Constraint, params: &[f64], entities: &[SketchEntity], out: &mut Vec<f64>) {
    match c {
        Constraint::Coincident { point_a, point_b } => {
            let (ax, ay) = entity_point(entities, *point_a, params);
            let (bx, by) = entity_point(entities, *point_b, params);
            out.push(ax - bx);
            out.push(ay - by);
        }
        Constraint::Distance { point_a, point_b, value } => {
            let (ax, ay) = entity_point(entities, *point_a, params);
            let (bx, by) = entity_point(entities, *point_b, params);
            let dist_sq = (ax - bx).powi(2) + (ay - by).powi(2);
            // Use squared distance residual to avoid sqrt derivative singularity at 0
            out.push(dist_sq - value * value);
        }
        Constraint::Horizontal { line } => {
            if let SketchEntity::Line { start_param, end_param } = &entities[*line] {
                out.push(params[start_param + 1] - params[end_param + 1]);
            }
        }
        Constraint::Vertical { line } => {
            if let SketchEntity::Line { start_param, end_param } = &entities[*line] {
                out.push(params[*start_param] - params[*end_param]);
            }
        }
        Constraint::Fixed { point, x, y } => {
            let (px, py) = entity_point(entities, *point, params);
            out.push(px - x);
            out.push(py - y);
        }
        Constraint::Radius { entity, value } => {
            if let SketchEntity::Circle { radius_param, .. } = &entities[*entity] {
                out.push(params[*radius_param] - value);
            }
        }
        Constraint::Parallel { line_a, line_b } => {
            let (dx_a, dy_a) = line_direction(entities, *line_a, params);
            let (dx_b, dy_b) = line_direction(entities, *line_b, params);
            out.push(dx_a * dy_b - dy_a * dx_b);
        }
        Constraint::Perpendicular { line_a, line_b } => {
            let (dx_a, dy_a) = line_direction(entities, *line_a, params);
            let (dx_b, dy_b) = line_direction(entities, *line_b, params);
            out.push(dx_a * dx_b + dy_a * dy_b);
        }
        Constraint::Angle { line_a, line_b, value } => {
            let (dx_a, dy_a) = line_direction(entities, *line_a, params);
            let (dx_b, dy_b) = line_direction(entities, *line_b, params);
            let cross = dx_a * dy_b - dy_a * dx_b;
            let dot = dx_a * dx_b + dy_a * dy_b;
            out.push(cross - dot * value.tan());
        }
        Constraint::Equal { entity_a, entity_b } => {
            let len_a = entity_length(entities, *entity_a, params);
            let len_b = entity_length(entities, *entity_b, params);
            out.push(len_a - len_b);
        }
        Constraint::PointOnEntity { point, entity } => {
            point_on_entity_residual(entities, *point, *entity, params, out);
        }
        Constraint::Symmetric { point_a, point_b, axis } => {
            symmetric_residual(entities, *point_a, *point_b, *axis, params, out);
        }
        Constraint::Tangent { entity_a, entity_b } => {
            tangent_residual_vec(entities, *entity_a, *entity_b, params, out);
        }
        Constraint::Midpoint { point, line } => {
            let (px, py) = entity_point(entities, *point, params);
            if let SketchEntity::Line { start_param, end_param } = &entities[*line] {
                let mx = (params[*start_param] + params[*end_param]) / 2.0;
                let my = (params[start_param + 1] + params[end_param + 1]) / 2.0;
                out.push(px - mx);
                out.push(py - my);
            }
        }
        Constraint::Concentric { entity_a, entity_b } => {
            let (ax, ay) = entity_point(entities, *entity_a, params);
            let (bx, by) = entity_point(entities, *entity_b, params);
            out.push(ax - bx);
            out.push(ay - by);
        }
        Constraint::SymmetricH { point_a, point_b } => {
            let (ax, ay) = entity_point(entities, *point_a, params);
            let (bx, by) = entity_point(entities, *point_b, params);
            out.push(ax + bx);
            out.push(ay - by);
        }
        Constraint::SymmetricV { point_a, point_b } => {
            let (ax, ay) = entity_point(entities, *point_a, params);
            let (bx, by) = entity_point(entities, *point_b, params);
            out.push(ax - bx);
            out.push(ay + by);
        }
        Constraint::EqualPointToLineDistance { point_a, point_b, line } => {
            let da = point_to_line_distance(entities, *point_a, *line, params);
            let db = point_to_line_distance(entities, *point_b, *line, params);
            if let (Some(da), Some(db)) = (da, db) {
                out.push(da.abs() - db.abs());
            }
        }
    }
}

/// Signed perpendicular distance from a point to a line entity, or `None`
/// when the line is degenerate.
fn point_to_line_distance(
    entities: &[SketchEntity],
    point_idx: usize,
    line_idx: usize,
    params: &[f64],
) -> Option<f64> {
    let (px, py) = entity_point(entities, point_idx, params);
    if let SketchEntity::Line { start_param, end_param } = &entities[line_idx] {
        let ax = params[*start_param];
        let ay = params[start_param + 1];
        let bx = params[*end_param];
        let by = params[end_param + 1];
        let dx = bx - ax;
        let dy = by - ay;
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1e-15 {
            return None;
        }
        Some(((px - ax) * dy - (py - ay) * dx) / len)
    } else {
        None
    }
}

/// Compute Jacobian rows for a single constraint. Returns number of rows written.
fn constraint_jacobian(
    c: &Constraint,
    params: &[f64],
    entities: &[SketchEntity],
    n: usize,
    jac: &mut [f64],
    start_row: usize,
) -> usize {
    match c {
        Constraint::Coincident { point_a, point_b } => {
            let pi_a = param_indices_for_point(entities, *point_a);
            let pi_b = param_indices_for_point(entities, *point_b);
            if let (Some((ax, ay)), Some((bx, by))) = (pi_a, pi_b) {
                // r0 = params[ax] - params[bx], r1 = params[ay] - params[by]
                jac[start_row * n + ax] = 1.0;
                jac[start_row * n + bx] = -1.0;
                jac[(start_row + 1) * n + ay] = 1.0;
                jac[(start_row + 1) * n + by] = -1.0;
            }
            2
        }
        Constraint::Distance { point_a, point_b, .. } => {
            let pi_a = param_indices_for_point(entities, *point_a);
            let pi_b = param_indices_for_point(entities, *point_b);
            if let (Some((ax_i, ay_i)), Some((bx_i, by_i))) = (pi_a, pi_b) {
                let ax = params[ax_i];
                let ay = params[ay_i];
                let bx = params[bx_i];
                let by = params[by_i];
                // r = (ax-bx)^2 + (ay-by)^2 - d^2
                // dr/d(ax) = 2*(ax-bx), etc.
                let r = start_row;
                jac[r * n + ax_i] = 2.0 * (ax - bx);
                jac[r * n + ay_i] = 2.0 * (ay - by);
                jac[r * n + bx_i] = -2.0 * (ax - bx);
                jac[r * n + by_i] = -2.0 * (ay - by);
            }
            1
        }
        Constraint::Horizontal { line } => {
            if let SketchEntity::Line { start_param, end_param } = &entities[*line] {
                // r = y1 - y2
                jac[start_row * n + start_param + 1] = 1.0;
                jac[start_row * n + end_param + 1] = -1.0;
            }
            1
        }
        Constraint::Vertical { line } => {
            if let SketchEntity::Line { start_param, end_param } = &entities[*line] {
                // r = x1 - x2
                jac[start_row * n + *start_param] = 1.0;
                jac[start_row * n + *end_param] = -1.0;
            }
            1
        }
        Constraint::Fixed { point, .. } => {
            if let Some((px, py)) = param_indices_for_point(entities, *point) {
                jac[start_row * n + px] = 1.0;
                jac[(start_row + 1) * n + py] = 1.0;
            }
            2
        }
        Constraint::Radius { entity, .. } => {
            if let SketchEntity::Circle { radius_param, .. } = &entities[*entity] {
                jac[start_row * n + *radius_param] = 1.0;
            }
            1
        }
        Constraint::Parallel { line_a, line_b } => {
            // r = dx_a * dy_b - dy_a * dx_b
            if let (
                SketchEntity::Line { start_param: sa, end_param: ea },
                SketchEntity::Line { start_param: sb, end_param: eb },
            ) = (&entities[*line_a], &entities[*line_b]) {
                let dx_a = params[*ea] - params[*sa];
                let dy_a = params[ea + 1] - params[sa + 1];
                let dx_b = params[*eb] - params[*sb];
                let dy_b = params[eb + 1] - params[sb + 1];
                let r = start_row;
                // dr/d(sa_x) = -dy_b, dr/d(ea_x) = dy_b
                // dr/d(sa_y) = dx_b,  dr/d(ea_y) = -dx_b
                // dr/d(sb_x) = dy_a,  dr/d(eb_x) = -dy_a
                // dr/d(sb_y) = -dx_a, dr/d(eb_y) = dx_a
                jac[r * n + *sa] += -dy_b;
                jac[r * n + *ea] += dy_b;
                jac[r * n + sa + 1] += dx_b;
                jac[r * n + ea + 1] += -dx_b;
                jac[r * n + *sb] += dy_a;
                jac[r * n + *eb] += -dy_a;
                jac[r * n + sb + 1] += -dx_a;
                jac[r * n + eb + 1] += dx_a;
            }
            1
        }
        Constraint::Perpendicular { line_a, line_b } => {
            // r = dx_a * dx_b + dy_a * dy_b
            if let (
                SketchEntity::Line { start_param: sa, end_param: ea },
                SketchEntity::Line { start_param: sb, end_param: eb },
            ) = (&entities[*line_a], &entities[*line_b]) {
                let dx_a = params[*ea] - params[*sa];
                let dy_a = params[ea + 1] - params[sa + 1];
                let dx_b = params[*eb] - params[*sb];
                let dy_b = params[eb + 1] - params[sb + 1];
                let r = start_row;
                jac[r * n + *sa] += -dx_b;
                jac[r * n + *ea] += dx_b;
                jac[r * n + sa + 1] += -dy_b;
                jac[r * n + ea + 1] += dy_b;
                jac[r * n + *sb] += -dx_a;
                jac[r * n + *eb] += dx_a;
                jac[r * n + sb + 1] += -dy_a;
                jac[r * n + eb + 1] += dy_a;
            }
            1
        }
        Constraint::Midpoint { point, line } => {
            if let (Some((px_i, py_i)), SketchEntity::Line { start_param, end_param }) =
                (param_indices_for_point(entities, *point), &entities[*line])
            {
                jac[start_row * n + px_i] = 1.0;
                jac[start_row * n + *start_param] = -0.5;
                jac[start_row * n + *end_param] = -0.5;
                jac[(start_row + 1) * n + py_i] = 1.0;
                jac[(start_row + 1) * n + start_param + 1] = -0.5;
                jac[(start_row + 1) * n + end_param + 1] = -0.5;
            }
            2
        }
        Constraint::Concentric { entity_a, entity_b } => {
            if let (Some((ax, ay)), Some((bx, by))) = (
                param_indices_for_point(entities, *entity_a),
                param_indices_for_point(entities, *entity_b),
            ) {
                jac[start_row * n + ax] = 1.0;
                jac[start_row * n + bx] = -1.0;
                jac[(start_row + 1) * n + ay] = 1.0;
                jac[(start_row + 1) * n + by] = -1.0;
            }
            2
        }
        Constraint::SymmetricH { point_a, point_b } => {
            if let (Some((ax, ay)), Some((bx, by))) = (
                param_indices_for_point(entities, *point_a),
                param_indices_for_point(entities, *point_b),
            ) {
                jac[start_row * n + ax] = 1.0;
                jac[start_row * n + bx] = 1.0;
                jac[(start_row + 1) * n + ay] = 1.0;
                jac[(start_row + 1) * n + by] = -1.0;
            }
            2
        }
        Constraint::SymmetricV { point_a, point_b } => {
            if let (Some((ax, ay)), Some((bx, by))) = (
                param_indices_for_point(entities, *point_a),
                param_indices_for_point(entities, *point_b),
            ) {
                jac[start_row * n + ax] = 1.0;
                jac[start_row * n + bx] = -1.0;
                jac[(start_row + 1) * n + ay] = 1.0;
                jac[(start_row + 1) * n + by] = 1.0;
            }
            2
        }
        Constraint::Angle { .. } => {
            // Finite difference fallback for angle
            let h = 1e-8;
            let mut r_base = Vec::new();
            constraint_residuals(c, params, entities, &mut r_base);
            let r_idx = start_row;
            for j in 0..n {
                let mut p_plus = params.to_vec();
                p_plus[j] += h;
                let mut r_plus = Vec::new();
                constraint_residuals(c, &p_plus, entities, &mut r_plus);
                if !r_plus.is_empty() && !r_base.is_empty() {
                    jac[r_idx * n + j] = (r_plus[0] - r_base[0]) / h;
                }
            }
            1
        }
        Constraint::Equal { .. } => {
            // Finite difference
            let h = 1e-8;
            let mut r_base = Vec::new();
            constraint_residuals(c, params, entities, &mut r_base);
            for j in 0..n {
                let mut p_plus = params.to_vec();
                p_plus[j] += h;
                let mut r_plus = Vec::new();
                constraint_residuals(c, &p_plus, entities, &mut r_plus);
                if !r_plus.is_empty() && !r_base.is_empty() {
                    jac[start_row * n + j] = (r_plus[0] - r_base[0]) / h;
                }
            }
            1
        }
        Constraint::EqualPointToLineDistance { .. } => {
            // Finite difference: distance-to-line is nonlinear in all four points.
            let h = 1e-8;
            let mut r_base = Vec::new();
            constraint_residuals(c, params, entities, &mut r_base);
            for j in 0..n {
                let mut p_plus = params.to_vec();
                p_plus[j] += h;
                let mut r_plus = Vec::new();
                constraint_residuals(c, &p_plus, entities, &mut r_plus);
                if !r_plus.is_empty() && !r_base.is_empty() {
                    jac[start_row * n + j] = (r_plus[0] - r_base[0]) / h;
                }
            }
            1
        }
        Constraint::PointOnEntity { .. } => {
            let h = 1e-8;
            let mut r_base = Vec::new();
            constraint_residuals(c, params, entities, &mut r_base);
            let num = r_base.len();
            for ri in 0..num {
                for j in 0..n {
                    let mut p_plus = params.to_vec();
                    p_plus[j] += h;
                    let mut r_plus = Vec::new();
                    constraint_residuals(c, &p_plus, entities, &mut r_plus);
                    if ri < r_plus.len() && ri < r_base.len() {
                        jac[(start_row + ri) * n + j] = (r_plus[ri] - r_base[ri]) / h;
                    }
                }
            }
            num
        }
        Constraint::Symmetric { .. } => {
            let h = 1e-8;
            let mut r_base = Vec::new();
            constraint_residuals(c, params, entities, &mut r_base);
            let num = r_base.len();
            for ri in 0..num {
                for j in 0..n {
                    let mut p_plus = params.to_vec();
                    p_plus[j] += h;
                    let mut r_plus = Vec::new();
                    constraint_residuals(c, &p_plus, entities, &mut r_plus);
                    if ri < r_plus.len() && ri < r_base.len() {
                        jac[(start_row + ri) * n + j] = (r_plus[ri] - r_base[ri]) / h;
                    }
                }
            }
            num
        }
        Constraint::Tangent { .. } => {
            // Finite difference for tangent Jacobian
            let h = 1e-8;
            let mut r_base = Vec::new();
            constraint_residuals(c, params, entities, &mut r_base);
            let num = r_base.len();
            for ri in 0..num {
                for j in 0..n {
                    let mut p_plus = params.to_vec();
                    p_plus[j] += h;
                    let mut r_plus = Vec::new();
                    constraint_residuals(c, &p_plus, entities, &mut r_plus);
                    if ri < r_plus.len() && ri < r_base.len() {
                        jac[(start_row + ri) * n + j] = (r_plus[ri] - r_base[ri]) / h;
                    }
                }
            }
            num
        }
    }
}

fn entity_point(entities: &[SketchEntity], idx: usize, params: &[f64]) -> (f64, f64) {
    match &entities[idx] {
        SketchEntity::Point { param_index } => (params[*param_index], params[param_index + 1]),
        SketchEntity::Circle { center_param, .. } => {
            (params[*center_param], params[center_param + 1])
        }
        SketchEntity::Arc { center_param, .. } => {
            (params[*center_param], params[center_param + 1])
        }
        _ => (0.0, 0.0),
    }
}

fn param_indices_for_point(entities: &[SketchEntity], idx: usize) -> Option<(usize, usize)> {
    match &entities[idx] {
        SketchEntity::Point { param_index } => Some((*param_index, param_index + 1)),
        SketchEntity::Circle { center_param, .. } => Some((*center_param, center_param + 1)),
        SketchEntity::Arc { center_param, .. } => Some((*center_param, center_param + 1)),
        _ => None,
    }
}

fn line_direction(entities: &[SketchEntity], idx: usize, params: &[f64]) -> (f64, f64) {
    if let SketchEntity::Line { start_param, end_param } = &entities[idx] {
        (params[*end_param] - params[*start_param], params[end_param + 1] - params[start_param + 1])
    } else {
        (1.0, 0.0)
    }
}

fn entity_length(entities: &[SketchEntity], idx: usize, params: &[f64]) -> f64 {
    match &entities[idx] {
        SketchEntity::Line { start_param, end_param } => {
            let dx = params[*end_param] - params[*start_param];
            let dy = params[end_param + 1] - params[start_param + 1];
            (dx * dx + dy * dy).sqrt()
        }
        SketchEntity::Circle { radius_param, .. } => params[*radius_param],
        _ => 0.0,
    }
}

fn point_on_entity_residual(
    entities: &[SketchEntity],
    point_idx: usize,
    entity_idx: usize,
    params: &[f64],
    out: &mut Vec<f64>,
) {
    let (px, py) = entity_point(entities, point_idx, params);
    match &entities[entity_idx] {
        SketchEntity::Line { start_param, end_param } => {
            // Point on line: cross product of (P - A) x (B - A) = 0
            let ax = params[*start_param];
            let ay = params[start_param + 1];
            let bx = params[*end_param];
            let by = params[end_param + 1];
            out.push((px - ax) * (by - ay) - (py - ay) * (bx - ax));
        }
        SketchEntity::Circle { center_param, radius_param } => {
            // Distance from center equals radius
            let cx = params[*center_param];
            let cy = params[center_param + 1];
            let r = params[*radius_param];
            out.push((px - cx).powi(2) + (py - cy).powi(2) - r * r);
        }
        _ => {}
    }
}

fn symmetric_residual(
    entities: &[SketchEntity],
    point_a: usize,
    point_b: usize,
    axis: usize,
    params: &[f64],
    out: &mut Vec<f64>,
) {
    let (ax, ay) = entity_point(entities, point_a, params);
    let (bx, by) = entity_point(entities, point_b, params);

    if let SketchEntity::Line { start_param, end_param } = &entities[axis] {
        let lx0 = params[*start_param];
        let ly0 = params[start_param + 1];
        let lx1 = params[*end_param];
        let ly1 = params[end_param + 1];
        let dx = lx1 - lx0;
        let dy = ly1 - ly0;
        let len_sq = dx * dx + dy * dy;
        if len_sq > 1e-20 {
            // Midpoint of A and B should lie on the axis line
            let mx = (ax + bx) / 2.0;
            let my = (ay + by) / 2.0;
            let cross = (mx - lx0) * dy - (my - ly0) * dx;
            out.push(cross);
            // Vector A->B should be perpendicular to axis
            let dot = (bx - ax) * dx + (by - ay) * dy;
            out.push(dot);
        }
    }
}

fn tangent_residual_vec(
    entities: &[SketchEntity],
    a: usize,
    b: usize,
    params: &[f64],
    out: &mut Vec<f64>,
) {
    match (&entities[a], &entities[b]) {
        (SketchEntity::Line { start_param, end_param }, SketchEntity::Circle { center_param, radius_param }) |
        (SketchEntity::Circle { center_param, radius_param }, SketchEntity::Line { start_param, end_param }) => {
            let ax = params[*start_param];
            let ay = params[start_param + 1];
            let bx = params[*end_param];
            let by = params[end_param + 1];
            let cx = params[*center_param];
            let cy = params[center_param + 1];
            let r = params[*radius_param];
            let dx = bx - ax;
            let dy = by - ay;
            let len_sq = dx * dx + dy * dy;
            // Residual: cross_product^2 / len_sq - r^2 = 0
            // Using: (distance_to_line)^2 = cross^2 / len_sq
            let cross = (cx - ax) * dy - (cy - ay) * dx;
            out.push(cross * cross / len_sq.max(1e-20) - r * r);
        }
        (SketchEntity::Circle { center_param: ca, radius_param: ra }, SketchEntity::Circle { center_param: cb, radius_param: rb }) => {
            let ax = params[*ca];
            let ay = params[ca + 1];
            let bx = params[*cb];
            let by = params[cb + 1];
            let r_a = params[*ra];
            let r_b = params[*rb];
            let dist_sq = (ax - bx).powi(2) + (ay - by).powi(2);
            // External tangency: dist^2 - (ra + rb)^2 = 0
            out.push(dist_sq - (r_a + r_b).powi(2));
        }
        _ => {}
    }
}

/// Solve a dense linear system A*x = b using Gaussian elimination with partial pivoting.
/// A is n x n in row-major. Returns None if singular.
fn solve_linear_system(a: &[f64], b: &[f64], n: usize) -> Option<Vec<f64>> {
    // Augmented matrix [A|b]
    let mut aug = vec![0.0; n * (n + 1)];
    for i in 0..n {
        for j in 0..n {
            aug[i * (n + 1) + j] = a[i * n + j];
        }
        aug[i * (n + 1) + n] = b[i];
    }

    // Forward elimination with partial pivoting
    for col in 0..n {
        // Find pivot
        let mut max_val = aug[col * (n + 1) + col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let val = aug[row * (n + 1) + col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < 1e-15 {
            return None; // singular
        }

        // Swap rows
        if max_row != col {
            for j in 0..=n {
                let tmp = aug[col * (n + 1) + j];
                aug[col * (n + 1) + j] = aug[max_row * (n + 1) + j];
                aug[max_row * (n + 1) + j] = tmp;
            }
        }

        // Eliminate below
        let pivot = aug[col * (n + 1) + col];
        for row in (col + 1)..n {
            let factor = aug[row * (n + 1) + col] / pivot;
            for j in col..=n {
                aug[row * (n + 1) + j] -= factor * aug[col * (n + 1) + j];
            }
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = aug[i * (n + 1) + n];
        for j in (i + 1)..n {
            sum -= aug[i * (n + 1) + j] * x[j];
        }
        let diag = aug[i * (n + 1) + i];
        if diag.abs() < 1e-15 {
            return None;
        }
        x[i] = sum / diag;
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::sketch::Sketch;

    #[test]
    fn test_solve_horizontal_constraint() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 5.0);
        let line = sketch.add_line(p1, p2);

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Horizontal { line });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let result = result.unwrap();
        assert!(result.converged);
        assert!(result.final_residual < 1e-8);

        let (_, y1) = sketch.point_position(p1);
        let (_, y2) = sketch.point_position(p2);
        assert!((y1 - y2).abs() < 1e-6, "Line not horizontal: y1={}, y2={}", y1, y2);
    }

    #[test]
    fn test_solve_distance_constraint() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(3.0, 4.0);

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Distance { point_a: p1, point_b: p2, value: 10.0 });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver error: {:?}", result.err());

        let (x2, y2) = sketch.point_position(p2);
        let dist = (x2 * x2 + y2 * y2).sqrt();
        assert!((dist - 10.0).abs() < 0.01, "Distance is {} instead of 10.0", dist);
    }

    #[test]
    fn test_solve_already_satisfied() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 0.0);
        let line = sketch.add_line(p1, p2);

        sketch.add_constraint(Constraint::Horizontal { line });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_solve_vertical_constraint() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(3.0, 10.0);
        let line = sketch.add_line(p1, p2);

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Vertical { line });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (x1, _) = sketch.point_position(p1);
        let (x2, _) = sketch.point_position(p2);
        assert!((x1 - x2).abs() < 1e-6, "Line not vertical: x1={}, x2={}", x1, x2);
    }

    #[test]
    fn test_solve_perpendicular_constraint() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 0.0);
        let p3 = sketch.add_point(0.0, 0.0);
        let p4 = sketch.add_point(3.0, 5.0);
        let l1 = sketch.add_line(p1, p2);
        let l2 = sketch.add_line(p3, p4);

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p2, x: 10.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p3, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Perpendicular { line_a: l1, line_b: l2 });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (x4, _y4) = sketch.point_position(p4);
        // p4 should have moved so that l2 is vertical (perpendicular to horizontal l1)
        assert!(x4.abs() < 0.1, "Expected x4 near 0, got {}", x4);
    }

    #[test]
    fn test_solve_coincident_constraint() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(5.0, 3.0);
        let p2 = sketch.add_point(8.0, 7.0);

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 5.0, y: 3.0 });
        sketch.add_constraint(Constraint::Coincident { point_a: p1, point_b: p2 });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (x1, y1) = sketch.point_position(p1);
        let (x2, y2) = sketch.point_position(p2);
        assert!((x1 - x2).abs() < 1e-6);
        assert!((y1 - y2).abs() < 1e-6);
    }

    #[test]
    fn test_solve_parallel_constraint() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 0.0);
        let p3 = sketch.add_point(0.0, 5.0);
        let p4 = sketch.add_point(7.0, 8.0); // not parallel initially
        let l1 = sketch.add_line(p1, p2);
        let l2 = sketch.add_line(p3, p4);

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p2, x: 10.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p3, x: 0.0, y: 5.0 });
        sketch.add_constraint(Constraint::Parallel { line_a: l1, line_b: l2 });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        // l2 should now be horizontal (parallel to l1)
        let (_, y3) = sketch.point_position(p3);
        let (_, y4) = sketch.point_position(p4);
        assert!((y3 - y4).abs() < 0.1, "Lines not parallel: y3={}, y4={}", y3, y4);
    }

    #[test]
    fn test_solve_multi_constraint_rectangle() {
        // Build a fully-constrained rectangle
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0);
        let p1 = sketch.add_point(9.0, 0.5);   // should become (10, 0)
        let p2 = sketch.add_point(9.5, 4.5);   // should become (10, 5)
        let p3 = sketch.add_point(0.5, 5.5);   // should become (0, 5)

        let l0 = sketch.add_line(p0, p1); // bottom
        let l1 = sketch.add_line(p1, p2); // right
        let l2 = sketch.add_line(p2, p3); // top
        let l3 = sketch.add_line(p3, p0); // left

        // Fix origin
        sketch.add_constraint(Constraint::Fixed { point: p0, x: 0.0, y: 0.0 });
        // Horizontal/vertical sides
        sketch.add_constraint(Constraint::Horizontal { line: l0 });
        sketch.add_constraint(Constraint::Horizontal { line: l2 });
        sketch.add_constraint(Constraint::Vertical { line: l1 });
        sketch.add_constraint(Constraint::Vertical { line: l3 });
        // Dimensions
        sketch.add_constraint(Constraint::Distance { point_a: p0, point_b: p1, value: 10.0 });
        sketch.add_constraint(Constraint::Distance { point_a: p1, point_b: p2, value: 5.0 });

        let config = SolverConfig { max_iterations: 200, ..SolverConfig::default() };
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (x0, y0) = sketch.point_position(p0);
        let (x1, y1) = sketch.point_position(p1);
        let (_x2, y2) = sketch.point_position(p2);
        let (_x3, _y3) = sketch.point_position(p3);

        assert!((x0 - 0.0).abs() < 0.1, "p0.x = {}", x0);
        assert!((y0 - 0.0).abs() < 0.1, "p0.y = {}", y0);
        assert!((x1 - 10.0).abs() < 0.5, "p1.x = {}", x1);
        assert!((y1 - 0.0).abs() < 0.1, "p1.y = {}", y1);
        assert!((y2 - 5.0).abs() < 0.5, "p2.y = {}", y2);
    }

    #[test]
    fn test_solve_radius_constraint() {
        let mut sketch = Sketch::new();
        let c = sketch.add_circle(0.0, 0.0, 3.0);

        sketch.add_constraint(Constraint::Radius { entity: c, value: 10.0 });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok());

        if let SketchEntity::Circle { radius_param, .. } = &sketch.entities[c] {
            assert!((sketch.params[*radius_param] - 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_solve_angle_constraint() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 0.0);
        let p3 = sketch.add_point(0.0, 0.0);
        let p4 = sketch.add_point(5.0, 5.0);
        let l1 = sketch.add_line(p1, p2);
        let l2 = sketch.add_line(p3, p4);

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p2, x: 10.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p3, x: 0.0, y: 0.0 });
        // 45 degrees
        sketch.add_constraint(Constraint::Angle {
            line_a: l1,
            line_b: l2,
            value: std::f64::consts::FRAC_PI_4,
        });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (x4, y4) = sketch.point_position(p4);
        // At 45 degrees, x4 should approximately equal y4
        assert!((x4 - y4).abs() < 0.5, "Expected 45-degree line: x4={x4}, y4={y4}");
    }

    #[test]
    fn test_solve_equal_constraint() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 0.0);
        let p3 = sketch.add_point(0.0, 5.0);
        let p4 = sketch.add_point(3.0, 5.0);
        let l1 = sketch.add_line(p1, p2);
        let l2 = sketch.add_line(p3, p4);

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p2, x: 10.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p3, x: 0.0, y: 5.0 });
        sketch.add_constraint(Constraint::Equal { entity_a: l1, entity_b: l2 });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        // l2 should now have length 10 (same as l1)
        let (x3, y3) = sketch.point_position(p3);
        let (x4, y4) = sketch.point_position(p4);
        let len = ((x4 - x3).powi(2) + (y4 - y3).powi(2)).sqrt();
        assert!((len - 10.0).abs() < 0.5, "Expected equal length 10, got {len}");
    }

    #[test]
    fn test_solve_point_on_line() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 0.0);
        let line = sketch.add_line(p1, p2);
        let p3 = sketch.add_point(5.0, 3.0); // off the line

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p2, x: 10.0, y: 0.0 });
        sketch.add_constraint(Constraint::PointOnEntity { point: p3, entity: line });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (_, y3) = sketch.point_position(p3);
        assert!(y3.abs() < 0.1, "Point should be on horizontal line, y3={y3}");
    }

    #[test]
    fn test_solve_point_on_circle() {
        let mut sketch = Sketch::new();
        let c = sketch.add_circle(0.0, 0.0, 5.0);
        let p = sketch.add_point(3.0, 1.0); // not on circle

        // Fix circle center and radius, let point move onto circle
        sketch.add_constraint(Constraint::Fixed { point: c, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Radius { entity: c, value: 5.0 });
        sketch.add_constraint(Constraint::PointOnEntity { point: p, entity: c });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (px, py) = sketch.point_position(p);
        let dist = (px * px + py * py).sqrt();
        assert!((dist - 5.0).abs() < 0.5, "Point should be on circle r=5, dist={dist}");
    }

    #[test]
    fn test_solve_symmetric_constraint() {
        let mut sketch = Sketch::new();
        // Axis: vertical line x=5
        let a1 = sketch.add_point(5.0, 0.0);
        let a2 = sketch.add_point(5.0, 10.0);
        let axis = sketch.add_line(a1, a2);

        let pa = sketch.add_point(2.0, 3.0);
        let pb = sketch.add_point(6.0, 3.0); // should become (8, 3) for symmetry about x=5

        sketch.add_constraint(Constraint::Fixed { point: a1, x: 5.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: a2, x: 5.0, y: 10.0 });
        sketch.add_constraint(Constraint::Fixed { point: pa, x: 2.0, y: 3.0 });
        sketch.add_constraint(Constraint::Symmetric { point_a: pa, point_b: pb, axis });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (xb, yb) = sketch.point_position(pb);
        assert!((xb - 8.0).abs() < 0.5, "Expected xb=8, got {xb}");
        assert!((yb - 3.0).abs() < 0.5, "Expected yb=3, got {yb}");
    }

    #[test]
    fn test_solve_tangent_line_circle() {
        let mut sketch = Sketch::new();
        let c = sketch.add_circle(0.0, 0.0, 5.0);
        let p1 = sketch.add_point(-10.0, 5.5);
        let p2 = sketch.add_point(10.0, 5.5);
        let line = sketch.add_line(p1, p2);

        // Fix circle and fix p1.x, let p1.y and p2.y be free to achieve tangency
        sketch.add_constraint(Constraint::Radius { entity: c, value: 5.0 });
        sketch.add_constraint(Constraint::Horizontal { line });
        sketch.add_constraint(Constraint::Tangent { entity_a: line, entity_b: c });

        let config = SolverConfig { max_iterations: 200, ..SolverConfig::default() };
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (_, y1) = sketch.point_position(p1);
        // Line should be tangent: y = 5 or y = -5
        assert!((y1.abs() - 5.0).abs() < 0.5, "Expected tangent at y=+/-5, got y1={y1}");
    }

    #[test]
    fn test_solve_midpoint_constraint() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0);
        let p1 = sketch.add_point(10.0, 0.0);
        let line = sketch.add_line(p0, p1);
        let m = sketch.add_point(2.0, 7.0); // not on the midpoint yet

        sketch.add_constraint(Constraint::Fixed { point: p0, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p1, x: 10.0, y: 0.0 });
        sketch.add_constraint(Constraint::Midpoint { point: m, line });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (mx, my) = sketch.point_position(m);
        assert!((mx - 5.0).abs() < 1e-4, "mx = {mx}");
        assert!(my.abs() < 1e-4, "my = {my}");
    }

    #[test]
    fn test_solve_concentric_constraint() {
        let mut sketch = Sketch::new();
        let c1 = sketch.add_circle(0.0, 0.0, 5.0);
        let c2 = sketch.add_circle(3.0, 4.0, 2.0);

        sketch.add_constraint(Constraint::Fixed { point: c1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Concentric { entity_a: c1, entity_b: c2 });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (c2x, c2y, _) = sketch.circle_geometry(c2);
        assert!(c2x.abs() < 1e-4, "c2x = {c2x}");
        assert!(c2y.abs() < 1e-4, "c2y = {c2y}");
    }

    #[test]
    fn test_solve_symmetric_h_constraint() {
        let mut sketch = Sketch::new();
        let pa = sketch.add_point(3.0, 4.0);
        let pb = sketch.add_point(-2.0, 1.0); // should become (-3, 4)

        sketch.add_constraint(Constraint::Fixed { point: pa, x: 3.0, y: 4.0 });
        sketch.add_constraint(Constraint::SymmetricH { point_a: pa, point_b: pb });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_ok(), "Solver failed: {:?}", result.err());

        let (bx, by) = sketch.point_position(pb);
        assert!((bx + 3.0).abs() < 1e-4, "bx = {bx}");
        assert!((by - 4.0).abs() < 1e-4, "by = {by}");
    }

    #[test]
    fn test_driven_point_pins_and_solves_rest() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 3.0);
        let line = sketch.add_line(p1, p2);
        sketch.add_constraint(Constraint::Horizontal { line });

        let config = SolverConfig::default();
        let driven = [DrivenPoint { entity: p1, x: 2.0, y: 2.0 }];
        let result = solve_sketch_driven(&mut sketch, &config, &driven).unwrap();
        assert!(result.converged);

        let (x1, y1) = sketch.point_position(p1);
        assert!((x1 - 2.0).abs() < 1e-9, "driven point moved: x1={x1}");
        assert!((y1 - 2.0).abs() < 1e-9, "driven point moved: y1={y1}");

        let (_, y2) = sketch.point_position(p2);
        assert!((y2 - 2.0).abs() < 1e-4, "line should follow the driven point, y2={y2}");
    }

    #[test]
    fn test_over_constrained_detection() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(3.0, 0.0);

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p2, x: 3.0, y: 0.0 });
        // Contradicts the Fixed above: no value of p2 satisfies both.
        sketch.add_constraint(Constraint::Distance { point_a: p1, point_b: p2, value: 100.0 });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config);
        assert!(result.is_err());
        match result.unwrap_err() {
            SolverError::OverConstrained { .. } | SolverError::DidNotConverge { .. } => {}
            other => panic!("expected OverConstrained or DidNotConverge, got {other:?}"),
        }
    }

    #[test]
    fn test_independent_components_solve_separately() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 4.0);
        let line_a = sketch.add_line(p1, p2);

        let p3 = sketch.add_point(0.0, 0.0);
        let p4 = sketch.add_point(3.0, 9.0);
        let line_b = sketch.add_line(p3, p4);

        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Horizontal { line: line_a });
        sketch.add_constraint(Constraint::Fixed { point: p3, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Vertical { line: line_b });

        let config = SolverConfig::default();
        let result = solve_sketch(&mut sketch, &config).unwrap();
        assert!(result.converged);
        assert_eq!(result.component_results.len(), 2);

        let (_, y2) = sketch.point_position(p2);
        assert!(y2.abs() < 1e-6, "line_a should be horizontal, y2={y2}");
        let (x4, _) = sketch.point_position(p4);
        assert!(x4.abs() < 1e-6, "line_b should be vertical, x4={x4}");
    }

    #[test]
    fn test_linear_system_solve() {
        // 2x + y = 5
        // x + 3y = 7
        // Solution: x = 8/5, y = 9/5
        let a = vec![2.0, 1.0, 1.0, 3.0];
        let b = vec![5.0, 7.0];
        let x = solve_linear_system(&a, &b, 2).unwrap();
        assert!((x[0] - 1.6).abs() < 1e-10);
        assert!((x[1] - 1.8).abs() < 1e-10);
    }
}
