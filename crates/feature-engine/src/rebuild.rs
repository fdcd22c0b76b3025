use std::collections::HashMap;

use solidtype_kernel::geometry::surfaces::Plane;
use solidtype_modeling_ops::kernel_bundle::PrimitiveParams as KernelPrimitiveParams;
use solidtype_modeling_ops::sketch_bridge::{profile_to_world_points, solve_document_sketch};
use solidtype_modeling_ops::{BooleanKind, Diagnostics, KernelBundle, KernelSolidHandle, OpResult, Provenance};
use solidtype_solver::solver::SolverConfig;
use uuid::Uuid;

use crate::resolve::resolve_with_fallback;
use crate::types::{BooleanOp, EngineError, Feature, FeatureTree, Operation, PrimitiveParams};
use solidtype_types::Sketch;

/// State of the engine after a rebuild.
#[derive(Debug)]
pub struct RebuildState {
    /// OpResult for each successfully built feature.
    pub feature_results: HashMap<Uuid, OpResult>,
    /// Warnings accumulated during rebuild.
    pub warnings: Vec<String>,
    /// Features that failed to rebuild, with error messages.
    pub errors: Vec<(Uuid, String)>,
}

/// Rebuild the feature tree from scratch (or from a change point).
///
/// Replays features in order, resolving GeomRefs and executing operations.
pub fn rebuild(
    tree: &FeatureTree,
    kb: &mut dyn KernelBundle,
    from_index: usize,
    existing_results: &HashMap<Uuid, OpResult>,
) -> RebuildState {
    let mut state = RebuildState {
        feature_results: HashMap::new(),
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    // Carry forward results from features before the rebuild point
    for (id, result) in existing_results {
        state.feature_results.insert(*id, result.clone());
    }

    let active = tree.active_features();

    for (i, feature) in active.iter().enumerate() {
        if i < from_index {
            continue;
        }
        if feature.suppressed {
            continue;
        }

        // Resolve any GeomRef references before executing the feature
        resolve_feature_refs(feature, &state.feature_results, &mut state.warnings);

        match execute_feature(feature, kb, &state.feature_results, tree, &mut state.warnings) {
            Ok(result) => {
                state.feature_results.insert(feature.id, result);
            }
            Err(e) => {
                state.errors.push((feature.id, e.to_string()));
                // Continue rebuilding remaining features
            }
        }
    }

    state
}

/// Execute a single feature's operation.
fn execute_feature(
    feature: &Feature,
    kb: &mut dyn KernelBundle,
    feature_results: &HashMap<Uuid, OpResult>,
    tree: &FeatureTree,
    warnings: &mut Vec<String>,
) -> Result<OpResult, EngineError> {
    match &feature.operation {
        Operation::Sketch { .. } => {
            // Sketches don't produce OpResults directly; they store solved
            // geometry which downstream Extrude/Revolve features read.
            Ok(OpResult {
                outputs: Vec::new(),
                provenance: Provenance::default(),
                diagnostics: Diagnostics::default(),
            })
        }

        Operation::Primitive { params } => {
            let kernel_params = to_kernel_primitive_params(params);
            kb.execute_primitive(&kernel_params).map_err(|e| EngineError::ResolutionFailed {
                reason: e.to_string(),
            })
        }

        Operation::Extrude { params } => {
            let _sketch_result = find_sketch_result(params.sketch_id, feature_results)?;
            let sketch = solved_sketch_clone(params.sketch_id, tree, warnings)?;

            let direction = params.direction.unwrap_or([0.0, 0.0, 1.0]);

            if params.profile_index >= sketch.solved_profiles.len() {
                return Err(EngineError::ProfileOutOfRange {
                    index: params.profile_index,
                    count: sketch.solved_profiles.len(),
                });
            }

            // TODO: derive the sketch plane from `sketch.plane` once datum
            // planes are resolvable GeomRefs; every sketch is on XY for now.
            let plane = Plane::xy();
            let profile = &sketch.solved_profiles[params.profile_index];
            let world_points = profile_to_world_points(&sketch, profile, &plane)
                .map_err(|e| EngineError::ResolutionFailed { reason: e.to_string() })?;

            let depth = if params.symmetric { params.depth / 2.0 } else { params.depth };
            let signed_depth = if params.cut { -depth } else { depth };

            kb.execute_extrude(&world_points, direction, signed_depth)
                .map_err(|e| EngineError::ResolutionFailed { reason: e.to_string() })
        }

        Operation::Revolve { params } => {
            let _sketch_result = find_sketch_result(params.sketch_id, feature_results)?;
            let sketch = solved_sketch_clone(params.sketch_id, tree, warnings)?;

            if params.profile_index >= sketch.solved_profiles.len() {
                return Err(EngineError::ProfileOutOfRange {
                    index: params.profile_index,
                    count: sketch.solved_profiles.len(),
                });
            }

            let plane = Plane::xy();
            let profile = &sketch.solved_profiles[params.profile_index];
            let world_points = profile_to_world_points(&sketch, profile, &plane)
                .map_err(|e| EngineError::ResolutionFailed { reason: e.to_string() })?;

            kb.execute_revolve(&world_points, params.axis_origin, params.axis_direction, params.angle)
                .map_err(|e| EngineError::ResolutionFailed { reason: e.to_string() })
        }

        Operation::BooleanCombine { params } => {
            let handle_a = find_solid_handle(&params.body_a, feature_results)?;
            let handle_b = find_solid_handle(&params.body_b, feature_results)?;

            let kind = match params.operation {
                BooleanOp::Union => BooleanKind::Union,
                BooleanOp::Subtract => BooleanKind::Subtract,
                BooleanOp::Intersect => BooleanKind::Intersect,
            };

            kb.execute_boolean(&handle_a, &handle_b, kind)
                .map_err(|e| EngineError::ResolutionFailed { reason: e.to_string() })
        }
    }
}

fn to_kernel_primitive_params(params: &PrimitiveParams) -> KernelPrimitiveParams {
    match *params {
        PrimitiveParams::Box { width, depth, height, center } => {
            KernelPrimitiveParams::Box { width, depth, height, center }
        }
        PrimitiveParams::Cylinder { radius, height, center } => {
            KernelPrimitiveParams::Cylinder { radius, height, center }
        }
        PrimitiveParams::Sphere { radius, center } => KernelPrimitiveParams::Sphere { radius, center },
        PrimitiveParams::Cone { radius, height, center } => {
            KernelPrimitiveParams::Cone { radius, height, center }
        }
        PrimitiveParams::Torus { major_radius, minor_radius, center } => {
            KernelPrimitiveParams::Torus { major_radius, minor_radius, center }
        }
    }
}

/// Look up the authored sketch by feature id, solve a private clone of it,
/// and return the clone. The tree itself is never mutated by a rebuild, so
/// the authored (unsolved) sketch is re-solved each time it is referenced;
/// the solve is deterministic and cheap enough that this is simpler than
/// threading mutability through `FeatureTree`.
fn solved_sketch_clone(
    sketch_id: Uuid,
    tree: &FeatureTree,
    warnings: &mut Vec<String>,
) -> Result<Sketch, EngineError> {
    let sketch = find_sketch_in_tree(sketch_id, tree)?;
    let mut sketch = sketch.clone();
    let solve_warnings = solve_document_sketch(&mut sketch, &SolverConfig::default());
    warnings.extend(solve_warnings);
    Ok(sketch)
}

/// Find the Sketch data from a feature in the tree by sketch feature ID.
fn find_sketch_in_tree(sketch_id: Uuid, tree: &FeatureTree) -> Result<&Sketch, EngineError> {
    for feature in &tree.features {
        if feature.id == sketch_id {
            if let Operation::Sketch { sketch } = &feature.operation {
                return Ok(sketch);
            }
        }
    }
    Err(EngineError::SketchNotFound { id: sketch_id })
}

/// Find a sketch OpResult by sketch ID. Sketches produce empty OpResults
/// but need to exist in the tree.
fn find_sketch_result(
    sketch_id: Uuid,
    feature_results: &HashMap<Uuid, OpResult>,
) -> Result<&OpResult, EngineError> {
    feature_results
        .get(&sketch_id)
        .ok_or(EngineError::SketchNotFound { id: sketch_id })
}

/// Find the solid handle from a feature's OpResult via GeomRef.
fn find_solid_handle(
    geom_ref: &solidtype_types::GeomRef,
    feature_results: &HashMap<Uuid, OpResult>,
) -> Result<KernelSolidHandle, EngineError> {
    let (feature_id, output_key) = match &geom_ref.anchor {
        solidtype_types::Anchor::FeatureOutput { feature_id, output_key } => (*feature_id, output_key),
        _ => {
            return Err(EngineError::ResolutionFailed {
                reason: "Expected FeatureOutput anchor for solid handle".to_string(),
            });
        }
    };

    let op_result = feature_results
        .get(&feature_id)
        .ok_or(EngineError::ResolutionFailed {
            reason: format!("Feature {} not found in results", feature_id),
        })?;

    for (key, body_output) in &op_result.outputs {
        if key == output_key {
            return Ok(body_output.handle);
        }
    }

    Err(EngineError::ResolutionFailed {
        reason: format!("Output key {:?} not found in feature {}", output_key, feature_id),
    })
}

/// Resolve all GeomRef references for a feature, collecting warnings.
///
/// Currently `feature.references` is always empty, so this is
/// forward-compatible plumbing for when features carry explicit refs.
fn resolve_feature_refs(
    feature: &Feature,
    feature_results: &HashMap<Uuid, OpResult>,
    warnings: &mut Vec<String>,
) {
    for geom_ref in &feature.references {
        match resolve_with_fallback(geom_ref, feature_results) {
            Ok(resolved) => {
                warnings.extend(resolved.warnings);
            }
            Err(e) => {
                warnings.push(format!(
                    "Feature '{}': reference resolution warning: {}",
                    feature.name, e
                ));
            }
        }
    }
}
