//! `Session`: the host-facing entry point (§6). Wraps one [`Engine`] and its
//! backing [`RealKernel`], and exposes primitive/sketch-feature construction
//! as `ModelingResult` calls instead of raw `Engine`/`KernelBundle` plumbing.

use uuid::Uuid;

use solidtype_feature_engine::Engine;
use solidtype_kernel::Tolerance;
use solidtype_modeling_ops::kernel_bundle::RealKernel;
use solidtype_modeling_ops::sketch_bridge::solve_document_sketch;
use solidtype_modeling_ops::KernelSolidHandle;
use solidtype_solver::solver::SolverConfig;
use solidtype_types::{GeomRef, Sketch, SketchConstraint, SketchEntity, SolveStatus};

use crate::errors::{ModelingError, ModelingResult, Outcome};

/// One output body produced by a feature-creating `Session` call.
#[derive(Debug, Clone)]
pub struct FeatureOutput {
    pub feature_id: Uuid,
    pub handle: KernelSolidHandle,
}

/// Options shared by extrude/revolve calls (§4.5 "Extrude"/"Revolve").
#[derive(Debug, Clone)]
pub struct ExtrudeOptions {
    pub depth: f64,
    pub direction: Option<[f64; 3]>,
    pub symmetric: bool,
    pub cut: bool,
    pub target_body: Option<GeomRef>,
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            depth: 1.0,
            direction: None,
            symmetric: false,
            cut: false,
            target_body: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RevolveOptions {
    pub axis_origin: [f64; 3],
    pub axis_direction: [f64; 3],
    pub angle: f64,
}

impl Default for RevolveOptions {
    fn default() -> Self {
        Self {
            axis_origin: [0.0, 0.0, 0.0],
            axis_direction: [0.0, 0.0, 1.0],
            angle: std::f64::consts::TAU,
        }
    }
}

/// A sketch under construction before it is committed as a feature. Mirrors
/// the host's edit session: entities and constraints accumulate, then
/// `finish` runs the constraint solver and hands the solved sketch to
/// `Session::commit_sketch`.
pub struct SketchBuilder {
    plane: GeomRef,
    entities: Vec<SketchEntity>,
    constraints: Vec<SketchConstraint>,
}

impl SketchBuilder {
    pub fn add_entity(&mut self, entity: SketchEntity) -> &mut Self {
        self.entities.push(entity);
        self
    }

    pub fn add_constraint(&mut self, constraint: SketchConstraint) -> &mut Self {
        self.constraints.push(constraint);
        self
    }
}

/// The modeling session: a feature tree plus the kernel backing it.
pub struct Session {
    pub(crate) engine: Engine,
    pub(crate) kernel: RealKernel,
}

impl Session {
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            engine: Engine::new(),
            kernel: RealKernel::new(tolerance),
        }
    }

    /// Begin building a sketch on `plane` (§4.4 "Sketch").
    pub fn begin_sketch(&self, plane: GeomRef) -> SketchBuilder {
        SketchBuilder { plane, entities: Vec::new(), constraints: Vec::new() }
    }

    /// Commit the sketch as a feature. The committed operation carries the
    /// *unsolved* sketch — the engine re-runs the constraint solver against
    /// it on every rebuild that touches a feature referencing it (see
    /// `solidtype_feature_engine::rebuild::solved_sketch_clone`) — but this
    /// call also runs a preview solve so the caller immediately knows how
    /// many profiles are available and at what DOF, without waiting on a
    /// downstream extrude/revolve to trigger it.
    pub fn finish_sketch(&mut self, builder: SketchBuilder) -> ModelingResult<Sketch> {
        let sketch = Sketch {
            id: Uuid::new_v4(),
            plane: builder.plane,
            entities: builder.entities,
            constraints: builder.constraints,
            solve_status: SolveStatus::UnderConstrained { dof: 0 },
            solved_positions: Default::default(),
            solved_profiles: Vec::new(),
        };

        let mut preview = sketch.clone();
        let mut warnings = solve_document_sketch(&mut preview, &SolverConfig::default());
        if let SolveStatus::OverConstrained { ref conflicts } = preview.solve_status {
            warnings.push(format!("sketch is over-constrained ({} conflicting constraint(s))", conflicts.len()));
        }
        if let SolveStatus::SolveFailed { ref reason } = preview.solve_status {
            return Err(ModelingError::invalid_input(format!("sketch solve failed: {reason}")));
        }

        self.engine.add_feature(
            "Sketch".to_string(),
            solidtype_feature_engine::types::Operation::Sketch { sketch },
            &mut self.kernel,
        )?;

        Ok(Outcome::with_warnings(preview, warnings))
    }

    /// Extrude profile `profile_index` of `sketch` (§4.5 "Extrude").
    pub fn extrude(
        &mut self,
        sketch: &Sketch,
        profile_index: usize,
        opts: ExtrudeOptions,
    ) -> ModelingResult<FeatureOutput> {
        if profile_index >= sketch.solved_profiles.len() {
            return Err(ModelingError::invalid_input(format!(
                "profile index {} out of range (sketch has {} profile(s))",
                profile_index,
                sketch.solved_profiles.len()
            )));
        }

        let params = solidtype_feature_engine::types::ExtrudeParams {
            sketch_id: sketch.id,
            profile_index,
            depth: opts.depth,
            direction: opts.direction,
            symmetric: opts.symmetric,
            cut: opts.cut,
            target_body: opts.target_body,
        };
        self.commit_single_body("Extrude", solidtype_feature_engine::types::Operation::Extrude { params })
    }

    /// Revolve profile `profile_index` of `sketch` (§4.5 "Revolve").
    pub fn revolve(
        &mut self,
        sketch: &Sketch,
        profile_index: usize,
        opts: RevolveOptions,
    ) -> ModelingResult<FeatureOutput> {
        if profile_index >= sketch.solved_profiles.len() {
            return Err(ModelingError::invalid_input(format!(
                "profile index {} out of range (sketch has {} profile(s))",
                profile_index,
                sketch.solved_profiles.len()
            )));
        }

        let params = solidtype_feature_engine::types::RevolveParams {
            sketch_id: sketch.id,
            profile_index,
            axis_origin: opts.axis_origin,
            axis_direction: opts.axis_direction,
            angle: opts.angle,
        };
        self.commit_single_body("Revolve", solidtype_feature_engine::types::Operation::Revolve { params })
    }

    /// Create a box primitive (§4.5 "Primitives").
    pub fn create_box(&mut self, width: f64, depth: f64, height: f64, center: [f64; 3]) -> ModelingResult<FeatureOutput> {
        self.create_primitive(solidtype_feature_engine::types::PrimitiveParams::Box { width, depth, height, center })
    }

    pub fn create_cylinder(&mut self, radius: f64, height: f64, center: [f64; 3]) -> ModelingResult<FeatureOutput> {
        self.create_primitive(solidtype_feature_engine::types::PrimitiveParams::Cylinder { radius, height, center })
    }

    pub fn create_sphere(&mut self, radius: f64, center: [f64; 3]) -> ModelingResult<FeatureOutput> {
        self.create_primitive(solidtype_feature_engine::types::PrimitiveParams::Sphere { radius, center })
    }

    pub fn create_cone(&mut self, radius: f64, height: f64, center: [f64; 3]) -> ModelingResult<FeatureOutput> {
        self.create_primitive(solidtype_feature_engine::types::PrimitiveParams::Cone { radius, height, center })
    }

    pub fn create_torus(&mut self, major_radius: f64, minor_radius: f64, center: [f64; 3]) -> ModelingResult<FeatureOutput> {
        self.create_primitive(solidtype_feature_engine::types::PrimitiveParams::Torus { major_radius, minor_radius, center })
    }

    fn create_primitive(&mut self, params: solidtype_feature_engine::types::PrimitiveParams) -> ModelingResult<FeatureOutput> {
        self.commit_single_body("Primitive", solidtype_feature_engine::types::Operation::Primitive { params })
    }

    /// Boolean-combine two bodies (§4.6 "Boolean").
    pub fn boolean(
        &mut self,
        body_a: GeomRef,
        body_b: GeomRef,
        operation: solidtype_feature_engine::types::BooleanOp,
    ) -> ModelingResult<FeatureOutput> {
        let params = solidtype_feature_engine::types::BooleanParams { body_a, body_b, operation };
        self.commit_single_body(
            "Boolean Combine",
            solidtype_feature_engine::types::Operation::BooleanCombine { params },
        )
    }

    /// Suppress/unsuppress a feature and rebuild (§5 "Suppression").
    pub fn set_suppressed(&mut self, feature_id: Uuid, suppressed: bool) -> ModelingResult<()> {
        self.engine.set_suppressed(feature_id, suppressed, &mut self.kernel)?;
        Ok(Outcome::ok(()))
    }

    /// Remove a feature and rebuild.
    pub fn delete_feature(&mut self, feature_id: Uuid) -> ModelingResult<()> {
        self.engine.remove_feature(feature_id, &mut self.kernel)?;
        Ok(Outcome::ok(()))
    }

    /// Reorder a feature in the tree and rebuild (§5 "Reorder").
    pub fn reorder_feature(&mut self, feature_id: Uuid, new_position: usize) -> ModelingResult<()> {
        self.engine.reorder_feature(feature_id, new_position, &mut self.kernel)?;
        Ok(Outcome::ok(()))
    }

    pub fn rename_feature(&mut self, feature_id: Uuid, new_name: String) -> ModelingResult<()> {
        self.engine.rename_feature(feature_id, new_name)?;
        Ok(Outcome::ok(()))
    }

    /// Roll the feature tree back to (and including) `index`, or fully
    /// forward if `None` (§5 "Rollback").
    pub fn set_rollback(&mut self, index: Option<usize>) {
        self.engine.set_rollback(index, &mut self.kernel);
    }

    pub fn undo(&mut self) -> ModelingResult<()> {
        self.engine.undo(&mut self.kernel)?;
        Ok(Outcome::ok(()))
    }

    pub fn redo(&mut self) -> ModelingResult<()> {
        self.engine.redo(&mut self.kernel)?;
        Ok(Outcome::ok(()))
    }

    pub fn can_undo(&self) -> bool {
        self.engine.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.engine.can_redo()
    }

    /// Re-execute every active feature from scratch (§8 "rebuild
    /// determinism").
    pub fn rebuild_from_scratch(&mut self) {
        self.engine.rebuild_from_scratch(&mut self.kernel);
    }

    pub fn feature_tree(&self) -> &solidtype_feature_engine::types::FeatureTree {
        &self.engine.tree
    }

    pub fn warnings(&self) -> &[String] {
        &self.engine.warnings
    }

    fn commit_single_body(
        &mut self,
        name: &str,
        operation: solidtype_feature_engine::types::Operation,
    ) -> ModelingResult<FeatureOutput> {
        let feature_id = self.engine.add_feature(name.to_string(), operation, &mut self.kernel)?;

        if let Some((_, err)) = self.engine.errors.iter().find(|(id, _)| *id == feature_id) {
            return Err(ModelingError::internal(err.clone()));
        }

        let result = self
            .engine
            .get_result(feature_id)
            .ok_or_else(|| ModelingError::internal("feature produced no result"))?;
        let handle = result
            .outputs
            .iter()
            .find(|(key, _)| *key == solidtype_types::OutputKey::Main)
            .map(|(_, body)| body.handle)
            .ok_or_else(|| ModelingError::internal("feature produced no main body output"))?;

        Ok(Outcome::with_warnings(
            FeatureOutput { feature_id, handle },
            self.engine.warnings.clone(),
        ))
    }
}
