//! Adapts the raw `solidtype-kernel` operations (which work in terms of
//! `EntityStore` + slotmap ids) into the uniform [`KernelBundle`] interface
//! the feature engine drives. This is the "modeling_ops" layer of §2's
//! dataflow: it sits between Modeling (M) + Boolean (B) and the feature
//! pipeline, and is where persistent-naming provenance (§4.7) gets recorded.

use solidtype_kernel::boolean::engine::{BoolOp, BooleanFailure};
use solidtype_kernel::boolean::general::planar_boolean_general;
use solidtype_kernel::geometry::point::Point3d;
use solidtype_kernel::geometry::vector::Vec3;
use solidtype_kernel::operations::extrude::{extrude_profile, Profile};
use solidtype_kernel::operations::revolve::revolve_profile;
use solidtype_kernel::topology::brep::{EntityStore, FaceId, SolidId};
use solidtype_kernel::topology::primitives::{make_box, make_cone, make_cylinder, make_sphere, make_torus};
use solidtype_kernel::validation::{BRepValidator, ValidationConfig};
use solidtype_kernel::Tolerance;
use solidtype_types::{OutputKey, Role};
use uuid::Uuid;

use crate::fingerprint::face_signature;
use crate::types::{
    BooleanKind, CreatedEntity, KernelError, KernelId, KernelSolidHandle, OpError, OpResult,
    Provenance,
};

/// Parameters for the five canonical primitives (§4.5 "Primitives").
#[derive(Debug, Clone)]
pub enum PrimitiveParams {
    Box { width: f64, depth: f64, height: f64, center: [f64; 3] },
    Cylinder { radius: f64, height: f64, center: [f64; 3] },
    Sphere { radius: f64, center: [f64; 3] },
    Cone { radius: f64, height: f64, center: [f64; 3] },
    Torus { major_radius: f64, minor_radius: f64, center: [f64; 3] },
}

/// The uniform interface the feature engine drives. Implemented once, by
/// [`RealKernel`]; kept as a trait (object-safe) so alternative backends
/// (e.g. a future curved-surface boolean engine, per §4.6's extension hook)
/// can be substituted without touching `feature-engine`.
pub trait KernelBundle {
    fn store(&self) -> &EntityStore;
    fn store_mut(&mut self) -> &mut EntityStore;
    fn tolerance(&self) -> &Tolerance;

    fn resolve_handle(&self, handle: &KernelSolidHandle) -> Result<SolidId, KernelError>;

    fn execute_primitive(&mut self, params: &PrimitiveParams) -> Result<OpResult, OpError>;

    /// Turn closed sketch loops (already realized as 3D point lists on the
    /// sketch plane) into extrude/revolve-ready profiles. Only the outer
    /// loop of each profile is realized; inner loops (holes) are accepted by
    /// the data model (§3) but not yet threaded through extrude/revolve —
    /// see DESIGN.md for this open question's resolution.
    fn realize_profile(&self, outer_loop_world_points: &[Point3d]) -> Result<Vec<Point3d>, OpError>;

    fn execute_extrude(
        &mut self,
        profile: &[Point3d],
        direction: [f64; 3],
        distance: f64,
    ) -> Result<OpResult, OpError>;

    fn execute_revolve(
        &mut self,
        profile: &[Point3d],
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        angle: f64,
    ) -> Result<OpResult, OpError>;

    fn execute_boolean(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
        kind: BooleanKind,
    ) -> Result<OpResult, OpError>;

}

/// The one real `KernelBundle` implementation: an owned `EntityStore` plus
/// the session's tolerance (§3 "Numeric context"). There is deliberately no
/// mock backend — `EntityStore` is an in-memory arena with no I/O, so it is
/// already fast and deterministic enough to drive directly from tests.
pub struct RealKernel {
    pub store: EntityStore,
    pub tolerance: Tolerance,
    validator: BRepValidator,
}

impl RealKernel {
    pub fn new(tolerance: Tolerance) -> Self {
        let config = ValidationConfig::geometry();
        Self {
            store: EntityStore::new(),
            tolerance,
            validator: BRepValidator::new(config),
        }
    }

    fn new_handle(&self, solid_id: SolidId) -> KernelSolidHandle {
        KernelSolidHandle {
            solid_id,
            body_id: Uuid::new_v4(),
        }
    }

    /// Validate a freshly built solid (§7 "topologyError": "constructed
    /// topology fails validation after healing; publish nothing"). Healing
    /// itself lives in `solidtype_kernel::validation`; this adapter's job is
    /// just to refuse to publish a body whose validation reports errors.
    fn validate_or_reject(&self, solid_id: SolidId) -> Result<(), OpError> {
        let report = self.validator.validate(&self.store, solid_id);
        if !report.errors.is_empty() {
            return Err(OpError::Invalid {
                error_count: report.errors.len(),
                warning_count: report.warnings.len(),
            });
        }
        Ok(())
    }

    /// Diff the faces of a newly built solid against a role-assignment rule
    /// and populate `Provenance`. `classify` receives (face_index_in_creation_order,
    /// total_face_count) and returns the `Role` to assign.
    fn provenance_for_new_solid(
        &self,
        solid_id: SolidId,
        classify: impl Fn(usize, usize) -> Role,
    ) -> Provenance {
        let solid = &self.store.solids[solid_id];
        let mut created = Vec::new();
        let mut role_assignments = Vec::new();

        for &shell_id in &solid.shells {
            let shell = &self.store.shells[shell_id];
            let total = shell.faces.len();
            for (i, &face_id) in shell.faces.iter().enumerate() {
                let kernel_id = KernelId::Face(face_id);
                let role = classify(i, total);
                let signature = face_signature(&self.store, face_id);
                created.push(CreatedEntity {
                    kernel_id,
                    kind: solidtype_types::TopoKind::Face,
                    role: Some(role.clone()),
                    signature,
                });
                role_assignments.push((kernel_id, role));
            }
        }

        Provenance {
            created,
            deleted: Vec::new(),
            modified: Vec::new(),
            role_assignments,
        }
    }

}

impl KernelBundle for RealKernel {
    fn store(&self) -> &EntityStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    fn resolve_handle(&self, handle: &KernelSolidHandle) -> Result<SolidId, KernelError> {
        if self.store.solids.contains_key(handle.solid_id) {
            Ok(handle.solid_id)
        } else {
            Err(KernelError::UnknownSolid(*handle))
        }
    }

    #[tracing::instrument(skip(self))]
    fn execute_primitive(&mut self, params: &PrimitiveParams) -> Result<OpResult, OpError> {
        let solid_id = match *params {
            PrimitiveParams::Box { width, depth, height, center } => {
                if width <= 0.0 || depth <= 0.0 || height <= 0.0 {
                    return Err(OpError::Operation("box dimensions must be positive".into()));
                }
                let [cx, cy, cz] = center;
                make_box(
                    &mut self.store,
                    cx - width / 2.0,
                    cy - depth / 2.0,
                    cz - height / 2.0,
                    cx + width / 2.0,
                    cy + depth / 2.0,
                    cz + height / 2.0,
                )
            }
            PrimitiveParams::Cylinder { radius, height, center } => {
                if radius <= 0.0 || height <= 0.0 {
                    return Err(OpError::Operation("cylinder dimensions must be positive".into()));
                }
                let [cx, cy, cz] = center;
                make_cylinder(&mut self.store, Point3d::new(cx, cy, cz), radius, height, 32)
            }
            PrimitiveParams::Sphere { radius, center } => {
                if radius <= 0.0 {
                    return Err(OpError::Operation("sphere radius must be positive".into()));
                }
                let [cx, cy, cz] = center;
                make_sphere(&mut self.store, Point3d::new(cx, cy, cz), radius, 24, 12)
            }
            PrimitiveParams::Cone { radius, height, center } => {
                if radius <= 0.0 || height <= 0.0 {
                    return Err(OpError::Operation("cone dimensions must be positive".into()));
                }
                let [cx, cy, cz] = center;
                make_cone(&mut self.store, Point3d::new(cx, cy, cz), radius, 0.0, height, 32)
            }
            PrimitiveParams::Torus { major_radius, minor_radius, center } => {
                if major_radius <= 0.0 || minor_radius <= 0.0 || minor_radius >= major_radius {
                    return Err(OpError::Operation(
                        "torus requires 0 < minor_radius < major_radius".into(),
                    ));
                }
                let [cx, cy, cz] = center;
                make_torus(&mut self.store, Point3d::new(cx, cy, cz), major_radius, minor_radius, 24, 12)
            }
        };

        self.validate_or_reject(solid_id)?;
        let provenance = self.provenance_for_new_solid(solid_id, |i, _total| Role::PrimitiveFace { index: i });
        let handle = self.new_handle(solid_id);
        Ok(OpResult::single_body(OutputKey::Main, handle, provenance))
    }

    fn realize_profile(&self, outer_loop_world_points: &[Point3d]) -> Result<Vec<Point3d>, OpError> {
        if outer_loop_world_points.len() < 3 {
            return Err(OpError::InsufficientProfile {
                required: 3,
                provided: outer_loop_world_points.len(),
            });
        }
        Ok(outer_loop_world_points.to_vec())
    }

    #[tracing::instrument(skip(self, profile))]
    fn execute_extrude(
        &mut self,
        profile: &[Point3d],
        direction: [f64; 3],
        distance: f64,
    ) -> Result<OpResult, OpError> {
        if profile.len() < 3 {
            return Err(OpError::InsufficientProfile { required: 3, provided: profile.len() });
        }
        if distance.abs() < self.tolerance.coincidence {
            return Err(OpError::Operation("extrude distance must be non-zero".into()));
        }
        let dir = Vec3::new(direction[0], direction[1], direction[2]);
        if dir.length() < self.tolerance.coincidence {
            return Err(OpError::Operation("extrude direction has zero length".into()));
        }

        let prof = Profile::from_points(profile.to_vec());
        let solid_id = extrude_profile(&mut self.store, &prof, dir, distance);

        self.validate_or_reject(solid_id)?;
        let provenance = self.provenance_for_new_solid(solid_id, |i, _total| match i {
            0 => Role::EndCapNegative,
            1 => Role::EndCapPositive,
            n => Role::SideFace { index: n - 2 },
        });
        let handle = self.new_handle(solid_id);
        Ok(OpResult::single_body(OutputKey::Main, handle, provenance))
    }

    #[tracing::instrument(skip(self, profile))]
    fn execute_revolve(
        &mut self,
        profile: &[Point3d],
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        angle: f64,
    ) -> Result<OpResult, OpError> {
        if profile.len() < 2 {
            return Err(OpError::InsufficientProfile { required: 2, provided: profile.len() });
        }
        let axis_dir = Vec3::new(axis_direction[0], axis_direction[1], axis_direction[2]);
        if axis_dir.length() < self.tolerance.coincidence {
            return Err(OpError::Operation("revolve axis direction has zero length".into()));
        }
        let origin = Point3d::new(axis_origin[0], axis_origin[1], axis_origin[2]);

        let full_turn = (angle.abs() - std::f64::consts::TAU).abs() < 1e-9;
        let segments = ((angle.abs() / (std::f64::consts::PI / 12.0)).ceil() as usize).max(if full_turn { 8 } else { 3 });

        let solid_id = revolve_profile(&mut self.store, profile, origin, axis_dir, angle, segments);

        self.validate_or_reject(solid_id)?;
        let n_profile_edges = profile.len() - 1;
        let side_face_count = segments * n_profile_edges;
        let provenance = self.provenance_for_new_solid(solid_id, move |i, total| {
            if !full_turn && i >= side_face_count && total > side_face_count {
                if i == side_face_count {
                    Role::RevStartFace
                } else {
                    Role::RevEndFace
                }
            } else {
                Role::SideFace { index: i }
            }
        });
        let handle = self.new_handle(solid_id);
        Ok(OpResult::single_body(OutputKey::Main, handle, provenance))
    }

    #[tracing::instrument(skip(self))]
    fn execute_boolean(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
        kind: BooleanKind,
    ) -> Result<OpResult, OpError> {
        let solid_a = self.resolve_handle(a).map_err(|e| OpError::Boolean(e.to_string()))?;
        let solid_b = self.resolve_handle(b).map_err(|e| OpError::Boolean(e.to_string()))?;

        let op = match kind {
            BooleanKind::Union => BoolOp::Union,
            BooleanKind::Subtract => BoolOp::Difference,
            BooleanKind::Intersect => BoolOp::Intersection,
        };

        // Every solid this kernel builds is a planar-faceted approximation
        // (§0's "analytic surfaces only" constraint is enforced at
        // construction time in `topology::primitives`), so the general
        // planar pipeline is always applicable; going through it directly
        // (rather than `boolean_op`'s own AABB fast path) means the
        // session's configured tolerance is honored instead of the
        // kernel's hardcoded default.
        let solid_id = planar_boolean_general(&mut self.store, solid_a, solid_b, op, &self.tolerance)
            .map_err(map_boolean_failure)?;
        self.validate_or_reject(solid_id)?;

        // Per-face A/B provenance isn't recoverable from the boolean pipeline's
        // return value in this implementation (§4.6.3's tie-break recommends
        // vertex-id lexicographic ordering, but doesn't require surfacing the
        // source body per result face) — see DESIGN.md.
        let provenance = self.provenance_for_new_solid(solid_id, |i, _| Role::BooleanBodyAFace { index: i });
        let handle = self.new_handle(solid_id);
        Ok(OpResult::single_body(OutputKey::Main, handle, provenance))
    }

}

fn map_boolean_failure(failure: BooleanFailure) -> OpError {
    match failure {
        BooleanFailure::TopologyCorrupted { audit } => {
            OpError::Invalid { error_count: audit.errors.len(), warning_count: 0 }
        }
        other => OpError::Boolean(other.to_string()),
    }
}

/// Surface area of a planar face, used when diagnosing degenerate results
/// (§7: "a zero-area face warning"). Kept here rather than in the kernel
/// crate because it's only needed by this adapter's warning surfacing.
pub fn planar_face_area(store: &EntityStore, face_id: FaceId) -> f64 {
    let face = &store.faces[face_id];
    let loop_data = &store.loops[face.outer_loop];
    let pts: Vec<Point3d> = loop_data
        .half_edges
        .iter()
        .map(|&he| store.vertices[store.half_edges[he].start_vertex].point)
        .collect();
    if pts.len() < 3 {
        return 0.0;
    }
    let mut acc = Vec3::new(0.0, 0.0, 0.0);
    let origin = pts[0];
    for i in 1..pts.len() - 1 {
        let e1 = pts[i] - origin;
        let e2 = pts[i + 1] - origin;
        acc = acc + e1.cross(&e2);
    }
    0.5 * acc.length()
}
