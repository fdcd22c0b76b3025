//! Read-only queries over a [`crate::Session`]'s current model state: body
//! and face listings, persistent-ref lookup/resolution, ray-pick, and mesh
//! export (§6 "Queries", "Ray-pick", "Mesh export").

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use solidtype_kernel::geometry::point::Point3d;
use solidtype_kernel::geometry::surfaces::Surface;
use solidtype_kernel::geometry::vector::Vec3;
use solidtype_kernel::topology::brep::{EntityStore, FaceId, SolidId};
use solidtype_modeling_ops::{KernelId, KernelSolidHandle};
use solidtype_tessellation::TriangleMesh;
use solidtype_types::{Anchor, GeomRef, OutputKey, ResolvePolicy, Role, Selector, TopoKind};

use crate::errors::{ErrorCategory, ModelingError};
use crate::Session;

/// One body known to the session, as returned by `list_bodies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodySummary {
    pub feature_id: Uuid,
    pub handle: KernelSolidHandle,
    pub face_count: usize,
}

/// One face of a body, as returned by `list_faces`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceSummary {
    pub index: usize,
    pub surface_kind: &'static str,
    pub role: Option<Role>,
}

/// Result of a ray-pick (§6 "Ray-pick"): the nearest face hit, plus its
/// stable reference and the hit geometry.
#[derive(Debug, Clone)]
pub struct PickHit {
    pub geom_ref: GeomRef,
    pub face_id: FaceId,
    pub point: Point3d,
    pub distance: f64,
}

impl Session {
    /// List every body produced by the current (active) feature list, in
    /// feature-tree order.
    pub fn list_bodies(&self) -> Vec<BodySummary> {
        let mut out = Vec::new();
        for feature in self.engine.tree.active_features() {
            if feature.suppressed {
                continue;
            }
            if let Some(result) = self.engine.get_result(feature.id) {
                for (key, body) in &result.outputs {
                    if *key != OutputKey::Main && !matches!(key, OutputKey::Body { .. }) {
                        continue;
                    }
                    let face_count = self.kernel.store.solids[body.handle.solid_id]
                        .shells
                        .iter()
                        .map(|&sh| self.kernel.store.shells[sh].faces.len())
                        .sum();
                    out.push(BodySummary {
                        feature_id: feature.id,
                        handle: body.handle,
                        face_count,
                    });
                }
            }
        }
        out
    }

    /// List the faces of a body, in creation order, with whatever semantic
    /// role the producing feature assigned.
    pub fn list_faces(&self, body: &KernelSolidHandle) -> Result<Vec<FaceSummary>, ModelingError> {
        let solid_id = self.resolve_solid(body)?;
        let role_by_face = self.role_lookup(body);

        let mut out = Vec::new();
        let mut index = 0;
        for &shell_id in &self.kernel.store.solids[solid_id].shells {
            for &face_id in &self.kernel.store.shells[shell_id].faces {
                let face = &self.kernel.store.faces[face_id];
                out.push(FaceSummary {
                    index,
                    surface_kind: surface_kind_name(&face.surface),
                    role: role_by_face.get(&face_id).cloned(),
                });
                index += 1;
            }
        }
        Ok(out)
    }

    /// Build the persistent reference for one face of a body (§4.7). Looks
    /// up the feature that produced the body and, if that feature assigned
    /// a semantic role to the face, anchors the ref by role; otherwise
    /// falls back to a signature selector.
    pub fn face_persistent_ref(
        &self,
        body: &KernelSolidHandle,
        face_index: usize,
    ) -> Result<GeomRef, ModelingError> {
        let (feature_id, face_id) = self.nth_face(body, face_index)?;
        let role_by_face = self.role_lookup(body);

        let selector = if let Some(role) = role_by_face.get(&face_id) {
            let index_within_role = role_by_face
                .iter()
                .filter(|(_, r)| *r == role)
                .filter(|(f, _)| self.face_precedes(body, f, &face_id))
                .count();
            Selector::Role { role: role.clone(), index: index_within_role }
        } else {
            let sig = solidtype_modeling_ops::fingerprint::face_signature(&self.kernel.store, face_id);
            Selector::Signature { signature: sig }
        };

        Ok(GeomRef {
            kind: TopoKind::Face,
            anchor: Anchor::FeatureOutput { feature_id, output_key: OutputKey::Main },
            selector,
            policy: ResolvePolicy::BestEffort,
        })
    }

    /// Resolve a persistent ref against the current model state (§4.7
    /// "Resolution"). Returns the live kernel id, or `notFound`/`ambiguous`
    /// folded into `ModelingError::GeometryError`.
    pub fn resolve_ref(&self, geom_ref: &GeomRef) -> Result<KernelId, ModelingError> {
        solidtype_feature_engine::resolve::resolve_with_fallback(geom_ref, &self.engine.feature_results)
            .map(|r| r.kernel_id)
            .map_err(|e| ModelingError::new(ErrorCategory::GeometryError, e.to_string()))
    }

    /// Ray-pick the nearest planar face hit by a ray (§6 "Ray-pick": "the
    /// 2D-in-polygon test uses the standard crossings algorithm"). Curved
    /// surfaces are out of scope for picking in this spec.
    pub fn ray_pick(&self, origin: [f64; 3], direction: [f64; 3]) -> Option<PickHit> {
        let origin = Point3d::from_array(origin);
        let dir = Vec3::from_array(direction).normalize();

        let mut best: Option<PickHit> = None;

        for (_solid_id, solid) in self.kernel.store.solids.iter() {
            for &shell_id in &solid.shells {
                for &face_id in &self.kernel.store.shells[shell_id].faces {
                    let face = &self.kernel.store.faces[face_id];
                    let plane = match &face.surface {
                        Surface::Plane(p) => p,
                        _ => continue,
                    };

                    let denom = plane.normal.dot(&dir);
                    if denom.abs() < 1e-12 {
                        continue;
                    }
                    let t = (plane.origin - origin).dot(&plane.normal) / denom;
                    if t <= 0.0 {
                        continue;
                    }
                    let hit = Point3d::new(
                        origin.x + dir.x * t,
                        origin.y + dir.y * t,
                        origin.z + dir.z * t,
                    );

                    if !point_in_face(&self.kernel.store, face_id, &hit) {
                        continue;
                    }

                    if best.as_ref().map(|b| t < b.distance).unwrap_or(true) {
                        best = Some(PickHit {
                            geom_ref: GeomRef {
                                kind: TopoKind::Face,
                                anchor: Anchor::Datum { datum_id: Uuid::nil() },
                                selector: Selector::Signature {
                                    signature: solidtype_modeling_ops::fingerprint::face_signature(
                                        &self.kernel.store,
                                        face_id,
                                    ),
                                },
                                policy: ResolvePolicy::BestEffort,
                            },
                            face_id,
                            point: hit,
                            distance: t,
                        });
                    }
                }
            }
        }

        best
    }

    /// Tessellate one body (§6 "Mesh export").
    pub fn tessellate(&self, body: &KernelSolidHandle) -> Result<TriangleMesh, ModelingError> {
        let solid_id = self.resolve_solid(body)?;
        Ok(solidtype_tessellation::tessellate_solid(&self.kernel.store, solid_id))
    }

    /// Tessellate every body currently in the model.
    pub fn tessellate_all(&self) -> Vec<(KernelSolidHandle, TriangleMesh)> {
        self.list_bodies()
            .into_iter()
            .filter_map(|b| self.tessellate(&b.handle).ok().map(|m| (b.handle, m)))
            .collect()
    }

    fn resolve_solid(&self, body: &KernelSolidHandle) -> Result<SolidId, ModelingError> {
        if self.kernel.store.solids.contains_key(body.solid_id) {
            Ok(body.solid_id)
        } else {
            Err(ModelingError::invalid_input(format!(
                "solid handle {:?} is not registered with this session",
                body
            )))
        }
    }

    fn role_lookup(&self, body: &KernelSolidHandle) -> std::collections::HashMap<FaceId, Role> {
        let mut map = std::collections::HashMap::new();
        for feature in &self.engine.tree.features {
            if let Some(result) = self.engine.get_result(feature.id) {
                let produced_this_body = result
                    .outputs
                    .iter()
                    .any(|(_, b)| b.handle.solid_id == body.solid_id);
                if !produced_this_body {
                    continue;
                }
                for (kernel_id, role) in &result.provenance.role_assignments {
                    if let KernelId::Face(face_id) = kernel_id {
                        map.insert(*face_id, role.clone());
                    }
                }
            }
        }
        map
    }

    fn nth_face(&self, body: &KernelSolidHandle, index: usize) -> Result<(Uuid, FaceId), ModelingError> {
        let solid_id = self.resolve_solid(body)?;
        let mut i = 0;
        for &shell_id in &self.kernel.store.solids[solid_id].shells {
            for &face_id in &self.kernel.store.shells[shell_id].faces {
                if i == index {
                    let feature_id = self
                        .engine
                        .tree
                        .features
                        .iter()
                        .find(|f| {
                            self.engine
                                .get_result(f.id)
                                .map(|r| r.outputs.iter().any(|(_, b)| b.handle.solid_id == solid_id))
                                .unwrap_or(false)
                        })
                        .map(|f| f.id)
                        .ok_or_else(|| ModelingError::internal("body has no producing feature"))?;
                    return Ok((feature_id, face_id));
                }
                i += 1;
            }
        }
        Err(ModelingError::invalid_input(format!("face index {} out of range", index)))
    }

    /// Ordering used to compute a role-local index: faces of a given body
    /// traversed in shell/face creation order.
    fn face_precedes(&self, body: &KernelSolidHandle, a: &FaceId, b: &FaceId) -> bool {
        if let Ok(solid_id) = self.resolve_solid(body) {
            for &shell_id in &self.kernel.store.solids[solid_id].shells {
                for &face_id in &self.kernel.store.shells[shell_id].faces {
                    if face_id == *a {
                        return true;
                    }
                    if face_id == *b {
                        return false;
                    }
                }
            }
        }
        false
    }
}

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

/// Standard crossings (even-odd) point-in-polygon test against a face's
/// outer loop, in the plane's own (u,v) coordinates; inner loops (holes)
/// are subtracted the same way.
fn point_in_face(store: &EntityStore, face_id: FaceId, world_point: &Point3d) -> bool {
    let face = &store.faces[face_id];
    let plane = match &face.surface {
        Surface::Plane(p) => p,
        _ => return false,
    };
    let (u, v) = plane.parameters_of(world_point);

    let outer = loop_uv(store, face.outer_loop, plane);
    if !crossings_contains(&outer, u, v) {
        return false;
    }
    for &inner in &face.inner_loops {
        let hole = loop_uv(store, inner, plane);
        if crossings_contains(&hole, u, v) {
            return false;
        }
    }
    true
}

fn loop_uv(
    store: &EntityStore,
    loop_id: solidtype_kernel::topology::brep::LoopId,
    plane: &solidtype_kernel::geometry::surfaces::Plane,
) -> Vec<(f64, f64)> {
    let loop_data = &store.loops[loop_id];
    loop_data
        .half_edges
        .iter()
        .map(|&he_id| {
            let he = &store.half_edges[he_id];
            plane.parameters_of(&store.vertices[he.start_vertex].point)
        })
        .collect()
}

/// Jordan-curve / "crossings" algorithm: count edge crossings of a
/// rightward ray from (u,v); odd count means inside.
fn crossings_contains(poly: &[(f64, f64)], u: f64, v: f64) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = poly[i];
        let (xj, yj) = poly[j];
        if ((yi > v) != (yj > v)) && (u < (xj - xi) * (v - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}
