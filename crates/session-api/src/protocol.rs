//! The worker message protocol (§6): a request envelope `{kind, requestId,
//! payload}` dispatched against a [`Session`], producing a response envelope
//! `{kind: result|error, requestId, body}`. This is the wire format a host
//! (native or a web worker) drives the engine through; [`dispatch`] is the
//! single entry point, mirroring the teacher's message-dispatch idiom but
//! without anything WASM- or file-persistence-specific.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use solidtype_feature_engine::types::{BooleanOp, FeatureTree};
use solidtype_types::{GeomRef, Sketch, SketchConstraint, SketchEntity};

use crate::errors::ModelingError;
use crate::query::{BodySummary, FaceSummary, PickHit};
use crate::session::{ExtrudeOptions, FeatureOutput, RevolveOptions, Session, SketchBuilder};

/// One request from the host, tagged by `kind` with its parameters nested
/// under `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub payload: RequestPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum RequestPayload {
    // -- Sketch --
    BeginSketch { plane: GeomRef },
    AddSketchEntity { plane: GeomRef, entities: Vec<SketchEntity>, constraints: Vec<SketchConstraint>, entity: SketchEntity },
    FinishSketch { plane: GeomRef, entities: Vec<SketchEntity>, constraints: Vec<SketchConstraint> },

    // -- Primitives --
    CreateBox { width: f64, depth: f64, height: f64, center: [f64; 3] },
    CreateCylinder { radius: f64, height: f64, center: [f64; 3] },
    CreateSphere { radius: f64, center: [f64; 3] },
    CreateCone { radius: f64, height: f64, center: [f64; 3] },
    CreateTorus { major_radius: f64, minor_radius: f64, center: [f64; 3] },

    // -- Sketch-based features --
    Extrude { sketch: Sketch, profile_index: usize, depth: f64, direction: Option<[f64; 3]>, symmetric: bool, cut: bool, target_body: Option<GeomRef> },
    Revolve { sketch: Sketch, profile_index: usize, axis_origin: [f64; 3], axis_direction: [f64; 3], angle: f64 },

    // -- Other features --
    BooleanCombine { body_a: GeomRef, body_b: GeomRef, operation: BooleanOp },

    // -- Feature-tree editing --
    DeleteFeature { feature_id: Uuid },
    SuppressFeature { feature_id: Uuid, suppressed: bool },
    ReorderFeature { feature_id: Uuid, new_position: usize },
    RenameFeature { feature_id: Uuid, new_name: String },
    SetRollbackIndex { index: Option<usize> },

    // -- History --
    Undo,
    Redo,

    // -- Queries --
    ListBodies,
    ListFaces { body: solidtype_modeling_ops::KernelSolidHandle },
    FacePersistentRef { body: solidtype_modeling_ops::KernelSolidHandle, face_index: usize },
    ResolveRef { geom_ref: GeomRef },
    RayPick { origin: [f64; 3], direction: [f64; 3] },

    // -- Mesh export --
    Tessellate { body: solidtype_modeling_ops::KernelSolidHandle },
    TessellateAll,
    ExportStlBinary { body: solidtype_modeling_ops::KernelSolidHandle },
    ExportStlAscii { body: solidtype_modeling_ops::KernelSolidHandle, precision: usize },
}

/// The response envelope. `kind` is `"result"` or `"error"`; `body` holds
/// the payload for either case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", content = "body")]
pub enum ResponseOutcome {
    Result { body: ResponsePayload, warnings: Vec<String> },
    Error { body: ModelingError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponsePayload {
    ModelUpdated { feature_tree: FeatureTree },
    SketchReady { sketch: Sketch },
    Bodies { bodies: Vec<BodySummary> },
    Faces { faces: Vec<FaceSummary> },
    Ref { geom_ref: GeomRef },
    Resolved,
    Pick { hit: Option<PickHitWire> },
    Mesh { positions: Vec<f32>, normals: Vec<f32>, indices: Vec<u32> },
    MeshAll { bodies: Vec<(solidtype_modeling_ops::KernelSolidHandle, MeshWire)> },
    StlBinary { base64: String },
    StlAscii { text: String },
    Ack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshWire {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickHitWire {
    pub geom_ref: GeomRef,
    pub point: [f64; 3],
    pub distance: f64,
}

/// Dispatch one request against `session`, returning the response envelope.
/// Never panics: every failure path is folded into `ResponseOutcome::Error`.
pub fn dispatch(session: &mut Session, request: WorkerRequest) -> WorkerResponse {
    let request_id = request.request_id;
    match handle(session, request.payload) {
        Ok((body, warnings)) => WorkerResponse { request_id, outcome: ResponseOutcome::Result { body, warnings } },
        Err(body) => WorkerResponse { request_id, outcome: ResponseOutcome::Error { body } },
    }
}

fn handle(session: &mut Session, payload: RequestPayload) -> Result<(ResponsePayload, Vec<String>), ModelingError> {
    match payload {
        RequestPayload::BeginSketch { .. } => {
            // Sketch building happens host-side via `SketchBuilder`; this
            // variant exists for hosts that want the round trip acknowledged.
            Ok((ResponsePayload::Ack, Vec::new()))
        }

        RequestPayload::AddSketchEntity { plane, entities, constraints, entity } => {
            let mut builder = SketchBuilder { plane, entities, constraints };
            builder.add_entity(entity);
            let _ = builder;
            Ok((ResponsePayload::Ack, Vec::new()))
        }

        RequestPayload::FinishSketch { plane, entities, constraints } => {
            let builder = SketchBuilder { plane, entities, constraints };
            let outcome = session.finish_sketch(builder)?;
            Ok((ResponsePayload::SketchReady { sketch: outcome.value }, outcome.warnings))
        }

        RequestPayload::CreateBox { width, depth, height, center } => {
            feature_response(session.create_box(width, depth, height, center)?, session)
        }
        RequestPayload::CreateCylinder { radius, height, center } => {
            feature_response(session.create_cylinder(radius, height, center)?, session)
        }
        RequestPayload::CreateSphere { radius, center } => {
            feature_response(session.create_sphere(radius, center)?, session)
        }
        RequestPayload::CreateCone { radius, height, center } => {
            feature_response(session.create_cone(radius, height, center)?, session)
        }
        RequestPayload::CreateTorus { major_radius, minor_radius, center } => {
            feature_response(session.create_torus(major_radius, minor_radius, center)?, session)
        }

        RequestPayload::Extrude { sketch, profile_index, depth, direction, symmetric, cut, target_body } => {
            let opts = ExtrudeOptions { depth, direction, symmetric, cut, target_body };
            feature_response(session.extrude(&sketch, profile_index, opts)?, session)
        }
        RequestPayload::Revolve { sketch, profile_index, axis_origin, axis_direction, angle } => {
            let opts = RevolveOptions { axis_origin, axis_direction, angle };
            feature_response(session.revolve(&sketch, profile_index, opts)?, session)
        }

        RequestPayload::BooleanCombine { body_a, body_b, operation } => {
            feature_response(session.boolean(body_a, body_b, operation)?, session)
        }
        RequestPayload::DeleteFeature { feature_id } => {
            let outcome = session.delete_feature(feature_id)?;
            Ok((ResponsePayload::ModelUpdated { feature_tree: session.feature_tree().clone() }, outcome.warnings))
        }
        RequestPayload::SuppressFeature { feature_id, suppressed } => {
            let outcome = session.set_suppressed(feature_id, suppressed)?;
            Ok((ResponsePayload::ModelUpdated { feature_tree: session.feature_tree().clone() }, outcome.warnings))
        }
        RequestPayload::ReorderFeature { feature_id, new_position } => {
            let outcome = session.reorder_feature(feature_id, new_position)?;
            Ok((ResponsePayload::ModelUpdated { feature_tree: session.feature_tree().clone() }, outcome.warnings))
        }
        RequestPayload::RenameFeature { feature_id, new_name } => {
            let outcome = session.rename_feature(feature_id, new_name)?;
            Ok((ResponsePayload::ModelUpdated { feature_tree: session.feature_tree().clone() }, outcome.warnings))
        }
        RequestPayload::SetRollbackIndex { index } => {
            session.set_rollback(index);
            Ok((ResponsePayload::ModelUpdated { feature_tree: session.feature_tree().clone() }, Vec::new()))
        }

        RequestPayload::Undo => {
            let outcome = session.undo()?;
            Ok((ResponsePayload::ModelUpdated { feature_tree: session.feature_tree().clone() }, outcome.warnings))
        }
        RequestPayload::Redo => {
            let outcome = session.redo()?;
            Ok((ResponsePayload::ModelUpdated { feature_tree: session.feature_tree().clone() }, outcome.warnings))
        }

        RequestPayload::ListBodies => Ok((ResponsePayload::Bodies { bodies: session.list_bodies() }, Vec::new())),
        RequestPayload::ListFaces { body } => {
            Ok((ResponsePayload::Faces { faces: session.list_faces(&body)? }, Vec::new()))
        }
        RequestPayload::FacePersistentRef { body, face_index } => {
            Ok((ResponsePayload::Ref { geom_ref: session.face_persistent_ref(&body, face_index)? }, Vec::new()))
        }
        RequestPayload::ResolveRef { geom_ref } => {
            session.resolve_ref(&geom_ref)?;
            Ok((ResponsePayload::Resolved, Vec::new()))
        }
        RequestPayload::RayPick { origin, direction } => {
            let hit = session.ray_pick(origin, direction).map(|h| PickHitWire {
                geom_ref: h.geom_ref,
                point: h.point.to_array(),
                distance: h.distance,
            });
            Ok((ResponsePayload::Pick { hit }, Vec::new()))
        }

        RequestPayload::Tessellate { body } => {
            let mesh = session.tessellate(&body)?;
            Ok((
                ResponsePayload::Mesh { positions: mesh.positions, normals: mesh.normals, indices: mesh.indices },
                Vec::new(),
            ))
        }
        RequestPayload::TessellateAll => {
            let bodies = session
                .tessellate_all()
                .into_iter()
                .map(|(handle, mesh)| {
                    (handle, MeshWire { positions: mesh.positions, normals: mesh.normals, indices: mesh.indices })
                })
                .collect();
            Ok((ResponsePayload::MeshAll { bodies }, Vec::new()))
        }
        RequestPayload::ExportStlBinary { body } => {
            let mesh = session.tessellate(&body)?;
            let bytes = solidtype_tessellation::stl::export_binary(&mesh)
                .map_err(|e| ModelingError::geometry_error(e.to_string()))?;
            let base64 = base64::engine::general_purpose::STANDARD.encode(bytes);
            Ok((ResponsePayload::StlBinary { base64 }, Vec::new()))
        }
        RequestPayload::ExportStlAscii { body, precision } => {
            let mesh = session.tessellate(&body)?;
            let text = solidtype_tessellation::stl::export_ascii(&mesh, precision)
                .map_err(|e| ModelingError::geometry_error(e.to_string()))?;
            Ok((ResponsePayload::StlAscii { text }, Vec::new()))
        }
    }
}

fn feature_response(
    outcome: crate::errors::Outcome<FeatureOutput>,
    session: &Session,
) -> Result<(ResponsePayload, Vec<String>), ModelingError> {
    let _ = outcome.value;
    Ok((ResponsePayload::ModelUpdated { feature_tree: session.feature_tree().clone() }, outcome.warnings))
}
