//! Shared vocabulary between the feature engine and the kernel: stable-ish
//! entity handles, per-feature provenance, and the adapter's own error type.
//!
//! The feature engine never touches `solidtype_kernel::topology::brep` keys
//! directly — it goes through [`KernelId`] and [`KernelSolidHandle`] so that
//! swapping the underlying store representation doesn't ripple into the
//! persistent-naming layer above it.

use serde::{Deserialize, Serialize};
use solidtype_kernel::topology::brep::{EdgeId, FaceId, SolidId, VertexId};
use solidtype_types::{OutputKey, TopoKind, TopoSignature};
use uuid::Uuid;

/// A topological entity inside one rebuild, tagged by kind.
///
/// These are `slotmap` keys from the live `EntityStore` and are only valid
/// for the lifetime of the rebuild that produced them; they are never
/// persisted across rebuilds. [`solidtype_types::GeomRef`] is what survives
/// a rebuild — it is resolved back down to a `KernelId` each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelId {
    Vertex(VertexId),
    Edge(EdgeId),
    Face(FaceId),
}

impl KernelId {
    pub fn kind(&self) -> TopoKind {
        match self {
            KernelId::Vertex(_) => TopoKind::Vertex,
            KernelId::Edge(_) => TopoKind::Edge,
            KernelId::Face(_) => TopoKind::Face,
        }
    }
}

/// A handle to a solid body produced by some feature, tagged with the
/// session-scoped body id assigned at creation (stable across this
/// rebuild; a new rebuild assigns fresh handles, per §9 "handles vs.
/// pointers" — only `GeomRef` claims cross-rebuild stability).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelSolidHandle {
    pub solid_id: SolidId,
    pub body_id: Uuid,
}

/// One entity created by a feature, carrying enough to resolve a `GeomRef`
/// against it later (role-based first, signature-based as fallback).
#[derive(Debug, Clone)]
pub struct CreatedEntity {
    pub kernel_id: KernelId,
    pub kind: TopoKind,
    pub role: Option<solidtype_types::Role>,
    pub signature: TopoSignature,
}

/// What a feature did to the topology store, used both for persistent-naming
/// evolution mappings (§4.7) and for resolving `GeomRef`s against the
/// feature's output.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    pub created: Vec<CreatedEntity>,
    pub deleted: Vec<KernelId>,
    pub modified: Vec<KernelId>,
    pub role_assignments: Vec<(KernelId, solidtype_types::Role)>,
}

/// Non-fatal observations surfaced alongside a successful feature result
/// (§7: "warnings ... do not change the produced body").
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub warnings: Vec<String>,
}

/// One named output of a feature (a body, a datum, a profile) keyed the
/// same way a `GeomRef::Anchor::FeatureOutput` would reference it.
#[derive(Debug, Clone)]
pub struct BodyOutput {
    pub handle: KernelSolidHandle,
}

/// The full result of executing one feature against the kernel.
#[derive(Debug, Clone, Default)]
pub struct OpResult {
    pub outputs: Vec<(OutputKey, BodyOutput)>,
    pub provenance: Provenance,
    pub diagnostics: Diagnostics,
}

impl OpResult {
    pub fn single_body(output_key: OutputKey, handle: KernelSolidHandle, provenance: Provenance) -> Self {
        Self {
            outputs: vec![(output_key, BodyOutput { handle })],
            provenance,
            diagnostics: Diagnostics::default(),
        }
    }
}

/// Boolean operation kind, mirrored from `kernel::boolean::BoolOp` so that
/// feature-engine doesn't need to depend on the kernel's internal enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanKind {
    Union,
    Subtract,
    Intersect,
}

/// Errors raised while translating a feature's parameters into kernel calls.
/// This is the `geometryError`/`topologyError`/`invalidInput` boundary of
/// §7 as seen from the feature-engine side; `Session` maps these further
/// into `ModelingError` categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    #[error("profile has {provided} points, need at least {required}")]
    InsufficientProfile { required: usize, provided: usize },

    #[error("{0}")]
    Operation(String),

    #[error("boolean operation failed: {0}")]
    Boolean(String),

    #[error("validation failed after feature execution: {error_count} error(s)")]
    Invalid { error_count: usize, warning_count: usize },

    #[error("entity not found: {0:?}")]
    NotFound(KernelId),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Errors raised by the kernel bundle itself (distinct from `OpError` in
/// that these indicate the store/handle bookkeeping broke, not that the
/// requested geometry was invalid).
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("solid handle {0:?} is not registered with this kernel bundle")]
    UnknownSolid(KernelSolidHandle),

    #[error("kernel entity store invariant violated: {0}")]
    Internal(String),
}

/// Weighted signature-distance used by fallback `GeomRef` resolution
/// (§4.7 "fingerprint match"). Returns a similarity in `[0, 1]`, 1 being
/// identical.
pub fn signature_similarity(a: &TopoSignature, b: &TopoSignature) -> f64 {
    let mut score = 0.0;
    let mut weight_total = 0.0;

    let mut add = |weight: f64, matched: bool| {
        weight_total += weight;
        if matched {
            score += weight;
        }
    };

    // Surface/curve kind mismatch is a hard disqualifier in spirit, but we
    // still return a low (not necessarily zero) score so the caller can
    // decide via its own threshold rather than panicking on an empty match set.
    add(0.4, a.surface_type == b.surface_type);

    if let (Some(ca), Some(cb)) = (a.centroid, b.centroid) {
        let d = ((ca[0] - cb[0]).powi(2) + (ca[1] - cb[1]).powi(2) + (ca[2] - cb[2]).powi(2)).sqrt();
        add(0.3, d < 1e-3);
    }

    if let (Some(aa), Some(ab)) = (a.area, b.area) {
        add(0.15, (aa - ab).abs() < 1e-6 * aa.max(ab).max(1.0));
    }

    if let (Some(na), Some(nb)) = (a.normal, b.normal) {
        let dot = na[0] * nb[0] + na[1] * nb[1] + na[2] * nb[2];
        add(0.1, dot > 0.999);
    }

    add(0.05, a.adjacency_hash == b.adjacency_hash);

    if weight_total == 0.0 {
        0.0
    } else {
        score / weight_total
    }
}

/// Canonicalised data used to build a [`TopoSignature`] (§9 "persistent ref
/// fingerprinting with floating data"): coordinates rounded to the nanometer
/// grid before hashing or comparing, so two bit-identical fingerprints mean
/// the same subshape modulo topology renumbering.
pub fn round_to_grid(v: f64) -> f64 {
    const NM_PER_UNIT: f64 = 1.0e6;
    (v * NM_PER_UNIT).round() / NM_PER_UNIT
}

/// Serialize-friendly snapshot of a `TopoSignature`, useful when logging or
/// hashing (spans in `tracing` fields must be `Display`/`Debug`, not the
/// raw struct).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureDigest {
    pub surface_type: Option<String>,
    pub centroid_nm: Option<(i64, i64, i64)>,
}

impl From<&TopoSignature> for SignatureDigest {
    fn from(sig: &TopoSignature) -> Self {
        Self {
            surface_type: sig.surface_type.clone(),
            centroid_nm: sig.centroid.map(|c| {
                (
                    (c[0] * 1.0e6).round() as i64,
                    (c[1] * 1.0e6).round() as i64,
                    (c[2] * 1.0e6).round() as i64,
                )
            }),
        }
    }
}
