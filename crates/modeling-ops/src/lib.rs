//! Adapter crate between the feature engine and the raw `solidtype-kernel`
//! topology store. Provides [`kernel_bundle::KernelBundle`] (the uniform
//! execution surface the feature tree's rebuild pass drives), persistent
//! naming fingerprints ([`fingerprint`]), and the sketch-solving bridge
//! ([`sketch_bridge`]) that turns a document sketch into extrude/revolve
//! ready 3D profiles.

pub mod fingerprint;
pub mod kernel_bundle;
pub mod sketch_bridge;
pub mod types;

pub use kernel_bundle::{KernelBundle, PrimitiveParams, RealKernel};
pub use types::{
    BodyOutput, BooleanKind, CreatedEntity, Diagnostics, KernelError, KernelId, KernelSolidHandle,
    OpError, OpResult, Provenance, SignatureDigest,
};
