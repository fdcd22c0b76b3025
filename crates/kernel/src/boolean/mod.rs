pub mod engine;
pub mod classify;
pub mod split;
pub mod dcel;
pub mod general;

use crate::topology::brep::{EntityStore, SolidId};
use engine::BooleanFailure;

/// Trait for Boolean operations on B-Rep solids.
///
/// Provides `union`, `subtract`, and `intersect` operations. Implement this
/// trait to provide alternative Boolean backends or mock implementations.
pub trait BooleanEngine {
    /// Compute the union of two solids.
    fn union(&self, store: &mut EntityStore, a: SolidId, b: SolidId) -> Result<SolidId, BooleanFailure>;

    /// Subtract solid `b` from solid `a`.
    fn subtract(&self, store: &mut EntityStore, a: SolidId, b: SolidId) -> Result<SolidId, BooleanFailure>;

    /// Compute the intersection of two solids.
    fn intersect(&self, store: &mut EntityStore, a: SolidId, b: SolidId) -> Result<SolidId, BooleanFailure>;
}

/// Default Boolean engine backed by the existing `boolean_op()` function.
pub struct DefaultBooleanEngine;

impl BooleanEngine for DefaultBooleanEngine {
    fn union(&self, store: &mut EntityStore, a: SolidId, b: SolidId) -> Result<SolidId, BooleanFailure> {
        engine::boolean_op(store, a, b, engine::BoolOp::Union)
    }

    fn subtract(&self, store: &mut EntityStore, a: SolidId, b: SolidId) -> Result<SolidId, BooleanFailure> {
        engine::boolean_op(store, a, b, engine::BoolOp::Difference)
    }

    fn intersect(&self, store: &mut EntityStore, a: SolidId, b: SolidId) -> Result<SolidId, BooleanFailure> {
        engine::boolean_op(store, a, b, engine::BoolOp::Intersection)
    }
}
