//! External interfaces (§6): the library surface a host (browser worker,
//! native UI, CLI) drives the kernel through. `Session` owns one feature
//! tree plus its backing kernel; `query` adds read-only lookups, ray-pick,
//! and mesh export; `protocol` wraps both behind the `{kind, requestId,
//! payload}` / `{kind, requestId, body}` worker message envelope.

pub mod errors;
pub mod protocol;
pub mod query;
pub mod session;

pub use errors::{ErrorCategory, ErrorHints, ModelingError, ModelingResult, Outcome};
pub use protocol::{dispatch, RequestPayload, ResponseOutcome, ResponsePayload, WorkerRequest, WorkerResponse};
pub use query::{BodySummary, FaceSummary, PickHit};
pub use session::{ExtrudeOptions, FeatureOutput, RevolveOptions, Session, SketchBuilder};
