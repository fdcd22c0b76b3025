pub mod constraint;
pub mod sketch;
pub mod solver;

pub use constraint::*;
pub use sketch::*;
pub use solver::*;
