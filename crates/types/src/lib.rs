pub mod geom_ref;
pub mod roles;
pub mod sketch;
pub mod topo;

pub use geom_ref::*;
pub use roles::*;
pub use sketch::*;
pub use topo::*;
