//! vaultpair-ports - abstract trait layer
//!
//! Records exchanged with the regional backends and the traits every external
//! collaborator implements: the per-kind transport, the region connector, the
//! credential factory and the local certificate lookup.

mod identity;
mod kind;
mod model;
mod transport;

pub use identity::*;
pub use kind::*;
pub use model::*;
pub use transport::*;
