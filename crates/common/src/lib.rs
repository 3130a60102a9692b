//! vaultpair-common - shared types and helpers

pub mod tags;
pub mod types;
pub mod utils;

pub use tags::*;
pub use types::*;
pub use utils::*;
