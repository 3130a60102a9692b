//! vaultpair-adapter-memory - in-process backends
//!
//! Regional stores, credentials and a local certificate store kept in memory,
//! with fault injection for exercising failover and divergence handling.

mod client;
mod connector;
mod identity;
mod region;

pub use client::*;
pub use connector::*;
pub use identity::*;
pub use region::*;
