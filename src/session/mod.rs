//! Per-client conversations and the bounded registry that owns them.

mod client;
mod registry;

pub use client::{ClientId, ClientSession};
pub use registry::{DEFAULT_CAPACITY, SessionRegistry};
