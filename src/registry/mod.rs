//! Process-local lock registry.

mod registry;

pub use registry::LockRegistry;
