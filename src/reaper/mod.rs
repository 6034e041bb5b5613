//! Idle-lock reaper.

mod thread;

pub use thread::{ReaperStats, ReaperThread};
