//! Shared utilities for tokenlease
//!
//! Process-level helpers used by the binary: logging setup and the XDG
//! locations where mount data is kept.

pub mod tracing;
pub mod xdg;

pub use xdg::XdgPaths;
