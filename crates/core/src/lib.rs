//! daforge-core
//!
//! Core library for reverse-engineering vendor download-agent (DA) boot firmware.
//!
//! Two independent pieces live here:
//! - the container editor (`editor`), which extracts signed boot stages from a
//!   parsed DA container and re-packs replacement payloads into a donor file;
//! - the offset recovery engine (`scan`), which statically locates the base
//!   address of the hardware security engine in a raw boot-stage binary by
//!   matching 16-bit Thumb instruction encodings.
//!
//! The object model (`model`) is produced by a `container::ContainerParser`.
//! All substantive logic lives in this crate so frontends stay thin.

pub mod config;
pub mod container;
pub mod editor;
pub mod logging;
pub mod model;
pub mod scan;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
