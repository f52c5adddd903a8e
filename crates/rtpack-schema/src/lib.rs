//! Shared types for the rtpack release pipeline.
//!
//! Platform identifiers, runtime manifest entries, artifact naming and the
//! digest/signature records produced at the end of a build.

pub mod artifact;
pub mod platform;
pub mod runtime;

// Re-exports
pub use artifact::*;
pub use platform::*;
pub use runtime::*;
