pub mod command;
pub mod config;
pub mod hooks;
pub mod integrity;
pub mod io;
pub mod layout;
pub mod manifest;
pub mod packager;
pub mod pipeline;
pub mod product;

pub mod reporter;

pub use config::{Config, SigningCredentials};
pub use manifest::{ManifestResolver, ResolveError};
pub use pipeline::{BuildContext, BuildError, BuildPlan, BuildReport, Orchestrator, Stage};
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("rtpack-core/", env!("CARGO_PKG_VERSION"));
