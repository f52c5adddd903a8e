//! IO modules - side effects (network, filesystem)

pub mod download;
pub mod extract;

pub use download::{FetchError, FetchRequest, fetch};
pub use extract::{ExtractError, ExtractRequest, ExtractStage, extract};
