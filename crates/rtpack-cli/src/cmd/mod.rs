//! Command implementations.

pub mod build;
pub mod clean;
pub mod hash;
pub mod platforms;
pub mod resolve;
pub mod sign;
pub mod verify;
