//! Terminal output: the build reporter, progress formatting and tables.

pub mod console;
pub mod progress;
pub mod table;

pub use console::ConsoleReporter;
