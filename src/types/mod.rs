// Shared domain types: used by the check pipeline, the GitHub layer and the
// engine. None of those layers depends on another for its data model.

pub mod check_run;
pub mod common;

pub use check_run::*;
pub use common::*;
