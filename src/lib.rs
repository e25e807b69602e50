// Pedantic: suppress noise for internal crate code.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

pub mod actions;
pub mod app;
pub mod checks;
pub mod config;
pub mod engine;
pub mod git;
pub mod github;
pub mod report;
pub mod types;
pub mod url;
pub mod util;
