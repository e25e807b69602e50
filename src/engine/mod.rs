// engine module: background thread serving the host's remote commands

pub mod github;
mod interface;
pub mod stub;

pub use github::GitHubEngine;
pub use interface::{Engine, EngineHandle, Event, Request};
pub use stub::StubEngine;
