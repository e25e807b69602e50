// github module: REST client, auth discovery and the check resolvers

pub mod actions;
pub mod auth;
pub mod client;
pub mod logs;
pub(crate) mod rate_limit;
pub mod resolver;

pub use client::GitHubClient;
pub use resolver::GitHubResolver;
