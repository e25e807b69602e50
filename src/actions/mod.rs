pub mod browser;
pub mod local;
