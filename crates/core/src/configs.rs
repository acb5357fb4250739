//! Configuration parsing for the global config and app configs

pub mod app;
pub mod global;

pub use app::{load_app, App, AppConfig};
pub use global::{load_global_config, GlobalConfig};
