//! Plugin protocol for kbox.
//!
//! Everything a plugin author needs to describe a plugin without depending on
//! kbox internals: the [`DependencyKey`]s a plugin may ask for, the
//! [`TaskPath`]s it registers tasks under, and the [`PluginManifest`] entry
//! file format.

pub mod manifest;
pub mod types;

pub use manifest::{
    parse_plugin_manifest, Command, PluginManifest, TaskDeclaration, PLUGIN_FILENAME,
};
pub use types::{DependencyKey, TaskPath};
