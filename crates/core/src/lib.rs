//! Kbox Core Library
//!
//! This is the extensibility core of kbox. It wires plugins together through
//! a dependency injection container and collects the commands they
//! contribute into a hierarchical task registry.
//!
//! ## Architecture
//!
//! The core library is organized into several modules:
//!
//! - [`kbox`] - Top-level context owning the container, registry and loader
//! - [`deps`] - Injection container with scoped overrides
//! - [`plugin`] - Plugin resolution, loading and initialization
//! - [`tasks`] - Task registry on top of the task tree
//! - [`task_tree`] - Arena-backed n-ary tree of task nodes
//! - [`task`] - Invocable task wrapper
//! - [`execution`] - Runs the commands behind manifest-declared tasks
//! - [`configs`] - Global and app configuration parsing
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kbox_core::Kbox;
//! use std::path::Path;
//!
//! # async fn example() -> kbox_core::types::KboxResult<()> {
//! let kbox = Kbox::load(Path::new(".kbox/config.yml"))?;
//! let report = kbox.init_global_plugins().await;
//! println!("{} plugins loaded", report.loaded.len());
//! # Ok(())
//! # }
//! ```

pub mod configs;
pub mod deps;
pub mod execution;
pub mod kbox;
pub mod plugin;
pub mod task;
pub mod task_tree;
pub mod tasks;
pub mod types;

// Re-export the main types for easier usage
pub use deps::{injectable, Container, Injectable, Overrides, Resolved};
pub use kbox::{Kbox, RunOutcome};
pub use plugin::{LoadOutcome, PluginLoader, PluginReport};
pub use tasks::TaskRegistry;
pub use types::{KboxError, KboxResult};
