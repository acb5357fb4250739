use std::path::PathBuf;

use thiserror::Error;

/// The main error type for kbox operations
#[derive(Debug, Error)]
pub enum KboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Plugin \"{plugin}\" could not be loaded.")]
    PluginNotFound { plugin: String },

    #[error("Plugin \"{plugin}\" has an invalid entry file {}: {message}", path.display())]
    InvalidPlugin {
        plugin: String,
        path: PathBuf,
        message: String,
    },

    #[error("Unable to load plugin [{plugin}] {message}")]
    PluginInitialization { plugin: String, message: String },

    #[error("Unresolved dependency [{name}] required by {context}")]
    UnresolvedDependency { name: String, context: String },

    #[error("Dependency [{name}] was not declared by the callable")]
    UndeclaredDependency { name: String },

    #[error("Dependency [{name}] is not of type {expected}")]
    DependencyType { name: String, expected: &'static str },

    #[error("Task registry used before init()")]
    RegistryNotInitialized,

    #[error("Invalid task path: {0}")]
    InvalidTaskPath(String),

    #[error("Task [{task}] failed: {message}")]
    TaskFailed { task: String, message: String },
}

/// Result type alias for kbox operations
pub type KboxResult<T> = Result<T, KboxError>;
