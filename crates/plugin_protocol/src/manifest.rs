//! The `plugin.yml` entry file format.
//!
//! A plugin directory contains a single entry file. It names the dependencies
//! the plugin wants injected and the tasks it contributes to the command tree:
//!
//! ```yaml
//! name: database
//! dependencies: [app, appConfig]
//! tasks:
//!   - path: [db, start]
//!     command: docker compose up -d db
//!   - path: [db, psql]
//!     sortIndex: 10
//!     command: [docker, compose, exec, db, psql]
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{DependencyKey, TaskPath};

/// Entry file name probed inside each plugin directory.
pub const PLUGIN_FILENAME: &str = "plugin.yml";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Command {
    /// Run through `sh -c`.
    Single(String),
    /// Executable followed by its arguments, no shell involved.
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskDeclaration {
    pub path: TaskPath,
    pub sort_index: Option<i32>,
    /// Script file, relative paths resolve against the task's working directory.
    pub script: Option<String>,
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginManifest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Keys the plugin wants injected when it is initialized.
    #[serde(default)]
    pub dependencies: Vec<DependencyKey>,
    #[serde(default)]
    pub tasks: Vec<TaskDeclaration>,
}

impl PluginManifest {
    /// Whether the plugin asks for the application context.
    #[must_use]
    pub fn uses_app(&self) -> bool {
        self.dependencies.contains(&DependencyKey::APP)
    }
}

pub fn parse_plugin_manifest(yaml_str: &str) -> anyhow::Result<PluginManifest> {
    let manifest: PluginManifest = serde_yaml::from_str(yaml_str)?;
    for task in &manifest.tasks {
        if task.path.is_empty() {
            anyhow::bail!("Task declaration has an empty path");
        }
        if task.script.is_some() == task.command.is_some() {
            anyhow::bail!(
                "Task '{}' must declare exactly one of 'script' or 'command'",
                task.path
            );
        }
        if matches!(task.command, Some(Command::Multiple(ref argv)) if argv.is_empty()) {
            anyhow::bail!("Task '{}' has an empty command list", task.path);
        }
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest_with_app_dependency() {
        let manifest = parse_plugin_manifest(
            r#"
name: database
dependencies: [app, appConfig]
tasks:
  - path: [db, start]
    command: docker compose up -d db
  - path: version
    sortIndex: -1
    command: [echo, "1.0"]
"#,
        )
        .unwrap();

        assert!(manifest.uses_app());
        assert_eq!(manifest.dependencies, vec![DependencyKey::APP, DependencyKey::APP_CONFIG]);
        assert_eq!(manifest.tasks.len(), 2);
        assert_eq!(manifest.tasks[0].path.segments(), ["db", "start"]);
        assert!(matches!(manifest.tasks[0].command, Some(Command::Single(_))));
        assert_eq!(manifest.tasks[1].sort_index, Some(-1));
        assert!(matches!(
            manifest.tasks[1].command,
            Some(Command::Multiple(ref argv)) if argv.len() == 2
        ));
    }

    #[test]
    fn test_parse_empty_manifest() {
        let manifest = parse_plugin_manifest("name: empty").unwrap();
        assert!(!manifest.uses_app());
        assert!(manifest.tasks.is_empty());
    }

    #[test]
    fn test_task_needs_exactly_one_action() {
        let err = parse_plugin_manifest("tasks:\n  - path: noop\n").unwrap_err();
        assert!(err.to_string().contains("exactly one"));

        let err = parse_plugin_manifest(
            "tasks:\n  - path: both\n    script: run.sh\n    command: echo hi\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }

    #[test]
    fn test_empty_command_list_is_rejected() {
        let err = parse_plugin_manifest("tasks:\n  - path: noop\n    command: []\n").unwrap_err();
        assert!(err.to_string().contains("empty command list"));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(parse_plugin_manifest("nmae: typo").is_err());
    }
}
