//! Plugins declared by a `plugin.yml` entry file.
//!
//! A manifest plugin registers each declared task with the task registry.
//! Plugins that depend on `app` get their tasks namespaced under the app's
//! name and run them from the app root; every other plugin runs its tasks
//! from its own directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use kbox_plugin_protocol::{
    parse_plugin_manifest, Command, DependencyKey, PluginManifest, TaskDeclaration, TaskPath,
};

use super::{PluginSource, RawPlugin};
use crate::configs::App;
use crate::deps::{Injectable, Resolved};
use crate::execution::CommandExecutor;
use crate::task::{task_body, TaskBody};
use crate::tasks::TaskRegistry;

/// Reads `plugin.yml` entry files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestSource;

impl PluginSource for ManifestSource {
    fn load(&self, plugin_name: &str, entry: &Path) -> anyhow::Result<RawPlugin> {
        let content = std::fs::read_to_string(entry)
            .with_context(|| format!("Failed to read {}", entry.display()))?;
        let manifest = parse_plugin_manifest(&content)?;
        let dir = entry.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Arc::new(ManifestPlugin::new(plugin_name, dir, manifest)))
    }
}

#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    name: String,
    dir: PathBuf,
    manifest: PluginManifest,
}

impl ManifestPlugin {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>, manifest: PluginManifest) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            manifest,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn task_body(
        &self,
        declaration: &TaskDeclaration,
        path: &TaskPath,
        working_dir: PathBuf,
        app: Option<&App>,
    ) -> TaskBody {
        let mut executor = CommandExecutor::new(path.to_string(), working_dir)
            .env("KBOX_PLUGIN", self.name.as_str());
        if let Some(app) = app {
            executor = executor.env("KBOX_APP", app.name.as_str());
        }

        let script = declaration.script.clone();
        let command = declaration.command.clone();
        task_body(move |args| {
            match (&script, &command) {
                (Some(script), _) => executor.execute_script(script, args)?,
                (None, Some(Command::Single(cmd))) => executor.execute_shell_command(cmd, args)?,
                (None, Some(Command::Multiple(argv))) => {
                    let Some((program, rest)) = argv.split_first() else {
                        anyhow::bail!("task declares an empty command list");
                    };
                    let mut all_args = rest.to_vec();
                    all_args.extend_from_slice(args);
                    executor.execute_command_with_args(program, &all_args)?;
                }
                (None, None) => anyhow::bail!("task declares neither a script nor a command"),
            }
            Ok(())
        })
    }
}

impl Injectable for ManifestPlugin {
    type Output = ();

    /// The declared dependencies, plus `tasks` which every manifest plugin needs.
    fn dependencies(&self) -> Vec<DependencyKey> {
        let mut keys = self.manifest.dependencies.clone();
        if !keys.contains(&DependencyKey::TASKS) {
            keys.push(DependencyKey::TASKS);
        }
        keys
    }

    fn context(&self) -> String {
        format!("plugin [{}]", self.name)
    }

    fn invoke(&self, deps: Resolved) -> anyhow::Result<()> {
        let tasks = deps.get::<TaskRegistry>(DependencyKey::TASKS.as_str())?;
        let app = if self.manifest.uses_app() {
            Some(deps.get::<App>(DependencyKey::APP.as_str())?)
        } else {
            None
        };

        for declaration in &self.manifest.tasks {
            let (path, working_dir) = match app.as_deref() {
                Some(app) => (
                    declaration.path.clone().prefixed(app.name.as_str()),
                    app.root.clone(),
                ),
                None => (declaration.path.clone(), self.dir.clone()),
            };
            let body = self.task_body(declaration, &path, working_dir, app.as_deref());
            tasks.register_task(path, body, declaration.sort_index.unwrap_or_default())?;
        }

        tracing::debug!(
            plugin = %self.name,
            tasks = self.manifest.tasks.len(),
            "Manifest plugin initialized"
        );
        Ok(())
    }
}
