//! Plugin loader
//!
//! Locates a plugin's entry file under a list of search roots, turns it into
//! an initializer through a [`PluginSource`], decides from the initializer's
//! declared dependencies whether it is an app plugin, and runs it through
//! the [`Container`] with the plugin's own context bound for the duration of
//! the call.
//!
//! Installed plugins under `<root>/packages/<name>/plugin.yml` are probed for
//! every root first, then bundled ones under `<root>/plugins/<name>/plugin.yml`
//! for every root, so an installed plugin in any root shadows a bundled plugin
//! of the same name.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kbox_plugin_protocol::{DependencyKey, PLUGIN_FILENAME};

use crate::configs::{App, AppConfig, GlobalConfig};
use crate::deps::{injectable, Container, Injectable, Overrides};
use crate::types::{KboxError, KboxResult};

pub mod manifest;

pub use manifest::{ManifestPlugin, ManifestSource};

/// Directory holding plugins bundled with kbox.
pub const PLUGIN_DIRNAME: &str = "plugins";
/// Directory holding externally installed plugins.
pub const EXTERNAL_PLUGIN_DIRNAME: &str = "packages";

/// A plugin's initializer, ready to be called through the container.
pub type RawPlugin = Arc<dyn Injectable<Output = ()> + Send + Sync>;

/// Turns a resolved entry file into an initializer.
pub trait PluginSource: Send + Sync {
    fn load(&self, plugin_name: &str, entry: &Path) -> anyhow::Result<RawPlugin>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Initialized,
    /// The plugin's injection profile did not match what the caller loads.
    Skipped,
}

/// What happened to each plugin of a batch load.
#[derive(Debug, Default)]
pub struct PluginReport {
    pub loaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, KboxError)>,
}

impl PluginReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, plugin_name: &str, result: KboxResult<LoadOutcome>) {
        match result {
            Ok(LoadOutcome::Initialized) => self.loaded.push(plugin_name.to_string()),
            Ok(LoadOutcome::Skipped) => self.skipped.push(plugin_name.to_string()),
            Err(err) => {
                tracing::error!(plugin = %plugin_name, error = %err, "Plugin failed to load");
                self.failed.push((plugin_name.to_string(), err));
            }
        }
    }
}

/// Every location `plugin_name` may live at, in probe order.
pub fn candidate_paths(plugin_name: &str, roots: &[PathBuf]) -> Vec<PathBuf> {
    let entry = |root: &PathBuf, dir: &str| root.join(dir).join(plugin_name).join(PLUGIN_FILENAME);
    let external = roots.iter().map(|root| entry(root, EXTERNAL_PLUGIN_DIRNAME));
    let internal = roots.iter().map(|root| entry(root, PLUGIN_DIRNAME));
    external.chain(internal).collect()
}

/// First candidate that exists as a file.
pub fn search_for_path(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

/// Whether `initializer` asks for the application context.
pub fn uses_app<I: Injectable + ?Sized>(initializer: &I) -> bool {
    Container::inspect(initializer)
        .iter()
        .any(|key| *key == DependencyKey::APP)
}

fn initialization_error(plugin_name: &str, err: anyhow::Error) -> KboxError {
    KboxError::PluginInitialization {
        plugin: plugin_name.to_string(),
        message: format!("{err:#}"),
    }
}

pub struct PluginLoader {
    container: Arc<Container>,
    source: Arc<dyn PluginSource>,
}

impl fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLoader")
            .field("container", &self.container)
            .field("source", &"<opaque>")
            .finish()
    }
}

impl PluginLoader {
    /// Loader reading `plugin.yml` manifests.
    pub fn new(container: Arc<Container>) -> Self {
        Self::with_source(container, Arc::new(ManifestSource))
    }

    pub fn with_source(container: Arc<Container>, source: Arc<dyn PluginSource>) -> Self {
        Self { container, source }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Path of the entry file that would be loaded for `plugin_name`.
    pub fn resolve(&self, plugin_name: &str, roots: &[PathBuf]) -> KboxResult<PathBuf> {
        tracing::debug!(plugin = %plugin_name, ?roots, "Resolving plugin");
        search_for_path(&candidate_paths(plugin_name, roots)).ok_or_else(|| {
            KboxError::PluginNotFound {
                plugin: plugin_name.to_string(),
            }
        })
    }

    /// Resolve and read a plugin without initializing it.
    pub fn load_raw(&self, plugin_name: &str, roots: &[PathBuf]) -> KboxResult<RawPlugin> {
        let entry = self.resolve(plugin_name, roots)?;
        tracing::debug!(plugin = %plugin_name, path = %entry.display(), "Loading plugin");
        self.source
            .load(plugin_name, &entry)
            .map_err(|e| KboxError::InvalidPlugin {
                plugin: plugin_name.to_string(),
                path: entry,
                message: format!("{e:#}"),
            })
    }

    /// Initialize `plugin_name` only if it is an app plugin.
    ///
    /// `app` and `appConfig` must already be bound in the container.
    pub async fn load_if_uses_app(
        &self,
        plugin_name: &str,
        roots: &[PathBuf],
    ) -> KboxResult<LoadOutcome> {
        let raw = self.load_raw(plugin_name, roots)?;
        if !uses_app(raw.as_ref()) {
            tracing::debug!(plugin = %plugin_name, "Skipping plugin without app dependency");
            return Ok(LoadOutcome::Skipped);
        }

        let app_context = injectable(
            format!("app plugin [{plugin_name}]"),
            [DependencyKey::APP, DependencyKey::APP_CONFIG],
            |deps| {
                Ok(Overrides::new()
                    .with_binding(
                        DependencyKey::APP,
                        deps.binding(DependencyKey::APP.as_str())?.clone(),
                    )
                    .with_binding(
                        DependencyKey::APP_CONFIG,
                        deps.binding(DependencyKey::APP_CONFIG.as_str())?.clone(),
                    )
                    .with(DependencyKey::PLUGIN, plugin_name.to_string()))
            },
        );
        let overrides = self
            .container
            .call(&app_context)
            .map_err(|e| initialization_error(plugin_name, e))?;

        self.init_plugin(plugin_name, overrides, raw.as_ref()).await?;
        Ok(LoadOutcome::Initialized)
    }

    /// Initialize `plugin_name` only if it does not need an app.
    pub async fn load_if_does_not_use_app(
        &self,
        plugin_name: &str,
        roots: &[PathBuf],
    ) -> KboxResult<LoadOutcome> {
        let raw = self.load_raw(plugin_name, roots)?;
        if uses_app(raw.as_ref()) {
            tracing::debug!(plugin = %plugin_name, "Skipping app plugin");
            return Ok(LoadOutcome::Skipped);
        }

        let overrides = Overrides::new().with(DependencyKey::PLUGIN, plugin_name.to_string());
        self.init_plugin(plugin_name, overrides, raw.as_ref()).await?;
        Ok(LoadOutcome::Initialized)
    }

    /// Initialize `plugin_name` whatever its injection profile.
    pub async fn load(&self, plugin_name: &str, roots: &[PathBuf]) -> KboxResult<()> {
        let raw = self.load_raw(plugin_name, roots)?;
        let overrides = Overrides::new().with(DependencyKey::PLUGIN, plugin_name.to_string());
        self.init_plugin(plugin_name, overrides, raw.as_ref()).await
    }

    /// Call `initializer` with `overrides` bound, attributing any failure to `plugin_name`.
    pub async fn init_plugin<I>(
        &self,
        plugin_name: &str,
        overrides: Overrides,
        initializer: &I,
    ) -> KboxResult<()>
    where
        I: Injectable<Output = ()> + ?Sized,
    {
        let container = self.container.as_ref();
        container
            .with_overrides_async(overrides, || async { container.call(initializer) })
            .await
            .map_err(|e| initialization_error(plugin_name, e))?;
        tracing::info!(plugin = %plugin_name, "Plugin loaded");
        Ok(())
    }

    /// Load the configured global plugins in order, skipping app plugins.
    ///
    /// A plugin that fails is reported and the remaining plugins still load.
    pub async fn init_global_plugins(&self, config: &GlobalConfig) -> PluginReport {
        let roots = config.plugin_dirs();
        let mut report = PluginReport::default();
        for plugin_name in &config.global_plugins {
            let result = self.load_if_does_not_use_app(plugin_name, &roots).await;
            report.record(plugin_name, result);
        }
        report
    }

    /// Bind `app` and `appConfig`, then load the app's plugins that use them.
    pub async fn init_app_plugins(
        &self,
        app: App,
        app_config: AppConfig,
        roots: &[PathBuf],
    ) -> PluginReport {
        let plugins = app_config.plugins.clone();
        tracing::debug!(app = %app.name, ?plugins, "Loading app plugins");
        self.container.register(DependencyKey::APP, app);
        self.container.register(DependencyKey::APP_CONFIG, app_config);

        let mut report = PluginReport::default();
        for plugin_name in &plugins {
            let result = self.load_if_uses_app(plugin_name, roots).await;
            report.record(plugin_name, result);
        }
        report
    }
}
