//! Top-level kbox context
//!
//! [`Kbox`] owns the injection container, the task registry and the plugin
//! loader. Creating one binds `tasks` and `globalConfig` so plugins can ask
//! for them; loading an app additionally binds `app` and `appConfig`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use kbox_core::kbox::{Kbox, RunOutcome};
//! use std::path::Path;
//!
//! # async fn example() -> kbox_core::types::KboxResult<()> {
//! let mut kbox = Kbox::load(Path::new(".kbox/config.yml"))?;
//! kbox.init_global_plugins().await;
//! kbox.load_app(Path::new(".")).await?;
//!
//! let argv = vec!["shop".to_string(), "db".to_string()];
//! if let RunOutcome::Menu(menu) = kbox.run(&argv).await? {
//!     print!("{menu}");
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use kbox_plugin_protocol::DependencyKey;

use crate::configs::{load_app, load_global_config, App, GlobalConfig};
use crate::deps::Container;
use crate::plugin::{ManifestSource, PluginLoader, PluginReport, PluginSource};
use crate::tasks::TaskRegistry;
use crate::types::{KboxError, KboxResult};

/// What [`Kbox::run`] did with a command path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A task ran to completion.
    Ran { task: String },
    /// The path named a group; this is its command menu.
    Menu(String),
    NotFound,
}

#[derive(Debug)]
pub struct Kbox {
    container: Arc<Container>,
    tasks: Arc<TaskRegistry>,
    loader: PluginLoader,
    global_config: GlobalConfig,
    app: Option<App>,
}

impl Kbox {
    pub fn new(global_config: GlobalConfig) -> Self {
        Self::with_source(global_config, Arc::new(ManifestSource))
    }

    /// Context whose plugins are read through `source`.
    pub fn with_source(global_config: GlobalConfig, source: Arc<dyn PluginSource>) -> Self {
        let container = Arc::new(Container::new());
        let tasks = Arc::new(TaskRegistry::new());
        tasks.init();
        container.register_binding(DependencyKey::TASKS, tasks.clone());
        container.register(DependencyKey::GLOBAL_CONFIG, global_config.clone());

        Self {
            loader: PluginLoader::with_source(container.clone(), source),
            container,
            tasks,
            global_config,
            app: None,
        }
    }

    /// Context for the global config at `config_path`.
    pub fn load(config_path: &Path) -> KboxResult<Self> {
        let global_config = load_global_config(config_path)?;
        tracing::debug!(
            config = %config_path.display(),
            src_root = %global_config.src_root.display(),
            kalabox_root = %global_config.kalabox_root.display(),
            "Loaded global config"
        );
        Ok(Self::new(global_config))
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    pub fn global_config(&self) -> &GlobalConfig {
        &self.global_config
    }

    /// The loaded app, if any.
    pub fn app(&self) -> Option<&App> {
        self.app.as_ref()
    }

    pub async fn init_global_plugins(&self) -> PluginReport {
        self.loader.init_global_plugins(&self.global_config).await
    }

    /// Load the app in `app_dir` and its plugins. `Ok(None)` when `app_dir` is not an app.
    pub async fn load_app(&mut self, app_dir: &Path) -> KboxResult<Option<PluginReport>> {
        let Some((app, app_config)) = load_app(app_dir)? else {
            tracing::debug!(dir = %app_dir.display(), "No app config found");
            return Ok(None);
        };

        tracing::info!(app = %app.name, root = %app.root.display(), "Loading app");
        self.app = Some(app.clone());
        let roots = self.global_config.plugin_dirs();
        Ok(Some(self.loader.init_app_plugins(app, app_config, &roots).await))
    }

    /// Run the task at `argv`, or render the menu of the group it names.
    ///
    /// A group that carries its own task runs it. Words left over after a
    /// leaf task are passed to it as arguments.
    pub async fn run(&self, argv: &[String]) -> KboxResult<RunOutcome> {
        let Some(found) = self.tasks.get_task(argv.to_vec(), None)? else {
            return Ok(RunOutcome::NotFound);
        };

        match found.task {
            Some(task) => {
                let name = task.name().to_string();
                let args = found.args;
                tokio::task::spawn_blocking(move || task.run(&args))
                    .await
                    .map_err(|e| KboxError::TaskFailed {
                        task: name.clone(),
                        message: e.to_string(),
                    })??;
                Ok(RunOutcome::Ran { task: name })
            }
            None => Ok(RunOutcome::Menu(self.tasks.pretty_print(Some(found.node))?)),
        }
    }

    /// Drop every task and binding.
    pub fn teardown(&self) {
        self.tasks.teardown();
        self.container.clear();
        tracing::debug!("Kbox context torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::app::APP_CONFIG_FILENAME;
    use crate::plugin::PLUGIN_DIRNAME;
    use crate::task::task_body;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn write_plugin(root: &Path, name: &str, manifest: &str) {
        let dir = root.join(PLUGIN_DIRNAME).join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("plugin.yml"), manifest).unwrap();
    }

    fn config(src: &Path, home: &Path, plugins: &[&str]) -> GlobalConfig {
        GlobalConfig {
            src_root: src.to_path_buf(),
            kalabox_root: home.to_path_buf(),
            global_plugins: plugins.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_new_binds_tasks_and_global_config() {
        let kbox = Kbox::new(config(Path::new("/src"), Path::new("/home"), &[]));

        assert!(kbox.tasks().is_ready());
        assert!(kbox.container().get::<TaskRegistry>("tasks").is_ok());
        let bound = kbox.container().get::<GlobalConfig>("globalConfig").unwrap();
        assert_eq!(bound.src_root, PathBuf::from("/src"));
        assert!(kbox.app().is_none());
    }

    #[tokio::test]
    async fn test_global_plugins_register_tasks() {
        let src = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write_plugin(
            home.path(),
            "engine",
            "dependencies: [globalConfig]\ntasks:\n  - path: [engine, up]\n    command: 'true'\n  - path: [engine, down]\n    command: 'true'\n",
        );
        write_plugin(src.path(), "db", "dependencies: [app]\n");

        let kbox = Kbox::new(config(src.path(), home.path(), &["engine", "db", "missing"]));
        let report = kbox.init_global_plugins().await;

        assert_eq!(report.loaded, vec!["engine"]);
        assert_eq!(report.skipped, vec!["db"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(kbox.tasks().count().unwrap(), 2);

        let menu = kbox.run(&argv(&["engine"])).await.unwrap();
        assert_eq!(
            menu,
            RunOutcome::Menu(" --- Command Menu ---\nup\ndown\n".to_string())
        );
        assert_eq!(kbox.run(&argv(&["nope"])).await.unwrap(), RunOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_directory_without_app_loads_nothing() {
        let src = tempfile::tempdir().unwrap();
        let app_dir = tempfile::tempdir().unwrap();
        let mut kbox = Kbox::new(config(src.path(), src.path(), &[]));

        assert!(kbox.load_app(app_dir.path()).await.unwrap().is_none());
        assert!(kbox.app().is_none());
        assert!(!kbox.container().contains("app"));
    }

    #[tokio::test]
    async fn test_group_with_its_own_task_runs_it() {
        let kbox = Kbox::new(config(Path::new("/src"), Path::new("/home"), &[]));
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        kbox.tasks()
            .register(["db", "start"], task_body(|_| Ok(())))
            .unwrap();
        kbox.tasks()
            .register(
                "db",
                task_body(move |_| {
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .unwrap();

        assert_eq!(
            kbox.run(&argv(&["db"])).await.unwrap(),
            RunOutcome::Ran {
                task: "db".to_string()
            }
        );
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(
            kbox.run(&argv(&["db", "start"])).await.unwrap(),
            RunOutcome::Ran {
                task: "start".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_teardown_clears_tasks_and_bindings() {
        let kbox = Kbox::new(config(Path::new("/src"), Path::new("/home"), &[]));
        kbox.teardown();

        assert!(!kbox.tasks().is_ready());
        assert!(!kbox.container().contains("globalConfig"));
        assert!(matches!(
            kbox.run(&argv(&["anything"])).await,
            Err(KboxError::RegistryNotInitialized)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_app_task_runs_in_app_root() {
        let src = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let app_dir = tempfile::tempdir().unwrap();
        write_plugin(
            src.path(),
            "db",
            "dependencies: [app, appConfig]\ntasks:\n  - path: [db, start]\n    command: 'printf \"%s\" \"$KBOX_APP\" > started'\n",
        );
        std::fs::write(
            app_dir.path().join(APP_CONFIG_FILENAME),
            "name: shop\nplugins: [db]\n",
        )
        .unwrap();

        let mut kbox = Kbox::new(config(src.path(), home.path(), &[]));
        let report = kbox.load_app(app_dir.path()).await.unwrap().unwrap();
        assert_eq!(report.loaded, vec!["db"]);
        assert_eq!(kbox.app().map(|app| app.name.as_str()), Some("shop"));

        assert_eq!(
            kbox.run(&argv(&["shop", "db"])).await.unwrap(),
            RunOutcome::Menu(" --- Command Menu ---\nstart\n".to_string())
        );
        assert_eq!(
            kbox.run(&argv(&["shop", "db", "start"])).await.unwrap(),
            RunOutcome::Ran {
                task: "start".to_string()
            }
        );
        let started = std::fs::read_to_string(app_dir.path().join("started")).unwrap();
        assert_eq!(started, "shop");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_task_is_reported() {
        let src = tempfile::tempdir().unwrap();
        write_plugin(
            src.path(),
            "engine",
            "tasks:\n  - path: broken\n    command: 'exit 3'\n",
        );
        let kbox = Kbox::new(config(src.path(), src.path(), &["engine"]));
        assert!(kbox.init_global_plugins().await.is_success());

        let err = kbox.run(&argv(&["broken"])).await.unwrap_err();
        assert!(matches!(err, KboxError::TaskFailed { ref task, .. } if task == "broken"));
    }
}
