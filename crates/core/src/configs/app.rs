use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{KboxError, KboxResult};

/// File that marks a directory as a kbox app.
pub const APP_CONFIG_FILENAME: &str = "kbox.yml";

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppConfig {
    pub name: String,
    /// App plugins, loaded in order once the app context is bound.
    #[serde(default)]
    pub plugins: Vec<String>,
}

/// Application context injected as `app`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub name: String,
    pub root: PathBuf,
}

impl App {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }
}

pub fn parse_app_config(yaml_str: &str) -> KboxResult<AppConfig> {
    let config: AppConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}

/// Load `kbox.yml` from `app_dir`. `Ok(None)` when the directory is not an app.
pub fn load_app(app_dir: &Path) -> KboxResult<Option<(App, AppConfig)>> {
    let config_path = app_dir.join(APP_CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        KboxError::Config(format!("Failed to read app config {}: {}", config_path.display(), e))
    })?;
    let config = parse_app_config(&content).map_err(|e| {
        KboxError::Config(format!("Failed to parse app config {}: {}", config_path.display(), e))
    })?;
    Ok(Some((App::new(config.name.clone(), app_dir), config)))
}
