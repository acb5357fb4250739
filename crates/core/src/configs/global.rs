use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{KboxError, KboxResult};

/// Global kbox configuration, usually `.kbox/config.yml`.
#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GlobalConfig {
    /// Source checkout of kbox, searched for plugins first.
    pub src_root: PathBuf,
    /// Installation root of kbox, searched for plugins second.
    pub kalabox_root: PathBuf,
    /// Plugins loaded at startup, in order. Plugins that need an app are skipped.
    #[serde(default)]
    pub global_plugins: Vec<String>,
}

impl GlobalConfig {
    /// Plugin search roots in probe order.
    pub fn plugin_dirs(&self) -> Vec<PathBuf> {
        vec![self.src_root.clone(), self.kalabox_root.clone()]
    }

    /// Make relative roots relative to `base` instead of the process cwd.
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        if self.src_root.is_relative() {
            self.src_root = base.join(&self.src_root);
        }
        if self.kalabox_root.is_relative() {
            self.kalabox_root = base.join(&self.kalabox_root);
        }
        self
    }
}

pub fn parse_global_config(yaml_str: &str) -> KboxResult<GlobalConfig> {
    let config: GlobalConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}

/// Read and parse the global config; relative roots resolve against the file's directory.
pub fn load_global_config(path: &Path) -> KboxResult<GlobalConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        KboxError::Config(format!("Failed to read global config {}: {}", path.display(), e))
    })?;
    let config = parse_global_config(&content).map_err(|e| {
        KboxError::Config(format!("Failed to parse global config {}: {}", path.display(), e))
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.resolve_relative_to(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_config() {
        let config = parse_global_config(
            "srcRoot: /opt/kbox/src\nkalaboxRoot: /home/me/.kbox\nglobalPlugins: [engine, services]\n",
        )
        .unwrap();

        assert_eq!(
            config.plugin_dirs(),
            vec![PathBuf::from("/opt/kbox/src"), PathBuf::from("/home/me/.kbox")]
        );
        assert_eq!(config.global_plugins, vec!["engine", "services"]);
    }

    #[test]
    fn test_global_plugins_default_to_empty() {
        let config = parse_global_config("srcRoot: a\nkalaboxRoot: b\n").unwrap();
        assert!(config.global_plugins.is_empty());
    }

    #[test]
    fn test_load_resolves_relative_roots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "srcRoot: src\nkalaboxRoot: /abs\n").unwrap();

        let config = load_global_config(&path).unwrap();
        assert_eq!(config.src_root, dir.path().join("src"));
        assert_eq!(config.kalabox_root, PathBuf::from("/abs"));
    }

    #[test]
    fn test_load_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "srcRoot: a\n").unwrap();

        let err = load_global_config(&path).unwrap_err();
        assert!(matches!(err, KboxError::Config(ref msg) if msg.contains("config.yml")));
    }
}
