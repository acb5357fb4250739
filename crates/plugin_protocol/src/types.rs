//! Core types shared between kbox and its plugins.
//!
//! - [`DependencyKey`] - Name of a value a plugin can ask to have injected
//! - [`TaskPath`] - Namespaced path of a task in the command tree

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::{Borrow, Cow};
use std::fmt;

/// Name of an injectable dependency.
///
/// Plugins declare the keys they need instead of receiving a fixed argument
/// list. The loader and the task registry bind the well-known keys below;
/// callers may add their own through scoped overrides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DependencyKey(Cow<'static, str>);

impl DependencyKey {
    /// The application context (`App`) of the app being worked on.
    pub const APP: DependencyKey = DependencyKey::from_static("app");
    /// The parsed `kbox.yml` of the app being worked on.
    pub const APP_CONFIG: DependencyKey = DependencyKey::from_static("appConfig");
    /// Name of the plugin currently being initialized.
    pub const PLUGIN: DependencyKey = DependencyKey::from_static("plugin");
    /// The task registry plugins register their tasks into.
    pub const TASKS: DependencyKey = DependencyKey::from_static("tasks");
    /// The global configuration kbox was started with.
    pub const GLOBAL_CONFIG: DependencyKey = DependencyKey::from_static("globalConfig");

    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DependencyKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for DependencyKey {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for DependencyKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl PartialEq<str> for DependencyKey {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for DependencyKey {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Path of a task in the command tree.
///
/// A single string is a one-segment path; a list is an ordered sequence of
/// segments. Segment names are opaque, no characters are reserved.
///
/// ```rust
/// # use kbox_plugin_protocol::TaskPath;
/// let path = TaskPath::from(["db", "start"]);
/// assert_eq!(path.segments(), ["db", "start"]);
///
/// let single = TaskPath::from("version");
/// assert_eq!(single.segments(), ["version"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TaskPath {
    Single(String),
    Segments(Vec<String>),
}

impl TaskPath {
    /// Borrow the path as a slice of segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        match self {
            TaskPath::Single(name) => std::slice::from_ref(name),
            TaskPath::Segments(names) => names,
        }
    }

    #[must_use]
    pub fn into_segments(self) -> Vec<String> {
        match self {
            TaskPath::Single(name) => vec![name],
            TaskPath::Segments(names) => names,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments().is_empty()
    }

    /// Prepend a namespace segment, e.g. the name of the app a task belongs to.
    #[must_use]
    pub fn prefixed(self, namespace: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.segments().len() + 1);
        segments.push(namespace.into());
        segments.extend(self.into_segments());
        TaskPath::Segments(segments)
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join(" "))
    }
}

impl From<&str> for TaskPath {
    fn from(name: &str) -> Self {
        TaskPath::Single(name.to_string())
    }
}

impl From<String> for TaskPath {
    fn from(name: String) -> Self {
        TaskPath::Single(name)
    }
}

impl From<Vec<String>> for TaskPath {
    fn from(names: Vec<String>) -> Self {
        TaskPath::Segments(names)
    }
}

impl From<&[String]> for TaskPath {
    fn from(names: &[String]) -> Self {
        TaskPath::Segments(names.to_vec())
    }
}

impl From<Vec<&str>> for TaskPath {
    fn from(names: Vec<&str>) -> Self {
        TaskPath::Segments(names.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TaskPath {
    fn from(names: [&str; N]) -> Self {
        TaskPath::Segments(names.iter().map(|s| s.to_string()).collect())
    }
}
