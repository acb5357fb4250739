//! Task registry
//!
//! Maps namespaced task paths onto a [`TaskTree`] and provides lookup,
//! traversal and the command menu rendering. The registry starts
//! uninitialized; [`TaskRegistry::init`] creates the root and every other
//! operation fails with [`KboxError::RegistryNotInitialized`] before that.

use std::fmt::Write as _;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kbox_plugin_protocol::TaskPath;

use crate::task::{Task, TaskBody};
use crate::task_tree::{NodeId, TaskNode, TaskTree};
use crate::types::{KboxError, KboxResult};

/// Result of a prefix lookup: the matched node and the unconsumed path.
#[derive(Debug, Clone)]
pub struct TaskMatch {
    pub node: NodeId,
    /// `None` when the match is the root.
    pub name: Option<String>,
    pub task: Option<Task>,
    pub is_leaf: bool,
    /// Segments left over after the match, passed to the task as arguments.
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tree: RwLock<Option<TaskTree>>,
}

impl TaskRegistry {
    /// An uninitialized registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<TaskTree>> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<TaskTree>> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the root on first call. Returns whether this call did it.
    pub fn init(&self) -> bool {
        let mut tree = self.write();
        if tree.is_some() {
            return false;
        }
        *tree = Some(TaskTree::new());
        tracing::debug!("Task registry initialized");
        true
    }

    /// Drop the tree and go back to the uninitialized state.
    pub fn teardown(&self) {
        if self.write().take().is_some() {
            tracing::debug!("Task registry torn down");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.read().is_some()
    }

    /// Run `f` against the tree while holding the read lock.
    ///
    /// The tree cannot be modified from inside `f`; registering a task from
    /// within `f` would wait on the lock forever.
    pub fn with_tree<R>(&self, f: impl FnOnce(&TaskTree) -> R) -> KboxResult<R> {
        let tree = self.read();
        let tree = tree.as_ref().ok_or(KboxError::RegistryNotInitialized)?;
        Ok(f(tree))
    }

    /// Register `body` at `path` with the default sort index.
    pub fn register(&self, path: impl Into<TaskPath>, body: TaskBody) -> KboxResult<NodeId> {
        self.register_task(path, body, 0)
    }

    /// Register `body` at `path`, creating grouping nodes for missing segments.
    ///
    /// Existing nodes are reused by name, including the final one. A path
    /// registered twice keeps the last body.
    pub fn register_task(
        &self,
        path: impl Into<TaskPath>,
        body: TaskBody,
        sort_index: i32,
    ) -> KboxResult<NodeId> {
        let path = path.into();
        let Some((last, parents)) = path.segments().split_last() else {
            return Err(KboxError::InvalidTaskPath(
                "a task path needs at least one segment".to_string(),
            ));
        };

        let mut tree = self.write();
        let tree = tree.as_mut().ok_or(KboxError::RegistryNotInitialized)?;

        let mut parent = tree.root();
        for name in parents {
            parent = match tree.find_child(parent, name) {
                Some(existing) => existing,
                None => tree.add_child(parent, name.as_str(), None, sort_index),
            };
        }

        let task = Task::new(last.as_str(), body);
        let node = match tree.find_child(parent, last) {
            Some(existing) => {
                if tree.set_task(existing, task).is_some() {
                    tracing::warn!(
                        task = %path,
                        "Task registered twice, keeping the last registration"
                    );
                }
                existing
            }
            None => tree.add_child(parent, last.as_str(), Some(task), sort_index),
        };

        tracing::debug!(task = %path, sort_index, "Task registered");
        Ok(node)
    }

    /// Resolve the longest registered prefix of `path`, starting at `start`
    /// (the root when `None`).
    ///
    /// Matching stops when the path is used up or a leaf is reached; the rest
    /// of the path comes back as [`TaskMatch::args`]. A segment that matches
    /// no child yields `None`.
    pub fn get_task(
        &self,
        path: impl Into<TaskPath>,
        start: Option<NodeId>,
    ) -> KboxResult<Option<TaskMatch>> {
        let path = path.into();
        self.with_tree(|tree| {
            let mut current = start.unwrap_or_else(|| tree.root());
            let mut remaining = path.segments();
            loop {
                let node = tree.get(current)?;
                if remaining.is_empty() || node.is_leaf() {
                    return Some(TaskMatch {
                        node: current,
                        name: node.name().map(str::to_string),
                        task: node.task().cloned(),
                        is_leaf: node.is_leaf(),
                        args: remaining.to_vec(),
                    });
                }
                current = tree.find_child(current, &remaining[0])?;
                remaining = &remaining[1..];
            }
        })
    }

    /// First node named `name` in pre-order below `start` (the root when
    /// `None`), `start` itself included.
    pub fn find_node(&self, name: &str, start: Option<NodeId>) -> KboxResult<Option<NodeId>> {
        self.with_tree(|tree| {
            let start = start.unwrap_or_else(|| tree.root());
            tree.get(start)?;
            let mut found = None;
            tree.walk(start, |node, _, _| {
                if found.is_none() && node.name() == Some(name) {
                    found = Some(node.id());
                }
            });
            found
        })
    }

    /// Number of leaf nodes, i.e. runnable tasks. Zero when nothing is registered.
    pub fn count(&self) -> KboxResult<usize> {
        self.with_tree(|tree| {
            if tree.is_empty() {
                return 0;
            }
            let mut count = 0;
            tree.walk(tree.root(), |node, _, _| {
                if node.is_leaf() {
                    count += 1;
                }
            });
            count
        })
    }

    /// Pre-order walk from `start` (the root when `None`).
    pub fn walk<F>(&self, start: Option<NodeId>, callback: F) -> KboxResult<()>
    where
        F: FnMut(&TaskNode, Option<&TaskNode>, usize),
    {
        self.with_tree(|tree| tree.walk(start.unwrap_or_else(|| tree.root()), callback))
    }

    /// Indented command menu below `start` (the root when `None`).
    pub fn pretty_print(&self, start: Option<NodeId>) -> KboxResult<String> {
        self.with_tree(|tree| {
            let mut out = String::from(" --- Command Menu ---\n");
            render(tree, start.unwrap_or_else(|| tree.root()), 0, &mut out);
            out
        })
    }
}

fn render(tree: &TaskTree, id: NodeId, depth: usize, out: &mut String) {
    if depth > 0 {
        if let Some(name) = tree[id].name() {
            let _ = writeln!(out, "{}{}", " ".repeat((depth - 1) * 4), name);
        }
    }
    for child in tree.children_for_display(id) {
        render(tree, child, depth + 1, out);
    }
}
