//! Task node tree
//!
//! The command namespace as an n-ary tree. Nodes live in an arena owned by
//! [`TaskTree`] and are addressed by [`NodeId`]; a node is never removed once
//! created, so ids stay valid for the lifetime of the tree.

use std::ops::Index;

use crate::task::Task;

/// Handle to a node of a [`TaskTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One segment of the command path.
#[derive(Debug, Clone)]
pub struct TaskNode {
    id: NodeId,
    name: Option<String>,
    task: Option<Task>,
    sort_index: i32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TaskNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// `None` only for the root.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn sort_index(&self) -> i32 {
        self.sort_index
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct TaskTree {
    nodes: Vec<TaskNode>,
}

impl Default for TaskTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTree {
    /// A tree holding only the nameless, taskless root.
    pub fn new() -> Self {
        Self {
            nodes: vec![TaskNode {
                id: NodeId(0),
                name: None,
                task: None,
                sort_index: 0,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].is_leaf()
    }

    /// `None` for ids handed out by another tree.
    pub fn get(&self, id: NodeId) -> Option<&TaskNode> {
        self.nodes.get(id.0)
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self[id].is_leaf()
    }

    /// Append a child under `parent` and return its id.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        task: Option<Task>,
        sort_index: i32,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TaskNode {
            id,
            name: Some(name.into()),
            task,
            sort_index,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Attach `task` to an existing node, returning the task it replaced.
    pub fn set_task(&mut self, id: NodeId, task: Task) -> Option<Task> {
        self.nodes[id.0].task.replace(task)
    }

    /// Direct child of `parent` called `name`.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self[parent]
            .children
            .iter()
            .copied()
            .find(|child| self[*child].name() == Some(name))
    }

    /// Children of `id` ordered for presentation: by `sort_index`, ties keep
    /// insertion order.
    pub fn children_for_display(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = self[id].children.clone();
        children.sort_by_key(|child| self[*child].sort_index);
        children
    }

    /// Pre-order depth-first traversal starting at `start`.
    ///
    /// `callback(node, parent, depth)` runs for every node of the subtree,
    /// `start` included with depth 0 and no parent. Depth counts edges from
    /// `start`, not from the root of the tree.
    pub fn walk<F>(&self, start: NodeId, mut callback: F)
    where
        F: FnMut(&TaskNode, Option<&TaskNode>, usize),
    {
        let mut stack: Vec<(NodeId, Option<NodeId>, usize)> = vec![(start, None, 0)];
        while let Some((id, parent, depth)) = stack.pop() {
            let node = &self[id];
            callback(node, parent.map(|p| &self[p]), depth);
            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .map(|child| (*child, Some(id), depth + 1)),
            );
        }
    }
}

impl Index<NodeId> for TaskTree {
    type Output = TaskNode;

    fn index(&self, id: NodeId) -> &TaskNode {
        &self.nodes[id.0]
    }
}
