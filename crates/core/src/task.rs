//! Uniform invocable wrapper around registered task bodies.

use std::fmt;
use std::sync::Arc;

use crate::types::{KboxError, KboxResult};

/// Body of a task. Receives the unconsumed remainder of the command path.
pub type TaskBody = Arc<dyn Fn(&[String]) -> anyhow::Result<()> + Send + Sync>;

/// Box a closure as a [`TaskBody`].
pub fn task_body<F>(f: F) -> TaskBody
where
    F: Fn(&[String]) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Clone)]
pub struct Task {
    name: String,
    body: TaskBody,
}

impl Task {
    pub fn new(name: impl Into<String>, body: TaskBody) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The body exactly as it was registered.
    pub fn body(&self) -> &TaskBody {
        &self.body
    }

    pub fn run(&self, args: &[String]) -> KboxResult<()> {
        tracing::debug!(task = %self.name, ?args, "Running task");
        (self.body)(args).map_err(|e| match e.downcast::<KboxError>() {
            // Already attributed, e.g. by the command executor
            Ok(failed @ KboxError::TaskFailed { .. }) => failed,
            Ok(other) => KboxError::TaskFailed {
                task: self.name.clone(),
                message: other.to_string(),
            },
            Err(e) => KboxError::TaskFailed {
                task: self.name.clone(),
                message: format!("{e:#}"),
            },
        })
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("body", &"<opaque>")
            .finish()
    }
}
