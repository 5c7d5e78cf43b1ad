//! Structured fan-out for recursive visits

use crate::error::{GraphError, GraphResult};
use std::future::Future;
use tokio::task::JoinSet;

/// Spawned visits joined with first-error-wins semantics
///
/// When a task fails, `join` returns that error right away. The remaining
/// tasks are detached: they run to completion but nobody looks at their
/// results.
#[derive(Default)]
pub struct TaskGroup {
    tasks: JoinSet<GraphResult<()>>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = GraphResult<()>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn join(mut self) -> GraphResult<()> {
        while let Some(joined) = self.tasks.join_next().await {
            let result = joined.map_err(GraphError::from).and_then(|result| result);
            if let Err(e) = result {
                self.tasks.detach_all();
                return Err(e);
            }
        }
        Ok(())
    }
}
