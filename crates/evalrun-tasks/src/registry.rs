//! Static task registry.

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use evalrun_core::{EvalCategory, TaskResult};

use crate::contract::EvalContext;
use crate::tasks;

/// Entry point of a task.
pub type TaskFn = fn(EvalContext) -> BoxFuture<'static, TaskResult>;

/// One registered task.
#[derive(Clone, Copy)]
pub struct TaskDefinition {
    pub name: &'static str,

    /// Instruction describing what the task checks.
    pub prompt: &'static str,

    pub start_url: &'static str,

    /// JSON Schema of the extraction, for extract tasks.
    pub output_schema: Option<fn() -> Value>,

    pub tags: &'static [EvalCategory],

    pub run: TaskFn,
}

impl TaskDefinition {
    pub fn has_tag(&self, tag: EvalCategory) -> bool {
        self.tags.contains(&tag)
    }

    pub fn schema(&self) -> Option<Value> {
        self.output_schema.map(|build| build())
    }

    /// Serializable description for listings.
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            name: self.name,
            prompt: self.prompt,
            start_url: self.start_url,
            tags: self.tags.to_vec(),
            output_schema: self.schema(),
        }
    }
}

impl std::fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .field("start_url", &self.start_url)
            .field("tags", &self.tags)
            .finish()
    }
}

/// Listing view of a task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub name: &'static str,
    pub prompt: &'static str,
    pub start_url: &'static str,
    pub tags: Vec<EvalCategory>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

/// Lookup failures. These are caller errors, not task failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

static TASKS: &[TaskDefinition] = &[
    tasks::wikipedia::DEFINITION,
    tasks::simple_google_search::DEFINITION,
    tasks::peeler_simple::DEFINITION,
    tasks::nonsense_action::DEFINITION,
    tasks::amazon_add_to_cart::DEFINITION,
    tasks::vanta::DEFINITION,
    tasks::ionwave_observe::DEFINITION,
    tasks::extract_repo_name::DEFINITION,
    tasks::extract_github_stars::DEFINITION,
    tasks::extract_press_releases::DEFINITION,
];

/// Every registered task, in registration order.
pub fn all() -> &'static [TaskDefinition] {
    TASKS
}

/// Find a task by exact name.
pub fn lookup(name: &str) -> Result<&'static TaskDefinition, RegistryError> {
    TASKS
        .iter()
        .find(|task| task.name == name)
        .ok_or_else(|| RegistryError::UnknownTask(name.to_string()))
}

/// Tasks carrying `tag`.
pub fn tasks_with_tag(tag: EvalCategory) -> Vec<&'static TaskDefinition> {
    TASKS.iter().filter(|task| task.has_tag(tag)).collect()
}
