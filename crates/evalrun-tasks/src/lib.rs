//! evalrun Tasks
//!
//! The task contract, the static registry of eval tasks and the runner
//! that executes them against one or more models and scores the results.
//!
//! Every task is a plain function from [`EvalContext`] to a boxed future
//! of [`evalrun_core::TaskResult`]. Tasks obtain their session from the
//! context's [`evalrun_driver::SessionProvider`], so the same task runs
//! against a session handed in by the caller or one it initializes itself.

pub mod contract;
pub mod registry;
pub mod runner;
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;

pub use contract::{run_with_session, EvalContext, TaskError};
pub use registry::{all, lookup, tasks_with_tag, RegistryError, TaskDefinition, TaskFn, TaskSummary};
pub use runner::{EvalRunner, EvalSummary, TestcaseOutcome, DEFAULT_CONCURRENCY};
