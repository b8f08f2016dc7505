//! The contract every eval task satisfies.
//!
//! A task never returns an error and never leaks its session: failures
//! become a `_success: false` result carrying a serializable `error`, the
//! session is closed on every path, and the run's logs are attached before
//! the result is handed back. [`run_with_session`] does all three, so task
//! bodies are written with `?`.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use evalrun_core::{
    panic_message, sanitize_message, AuxiliaryValue, AvailableModel, EvalLogger, LogLine,
    TaskResult,
};
use evalrun_driver::{
    DriverError, InitializationError, Session, SessionOverrides, SessionProvider,
};

/// Collaborators handed to a task.
#[derive(Clone)]
pub struct EvalContext {
    /// Run log; its lines are attached to the result.
    pub logger: EvalLogger,
    pub model_name: AvailableModel,
    pub use_text_extract: bool,
    pub use_accessibility_tree: bool,

    /// Where the task gets its session from.
    pub sessions: Arc<dyn SessionProvider>,
}

impl EvalContext {
    pub fn new(model_name: AvailableModel, logger: EvalLogger, sessions: Arc<dyn SessionProvider>) -> Self {
        Self {
            logger,
            model_name,
            use_text_extract: false,
            use_accessibility_tree: false,
            sessions,
        }
    }

    pub fn with_text_extract(mut self, enabled: bool) -> Self {
        self.use_text_extract = enabled;
        self
    }

    pub fn with_accessibility_tree(mut self, enabled: bool) -> Self {
        self.use_accessibility_tree = enabled;
        self
    }
}

impl std::fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("model_name", &self.model_name)
            .field("use_text_extract", &self.use_text_extract)
            .field("use_accessibility_tree", &self.use_accessibility_tree)
            .finish()
    }
}

/// Anything a task body can fail with.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The library answered with something the task cannot interpret.
    #[error("Unexpected output: {0}")]
    UnexpectedOutput(String),

    /// The task cannot run in the configured environment.
    #[error("Unsupported environment: {0}")]
    Unsupported(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The task body panicked.
    #[error("Task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Initialization(_) => "InitializationError",
            Self::Driver(_) => "ExecutionError",
            Self::UnexpectedOutput(_) => "UnexpectedOutput",
            Self::Unsupported(_) => "Unsupported",
            Self::Json(_) => "SerializationError",
            Self::Io(_) => "IoError",
            Self::Panicked(_) => "Panic",
        }
    }

    /// Serializable form stored in `TaskResult::error`.
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.kind(),
            "message": sanitize_message(&self.to_string()),
        })
    }
}

/// Acquire a session, run `body` with it, and uphold the task contract.
///
/// The session is closed after `body` finishes, fails or panics. The
/// returned result always carries the run's logs and the session links
/// reported at initialization.
pub async fn run_with_session<F, Fut>(
    ctx: EvalContext,
    overrides: SessionOverrides,
    body: F,
) -> TaskResult
where
    F: FnOnce(Arc<Session>, EvalContext) -> Fut + Send,
    Fut: Future<Output = Result<TaskResult, TaskError>> + Send,
{
    let logger = ctx.logger.clone();

    let initialized = match ctx.sessions.acquire(&overrides).await {
        Ok(initialized) => initialized,
        Err(e) => {
            let err = TaskError::from(e);
            error!(error = %err, "Failed to acquire session");
            return fail(&logger, err);
        }
    };

    let debug_url = initialized.init_response.debug_url.clone();
    let session_url = initialized.init_response.session_url.clone();
    let session = Arc::new(initialized.session);

    let run = {
        let session = Arc::clone(&session);
        async move { body(session, ctx).await }
    };
    let outcome = AssertUnwindSafe(run).catch_unwind().await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close session after task");
        logger.warn(
            LogLine::info("failed to close session")
                .with_category("session")
                .with_aux("error", AuxiliaryValue::string(e.to_string())),
        );
    }

    let result = match outcome {
        Ok(Ok(result)) => {
            info!(success = result.success, "Task finished");
            result.with_logs(logger.get_logs())
        }
        Ok(Err(err)) => {
            warn!(error = %err, "Task failed");
            fail(&logger, err)
        }
        Err(payload) => {
            let err = TaskError::Panicked(panic_message(payload.as_ref()));
            error!(error = %err, "Task panicked");
            fail(&logger, err)
        }
    };

    result.with_session_links(debug_url, session_url)
}

fn fail(logger: &EvalLogger, err: TaskError) -> TaskResult {
    logger.error(
        LogLine::error(err.to_string())
            .with_category("task")
            .with_aux("error", AuxiliaryValue::object(&err.to_value())),
    );
    TaskResult::failure(err.to_value()).with_logs(logger.get_logs())
}
