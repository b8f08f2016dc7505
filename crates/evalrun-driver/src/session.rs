//! Browser session abstraction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::DriverError;
use crate::types::{
    ActOptions, Environment, ExtractOptions, GotoOptions, InitResponse, ObserveOptions,
    ObserveResult,
};

/// Operations the automation library exposes on one live browser context.
///
/// Implement this trait to plug in a different way of reaching the
/// library. The bridge subprocess is the production implementation.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the active page.
    async fn goto(&self, url: &str, options: GotoOptions) -> Result<(), DriverError>;

    /// URL of the active page.
    async fn url(&self) -> Result<String, DriverError>;

    /// Perform one instructed interaction and return the library's raw output.
    async fn act(&self, options: ActOptions) -> Result<Value, DriverError>;

    /// Extract structured data.
    async fn extract(&self, options: ExtractOptions) -> Result<Value, DriverError>;

    /// Enumerate interactive candidates.
    async fn observe(&self, options: ObserveOptions) -> Result<Vec<ObserveResult>, DriverError>;

    /// Inner text of the first element matching `selector`.
    async fn inner_text(&self, selector: &str) -> Result<String, DriverError>;

    /// Inner HTML of the first element matching `selector`.
    async fn inner_html(&self, selector: &str) -> Result<String, DriverError>;

    /// Whether the first element matching `selector` is visible.
    async fn is_visible(&self, selector: &str) -> Result<bool, DriverError>;

    /// Let the page settle for `duration`.
    async fn wait(&self, duration: Duration) -> Result<(), DriverError> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    /// Close every page of the context.
    async fn close_pages(&self) -> Result<(), DriverError>;

    /// Close the context. The session is unusable afterwards.
    async fn close(&self) -> Result<(), DriverError>;
}

/// One live session owned by a single task or command.
///
/// [`Session::close`] closes the pages first, then the context, and only
/// ever runs once.
pub struct Session {
    page: Arc<dyn BrowserSession>,
    env: Environment,
    closed: AtomicBool,
}

impl Session {
    /// Wrap a session handle.
    pub fn new(page: Arc<dyn BrowserSession>, env: Environment) -> Self {
        Self {
            page,
            env,
            closed: AtomicBool::new(false),
        }
    }

    /// The session's page operations.
    pub fn page(&self) -> &dyn BrowserSession {
        self.page.as_ref()
    }

    pub fn env(&self) -> Environment {
        self.env
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the session.
    ///
    /// Page close failures are logged and do not stop the context from
    /// being closed. Calls after the first are no-ops.
    pub async fn close(&self) -> Result<(), DriverError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Session already closed");
            return Ok(());
        }

        if let Err(e) = self.page.close_pages().await {
            warn!(error = %e, "Failed to close pages, closing session anyway");
        }

        let result = self.page.close().await;
        match &result {
            Ok(()) => info!(env = %self.env, "Session closed"),
            Err(e) => warn!(env = %self.env, error = %e, "Session close failed"),
        }
        result
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("env", &self.env)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A ready session plus what the library reported when creating it.
#[derive(Debug)]
pub struct InitializedSession {
    pub session: Session,
    pub init_response: InitResponse,
}
