//! Session providers.
//!
//! A task asks its provider for a ready session and does not care whether
//! the session was handed in by the caller or initialized on demand.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{DriverError, InitializationError};
use crate::initializer::{init_session, SessionConfig, SessionLauncher, SessionOverrides};
use crate::session::InitializedSession;

/// Capability: "give me a ready session".
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Acquire a session. The caller owns it and must close it.
    ///
    /// `overrides` tune the session when the provider creates it; an
    /// externally supplied session is already configured and ignores them.
    async fn acquire(
        &self,
        overrides: &SessionOverrides,
    ) -> Result<InitializedSession, InitializationError>;
}

/// Hands out one session that the caller built beforehand.
///
/// The session can be taken once; further acquisitions fail.
pub struct ExternalSession {
    endpoint: String,
    slot: Mutex<Option<InitializedSession>>,
}

impl ExternalSession {
    pub fn new(session: InitializedSession) -> Self {
        let endpoint = session
            .init_response
            .session_url
            .clone()
            .unwrap_or_else(|| "external session".to_string());
        Self {
            endpoint,
            slot: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionProvider for ExternalSession {
    async fn acquire(
        &self,
        overrides: &SessionOverrides,
    ) -> Result<InitializedSession, InitializationError> {
        if *overrides != SessionOverrides::default() {
            debug!(?overrides, "Ignoring overrides for externally supplied session");
        }

        let taken = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        taken.ok_or_else(|| InitializationError {
            endpoint: self.endpoint.clone(),
            source: DriverError::SessionUnavailable(
                "external session was already taken".to_string(),
            ),
        })
    }
}

/// Initializes a fresh session from a config on every acquisition.
pub struct LaunchSession {
    launcher: Arc<dyn SessionLauncher>,
    config: SessionConfig,
}

impl LaunchSession {
    pub fn new(launcher: Arc<dyn SessionLauncher>, config: SessionConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

#[async_trait]
impl SessionProvider for LaunchSession {
    async fn acquire(
        &self,
        overrides: &SessionOverrides,
    ) -> Result<InitializedSession, InitializationError> {
        let config = self.config.clone().apply(overrides);
        init_session(self.launcher.as_ref(), config).await
    }
}
