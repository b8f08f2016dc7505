//! Session initializer.
//!
//! Builds one live session from a [`SessionConfig`]. Launch failures are
//! reported as [`InitializationError`] with the targeted endpoint; there
//! are no internal retries.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use evalrun_core::{AuxiliaryValue, AvailableModel, EvalLogger, LogLine};

use crate::error::{DriverError, InitializationError};
use crate::session::{BrowserSession, InitializedSession, Session};
use crate::types::{Environment, InitResponse, LaunchOptions};

/// Environment variable selecting the default [`Environment`].
pub const EVAL_ENV_VAR: &str = "EVAL_ENV";

/// Endpoint name reported when no CDP endpoint was configured.
const LOCAL_ENDPOINT: &str = "local browser";

/// Raw outcome of a launcher: a session handle plus the library's report.
pub struct LaunchedSession {
    pub handle: Arc<dyn BrowserSession>,
    pub init_response: InitResponse,
}

impl std::fmt::Debug for LaunchedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedSession")
            .field("init_response", &self.init_response)
            .finish_non_exhaustive()
    }
}

/// Something that can bring up a browser session.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, config: &SessionConfig) -> Result<LaunchedSession, DriverError>;
}

/// Behavior overrides applied on top of a [`SessionConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOverrides {
    #[serde(default)]
    pub dom_settle_timeout_ms: Option<u64>,

    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub env: Option<Environment>,

    #[serde(default)]
    pub cdp_url: Option<String>,
}

impl SessionOverrides {
    pub fn with_dom_settle_timeout_ms(mut self, ms: u64) -> Self {
        self.dom_settle_timeout_ms = Some(ms);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Everything needed to initialize one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model_name: AvailableModel,

    /// Run log the session's diagnostics are written to.
    pub logger: EvalLogger,

    pub env: Environment,
    pub cdp_url: Option<String>,
    pub headless: bool,
    pub verbose: u8,
    pub debug_dom: bool,
    pub enable_caching: bool,
    pub dom_settle_timeout_ms: Option<u64>,
    pub system_prompt: Option<String>,
}

impl SessionConfig {
    /// Config with harness defaults; the environment comes from `EVAL_ENV`.
    pub fn new(model_name: AvailableModel, logger: EvalLogger) -> Self {
        let env = Environment::from_eval_env(std::env::var(EVAL_ENV_VAR).ok().as_deref());
        Self {
            model_name,
            logger,
            env,
            cdp_url: None,
            headless: false,
            verbose: 2,
            debug_dom: true,
            enable_caching: false,
            dom_settle_timeout_ms: None,
            system_prompt: None,
        }
    }

    /// Config for attaching to an existing browser over CDP.
    pub fn remote(model_name: AvailableModel, logger: EvalLogger, cdp_url: impl Into<String>) -> Self {
        Self::new(model_name, logger)
            .with_env(Environment::Remote)
            .with_cdp_url(cdp_url)
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn with_cdp_url(mut self, cdp_url: impl Into<String>) -> Self {
        self.cdp_url = Some(cdp_url.into());
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug_dom(mut self, debug_dom: bool) -> Self {
        self.debug_dom = debug_dom;
        self
    }

    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_caching(mut self, enable_caching: bool) -> Self {
        self.enable_caching = enable_caching;
        self
    }

    /// Apply overrides; set fields win over the current values.
    pub fn apply(mut self, overrides: &SessionOverrides) -> Self {
        if let Some(ms) = overrides.dom_settle_timeout_ms {
            self.dom_settle_timeout_ms = Some(ms);
        }
        if let Some(prompt) = &overrides.system_prompt {
            self.system_prompt = Some(prompt.clone());
        }
        if let Some(env) = overrides.env {
            self.env = env;
        }
        if let Some(cdp_url) = &overrides.cdp_url {
            self.cdp_url = Some(cdp_url.clone());
        }
        self
    }

    /// Endpoint name used in logs and errors.
    pub fn endpoint(&self) -> &str {
        self.cdp_url.as_deref().unwrap_or(LOCAL_ENDPOINT)
    }

    /// Options sent to the library's `init`.
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            env: self.env,
            model_name: self.model_name,
            cdp_url: self.cdp_url.clone(),
            headless: self.headless,
            verbose: self.verbose,
            debug_dom: self.debug_dom,
            enable_caching: self.enable_caching,
            dom_settle_timeout_ms: self.dom_settle_timeout_ms,
            system_prompt: self.system_prompt.clone(),
        }
    }
}

/// Initialize one session.
pub async fn init_session(
    launcher: &dyn SessionLauncher,
    config: SessionConfig,
) -> Result<InitializedSession, InitializationError> {
    let endpoint = config.endpoint().to_string();
    info!(
        env = %config.env,
        model = %config.model_name,
        endpoint = %endpoint,
        "Initializing session"
    );

    let launched = match launcher.launch(&config).await {
        Ok(launched) => launched,
        Err(source) => {
            warn!(endpoint = %endpoint, error = %source, "Session initialization failed");
            config.logger.error(
                LogLine::error(format!("failed to initialize session: {}", source))
                    .with_category("init")
                    .with_aux("endpoint", AuxiliaryValue::string(&endpoint)),
            );
            return Err(InitializationError { endpoint, source });
        }
    };

    let mut line = LogLine::info("session initialized")
        .with_category("init")
        .with_aux("env", AuxiliaryValue::string(config.env.as_str()))
        .with_aux("modelName", AuxiliaryValue::string(config.model_name.as_str()));
    if let Some(debug_url) = &launched.init_response.debug_url {
        line = line.with_aux("debugUrl", AuxiliaryValue::string(debug_url));
    }
    config.logger.log(line);

    Ok(InitializedSession {
        session: Session::new(launched.handle, config.env),
        init_response: launched.init_response,
    })
}
