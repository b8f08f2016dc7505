//! Scripted sessions for task tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use evalrun_core::{AvailableModel, EvalLogger};
use evalrun_driver::{
    ActOptions, BrowserSession, DriverError, Environment, ExternalSession, ExtractOptions,
    GotoOptions, InitResponse, InitializedSession, LaunchSession, LaunchedSession, ObserveOptions,
    ObserveResult, Session, SessionConfig, SessionLauncher,
};

use crate::contract::EvalContext;

/// What a scripted session answers.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// URL reported after the first act; before that the last visited URL.
    pub url_after_act: Option<String>,
    pub act_output: Option<Value>,
    pub extract_output: Option<Value>,
    pub observations: Vec<ObserveResult>,
    pub inner_html: HashMap<String, String>,
    pub inner_text: HashMap<String, String>,
    pub visible: bool,
}

pub struct ScriptedSession {
    script: Script,
    visited: Mutex<Vec<String>>,
    acted: Mutex<Vec<ActOptions>>,
    extracted: Mutex<Vec<ExtractOptions>>,
    closed: AtomicUsize,
}

impl ScriptedSession {
    fn new(script: Script) -> Self {
        Self {
            script,
            visited: Mutex::new(Vec::new()),
            acted: Mutex::new(Vec::new()),
            extracted: Mutex::new(Vec::new()),
            closed: AtomicUsize::new(0),
        }
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    pub fn extracted(&self) -> Vec<ExtractOptions> {
        self.extracted.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

fn missing(method: &str, selector: &str) -> DriverError {
    DriverError::OperationFailed {
        method: method.to_string(),
        message: format!("no element matches {}", selector),
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&self, url: &str, _options: GotoOptions) -> Result<(), DriverError> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn url(&self) -> Result<String, DriverError> {
        let acted = !self.acted.lock().unwrap().is_empty();
        match (&self.script.url_after_act, acted) {
            (Some(url), true) => Ok(url.clone()),
            _ => Ok(self.visited.lock().unwrap().last().cloned().unwrap_or_default()),
        }
    }

    async fn act(&self, options: ActOptions) -> Result<Value, DriverError> {
        let output = self.script.act_output.clone().unwrap_or_else(|| {
            json!({"success": true, "message": "Action completed", "action": options.action})
        });
        self.acted.lock().unwrap().push(options);
        Ok(output)
    }

    async fn extract(&self, options: ExtractOptions) -> Result<Value, DriverError> {
        self.extracted.lock().unwrap().push(options);
        self.script.extract_output.clone().ok_or_else(|| DriverError::OperationFailed {
            method: "extract".to_string(),
            message: "nothing to extract".to_string(),
        })
    }

    async fn observe(&self, _options: ObserveOptions) -> Result<Vec<ObserveResult>, DriverError> {
        Ok(self.script.observations.clone())
    }

    async fn inner_text(&self, selector: &str) -> Result<String, DriverError> {
        self.script
            .inner_text
            .get(selector)
            .cloned()
            .ok_or_else(|| missing("inner_text", selector))
    }

    async fn inner_html(&self, selector: &str) -> Result<String, DriverError> {
        self.script
            .inner_html
            .get(selector)
            .cloned()
            .ok_or_else(|| missing("inner_html", selector))
    }

    async fn is_visible(&self, _selector: &str) -> Result<bool, DriverError> {
        Ok(self.script.visible)
    }

    async fn wait(&self, _duration: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn close_pages(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher handing out [`ScriptedSession`]s.
#[derive(Default)]
pub struct ScriptedLauncher {
    script: Script,
    fail: bool,
    sessions: Mutex<Vec<Arc<ScriptedSession>>>,
    configs: Mutex<Vec<SessionConfig>>,
}

impl ScriptedLauncher {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn closed_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.closed.load(Ordering::SeqCst))
            .sum()
    }

    pub fn last_session(&self) -> Arc<ScriptedSession> {
        Arc::clone(self.sessions.lock().unwrap().last().unwrap())
    }

    pub fn configs(&self) -> Vec<SessionConfig> {
        self.configs.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn launch(&self, config: &SessionConfig) -> Result<LaunchedSession, DriverError> {
        self.configs.lock().unwrap().push(config.clone());
        if self.fail {
            return Err(DriverError::ProtocolError("connection refused".to_string()));
        }
        let session = Arc::new(ScriptedSession::new(self.script.clone()));
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        Ok(LaunchedSession {
            handle: session,
            init_response: InitResponse {
                debug_url: Some("https://debug.example/fake".to_string()),
                session_url: Some("https://session.example/fake".to_string()),
                session_id: Some("fake".to_string()),
            },
        })
    }
}

fn context_with(launcher: Arc<ScriptedLauncher>, model: AvailableModel) -> EvalContext {
    let logger = EvalLogger::new();
    let config = SessionConfig::new(model, logger.clone()).with_env(Environment::Local);
    let provider = Arc::new(LaunchSession::new(launcher, config));
    EvalContext::new(model, logger, provider)
}

pub fn scripted_context(script: Script, model: AvailableModel) -> (EvalContext, Arc<ScriptedLauncher>) {
    let launcher = Arc::new(ScriptedLauncher::new(script));
    (context_with(Arc::clone(&launcher), model), launcher)
}

pub fn fake_context(model: AvailableModel) -> (EvalContext, Arc<ScriptedLauncher>) {
    scripted_context(Script::default(), model)
}

pub fn failing_context(model: AvailableModel) -> EvalContext {
    context_with(Arc::new(ScriptedLauncher::failing()), model)
}

/// Context whose provider hands out one pre-built remote session.
pub fn external_context(script: Script, model: AvailableModel) -> (EvalContext, Arc<ScriptedSession>) {
    let session = Arc::new(ScriptedSession::new(script));
    let initialized = InitializedSession {
        session: Session::new(session.clone(), Environment::Remote),
        init_response: InitResponse {
            session_url: Some("https://session.example/external".to_string()),
            ..Default::default()
        },
    };
    let ctx = EvalContext::new(model, EvalLogger::new(), Arc::new(ExternalSession::new(initialized)));
    (ctx, session)
}
