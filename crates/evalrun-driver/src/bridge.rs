//! Automation bridge running as a subprocess.
//!
//! Each session gets its own bridge process, so closing one session can
//! never disturb another session's in-flight operation.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::DriverError;
use crate::initializer::{LaunchedSession, SessionConfig, SessionLauncher};
use crate::protocol::ProtocolPeer;
use crate::session::BrowserSession;
use crate::types::{
    ActOptions, ExtractOptions, GotoOptions, InitResponse, ObserveOptions, ObserveResult,
};

/// How long a closing bridge gets to exit on its own before it is killed.
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Launches sessions by spawning the bridge program.
///
/// # Example
///
/// ```rust,no_run
/// use evalrun_core::{AvailableModel, EvalLogger};
/// use evalrun_driver::{init_session, BridgeLauncher, SessionConfig};
///
/// async fn run() -> Result<(), Box<dyn std::error::Error>> {
///     let launcher = BridgeLauncher::new("node").with_arg("bridge/index.js");
///     let config = SessionConfig::new(AvailableModel::Gpt4oMini, EvalLogger::new());
///
///     let initialized = init_session(&launcher, config).await?;
///     initialized.session.page().goto("https://example.com", Default::default()).await?;
///     initialized.session.close().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BridgeLauncher {
    /// Program to execute.
    program: String,

    /// Arguments passed to the program.
    args: Vec<String>,

    /// Additional environment variables.
    env_vars: Vec<(String, String)>,
}

impl BridgeLauncher {
    /// Create a launcher for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env_vars: Vec::new(),
        }
    }

    /// Build a launcher from a whitespace-separated command line.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self {
            program: program.to_string(),
            args: parts.map(String::from).collect(),
            env_vars: Vec::new(),
        })
    }

    /// Add an argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    fn spawn(&self) -> Result<Child, DriverError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        debug!("Full command: {:?}", cmd);
        let child = cmd.spawn().map_err(|e| {
            error!(program = %self.program, error = %e, "Failed to spawn bridge process");
            e
        })?;
        Ok(child)
    }
}

#[async_trait]
impl SessionLauncher for BridgeLauncher {
    async fn launch(&self, config: &SessionConfig) -> Result<LaunchedSession, DriverError> {
        info!(
            program = %self.program,
            env = %config.env,
            model = %config.model_name,
            "Spawning automation bridge"
        );

        let mut child = self.spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DriverError::ProtocolError("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::ProtocolError("Failed to get stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DriverError::ProtocolError("Failed to get stderr".to_string()))?;

        // Spawn stderr reader for logging
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            warn!(stderr = %trimmed, "Bridge stderr");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Error reading bridge stderr");
                        break;
                    }
                }
            }
        });

        let peer = ProtocolPeer::spawn(stdout, stdin, config.logger.clone());

        // On failure the child is dropped here and killed.
        let raw = peer.request("init", config.launch_options()).await?;
        let init_response: InitResponse = serde_json::from_value(raw)?;

        info!(
            session_id = ?init_response.session_id,
            debug_url = ?init_response.debug_url,
            "Bridge session initialized"
        );

        Ok(LaunchedSession {
            handle: Arc::new(BridgeSession {
                peer,
                child: Mutex::new(Some(child)),
            }),
            init_response,
        })
    }
}

/// Session backed by one bridge process.
pub struct BridgeSession {
    peer: ProtocolPeer,
    child: Mutex<Option<Child>>,
}

impl BridgeSession {
    async fn call(&self, method: &str, params: Value) -> Result<Value, DriverError> {
        self.peer.request(method, params).await
    }

    async fn call_string(&self, method: &str, params: Value) -> Result<String, DriverError> {
        match self.call(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(DriverError::ProtocolError(format!(
                "{} returned non-string result: {}",
                method, other
            ))),
        }
    }

    async fn reap(&self) {
        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };

        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!(exit_code = ?status.code(), "Bridge process exited"),
            Ok(Err(e)) => warn!(error = %e, "Failed to wait for bridge process"),
            Err(_) => {
                warn!("Bridge did not exit in time, killing it");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill bridge process");
                }
            }
        }
    }
}

#[async_trait]
impl BrowserSession for BridgeSession {
    async fn goto(&self, url: &str, options: GotoOptions) -> Result<(), DriverError> {
        let mut params = serde_json::to_value(options)?;
        params["url"] = Value::String(url.to_string());
        self.call("goto", params).await?;
        Ok(())
    }

    async fn url(&self) -> Result<String, DriverError> {
        self.call_string("url", json!({})).await
    }

    async fn act(&self, options: ActOptions) -> Result<Value, DriverError> {
        self.call("act", serde_json::to_value(options)?).await
    }

    async fn extract(&self, options: ExtractOptions) -> Result<Value, DriverError> {
        self.call("extract", serde_json::to_value(options)?).await
    }

    async fn observe(&self, options: ObserveOptions) -> Result<Vec<ObserveResult>, DriverError> {
        let raw = self.call("observe", serde_json::to_value(options)?).await?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn inner_text(&self, selector: &str) -> Result<String, DriverError> {
        self.call_string("inner_text", json!({ "selector": selector }))
            .await
    }

    async fn inner_html(&self, selector: &str) -> Result<String, DriverError> {
        self.call_string("inner_html", json!({ "selector": selector }))
            .await
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, DriverError> {
        match self.call("is_visible", json!({ "selector": selector })).await? {
            Value::Bool(b) => Ok(b),
            other => Err(DriverError::ProtocolError(format!(
                "is_visible returned non-boolean result: {}",
                other
            ))),
        }
    }

    async fn wait(&self, duration: Duration) -> Result<(), DriverError> {
        self.call("wait", json!({ "ms": duration.as_millis() as u64 }))
            .await?;
        Ok(())
    }

    async fn close_pages(&self) -> Result<(), DriverError> {
        self.call("close_pages", json!({})).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let result = self.call("close", json!({})).await.map(|_| ());
        self.reap().await;
        result
    }
}
