//! In-memory launcher for server tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use evalrun_driver::{
    ActOptions, BrowserSession, DriverError, ExtractOptions, GotoOptions, InitResponse,
    LaunchedSession, ObserveOptions, ObserveResult, SessionConfig, SessionLauncher,
};

/// How fake sessions behave.
#[derive(Debug, Clone, Default)]
pub struct FakeBehavior {
    /// Act output; `None` echoes the action and the session's endpoint.
    pub act_output: Option<Value>,
    pub extract_output: Value,
    /// Act latency per session endpoint.
    pub act_delays: HashMap<String, Duration>,
    pub fail_launch: bool,
    pub panic_on_act: bool,
}

#[derive(Default)]
struct Record {
    configs: Vec<SessionConfig>,
    acted: Vec<String>,
    extracted: Vec<ExtractOptions>,
    timeline: Vec<String>,
}

#[derive(Default)]
pub struct FakeLauncher {
    behavior: FakeBehavior,
    record: Arc<Mutex<Record>>,
    closed: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            ..Default::default()
        }
    }

    pub fn configs(&self) -> Vec<SessionConfig> {
        self.record.lock().unwrap().configs.clone()
    }

    pub fn acted(&self) -> Vec<String> {
        self.record.lock().unwrap().acted.clone()
    }

    pub fn extracted(&self) -> Vec<ExtractOptions> {
        self.record.lock().unwrap().extracted.clone()
    }

    /// Finished acts and closes, in order, as `act <endpoint>` / `close <endpoint>`.
    pub fn timeline(&self) -> Vec<String> {
        self.record.lock().unwrap().timeline.clone()
    }

    /// Sessions closed so far.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, config: &SessionConfig) -> Result<LaunchedSession, DriverError> {
        self.record.lock().unwrap().configs.push(config.clone());
        if self.behavior.fail_launch {
            return Err(DriverError::OperationFailed {
                method: "init".to_string(),
                message: "connect ECONNREFUSED".to_string(),
            });
        }

        let session = FakeSession {
            endpoint: config.endpoint().to_string(),
            behavior: self.behavior.clone(),
            record: Arc::clone(&self.record),
            launcher_closed: Arc::clone(&self.closed),
            closed: AtomicBool::new(false),
        };
        Ok(LaunchedSession {
            handle: Arc::new(session),
            init_response: InitResponse::default(),
        })
    }
}

struct FakeSession {
    endpoint: String,
    behavior: FakeBehavior,
    record: Arc<Mutex<Record>>,
    launcher_closed: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl FakeSession {
    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(DriverError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&self, _url: &str, _options: GotoOptions) -> Result<(), DriverError> {
        self.ensure_open()
    }

    async fn url(&self) -> Result<String, DriverError> {
        Ok("about:blank".to_string())
    }

    async fn act(&self, options: ActOptions) -> Result<Value, DriverError> {
        if self.behavior.panic_on_act {
            panic!("act blew up");
        }
        self.record.lock().unwrap().acted.push(options.action.clone());
        if let Some(delay) = self.behavior.act_delays.get(&self.endpoint) {
            tokio::time::sleep(*delay).await;
        }
        self.ensure_open()?;
        self.record
            .lock()
            .unwrap()
            .timeline
            .push(format!("act {}", self.endpoint));

        Ok(self.behavior.act_output.clone().unwrap_or_else(|| {
            json!({
                "success": true,
                "message": options.action,
                "endpoint": self.endpoint,
            })
        }))
    }

    async fn extract(&self, options: ExtractOptions) -> Result<Value, DriverError> {
        self.ensure_open()?;
        self.record.lock().unwrap().extracted.push(options);
        Ok(self.behavior.extract_output.clone())
    }

    async fn observe(&self, _options: ObserveOptions) -> Result<Vec<ObserveResult>, DriverError> {
        Ok(Vec::new())
    }

    async fn inner_text(&self, _selector: &str) -> Result<String, DriverError> {
        Ok(String::new())
    }

    async fn inner_html(&self, _selector: &str) -> Result<String, DriverError> {
        Ok(String::new())
    }

    async fn is_visible(&self, _selector: &str) -> Result<bool, DriverError> {
        Ok(false)
    }

    async fn close_pages(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closed.store(true, Ordering::SeqCst);
        self.launcher_closed.fetch_add(1, Ordering::SeqCst);
        self.record
            .lock()
            .unwrap()
            .timeline
            .push(format!("close {}", self.endpoint));
        Ok(())
    }
}
