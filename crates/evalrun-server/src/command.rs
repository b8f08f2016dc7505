//! Command pipeline behind `POST /test`.
//!
//! One request moves through
//! `Received → Validated → SessionReady → Executing → StreamingResult → Closed`,
//! or ends in `Errored` from any of the first four states. Every step is
//! reported as a [`CommandEvent`]; the last event is always terminal.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use evalrun_core::{panic_message, sanitize_message, AvailableModel, EvalLogger};
use evalrun_driver::{
    init_session, ActOptions, DriverError, ExtractOptions, InitializationError, Session,
    SessionConfig, SessionLauncher,
};

use crate::schema::{OutputSchema, SchemaCompilationError, SchemaViolation};

/// Buffered events per request before the pipeline waits on the client.
const EVENT_BUFFER: usize = 16;

// ============================================================================
// Request validation
// ============================================================================

/// What the command should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMode {
    /// Perform the command as one interaction.
    Actions,
    /// Extract data shaped by the request's output schema.
    Output,
}

impl CommandMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "actions" => Some(Self::Actions),
            "output" => Some(Self::Output),
            _ => None,
        }
    }
}

/// A `POST /test` body that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCommand {
    pub command: String,
    pub start_url: Url,
    pub cdp_url: Url,
    pub output_schema: Option<Value>,
    pub mode: CommandMode,
    pub model_name: AvailableModel,
}

/// Malformed `POST /test` body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: &'static str, message: String },
}

impl ValidatedCommand {
    /// Validate a raw request body.
    pub fn from_body(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ValidationError::InvalidBody(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Validate a parsed request body.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let map = value
            .as_object()
            .ok_or_else(|| ValidationError::InvalidBody("expected a JSON object".to_string()))?;

        let command = required_str(map, "command")?.to_string();
        let start_url = required_url(map, "start_url")?;
        let cdp_url = required_url(map, "cdp_url")?;

        let mode_name = required_str(map, "mode")?;
        let mode = CommandMode::parse(mode_name).ok_or_else(|| ValidationError::InvalidField {
            field: "mode",
            message: format!("expected \"actions\" or \"output\", got \"{}\"", mode_name),
        })?;

        let output_schema = match map.get("output_schema") {
            None | Some(Value::Null) => None,
            Some(schema @ Value::Object(_)) => Some(schema.clone()),
            Some(_) => {
                return Err(ValidationError::InvalidField {
                    field: "output_schema",
                    message: "expected an object or null".to_string(),
                })
            }
        };
        if mode == CommandMode::Output && output_schema.is_none() {
            return Err(ValidationError::MissingField("output_schema"));
        }

        let model_name = match map.get("model_name") {
            None | Some(Value::Null) => AvailableModel::default(),
            Some(Value::String(name)) => {
                name.parse::<AvailableModel>()
                    .map_err(|e| ValidationError::InvalidField {
                        field: "model_name",
                        message: e.to_string(),
                    })?
            }
            Some(_) => {
                return Err(ValidationError::InvalidField {
                    field: "model_name",
                    message: "expected a string".to_string(),
                })
            }
        };

        Ok(Self {
            command,
            start_url,
            cdp_url,
            output_schema,
            mode,
            model_name,
        })
    }
}

fn required_str<'a>(
    map: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match map.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::InvalidField {
            field,
            message: "expected a string".to_string(),
        }),
    }
}

fn required_url(map: &Map<String, Value>, field: &'static str) -> Result<Url, ValidationError> {
    let raw = required_str(map, field)?;
    Url::parse(raw).map_err(|e| ValidationError::InvalidField {
        field,
        message: e.to_string(),
    })
}

// ============================================================================
// Events
// ============================================================================

/// One event on a command stream.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandEvent {
    /// Progress report.
    Status(&'static str),
    /// Successful outcome.
    Answer(Value),
    /// Failure, already sanitized.
    Error(String),
}

impl CommandEvent {
    pub(crate) fn error(err: &dyn std::fmt::Display) -> Self {
        Self::Error(sanitize_message(&err.to_string()))
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Status(_))
    }

    /// JSON payload sent in the event's `data:` frame.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Status(message) => json!({ "message": message }),
            Self::Answer(output) => json!({ "type": "answer", "message": output }),
            Self::Error(message) => json!({ "message": "Error", "error": { "message": message } }),
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Received,
    Validated,
    SessionReady,
    Executing,
    StreamingResult,
    Closed,
    Errored,
}

/// Anything that ends a command early.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Initialization(#[from] InitializationError),

    #[error("Execution failed: {0}")]
    Execution(#[from] DriverError),

    #[error("Invalid output schema: {0}")]
    Schema(#[from] SchemaCompilationError),

    #[error(transparent)]
    Violation(#[from] SchemaViolation),

    #[error("Command panicked: {0}")]
    Panicked(String),
}

/// Run a command in the background and return its event stream.
///
/// The pipeline keeps running, and still closes its session, when the
/// receiver is dropped.
pub fn spawn_command(launcher: Arc<dyn SessionLauncher>, body: Vec<u8>) -> mpsc::Receiver<CommandEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let guard = tx.clone();

    tokio::spawn(async move {
        let pipeline = CommandPipeline::new(launcher, tx);
        if let Err(payload) = AssertUnwindSafe(pipeline.run(body)).catch_unwind().await {
            let message = panic_message(payload.as_ref());
            error!(panic = %message, "Command pipeline panicked");
            let _ = guard
                .send(CommandEvent::error(&CommandError::Panicked(message)))
                .await;
        }
    });

    rx
}

/// Drives one request from validation to its terminal event.
pub struct CommandPipeline {
    launcher: Arc<dyn SessionLauncher>,
    events: mpsc::Sender<CommandEvent>,
    state: CommandState,
    client_gone: bool,
}

impl CommandPipeline {
    pub fn new(launcher: Arc<dyn SessionLauncher>, events: mpsc::Sender<CommandEvent>) -> Self {
        Self {
            launcher,
            events,
            state: CommandState::Received,
            client_gone: false,
        }
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Run the request and emit its events. Returns the final state.
    #[instrument(skip_all)]
    pub async fn run(mut self, body: Vec<u8>) -> CommandState {
        self.emit(CommandEvent::Status("Command received")).await;

        let request = match ValidatedCommand::from_body(&body) {
            Ok(request) => request,
            Err(e) => return self.fail(e.into()).await,
        };
        self.transition(CommandState::Validated);
        info!(
            mode = ?request.mode,
            model = %request.model_name,
            cdp_url = %request.cdp_url,
            "Command validated"
        );

        let config = SessionConfig::remote(request.model_name, EvalLogger::new(), request.cdp_url.as_str())
            .with_debug_dom(false);
        let session = match init_session(self.launcher.as_ref(), config).await {
            Ok(initialized) => initialized.session,
            Err(e) => return self.fail(e.into()).await,
        };
        self.transition(CommandState::SessionReady);
        self.emit(CommandEvent::Status("Session ready")).await;

        self.transition(CommandState::Executing);
        self.emit(CommandEvent::Status("Executing command")).await;

        let outcome = match AssertUnwindSafe(execute(&session, &request)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(CommandError::Panicked(panic_message(payload.as_ref()))),
        };

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close command session");
        }

        match outcome {
            Ok(output) => {
                self.transition(CommandState::StreamingResult);
                self.emit(CommandEvent::Answer(output)).await;
                self.transition(CommandState::Closed);
                self.state
            }
            Err(e) => self.fail(e).await,
        }
    }

    async fn fail(&mut self, err: CommandError) -> CommandState {
        warn!(state = ?self.state, error = %err, "Command failed");
        self.transition(CommandState::Errored);
        self.emit(CommandEvent::error(&err)).await;
        self.state
    }

    fn transition(&mut self, next: CommandState) {
        debug!(from = ?self.state, to = ?next, "Command state");
        self.state = next;
    }

    async fn emit(&mut self, event: CommandEvent) {
        if self.client_gone {
            return;
        }
        if self.events.send(event).await.is_err() {
            debug!("Client disconnected, continuing without events");
            self.client_gone = true;
        }
    }
}

async fn execute(session: &Session, request: &ValidatedCommand) -> Result<Value, CommandError> {
    let page = session.page();
    match request.mode {
        CommandMode::Actions => {
            let output = page
                .act(ActOptions::new(&request.command).with_model(request.model_name))
                .await?;
            Ok(output)
        }
        CommandMode::Output => {
            let document = request
                .output_schema
                .as_ref()
                .ok_or(ValidationError::MissingField("output_schema"))?;
            let schema = OutputSchema::compile(document)?;

            let output = page
                .extract(
                    ExtractOptions::new(&request.command)
                        .with_schema(schema.to_json_schema())
                        .with_model(request.model_name)
                        .with_text_extract(true),
                )
                .await?;
            schema.validate(&output)?;
            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBehavior, FakeLauncher};

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn actions_request(cdp_url: &str) -> Value {
        json!({
            "command": "click the login button",
            "start_url": "https://example.com/",
            "cdp_url": cdp_url,
            "mode": "actions"
        })
    }

    async fn collect(mut rx: mpsc::Receiver<CommandEvent>) -> Vec<CommandEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_validation_defaults() {
        let request = ValidatedCommand::from_value(&actions_request("ws://localhost:9222")).unwrap();
        assert_eq!(request.mode, CommandMode::Actions);
        assert_eq!(request.model_name, AvailableModel::Gpt4o);
        assert_eq!(request.output_schema, None);
        assert_eq!(request.cdp_url.scheme(), "ws");
    }

    #[test]
    fn test_validation_errors() {
        let mut missing = actions_request("ws://localhost:9222");
        missing.as_object_mut().unwrap().remove("command");
        assert_eq!(
            ValidatedCommand::from_value(&missing).unwrap_err(),
            ValidationError::MissingField("command")
        );

        let mut bad_url = actions_request("not a url");
        bad_url["start_url"] = json!("https://example.com");
        assert!(matches!(
            ValidatedCommand::from_value(&bad_url).unwrap_err(),
            ValidationError::InvalidField { field: "cdp_url", .. }
        ));

        let mut bad_mode = actions_request("ws://localhost:9222");
        bad_mode["mode"] = json!("observe");
        assert!(matches!(
            ValidatedCommand::from_value(&bad_mode).unwrap_err(),
            ValidationError::InvalidField { field: "mode", .. }
        ));

        let mut bad_model = actions_request("ws://localhost:9222");
        bad_model["model_name"] = json!("gpt-2");
        assert!(matches!(
            ValidatedCommand::from_value(&bad_model).unwrap_err(),
            ValidationError::InvalidField { field: "model_name", .. }
        ));

        let mut no_schema = actions_request("ws://localhost:9222");
        no_schema["mode"] = json!("output");
        assert_eq!(
            ValidatedCommand::from_value(&no_schema).unwrap_err(),
            ValidationError::MissingField("output_schema")
        );

        assert!(matches!(
            ValidatedCommand::from_body(b"{not json").unwrap_err(),
            ValidationError::InvalidBody(_)
        ));
    }

    #[test]
    fn test_event_payloads() {
        assert_eq!(
            CommandEvent::Status("Session ready").to_json(),
            json!({"message": "Session ready"})
        );
        assert_eq!(
            CommandEvent::Answer(json!({"success": true})).to_json(),
            json!({"type": "answer", "message": {"success": true}})
        );
        assert_eq!(
            CommandEvent::Error("boom".to_string()).to_json(),
            json!({"message": "Error", "error": {"message": "boom"}})
        );
        assert!(!CommandEvent::Status("x").is_terminal());
    }

    #[tokio::test]
    async fn test_actions_stream_raw_act_output() {
        let launcher = Arc::new(FakeLauncher::new(FakeBehavior {
            act_output: Some(json!({"success": true, "message": "clicked", "action": "click"})),
            ..Default::default()
        }));

        let events = collect(spawn_command(launcher.clone(), body(actions_request("ws://browser-a:9222")))).await;

        assert_eq!(
            events,
            vec![
                CommandEvent::Status("Command received"),
                CommandEvent::Status("Session ready"),
                CommandEvent::Status("Executing command"),
                CommandEvent::Answer(json!({"success": true, "message": "clicked", "action": "click"})),
            ]
        );
        assert_eq!(launcher.acted(), vec!["click the login button".to_string()]);
        assert_eq!(launcher.closed(), 1);

        let config = &launcher.configs()[0];
        assert_eq!(config.cdp_url.as_deref(), Some("ws://browser-a:9222/"));
        assert!(!config.debug_dom);
    }

    #[tokio::test]
    async fn test_invalid_schema_errors_and_closes_session() {
        let launcher = Arc::new(FakeLauncher::default());
        let request = json!({
            "command": "extract the price",
            "start_url": "https://example.com/",
            "cdp_url": "ws://localhost:9222",
            "mode": "output",
            "output_schema": {"type": "object", "properties": {"price": {"$ref": "#/defs/price"}}}
        });

        let events = collect(spawn_command(launcher.clone(), body(request))).await;

        assert_eq!(events.len(), 4);
        match events.last().unwrap() {
            CommandEvent::Error(message) => assert!(message.contains("$ref"), "{}", message),
            other => panic!("unexpected terminal event {:?}", other),
        }
        assert_eq!(launcher.closed(), 1);
        assert!(launcher.extracted().is_empty());
    }

    #[tokio::test]
    async fn test_output_mode_validates_extraction() {
        let launcher = Arc::new(FakeLauncher::new(FakeBehavior {
            extract_output: json!({"price": "12.99"}),
            ..Default::default()
        }));
        let request = json!({
            "command": "extract the price",
            "start_url": "https://example.com/",
            "cdp_url": "ws://localhost:9222",
            "mode": "output",
            "model_name": "claude-3-5-sonnet-latest",
            "output_schema": {"type": "object", "properties": {"price": {"type": "number"}}, "required": ["price"]}
        });

        let events = collect(spawn_command(launcher.clone(), body(request))).await;

        match events.last().unwrap() {
            CommandEvent::Error(message) => assert!(message.contains("/price"), "{}", message),
            other => panic!("unexpected terminal event {:?}", other),
        }
        let extracted = launcher.extracted();
        assert_eq!(extracted.len(), 1);
        assert!(extracted[0].use_text_extract);
        assert_eq!(extracted[0].schema.as_ref().unwrap()["required"], json!(["price"]));
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_opens_no_session() {
        let launcher = Arc::new(FakeLauncher::default());
        let events = collect(spawn_command(launcher.clone(), b"[]".to_vec())).await;

        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
        assert!(launcher.configs().is_empty());
    }

    #[tokio::test]
    async fn test_initialization_failure_reports_endpoint() {
        let launcher = Arc::new(FakeLauncher::new(FakeBehavior {
            fail_launch: true,
            ..Default::default()
        }));

        let events = collect(spawn_command(launcher.clone(), body(actions_request("ws://gone:9222")))).await;

        assert_eq!(events.len(), 2);
        match &events[1] {
            CommandEvent::Error(message) => assert!(message.contains("ws://gone:9222")),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panic_in_execution_still_closes_session() {
        let launcher = Arc::new(FakeLauncher::new(FakeBehavior {
            panic_on_act: true,
            ..Default::default()
        }));

        let events = collect(spawn_command(launcher.clone(), body(actions_request("ws://localhost:9222")))).await;

        match events.last().unwrap() {
            CommandEvent::Error(message) => assert!(message.contains("Command panicked")),
            other => panic!("unexpected terminal event {:?}", other),
        }
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_finishes_after_client_disconnects() {
        let launcher = Arc::new(FakeLauncher::default());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let state = CommandPipeline::new(launcher.clone(), tx)
            .run(body(actions_request("ws://localhost:9222")))
            .await;

        assert_eq!(state, CommandState::Closed);
        assert_eq!(launcher.closed(), 1);
    }
}
