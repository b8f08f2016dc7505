//! Line-delimited JSON protocol spoken with the automation bridge.
//!
//! Every request carries an integer `id`; the bridge answers with the same
//! `id` and either a `result` or an `error`. Lines without an `id` are
//! notifications. `log` notifications are appended to the session's
//! [`EvalLogger`] so library diagnostics end up in the run log.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use evalrun_core::{EvalLogger, LogLine};

use crate::error::DriverError;
use crate::types::{BridgeMessage, BridgeRequest};

type Writer = Box<dyn AsyncWrite + Send + Unpin>;
type PendingMap = HashMap<u64, (String, oneshot::Sender<Result<Value, DriverError>>)>;

/// Protocol peer for request/response exchange with the bridge.
///
/// Owns the write half and a background read loop that routes responses
/// to the callers waiting on them.
pub struct ProtocolPeer {
    writer: Mutex<Writer>,
    pending: Arc<Mutex<PendingMap>>,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    read_task: JoinHandle<()>,
}

impl ProtocolPeer {
    /// Spawn a peer over the given streams and start the read loop.
    pub fn spawn<R, W>(reader: R, writer: W, logger: EvalLogger) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: Arc<Mutex<PendingMap>> = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let read_task = tokio::spawn(Self::read_loop(
            reader,
            Arc::clone(&pending),
            Arc::clone(&closed),
            logger,
        ));

        Self {
            writer: Mutex::new(Box::new(writer)),
            pending,
            closed,
            next_id: AtomicU64::new(1),
            read_task,
        }
    }

    /// Whether the bridge side has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a request and wait for its response.
    pub async fn request<P: Serialize>(&self, method: &str, params: P) -> Result<Value, DriverError> {
        if self.is_closed() {
            return Err(DriverError::SessionClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = BridgeRequest {
            id,
            method,
            params: serde_json::to_value(params)?,
        };
        let json = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, (method.to_string(), tx));

        // The read loop may have hit EOF between the check above and the insert.
        if self.is_closed() {
            self.pending.lock().await.remove(&id);
            return Err(DriverError::SessionClosed);
        }

        debug!(id, method, "Sending bridge request");
        trace!("Sending to bridge: {}", json);
        if let Err(e) = self.send_line(&json).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        rx.await.map_err(|_| DriverError::SessionClosed)?
    }

    async fn send_line(&self, json: &str) -> Result<(), DriverError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Main read loop for processing bridge output.
    async fn read_loop<R>(
        reader: R,
        pending: Arc<Mutex<PendingMap>>,
        closed: Arc<AtomicBool>,
        logger: EvalLogger,
    ) where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut message_count = 0u64;

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!(total_messages = message_count, "Bridge stdout closed (EOF)");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Error reading bridge output");
                    break;
                }
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            message_count += 1;
            trace!("Raw bridge line: {}", trimmed);

            match serde_json::from_str::<BridgeMessage>(trimmed) {
                Ok(BridgeMessage::Response { id, result, error }) => {
                    match pending.lock().await.remove(&id) {
                        Some((method, tx)) => {
                            let outcome = match error {
                                Some(body) => Err(DriverError::OperationFailed {
                                    method,
                                    message: body.message,
                                }),
                                None => Ok(result),
                            };
                            // Receiver gone means the caller stopped waiting.
                            tx.send(outcome).ok();
                        }
                        None => warn!(id, "Response for unknown request id"),
                    }
                }
                Ok(BridgeMessage::Notification { method, params }) => {
                    Self::handle_notification(&method, params, &logger);
                }
                Err(e) => {
                    let preview: String = trimmed.chars().take(200).collect();
                    warn!(error = %e, preview = %preview, "Failed to parse bridge message");
                }
            }
        }

        closed.store(true, Ordering::SeqCst);
        let mut pending = pending.lock().await;
        for (_, (_, tx)) in pending.drain() {
            tx.send(Err(DriverError::SessionClosed)).ok();
        }
    }

    fn handle_notification(method: &str, params: Value, logger: &EvalLogger) {
        match method {
            "log" => match serde_json::from_value::<LogLine>(params) {
                Ok(line) => logger.log(line),
                Err(e) => warn!(error = %e, "Malformed log notification"),
            },
            other => debug!(method = other, "Ignoring bridge notification"),
        }
    }
}

impl Drop for ProtocolPeer {
    fn drop(&mut self) {
        self.read_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader};

    /// Fake bridge: echoes `params` back as the result, fails `explode`,
    /// and emits a log notification before answering `noisy`.
    async fn fake_bridge(stream: tokio::io::DuplexStream) {
        let (read_half, mut write_half) = split(stream);
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let request: Value = serde_json::from_str(&line).unwrap();
            let id = request["id"].as_u64().unwrap();
            let reply = match request["method"].as_str().unwrap() {
                "explode" => json!({"id": id, "error": {"message": "boom"}}),
                "noisy" => {
                    let note = json!({"method": "log", "params": {"message": "working", "level": 2}});
                    write_half
                        .write_all(format!("{}\n", note).as_bytes())
                        .await
                        .unwrap();
                    json!({"id": id, "result": "done"})
                }
                "hangup" => return,
                _ => json!({"id": id, "result": request["params"]}),
            };
            write_half
                .write_all(format!("{}\n", reply).as_bytes())
                .await
                .unwrap();
        }
    }

    fn peer_with_fake_bridge(logger: EvalLogger) -> ProtocolPeer {
        let (ours, theirs) = duplex(4096);
        tokio::spawn(fake_bridge(theirs));
        let (read_half, write_half) = split(ours);
        ProtocolPeer::spawn(read_half, write_half, logger)
    }

    #[tokio::test]
    async fn test_request_response_correlation() {
        let peer = peer_with_fake_bridge(EvalLogger::new());

        let first = peer.request("echo", json!({"n": 1})).await.unwrap();
        let second = peer.request("echo", json!({"n": 2})).await.unwrap();
        assert_eq!(first, json!({"n": 1}));
        assert_eq!(second, json!({"n": 2}));
    }

    #[tokio::test]
    async fn test_error_response() {
        let peer = peer_with_fake_bridge(EvalLogger::new());
        let err = peer.request("explode", json!({})).await.unwrap_err();
        match err {
            DriverError::OperationFailed { method, message } => {
                assert_eq!(method, "explode");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_log_notifications_reach_logger() {
        let logger = EvalLogger::new();
        let peer = peer_with_fake_bridge(logger.clone());

        let result = peer.request("noisy", json!({})).await.unwrap();
        assert_eq!(result, json!("done"));

        let logs = logger.get_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "working");
        assert_eq!(logs[0].level, 2);
    }

    #[tokio::test]
    async fn test_bridge_exit_fails_pending_and_later_requests() {
        let peer = peer_with_fake_bridge(EvalLogger::new());

        let err = peer.request("hangup", json!({})).await.unwrap_err();
        assert!(matches!(err, DriverError::SessionClosed));
        assert!(peer.is_closed());

        let err = peer.request("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, DriverError::SessionClosed));
    }
}
