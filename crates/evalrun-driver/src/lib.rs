//! evalrun Browser Driver
//!
//! Rust side of the browser automation library. The library runs behind a
//! bridge subprocess that speaks line-delimited JSON over stdio; this crate
//! owns the session lifecycle, the initializer and the session providers
//! tasks draw from.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use evalrun_core::{AvailableModel, EvalLogger};
//! use evalrun_driver::{
//!     ActOptions, BridgeLauncher, LaunchSession, SessionConfig, SessionOverrides, SessionProvider,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let launcher = Arc::new(BridgeLauncher::new("node").with_arg("bridge/index.js"));
//!     let config = SessionConfig::new(AvailableModel::Gpt4o, EvalLogger::new());
//!     let provider = LaunchSession::new(launcher, config);
//!
//!     let ready = provider.acquire(&SessionOverrides::default()).await?;
//!     let page = ready.session.page();
//!     page.goto("https://www.wikipedia.org", Default::default()).await?;
//!     let output = page.act(ActOptions::new("search for Rust")).await?;
//!     println!("{}", output);
//!
//!     ready.session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod error;
pub mod initializer;
pub mod protocol;
pub mod provider;
pub mod session;
pub mod types;

pub use bridge::{BridgeLauncher, BridgeSession};
pub use error::{DriverError, InitializationError};
pub use initializer::{
    init_session, LaunchedSession, SessionConfig, SessionLauncher, SessionOverrides, EVAL_ENV_VAR,
};
pub use protocol::ProtocolPeer;
pub use provider::{ExternalSession, LaunchSession, SessionProvider};
pub use session::{BrowserSession, InitializedSession, Session};
pub use types::{
    ActOptions, ActResult, Environment, ExtractOptions, GotoOptions, InitResponse, LaunchOptions,
    ObserveOptions, ObserveResult, WaitUntil,
};
