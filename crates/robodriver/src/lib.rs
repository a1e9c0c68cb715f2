//! Command engine and device driver for a TCP-controlled robot
//!
//! The robot speaks a minimal text protocol over a raw socket: commands look
//! like `pick%Destination Location5`, replies are free text. Non-status
//! commands answer with a process id that is later polled with
//! `status%<id>` until the robot reports it finished.
//!
//! # Key Features
//!
//! - **Send with retry**: per-attempt reply window, bounded attempts, optional
//!   expected-phrase filter
//! - **Signalled waits**: an attempt ends as soon as the reassembled reply
//!   contains an expected phrase
//! - **Process tracking**: the latest process id is kept for availability
//!   checks
//! - **Safe teardown**: engine and transport dispose exactly once, on demand
//!   or on drop
//!
//! # Architecture
//!
//! 1. **Protocol Layer** (`robodriver-protocol`): command encoding and reply
//!    vocabulary

#![deny(unsafe_code)]
//! 2. **Transport Layer** (`robodriver-transport`): socket ownership and the
//!    receive task
//! 3. **Engine Layer** (this crate): [`CommandEngine`] and the string-based
//!    [`DeviceDriver`] facade
//!
//! # Usage Example
//!
//! ```no_run
//! use robodriver::{CommandEngine, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), robodriver::EngineError> {
//!     let engine = CommandEngine::new(EngineConfig::from_env()?);
//!     if !engine.connect("127.0.0.30").await {
//!         return Err(robodriver::EngineError::NotConnected);
//!     }
//!
//!     let process_id = engine.set_automation_ready().await;
//!     while !engine.is_robot_available(process_id).await {}
//!
//!     let reply = engine
//!         .execute_command("pick", &["Destination Location"], &["5"])
//!         .await?;
//!     println!("pick started as process {reply}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod retry;
pub mod testing;

// Re-export commonly used types
pub use config::{DEFAULT_PORT, EngineConfig, Rendezvous};
pub use driver::{CONNECTION_FAILED, DeviceDriver, NO_CONNECTION};
pub use engine::{CommandEngine, Connector, Reply, SendOptions, tcp_connector};
pub use error::{BackoffStrategy, EngineError, ErrorRecovery, Result};
pub use retry::retry_with_recovery;

pub use robodriver_protocol::{OperationMatch, ProcessId, RobotConnectionState, RobotStatus};
