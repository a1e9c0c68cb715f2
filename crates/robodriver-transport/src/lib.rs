//! Socket transport abstraction layer for robodriver
//!
//! Provides a trait-based transport so the command engine can drive either a
//! real TCP connection to the robot or a scripted stand-in during tests.
//!
//! # Architecture
//!
//! - **Transport trait**: connect, send, disconnect, dispose and event
//!   subscription
//! - **Event hub**: listener registry shared by transport implementations

#![deny(unsafe_code)]
#![warn(missing_docs)]
//! - **TCP transport**: one socket, one receive task, run-once disposal
//! - **Error handling**: transport errors stay inside this crate; callers see
//!   booleans and [`TransportEvent`]s
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use robodriver_transport::{TcpTransport, Transport, TransportEvent};
//!
//! # async fn example() -> robodriver_transport::Result<()> {
//! let transport = TcpTransport::new("127.0.0.1", 1000)?;
//! transport.subscribe(Arc::new(|event: &TransportEvent| {
//!     if let TransportEvent::DataReceived(fragment) = event {
//!         println!("robot says {fragment}");
//!     }
//! }));
//!
//! if transport.connect(true).await {
//!     transport.send_text("home%").await;
//! }
//! transport.dispose();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod tcp;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use events::{EventHandler, EventHub, SubscriptionId, TransportEvent};
pub use tcp::{RECEIVE_BUFFER_SIZE, TcpTransport};
pub use traits::Transport;
