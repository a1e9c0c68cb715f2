#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core primitives for the robodriver ecosystem.
//!
//! This crate holds the small pieces of shared state that both the socket
//! transport and the command engine lean on:
//!
//! - **Inbound buffering** via [`FragmentQueue`]
//!   - Ordered, multi-producer/single-consumer text fragments
//!   - Atomic drain-and-concatenate under one critical section
//!   - Deadline-bounded wait for the next arrival
//! - **Run-once disposal** via [`DisposeGuard`]
//!   - Idempotent teardown that is safe from `Drop`
//!   - Work that must not race a concurrent dispose
//!
//! # Examples
//!
//! ```rust
//! use robodriver_core::prelude::*;
//!
//! let queue = FragmentQueue::new();
//! queue.push("12");
//! queue.push("34");
//! assert_eq!(queue.drain(), "1234");
//! assert_eq!(queue.drain(), "");
//! ```

pub mod dispose;
pub mod queue;

pub use dispose::DisposeGuard;
pub use queue::FragmentQueue;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use robodriver_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::dispose::DisposeGuard;
    pub use crate::queue::FragmentQueue;
}
