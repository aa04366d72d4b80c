//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! SIGINT → listen_for_interrupt → Shutdown::trigger
//!     → broadcast to event loop and every in-flight ramp
//!     → tasks exit at their next suspension point
//! ```
//!
//! # Design Decisions
//! - Shutdown is cooperative: tasks observe the broadcast, nothing is
//!   force-aborted
//! - In-flight ramp steps and unflushed config writes are not drained;
//!   interrupted work resumes from the recorded progress on next start

pub mod shutdown;

pub use shutdown::{listen_for_interrupt, Shutdown};
