//! LVS configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file on disk
//!     → codec.rs (parse, existence-gated admission)
//!     → model.rs (authoritative service table)
//!     → store.rs (mutation + persistence under one lock)
//!     → codec.rs (serialize, atomic replace on disk)
//! ```
//!
//! # Design Decisions
//! - The table and its persistence share a single lock; a reader of the
//!   file never races a half-applied mutation
//! - Virtual services serialize in sorted key order for stable diffs
//! - Backends keep first-seen order within a service

pub mod codec;
pub mod model;
pub mod store;

pub use model::{RealServer, ServiceTable, VirtualService};
pub use store::LvsStore;
