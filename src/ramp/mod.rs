//! Weight ramp subsystem.
//!
//! # Data Flow
//! ```text
//! reconciler event (member joining)
//!     → registry.rs (single-flight gate, one ticket per address)
//!     → controller.rs (step loop: verify → patch progress → write config)
//!     → lvs store (upsert into every virtual service, persist)
//! ```
//!
//! # Design Decisions
//! - The registry ticket doubles as the cancellation handle; dropping it
//!   releases the address for a later ramp
//! - Departure events and process shutdown cancel in-flight ramps at the
//!   next suspension point

pub mod controller;
pub mod registry;

pub use controller::{RampController, RampOutcome, FULL_WEIGHT, WEIGHT_STEP};
pub use registry::{RampRegistry, RampTicket};
