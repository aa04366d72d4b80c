//! Kubernetes-driven LVS weight ramp controller.
//!
//! Keeps an LVS-style load balancer config file in step with the live
//! membership of a labeled pod pool, ramping each newly running pod's
//! traffic weight from its last recorded progress up to full in discrete
//! steps instead of admitting it at full weight immediately.
//!
//! # Architecture Overview
//!
//! ```text
//!  Kubernetes pods ──list/watch──▶ ┌────────────┐       ┌──────────────┐
//!   (label selector)              │ reconciler  │──────▶│     ramp     │
//!                                 │ snapshot +  │ spawn │ registry +   │
//!                                 │ event loop  │       │ step machine │
//!                                 └──────┬──────┘       └──────┬───────┘
//!                                        │ evict               │ upsert + persist
//!                                        ▼                     ▼
//!                                 ┌─────────────────────────────────┐
//!                                 │  lvs: table + codec + store     │──▶ config file
//!                                 └─────────────────────────────────┘
//!
//!  Cross-cutting: config (settings), membership (pod client), lifecycle
//!  (shutdown broadcast)
//! ```

// Core subsystems
pub mod lvs;
pub mod membership;
pub mod ramp;
pub mod reconciler;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;

pub use config::Settings;
pub use lifecycle::Shutdown;
pub use lvs::LvsStore;
pub use reconciler::Reconciler;
