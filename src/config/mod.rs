//! Settings management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML, [main] section)
//!     → loader.rs (parse & deserialize, semantic checks)
//!     → Settings (validated, immutable)
//!     → shared by value at startup; never reloaded
//! ```
//!
//! # Design Decisions
//! - Settings are read once at startup; there is no reload path
//! - Key names on disk keep their historical spellings so existing
//!   deployments' files keep working, including `lvsDestionationPort`
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;

pub use loader::{load_settings, SettingsError};
pub use schema::Settings;
