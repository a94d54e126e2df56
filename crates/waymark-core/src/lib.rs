//! # waymark-core
//!
//! Core types shared by every waymark crate: the error enum, settings and
//! their loaders, and the tracing setup.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Router and dispatcher configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{WaymarkError, WaymarkResult};
pub use settings::{RootMatch, Settings, SETTINGS};
