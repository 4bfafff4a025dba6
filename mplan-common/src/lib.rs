//! # MusePlan Common Library
//!
//! Shared code for MusePlan services including:
//! - Common error types
//! - Event types (MplanEvent enum) and EventBus
//! - Configuration loading and root folder resolution

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
