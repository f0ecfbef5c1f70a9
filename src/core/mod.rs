//! Core module - shared infrastructure for uigrab
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, SessionMode};
pub use error::{classify_llm_error, ErrorKind, ExtractError, Result};
pub use types::*;
