//! uigrab - turn a piece of a live web page into a reusable component
//!
//! Drives a real browser to a page, finds one element (by CSS selector, by a
//! natural-language description resolved through a local Ollama model, or by
//! clicking it in a headed browser), pulls out its HTML, computed CSS and
//! assets, asks the LLM to rewrite it for React, Vue or Svelte, and writes the
//! result to disk.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Selector**: DOM arena and unique CSS selector synthesis
//! - **Picker**: Host side of the interactive element picker
//! - **Capability**: Traits the pipeline delegates to, with agent-browser,
//!   extraction and filesystem implementations
//! - **LLM**: Ollama provider, element locator and component transformer
//! - **Pipeline**: Per-job state machine and the batch runner
//! - **CLI**: Command-line interface
//!
//! # Usage
//!
//! ```rust,no_run
//! use uigrab::{Capabilities, Config, ExtractionJob, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> uigrab::Result<()> {
//!     let config = Config::load();
//!     let pipeline = Pipeline::new(Capabilities::from_config(&config)?);
//!
//!     let job = ExtractionJob::builder("https://example.com")
//!         .query("the pricing card")
//!         .build()?;
//!
//!     let outcome = pipeline.run(&job).await;
//!     println!("{:?}", outcome.report());
//!     Ok(())
//! }
//! ```

pub mod capability;
pub mod cli;
pub mod core;
pub mod llm;
pub mod picker;
pub mod pipeline;
pub mod selector;

// Re-export commonly used items
pub use capability::Capabilities;
pub use core::{Config, ErrorKind, ExtractError, ExtractionJob, Result};
pub use pipeline::{BatchRunner, BatchSpec, Pipeline, PipelineOutcome};
