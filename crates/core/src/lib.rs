//! Search engine result page (SERP) parsing.
//!
//! A [`registry::ParserRegistry`] maps engine names and result-page URLs to
//! [`parser::EngineParser`]s built from declarative selector sets; the
//! [`pipeline::ExtractionPipeline`] turns raw HTML into a
//! [`models::PageExtraction`].

pub mod config;
pub mod error;
pub mod models;
pub mod monitoring;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod selector;

pub use error::{BuildError, ExtractError};
pub use models::{Anomaly, EngineSpec, PageExtraction, ResultRecord, SearchEngineIdentity, SelectorSet};
pub use parser::EngineParser;
pub use pipeline::{ExtractionPipeline, SourceHint};
pub use registry::ParserRegistry;
