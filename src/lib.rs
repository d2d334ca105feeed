//! Builds a site content document from published spreadsheet CSV tabs.
//!
//! A run fetches seven feeds, parses and validates each against its schema,
//! joins the services tab with the service-details tab, and atomically
//! writes one JSON artifact for the site renderer. See [`pipeline`] for the
//! end-to-end flow.

pub mod config;
pub mod document;
pub mod feed;
pub mod pipeline;
pub mod reconcile;
pub mod schema;
pub mod util;
pub mod writer;

pub use config::{Config, ConfigError};
pub use document::ContentDocument;
pub use pipeline::{Pipeline, PipelineError, RunOptions, RunReport};
