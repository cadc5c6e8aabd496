//! lite-notebooks library
//!
//! Turns the MyST Markdown pages of a Jupyter Book into notebooks that run in
//! the browser under JupyterLite. The primary interface is the
//! `lite-notebooks` binary; the library exposes the same passes for testing
//! and custom integrations.
//!
//! ## Public API
//!
//! - [`NotebookProcessor`] converts a whole book, or single pages
//! - [`ProcessConfig`] is read from the book's `_config.yml`
//! - [`TextPipeline`] runs the text passes on one [`Document`]:
//!   [`MarkerRewriter`], [`SolutionCollapser`], then [`AdmonitionLocator`]
//!   with [`AdmonitionRewriter`]
//! - [`CellPipeline`] filters and edits the cells of a [`notebook::Notebook`]

mod admonitions;
mod cells;
mod config;
mod conversion;
mod discovery;
mod document;
mod error;
mod manifest;
mod markers;
pub mod myst;
pub mod notebook;
mod pipeline;
mod processor;
mod reporting;
mod solutions;
mod task_collector;
pub mod urls;

pub use admonitions::{AdmonitionHeader, AdmonitionLocator, AdmonitionRewriter, BlockSpan};
pub use cells::{CellOutcome, CellPipeline, CellTransform, LabelStripper, TagRemover};
pub use conversion::{ConversionResult, ConversionTask};
pub use config::{BookConfig, LiteConfig, ProcessConfig, CONFIG_FILE_NAME};
pub use discovery::{find_matching_files, ExcludeMatcher};
pub use document::Document;
pub use error::TransformError;
pub use manifest::{LiteManifest, MANIFEST_FILE_NAME};
pub use markers::{Marker, MarkerKind, MarkerRewriter, MarkerRole};
pub use pipeline::TextPipeline;
pub use processor::{NotebookProcessor, RunSummary};
pub use solutions::SolutionCollapser;
