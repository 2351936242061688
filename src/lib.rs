//! Turn a captured web page (title, body text, code fragments) into one
//! markdown document with headings, a table of contents and fenced code.

pub mod capture;
pub mod config;
pub mod db;
pub mod pipeline;

pub use pipeline::assemble::Labels;
pub use pipeline::{render, PipelineInput, RenderedDocument};
