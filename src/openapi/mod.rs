pub mod builder;
pub mod components;
pub mod model;

pub use builder::{build, DocumentInfo};
pub use model::Document;

use anyhow::Result;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

/// Serialize the document for export
pub fn render(document: &Document, format: Format) -> Result<String> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(document)?,
        Format::Yaml => serde_yaml::to_string(document)?,
    })
}
