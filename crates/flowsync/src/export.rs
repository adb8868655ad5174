//! Image export.

mod svg;

pub(crate) use self::svg::SvgRenderer;

use std::path::Path;

/// An exported image, named after the document it was rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageExport {
    /// Suggested file name: the document's base name with an `.svg` extension.
    pub file_name: String,
    /// The SVG text.
    pub svg: String,
}

impl ImageExport {
    pub(crate) fn new(document_path: &Path, svg: String) -> Self {
        let stem = document_path
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "diagram".into());
        Self {
            file_name: format!("{stem}.svg"),
            svg,
        }
    }
}
