//! Container parsers.
//!
//! The editor never decodes file headers itself; it works on the object model
//! a `ContainerParser` hands it. `DaFileParser` covers the download-agent file
//! layout shipped by the vendor tools.

pub mod da_file;

pub use da_file::DaFileParser;

use thiserror::Error;

use crate::model::{Container, Image};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Truncated {what}: needs {start:#x}..{end:#x}, file has {available:#x}")]
    Truncated { what: String, start: usize, end: usize, available: usize },
    #[error("Image index {index} out of range (container has {count} images)")]
    ImageOutOfRange { index: usize, count: usize },
    #[error("Region table for image {image} does not fit in a {header_len:#x}-byte header")]
    TableOutsideHeader { image: usize, header_len: usize },
}

/// Turns raw container bytes into the object model, and optionally writes a
/// modified region layout back into a header buffer.
pub trait ContainerParser: Send + Sync {
    /// Human-readable parser name for logs and reports.
    fn name(&self) -> &'static str;

    fn parse(&self, raw: &[u8]) -> Result<Container, ParseError>;

    /// Rewrite the on-disk region table for `image_index` inside `header` so it
    /// matches `image`. Formats without a rewritable table keep the default.
    fn sync_header(
        &self,
        _header: &mut [u8],
        _image_index: usize,
        _image: &Image,
    ) -> Result<(), ParseError> {
        Ok(())
    }
}

/// Bounds-checked slice helper shared by parsers.
pub(crate) fn slice_at<'a>(
    raw: &'a [u8],
    start: usize,
    len: usize,
    what: &str,
) -> Result<&'a [u8], ParseError> {
    let end = start.checked_add(len).unwrap_or(usize::MAX);
    raw.get(start..end).ok_or_else(|| ParseError::Truncated {
        what: what.to_string(),
        start,
        end,
        available: raw.len(),
    })
}
