//! Readers for vector files.
//!
//! A vector file is read through the [`VectorSource`] capability, which
//! reports how many elements the file declares and reads one slice of them.
//! Which codec backs a source is chosen by [`SourceFormat`].
//!
//! # Example
//!
//! ```no_run
//! # use histlite::Result;
//! use histlite::range::compute_slice;
//! use histlite::source::{self, SourceFormat};
//! # fn main() -> Result<()> {
//! let src = source::open("a.bin", SourceFormat::Binary);
//! let total = src.element_count()?;
//! let mine = src.read_slice(compute_slice(total, 4, 1)?)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::range::Slice;
use crate::{HistError, Result};

pub mod binary;
pub mod text;

pub use binary::BinarySource;
pub use text::TextSource;

/// A file holding one vector.
pub trait VectorSource: Send + Sync {
    /// Number of elements the source declares.
    fn element_count(&self) -> Result<usize>;

    /// Reads exactly `slice.len` values starting at element `slice.offset`.
    ///
    /// Returns [`HistError::ShortRead`] when the source ends before
    /// `slice.end()`.
    fn read_slice(&self, slice: Slice) -> Result<Vec<f32>>;

    fn path(&self) -> &Path;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SourceFormat {
    /// `i32` element count followed by that many `f32`, native byte order.
    #[default]
    Binary,
    /// Whitespace-separated decimal numbers.
    Text,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Binary => f.write_str("binary"),
            SourceFormat::Text => f.write_str("text"),
        }
    }
}

/// Opens `path` with the codec named by `format`.
///
/// Nothing is read until the source is queried.
pub fn open(path: impl Into<PathBuf>, format: SourceFormat) -> Box<dyn VectorSource> {
    match format {
        SourceFormat::Binary => Box::new(BinarySource::new(path)),
        SourceFormat::Text => Box::new(TextSource::new(path)),
    }
}

/// Allocates an empty buffer able to hold `len` values without growing.
pub(crate) fn buffer<T>(len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| HistError::Allocation { elements: len })?;
    Ok(buf)
}
