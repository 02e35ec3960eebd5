//! Text vector files: decimal numbers separated by any run of space, tab,
//! newline, form feed or carriage return.
//!
//! There is no header, so both counting and slicing scan the whole file.

use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;

use super::{buffer, VectorSource};
use crate::range::Slice;
use crate::{HistError, Result};

#[derive(Debug, Clone)]
pub struct TextSource {
    path: PathBuf,
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0c' | '\r')
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_separator).filter(|tok| !tok.is_empty())
}

impl TextSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| HistError::io(&self.path, e))
    }
}

impl VectorSource for TextSource {
    fn element_count(&self) -> Result<usize> {
        Ok(tokens(&self.load()?).count())
    }

    fn read_slice(&self, slice: Slice) -> Result<Vec<f32>> {
        let text = self.load()?;
        let mut values = buffer::<f32>(slice.len)?;
        for (index, token) in tokens(&text).enumerate().skip(slice.offset).take(slice.len) {
            let value = token.parse::<f32>().map_err(|_| HistError::Parse {
                path: self.path.clone(),
                index,
                token: token.to_string(),
            })?;
            values.push(value);
        }
        if values.len() < slice.len {
            return Err(HistError::ShortRead {
                path: self.path.clone(),
                offset: slice.offset,
                end: slice.end(),
                available: tokens(&text).count(),
            });
        }
        Ok(values)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes `values` to `path`, one per line.
pub fn write_vector(path: impl AsRef<Path>, values: &[f32]) -> Result<()> {
    let path = path.as_ref();
    let mut body = values.iter().join("\n");
    body.push('\n');
    fs::write(path, body).map_err(|e| HistError::io(path, e))
}
