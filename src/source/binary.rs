//! Binary vector files: a native-endian `i32` element count `N`, then `N`
//! native-endian `f32` values with no padding.
//!
//! Element `i` lives at byte `(i + 1) * 4`, so a slice is read with one seek
//! and one contiguous read.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{buffer, VectorSource};
use crate::range::Slice;
use crate::{HistError, Result};

/// Width of the header and of every element.
const WORD: usize = 4;

#[derive(Debug, Clone)]
pub struct BinarySource {
    path: PathBuf,
}

impl BinarySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Result<File> {
        File::open(&self.path).map_err(|e| HistError::io(&self.path, e))
    }
}

impl VectorSource for BinarySource {
    fn element_count(&self) -> Result<usize> {
        let mut file = self.open()?;
        let mut header = [0u8; WORD];
        match file.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(HistError::Configuration(format!(
                    "{} is too short to hold an element count",
                    self.path.display()
                )))
            }
            Err(e) => return Err(HistError::io(&self.path, e)),
        }
        let declared = Bytes::copy_from_slice(&header).get_i32_ne();
        usize::try_from(declared).map_err(|_| {
            HistError::Configuration(format!(
                "{} declares a negative element count ({declared})",
                self.path.display()
            ))
        })
    }

    fn read_slice(&self, slice: Slice) -> Result<Vec<f32>> {
        let mut file = self.open()?;
        let file_len = file
            .metadata()
            .map_err(|e| HistError::io(&self.path, e))?
            .len();
        let available = usize::try_from(file_len.saturating_sub(WORD as u64) / WORD as u64)
            .unwrap_or(usize::MAX);
        if slice.end() > available {
            return Err(HistError::ShortRead {
                path: self.path.clone(),
                offset: slice.offset,
                end: slice.end(),
                available,
            });
        }

        let n_bytes = slice
            .len
            .checked_mul(WORD)
            .ok_or(HistError::Allocation {
                elements: slice.len,
            })?;
        let mut raw = buffer::<u8>(n_bytes)?;
        raw.resize(n_bytes, 0);
        file.seek(SeekFrom::Start(((slice.offset + 1) * WORD) as u64))
            .map_err(|e| HistError::io(&self.path, e))?;
        file.read_exact(&mut raw).map_err(|e| match e.kind() {
            // the file shrank between the size check and the read
            ErrorKind::UnexpectedEof => HistError::ShortRead {
                path: self.path.clone(),
                offset: slice.offset,
                end: slice.end(),
                available,
            },
            _ => HistError::io(&self.path, e),
        })?;

        let mut raw = Bytes::from(raw);
        let mut values = buffer::<f32>(slice.len)?;
        while raw.has_remaining() {
            values.push(raw.get_f32_ne());
        }
        Ok(values)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes `values` to `path` in the binary layout, replacing any old file.
pub fn write_vector(path: impl AsRef<Path>, values: &[f32]) -> Result<()> {
    let path = path.as_ref();
    let declared = i32::try_from(values.len()).map_err(|_| {
        HistError::Configuration(format!(
            "{} elements do not fit in a binary header",
            values.len()
        ))
    })?;
    let mut out = BytesMut::with_capacity((values.len() + 1) * WORD);
    out.put_i32_ne(declared);
    for &value in values {
        out.put_f32_ne(value);
    }
    fs::write(path, out.freeze()).map_err(|e| HistError::io(path, e))
}
