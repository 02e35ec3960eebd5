//! A distributed histogram (lite) system.
//!
//! Two equal-length vectors stored in files are split across a fixed group
//! of participants. Each participant reads only its own slice of both files,
//! combines the slices element-wise into bin indices, and counts them into a
//! local histogram. The local histograms are then summed at the coordinator
//! (rank 0), which writes the final report.

pub mod aggregate;
pub mod cmd;
pub mod combine;
pub mod driver;
pub mod error;
pub mod histogram;
pub mod logging;
pub mod range;
pub mod runtime;
pub mod source;
pub mod wire;

pub use error::{HistError, Result};
pub use histogram::Histogram;

/// The rank that owns the remainder share and merges every histogram.
pub const COORDINATOR: usize = 0;

/// Bin count used when none is configured.
pub const DEFAULT_NUM_BINS: usize = 80;

/////////////////////////////////////////////////////////////////////////////
// Binning
/////////////////////////////////////////////////////////////////////////////

/// An index into a [`Histogram`], always within `[0, num_bins - 1]`.
pub type BinIndex = usize;

/// The number of bins and the policy for out-of-range kernel outputs.
///
/// Raw values at or above `num_bins` land in the top bin, negative values
/// land in bin 0. Nothing is ever dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BinLayout {
    num_bins: usize,
}

impl BinLayout {
    /// Returns a [`HistError::Configuration`] if `num_bins` is zero.
    pub fn new(num_bins: usize) -> Result<Self> {
        if num_bins == 0 {
            return Err(HistError::Configuration(
                "a histogram needs at least one bin".into(),
            ));
        }
        Ok(Self { num_bins })
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    #[inline]
    pub fn top(&self) -> BinIndex {
        self.num_bins - 1
    }

    /// Maps a raw kernel output onto a valid bin.
    #[inline]
    pub fn clamp(&self, raw: i64) -> BinIndex {
        if raw < 0 {
            0
        } else {
            usize::try_from(raw).map_or(self.top(), |bin| bin.min(self.top()))
        }
    }
}

impl Default for BinLayout {
    fn default() -> Self {
        Self {
            num_bins: DEFAULT_NUM_BINS,
        }
    }
}
