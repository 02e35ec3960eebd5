//! Fixed-size histograms: local accumulation, merging and the report.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::{BinIndex, BinLayout, HistError, Result};

/// `num_bins` counts indexed by bin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    /// An all-zero histogram shaped by `layout`.
    pub fn new(layout: BinLayout) -> Self {
        Self {
            counts: vec![0; layout.num_bins()],
        }
    }

    /// Counts every bin index in `bins`.
    ///
    /// The result does not depend on the order of `bins`. Indices past the
    /// top bin are counted in the top bin.
    pub fn accumulate(bins: &[BinIndex], layout: BinLayout) -> Self {
        let mut hist = Self::new(layout);
        let top = layout.top();
        for &bin in bins {
            hist.counts[bin.min(top)] += 1;
        }
        hist
    }

    /// Rebuilds a histogram received from a peer.
    pub fn from_counts(counts: Vec<u64>) -> Result<Self> {
        if counts.is_empty() {
            return Err(HistError::Configuration(
                "a histogram needs at least one bin".into(),
            ));
        }
        Ok(Self { counts })
    }

    /// Adds `other` bin by bin.
    pub fn merge(&mut self, other: &Histogram) -> Result<()> {
        if other.counts.len() != self.counts.len() {
            return Err(HistError::Configuration(format!(
                "cannot merge a {}-bin histogram into a {}-bin one",
                other.counts.len(),
                self.counts.len()
            )));
        }
        // sum into a fresh buffer so a rejected merge leaves `self` untouched
        let summed = self
            .counts
            .iter()
            .zip(&other.counts)
            .enumerate()
            .map(|(bin, (mine, theirs))| {
                mine.checked_add(*theirs).ok_or_else(|| {
                    HistError::Transport(format!(
                        "bin {bin} overflows when adding {theirs} to {mine}"
                    ))
                })
            })
            .collect::<Result<Vec<u64>>>()?;
        self.counts = summed;
        Ok(())
    }

    #[inline]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    #[inline]
    pub fn into_counts(self) -> Vec<u64> {
        self.counts
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    /// Total number of counted elements.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Writes one `"<bin>, <count>"` line per bin in ascending bin order.
    pub fn write_report<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        for (bin, count) in self.counts.iter().enumerate() {
            writeln!(out, "{bin}, {count}")?;
        }
        out.flush()
    }

    pub fn write_report_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| HistError::io(path, e))?;
        self.write_report(BufWriter::new(file))
            .map_err(|e| HistError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(n: usize) -> BinLayout {
        BinLayout::new(n).unwrap()
    }

    #[test]
    fn accumulate_counts_each_index() {
        let hist = Histogram::accumulate(&[0, 2, 2, 3, 2], layout(4));
        assert_eq!(hist.counts(), &[1, 0, 3, 1]);
        assert_eq!(hist.total(), 5);
    }

    #[test]
    fn accumulate_ignores_order() {
        let bins = [5, 1, 1, 0, 7, 7, 7, 3];
        let mut reversed = bins;
        reversed.reverse();
        assert_eq!(
            Histogram::accumulate(&bins, layout(8)),
            Histogram::accumulate(&reversed, layout(8))
        );
    }

    #[test]
    fn merge_is_order_independent() {
        let parts: Vec<Histogram> = [
            vec![1, 0, 4],
            vec![0, 2, 2],
            vec![3, 3, 0],
            vec![0, 0, 9],
        ]
        .into_iter()
        .map(|c| Histogram::from_counts(c).unwrap())
        .collect();

        let mut forward = Histogram::new(layout(3));
        for part in &parts {
            forward.merge(part).unwrap();
        }
        let mut shuffled = Histogram::new(layout(3));
        for i in [2, 0, 3, 1] {
            shuffled.merge(&parts[i]).unwrap();
        }
        assert_eq!(forward, shuffled);
        assert_eq!(forward.counts(), &[4, 5, 15]);
    }

    #[test]
    fn merge_overflow_is_an_error_and_leaves_counts_alone() {
        let mut mine = Histogram::from_counts(vec![1, 5]).unwrap();
        let theirs = Histogram::from_counts(vec![u64::MAX, 0]).unwrap();
        match mine.merge(&theirs) {
            Err(HistError::Transport(msg)) => assert!(msg.contains("bin 0"), "{msg}"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(mine.counts(), &[1, 5]);
    }

    #[test]
    fn merge_rejects_other_shapes() {
        let mut a = Histogram::new(layout(3));
        let b = Histogram::new(layout(4));
        assert!(matches!(a.merge(&b), Err(HistError::Configuration(_))));
        assert!(Histogram::from_counts(Vec::new()).is_err());
    }

    #[test]
    fn report_has_one_line_per_bin() {
        let hist = Histogram::from_counts(vec![0, 0, 8, 1]).unwrap();
        let mut out = Vec::new();
        hist.write_report(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0, 0\n1, 0\n2, 8\n3, 1\n");
    }
}
