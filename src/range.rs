//! Slice arithmetic.
//!
//! Every rank derives its own slice from `(total, participants, rank)` alone,
//! so no index is exchanged. The coordinator takes the remainder share and
//! every other rank takes an equal share right after it.

use crate::{HistError, Result, COORDINATOR};

/// A contiguous run of elements `[offset, offset + len)` owned by one rank.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slice {
    pub offset: usize,
    pub len: usize,
}

impl Slice {
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

fn check_shape(total: usize, participants: usize) -> Result<()> {
    if participants == 0 {
        return Err(HistError::Configuration(
            "a run needs at least one participant".into(),
        ));
    }
    if total < participants {
        return Err(HistError::Configuration(format!(
            "{total} elements cannot be split across {participants} participants"
        )));
    }
    Ok(())
}

/// Computes the slice owned by `rank`.
///
/// Rank 0 owns `total / participants + total % participants` elements from
/// offset 0; rank `r > 0` owns `total / participants` elements starting at
/// `len(0) + (r - 1) * len(r)`.
pub fn compute_slice(total: usize, participants: usize, rank: usize) -> Result<Slice> {
    check_shape(total, participants)?;
    if rank >= participants {
        return Err(HistError::Configuration(format!(
            "rank {rank} is outside a group of {participants}"
        )));
    }
    let share = total / participants;
    let head = share + total % participants;
    if rank == COORDINATOR {
        Ok(Slice {
            offset: 0,
            len: head,
        })
    } else {
        Ok(Slice {
            offset: head + (rank - 1) * share,
            len: share,
        })
    }
}

/// All slices in rank order.
pub fn partition(total: usize, participants: usize) -> Result<Vec<Slice>> {
    check_shape(total, participants)?;
    (0..participants)
        .map(|rank| compute_slice(total, participants, rank))
        .collect()
}
