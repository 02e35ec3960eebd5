//! The collective reduction.
//!
//! A star-shaped, single-round protocol: every participant sends its local
//! histogram to the coordinator exactly once, and the coordinator adds all of
//! them, in whatever order they arrive, onto its own. Before any of that, the
//! coordinator broadcasts a [`Verdict`] so participants never start work on
//! a run it has rejected.
//!
//! The protocol is written against [`Communicator`]; [`local`] runs a whole
//! group inside one process and [`grpc`] spans machines.

use std::time::Duration;

use tokio::time::timeout;

use crate::wire::{BlockKind, HistogramBlock, PreflightVerdict};
use crate::{HistError, Histogram, Result, COORDINATOR};

pub mod grpc;
pub mod local;

/// The coordinator's pre-flight decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Inputs are consistent; both hold `total` elements.
    Proceed { total: usize },
    /// The run is rejected; nobody should read or send anything.
    Abort { reason: String },
}

/// What a participant sends to the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Histogram { rank: usize, histogram: Histogram },
    /// The sender failed locally and will not contribute.
    Abort { rank: usize, reason: String },
}

impl Message {
    pub fn rank(&self) -> usize {
        match self {
            Message::Histogram { rank, .. } | Message::Abort { rank, .. } => *rank,
        }
    }
}

/// One endpoint of a fixed-size group.
///
/// The coordinator uses [`broadcast_verdict`](Communicator::broadcast_verdict)
/// and [`recv`](Communicator::recv); participants use
/// [`await_verdict`](Communicator::await_verdict) and
/// [`send`](Communicator::send). Calling the other role's methods is a
/// [`HistError::Transport`] error.
#[tonic::async_trait]
pub trait Communicator: Send {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }

    async fn broadcast_verdict(&mut self, verdict: Verdict) -> Result<()>;

    async fn await_verdict(&mut self) -> Result<Verdict>;

    async fn send(&mut self, message: Message) -> Result<()>;

    async fn recv(&mut self) -> Result<Message>;
}

pub(crate) fn wrong_role(what: &str, rank: usize) -> HistError {
    HistError::Transport(format!("rank {rank} cannot {what}"))
}

/// Sums every participant's histogram into the coordinator's.
///
/// On a participant this sends `local` and returns `None`. On the
/// coordinator it performs exactly `size - 1` receives, accepting senders in
/// any order, and returns the merged histogram. `wait` bounds each receive;
/// `None` waits indefinitely.
pub async fn reduce_to_coordinator<C: Communicator + ?Sized>(
    comm: &mut C,
    local: Histogram,
    wait: Option<Duration>,
) -> Result<Option<Histogram>> {
    let rank = comm.rank();
    if !comm.is_coordinator() {
        tracing::debug!(rank, bins = local.num_bins(), "sending local histogram");
        comm.send(Message::Histogram {
            rank,
            histogram: local,
        })
        .await?;
        return Ok(None);
    }

    let size = comm.size();
    let mut merged = local;
    let mut seen = vec![false; size];
    seen[COORDINATOR] = true;
    for pending in (1..size).rev() {
        let message = match wait {
            Some(limit) => timeout(limit, comm.recv()).await.map_err(|_| {
                HistError::Transport(format!(
                    "no histogram within {limit:?}; {pending} participant(s) still outstanding"
                ))
            })??,
            None => comm.recv().await?,
        };
        let sender = message.rank();
        if sender == COORDINATOR || sender >= size {
            return Err(HistError::Transport(format!(
                "message from rank {sender}, which is not a participant in a group of {size}"
            )));
        }
        if seen[sender] {
            return Err(HistError::Transport(format!(
                "rank {sender} contributed twice"
            )));
        }
        seen[sender] = true;
        match message {
            Message::Histogram { histogram, .. } => {
                merged.merge(&histogram)?;
                tracing::debug!(rank, from = sender, remaining = pending - 1, "merged histogram");
            }
            Message::Abort { reason, .. } => {
                return Err(HistError::ParticipantFailed {
                    rank: sender,
                    reason,
                });
            }
        }
    }
    Ok(Some(merged))
}

/////////////////////////////////////////////////////////////////////////////
// Wire conversions
/////////////////////////////////////////////////////////////////////////////

impl From<Verdict> for PreflightVerdict {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Proceed { total } => PreflightVerdict {
                proceed: true,
                total: total as u64,
                reason: String::new(),
            },
            Verdict::Abort { reason } => PreflightVerdict {
                proceed: false,
                total: 0,
                reason,
            },
        }
    }
}

impl TryFrom<PreflightVerdict> for Verdict {
    type Error = HistError;

    fn try_from(wire: PreflightVerdict) -> Result<Self> {
        if !wire.proceed {
            return Ok(Verdict::Abort {
                reason: wire.reason,
            });
        }
        let total = usize::try_from(wire.total).map_err(|_| {
            HistError::Transport(format!("element count {} overflows this node", wire.total))
        })?;
        Ok(Verdict::Proceed { total })
    }
}

impl From<Message> for HistogramBlock {
    fn from(message: Message) -> Self {
        match message {
            Message::Histogram { rank, histogram } => HistogramBlock {
                rank: rank as u32,
                kind: BlockKind::Histogram as i32,
                counts: histogram.into_counts(),
                reason: String::new(),
            },
            Message::Abort { rank, reason } => HistogramBlock {
                rank: rank as u32,
                kind: BlockKind::Abort as i32,
                counts: Vec::new(),
                reason,
            },
        }
    }
}

impl TryFrom<HistogramBlock> for Message {
    type Error = HistError;

    fn try_from(block: HistogramBlock) -> Result<Self> {
        let rank = block.rank as usize;
        match BlockKind::try_from(block.kind) {
            Ok(BlockKind::Histogram) => Ok(Message::Histogram {
                rank,
                histogram: Histogram::from_counts(block.counts)?,
            }),
            Ok(BlockKind::Abort) => Ok(Message::Abort {
                rank,
                reason: block.reason,
            }),
            Ok(BlockKind::Unspecified) | Err(_) => Err(HistError::Transport(format!(
                "rank {rank} sent a block of unknown kind {}",
                block.kind
            ))),
        }
    }
}
