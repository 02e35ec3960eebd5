//! Runs one node's share of a job from pre-flight to report.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::aggregate::local::local_world;
use crate::aggregate::{reduce_to_coordinator, Communicator, Message, Verdict};
use crate::combine::{combine, Kernel};
use crate::range::compute_slice;
use crate::source::{self, SourceFormat};
use crate::{BinLayout, HistError, Histogram, Result};

/// Everything a node needs to know about a run, identical on every rank.
#[derive(Clone, Debug)]
pub struct Job {
    pub a: PathBuf,
    pub b: PathBuf,
    pub format: SourceFormat,
    pub layout: BinLayout,
    pub kernel: Kernel,
    /// Where the coordinator writes the report.
    pub output: PathBuf,
    /// Upper bound on each receive at the coordinator; `None` waits forever.
    pub receive_timeout: Option<Duration>,
}

/// Decides at the coordinator whether the run can go ahead.
fn preflight(job: &Job, participants: usize) -> Result<usize> {
    let total_a = source::open(&job.a, job.format).element_count()?;
    let total_b = source::open(&job.b, job.format).element_count()?;
    if total_a != total_b {
        return Err(HistError::Configuration(format!(
            "input vectors differ in length: {} has {total_a} elements, {} has {total_b}",
            job.a.display(),
            job.b.display()
        )));
    }
    if total_a < participants {
        return Err(HistError::Configuration(format!(
            "{total_a} elements are too few to split across {participants} participants"
        )));
    }
    Ok(total_a)
}

/// Reads, combines and counts this rank's slice.
fn local_histogram(job: &Job, total: usize, participants: usize, rank: usize) -> Result<Histogram> {
    let slice = compute_slice(total, participants, rank)?;
    tracing::info!(rank, offset = slice.offset, len = slice.len, "reading slice");
    let a = source::open(&job.a, job.format).read_slice(slice)?;
    let b = source::open(&job.b, job.format).read_slice(slice)?;
    let bins = combine(&job.kernel, &a, &b, job.layout)?;
    drop((a, b));
    let hist = Histogram::accumulate(&bins, job.layout);
    tracing::debug!(rank, counted = hist.total(), "local histogram ready");
    Ok(hist)
}

/// Runs `job` on the node behind `comm`.
///
/// The coordinator validates both inputs and broadcasts the verdict before
/// anyone reads a slice; participants do nothing until it arrives. Returns
/// the merged histogram on the coordinator (after writing the report) and
/// `None` on every other rank.
pub async fn run_node<C: Communicator + ?Sized>(comm: &mut C, job: &Job) -> Result<Option<Histogram>> {
    let rank = comm.rank();
    let size = comm.size();

    let total = if comm.is_coordinator() {
        match preflight(job, size) {
            Ok(total) => {
                tracing::info!(rank, total, participants = size, "inputs accepted");
                comm.broadcast_verdict(Verdict::Proceed { total }).await?;
                total
            }
            Err(err) => {
                tracing::error!(rank, error = %err, "rejecting run");
                comm.broadcast_verdict(Verdict::Abort {
                    reason: err.to_string(),
                })
                .await?;
                return Err(err);
            }
        }
    } else {
        match comm.await_verdict().await? {
            Verdict::Proceed { total } => total,
            Verdict::Abort { reason } => {
                return Err(HistError::Configuration(format!(
                    "coordinator rejected the run: {reason}"
                )))
            }
        }
    };

    let local = match local_histogram(job, total, size, rank) {
        Ok(hist) => hist,
        Err(err) => {
            if !comm.is_coordinator() {
                // let the coordinator fail now instead of waiting on us
                let notice = Message::Abort {
                    rank,
                    reason: err.to_string(),
                };
                if let Err(send_err) = comm.send(notice).await {
                    tracing::warn!(rank, error = %send_err, "could not report failure");
                }
            }
            return Err(err);
        }
    };

    let merged = reduce_to_coordinator(comm, local, job.receive_timeout).await?;
    if let Some(hist) = &merged {
        hist.write_report_file(&job.output)?;
        tracing::info!(
            rank,
            output = %job.output.display(),
            counted = hist.total(),
            "report written"
        );
    }
    Ok(merged)
}

/// Runs every rank of `job` as a task in this process and returns the
/// coordinator's histogram.
///
/// All ranks are awaited so each failure gets logged; the lowest failing
/// rank's error is returned since the coordinator's names the root cause.
pub async fn run_local_group(job: Job, participants: usize) -> Result<Histogram> {
    if participants == 0 {
        return Err(HistError::Configuration(
            "at least one participant is required".into(),
        ));
    }
    let job = Arc::new(job);
    let mut tasks = JoinSet::new();
    for mut comm in local_world(participants) {
        let job = Arc::clone(&job);
        tasks.spawn(async move {
            let rank = comm.rank();
            (rank, run_node(&mut comm, &job).await)
        });
    }

    let mut merged = None;
    let mut failure: Option<(usize, HistError)> = None;
    while let Some(joined) = tasks.join_next().await {
        let (rank, outcome) =
            joined.map_err(|e| HistError::Transport(format!("rank task failed: {e}")))?;
        match outcome {
            Ok(Some(hist)) => merged = Some(hist),
            Ok(None) => {}
            Err(err) => {
                tracing::error!(rank, error = %err, "rank failed");
                if failure.as_ref().map_or(true, |(r, _)| rank < *r) {
                    failure = Some((rank, err));
                }
            }
        }
    }
    if let Some((_, err)) = failure {
        return Err(err);
    }
    merged.ok_or_else(|| HistError::Transport("coordinator finished without a histogram".into()))
}
