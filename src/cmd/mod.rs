//! Command-line arguments for the binaries in `src/app`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::driver::Job;
use crate::source::SourceFormat;
use crate::{combine, BinLayout, Result, DEFAULT_NUM_BINS};

pub mod ctl;
pub mod node;
pub mod standalone;

/// Options describing a run. Every rank must be given the same values.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// First input vector file
    pub a: PathBuf,
    /// Second input vector file, same length as the first
    pub b: PathBuf,
    /// Encoding of both input files
    #[arg(short, long, value_enum, default_value_t = SourceFormat::Binary)]
    pub format: SourceFormat,
    /// Number of histogram bins; outputs outside the range land in the end bins
    #[arg(long, default_value_t = DEFAULT_NUM_BINS)]
    pub bins: usize,
    /// Element-wise function producing a bin per pair (sum, difference, product)
    #[arg(short, long, default_value = "sum")]
    pub kernel: String,
    /// Report file, written by the coordinator only
    #[arg(short, long, default_value = "hist.txt")]
    pub output: PathBuf,
    /// [OPT] Seconds the coordinator waits for each histogram (default: forever)
    #[arg(short = 't', long, default_value = None)]
    pub receive_timeout: Option<u64>,
}

impl JobArgs {
    pub fn into_job(self) -> Result<Job> {
        Ok(Job {
            a: self.a,
            b: self.b,
            format: self.format,
            layout: BinLayout::new(self.bins)?,
            kernel: combine::named(&self.kernel)?,
            output: self.output,
            receive_timeout: self.receive_timeout.map(Duration::from_secs),
        })
    }
}
