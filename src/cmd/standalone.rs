use clap::Parser;

use super::JobArgs;

/// Runs a whole group inside one process, one task per rank.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub job: JobArgs,
    /// Number of participants to simulate
    #[arg(short = 'n', long, default_value_t = 1)]
    pub participants: usize,
}
