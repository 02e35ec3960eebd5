use std::net::SocketAddr;

use clap::Parser;

use super::JobArgs;

/// One participant of a distributed run.
///
/// Rank and group size come from the launcher (HISTLITE_RANK and
/// HISTLITE_WORLD_SIZE, or the OMPI_COMM_WORLD_* / PMI_* equivalents).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub job: JobArgs,
    /// Address the coordinator (rank 0) listens on
    #[arg(short, long, default_value = "0.0.0.0:50051")]
    pub listen: SocketAddr,
    /// Address participants use to reach the coordinator
    #[arg(short = 'J', long, env = "HISTLITE_COORDINATOR", default_value = "127.0.0.1:50051")]
    pub coordinator: String,
    /// Seconds a participant keeps retrying to reach the coordinator
    #[arg(long, default_value_t = 30)]
    pub connect_patience: u64,
    /// Seconds an aborting coordinator waits for participants to hear about it
    #[arg(long, default_value_t = 30)]
    pub abort_linger: u64,
}
