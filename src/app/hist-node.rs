use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use histlite::aggregate::grpc::{GrpcCoordinator, GrpcParticipant};
use histlite::aggregate::local::local_world;
use histlite::cmd::node::Args;
use histlite::driver::run_node;
use histlite::runtime::World;
use histlite::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing()?;
    let args = Args::parse();
    let world = World::from_env()?;
    let job = args.job.into_job()?;
    tracing::info!(
        rank = world.rank,
        size = world.size,
        kernel = job.kernel.name,
        bins = job.layout.num_bins(),
        format = %job.format,
        "node starting"
    );

    if world.size == 1 {
        // nobody to talk to
        let mut comm = local_world(1).remove(COORDINATOR);
        run_node(&mut comm, &job).await?;
        return Ok(());
    }

    if world.rank == COORDINATOR {
        let mut coordinator = GrpcCoordinator::bind(args.listen, world.size)
            .await?
            .with_abort_linger(Duration::from_secs(args.abort_linger));
        let outcome = run_node(&mut coordinator, &job).await;
        coordinator
            .finish(outcome)
            .await
            .context("run failed at the coordinator")?;
    } else {
        let mut participant = GrpcParticipant::connect(
            &args.coordinator,
            world.rank,
            world.size,
            Duration::from_secs(args.connect_patience),
        )
        .await?;
        run_node(&mut participant, &job)
            .await
            .with_context(|| format!("run failed at rank {}", world.rank))?;
    }
    Ok(())
}
