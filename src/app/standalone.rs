use anyhow::Result;
use clap::Parser;
use histlite::cmd::standalone::Args;
use histlite::driver::run_local_group;
use histlite::*;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing()?;
    let args = Args::parse();
    let job = args.job.into_job()?;
    let hist = run_local_group(job, args.participants).await?;
    println!("{} elements binned", hist.total());
    Ok(())
}
