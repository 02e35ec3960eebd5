use anyhow::Result;
use clap::Parser;
use histlite::cmd::ctl::{Args, Commands};
use histlite::range::partition;
use histlite::range::Slice;
use histlite::source::{self, binary, text, SourceFormat};
use histlite::*;

fn write(path: &std::path::Path, format: SourceFormat, values: &[f32]) -> Result<()> {
    match format {
        SourceFormat::Binary => binary::write_vector(path, values)?,
        SourceFormat::Text => text::write_vector(path, values)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::init_tracing()?;
    let args = Args::parse();
    match args.command {
        Commands::Gen {
            len,
            start,
            step,
            format,
            output,
        } => {
            let values: Vec<f32> = (0..len).map(|i| start + step * i as f32).collect();
            write(&output, format, &values)?;
            println!("Wrote {len} elements to {}", output.display());
        }
        Commands::Convert {
            input,
            output,
            from,
            to,
        } => {
            let src = source::open(&input, from);
            let total = src.element_count()?;
            let values = src.read_slice(Slice {
                offset: 0,
                len: total,
            })?;
            write(&output, to, &values)?;
            println!(
                "Converted {total} elements from {from} to {to}: {}",
                output.display()
            );
        }
        Commands::Inspect {
            input,
            format,
            participants,
        } => {
            let total = source::open(&input, format).element_count()?;
            println!("{}: {total} elements ({format})", input.display());
            if let Some(participants) = participants {
                for (rank, slice) in partition(total, participants)?.iter().enumerate() {
                    println!("rank {rank}: offset {}, length {}", slice.offset, slice.len);
                }
            }
        }
    }
    Ok(())
}
