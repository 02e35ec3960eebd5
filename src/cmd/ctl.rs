use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::source::SourceFormat;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a vector file
    Gen {
        /// Number of elements
        #[arg(short = 'n', long)]
        len: usize,

        /// Value of the first element
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        start: f32,

        /// Added to each element to get the next one
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        step: f32,

        #[arg(short, long, value_enum, default_value_t = SourceFormat::Binary)]
        format: SourceFormat,

        /// Output file
        output: PathBuf,
    },
    /// Rewrite a vector file in another format
    Convert {
        input: PathBuf,

        output: PathBuf,

        #[arg(long, value_enum, default_value_t = SourceFormat::Text)]
        from: SourceFormat,

        #[arg(long, value_enum, default_value_t = SourceFormat::Binary)]
        to: SourceFormat,
    },
    /// Show a file's element count and how it would be split
    Inspect {
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = SourceFormat::Binary)]
        format: SourceFormat,

        /// Group size to print the slice table for
        #[arg(short = 'n', long, default_value = None)]
        participants: Option<usize>,
    },
}
