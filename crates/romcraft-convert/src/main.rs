//! Converts tool definitions between NDI `.rom`, SAW `.json` and Atracsys `.ini` files.
//!
//! Formats are picked by file extension. Without `--output` the tool is printed to
//! stdout as SAW JSON.

mod atracsys;
mod convert;
mod saw;

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::convert::RomStamp;

/// Command-line arguments for the converter.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file (.rom, .json or .ini)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (.rom, .json or .ini)
    #[arg(short, long, conflicts_with = "dump")]
    output: Option<PathBuf>,

    /// Print every field of a .rom input as JSON
    #[arg(long)]
    dump: bool,

    /// Date stamped into a .rom output, defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Sequence number stamped into a .rom output (0-1023)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u16).range(0..=1023))]
    sequence: u16,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.dump {
        println!("{}", convert::dump(&args.input)?);
        return Ok(());
    }

    let tool = convert::read(&args.input)?;

    match &args.output {
        Some(output) => {
            let mut stamp = RomStamp {
                sequence_number: args.sequence,
                ..RomStamp::default()
            };
            if let Some(date) = args.date {
                stamp.date = date;
            }

            convert::write(&tool, output, stamp)?;
            tracing::info!(
                input = %args.input.display(),
                output = %output.display(),
                markers = tool.markers.len(),
                "converted"
            );
        }
        None => println!("{}", saw::render(&tool)?),
    }

    Ok(())
}
