use std::error::Error;

use clap::{Parser, Subcommand};

use stbench::analyze::{self, SilhouetteArgs};
use stbench::downsample::{self, DownsampleArgs};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Randomly keep 50% of the rows of every transcripts_x*_y*.parquet tile (seed 42)
    Downsample(DownsampleArgs),
    /// Silhouette score and diagnostic figure for a clustering
    Silhouette(SilhouetteArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Downsample(args) => downsample::downsample_tiles(&args),
        Commands::Silhouette(args) => analyze::analyze_silhouette(&args),
    }
}
