use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use arrow::array::UInt32Array;
use arrow::compute::take_record_batch;
use clap::Args;
use glob::{glob, Pattern};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use regex::Regex;

use crate::error::{Error, Result};
use crate::progress::format_time_used;
use crate::table::{read_parquet, write_parquet};
use crate::Logger;

pub const DEFAULT_PATTERN: &str = "transcripts_x*_y*.parquet";
pub const DEFAULT_RATIO: f64 = 0.5;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Args, Debug)]
pub struct DownsampleArgs {
    /// Directory holding the transcripts_x<i>_y<j>.parquet tiles
    #[arg(short = 'i', long = "input-dir")]
    pub input_dir: String,
    /// Directory the downsampled tiles are written to
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: String,
    /// Log file path (default: downsample.log)
    #[arg(short = 'l', long = "log")]
    pub log: Option<String>,
}

/// Validate downsample command arguments
fn validate_downsample_args(args: &DownsampleArgs) -> std::result::Result<(), Box<dyn std::error::Error>> {
    if args.input_dir.trim().is_empty() {
        return Err("Error: Input directory cannot be empty".into());
    }
    if !Path::new(&args.input_dir).is_dir() {
        return Err(format!("Error: Input directory does not exist: {}", args.input_dir).into());
    }
    if args.output_dir.trim().is_empty() {
        return Err("Error: Output directory cannot be empty".into());
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DownsampleConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub pattern: String,
    pub ratio: f64,
    pub seed: u64,
}

impl DownsampleConfig {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: PathBuf::from("."),
            pattern: DEFAULT_PATTERN.to_string(),
            ratio: DEFAULT_RATIO,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// `transcripts_downsample<ratio>_<tile>.parquet` inside the output directory.
    pub fn output_path(&self, tile: &TileId) -> PathBuf {
        self.output_dir
            .join(format!("transcripts_downsample{}_{}.parquet", self.ratio, tile))
    }
}

/// Grid cell of a transcript tile, as written in its file name.
///
/// Any name the default pattern matches parses. `y` starts after the last
/// `_y`, so `transcripts_x1_y0_rep2.parquet` keeps `0_rep2` and the tile
/// still prints back as `x1_y0_rep2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileId {
    pub x: String,
    pub y: String,
}

fn tile_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^transcripts_x(.*)_y(.*)\.parquet$").expect("tile name pattern is valid")
    })
}

impl TileId {
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidTileName(path.to_path_buf()))?;
        let caps = tile_name_regex()
            .captures(name)
            .ok_or_else(|| Error::InvalidTileName(path.to_path_buf()))?;
        Ok(TileId {
            x: caps[1].to_string(),
            y: caps[2].to_string(),
        })
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}_y{}", self.x, self.y)
    }
}

/// Rows kept out of `n_rows`: `n_rows * ratio` rounded half to even.
pub fn sample_size(n_rows: usize, ratio: f64) -> usize {
    (n_rows as f64 * ratio).round_ties_even().clamp(0.0, n_rows as f64) as usize
}

/// Uniform draw of `sample_size(n_rows, ratio)` distinct row indices, in draw order.
pub fn sample_indices(n_rows: usize, ratio: f64, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    index::sample(&mut rng, n_rows, sample_size(n_rows, ratio)).into_vec()
}

/// Tile files matching the configured pattern, in sorted order.
pub fn find_tiles(config: &DownsampleConfig) -> Result<Vec<PathBuf>> {
    let input_dir = Pattern::escape(&config.input_dir.to_string_lossy());
    let pattern = Path::new(&input_dir).join(&config.pattern);
    let mut files = Vec::new();
    for entry in glob(&pattern.to_string_lossy())? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileOutcome {
    pub tile: TileId,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub rows_in: usize,
    pub rows_out: usize,
}

pub fn downsample_file(path: &Path, config: &DownsampleConfig) -> Result<TileOutcome> {
    let tile = TileId::from_path(path)?;
    let batch = read_parquet(path)?;

    let indices = sample_indices(batch.num_rows(), config.ratio, config.seed);
    let indices = UInt32Array::from_iter_values(indices.into_iter().map(|i| i as u32));
    let sampled = take_record_batch(&batch, &indices)?;

    let destination = config.output_path(&tile);
    write_parquet(&destination, &sampled)?;

    Ok(TileOutcome {
        tile,
        source: path.to_path_buf(),
        destination,
        rows_in: batch.num_rows(),
        rows_out: sampled.num_rows(),
    })
}

/// Downsample every matching tile in listing order; the first failure stops the run.
pub fn run(config: &DownsampleConfig, logger: &mut Logger) -> Result<Vec<TileOutcome>> {
    let tiles = find_tiles(config)?;
    logger.log(&format!("Matched {} tile files", tiles.len()))?;

    let mut outcomes = Vec::with_capacity(tiles.len());
    for path in &tiles {
        let outcome = downsample_file(path, config)?;
        let source_name = outcome
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let message = format!(
            "Processed {} -> {}",
            source_name,
            outcome.destination.display()
        );
        println!("{}", message);
        logger.log(&format!(
            "{} ({} -> {} rows)",
            message, outcome.rows_in, outcome.rows_out
        ))?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

pub fn downsample_tiles(args: &DownsampleArgs) -> std::result::Result<(), Box<dyn std::error::Error>> {
    validate_downsample_args(args)?;

    let start_time = Instant::now();

    let log_file = if let Some(log_path) = &args.log {
        std::fs::File::create(log_path)?
    } else {
        std::fs::File::create("downsample.log")?
    };
    let mut logger = Logger::new(log_file);

    let config = DownsampleConfig::new(&args.input_dir).with_output_dir(&args.output_dir);
    std::fs::create_dir_all(&config.output_dir)?;

    logger.log("=== stbench Downsample Log ===")?;
    logger.log(&format!("Software Version: v{}", crate::VERSION))?;
    logger.log(&format!(
        "Runtime: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
    ))?;
    logger.log(&format!("Input Directory: {}", args.input_dir))?;
    logger.log(&format!("Output Directory: {}", args.output_dir))?;
    logger.log(&format!("Pattern: {}", config.pattern))?;
    logger.log(&format!("Ratio: {}", config.ratio))?;
    logger.log(&format!("Seed: {}", config.seed))?;

    println!("[Downsampling tiles]");
    println!("    Input: {}/{}", args.input_dir, config.pattern);
    println!("    Ratio: {} (seed {})", config.ratio, config.seed);
    println!();

    let result = run(&config, &mut logger);
    match &result {
        Ok(outcomes) => {
            logger.log(&format!("Downsampling completed: {} tiles", outcomes.len()))?;
            println!();
            println!("[Done] {} tiles written to {}", outcomes.len(), args.output_dir);
        }
        Err(e) => logger.log(&format!("Downsampling failed: {}", e))?,
    }
    result?;

    let elapsed = format_time_used(start_time.elapsed());
    logger.log(&elapsed)?;
    println!("{}", elapsed);
    Ok(())
}
