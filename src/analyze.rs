use std::error::Error;
use std::path::Path;
use std::time::Instant;

use clap::Args;

use crate::progress::format_time_used;
use crate::silhouette::SilhouetteAnalyzer;
use crate::table::{read_feature_matrix, read_labels};
use crate::Logger;

#[derive(Args, Debug)]
pub struct SilhouetteArgs {
    // Input files
    /// Feature matrix (.csv with header, or .parquet), one row per sample
    #[arg(short = 'f', long = "features")]
    pub features: String,
    /// Cluster labels (.csv with header, or .parquet), one row per sample
    #[arg(short = 'L', long = "labels")]
    pub labels: String,
    /// Label column name (default: first column)
    #[arg(short = 'c', long = "label-column")]
    pub label_column: Option<String>,

    // Output configuration
    /// Figure path (.png or .svg)
    #[arg(short = 'o', long = "output")]
    pub output: String,
    /// Optional per-sample score CSV
    #[arg(long = "scores")]
    pub scores: Option<String>,
    /// Log file path (default: silhouette.log)
    #[arg(short = 'l', long = "log")]
    pub log: Option<String>,
}

/// Validate silhouette command arguments
fn validate_silhouette_args(args: &SilhouetteArgs) -> Result<(), Box<dyn Error>> {
    for (what, path) in [("Feature", &args.features), ("Label", &args.labels)] {
        if path.trim().is_empty() {
            return Err(format!("Error: {} file path cannot be empty", what).into());
        }
        if !Path::new(path).exists() {
            return Err(format!("Error: {} file does not exist: {}", what, path).into());
        }
        if !(path.ends_with(".csv") || path.ends_with(".parquet")) {
            return Err(format!(
                "Error: {} file path must end with .csv or .parquet: {}",
                what, path
            )
            .into());
        }
    }

    if args.output.trim().is_empty() {
        return Err("Error: Output figure path cannot be empty".into());
    }
    if !(args.output.ends_with(".png") || args.output.ends_with(".svg")) {
        return Err(format!(
            "Error: Output figure path must end with .png or .svg: {}",
            args.output
        )
        .into());
    }

    if let Some(scores) = &args.scores {
        if !scores.ends_with(".csv") {
            return Err(format!("Error: Score output path must end with .csv: {}", scores).into());
        }
    }

    Ok(())
}

pub fn analyze_silhouette(args: &SilhouetteArgs) -> Result<(), Box<dyn Error>> {
    validate_silhouette_args(args)?;

    let start_time = Instant::now();

    let log_file = if let Some(log_path) = &args.log {
        std::fs::File::create(log_path)?
    } else {
        std::fs::File::create("silhouette.log")?
    };
    let mut logger = Logger::new(log_file);

    logger.log("=== stbench Silhouette Log ===")?;
    logger.log(&format!("Software Version: v{}", crate::VERSION))?;
    logger.log(&format!(
        "Runtime: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
    ))?;
    logger.log(&format!("Feature File: {}", args.features))?;
    logger.log(&format!("Label File: {}", args.labels))?;
    if let Some(column) = &args.label_column {
        logger.log(&format!("Label Column: {}", column))?;
    }
    logger.log(&format!("Output Figure: {}", args.output))?;

    println!("[Loading data]");
    println!("    Features: {}", args.features);
    println!("    Labels: {}", args.labels);
    println!();

    logger.log_and_progress("Reading feature matrix...")?;
    let features = read_feature_matrix(Path::new(&args.features))?;
    logger.log_and_progress("Reading cluster labels...")?;
    let labels = read_labels(Path::new(&args.labels), args.label_column.as_deref())?;
    logger.finish_progress()?;
    logger.log(&format!(
        "Loaded {} samples x {} features, {} labels",
        features.nrows(),
        features.ncols(),
        labels.len()
    ))?;

    let mut analyzer = SilhouetteAnalyzer::new(features, labels);
    let empty: Vec<usize> = analyzer
        .cluster_sizes()
        .iter()
        .enumerate()
        .filter(|&(_, &size)| size == 0)
        .map(|(cluster, _)| cluster)
        .collect();
    if !empty.is_empty() {
        logger.log(&format!(
            "Warning: cluster labels {:?} have no samples; their bands are left empty",
            empty
        ))?;
    }

    logger.log_and_progress("Computing silhouette scores...")?;
    let mean = match analyzer.compute_silhouette_score() {
        Ok(mean) => mean,
        Err(e) => {
            logger.finish_progress()?;
            logger.log(&format!("Silhouette computation failed: {}", e))?;
            return Err(e.into());
        }
    };
    logger.finish_progress()?;
    logger.log(&format!("Mean silhouette score: {:.6}", mean))?;

    println!("[Silhouette]");
    println!("    n_clusters: {}", analyzer.n_clusters());
    println!("    Mean silhouette score: {:.6}", mean);
    println!();

    if let Some(scores_path) = &args.scores {
        analyzer.write_sample_scores(Path::new(scores_path))?;
        logger.log(&format!("Per-sample scores written to {}", scores_path))?;
        println!("    Per-sample scores: {}", scores_path);
    }

    analyzer.plot_silhouette(Path::new(&args.output))?;
    logger.log(&format!("Figure written to {}", args.output))?;
    println!("    Figure: {}", args.output);

    let elapsed = format_time_used(start_time.elapsed());
    logger.log(&elapsed)?;
    println!("{}", elapsed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(features: &str, labels: &str, output: &str) -> SilhouetteArgs {
        SilhouetteArgs {
            features: features.to_string(),
            labels: labels.to_string(),
            label_column: None,
            output: output.to_string(),
            scores: None,
            log: None,
        }
    }

    #[test]
    fn validation_checks_paths_and_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let x = dir.path().join("x.csv");
        let y = dir.path().join("y.csv");
        std::fs::write(&x, "a,b\n").unwrap();
        std::fs::write(&y, "label\n").unwrap();
        let (x, y) = (x.to_string_lossy().into_owned(), y.to_string_lossy().into_owned());

        assert!(validate_silhouette_args(&args(&x, &y, "fig.png")).is_ok());
        assert!(validate_silhouette_args(&args(&x, &y, "fig.jpg")).is_err());
        assert!(validate_silhouette_args(&args(&x, "missing.csv", "fig.svg")).is_err());

        let mut with_scores = args(&x, &y, "fig.svg");
        with_scores.scores = Some("scores.tsv".to_string());
        assert!(validate_silhouette_args(&with_scores).is_err());
    }
}
