//! Silhouette coefficients for a hard clustering.
//!
//! For sample `i` in cluster `C`:
//!
//! ```text
//! a(i) = mean distance from i to the other members of C
//! b(i) = min over other clusters D of the mean distance from i to D
//! s(i) = (b(i) - a(i)) / max(a(i), b(i))
//! ```
//!
//! Samples alone in their cluster score 0. Distances are Euclidean.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

use crate::error::{Error, Result};

#[inline]
fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn check_inputs(features: &Array2<f64>, labels: &[usize]) -> Result<usize> {
    let n_samples = features.nrows();
    if n_samples != labels.len() {
        return Err(Error::DimensionMismatch {
            n_samples,
            n_labels: labels.len(),
        });
    }
    if n_samples == 0 {
        return Err(Error::EmptyInput("feature matrix has no rows"));
    }
    if let Some(((row, column), _)) = features.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(Error::NonFiniteFeature { row, column });
    }
    let n_labels = labels.iter().collect::<BTreeSet<_>>().len();
    if n_labels < 2 || n_labels > n_samples - 1 {
        return Err(Error::InvalidLabelCount { n_labels, n_samples });
    }
    Ok(labels.iter().copied().max().map_or(0, |m| m + 1))
}

/// Per-sample silhouette coefficients, in input order.
pub fn silhouette_samples(features: &Array2<f64>, labels: &[usize]) -> Result<Vec<f64>> {
    let n_clusters = check_inputs(features, labels)?;

    let mut sizes = vec![0usize; n_clusters];
    for &l in labels {
        sizes[l] += 1;
    }

    let scores = (0..features.nrows())
        .into_par_iter()
        .map(|i| {
            let own = labels[i];
            if sizes[own] <= 1 {
                return 0.0;
            }

            let row = features.row(i);
            let mut dist_sums = vec![0.0f64; n_clusters];
            for (j, other) in features.rows().into_iter().enumerate() {
                if i != j {
                    dist_sums[labels[j]] += euclidean(row, other);
                }
            }

            let a = dist_sums[own] / (sizes[own] - 1) as f64;
            let b = dist_sums
                .iter()
                .zip(sizes.iter())
                .enumerate()
                .filter(|&(c, (_, &size))| c != own && size > 0)
                .map(|(_, (&sum, &size))| sum / size as f64)
                .fold(f64::INFINITY, f64::min);

            let denom = a.max(b);
            if denom > 0.0 {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .collect();

    Ok(scores)
}

/// Mean silhouette coefficient over all samples.
pub fn silhouette_score(features: &Array2<f64>, labels: &[usize]) -> Result<f64> {
    let samples = silhouette_samples(features, labels)?;
    Ok(mean(&samples))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computed silhouette values.
#[derive(Debug, Clone, PartialEq)]
pub struct SilhouetteScores {
    pub mean: f64,
    pub samples: Vec<f64>,
}

/// Whether the analyzer holds scores yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SilhouetteState {
    #[default]
    Unscored,
    Scored(SilhouetteScores),
}

/// Feature matrix and labels, plus the scores once computed.
///
/// Plotting lives in [`crate::silhouette_plot`] and only works from
/// [`SilhouetteState::Scored`].
#[derive(Debug, Clone)]
pub struct SilhouetteAnalyzer {
    features: Array2<f64>,
    labels: Vec<usize>,
    n_clusters: usize,
    state: SilhouetteState,
}

impl SilhouetteAnalyzer {
    pub fn new(features: Array2<f64>, labels: Vec<usize>) -> Self {
        let n_clusters = labels.iter().copied().max().map_or(0, |m| m + 1);
        Self {
            features,
            labels,
            n_clusters,
            state: SilhouetteState::Unscored,
        }
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// `max(label) + 1`; labels missing from that range are empty clusters.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn state(&self) -> &SilhouetteState {
        &self.state
    }

    pub fn scores(&self) -> Option<&SilhouetteScores> {
        match &self.state {
            SilhouetteState::Scored(scores) => Some(scores),
            SilhouetteState::Unscored => None,
        }
    }

    /// Number of samples in each cluster `0..n_clusters`.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.n_clusters];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }

    /// Compute per-sample coefficients and their mean, replacing any previous result.
    ///
    /// On error the previous state is kept.
    pub fn compute_silhouette_score(&mut self) -> Result<f64> {
        let samples = silhouette_samples(&self.features, &self.labels)?;
        let mean = mean(&samples);
        self.state = SilhouetteState::Scored(SilhouetteScores { mean, samples });
        Ok(mean)
    }

    /// Per-sample values of cluster `cluster`, sorted ascending.
    pub fn sorted_cluster_scores(&self, cluster: usize) -> Result<Vec<f64>> {
        let scores = self.scores().ok_or(Error::NotScored)?;
        let mut values: Vec<f64> = self
            .labels
            .iter()
            .zip(scores.samples.iter())
            .filter(|(l, _)| **l == cluster)
            .map(|(_, &s)| s)
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        Ok(values)
    }

    /// Mean position of each cluster in the first two feature dimensions.
    ///
    /// Empty clusters yield `None`.
    pub fn cluster_centers_2d(&self) -> Vec<Option<(f64, f64)>> {
        let mut sums = vec![(0.0f64, 0.0f64, 0usize); self.n_clusters];
        if self.features.ncols() < 2 {
            return vec![None; self.n_clusters];
        }
        for (row, &l) in self.features.rows().into_iter().zip(self.labels.iter()) {
            let entry = &mut sums[l];
            entry.0 += row[0];
            entry.1 += row[1];
            entry.2 += 1;
        }
        sums.into_iter()
            .map(|(x, y, n)| (n > 0).then(|| (x / n as f64, y / n as f64)))
            .collect()
    }

    /// Write `sample,label,silhouette` rows for every sample.
    pub fn write_sample_scores(&self, path: &Path) -> Result<()> {
        let scores = self.scores().ok_or(Error::NotScored)?;
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "sample,label,silhouette")?;
        for (i, (label, score)) in self.labels.iter().zip(scores.samples.iter()).enumerate() {
            writeln!(writer, "{},{},{:.6}", i, label, score)?;
        }
        writer.flush()?;
        Ok(())
    }
}
