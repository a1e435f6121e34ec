use std::path::Path;

use plotters::coord::combinators::BindKeyPoints;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontStyle;

use crate::colormap::cluster_color;
use crate::error::{Error, Result};
use crate::silhouette::{SilhouetteAnalyzer, SilhouetteScores};

pub const FIGURE_SIZE: (u32, u32) = (1800, 700);

// Gap between stacked bands, and the margin below the first one.
const BAND_GAP: f64 = 10.0;

/// Labelled x positions of the silhouette panel.
pub const SILHOUETTE_TICKS: [f64; 7] = [-0.1, 0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

impl SilhouetteAnalyzer {
    /// Render the silhouette bands and the clustered scatter side by side.
    ///
    /// Writes SVG when `output` ends in `.svg`, PNG otherwise.
    pub fn plot_silhouette(&self, output: &Path) -> Result<()> {
        let scores = self.scores().ok_or(Error::NotScored)?;
        if self.features().ncols() < 2 {
            return Err(Error::InsufficientFeatures(self.features().ncols()));
        }

        let is_svg = output
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

        if is_svg {
            let root = SVGBackend::new(output, FIGURE_SIZE).into_drawing_area();
            draw_figure(self, scores, root)
        } else {
            let root = BitMapBackend::new(output, FIGURE_SIZE).into_drawing_area();
            draw_figure(self, scores, root)
        }
    }
}

fn draw_figure<DB: DrawingBackend>(
    analyzer: &SilhouetteAnalyzer,
    scores: &SilhouetteScores,
    root: DrawingArea<DB, Shift>,
) -> Result<()> {
    root.fill(&WHITE)?;
    let root = root.titled(
        &format!(
            "Silhouette analysis for clustering on sample data with n_clusters = {}",
            analyzer.n_clusters()
        ),
        ("sans-serif", 28).into_font().style(FontStyle::Bold),
    )?;

    let panels = root.split_evenly((1, 2));
    draw_silhouette_panel(analyzer, scores, &panels[0])?;
    draw_cluster_panel(analyzer, &panels[1])?;

    root.present()?;
    Ok(())
}

/// One cluster's stacked band in the silhouette panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SilhouetteBand {
    pub cluster: usize,
    pub y_lower: f64,
    /// Sorted ascending; one unit of height per sample.
    pub values: Vec<f64>,
}

impl SilhouetteBand {
    pub fn y_upper(&self) -> f64 {
        self.y_lower + self.values.len() as f64
    }

    fn label_y(&self) -> f64 {
        self.y_lower + 0.5 * self.values.len() as f64
    }
}

/// Band layout for clusters `0..n_clusters`, bottom to top.
///
/// The first band starts at 10 and each next band 10 above the previous one.
/// Empty clusters keep their slot with zero height.
pub fn silhouette_bands(analyzer: &SilhouetteAnalyzer) -> Result<Vec<SilhouetteBand>> {
    let mut bands = Vec::with_capacity(analyzer.n_clusters());
    let mut y_lower = BAND_GAP;
    for cluster in 0..analyzer.n_clusters() {
        let band = SilhouetteBand {
            cluster,
            y_lower,
            values: analyzer.sorted_cluster_scores(cluster)?,
        };
        y_lower = band.y_upper() + BAND_GAP;
        bands.push(band);
    }
    Ok(bands)
}

fn band_axis_max(analyzer: &SilhouetteAnalyzer) -> f64 {
    analyzer.labels().len() as f64 + (analyzer.n_clusters() as f64 + 1.0) * BAND_GAP
}

/// Left panel: one band of sorted coefficients per cluster, plus the mean line.
fn draw_silhouette_panel<DB: DrawingBackend>(
    analyzer: &SilhouetteAnalyzer,
    scores: &SilhouetteScores,
    area: &DrawingArea<DB, Shift>,
) -> Result<()> {
    let n_clusters = analyzer.n_clusters();
    let y_max = band_axis_max(analyzer);

    let mut chart = ChartBuilder::on(area)
        .caption("The silhouette plot for the various clusters.", ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(40)
        .build_cartesian_2d(
            (-1.0f64..1.0f64).with_key_points(SILHOUETTE_TICKS.to_vec()),
            0.0f64..y_max,
        )?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(SILHOUETTE_TICKS.len())
        .x_label_formatter(&|v| format!("{:.1}", v))
        .y_labels(0)
        .x_desc("The silhouette coefficient values")
        .y_desc("Cluster label")
        .draw()?;

    for band in silhouette_bands(analyzer)? {
        let color = cluster_color(band.cluster, n_clusters).mix(0.7);

        chart.draw_series(band.values.iter().enumerate().map(|(k, &v)| {
            let y = band.y_lower + k as f64;
            Rectangle::new([(0.0, y), (v, y + 1.0)], color.filled())
        }))?;

        chart.draw_series(std::iter::once(Text::new(
            band.cluster.to_string(),
            (-0.05, band.label_y()),
            ("sans-serif", 16).into_font(),
        )))?;
    }

    // Dashed vertical line at the mean score.
    let dash = y_max / 80.0;
    let mut dashes = Vec::new();
    let mut y = 0.0;
    while y < y_max {
        let end = (y + dash).min(y_max);
        dashes.push(PathElement::new(
            vec![(scores.mean, y), (scores.mean, end)],
            RED.stroke_width(2),
        ));
        y += 2.0 * dash;
    }
    chart.draw_series(dashes)?;

    Ok(())
}

/// Right panel: first two feature columns colored by cluster, with labelled centers.
fn draw_cluster_panel<DB: DrawingBackend>(
    analyzer: &SilhouetteAnalyzer,
    area: &DrawingArea<DB, Shift>,
) -> Result<()> {
    let features = analyzer.features();
    let n_clusters = analyzer.n_clusters();
    let xs = features.column(0);
    let ys = features.column(1);

    let (x_min, x_max) = padded_range(xs.iter().copied());
    let (y_min, y_max) = padded_range(ys.iter().copied());

    let mut chart = ChartBuilder::on(area)
        .caption("The visualization of the clustered data.", ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Feature space for the 1st feature")
        .y_desc("Feature space for the 2nd feature")
        .draw()?;

    chart.draw_series(
        xs.iter()
            .zip(ys.iter())
            .zip(analyzer.labels().iter())
            .filter(|((x, y), _)| x.is_finite() && y.is_finite())
            .map(|((&x, &y), &label)| {
                Circle::new(
                    (x, y),
                    3,
                    cluster_color(label, n_clusters).mix(0.7).filled(),
                )
            }),
    )?;

    // Empty clusters have no center and get no marker.
    for (cluster, center) in analyzer.cluster_centers_2d().into_iter().enumerate() {
        let Some((cx, cy)) = center else {
            continue;
        };
        if !(cx.is_finite() && cy.is_finite()) {
            continue;
        }
        chart.draw_series(std::iter::once(
            EmptyElement::at((cx, cy))
                + Circle::new((0, 0), 12, WHITE.filled())
                + Circle::new((0, 0), 12, BLACK.stroke_width(1))
                + Text::new(cluster.to_string(), (-5, -7), ("sans-serif", 14).into_font()),
        ))?;
    }

    Ok(())
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn analyzer() -> SilhouetteAnalyzer {
        let x = array![
            [0.0, 0.0],
            [0.3, 0.1],
            [0.1, 0.4],
            [8.0, 8.0],
            [8.2, 7.9],
            [7.8, 8.3],
        ];
        SilhouetteAnalyzer::new(x, vec![0, 0, 0, 2, 2, 2])
    }

    #[test]
    fn plot_requires_scores() {
        let dir = tempfile::tempdir().unwrap();
        let err = analyzer()
            .plot_silhouette(&dir.path().join("plot.svg"))
            .unwrap_err();
        assert!(matches!(err, Error::NotScored));
        assert!(!dir.path().join("plot.svg").exists());
    }

    #[test]
    fn plot_requires_two_features() {
        let mut a = SilhouetteAnalyzer::new(array![[0.0], [0.1], [5.0], [5.1]], vec![0, 0, 1, 1]);
        a.compute_silhouette_score().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = a.plot_silhouette(&dir.path().join("plot.svg")).unwrap_err();
        assert!(matches!(err, Error::InsufficientFeatures(1)));
    }

    #[test]
    fn bands_stack_with_gaps() {
        let mut a = analyzer();
        a.compute_silhouette_score().unwrap();
        let bands = silhouette_bands(&a).unwrap();

        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].y_lower, 10.0);
        assert_eq!(bands[0].y_upper(), 13.0);
        // Cluster 1 has no members: zero height, still followed by a gap.
        assert_eq!(bands[1].y_lower, 23.0);
        assert!(bands[1].values.is_empty());
        assert_eq!(bands[2].y_lower, 33.0);
        assert_eq!(bands[2].y_upper(), 36.0);
        assert!(bands[2].y_upper() < band_axis_max(&a));
        assert!(bands
            .iter()
            .all(|b| b.values.windows(2).all(|w| w[0] <= w[1])));
    }

    #[test]
    fn bands_require_scores() {
        assert!(matches!(silhouette_bands(&analyzer()), Err(Error::NotScored)));
    }

    #[test]
    fn renders_svg_with_empty_cluster() {
        let mut a = analyzer();
        a.compute_silhouette_score().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plot.svg");
        a.plot_silhouette(&out).unwrap();
        assert!(out.is_file());

        let svg = std::fs::read_to_string(&out).unwrap();
        assert!(svg.contains("n_clusters = 3"));
        assert!(svg.contains("The visualization of the clustered data."));
        assert!(svg.contains("-0.1"));
    }

    #[test]
    fn renders_png() {
        let mut a = analyzer();
        a.compute_silhouette_score().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plot.png");
        a.plot_silhouette(&out).unwrap();
        assert!(std::fs::metadata(&out).unwrap().len() > 0);
    }

    #[test]
    fn plotting_is_repeatable() {
        let mut a = analyzer();
        a.compute_silhouette_score().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.svg");
        let second = dir.path().join("b.svg");
        a.plot_silhouette(&first).unwrap();
        a.plot_silhouette(&second).unwrap();
        assert_eq!(
            std::fs::read_to_string(first).unwrap(),
            std::fs::read_to_string(second).unwrap()
        );
    }

    #[test]
    fn padded_range_handles_constant_and_empty() {
        assert_eq!(padded_range([2.0, 2.0].into_iter()), (1.0, 3.0));
        assert_eq!(padded_range(std::iter::empty()), (-1.0, 1.0));
        let (lo, hi) = padded_range([0.0, 10.0, f64::NAN].into_iter());
        assert!((lo + 0.5).abs() < 1e-12 && (hi - 10.5).abs() < 1e-12);
    }
}
