use plotters::style::RGBColor;

// Control points of the "nipy_spectral" map, evenly spaced on [0, 1] in steps of 0.05.
const NIPY_SPECTRAL: [(f64, f64, f64); 21] = [
    (0.0, 0.0, 0.0),
    (0.4667, 0.0, 0.5333),
    (0.5333, 0.0, 0.6),
    (0.0, 0.0, 0.6667),
    (0.0, 0.0, 0.8667),
    (0.0, 0.4667, 0.8667),
    (0.0, 0.6, 0.8667),
    (0.0, 0.6667, 0.6667),
    (0.0, 0.6667, 0.5333),
    (0.0, 0.6, 0.0),
    (0.0, 0.7333, 0.0),
    (0.0, 0.8667, 0.0),
    (0.0, 1.0, 0.0),
    (0.7333, 1.0, 0.0),
    (0.9333, 0.9333, 0.0),
    (1.0, 0.8, 0.0),
    (1.0, 0.6, 0.0),
    (1.0, 0.0, 0.0),
    (0.8667, 0.0, 0.0),
    (0.8, 0.0, 0.0),
    (0.8, 0.8, 0.8),
];

/// Map `value` in [0, 1] onto the nipy_spectral colormap.
///
/// Out-of-range values clamp to the ends; NaN maps to black.
pub fn nipy_spectral(value: f64) -> RGBColor {
    if value.is_nan() {
        return RGBColor(0, 0, 0);
    }
    let last = NIPY_SPECTRAL.len() - 1;
    let pos = value.clamp(0.0, 1.0) * last as f64;
    let lo = (pos.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let t = pos - lo as f64;

    let (r0, g0, b0) = NIPY_SPECTRAL[lo];
    let (r1, g1, b1) = NIPY_SPECTRAL[hi];
    RGBColor(
        channel(r0 + (r1 - r0) * t),
        channel(g0 + (g1 - g0) * t),
        channel(b0 + (b1 - b0) * t),
    )
}

/// Color of cluster `index` out of `n_clusters`, as used by both silhouette panels.
pub fn cluster_color(index: usize, n_clusters: usize) -> RGBColor {
    if n_clusters == 0 {
        return nipy_spectral(0.0);
    }
    nipy_spectral(index as f64 / n_clusters as f64)
}

#[inline]
fn channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
