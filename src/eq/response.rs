//! Frequency response curves for plotting.
//!
//! Per-band curves come from evaluating the biquad transfer function on a
//! log-spaced grid; the composite curve sums the per-band dB values, the
//! same log-domain cascade model the hardware uses.

use crate::eq::biquad::{compute_coefficients, BiquadCoefficients};
use crate::eq::{Band, MAX_FREQ, MIN_FREQ, SAMPLE_RATE};
use std::sync::OnceLock;

/// Resolution of the plotted curves.
pub const NUM_POINTS: usize = 300;

/// Magnitude in dB of the transfer function at one frequency.
///
/// Evaluates H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)
/// at z = e^{jw}, w = 2 pi f / fs. Degenerate coefficients (zero
/// denominator) yield 0 dB so curve rendering never fails.
pub fn evaluate_at(coeffs: &BiquadCoefficients, freq: f64, sample_rate: f64) -> f64 {
    let w = 2.0 * std::f64::consts::PI * freq / sample_rate;
    let (cos_w, sin_w) = (w.cos(), w.sin());
    let (cos_2w, sin_2w) = ((2.0 * w).cos(), (2.0 * w).sin());

    let num_re = coeffs.b0 + coeffs.b1 * cos_w + coeffs.b2 * cos_2w;
    let num_im = -(coeffs.b1 * sin_w + coeffs.b2 * sin_2w);
    let den_re = 1.0 + coeffs.a1 * cos_w + coeffs.a2 * cos_2w;
    let den_im = -(coeffs.a1 * sin_w + coeffs.a2 * sin_2w);

    let num_mag_sq = num_re * num_re + num_im * num_im;
    let den_mag_sq = den_re * den_re + den_im * den_im;

    if den_mag_sq == 0.0 {
        return 0.0;
    }

    10.0 * (num_mag_sq / den_mag_sq).log10()
}

fn log_space(start: f64, end: f64, count: usize) -> Vec<f64> {
    let log_start = start.log10();
    let step = (end.log10() - log_start) / (count - 1) as f64;
    (0..count)
        .map(|i| 10f64.powf(log_start + i as f64 * step))
        .collect()
}

/// The shared log-spaced frequency grid over the audible range.
pub fn frequency_points() -> &'static [f64] {
    static POINTS: OnceLock<Vec<f64>> = OnceLock::new();
    POINTS.get_or_init(|| log_space(MIN_FREQ as f64, MAX_FREQ as f64, NUM_POINTS))
}

/// Response curve of a single band across the grid.
///
/// Disabled and zero-gain bands short-circuit to a flat curve without
/// touching the transfer function.
pub fn band_response(band: &Band) -> Vec<f64> {
    if !band.enabled || band.gain == 0.0 {
        return vec![0.0; NUM_POINTS];
    }
    let coeffs = compute_coefficients(
        band.freq as f64,
        band.gain,
        band.q,
        band.filter_type,
        SAMPLE_RATE,
    );
    frequency_points()
        .iter()
        .map(|&f| evaluate_at(&coeffs, f, SAMPLE_RATE))
        .collect()
}

/// Composite curve: per-band dB contributions summed sample-by-sample.
pub fn composite_response(bands: &[Band]) -> Vec<f64> {
    let mut composite = vec![0.0; NUM_POINTS];
    for band in bands {
        if !band.enabled || band.gain == 0.0 {
            continue;
        }
        let coeffs = compute_coefficients(
            band.freq as f64,
            band.gain,
            band.q,
            band.filter_type,
            SAMPLE_RATE,
        );
        for (sum, &f) in composite.iter_mut().zip(frequency_points()) {
            *sum += evaluate_at(&coeffs, f, SAMPLE_RATE);
        }
    }
    composite
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::FilterType;

    #[test]
    fn grid_is_log_spaced_over_audible_range() {
        let points = frequency_points();
        assert_eq!(points.len(), NUM_POINTS);
        assert!((points[0] - 20.0).abs() < 1e-9);
        assert!((points[NUM_POINTS - 1] - 20000.0).abs() < 1e-6);
        // Log spacing: constant ratio between neighbors.
        let ratio = points[1] / points[0];
        let late_ratio = points[200] / points[199];
        assert!((ratio - late_ratio).abs() < 1e-9);
    }

    #[test]
    fn scenario_1khz_6db_peak() {
        let coeffs =
            compute_coefficients(1000.0, 6.0, 1.41, FilterType::Peaking, SAMPLE_RATE);
        let db = evaluate_at(&coeffs, 1000.0, SAMPLE_RATE);
        assert!((db - 6.0).abs() < 0.05, "got {db} dB");
    }

    #[test]
    fn disabled_band_yields_flat_curve() {
        let mut band = Band::new(1000, 6.0, 1.41, FilterType::Peaking);
        band.enabled = false;
        let curve = band_response(&band);
        assert_eq!(curve.len(), NUM_POINTS);
        assert!(curve.iter().all(|&db| db == 0.0));
    }

    #[test]
    fn zero_gain_band_yields_flat_curve() {
        let band = Band::new(1000, 0.0, 1.41, FilterType::Peaking);
        assert!(band_response(&band).iter().all(|&db| db == 0.0));
    }

    #[test]
    fn degenerate_coefficients_fall_back_to_zero() {
        let coeffs = BiquadCoefficients {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: -1.0,
            a2: 0.0,
        };
        // At f = 0 the denominator 1 + a1 + a2 vanishes.
        assert_eq!(evaluate_at(&coeffs, 0.0, SAMPLE_RATE), 0.0);
    }

    #[test]
    fn composite_of_identical_bands_is_additive() {
        let band = Band::new(1000, 4.0, 1.41, FilterType::Peaking);
        let single = band_response(&band);
        let double = composite_response(&[band, band]);
        for (s, d) in single.iter().zip(double.iter()) {
            assert!((d - 2.0 * s).abs() < 1e-12);
        }
    }

    #[test]
    fn composite_skips_disabled_bands() {
        let active = Band::new(1000, 4.0, 1.41, FilterType::Peaking);
        let mut muted = Band::new(200, 8.0, 1.41, FilterType::Peaking);
        muted.enabled = false;
        let composite = composite_response(&[active, muted]);
        let single = band_response(&active);
        assert_eq!(composite, single);
    }
}
