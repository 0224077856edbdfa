//! Biquad coefficient derivation per the RBJ Audio EQ Cookbook.
//!
//! Coefficients are only ever used to render response curves and to feed the
//! fixed-point wire codec; audio is never filtered in software.

use crate::eq::FilterType;
use std::f64::consts::PI;

/// Normalized biquad coefficients (a0 already divided out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

/// Audio EQ Cookbook design for peaking and shelf filters.
///
/// Callers are responsible for the parameter domain; in particular `q`
/// must be nonzero.
pub fn compute_coefficients(
    freq: f64,
    gain: f64,
    q: f64,
    filter_type: FilterType,
    sample_rate: f64,
) -> BiquadCoefficients {
    let w0 = 2.0 * PI * freq / sample_rate;
    let cos_w0 = w0.cos();
    let sin_w0 = w0.sin();
    // A = 10^(gain/40) = sqrt(10^(gain/20))
    let a = 10f64.powf(gain / 40.0);
    let alpha = sin_w0 / (2.0 * q);

    let (b0, b1, b2, a0, a1, a2) = match filter_type {
        FilterType::Peaking => (
            1.0 + alpha * a,
            -2.0 * cos_w0,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w0,
            1.0 - alpha / a,
        ),
        FilterType::LowShelf => {
            let sqrt_a = a.sqrt();
            let two_sqrt_a_alpha = 2.0 * sqrt_a * alpha;
            (
                a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
            )
        }
        FilterType::HighShelf => {
            let sqrt_a = a.sqrt();
            let two_sqrt_a_alpha = 2.0 * sqrt_a * alpha;
            (
                a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
            )
        }
    };

    BiquadCoefficients {
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
        a1: a1 / a0,
        a2: a2 / a0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::response::evaluate_at;
    use crate::eq::SAMPLE_RATE;

    #[test]
    fn peaking_hits_nominal_gain_at_center() {
        for gain in [-10.0, -3.0, 2.5, 6.0, 10.0] {
            let coeffs =
                compute_coefficients(1000.0, gain, 1.41, FilterType::Peaking, SAMPLE_RATE);
            let db = evaluate_at(&coeffs, 1000.0, SAMPLE_RATE);
            assert!(
                (db - gain).abs() < 0.05,
                "peak at center: expected {gain} dB, got {db} dB"
            );
        }
    }

    #[test]
    fn zero_gain_is_flat_for_all_types() {
        for filter_type in [
            FilterType::Peaking,
            FilterType::LowShelf,
            FilterType::HighShelf,
        ] {
            let coeffs = compute_coefficients(500.0, 0.0, 1.0, filter_type, SAMPLE_RATE);
            for freq in [20.0, 100.0, 500.0, 2000.0, 20000.0] {
                let db = evaluate_at(&coeffs, freq, SAMPLE_RATE);
                assert!(db.abs() < 1e-9, "{filter_type:?} at {freq} Hz: {db} dB");
            }
        }
    }

    #[test]
    fn low_shelf_boosts_below_corner() {
        let coeffs = compute_coefficients(200.0, 6.0, 0.71, FilterType::LowShelf, SAMPLE_RATE);
        let low = evaluate_at(&coeffs, 20.0, SAMPLE_RATE);
        let high = evaluate_at(&coeffs, 10000.0, SAMPLE_RATE);
        assert!((low - 6.0).abs() < 0.1, "shelf floor: {low} dB");
        assert!(high.abs() < 0.1, "above corner: {high} dB");
    }

    #[test]
    fn high_shelf_mirrors_low_shelf() {
        let coeffs = compute_coefficients(5000.0, -4.0, 0.71, FilterType::HighShelf, SAMPLE_RATE);
        let low = evaluate_at(&coeffs, 50.0, SAMPLE_RATE);
        let high = evaluate_at(&coeffs, 20000.0, SAMPLE_RATE);
        assert!(low.abs() < 0.1, "below corner: {low} dB");
        assert!((high - -4.0).abs() < 0.1, "shelf ceiling: {high} dB");
    }

    #[test]
    fn narrow_q_narrows_the_peak() {
        let wide = compute_coefficients(1000.0, 6.0, 0.5, FilterType::Peaking, SAMPLE_RATE);
        let narrow = compute_coefficients(1000.0, 6.0, 10.0, FilterType::Peaking, SAMPLE_RATE);
        // One octave off-center the narrow filter should have fallen off far more.
        let wide_off = evaluate_at(&wide, 2000.0, SAMPLE_RATE);
        let narrow_off = evaluate_at(&narrow, 2000.0, SAMPLE_RATE);
        assert!(narrow_off < wide_off);
        assert!(narrow_off < 0.5);
    }
}
