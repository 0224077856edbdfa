//! Import and export of EQ profiles in the formats the community uses:
//! AutoEQ / EqualizerAPO text, Peace-style CSV, and JSON presets.
//!
//! Every parser clamps the result to the hardware domain and always yields
//! exactly 10 bands (missing bands are padded with zero-gain defaults).

use serde::Deserialize;

use super::presets::EqPreset;
use super::{sanitize_bands, sanitize_preamp, Band, FilterType, NUM_BANDS};

fn map_filter_type(raw: &str) -> FilterType {
    match raw.to_ascii_uppercase().as_str() {
        "LSC" | "LSQ" | "LS" | "LOW" | "LOWSHELF" => FilterType::LowShelf,
        "HSC" | "HSQ" | "HS" | "HIGH" | "HIGHSHELF" => FilterType::HighShelf,
        _ => FilterType::Peaking,
    }
}

fn wire_name(filter_type: FilterType) -> &'static str {
    match filter_type {
        FilterType::Peaking => "PK",
        FilterType::LowShelf => "LSC",
        FilterType::HighShelf => "HSC",
    }
}

/// `Filter 1: ON PK Fc 105 Hz Gain 1.0 dB Q 0.70`
///
/// The ON/OFF marker is optional and ignored (AutoEQ emits only enabled
/// filters); unknown type names fall back to peaking.
fn parse_filter_line(line: &str) -> Option<Band> {
    let mut tokens = line.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("Filter") {
        return None;
    }
    let ordinal = tokens.next()?;
    let digits = ordinal.strip_suffix(':').unwrap_or(ordinal);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut token = tokens.next()?;
    if token.eq_ignore_ascii_case("ON") || token.eq_ignore_ascii_case("OFF") {
        token = tokens.next()?;
    }
    let filter_type = map_filter_type(token);

    if !tokens.next()?.eq_ignore_ascii_case("Fc") {
        return None;
    }
    let freq: f64 = tokens.next()?.parse().ok()?;
    if !tokens.next()?.eq_ignore_ascii_case("Hz") {
        return None;
    }
    if !tokens.next()?.eq_ignore_ascii_case("Gain") {
        return None;
    }
    let gain: f64 = tokens.next()?.parse().ok()?;
    if !tokens.next()?.eq_ignore_ascii_case("dB") {
        return None;
    }
    if !tokens.next()?.eq_ignore_ascii_case("Q") {
        return None;
    }
    let q: f64 = tokens.next()?.parse().ok()?;

    let band = Band {
        freq: freq.round() as u32,
        gain,
        q,
        filter_type,
        enabled: true,
    };
    Some(band.sanitized())
}

/// `Preamp: -6.2 dB`, also accepted without the colon or unit.
fn parse_preamp_line(line: &str) -> Option<f64> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    let first = first.strip_suffix(':').unwrap_or(first);
    if !first.eq_ignore_ascii_case("Preamp") {
        return None;
    }
    tokens.next()?.parse().ok()
}

/// Parse AutoEQ / EqualizerAPO format.
pub fn parse_auto_eq(text: &str) -> (Vec<Band>, f64) {
    let mut bands = Vec::new();
    let mut preamp = 0.0;

    for line in text.lines() {
        let line = line.trim();
        if let Some(value) = parse_preamp_line(line) {
            preamp = value;
        } else if let Some(band) = parse_filter_line(line) {
            bands.push(band);
        }
    }

    (sanitize_bands(&bands).to_vec(), sanitize_preamp(preamp))
}

/// Parse Peace-style CSV: `freq,gain,q[,type]` per line (`;` and tabs also
/// separate), `#`/`//` comments, optional `preamp:` lines.
pub fn parse_csv(text: &str) -> (Vec<Band>, f64) {
    let mut bands = Vec::new();
    let mut preamp = 0.0;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c| c == ',' || c == ';' || c == '\t')
            .map(str::trim)
            .collect();
        if fields.len() >= 3 {
            let parsed = (
                fields[0].parse::<f64>(),
                fields[1].parse::<f64>(),
                fields[2].parse::<f64>(),
            );
            if let (Ok(freq), Ok(gain), Ok(q)) = parsed {
                let filter_type = fields
                    .get(3)
                    .map(|t| map_filter_type(t))
                    .unwrap_or(FilterType::Peaking);
                bands.push(
                    Band {
                        freq: freq.round() as u32,
                        gain,
                        q,
                        filter_type,
                        enabled: true,
                    }
                    .sanitized(),
                );
                continue;
            }
        }

        if let Some(value) = parse_preamp_line(line) {
            preamp = value;
        }
    }

    (sanitize_bands(&bands).to_vec(), sanitize_preamp(preamp))
}

#[derive(Deserialize)]
struct RawPreset {
    #[serde(default = "default_import_name")]
    name: String,
    bands: Vec<Band>,
    #[serde(default)]
    preamp: f64,
}

fn default_import_name() -> String {
    "Imported Preset".into()
}

/// Import a JSON preset, sanitizing every value it carries.
pub fn parse_json(text: &str) -> Result<EqPreset, serde_json::Error> {
    let raw: RawPreset = serde_json::from_str(text)?;
    Ok(EqPreset {
        name: raw.name,
        bands: raw.bands,
        preamp: raw.preamp,
    }
    .sanitized())
}

/// Export as AutoEQ / EqualizerAPO text. Disabled bands are omitted; the
/// preamp line only appears when nonzero.
pub fn export_auto_eq(bands: &[Band], preamp: f64) -> String {
    let mut lines = Vec::new();
    if preamp != 0.0 {
        lines.push(format!("Preamp: {preamp:.1} dB"));
    }
    for (i, band) in bands.iter().enumerate() {
        if !band.enabled {
            continue;
        }
        lines.push(format!(
            "Filter {}: ON {} Fc {} Hz Gain {:.1} dB Q {:.2}",
            i + 1,
            wire_name(band.filter_type),
            band.freq,
            band.gain,
            band.q,
        ));
    }
    lines.join("\n")
}

pub fn export_json(preset: &EqPreset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(preset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::{MAX_GAIN, MIN_Q};

    const AUTOEQ_SAMPLE: &str = "\
Preamp: -6.2 dB
Filter 1: ON PK Fc 65 Hz Gain 5.8 dB Q 0.76
Filter 2: ON LSC Fc 105 Hz Gain -3.2 dB Q 0.71
Filter 3: PK Fc 200 Hz Gain 2.0 dB Q 1.41
Filter 4: OFF HSC Fc 9000 Hz Gain -1.0 dB Q 2.00";

    #[test]
    fn parses_autoeq_text() {
        let (bands, preamp) = parse_auto_eq(AUTOEQ_SAMPLE);
        assert_eq!(bands.len(), NUM_BANDS);
        assert_eq!(preamp, -6.2);
        assert_eq!(bands[0].freq, 65);
        assert_eq!(bands[0].gain, 5.8);
        assert_eq!(bands[1].filter_type, FilterType::LowShelf);
        assert_eq!(bands[2].gain, 2.0);
        assert_eq!(bands[3].filter_type, FilterType::HighShelf);
        // Padded slots are flat.
        assert_eq!(bands[4].gain, 0.0);
    }

    #[test]
    fn autoeq_values_are_clamped() {
        let text = "Filter 1: ON PK Fc 50 Hz Gain 22.0 dB Q 0.01";
        let (bands, _) = parse_auto_eq(text);
        assert_eq!(bands[0].gain, MAX_GAIN);
        assert_eq!(bands[0].q, MIN_Q);
    }

    #[test]
    fn unknown_type_falls_back_to_peaking() {
        let text = "Filter 1: ON BP Fc 500 Hz Gain 1.0 dB Q 1.00";
        let (bands, _) = parse_auto_eq(text);
        assert_eq!(bands[0].filter_type, FilterType::Peaking);
    }

    #[test]
    fn malformed_filter_lines_are_skipped() {
        let text = "Filter one: PK Fc x Hz\nFilter 1: ON PK Fc 100 Hz Gain 1.0 dB Q 1.00";
        let (bands, _) = parse_auto_eq(text);
        assert_eq!(bands[0].freq, 100);
        assert_eq!(bands[1].gain, 0.0);
    }

    #[test]
    fn parses_csv_with_comments_and_preamp() {
        let text = "\
# headphone profile
100, 3.5, 1.41
250; -2.0; 0.71; LSQ
1000\t1.0\t2.0\tHSQ
preamp: -3.0";
        let (bands, preamp) = parse_csv(text);
        assert_eq!(preamp, -3.0);
        assert_eq!(bands[0].freq, 100);
        assert_eq!(bands[1].filter_type, FilterType::LowShelf);
        assert_eq!(bands[2].filter_type, FilterType::HighShelf);
    }

    #[test]
    fn json_round_trip() {
        let (bands, preamp) = parse_auto_eq(AUTOEQ_SAMPLE);
        let preset = EqPreset {
            name: "Test".into(),
            bands,
            preamp,
        };
        let json = export_json(&preset).unwrap();
        let back = parse_json(&json).unwrap();
        assert_eq!(back.name, "Test");
        assert_eq!(back.preamp, preset.preamp);
        assert_eq!(back.bands, preset.bands);
    }

    #[test]
    fn json_import_defaults_missing_fields() {
        let json = r#"{"bands": [{"freq": 100, "gain": 2.0, "q": 1.0, "type": "PK", "enabled": true}]}"#;
        let preset = parse_json(json).unwrap();
        assert_eq!(preset.name, "Imported Preset");
        assert_eq!(preset.preamp, 0.0);
        assert_eq!(preset.bands.len(), NUM_BANDS);
    }

    #[test]
    fn autoeq_export_round_trips() {
        let (bands, preamp) = parse_auto_eq(AUTOEQ_SAMPLE);
        let text = export_auto_eq(&bands, preamp);
        let (back, back_preamp) = parse_auto_eq(&text);
        assert_eq!(back_preamp, preamp);
        assert_eq!(back, bands);
    }

    #[test]
    fn export_omits_disabled_bands_and_zero_preamp() {
        let mut bands = vec![Band::new(100, 2.0, 1.0, FilterType::Peaking)];
        bands[0].enabled = false;
        let text = export_auto_eq(&bands, 0.0);
        assert!(text.is_empty());
    }
}
