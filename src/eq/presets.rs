use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{default_bands, sanitize_bands, sanitize_preamp, Band, NUM_BANDS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EqPreset {
    pub name: String,
    pub bands: Vec<Band>,
    #[serde(default)]
    pub preamp: f64,
}

impl EqPreset {
    /// Clamp everything to the hardware domain and force exactly 10 bands.
    pub fn sanitized(&self) -> EqPreset {
        EqPreset {
            name: self.name.chars().take(100).collect(),
            bands: sanitize_bands(&self.bands).to_vec(),
            preamp: sanitize_preamp(self.preamp),
        }
    }
}

fn preset_from_gains(name: &str, gains: [f64; NUM_BANDS]) -> EqPreset {
    let mut bands = default_bands();
    for (band, gain) in bands.iter_mut().zip(gains) {
        band.gain = gain;
    }
    EqPreset {
        name: name.into(),
        bands: bands.to_vec(),
        preamp: 0.0,
    }
}

pub fn builtin_presets() -> Vec<EqPreset> {
    vec![
        preset_from_gains("Flat", [0.0; NUM_BANDS]),
        preset_from_gains(
            "Bass Boost",
            [6.0, 5.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ),
        preset_from_gains(
            "Treble Boost",
            [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 4.0, 5.0, 6.0],
        ),
        preset_from_gains(
            "V-Shape",
            [5.0, 4.0, 2.0, 0.0, -2.0, -2.0, 0.0, 2.0, 4.0, 5.0],
        ),
        preset_from_gains(
            "Vocal",
            [-2.0, -1.0, 0.0, 2.0, 4.0, 4.0, 3.0, 1.0, 0.0, -1.0],
        ),
    ]
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crin_eq")
}

fn presets_path() -> PathBuf {
    config_dir().join("eq_presets.json")
}

pub fn load_user_presets() -> Vec<EqPreset> {
    let path = presets_path();
    if !path.exists() {
        return Vec::new();
    }
    match std::fs::read_to_string(&path) {
        Ok(data) => serde_json::from_str::<Vec<EqPreset>>(&data)
            .map(|presets| presets.iter().map(EqPreset::sanitized).collect())
            .unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

pub fn save_user_presets(presets: &[EqPreset]) -> std::io::Result<()> {
    let path = presets_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(presets)?;
    std::fs::write(&path, data)
}

/// Returns all presets: builtins + user presets.
/// User presets with matching names override builtins.
pub fn all_presets() -> Vec<EqPreset> {
    let mut presets = builtin_presets();
    let user = load_user_presets();
    for up in user {
        if let Some(existing) = presets.iter_mut().find(|p| p.name == up.name) {
            *existing = up;
        } else {
            presets.push(up);
        }
    }
    presets
}

pub fn is_builtin(name: &str) -> bool {
    builtin_presets().iter().any(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_have_full_band_sets() {
        let presets = builtin_presets();
        assert!(presets.len() >= 5);
        for preset in &presets {
            assert_eq!(preset.bands.len(), NUM_BANDS);
        }
    }

    #[test]
    fn flat_preset_is_flat() {
        let flat = builtin_presets().into_iter().find(|p| p.name == "Flat").unwrap();
        assert!(flat.bands.iter().all(|b| b.gain == 0.0));
        assert_eq!(flat.preamp, 0.0);
    }

    #[test]
    fn sanitized_preset_is_exactly_ten_bands() {
        let preset = EqPreset {
            name: "x".repeat(200),
            bands: vec![Band::new(100, 99.0, 1.0, crate::eq::FilterType::Peaking)],
            preamp: -99.0,
        };
        let clean = preset.sanitized();
        assert_eq!(clean.bands.len(), NUM_BANDS);
        assert_eq!(clean.name.len(), 100);
        assert_eq!(clean.bands[0].gain, crate::eq::MAX_GAIN);
        assert_eq!(clean.preamp, crate::eq::MIN_PREAMP);
    }
}
