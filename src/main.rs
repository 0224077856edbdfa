use clap::{Arg, ArgAction, Command};

use crin_eq::device::connect_compatible_device;
use crin_eq::device::session::DeviceEq;
use crin_eq::eq::{sanitize_bands, sanitize_preamp, FilterType, MAX_GAIN, MIN_GAIN, NUM_BANDS};

/// Parse a "BAND=DB" pair into (band_index, gain_db).
fn parse_band_pair(s: &str) -> Result<(usize, f64), String> {
    let (index_str, db_str) = s.split_once('=').ok_or_else(|| {
        format!("Invalid band pair '{s}'. Expected format: BAND=DB (e.g. '5=-3.0').")
    })?;

    let index: usize = index_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid band index '{index_str}' in '{s}'. Must be 0-9."))?;
    if index >= NUM_BANDS {
        return Err(format!("Band index '{index}' out of range. Must be 0-9."));
    }

    let db: f64 = db_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid dB value '{db_str}' in '{s}'."))?;
    if !(MIN_GAIN..=MAX_GAIN).contains(&db) {
        return Err(format!(
            "dB value {db} is out of range. Must be between {MIN_GAIN} and {MAX_GAIN}."
        ));
    }

    Ok((index, db))
}

fn type_name(filter_type: FilterType) -> &'static str {
    match filter_type {
        FilterType::Peaking => "Peaking",
        FilterType::LowShelf => "Low shelf",
        FilterType::HighShelf => "High shelf",
    }
}

fn print_device_eq(eq_state: &DeviceEq) {
    println!("{:<6} {:>8} {:>7} {:>7}  {:<11} {}", "Band", "Freq", "Gain", "Q", "Type", "Enabled");
    for (i, band) in eq_state.bands.iter().enumerate() {
        println!(
            "{:<6} {:>6}Hz {:>5.1}dB {:>7.2}  {:<11} {}",
            i,
            band.freq,
            band.gain,
            band.q,
            type_name(band.filter_type),
            band.enabled
        );
    }
    println!("{:<6} {:>13.1}dB", "Preamp", eq_state.global_gain);
}

fn main() {
    #[allow(unused_mut)]
    let mut cmd = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("A CLI application for configuring the 10-band parametric EQ on Walkplay-based USB audio devices.")
        .arg(
            Arg::new("pull")
                .long("pull")
                .action(ArgAction::SetTrue)
                .help("Read the current EQ configuration from the device and print it."),
        )
        .arg(
            Arg::new("band")
                .long("band")
                .required(false)
                .action(ArgAction::Append)
                .value_name("BAND=DB")
                .help(
                    "Adjust the gain of a single band (0-9). Repeatable.\n\
                     Applied on top of --load/--preset, or on top of the current\n\
                     device state if neither is given.\n\
                     Example: --band 5=-3.0 --band 9=2.5",
                ),
        )
        .arg(
            Arg::new("preamp")
                .long("preamp")
                .required(false)
                .value_name("DB")
                .help("Set the global gain (preamp) in dB, -20.0 to 20.0.")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("slot")
                .long("slot")
                .required(false)
                .help("Target EQ slot. Defaults to the slot the device reports.")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("flash")
                .long("flash")
                .action(ArgAction::SetTrue)
                .help("Persist the applied configuration to flash (survives power cycles)."),
        );

    #[cfg(feature = "presets")]
    {
        cmd = cmd
            .arg(
                Arg::new("load")
                    .long("load")
                    .required(false)
                    .value_name("FILE")
                    .help("Load an EQ profile from a file (AutoEQ text, CSV, or JSON preset) and apply it."),
            )
            .arg(
                Arg::new("preset")
                    .long("preset")
                    .required(false)
                    .value_name("NAME")
                    .help("Apply a named preset. See --list-presets."),
            )
            .arg(
                Arg::new("list-presets")
                    .long("list-presets")
                    .action(ArgAction::SetTrue)
                    .help("List builtin and user presets, then exit."),
            );
    }

    let matches = cmd.get_matches();

    #[cfg(feature = "presets")]
    if matches.get_flag("list-presets") {
        for preset in crin_eq::eq::presets::all_presets() {
            let marker = if crin_eq::eq::presets::is_builtin(&preset.name) {
                " (builtin)"
            } else {
                ""
            };
            println!("{}{}", preset.name, marker);
        }
        return;
    }

    let mut band_pairs: Vec<(usize, f64)> = Vec::new();
    if let Some(values) = matches.get_many::<String>("band") {
        for value in values {
            for part in value.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                match parse_band_pair(part) {
                    // Last write wins per band.
                    Ok((index, db)) => {
                        if let Some(existing) = band_pairs.iter_mut().find(|(i, _)| *i == index) {
                            existing.1 = db;
                        } else {
                            band_pairs.push((index, db));
                        }
                    }
                    Err(err) => {
                        eprintln!("ERROR: --band: {err}");
                        std::process::exit(1);
                    }
                }
            }
        }
    }

    let session = match connect_compatible_device() {
        Ok(session) => session,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    // Resolve the configuration to apply: --load / --preset form the base,
    // otherwise the device's current state when only adjustments were given.
    let mut to_apply: Option<(Vec<crin_eq::eq::Band>, f64)> = None;

    #[cfg(feature = "presets")]
    if let Some(path) = matches.get_one::<String>("load") {
        use crin_eq::eq::import;

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("Failed to read {path}: {err}");
                std::process::exit(1);
            }
        };
        let loaded = if text.trim_start().starts_with('{') {
            match import::parse_json(&text) {
                Ok(preset) => (preset.bands, preset.preamp),
                Err(err) => {
                    eprintln!("Failed to parse {path}: {err}");
                    std::process::exit(1);
                }
            }
        } else if text
            .lines()
            .any(|line| line.trim_start().to_ascii_lowercase().starts_with("filter"))
        {
            import::parse_auto_eq(&text)
        } else {
            import::parse_csv(&text)
        };
        to_apply = Some(loaded);
    }

    #[cfg(feature = "presets")]
    if let Some(name) = matches.get_one::<String>("preset") {
        let preset = crin_eq::eq::presets::all_presets()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name));
        match preset {
            Some(preset) => to_apply = Some((preset.bands, preset.preamp)),
            None => {
                eprintln!("ERROR: No preset named '{name}'. See --list-presets.");
                std::process::exit(1);
            }
        }
    }

    // Band/preamp adjustments without a base profile start from the device state.
    let has_adjustments = !band_pairs.is_empty() || matches.get_one::<f64>("preamp").is_some();
    if to_apply.is_none() && has_adjustments {
        match session.pull_filters() {
            Ok(eq_state) => to_apply = Some((eq_state.bands.to_vec(), eq_state.global_gain)),
            Err(error) => {
                eprintln!("Failed to read the current EQ state: {error}");
                std::process::exit(1);
            }
        }
    }

    if let Some((bands, preamp)) = to_apply.as_mut() {
        for &(index, db) in &band_pairs {
            bands[index].gain = db;
            bands[index].enabled = true;
        }
        if let Some(value) = matches.get_one::<f64>("preamp") {
            *preamp = sanitize_preamp(*value);
        }
    }

    let slot = matches
        .get_one::<u8>("slot")
        .copied()
        .unwrap_or(if session.current_slot >= 0 {
            session.current_slot as u8
        } else {
            0
        });

    let mut acted = false;

    if let Some((bands, preamp)) = to_apply {
        let bands = sanitize_bands(&bands);
        let result = if matches.get_flag("flash") {
            session.save_to_flash(&bands, slot, preamp)
        } else {
            session.push_filters(&bands, slot, preamp)
        };
        match result {
            Ok(()) => {
                if matches.get_flag("flash") {
                    println!("Applied EQ to slot {slot} and saved to flash.");
                } else {
                    println!("Applied EQ to slot {slot}.");
                }
            }
            Err(error) => {
                eprintln!("Failed to apply EQ: {error}");
                std::process::exit(1);
            }
        }
        acted = true;
    }

    if matches.get_flag("pull") {
        match session.pull_filters() {
            Ok(eq_state) => print_device_eq(&eq_state),
            Err(error) => {
                eprintln!("Failed to pull EQ from the device: {error}");
                std::process::exit(1);
            }
        }
        acted = true;
    }

    if !acted {
        println!(
            "Model:            {}",
            session.device_name.as_deref().unwrap_or("Unknown")
        );
        println!(
            "Firmware version: {}",
            session.firmware_version.as_deref().unwrap_or("Unknown")
        );
        println!("Current slot:     {}", session.current_slot);
    }
}
