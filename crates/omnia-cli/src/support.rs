use crate::cli::ZeaArgs;
use crate::config::OmniaConfig;
use omnia_kernel::lenses::sha256_hex;
use omnia_kernel::{SnrcAggregation, Zea, ZeaConfig};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

/// Exit status for usage, configuration and I/O failures.
pub const EXIT_USAGE: i32 = 2;
/// Exit status for a failing gate verdict.
pub const EXIT_GATE_FAILED: i32 = 1;

pub fn fail(message: impl Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(EXIT_USAGE);
}

pub fn or_exit<T, E: Display>(result: Result<T, E>, context: impl Display) -> T {
    result.unwrap_or_else(|e| fail(format!("{context}: {e}")))
}

pub fn load_config_or_exit(path: Option<&Path>) -> OmniaConfig {
    match path {
        Some(path) => {
            let config = or_exit(OmniaConfig::load(path), "failed to load config");
            tracing::debug!(path = %path.display(), "config loaded");
            config
        }
        None => OmniaConfig::default(),
    }
}

/// File thresholds with CLI overrides applied.
pub fn zea_config_or_exit(config: &OmniaConfig, args: &ZeaArgs) -> ZeaConfig {
    let mut zea = config.zea;
    if let Some(floor) = args.delta_omega_floor {
        zea.delta_omega_floor = floor;
    }
    if let Some(max) = args.saturated_margin_max {
        zea.saturated_margin_max = max;
    }
    if let Some(agg) = &args.snrc_agg {
        zea.snrc_agg = or_exit(agg.parse::<SnrcAggregation>(), "invalid --snrc-agg");
    }
    zea
}

pub fn zea_or_exit(config: &OmniaConfig, args: &ZeaArgs) -> (Zea, ZeaConfig) {
    let zea_config = zea_config_or_exit(config, args);
    let zea = or_exit(config.zea(zea_config), "invalid configuration");
    (zea, zea_config)
}

pub fn print_json(value: &impl Serialize) {
    let rendered = or_exit(serde_json::to_string_pretty(value), "json serialization");
    println!("{rendered}");
}

/// Short, stable fingerprint of a text for run metadata.
pub fn stable_hint(text: &str) -> String {
    sha256_hex(text).chars().take(10).collect()
}
