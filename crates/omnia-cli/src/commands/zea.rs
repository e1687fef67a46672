use crate::cli::ZeaArgs;
use crate::config::OmniaConfig;
use crate::support::{print_json, zea_or_exit};
use omnia_kernel::Metadata;
use serde_json::Value;

pub fn run(config: &OmniaConfig, baseline: String, candidate: String, zea: ZeaArgs, json: bool) {
    let (zea, _) = zea_or_exit(config, &zea);
    let meta = Metadata::from([("mode".to_string(), Value::from("single"))]);
    let report = zea.evaluate(&baseline, &candidate, meta);

    if json {
        print_json(&report);
        return;
    }
    println!("Status: {}", report.status);
    println!("  {}", report.notes);
    println!(
        "  omega: {:.6} -> {:.6} (delta {:+.6})",
        report.omega_before, report.omega_after, report.delta_omega
    );
    println!(
        "  SNRC pressure: {:.6}{}",
        report.snrc_pressure(),
        if report.snrc_candidate { " (flagged)" } else { "" }
    );
    println!("  Saturation margin: {:.6}", report.saturation_margin);
}
