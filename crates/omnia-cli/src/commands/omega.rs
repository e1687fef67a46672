use crate::config::OmniaConfig;
use crate::support::{or_exit, print_json};
use omnia_kernel::{GainRatioSei, InvarianceLossIri, Lens, OmegaReport};
use serde::Serialize;

#[derive(Serialize)]
struct OmegaOutput<'a> {
    omega: f64,
    converged: bool,
    trace: &'a [OmegaReport],
}

/// Grow the lens set one lens at a time and print the Ω̂ trace.
pub fn run(config: &OmniaConfig, text: String, json: bool) {
    let estimator = or_exit(config.omega(), "invalid configuration")
        .with_sei(GainRatioSei)
        .with_iri(InvarianceLossIri);

    let lenses = estimator.lens_set().as_slice();
    let schedule: Vec<&[&dyn Lens]> = (1..=lenses.len()).map(|n| &lenses[..n]).collect();
    let trace = estimator.estimate_incremental(&text, &schedule);
    let converged = estimator.converged(&trace);
    let omega = trace.last().map_or(0.0, |report| report.invariance);

    if json {
        print_json(&OmegaOutput {
            omega,
            converged,
            trace: &trace,
        });
        return;
    }
    println!("omega: {omega:.6}{}", if converged { " (converged)" } else { "" });
    for (step, report) in trace.iter().enumerate() {
        println!(
            "  step {}: views {}, invariance {:.6}, delta {:.6}, sei {:.3}, iri {:.3}",
            step + 1,
            report.meta.view_count,
            report.invariance,
            report.delta_invariance,
            report.sei,
            report.iri
        );
        if !report.fractures.is_empty() {
            println!("    fractures: {}", report.fractures.join(", "));
        }
    }
}
