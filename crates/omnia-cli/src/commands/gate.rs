use crate::config::OmniaConfig;
use crate::support::{EXIT_GATE_FAILED, or_exit, print_json};
use omnia_cas::{Certificate, Differ};
use omnia_kernel::Metadata;
use serde_json::{Value, json};
use std::path::PathBuf;

pub fn run(config: &OmniaConfig, a: PathBuf, b: PathBuf, out: PathBuf, fail_on_loop: bool, json: bool) {
    let differ = or_exit(Differ::new(config.diff), "invalid configuration");
    let cert_a = or_exit(Certificate::load(&a), format!("failed to load {}", a.display()));
    let cert_b = or_exit(Certificate::load(&b), format!("failed to load {}", b.display()));

    let meta = Metadata::from([
        ("ci".to_string(), Value::Bool(true)),
        ("name".to_string(), Value::from("CAS gate")),
        ("a".to_string(), Value::from(a.display().to_string())),
        ("b".to_string(), Value::from(b.display().to_string())),
    ]);
    let diff = differ.compare(&cert_a, &cert_b, meta);
    or_exit(diff.save(&out), format!("failed to write {}", out.display()));

    let failed = diff.fails_gate(fail_on_loop);
    if json {
        print_json(&json!({
            "out": out.display().to_string(),
            "verdict": diff.verdict,
            "delta": diff.delta,
            "pass": !failed,
        }));
    } else {
        println!("CAS diff written: {}", out.display());
        println!("  Verdict: {} ({})", diff.verdict.label, diff.verdict.reason);
        println!(
            "  Delta: accepted {:+}, mean margin {:+.6}, mean delta_omega {:+.6}",
            diff.delta.accepted,
            diff.delta.accepted_mean_margin,
            diff.delta.accepted_mean_delta_omega
        );
        println!(
            "  Signature distance: {:.6}{}",
            diff.delta.signature_distance,
            if diff.delta.loop_like { " (loop-like)" } else { "" }
        );
    }

    if failed {
        if !json {
            println!("Gate: FAIL");
        }
        std::process::exit(EXIT_GATE_FAILED);
    }
    if !json {
        println!("Gate: PASS");
    }
}
