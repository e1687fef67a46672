use crate::cli::ZeaArgs;
use crate::config::OmniaConfig;
use crate::support::{or_exit, print_json, stable_hint, zea_or_exit};
use omnia_cas::{Certificate, CertificateBuilder};
use omnia_kernel::{Candidate, ConstrainedGenerator, GenerationResult, Metadata, Zea};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// Fields probed, in order, when no `--field` is given or it is empty.
const AUTO_FIELDS: [&str; 14] = [
    "output",
    "completion",
    "response",
    "text",
    "answer",
    "prediction",
    "model_output",
    "final",
    "raw",
    "response.output_text",
    "response.text",
    "choices.0.text",
    "choices.0.message.content",
    "message.content",
];

/// Shortest string accepted by the last-resort scan over record values.
const MIN_FALLBACK_LEN: usize = 8;

pub struct Args {
    pub out: PathBuf,
    pub baseline: String,
    pub rounds: Option<usize>,
    pub top_k: Option<usize>,
    pub jsonl: Option<PathBuf>,
    pub field: Option<String>,
    pub limit: usize,
    pub zea: ZeaArgs,
    pub json: bool,
}

pub fn run(config: &OmniaConfig, args: Args) {
    let (zea, zea_config) = zea_or_exit(config, &args.zea);
    let builder = or_exit(
        CertificateBuilder::new(config.certificate.clone()),
        "invalid configuration",
    );

    let mut run_meta = Metadata::from([
        ("ci".to_string(), Value::Bool(true)),
        (
            "baseline_hash_hint".to_string(),
            Value::from(stable_hint(&args.baseline)),
        ),
        (
            "zea".to_string(),
            json!({
                "delta_omega_floor": zea_config.delta_omega_floor,
                "saturated_margin_max": zea_config.saturated_margin_max,
                "snrc_agg": zea_config.snrc_agg.as_str(),
            }),
        ),
    ]);

    let result = match &args.jsonl {
        Some(path) => {
            let (result, mode_meta) = certify_records(&zea, &args, path);
            run_meta.extend(mode_meta);
            result
        }
        None => {
            let rounds = args.rounds.unwrap_or(config.generator.rounds);
            let top_k = args.top_k.unwrap_or(config.generator.top_k);
            run_meta.insert("mode".to_string(), Value::from("generate"));
            run_meta.insert("rounds".to_string(), Value::from(rounds));
            run_meta.insert("top_k".to_string(), Value::from(top_k));
            let generator_meta = Metadata::from([
                ("ci".to_string(), Value::Bool(true)),
                ("rounds".to_string(), Value::from(rounds)),
                ("top_k".to_string(), Value::from(top_k)),
            ]);
            ConstrainedGenerator::new(zea).generate(&args.baseline, rounds, top_k, &generator_meta)
        }
    };

    let cert = or_exit(builder.build(&result, run_meta), "failed to build certificate");
    or_exit(
        cert.save(&args.out),
        format!("failed to write {}", args.out.display()),
    );
    report(&cert, &args.out, args.json);
}

fn report(cert: &Certificate, out: &Path, json_output: bool) {
    if json_output {
        print_json(&json!({
            "out": out.display().to_string(),
            "summary": cert.summary,
        }));
        return;
    }
    let counts = cert.counts();
    println!("CAS written: {}", out.display());
    println!(
        "  Status: {} ({})",
        cert.summary.status, cert.summary.stop_reason
    );
    println!(
        "  Counts: accepted {}, saturated {}, rejected {}",
        counts.accepted, counts.saturated, counts.rejected
    );
}

/// Classify each dataset record against the baseline instead of generating.
fn certify_records(zea: &Zea, args: &Args, path: &Path) -> (GenerationResult, Metadata) {
    let raw = or_exit(
        fs::read_to_string(path),
        format!("failed to read {}", path.display()),
    );
    let records = or_exit(
        parse_records(&raw, args.limit),
        format!("failed to parse {}", path.display()),
    );

    let mut result = GenerationResult::new(&args.baseline);
    let mut skipped = 0usize;
    for (i, record) in records.iter().enumerate() {
        let Some(text) = extract_text(record, args.field.as_deref()) else {
            skipped += 1;
            continue;
        };
        let meta = Metadata::from([
            ("mode".to_string(), Value::from("jsonl")),
            ("i".to_string(), Value::from(i)),
        ]);
        let report = zea.evaluate(&args.baseline, &text, meta);
        let candidate = Candidate::external(
            text,
            "jsonl_record",
            Metadata::from([("i".to_string(), Value::from(i))]),
        );
        result.push(candidate, report);
    }

    if skipped > 0 {
        tracing::warn!(skipped, "records without extractable text");
    }
    let mode_meta = Metadata::from([
        ("mode".to_string(), Value::from("jsonl")),
        (
            "jsonl_path".to_string(),
            Value::from(path.display().to_string()),
        ),
        ("field".to_string(), json!(args.field)),
        ("limit".to_string(), Value::from(args.limit)),
        ("kept".to_string(), Value::from(result.total())),
        ("skipped".to_string(), Value::from(skipped)),
    ]);
    (result, mode_meta)
}

/// The first `limit` non-blank JSONL records.
fn parse_records(raw: &str, limit: usize) -> Result<Vec<Value>, String> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .take(limit)
        .map(|(line_no, line)| {
            serde_json::from_str(line.trim()).map_err(|e| format!("line {}: {e}", line_no + 1))
        })
        .collect()
}

/// Follow `a.b.0.c` through objects and array indices.
fn get_dotted<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted.split('.').try_fold(value, |current, part| match current {
        Value::Array(items) => part.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        Value::Object(map) => map.get(part),
        _ => None,
    })
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn extract_text(record: &Value, field: Option<&str>) -> Option<String> {
    if let Some(field) = field
        && let Some(text) = non_blank(get_dotted(record, field))
    {
        return Some(text);
    }
    if let Some(text) = AUTO_FIELDS
        .iter()
        .find_map(|field| non_blank(get_dotted(record, field)))
    {
        return Some(text);
    }
    record.as_object()?.values().find_map(|value| {
        value
            .as_str()
            .map(str::trim)
            .filter(|text| text.chars().count() >= MIN_FALLBACK_LEN)
            .map(str::to_string)
    })
}
