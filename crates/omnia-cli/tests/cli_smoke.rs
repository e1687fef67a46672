use serde_json::{Value, json};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const STRUCTURAL: &str = "OMNIA measures structural invariants. It does not interpret meaning. It does not make decisions. It measures invariants under transformations and stops at structural saturation.";
const MEASURABLE: &str = "OMNIA measures structural invariants. It does not interpret meaning. It does not make decisions. Output is a certificate: ADMISSIBLE, SATURATED, or ILLEGITIMATE.";

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "omnia-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_omnia<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_omnia");
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("omnia command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn read_json(path: &Path) -> Value {
    let raw = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&raw).unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()))
}

fn write_one_round_cert(path: &Path) -> Output {
    let output = run_omnia([
        OsStr::new("cert"),
        OsStr::new("--out"),
        path.as_os_str(),
        OsStr::new("--rounds"),
        OsStr::new("1"),
        OsStr::new("--top-k"),
        OsStr::new("4"),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    output
}

#[test]
fn cert_writes_certificate_and_reports_summary() {
    let tmp = TempDirGuard::new("cert");
    let out = tmp.path().join("runs").join("cas.json");

    let output = write_one_round_cert(&out);
    let summary = parse_json_stdout(&output);
    assert_eq!(summary["summary"]["status"], json!("OPEN"));
    assert_eq!(summary["summary"]["stop_recommended"], json!(false));
    assert_eq!(
        summary["summary"]["counts"],
        json!({"accepted": 4, "saturated": 0, "rejected": 1})
    );

    let cert = read_json(&out);
    assert_eq!(cert["schema"], json!("CAS-1.0"));
    assert_eq!(cert["engine"], json!("OMNIA"));
    assert_eq!(cert["run_meta"]["mode"], json!("generate"));
    assert_eq!(cert["run_meta"]["rounds"], json!(1));
    assert_eq!(cert["run_meta"]["zea"]["snrc_agg"], json!("max"));
    assert_eq!(
        cert["buckets"]["rejected"][0]["op"],
        json!("add_structural_clauses")
    );
}

#[test]
fn cert_text_output_names_status_and_counts() {
    let tmp = TempDirGuard::new("cert-text");
    let out = tmp.path().join("cas.json");
    let output = run_omnia([
        OsStr::new("cert"),
        OsStr::new("--out"),
        out.as_os_str(),
        OsStr::new("--rounds"),
        OsStr::new("1"),
    ]);
    assert_success(&output);

    let stdout = stdout_text(&output);
    assert!(stdout.contains("Status: OPEN (continue)"), "{stdout}");
    assert!(
        stdout.contains("accepted 4, saturated 0, rejected 1"),
        "{stdout}"
    );
}

#[test]
fn gate_passes_self_diff_unless_loops_fail() {
    let tmp = TempDirGuard::new("gate");
    let a = tmp.path().join("a.json");
    let b = tmp.path().join("b.json");
    let diff = tmp.path().join("diff.json");
    write_one_round_cert(&a);
    write_one_round_cert(&b);

    let gate = |extra: &[&str]| {
        let mut args = vec![
            OsStr::new("gate"),
            OsStr::new("--a"),
            a.as_os_str(),
            OsStr::new("--b"),
            b.as_os_str(),
            OsStr::new("--out"),
            diff.as_os_str(),
        ];
        args.extend(extra.iter().map(|arg| OsStr::new(*arg)));
        run_omnia(args)
    };

    let output = gate(&[]);
    assert_success(&output);
    let stdout = stdout_text(&output);
    assert!(stdout.contains("Verdict: STALL"), "{stdout}");
    assert!(stdout.contains("Gate: PASS"), "{stdout}");

    let report = read_json(&diff);
    assert_eq!(report["schema"], json!("CAS-DIFF-1.0"));
    assert_eq!(report["meta"]["name"], json!("CAS gate"));
    assert_eq!(report["delta"]["loop_like"], json!(true));

    let output = gate(&["--fail-on-loop", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let verdict = parse_json_stdout(&output);
    assert_eq!(verdict["pass"], json!(false));
    assert_eq!(verdict["verdict"]["label"], json!("STALL"));
}

#[test]
fn gate_with_missing_certificate_is_a_usage_error() {
    let tmp = TempDirGuard::new("gate-missing");
    let a = tmp.path().join("a.json");
    write_one_round_cert(&a);
    let missing = tmp.path().join("missing.json");
    let diff = tmp.path().join("diff.json");

    let output = run_omnia([
        OsStr::new("gate"),
        OsStr::new("--a"),
        a.as_os_str(),
        OsStr::new("--b"),
        missing.as_os_str(),
        OsStr::new("--out"),
        diff.as_os_str(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_text(&output).contains("failed to load"));
    assert!(!diff.exists());
}

#[test]
fn zea_classifies_single_candidates() {
    let output = run_omnia(["zea", "--candidate", MEASURABLE, "--json"]);
    assert_success(&output);
    let report = parse_json_stdout(&output);
    assert_eq!(report["status"], json!("ADMISSIBLE"));
    assert_eq!(report["details"]["meta"]["mode"], json!("single"));

    let output = run_omnia(["zea", "--candidate", STRUCTURAL, "--json"]);
    assert_success(&output);
    assert_eq!(parse_json_stdout(&output)["status"], json!("ILLEGITIMATE"));

    let output = run_omnia([
        "zea",
        "--candidate",
        STRUCTURAL,
        "--delta-omega-floor",
        "-1",
        "--json",
    ]);
    assert_success(&output);
    assert_eq!(parse_json_stdout(&output)["status"], json!("ADMISSIBLE"));
}

#[test]
fn invalid_snrc_aggregation_is_a_usage_error() {
    let output = run_omnia(["zea", "--candidate", MEASURABLE, "--snrc-agg", "median"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(
        stderr_text(&output).contains("invalid --snrc-agg"),
        "{}",
        stderr_text(&output)
    );
}

#[test]
fn config_file_thresholds_apply_and_unknown_keys_fail() {
    let tmp = TempDirGuard::new("config");
    let config = tmp.path().join("omnia.toml");
    fs::write(&config, "[zea]\nsaturated_margin_max = 1.0\n").expect("config written");

    let output = run_omnia([
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("zea"),
        OsStr::new("--candidate"),
        OsStr::new(MEASURABLE),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    assert_eq!(parse_json_stdout(&output)["status"], json!("SATURATED"));

    fs::write(&config, "[zeta]\nsaturated_margin_max = 1.0\n").expect("config written");
    let output = run_omnia([
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("omega"),
        OsStr::new("text"),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_text(&output).contains("failed to load config"));
}

#[test]
fn omega_prints_a_bounded_trace() {
    let output = run_omnia([
        "omega",
        "OMNIA measures structural invariants. It does not make decisions.",
        "--json",
    ]);
    assert_success(&output);
    let report = parse_json_stdout(&output);

    let trace = report["trace"].as_array().expect("trace array");
    assert!(!trace.is_empty() && trace.len() <= 3);
    let omega = report["omega"].as_f64().expect("omega number");
    assert!((0.0..=1.0).contains(&omega));
    assert_eq!(trace.last().expect("last step")["invariance"], report["omega"]);
    assert_eq!(trace[0]["sei"], json!(1.0));
    assert_eq!(trace[0]["iri"], json!(0.0));
}

#[test]
fn cert_from_jsonl_classifies_each_record() {
    let tmp = TempDirGuard::new("jsonl");
    let dataset = tmp.path().join("outputs.jsonl");
    let records = [
        json!({"id": 1, "response": {"text": MEASURABLE}}),
        json!({"id": 2}),
        json!({"id": 3, "response": {"text": STRUCTURAL}}),
    ];
    let body: String = records.iter().map(|r| format!("{r}\n")).collect();
    fs::write(&dataset, body).expect("dataset written");
    let out = tmp.path().join("cas.json");

    let output = run_omnia([
        OsStr::new("cert"),
        OsStr::new("--out"),
        out.as_os_str(),
        OsStr::new("--jsonl"),
        dataset.as_os_str(),
        OsStr::new("--field"),
        OsStr::new("response.text"),
        OsStr::new("--json"),
    ]);
    assert_success(&output);

    let cert = read_json(&out);
    assert_eq!(
        cert["summary"]["counts"],
        json!({"accepted": 1, "saturated": 0, "rejected": 1})
    );
    assert_eq!(cert["run_meta"]["mode"], json!("jsonl"));
    assert_eq!(cert["run_meta"]["kept"], json!(2));
    assert_eq!(cert["run_meta"]["skipped"], json!(1));
    assert_eq!(cert["buckets"]["accepted"][0]["op"], json!("jsonl_record"));
    assert_eq!(cert["buckets"]["rejected"][0]["text"], json!(STRUCTURAL));
}
