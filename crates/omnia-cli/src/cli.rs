use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_BASELINE: &str = "OMNIA measures structural invariants. It does not interpret meaning. It does not make decisions.";

#[derive(Parser)]
#[command(
    name = "omnia",
    about = "OMNIA: structural invariance measurement and admissibility certificates",
    version
)]
pub struct Cli {
    /// TOML config with [lenses] [kernel] [omega] [zea] [generator] [certificate] [diff]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// ZEA threshold overrides shared by commands that classify.
#[derive(Args, Debug, Clone, Default)]
pub struct ZeaArgs {
    /// ΔΩ below this floor is a structural regression
    #[arg(long, allow_negative_numbers = true)]
    pub delta_omega_floor: Option<f64>,

    /// Saturation margins at or below this are SATURATED
    #[arg(long)]
    pub saturated_margin_max: Option<f64>,

    /// SNRC pressure aggregation: max or mean
    #[arg(long)]
    pub snrc_agg: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate candidates from a baseline and write a CAS certificate
    Cert {
        /// Output certificate path (JSON)
        #[arg(long)]
        out: PathBuf,

        /// Baseline text
        #[arg(long, default_value = DEFAULT_BASELINE)]
        baseline: String,

        /// Expansion rounds (overrides [generator].rounds)
        #[arg(long)]
        rounds: Option<usize>,

        /// Accepted texts carried per round (overrides [generator].top_k)
        #[arg(long)]
        top_k: Option<usize>,

        /// Certify records of a JSONL dataset instead of generating candidates
        #[arg(long)]
        jsonl: Option<PathBuf>,

        /// Dotted field path holding each record's text (JSONL mode)
        #[arg(long, requires = "jsonl")]
        field: Option<String>,

        /// Maximum records read from the JSONL dataset
        #[arg(long, default_value_t = 200)]
        limit: usize,

        #[command(flatten)]
        zea: ZeaArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diff two certificates and fail on regression (CI gate)
    Gate {
        /// Older certificate
        #[arg(long)]
        a: PathBuf,

        /// Newer certificate
        #[arg(long)]
        b: PathBuf,

        /// Output diff report path (JSON)
        #[arg(long)]
        out: PathBuf,

        /// Also fail when the runs are loop-like
        #[arg(long)]
        fail_on_loop: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify one candidate against a baseline
    Zea {
        /// Baseline text
        #[arg(long, default_value = DEFAULT_BASELINE)]
        baseline: String,

        /// Candidate text
        #[arg(long)]
        candidate: String,

        #[command(flatten)]
        zea: ZeaArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Incremental Ω̂ trace of one text under growing lens sets
    Omega {
        /// Text to measure
        text: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
