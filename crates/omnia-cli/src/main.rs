//! OMNIA CLI: the `omnia` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = support::load_config_or_exit(cli.config.as_deref());

    match cli.command {
        Commands::Cert {
            out,
            baseline,
            rounds,
            top_k,
            jsonl,
            field,
            limit,
            zea,
            json,
        } => commands::cert::run(
            &config,
            commands::cert::Args {
                out,
                baseline,
                rounds,
                top_k,
                jsonl,
                field,
                limit,
                zea,
                json,
            },
        ),

        Commands::Gate {
            a,
            b,
            out,
            fail_on_loop,
            json,
        } => commands::gate::run(&config, a, b, out, fail_on_loop, json),

        Commands::Zea {
            baseline,
            candidate,
            zea,
            json,
        } => commands::zea::run(&config, baseline, candidate, zea, json),

        Commands::Omega { text, json } => commands::omega::run(&config, text, json),
    }
}

/// Logs go to stderr so JSON on stdout stays machine readable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr);
    Registry::default().with(filter).with(fmt_layer).init();
}
