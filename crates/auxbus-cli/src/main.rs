use anyhow::Result;
use auxbus_cli::{Cli, Commands, TransformConfig};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries command output; logs go to stderr.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = TransformConfig::resolve(cli.config.as_deref())?;
    debug!(?config, "resolved transform config");

    match &cli.command {
        Commands::Expand {
            input,
            out,
            format,
            reserve,
        } => commands::transform::handle_expand(input, out, *format, reserve, &config),
        Commands::Collapse { input, out, format } => {
            commands::transform::handle_collapse(input, out, *format)
        }
        Commands::Roundtrip { input, tol } => {
            commands::transform::handle_roundtrip(input, tol.unwrap_or(config.tolerance), &config)
        }
        Commands::Stats { input } => commands::inspect::handle_stats(input),
        Commands::Islands { input, emit } => commands::inspect::handle_islands(input, *emit),
        Commands::Validate { input, json } => commands::inspect::handle_validate(input, *json),
        Commands::Completions { shell, out } => {
            commands::completions::handle(*shell, out.as_deref())
        }
    }
}
