use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

use auxbus_io::Format;

#[derive(Parser, Debug)]
#[command(name = "auxbus", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// TOML file with transform settings (geodata policy, reserved names, tolerance)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output layout; defaults to the layout of the input file.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Native,
    Pandapower,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Native => Format::Native,
            FormatArg::Pandapower => Format::Pandapower,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace every branch switch with an auxiliary bus and a bus-bus switch
    Expand {
        /// Network file (native or pandapower JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Where to write the expanded network
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Extra names auxiliary buses must not take (repeatable)
        #[arg(long = "reserve", value_name = "NAME")]
        reserve: Vec<String>,
    },
    /// Fold every auxiliary bus back into a branch switch
    Collapse {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Expand and collapse in memory and check the result equals the input
    Roundtrip {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Absolute tolerance for float columns (overrides the config file)
        #[arg(long)]
        tol: Option<f64>,
    },
    /// Table counts and bus graph statistics
    Stats {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
    },
    /// Electrical islands of the bus graph
    Islands {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Print the island of every bus
        #[arg(long)]
        emit: bool,
    },
    /// Check the network for conditions expand or collapse would reject
    Validate {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Print the diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn test_parse_expand_with_reserved_names() {
        let cli = Cli::try_parse_from([
            "auxbus",
            "--log-level",
            "debug",
            "expand",
            "grid.json",
            "-o",
            "out.json",
            "--format",
            "pandapower",
            "--reserve",
            "Bus_1",
            "--reserve",
            "Bus_2",
        ])
        .unwrap();
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        match cli.command {
            Commands::Expand {
                format, reserve, ..
            } => {
                assert_eq!(format, Some(FormatArg::Pandapower));
                assert_eq!(reserve, vec!["Bus_1", "Bus_2"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_config_flag_is_global() {
        let cli = Cli::try_parse_from(["auxbus", "roundtrip", "grid.json", "--config", "t.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("t.toml")));
    }
}
