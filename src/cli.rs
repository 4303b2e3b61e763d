use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "phantom-scan",
    about = "Scan npm packages for phantom (imported but undeclared) dependencies",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file [default: ./.phantom-scan/config.toml, fallback ~/.config/phantom-scan/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Findings store file (overrides [store] path)
    #[arg(long, global = true, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// JSON array of package names (overrides [universe] names)
    #[arg(long, global = true, value_name = "FILE")]
    pub names: Option<PathBuf>,

    /// Show per-package diagnostics and tool output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors and summaries
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pick a task interactively (default)
    Menu,

    /// Print download counts for a range of the package universe
    Downloads(RangeArgs),

    /// Collect phantom dependencies for a range of the package universe
    Collect(RangeArgs),

    /// Import findings from a `<package>: <dep> <dep> ...` text file
    Seed {
        #[arg(default_value = "phantom.txt")]
        file: PathBuf,
    },

    /// Summarize the findings store
    Report {
        #[arg(long, default_value = "terminal", value_name = "FORMAT")]
        format: OutputFormat,
    },

    /// Show the finding recorded for one package
    Show {
        package: String,
        #[arg(long, default_value = "terminal", value_name = "FORMAT")]
        format: OutputFormat,
    },

    /// List packages whose phantom dependencies include DEP (case-insensitive)
    Search {
        dependency: String,
        #[arg(long, default_value = "terminal", value_name = "FORMAT")]
        format: OutputFormat,
    },

    /// List every finding in stored order
    List {
        #[arg(long, default_value = "terminal", value_name = "FORMAT")]
        format: OutputFormat,
    },

    /// Empty the findings store (irreversible)
    Clear {
        /// Confirm the store should be emptied
        #[arg(long)]
        yes: bool,
    },
}

/// Half-open index range `[start, end)`; omit both for the configured range.
#[derive(clap::Args, Debug)]
pub struct RangeArgs {
    #[arg(long, requires = "end")]
    pub start: Option<usize>,

    #[arg(long, requires = "start")]
    pub end: Option<usize>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Terminal,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_no_command() {
        let cli = Cli::try_parse_from(["phantom-scan"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_collect_range() {
        let cli = Cli::try_parse_from(["phantom-scan", "collect", "--start", "10", "--end", "20"]).unwrap();
        match cli.command {
            Some(Command::Collect(range)) => {
                assert_eq!(range.start, Some(10));
                assert_eq!(range.end, Some(20));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_range_needs_both_bounds() {
        assert!(Cli::try_parse_from(["phantom-scan", "downloads", "--start", "10"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["phantom-scan", "report", "--db", "x.json", "-q"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("x.json")));
        assert!(cli.quiet);
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["phantom-scan", "-v", "-q", "list"]).is_err());
    }
}
