use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "visual-suite",
    about = "Compare sample screenshots against reference patterns",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Suite document to run (defaults to ./visual-suite.toml, then the user config dir)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory receiving results.xml and per-test result pages
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Directory holding the HTML report templates
    #[arg(long = "templates", value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,

    /// Print the registered listener types and exit
    #[arg(long = "list-listeners")]
    pub list_listeners: bool,

    /// Do not show the progress bar
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

pub fn parse_cli() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn parses_overrides() {
        let args = CliArgs::try_parse_from([
            "visual-suite",
            "--config",
            "suite.toml",
            "-o",
            "out",
            "--log-level",
            "debug",
            "--no-progress",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("suite.toml")));
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert_eq!(args.log_level, "debug");
        assert!(args.no_progress);
        assert!(!args.list_listeners);
    }
}
