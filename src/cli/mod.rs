// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::error::Result;
use crate::InlineOptions;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueEnum};

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct Cli {
    config: config::ConfigFile,
}

impl Cli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let matches = build_cli().get_matches();
        self.run_with_matches(&matches)
    }

    pub fn run_with_matches(&mut self, matches: &ArgMatches) -> Result<()> {
        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"));

        match matches.subcommand() {
            Some(("inline", sub_matches)) => handlers::handle_inline_command(self, sub_matches),
            Some(("check", sub_matches)) => handlers::handle_check_command(self, sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        }
    }

    fn setup_logging(&self, verbose_count: u8) {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        if let Err(e) = env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .try_init()
        {
            log::debug!("Logger already initialized: {}", e);
        }
    }

    /// Command-line flags win over the config file.
    pub fn build_inline_options(&self, matches: &ArgMatches) -> InlineOptions {
        let mut options = InlineOptions::default();

        if let Some(root_selector) = matches
            .get_one::<String>("root-selector")
            .or(self.config.root_selector.as_ref())
        {
            options.root_selector = root_selector.clone();
        }
        options.warn_undefined =
            matches.get_flag("warn-undefined") || self.config.warn_undefined.unwrap_or(false);

        options
    }

    pub fn output_directory(&self) -> Option<&str> {
        self.config.output_directory.as_deref()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_cli() -> Command {
    Command::new(crate::NAME)
        .version(crate::VERSION)
        .about(crate::DESCRIPTION)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (.toml or .json)")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity (can be used multiple times)")
                .action(ArgAction::Count),
        )
        .subcommand(
            Command::new("inline")
                .about("Inline :root variables into a stylesheet")
                .arg(Arg::new("input").help("Input CSS file, or - for stdin").required(true).index(1))
                .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Output CSS file (stdout when omitted)"))
                .arg(Arg::new("root-selector").long("root-selector").value_name("SELECTOR").help("Selector holding the global variables (default :root)"))
                .arg(Arg::new("warn-undefined").long("warn-undefined").help("Warn about dropped declarations and unresolved variables").action(ArgAction::SetTrue))
                .arg(Arg::new("stats").long("stats").help("Show what was inlined and dropped").action(ArgAction::SetTrue))
                .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(OutputFormat)).default_value("text").help("Statistics format"))
                .arg(Arg::new("watch").short('w').long("watch").help("Watch the input for changes and re-run").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("check")
                .about("Report what inlining would do without writing anything")
                .arg(Arg::new("input").help("Input CSS file or directory").required(true).index(1))
                .arg(Arg::new("recursive").short('r').long("recursive").help("Check all CSS files in directory recursively").action(ArgAction::SetTrue))
                .arg(Arg::new("root-selector").long("root-selector").value_name("SELECTOR").help("Selector holding the global variables (default :root)"))
                .arg(Arg::new("warn-undefined").long("warn-undefined").help("Warn about dropped declarations and unresolved variables").action(ArgAction::SetTrue)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let mut cli = Cli::new();
        cli.config.root_selector = Some("html".to_string());
        cli.config.warn_undefined = Some(true);

        let matches = build_cli().get_matches_from(["inline-css-vars", "inline", "a.css"]);
        let (_, sub_matches) = matches.subcommand().unwrap();
        let options = cli.build_inline_options(sub_matches);
        assert_eq!(options.root_selector, "html");
        assert!(options.warn_undefined);

        let matches = build_cli().get_matches_from([
            "inline-css-vars",
            "inline",
            "a.css",
            "--root-selector",
            ":host",
        ]);
        let (_, sub_matches) = matches.subcommand().unwrap();
        assert_eq!(cli.build_inline_options(sub_matches).root_selector, ":host");
    }

    #[test]
    fn test_defaults_without_config() {
        let cli = Cli::new();
        let matches = build_cli().get_matches_from(["inline-css-vars", "check", "styles"]);
        let (name, sub_matches) = matches.subcommand().unwrap();

        assert_eq!(name, "check");
        assert_eq!(cli.build_inline_options(sub_matches), InlineOptions::default());
        assert!(cli.output_directory().is_none());
    }
}
