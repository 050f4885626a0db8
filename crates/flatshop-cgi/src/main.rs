//! flatshop
//!
//! Storefront CGI program and store maintenance commands. With no command
//! it answers the CGI request it was started for.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use flatshop_cgi::output::{Output, OutputFormat};
use flatshop_cgi::{commands, logging};
use flatshop_core::Config;

#[derive(Parser)]
#[command(name = "flatshop")]
#[command(about = "flatshop - flat-file catalog and cart storefront")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: $FLATSHOP_CONFIG, ./flatshop.toml, ~/.config/flatshop/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one CGI request (default)
    Cgi,
    /// Create the store layout and the website record
    Init {
        /// Shipping cost added to every order, in minor currency units
        #[arg(long, default_value_t = 0)]
        shipping: u32,
    },
    /// Verify every record reachable from the website record
    Check,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    logging::init(&config);

    match cli.command.unwrap_or(Commands::Cgi) {
        Commands::Cgi => {
            let ok = commands::cgi::run(&config)?;
            Ok(if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Init { shipping } => {
            commands::init::run(&config, shipping, &output)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => {
            commands::check::run(&config, &output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command_means_cgi() {
        let cli = Cli::try_parse_from(["flatshop"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_init_flags() {
        let cli = Cli::try_parse_from(["flatshop", "--quiet", "init", "--shipping", "500"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.command, Some(Commands::Init { shipping: 500 })));

        assert!(Cli::try_parse_from(["flatshop", "init", "--shipping", "-1"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["flatshop", "check", "--config", "/etc/flatshop.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/flatshop.toml")));
        assert!(matches!(cli.command, Some(Commands::Check)));
    }
}
