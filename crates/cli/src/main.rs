mod command;

use std::path::PathBuf;

use anyhow::Result;
use cadence_planner::DiscourseConfig;
use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::command::CommandResponse;

#[derive(Parser, Debug)]
#[command(
    name = "cadence",
    about = "Compile discourse segments into validated edit plans",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Discourse config overlay (JSON or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON response
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a request (segments + links) into an execution plan
    Compile {
        /// Request JSON file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Prior edits used to resolve particles such as "again"
        #[arg(long)]
        history: Option<PathBuf>,

        /// Alias table mapping entity names to ids
        #[arg(long)]
        aliases: Option<PathBuf>,
    },

    /// Verify constraints against an edit diff
    Check {
        #[arg(long)]
        constraints: PathBuf,

        #[arg(long)]
        diff: PathBuf,

        #[arg(long)]
        aliases: Option<PathBuf>,
    },

    /// Analyze what replacing a plan requires
    Rollback {
        /// Replacement target JSON file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// List the loaded discourse relations
    Relations,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let response = match run(&cli) {
        Ok(response) => response,
        Err(err) => {
            log::error!("{err:#}");
            CommandResponse::error(format!("{err:#}"))
        }
    };

    let failed = response.is_error();
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    match rendered {
        Ok(text) => println!("{text}"),
        Err(err) => {
            eprintln!("Failed to serialize response: {err}");
            std::process::exit(2);
        }
    }
    if failed {
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn run(cli: &Cli) -> Result<CommandResponse> {
    match &cli.command {
        Command::Compile {
            input,
            history,
            aliases,
        } => {
            let config = DiscourseConfig::load(cli.config.as_deref())?;
            command::compile(&config, input, history.as_deref(), aliases.as_deref())
        }
        Command::Check {
            constraints,
            diff,
            aliases,
        } => command::check(constraints, diff, aliases.as_deref()),
        Command::Rollback { input } => command::rollback(input),
        Command::Relations => {
            let config = DiscourseConfig::load(cli.config.as_deref())?;
            command::relations(&config)
        }
    }
}
