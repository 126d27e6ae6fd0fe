use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::process;
use tactile_recon::config::Config;
use tactile_recon::ReconResult;
use tracing::{error, info};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Reconstruct touches from a tactile sensor grid", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with sensor, cloud and mixture parameters.
    #[arg(global = true, long = "config")]
    config_file: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Replay(cmd::replay::ReplayArgs),
    Simulate(cmd::simulate::SimulateArgs),
}

fn resolve_config(cli: &Cli, matches: &ArgMatches) -> ReconResult<Config> {
    let cli_config = match &cli.command {
        Commands::Replay(args) => &args.config,
        Commands::Simulate(args) => &args.config,
    };

    let Some(path) = &cli.config_file else {
        return Ok(cli_config.clone());
    };

    info!("📂 Loading config: {}", path);
    let mut config = Config::load_from_file(path)?;
    // Flags typed after the subcommand live in its own matches.
    let sub_matches = matches.subcommand().map(|(_, m)| m).unwrap_or(matches);
    config.merge_from_cli(cli_config, sub_matches);
    Ok(config)
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(&cli, &matches).unwrap_or_else(|e| {
        error!("❌ {}", e);
        process::exit(1);
    });

    let result = match cli.command {
        Commands::Replay(args) => cmd::replay::run(args, config),
        Commands::Simulate(args) => cmd::simulate::run(args, config),
    };

    if let Err(e) = result {
        error!("❌ {}", e);
        process::exit(1);
    }
}
