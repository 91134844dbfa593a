use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use iamctl_cli::commands::{self, GroupsCommand, PoliciesCommand, UsersCommand};
use iamctl_cli::config::{ConfigManager, get_config};
use iamctl_cli::error::{CliResult, ExitCode};
use iamctl_cli::output::OutputFormat;
use iamctl_cli::session::Session;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iamctl")]
#[command(author, version, about = "Concurrent batch lifecycle management for cloud identity directories", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format (defaults to output.default_format)
    #[arg(short, long, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Directory state file (overrides directory.state_file)
    #[arg(long, global = true, value_name = "PATH")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    Users(UsersCommand),

    /// Manage user policies
    Policies(PoliciesCommand),

    /// Manage groups
    Groups(GroupsCommand),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., client.max_concurrency)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., client.max_concurrency)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let debug = cli.debug;

    // Initialize logging based on debug flag
    if debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("iamctl_core", log::LevelFilter::Debug)
            .filter_module("iamctl_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match run(cli).await {
        Ok(code) => code.into(),
        Err(err) => {
            eprint!("{}", err.format_for_user(debug));
            err.exit_code().into()
        }
    }
}

async fn open_session(
    state: Option<PathBuf>,
    format: Option<OutputFormat>,
) -> CliResult<Session> {
    let mut config = get_config()?;
    config.apply_cli_overrides(state);
    let session = Session::open(config, format).await?;
    log::debug!("Output format: {:?}", session.format());
    Ok(session)
}

async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Users(command) => {
            let session = open_session(cli.state, cli.format).await?;
            commands::users::execute(command, &session).await
        }
        Commands::Policies(command) => {
            let session = open_session(cli.state, cli.format).await?;
            commands::policies::execute(command, &session).await
        }
        Commands::Groups(command) => {
            let session = open_session(cli.state, cli.format).await?;
            commands::groups::execute(command, &session).await
        }
        Commands::Config { command } => config_command(command),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(ExitCode::Success)
        }
    }
}

fn config_command(command: ConfigCommand) -> CliResult<ExitCode> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            let value = manager.get(&key)?;
            println!("{value}");
        }
        ConfigCommand::Set { key, value } => {
            manager.set(&key, &value)?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());
            eprintln!();

            let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
            for (key, value) in items {
                let (section, rest) = key
                    .split_once('.')
                    .map(|(s, r)| (s.to_string(), r.to_string()))
                    .unwrap_or_else(|| ("general".to_string(), key.clone()));
                sections.entry(section).or_default().push((rest, value));
            }

            for (section, items) in sections {
                println!("[{}]", section.yellow());
                for (key, value) in items {
                    println!("  {} = {}", key.cyan(), value);
                }
                println!();
            }
        }
    }

    Ok(ExitCode::Success)
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
