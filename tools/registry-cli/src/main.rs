//! Tournament Registry CLI
//!
//! Operator interface for the player registry: inspect the roster, check
//! UID/email availability, register players by hand and repair legacy files.

mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use player_registry::{
    IntakeError, Player, PlayerRegistry, RegistrationDesk, RegistrationRequest, RegistryConfig,
    TracingNotifier,
};

#[derive(Parser)]
#[command(name = "registry-cli")]
#[command(about = "Operator CLI for the tournament player registry")]
#[command(version)]
struct Cli {
    /// Roster file (defaults to TOURNAMENT_DATA_FILE or ./data/players.json)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log format (plain, pretty, json)
    #[arg(long, global = true, default_value = "plain")]
    log_format: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered player
    List,

    /// Show registration count and free slots
    Status,

    /// Check whether a UID is already registered
    CheckUid { uid: String },

    /// Check whether an email is already registered
    CheckEmail { email: String },

    /// Register a player
    Register {
        #[arg(long)]
        full_name: String,

        #[arg(long)]
        in_game_name: String,

        #[arg(long)]
        uid: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,

        /// Confirm the player accepted the tournament rules
        #[arg(long)]
        agree: bool,
    },

    /// Repair a legacy roster file. Renumbers every player from 1.
    Normalize {
        /// Required: confirms the renumbering is intended
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize_logging(&cli.log_level, &cli.log_format)?;

    let mut config = RegistryConfig::from_env().context("Failed to load registry configuration")?;
    if let Some(data_file) = cli.data_file.clone() {
        config.data_file = data_file;
    }
    info!("Using roster file {:?}", config.data_file);

    if let Commands::Normalize { yes } = cli.command {
        return normalize(config, yes, cli.json).await;
    }

    let registry = Arc::new(
        PlayerRegistry::open(config).await.context("Failed to open player registry")?,
    );
    let desk = RegistrationDesk::new(registry.clone(), Arc::new(TracingNotifier));

    let result = run(&desk, cli.command, cli.json).await;
    registry.shutdown().await;
    result
}

async fn run(desk: &RegistrationDesk, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::List => {
            let players = desk.players().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&players)?);
            } else {
                print_roster(&players);
            }
        }

        Commands::Status => {
            let status = desk.status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                let headline = if status.is_full {
                    "FULL".red().bold()
                } else {
                    "OPEN".green().bold()
                };
                println!("Registration {headline}");
                println!(
                    "  {} / {} registered, {} slots available",
                    status.registered_count, status.max_players, status.available_slots
                );
            }
        }

        Commands::CheckUid { uid } => {
            let taken = desk.uid_taken(&uid).await?;
            print_availability("UID", &uid, taken, json)?;
        }

        Commands::CheckEmail { email } => {
            let taken = desk.email_taken(&email).await?;
            print_availability("Email", &email, taken, json)?;
        }

        Commands::Register { full_name, in_game_name, uid, email, phone, agree } => {
            let request = RegistrationRequest {
                full_name,
                in_game_name,
                uid,
                email,
                phone,
                agreement: agree,
            };

            match desk.submit(request).await {
                Ok(outcome) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&outcome)?);
                    } else {
                        println!(
                            "{} {} registered with ID {}",
                            "✓".green(),
                            outcome.player.in_game_name.bold(),
                            outcome.player.id
                        );
                        if !outcome.notification_sent {
                            println!("{} confirmation was not sent", "!".yellow());
                        }
                    }
                }
                Err(IntakeError::Validation(errors)) => {
                    for error in &errors.errors {
                        eprintln!("{} {}: {}", "✗".red(), error.field, error.message);
                    }
                    bail!("Registration rejected (400)");
                }
                Err(e) => {
                    bail!("{} ({}): {}", e.user_message(), e.status_code(), e);
                }
            }
        }

        Commands::Normalize { .. } => bail!("normalize cannot run against an open registry"),
    }

    Ok(())
}

async fn normalize(config: RegistryConfig, yes: bool, json: bool) -> Result<()> {
    if !yes {
        bail!(
            "normalize renumbers every player from 1 and drops incomplete records; \
             re-run with --yes to proceed"
        );
    }

    let registry = PlayerRegistry::open_for_repair(config)
        .await
        .context("Failed to open roster file for repair")?;
    let report = registry.normalize().await.context("Failed to normalize roster")?;
    registry.shutdown().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Kept {} players", report.kept);
        println!("Generated {} placeholder emails", report.placeholder_emails);
        for (position, reason) in &report.discarded {
            println!("  {} dropped record #{position}: {reason:?}", "-".yellow());
        }
    }

    Ok(())
}

fn print_availability(label: &str, value: &str, taken: bool, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "value": value, "exists": taken }));
    } else if taken {
        println!("{label} {} is {}", value.bold(), "already registered".red());
    } else {
        println!("{label} {} is {}", value.bold(), "available".green());
    }
    Ok(())
}

fn print_roster(players: &[Player]) {
    println!(
        "{:>4} {:24} {:16} {:13} {:28} {}",
        "ID".bold(),
        "Name".bold(),
        "In-game".bold(),
        "UID".bold(),
        "Email".bold(),
        "Registered".bold()
    );
    println!("{}", "-".repeat(110));

    for player in players {
        println!(
            "{:>4} {:24} {:16} {:13} {:28} {}",
            player.id,
            player.full_name,
            player.in_game_name,
            player.uid,
            player.email,
            player.registered_at
        );
    }

    println!("{}", "-".repeat(110));
    println!("{} players", players.len());
}
