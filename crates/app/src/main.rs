//! Terminal front-end for Clavier d'Or.

mod db;
mod play;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use tracing_subscriber::EnvFilter;

use clavier_core::model::Role;
use clavier_core::scoring::stage_label;
use services::export::scores_table;
use services::{AppServices, Clock, QuestionPool, export_scores};

const DEFAULT_LOG_FILTER: &str = "warn,services=info,storage=info,app=info";

#[derive(Parser)]
#[command(
    name = "clavier",
    about = "Clavier d'Or : le quiz des développeurs en quatre étapes",
    version,
    propagate_version = true
)]
struct Cli {
    /// SQLite database URL or file path
    #[arg(long, global = true, env = "CLAVIER_DB_URL")]
    db: Option<String>,

    /// Fixed seed for the question order
    #[arg(long, global = true, env = "CLAVIER_SEED")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new game
    Play {
        /// Player name
        #[arg(short, long)]
        name: String,

        /// front, back or mobile
        #[arg(short, long)]
        role: Role,
    },

    /// Continue the player's most recent game
    Resume {
        #[arg(short, long)]
        name: String,
    },

    /// Print the leaderboard
    Scores,

    /// List a player's games, most recent first
    History {
        #[arg(short, long)]
        name: String,
    },

    /// Write the leaderboard to a text file
    Export {
        #[arg(short, long, default_value = "classement_clavier_dor.txt")]
        out: PathBuf,
    },

    /// Create the database and insert the question catalog
    Seed,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_url = cli
        .db
        .as_deref()
        .map_or_else(db::default_db_url, db::normalize_sqlite_url);
    let pool = cli
        .seed
        .map_or_else(QuestionPool::from_os_rng, QuestionPool::seeded);
    let clock = Clock::default_clock();

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    db::prepare_sqlite_file(&db_url)?;
    let app_services = AppServices::new_sqlite(&db_url, clock, pool)
        .await
        .with_context(|| format!("opening {db_url}"))?;
    tracing::debug!(db = %db_url, seeded = app_services.seeded(), "storage ready");
    let game = app_services.game();

    match cli.command {
        Commands::Play { name, role } => {
            let state = game.start_new_game(&name, role).await?;
            play::run(&game, state).await
        }
        Commands::Resume { name } => match game.resume_last_game(&name).await? {
            Some(state) => play::run(&game, state).await,
            None => {
                println!("Aucune partie trouvée pour {}.", name.trim());
                Ok(())
            }
        },
        Commands::Scores => {
            let scores = game.list_scores().await?;
            if scores.is_empty() {
                println!("Aucun score enregistré.");
            } else {
                println!("{}", scores_table(&scores));
            }
            Ok(())
        }
        Commands::History { name } => {
            let sessions = game.list_history(&name).await?;
            if sessions.is_empty() {
                println!("Aucune partie trouvée pour {}.", name.trim());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Partie", "Date", "Étape", "Score", "Terminée"]);
            for session in &sessions {
                table.add_row(vec![
                    session.id().to_string(),
                    session.started_at().format("%d/%m/%Y %H:%M").to_string(),
                    stage_label(session.stage()).to_owned(),
                    session.score().to_string(),
                    if session.is_completed() { "oui" } else { "non" }.to_owned(),
                ]);
            }
            println!("{table}");
            Ok(())
        }
        Commands::Export { out } => {
            let scores = game.list_scores().await?;
            let path = export_scores(&out, &scores, clock.now())?;
            println!("Classement exporté vers {}", path.display());
            Ok(())
        }
        Commands::Seed => {
            match app_services.seeded() {
                0 => println!("Catalogue déjà présent."),
                n => println!("{n} questions ajoutées."),
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run(Cli::parse()).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn play_parses_role() {
        let cli = Cli::try_parse_from(["clavier", "play", "-n", "Alice", "-r", "Mobile"]).unwrap();
        match cli.command {
            Commands::Play { name, role } => {
                assert_eq!(name, "Alice");
                assert_eq!(role, Role::Mobile);
            }
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Cli::try_parse_from(["clavier", "play", "-n", "Alice", "-r", "qa"]).is_err());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["clavier", "scores", "--seed", "7", "--db", "x.db"]).unwrap();
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.db.as_deref(), Some("x.db"));
    }
}
