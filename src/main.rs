use std::{fs, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::core::{db::ProjectDb, import::run_import, profile::Role, settings::Settings};

mod core;
mod error;
mod web;

#[derive(Parser, Debug)]
#[command(name = "hackjudge")]
#[command(version = "0.1")]
#[command(about = "Imports DevPost exports into a hackathon judging database.", long_about = None)]
struct Args {
    /// Location of the json settings file. Defaults are used if it does not exist.
    #[arg(short, long, default_value = "settings.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: RunType,
}

#[derive(Subcommand, Debug)]
enum RunType {
    /// Run the judging web service.
    Serve,

    /// Import a DevPost CSV export directly into the database.
    Import { file: PathBuf },

    /// Delete all imported participants, submissions and links.
    Clear {
        /// Required, this cannot be undone.
        #[arg(long)]
        yes: bool,
    },

    /// Create or update a dashboard profile and print a fresh access token for it.
    Profile {
        email: String,

        #[arg(short, long, value_enum, default_value_t = Role::Pending)]
        role: Role,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::load(&args.settings)?;
    let db = ProjectDb::load(&settings.database_file())
        .await
        .with_context(|| format!("Failed to open {}", settings.database_file().display()))?;

    match args.command {
        RunType::Serve => {
            web::run_http_server(Arc::new(db), Arc::new(settings)).await?;
        }
        RunType::Import { file } => {
            let bytes =
                fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let summary = run_import(&db, bytes).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        RunType::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to clear imported data without --yes");
            }
            let cleared = db.clear_import_data().await?;
            println!("{}", serde_json::to_string_pretty(&cleared)?);
        }
        RunType::Profile { email, role } => {
            let profile = db.upsert_profile(&email, role).await?;
            let token = db.issue_token(profile.id).await?;
            log::info!("Issued token for {} ({:?})", profile.email, role);
            println!("{}", token);
        }
    }

    Ok(())
}
