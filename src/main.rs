use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod commands;
mod config;
mod db;
mod engine;
mod game;

use config::{Command, Config};
use db::Database;

fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    debug!("Database opened: {}", config.database_path);

    match config.command.clone() {
        Command::Start {
            us,
            dem,
            starting_us,
            starting_dem,
        } => commands::start(&db, us, dem, starting_us, starting_dem),
        Command::Round {
            bidder,
            bid,
            points,
            bidder_points,
        } => commands::record_round(&config, &db, bidder, bid, points, bidder_points),
        Command::Penalty { team, bidder, bid } => {
            commands::penalty(&config, &db, team, bidder, bid)
        }
        Command::Undo => commands::undo(&db),
        Command::Redo => commands::redo(&config, &db),
        Command::Status => commands::status(&config, &db),
        Command::Save => commands::save(&db),
        Command::Freeze { name } => commands::freeze(&db, name),
        Command::Resume { id } => commands::resume(&db, id),
        Command::Games { limit, frozen } => commands::games(&db, limit, frozen),
        Command::Export { path } => commands::export(&db, &path),
        Command::Import { path } => commands::import(&db, &path),
        Command::Simulate { games, seed } => commands::simulate(&db, games, seed),
    }
}
