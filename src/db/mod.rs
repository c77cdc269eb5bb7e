use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub mod models;
use models::{FrozenSummary, Round, SavedGame, Team, Totals, VictoryMethod};

use crate::game::GameState;

/// Thread-safe SQLite handle (single connection behind a mutex).
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent).
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Active game ──────────────────────────────────────────────────────────

    /// Load the game currently being scored, if any.
    pub fn load_active_game(&self) -> Result<Option<GameState>> {
        let conn = self.conn.lock().unwrap();
        let state: Option<String> = conn
            .query_row("SELECT state FROM active_game WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        match state {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Persist the live game, replacing any previous snapshot.
    pub fn store_active_game(&self, game: &GameState) -> Result<()> {
        let json = serde_json::to_string(game)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO active_game (id, state, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET state=excluded.state, updated_at=excluded.updated_at",
            params![json, Utc::now()],
        )?;
        Ok(())
    }

    pub fn clear_active_game(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM active_game WHERE id = 1", [])?;
        Ok(())
    }

    // ── Archive ──────────────────────────────────────────────────────────────

    /// Insert a finished game into the archive.
    pub fn insert_game(&self, game: &SavedGame) -> Result<i64> {
        let rounds_json = serde_json::to_string(&game.rounds)?;
        let winner = game.winner.map(|t| t.to_string());
        let victory_method = game.victory_method.map(|m| m.to_string());
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO games (
                us_team, dem_team, winner, victory_method,
                final_us, final_dem, starting_us, starting_dem,
                duration_ms, finished_at, rounds
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
            params![
                game.us_team_name,
                game.dem_team_name,
                winner,
                victory_method,
                game.final_score.map(|s| s.us),
                game.final_score.map(|s| s.dem),
                game.starting_totals.us,
                game.starting_totals.dem,
                game.duration_ms,
                game.timestamp,
                rounds_json,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All archived games, oldest first: the historical snapshot handed to
    /// the estimation engine.
    pub fn load_all_games(&self) -> Result<Vec<SavedGame>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_GAME} FROM games ORDER BY finished_at ASC"
        ))?;
        let games = stmt
            .query_map([], map_saved_game)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    /// Most recent archived games for listing.
    pub fn list_games(&self, limit: i64) -> Result<Vec<SavedGame>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_GAME} FROM games ORDER BY finished_at DESC LIMIT ?1"
        ))?;
        let games = stmt
            .query_map(params![limit], map_saved_game)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    pub fn count_games(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;
        Ok(count)
    }

    // ── Freezer ──────────────────────────────────────────────────────────────

    /// Park an unfinished game under a name for later resumption.
    pub fn insert_frozen(&self, name: &str, game: &GameState) -> Result<i64> {
        let json = serde_json::to_string(game)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO freezer (name, state, frozen_at) VALUES (?1, ?2, ?3)",
            params![name, json, Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_frozen(&self) -> Result<Vec<FrozenSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name, frozen_at FROM freezer ORDER BY frozen_at DESC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FrozenSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    frozen_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Remove a frozen game and return its state, or `None` when the id is
    /// unknown.
    pub fn take_frozen(&self, id: i64) -> Result<Option<GameState>> {
        let conn = self.conn.lock().unwrap();
        let state: Option<String> = conn
            .query_row(
                "SELECT state FROM freezer WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(json) = state else {
            return Ok(None);
        };
        conn.execute("DELETE FROM freezer WHERE id = ?1", params![id])?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

const SELECT_GAME: &str = "SELECT id, us_team, dem_team, winner, victory_method,
        final_us, final_dem, starting_us, starting_dem,
        duration_ms, finished_at, rounds";

fn map_saved_game(row: &rusqlite::Row<'_>) -> rusqlite::Result<SavedGame> {
    let winner: Option<String> = row.get(3)?;
    let victory_method: Option<String> = row.get(4)?;
    let final_us: Option<i32> = row.get(5)?;
    let final_dem: Option<i32> = row.get(6)?;
    let rounds_json: String = row.get(11)?;
    let rounds: Vec<Round> = serde_json::from_str(&rounds_json).unwrap_or_default();

    Ok(SavedGame {
        id: Some(row.get(0)?),
        us_team_name: row.get(1)?,
        dem_team_name: row.get(2)?,
        rounds,
        final_score: match (final_us, final_dem) {
            (Some(us), Some(dem)) => Some(Totals::new(us, dem)),
            _ => None,
        },
        starting_totals: Totals::new(row.get(7)?, row.get(8)?),
        winner: winner.and_then(parse_team),
        victory_method: victory_method.and_then(parse_victory_method),
        timestamp: row.get(10)?,
        duration_ms: row.get(9)?,
    })
}

fn parse_team(s: String) -> Option<Team> {
    match s.as_str() {
        "us" => Some(Team::Us),
        "dem" => Some(Team::Dem),
        _ => None,
    }
}

fn parse_victory_method(s: String) -> Option<VictoryMethod> {
    match s.as_str() {
        "1000 Point Spread" => Some(VictoryMethod::ThousandPointSpread),
        "Set Other Team" => Some(VictoryMethod::SetOtherTeam),
        "Won on Bid" => Some(VictoryMethod::WonOnBid),
        _ => None,
    }
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS games (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    us_team         TEXT NOT NULL,
    dem_team        TEXT NOT NULL,
    winner          TEXT,
    victory_method  TEXT,
    final_us        INTEGER,
    final_dem       INTEGER,
    starting_us     INTEGER NOT NULL DEFAULT 0,
    starting_dem    INTEGER NOT NULL DEFAULT 0,
    duration_ms     INTEGER,
    finished_at     TEXT NOT NULL,
    rounds          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_games_finished_at ON games(finished_at);

CREATE TABLE IF NOT EXISTS freezer (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    state       TEXT NOT NULL,
    frozen_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS active_game (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    state       TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
";
