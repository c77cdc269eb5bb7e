use clap::{Parser, Subcommand, ValueEnum};

use crate::db::models::Team;
use crate::engine::Method;
use crate::game::rules;

/// Rook score keeper with historical win-probability estimation
#[derive(Parser, Debug, Clone)]
#[command(name = "rook-scorekeeper", version, about)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "ROOK_DATABASE_PATH", default_value = "rook.db")]
    pub database_path: String,

    /// Win-probability estimation method
    #[arg(long, env = "ROOK_WIN_PROB_METHOD", value_enum, default_value = "simple")]
    pub method: Method,

    /// House rule: the game can only be won by the bidding team making its
    /// bid (setting the bidder at 500+ no longer ends the game)
    #[arg(long, env = "ROOK_MUST_WIN_BY_BID", default_value = "false")]
    pub must_win_by_bid: bool,

    /// Table-talk penalty style
    #[arg(
        long,
        env = "ROOK_TABLE_TALK_PENALTY",
        value_enum,
        default_value = "set-points"
    )]
    pub table_talk_penalty: PenaltyMode,

    /// Points docked by a set-points table-talk penalty
    #[arg(long, env = "ROOK_TABLE_TALK_PENALTY_POINTS", default_value = "180")]
    pub table_talk_penalty_points: i32,

    #[command(subcommand)]
    pub command: Command,
}

/// How a table-talk flag is penalized: a flat configured amount, or the
/// bid that was in play when the talking happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PenaltyMode {
    SetPoints,
    LoseBid,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start a new game (replaces any unfinished active game)
    Start {
        /// Name for the "us" side
        #[arg(long, default_value = "Us")]
        us: String,
        /// Name for the "dem" side
        #[arg(long, default_value = "Dem")]
        dem: String,
        /// Starting total for the "us" side (handicap games)
        #[arg(long, default_value = "0")]
        starting_us: i32,
        /// Starting total for the "dem" side
        #[arg(long, default_value = "0")]
        starting_dem: i32,
    },
    /// Record a completed round
    Round {
        /// Team that won the bid
        #[arg(long, value_enum)]
        bidder: Team,
        /// Winning bid (multiple of 5; 5-180 or 360)
        #[arg(long)]
        bid: i32,
        /// Points taken (0-180 in steps of 5, or 360 for the sweep)
        #[arg(long)]
        points: i32,
        /// The entered points belong to the bidding team (default: they
        /// were counted for the non-bidding side)
        #[arg(long, default_value = "false")]
        bidder_points: bool,
    },
    /// Apply a table-talk penalty round against the flagged team
    Penalty {
        /// Team being flagged
        #[arg(long, value_enum)]
        team: Team,
        /// Team that holds the bid the penalty interrupts
        #[arg(long, value_enum)]
        bidder: Team,
        /// The bid in play
        #[arg(long)]
        bid: i32,
    },
    /// Take back the last round
    Undo,
    /// Restore the most recently undone round
    Redo,
    /// Show the scoreboard and win probability
    Status,
    /// Archive the active game and reset
    Save,
    /// Park the active game in the freezer
    Freeze {
        /// Freezer entry name
        #[arg(long)]
        name: Option<String>,
    },
    /// Restore a frozen game (replaces the active game)
    Resume {
        /// Freezer entry id (see `games --frozen`)
        id: i64,
    },
    /// List archived games
    Games {
        #[arg(long, default_value = "20")]
        limit: i64,
        /// List the freezer instead of the archive
        #[arg(long, default_value = "false")]
        frozen: bool,
    },
    /// Write the archive to a JSON backup file
    Export { path: String },
    /// Merge a JSON backup file into the archive
    Import { path: String },
    /// Seed the archive with synthetic completed games
    Simulate {
        /// Number of games to generate
        #[arg(long, default_value = "25")]
        games: u32,
        /// RNG seed for reproducible corpora
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Err(e) = rules::validate_points(self.table_talk_penalty_points) {
            anyhow::bail!("table_talk_penalty_points: {e}");
        }
        if self.table_talk_penalty_points <= 0 {
            anyhow::bail!("table_talk_penalty_points must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(
            std::iter::once("rook-scorekeeper").chain(args.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn defaults_match_the_original_app() {
        let config = parse(&["status"]);
        assert_eq!(config.method, Method::Simple);
        assert!(!config.must_win_by_bid);
        assert_eq!(config.table_talk_penalty, PenaltyMode::SetPoints);
        assert_eq!(config.table_talk_penalty_points, 180);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn round_arguments_parse() {
        let config = parse(&[
            "round",
            "--bidder",
            "us",
            "--bid",
            "140",
            "--points",
            "85",
        ]);
        match config.command {
            Command::Round {
                bidder,
                bid,
                points,
                bidder_points,
            } => {
                assert_eq!(bidder, Team::Us);
                assert_eq!(bid, 140);
                assert_eq!(points, 85);
                assert!(!bidder_points);
            }
            other => panic!("expected Round, got {:?}", other),
        }
    }

    #[test]
    fn invalid_penalty_points_rejected() {
        let mut config = parse(&["status"]);
        config.table_talk_penalty_points = 123;
        assert!(config.validate().is_err());
        config.table_talk_penalty_points = -5;
        assert!(config.validate().is_err());
    }
}
