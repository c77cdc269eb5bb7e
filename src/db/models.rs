use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One of the two Rook partnerships, labelled the way the scorepad is:
/// "us" on the left, "dem" (them) on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Us,
    Dem,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Us => Team::Dem,
            Team::Dem => Team::Us,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Us => write!(f, "us"),
            Team::Dem => write!(f, "dem"),
        }
    }
}

/// A pair of team scores: running totals, final score, or starting totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub us: i32,
    pub dem: i32,
}

impl Totals {
    pub fn new(us: i32, dem: i32) -> Self {
        Totals { us, dem }
    }

    /// Signed differential, us minus dem.
    pub fn diff(&self) -> i32 {
        self.us - self.dem
    }

    /// Leading team. An exact tie classifies as a dem lead, matching the
    /// winner classification used throughout the historical index.
    pub fn leader(&self) -> Team {
        if self.us > self.dem {
            Team::Us
        } else {
            Team::Dem
        }
    }
}

/// One completed bidding cycle.
///
/// Immutable once created; rounds are appended in play order and only ever
/// removed by undo (pop last) or restored by redo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Team that won the bid for this round.
    pub bidding_team: Team,
    /// Winning bid (multiple of 5, 5-180 or exactly 360).
    pub bid_amount: i32,
    /// Points earned this round; negative when a team was set.
    pub us_points: i32,
    pub dem_points: i32,
    /// Cumulative totals after this round. Always present for rounds this
    /// app creates; imported legacy records may lack it, and every consumer
    /// must skip or zero-coerce rather than fail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_totals: Option<Totals>,
    /// Set on table-talk penalty rounds: the amount docked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty_points: Option<i32>,
}

/// How a finished game was won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VictoryMethod {
    #[serde(rename = "1000 Point Spread")]
    ThousandPointSpread,
    #[serde(rename = "Set Other Team")]
    SetOtherTeam,
    #[serde(rename = "Won on Bid")]
    WonOnBid,
}

impl fmt::Display for VictoryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VictoryMethod::ThousandPointSpread => write!(f, "1000 Point Spread"),
            VictoryMethod::SetOtherTeam => write!(f, "Set Other Team"),
            VictoryMethod::WonOnBid => write!(f, "Won on Bid"),
        }
    }
}

/// A finished game in the archive. Field names serialize camelCase so that
/// export files stay interchangeable with the original web scorepad's
/// saved-games backups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedGame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default = "default_us_name")]
    pub us_team_name: String,
    #[serde(default = "default_dem_name")]
    pub dem_team_name: String,
    #[serde(default)]
    pub rounds: Vec<Round>,
    /// Totals when the game ended. Absent on malformed imports; games
    /// without it are excluded from all historical aggregation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<Totals>,
    #[serde(default)]
    pub starting_totals: Totals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victory_method: Option<VictoryMethod>,
    /// Completion time; drives recency weighting in the historical index.
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

fn default_us_name() -> String {
    "Us".to_string()
}

fn default_dem_name() -> String {
    "Dem".to_string()
}

/// Summary row for a parked (frozen) game.
#[derive(Debug, Clone)]
pub struct FrozenSummary {
    pub id: i64,
    pub name: String,
    pub frozen_at: DateTime<Utc>,
}
