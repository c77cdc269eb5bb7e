//! Live game state: the ordered round sequence, the redo stack, and the
//! victory bookkeeping that goes with them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Round, SavedGame, Team, Totals, VictoryMethod};

use super::rules::{detect_victory, RulesError, Verdict};

/// The game currently being scored. Persisted between invocations as a
/// single JSON blob; rounds are append-only during play, with undo/redo
/// moving rounds between `rounds` and `undone_rounds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default = "GameState::default_us_name")]
    pub us_team_name: String,
    #[serde(default = "GameState::default_dem_name")]
    pub dem_team_name: String,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub undone_rounds: Vec<Round>,
    #[serde(default)]
    pub starting_totals: Totals,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victory_method: Option<VictoryMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl GameState {
    fn default_us_name() -> String {
        "Us".to_string()
    }

    fn default_dem_name() -> String {
        "Dem".to_string()
    }

    pub fn new(us_team_name: String, dem_team_name: String, starting_totals: Totals) -> Self {
        GameState {
            us_team_name,
            dem_team_name,
            rounds: Vec::new(),
            undone_rounds: Vec::new(),
            starting_totals,
            game_over: false,
            winner: None,
            victory_method: None,
            started_at: None,
        }
    }

    pub fn rounds_played(&self) -> usize {
        self.rounds.len()
    }

    /// Totals after the most recent round, or the starting totals before
    /// any round has been scored. Rounds missing their running totals
    /// coerce to the starting totals rather than failing.
    pub fn current_totals(&self) -> Totals {
        self.rounds
            .last()
            .and_then(|r| r.running_totals)
            .unwrap_or(self.starting_totals)
    }

    /// Append a round and evaluate victory. Any redoable rounds are
    /// discarded: the timeline has diverged.
    pub fn push_round(&mut self, round: Round, must_win_by_bid: bool) -> Verdict {
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        let totals = round.running_totals.unwrap_or(self.starting_totals);
        let verdict = detect_victory(&round, totals, must_win_by_bid);
        self.rounds.push(round);
        self.undone_rounds.clear();
        self.apply_verdict(verdict);
        verdict
    }

    /// Pop the last round onto the redo stack. Clears any game-over state;
    /// undoing the final remaining round also resets the game clock.
    pub fn undo(&mut self) -> Result<Round, RulesError> {
        let round = self.rounds.pop().ok_or(RulesError::NothingToUndo)?;
        self.undone_rounds.push(round.clone());
        self.game_over = false;
        self.winner = None;
        self.victory_method = None;
        if self.rounds.is_empty() {
            self.started_at = None;
        }
        Ok(round)
    }

    /// Re-push the most recently undone round and re-run victory detection
    /// against its recorded totals.
    pub fn redo(&mut self, must_win_by_bid: bool) -> Result<Verdict, RulesError> {
        let round = self.undone_rounds.pop().ok_or(RulesError::NothingToRedo)?;
        let totals = round.running_totals.unwrap_or(self.starting_totals);
        let verdict = detect_victory(&round, totals, must_win_by_bid);
        self.rounds.push(round);
        self.apply_verdict(verdict);
        Ok(verdict)
    }

    fn apply_verdict(&mut self, verdict: Verdict) {
        if verdict.game_over {
            self.game_over = true;
            self.winner = verdict.winner;
            self.victory_method = verdict.victory_method;
        } else {
            self.game_over = false;
            self.winner = None;
            self.victory_method = None;
        }
    }

    /// Snapshot this game as an archive record. The final score is the
    /// current totals; `winner` stays empty for games saved mid-play.
    pub fn to_saved_game(&self, now: DateTime<Utc>) -> SavedGame {
        let duration_ms = self
            .started_at
            .map(|started| (now - started).num_milliseconds().max(0));
        SavedGame {
            id: None,
            us_team_name: self.us_team_name.clone(),
            dem_team_name: self.dem_team_name.clone(),
            rounds: self.rounds.clone(),
            final_score: Some(self.current_totals()),
            starting_totals: self.starting_totals,
            winner: self.winner,
            victory_method: self.victory_method,
            timestamp: now,
            duration_ms,
        }
    }
}
