//! Historical outcome index: recency-weighted win counts keyed by game
//! situation (round index × bucketed score differential).

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

use crate::db::models::{SavedGame, Team};

use super::bucket::bucket;

/// Exponential recency decay: a game this many days old contributes
/// `DECAY_RATE` times the weight of one finished just now.
const DECAY_HALF_PERIOD_DAYS: f64 = 14.0;
const DECAY_RATE: f64 = 0.8;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Weighted win counts for one situation. Both counters start at the
/// Laplace prior of 1.0 and never drop below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeWeights {
    pub us: f64,
    pub dem: f64,
}

impl Default for OutcomeWeights {
    fn default() -> Self {
        OutcomeWeights { us: 1.0, dem: 1.0 }
    }
}

impl OutcomeWeights {
    /// Empirical probability that us wins from this situation.
    pub fn empirical_us(&self) -> f64 {
        self.us / (self.us + self.dem)
    }

    /// Weighted observation count with the Laplace prior subtracted out.
    /// Fractional values are normal: recency weighting scales each game's
    /// contribution below 1.
    pub fn observations(&self) -> f64 {
        (self.us - 1.0) + (self.dem - 1.0)
    }
}

/// Frequency table over `(round_index, bucket)` situations.
#[derive(Debug, Clone, Default)]
pub struct ProbabilityIndex {
    table: HashMap<(usize, i32), OutcomeWeights>,
}

impl ProbabilityIndex {
    fn add(&mut self, round_index: usize, bucketed_diff: i32, winner: Team, weight: f64) {
        let counts = self.table.entry((round_index, bucketed_diff)).or_default();
        match winner {
            Team::Us => counts.us += weight,
            Team::Dem => counts.dem += weight,
        }
    }

    /// Counts for a situation, falling back to the uninformed prior when
    /// no historical game has passed through it.
    pub fn counts(&self, round_index: usize, bucketed_diff: i32) -> OutcomeWeights {
        self.table
            .get(&(round_index, bucketed_diff))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Aggregate a historical-game snapshot into a fresh index.
///
/// Games without rounds or without a final score are excluded; individual
/// rounds lacking running totals are skipped without discarding the rest of
/// their game. `now` anchors the recency weighting.
pub fn build_index(games: &[SavedGame], now: DateTime<Utc>) -> ProbabilityIndex {
    let mut index = ProbabilityIndex::default();

    for game in games {
        if game.rounds.is_empty() {
            continue;
        }
        let Some(final_score) = game.final_score else {
            continue;
        };
        let winner = final_score.leader();

        let age_days = (now - game.timestamp).num_milliseconds() as f64 / MILLIS_PER_DAY;
        let weight = DECAY_RATE.powf(age_days / DECAY_HALF_PERIOD_DAYS);

        for (idx, round) in game.rounds.iter().enumerate() {
            let Some(totals) = round.running_totals else {
                continue;
            };
            index.add(idx, bucket(totals.diff()), winner, weight);
        }
    }

    index
}

/// Memoized index keyed by a content fingerprint of the historical list,
/// so two different archives of equal length never share an entry. Owned
/// by the estimator; there is no process-global cache.
#[derive(Debug, Default)]
pub struct IndexCache {
    fingerprint: Option<u64>,
    index: ProbabilityIndex,
}

impl IndexCache {
    /// Return the cached index when the snapshot is unchanged, rebuilding
    /// otherwise. Rebuilds are cheap at realistic archive sizes, so the
    /// cache only has to win the common repeated-call case.
    pub fn get_or_build(&mut self, games: &[SavedGame], now: DateTime<Utc>) -> &ProbabilityIndex {
        let fingerprint = Self::fingerprint(games);
        if self.fingerprint != Some(fingerprint) {
            self.index = build_index(games, now);
            self.fingerprint = Some(fingerprint);
        }
        &self.index
    }

    fn fingerprint(games: &[SavedGame]) -> u64 {
        let mut hasher = DefaultHasher::new();
        games.len().hash(&mut hasher);
        for game in games {
            game.timestamp.timestamp_millis().hash(&mut hasher);
            if let Some(fs) = game.final_score {
                fs.us.hash(&mut hasher);
                fs.dem.hash(&mut hasher);
            }
            game.rounds.len().hash(&mut hasher);
        }
        hasher.finish()
    }
}
