//! Credibility-weighted blend of the historical index and the logistic
//! model. The more past games have passed through the current situation,
//! the more the empirical record is trusted over the model.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::models::SavedGame;
use crate::game::GameState;

use super::bucket::bucket;
use super::index::IndexCache;
use super::logistic::logistic_prob;
use super::WinProbability;

/// Observation count at which the empirical record is trusted fully.
const CONFIDENCE_OBSERVATIONS: f64 = 30.0;

pub fn estimate_complex(
    game: &GameState,
    historical: &[SavedGame],
    cache: &mut IndexCache,
    now: DateTime<Utc>,
) -> WinProbability {
    let rounds = &game.rounds;
    if rounds.is_empty() {
        return WinProbability {
            us: 50.0,
            dem: 50.0,
            factors: Vec::new(),
        };
    }

    let round_index = rounds.len() - 1;
    let current = rounds
        .last()
        .and_then(|r| r.running_totals)
        .unwrap_or_default();
    let current_diff = current.diff();

    let index = cache.get_or_build(historical, now);
    let counts = index.counts(round_index, bucket(current_diff));
    let empirical_us = counts.empirical_us();
    let observations = counts.observations();

    // Momentum against the previous round, with an implicit 0/0 baseline
    // before the first round.
    let prev_diff = if rounds.len() > 1 {
        rounds[rounds.len() - 2]
            .running_totals
            .unwrap_or_default()
            .diff()
    } else {
        0
    };
    let momentum = current_diff - prev_diff;

    let model_us = logistic_prob(current_diff as f64, round_index, momentum as f64);

    let beta = ((observations + 1.0).ln() / (CONFIDENCE_OBSERVATIONS + 1.0).ln()).min(1.0);
    let blended_us = beta * empirical_us + (1.0 - beta) * model_us;

    debug!(
        round_index,
        current_diff,
        momentum,
        observations,
        beta,
        empirical_us,
        model_us,
        "blended win probability"
    );

    // Both sides round independently to one decimal of a percent; they may
    // fail to sum to exactly 100.0 and that is accepted behavior.
    WinProbability {
        us: round_one_decimal(blended_us * 100.0),
        dem: round_one_decimal((1.0 - blended_us) * 100.0),
        factors: Vec::new(),
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
