//! Win-probability estimation engine.
//!
//! Two interchangeable estimators behind one interface: a heuristic linear
//! blend (`simple`, the default) and a credibility-weighted combination of
//! historical outcomes with a calibrated logistic model (`complex`). Both
//! consume a read-only snapshot of the live game plus the archive of
//! completed games and produce a percentage pair.

pub mod blend;
pub mod bucket;
pub mod index;
pub mod logistic;
pub mod simple;

use chrono::Utc;
use clap::ValueEnum;

use crate::db::models::SavedGame;
use crate::game::GameState;

pub use index::IndexCache;

/// Which estimator to run. Stored preference in the original app; here an
/// explicit configuration value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Method {
    #[default]
    Simple,
    Complex,
}

/// Estimated chance each team wins, as display percentages.
///
/// `us + dem` is 100 for the simple method; the complex method rounds both
/// sides independently to one decimal, so the pair may be off by up to a
/// tenth of a point.
#[derive(Debug, Clone, PartialEq)]
pub struct WinProbability {
    pub us: f64,
    pub dem: f64,
    /// Explanation breakdown; populated by the simple method only, and
    /// never fed back into any computation.
    pub factors: Vec<Factor>,
}

/// One named contribution to the simple estimate, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub name: &'static str,
    pub value: i32,
    pub description: String,
}

/// Method dispatch plus the index cache the complex estimator memoizes
/// through. Owns all estimator state; nothing lives in globals.
#[derive(Debug, Default)]
pub struct Estimator {
    method: Method,
    cache: IndexCache,
}

impl Estimator {
    pub fn new(method: Method) -> Self {
        Estimator {
            method,
            cache: IndexCache::default(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Estimate win probability for the current game against the supplied
    /// historical snapshot.
    pub fn estimate(&mut self, game: &GameState, historical: &[SavedGame]) -> WinProbability {
        match self.method {
            Method::Simple => simple::estimate_simple(game, historical),
            Method::Complex => {
                blend::estimate_complex(game, historical, &mut self.cache, Utc::now())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Round, Team, Totals};
    use approx::assert_relative_eq;

    fn one_round_game(us: i32, dem: i32) -> GameState {
        let mut game = GameState::new("Us".into(), "Dem".into(), Totals::default());
        game.rounds = vec![Round {
            bidding_team: Team::Us,
            bid_amount: 100,
            us_points: us,
            dem_points: dem,
            running_totals: Some(Totals::new(us, dem)),
            penalty_points: None,
        }];
        game
    }

    #[test]
    fn default_method_is_simple() {
        assert_eq!(Method::default(), Method::Simple);
        assert_eq!(Estimator::default().method(), Method::Simple);
    }

    #[test]
    fn selector_dispatches_to_the_configured_estimator() {
        let game = one_round_game(120, 60);

        // Simple: 50 + 60/15 = 54 with no history, and factors attached.
        let mut simple = Estimator::new(Method::Simple);
        let prob = simple.estimate(&game, &[]);
        assert_relative_eq!(prob.us, 54.0, epsilon = 1e-9);
        assert_eq!(prob.factors.len(), 4);

        // Complex: rounded to one decimal, no factors.
        let mut complex = Estimator::new(Method::Complex);
        let prob = complex.estimate(&game, &[]);
        assert!(prob.factors.is_empty());
        assert_relative_eq!(prob.us, (prob.us * 10.0).round() / 10.0, epsilon = 1e-12);
        assert!(prob.us != 54.0);
    }

    #[test]
    fn both_methods_agree_on_an_empty_game() {
        let game = GameState::new("Us".into(), "Dem".into(), Totals::default());
        for method in [Method::Simple, Method::Complex] {
            let mut estimator = Estimator::new(method);
            let prob = estimator.estimate(&game, &[]);
            assert_relative_eq!(prob.us, 50.0, epsilon = 1e-12);
            assert_relative_eq!(prob.dem, 50.0, epsilon = 1e-12);
        }
    }
}
