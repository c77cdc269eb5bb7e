//! Heuristic win-probability estimate: a linear blend of score
//! differential, recent momentum, historical comeback rate, and bid
//! aggressiveness. Cheap, explainable, and the default method.

use crate::db::models::{SavedGame, Team};
use crate::game::rules::HIGH_BID_THRESHOLD;
use crate::game::GameState;

use super::{Factor, WinProbability};

/// Percentage points of win probability per 15 points of score lead.
const DIFF_SCALE: f64 = 15.0;
/// Rounds considered for the momentum factor.
const MOMENTUM_WINDOW: usize = 3;
/// Flat swing applied by the momentum and bid-strength factors.
const FACTOR_SWING: i32 = 2;

pub fn estimate_simple(game: &GameState, historical: &[SavedGame]) -> WinProbability {
    let rounds = &game.rounds;
    if rounds.is_empty() {
        return WinProbability {
            us: 50.0,
            dem: 50.0,
            factors: Vec::new(),
        };
    }

    let rounds_played = rounds.len();
    let current = rounds
        .last()
        .and_then(|r| r.running_totals)
        .unwrap_or_default();
    let score_diff = current.diff();

    let base_prob = 50.0 + score_diff as f64 / DIFF_SCALE;

    // Historical games that reached at least this many rounds tell us how
    // often the team leading here went on to lose.
    let relevant: Vec<&SavedGame> = historical
        .iter()
        .filter(|g| {
            !g.rounds.is_empty() && g.rounds.len() >= rounds_played && g.final_score.is_some()
        })
        .collect();

    let mut comeback_count = 0u32;
    let mut similar_situations = 0u32;
    for g in &relevant {
        // Games that ended exactly here have no "rest of the game" to
        // learn a comeback from.
        if g.rounds.len() <= rounds_played {
            continue;
        }
        let Some(totals) = g.rounds[rounds_played - 1].running_totals else {
            continue;
        };
        let Some(final_score) = g.final_score else {
            continue;
        };
        if totals.leader() != final_score.leader() {
            comeback_count += 1;
        }
        similar_situations += 1;
    }
    let comeback_factor = if similar_situations > 0 {
        let rate = f64::from(comeback_count) / f64::from(similar_situations);
        (rate * 10.0).round() as i32
    } else {
        0
    };

    let momentum_factor = if rounds_played >= MOMENTUM_WINDOW {
        let recent = &rounds[rounds_played - MOMENTUM_WINDOW..];
        let us: i32 = recent.iter().map(|r| r.us_points).sum();
        let dem: i32 = recent.iter().map(|r| r.dem_points).sum();
        match us.cmp(&dem) {
            std::cmp::Ordering::Greater => FACTOR_SWING,
            std::cmp::Ordering::Less => -FACTOR_SWING,
            std::cmp::Ordering::Equal => 0,
        }
    } else {
        0
    };

    let us_high_bids = rounds
        .iter()
        .filter(|r| r.bidding_team == Team::Us && r.bid_amount >= HIGH_BID_THRESHOLD)
        .count();
    let dem_high_bids = rounds
        .iter()
        .filter(|r| r.bidding_team == Team::Dem && r.bid_amount >= HIGH_BID_THRESHOLD)
        .count();
    let bid_strength_factor = match us_high_bids.cmp(&dem_high_bids) {
        std::cmp::Ordering::Greater => FACTOR_SWING,
        std::cmp::Ordering::Less => -FACTOR_SWING,
        std::cmp::Ordering::Equal => 0,
    };

    let adjusted = (base_prob
        + f64::from(momentum_factor)
        + f64::from(comeback_factor)
        + f64::from(bid_strength_factor))
    .clamp(1.0, 99.0);

    let factors = vec![
        Factor {
            name: "Score Difference",
            value: (score_diff as f64 / 20.0).round() as i32,
            description: format!("{} point difference", score_diff.abs()),
        },
        Factor {
            name: "Momentum",
            value: momentum_factor,
            description: if momentum_factor != 0 {
                "Recent rounds trend".to_string()
            } else {
                "No clear momentum".to_string()
            },
        },
        Factor {
            name: "Comeback Tendency",
            value: comeback_factor,
            description: format!("Based on {} completed games", relevant.len()),
        },
        Factor {
            name: "Bid Strength",
            value: bid_strength_factor,
            description: format!("High bids: us ({}), dem ({})", us_high_bids, dem_high_bids),
        },
    ];

    WinProbability {
        us: adjusted,
        dem: 100.0 - adjusted,
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Round, Team, Totals};
    use approx::assert_relative_eq;
    use chrono::{Duration, Utc};

    fn round_with(bidder: Team, bid: i32, us_points: i32, dem_points: i32, totals: Totals) -> Round {
        Round {
            bidding_team: bidder,
            bid_amount: bid,
            us_points,
            dem_points,
            running_totals: Some(totals),
            penalty_points: None,
        }
    }

    fn game_with_rounds(rounds: Vec<Round>) -> GameState {
        let mut game = GameState::new("Us".into(), "Dem".into(), Totals::default());
        game.rounds = rounds;
        game
    }

    fn saved(rounds: Vec<Round>, final_score: Totals) -> SavedGame {
        SavedGame {
            id: None,
            us_team_name: "Us".into(),
            dem_team_name: "Dem".into(),
            rounds,
            final_score: Some(final_score),
            starting_totals: Totals::default(),
            winner: None,
            victory_method: None,
            timestamp: Utc::now() - Duration::days(1),
            duration_ms: None,
        }
    }

    #[test]
    fn no_rounds_is_exactly_even() {
        let game = game_with_rounds(vec![]);
        let prob = estimate_simple(&game, &[]);
        assert_relative_eq!(prob.us, 50.0, epsilon = 1e-12);
        assert_relative_eq!(prob.dem, 50.0, epsilon = 1e-12);
        assert!(prob.factors.is_empty());
    }

    #[test]
    fn lead_shifts_base_probability() {
        // 60-point lead, no history, one round: 50 + 60/15 = 54.
        let game = game_with_rounds(vec![round_with(
            Team::Us,
            100,
            120,
            60,
            Totals::new(120, 60),
        )]);
        let prob = estimate_simple(&game, &[]);
        assert_relative_eq!(prob.us, 54.0, epsilon = 1e-9);
        assert_relative_eq!(prob.dem, 46.0, epsilon = 1e-9);
        assert_eq!(prob.factors.len(), 4);
    }

    #[test]
    fn comeback_history_favors_the_trailing_team() {
        // Current game: one round, us trailing by 60.
        let game = game_with_rounds(vec![round_with(
            Team::Dem,
            100,
            60,
            120,
            Totals::new(60, 120),
        )]);

        // One comeback (dem led after round 1, us won) and one
        // front-runner win; both games longer than the current one.
        let comeback = saved(
            vec![
                round_with(Team::Dem, 100, 60, 120, Totals::new(60, 120)),
                round_with(Team::Us, 140, 145, 35, Totals::new(205, 155)),
            ],
            Totals::new(505, 355),
        );
        let wire_to_wire = saved(
            vec![
                round_with(Team::Dem, 100, 60, 120, Totals::new(60, 120)),
                round_with(Team::Dem, 100, 70, 110, Totals::new(130, 230)),
            ],
            Totals::new(330, 530),
        );

        let without = estimate_simple(&game, &[]);
        let with = estimate_simple(&game, &[comeback, wire_to_wire]);
        // Comeback rate 1/2 -> +5 on the us side.
        let comeback_factor = with
            .factors
            .iter()
            .find(|f| f.name == "Comeback Tendency")
            .unwrap();
        assert_eq!(comeback_factor.value, 5);
        assert!(with.us > without.us);
    }

    #[test]
    fn games_ending_exactly_here_add_no_comeback_signal() {
        let game = game_with_rounds(vec![round_with(
            Team::Us,
            100,
            120,
            60,
            Totals::new(120, 60),
        )]);
        // Historical game with exactly one round: counted as relevant for
        // the description, but contributes no comeback observation.
        let ended_here = saved(
            vec![round_with(Team::Us, 100, 120, 60, Totals::new(120, 60))],
            Totals::new(120, 60),
        );
        let prob = estimate_simple(&game, &[ended_here]);
        let comeback_factor = prob
            .factors
            .iter()
            .find(|f| f.name == "Comeback Tendency")
            .unwrap();
        assert_eq!(comeback_factor.value, 0);
        assert_eq!(comeback_factor.description, "Based on 1 completed games");
    }

    #[test]
    fn momentum_needs_three_rounds_and_tracks_recent_points() {
        let two_rounds = game_with_rounds(vec![
            round_with(Team::Us, 100, 120, 60, Totals::new(120, 60)),
            round_with(Team::Us, 100, 120, 60, Totals::new(240, 120)),
        ]);
        let factor = |g: &GameState| {
            estimate_simple(g, &[])
                .factors
                .iter()
                .find(|f| f.name == "Momentum")
                .unwrap()
                .value
        };
        assert_eq!(factor(&two_rounds), 0);

        let three_rounds = game_with_rounds(vec![
            round_with(Team::Us, 100, 120, 60, Totals::new(120, 60)),
            round_with(Team::Us, 100, 120, 60, Totals::new(240, 120)),
            round_with(Team::Us, 100, 120, 60, Totals::new(360, 180)),
        ]);
        assert_eq!(factor(&three_rounds), 2);

        let dem_surge = game_with_rounds(vec![
            round_with(Team::Us, 100, 120, 60, Totals::new(120, 60)),
            round_with(Team::Dem, 120, 55, 125, Totals::new(175, 185)),
            round_with(Team::Dem, 120, 55, 125, Totals::new(230, 310)),
            round_with(Team::Dem, 120, 55, 125, Totals::new(285, 435)),
        ]);
        assert_eq!(factor(&dem_surge), -2);
    }

    #[test]
    fn aggressive_bidding_swings_the_estimate() {
        let game = game_with_rounds(vec![
            round_with(Team::Us, 145, 150, 30, Totals::new(150, 30)),
            round_with(Team::Us, 140, 140, 40, Totals::new(290, 70)),
            round_with(Team::Dem, 100, 80, 100, Totals::new(370, 170)),
        ]);
        let prob = estimate_simple(&game, &[]);
        let bid_factor = prob
            .factors
            .iter()
            .find(|f| f.name == "Bid Strength")
            .unwrap();
        assert_eq!(bid_factor.value, 2);
        assert_eq!(bid_factor.description, "High bids: us (2), dem (0)");
    }

    #[test]
    fn probability_is_clamped_to_1_99() {
        let blowout = game_with_rounds(vec![round_with(
            Team::Us,
            180,
            360,
            0,
            Totals::new(900, 0),
        )]);
        let prob = estimate_simple(&blowout, &[]);
        assert_relative_eq!(prob.us, 99.0, epsilon = 1e-12);
        assert_relative_eq!(prob.dem, 1.0, epsilon = 1e-12);

        let collapse = game_with_rounds(vec![round_with(
            Team::Dem,
            180,
            0,
            360,
            Totals::new(0, 900),
        )]);
        let prob = estimate_simple(&collapse, &[]);
        assert_relative_eq!(prob.us, 1.0, epsilon = 1e-12);
    }
}
