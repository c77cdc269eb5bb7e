//! Rook scoring rules: bid/points validation, hand settlement, and victory
//! detection.

use thiserror::Error;

use crate::db::models::{Round, Team, Totals, VictoryMethod};

/// Points distributed in a normal hand (excluding the Rook-capture sweep).
pub const HAND_POINTS: i32 = 180;
/// A team that captures every trick plus the Rook claims the full sweep.
pub const SWEEP_POINTS: i32 = 360;
/// A team must reach this total (with its bid made) to win.
pub const WINNING_SCORE: i32 = 500;
/// A lead this wide ends the game outright.
pub const SPREAD_LIMIT: i32 = 1000;
/// Bids at or above this count as aggressive in the estimator's
/// bid-strength factor.
pub const HIGH_BID_THRESHOLD: i32 = 140;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("bid must be greater than zero")]
    BidNotPositive,
    #[error("bid must be a multiple of 5")]
    BidNotMultipleOfFive,
    #[error("bid cannot exceed 360")]
    BidTooHigh,
    #[error("bids between 180 and 360 are not allowed")]
    BidInForbiddenRange,
    #[error("points must be a multiple of 5")]
    PointsNotMultipleOfFive,
    #[error("points must be 0-180 or exactly 360")]
    PointsOutOfRange,
    #[error("no active game; run `start` first")]
    NoActiveGame,
    #[error("the game is already over")]
    GameOver,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
}

pub fn validate_bid(bid: i32) -> Result<(), RulesError> {
    if bid <= 0 {
        return Err(RulesError::BidNotPositive);
    }
    if bid % 5 != 0 {
        return Err(RulesError::BidNotMultipleOfFive);
    }
    if bid > SWEEP_POINTS {
        return Err(RulesError::BidTooHigh);
    }
    if bid > HAND_POINTS && bid < SWEEP_POINTS {
        return Err(RulesError::BidInForbiddenRange);
    }
    Ok(())
}

pub fn validate_points(points: i32) -> Result<(), RulesError> {
    if points % 5 != 0 {
        return Err(RulesError::PointsNotMultipleOfFive);
    }
    if points != SWEEP_POINTS && !(0..=HAND_POINTS).contains(&points) {
        return Err(RulesError::PointsOutOfRange);
    }
    Ok(())
}

/// Distribute a hand's points between the teams.
///
/// `points` were entered for the bidding team when `for_bidding_team`,
/// otherwise for its opponents; the other side receives the remainder of
/// the 180-point hand. A 360 entry is the sweep: the sweeping team takes
/// everything, and a swept bidding team is set for its bid. After
/// distribution, a bidding team short of its bid is set: its earnings
/// become the negated bid.
///
/// Returns `(us_points, dem_points)` earned this round.
pub fn settle(
    bidding_team: Team,
    bid: i32,
    points: i32,
    for_bidding_team: bool,
) -> (i32, i32) {
    if points == SWEEP_POINTS {
        return match (bidding_team, for_bidding_team) {
            (Team::Us, true) => (SWEEP_POINTS, 0),
            (Team::Dem, true) => (0, SWEEP_POINTS),
            (Team::Us, false) => (-bid, SWEEP_POINTS),
            (Team::Dem, false) => (SWEEP_POINTS, -bid),
        };
    }

    let entered_team = if for_bidding_team {
        bidding_team
    } else {
        bidding_team.opponent()
    };
    let (mut us_earned, mut dem_earned) = match entered_team {
        Team::Us => (points, HAND_POINTS - points),
        Team::Dem => (HAND_POINTS - points, points),
    };

    // Bid not met: the bidding team goes set.
    match bidding_team {
        Team::Us if us_earned < bid => us_earned = -bid,
        Team::Dem if dem_earned < bid => dem_earned = -bid,
        _ => {}
    }

    (us_earned, dem_earned)
}

/// Outcome of victory detection after a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verdict {
    pub game_over: bool,
    pub winner: Option<Team>,
    pub victory_method: Option<VictoryMethod>,
}

impl Verdict {
    fn win(winner: Team, method: VictoryMethod) -> Self {
        Verdict {
            game_over: true,
            winner: Some(winner),
            victory_method: Some(method),
        }
    }
}

/// Evaluate whether the game ends on this round.
///
/// Checked in order: a 1000-point spread ends the game for the leader; a
/// set bidding team whose opponents sit at 500+ loses (suppressed by the
/// must-win-by-bid house rule); a bidding team at 500+ that made its bid
/// wins. Merely crossing 500 never ends the game.
pub fn detect_victory(round: &Round, totals: Totals, must_win_by_bid: bool) -> Verdict {
    let (bidder_earned, opponent_total, bidder_total) = match round.bidding_team {
        Team::Us => (round.us_points, totals.dem, totals.us),
        Team::Dem => (round.dem_points, totals.us, totals.dem),
    };

    if totals.diff().abs() >= SPREAD_LIMIT {
        return Verdict::win(totals.leader(), VictoryMethod::ThousandPointSpread);
    }

    if bidder_earned < 0 && opponent_total >= WINNING_SCORE {
        if !must_win_by_bid {
            return Verdict::win(
                round.bidding_team.opponent(),
                VictoryMethod::SetOtherTeam,
            );
        }
        return Verdict::default();
    }

    if bidder_total >= WINNING_SCORE && bidder_earned >= round.bid_amount {
        return Verdict::win(round.bidding_team, VictoryMethod::WonOnBid);
    }

    Verdict::default()
}

/// Build a table-talk penalty round: the flagged team is docked
/// `penalty_points`, the other side earns nothing, and the round keeps the
/// bid context it interrupted.
pub fn penalty_round(
    bidding_team: Team,
    bid: i32,
    flagged: Team,
    penalty_points: i32,
    previous_totals: Totals,
) -> Round {
    let (us_earned, dem_earned) = match flagged {
        Team::Us => (-penalty_points, 0),
        Team::Dem => (0, -penalty_points),
    };
    Round {
        bidding_team,
        bid_amount: bid,
        us_points: us_earned,
        dem_points: dem_earned,
        running_totals: Some(Totals::new(
            previous_totals.us + us_earned,
            previous_totals.dem + dem_earned,
        )),
        penalty_points: Some(penalty_points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(bidding_team: Team, bid: i32, us_points: i32, dem_points: i32) -> Round {
        Round {
            bidding_team,
            bid_amount: bid,
            us_points,
            dem_points,
            running_totals: None,
            penalty_points: None,
        }
    }

    #[test]
    fn bid_validation() {
        assert_eq!(validate_bid(0), Err(RulesError::BidNotPositive));
        assert_eq!(validate_bid(-5), Err(RulesError::BidNotPositive));
        assert_eq!(validate_bid(101), Err(RulesError::BidNotMultipleOfFive));
        assert_eq!(validate_bid(365), Err(RulesError::BidTooHigh));
        assert_eq!(validate_bid(185), Err(RulesError::BidInForbiddenRange));
        assert_eq!(validate_bid(355), Err(RulesError::BidInForbiddenRange));
        assert_eq!(validate_bid(5), Ok(()));
        assert_eq!(validate_bid(180), Ok(()));
        assert_eq!(validate_bid(360), Ok(()));
    }

    #[test]
    fn points_validation() {
        assert_eq!(validate_points(0), Ok(()));
        assert_eq!(validate_points(180), Ok(()));
        assert_eq!(validate_points(360), Ok(()));
        assert_eq!(validate_points(-5), Err(RulesError::PointsOutOfRange));
        assert_eq!(validate_points(185), Err(RulesError::PointsOutOfRange));
        assert_eq!(validate_points(123), Err(RulesError::PointsNotMultipleOfFive));
    }

    #[test]
    fn settle_standard_hand() {
        // Dem bid 100; 80 entered for the non-bidding side (us).
        assert_eq!(settle(Team::Dem, 100, 80, false), (80, 100));
        // Us bid 140 and the 145 entered is theirs; dem takes the rest.
        assert_eq!(settle(Team::Us, 140, 145, true), (145, 35));
    }

    #[test]
    fn settle_sets_bidder_short_of_bid() {
        // Us bid 140 but only took 120: set for -140, dem keeps its 60.
        assert_eq!(settle(Team::Us, 140, 120, true), (-140, 60));
        // Same hand entered from the dem side.
        assert_eq!(settle(Team::Us, 140, 60, false), (-140, 60));
    }

    #[test]
    fn settle_sweep_for_bidder() {
        assert_eq!(settle(Team::Us, 180, 360, true), (360, 0));
        assert_eq!(settle(Team::Dem, 120, 360, true), (0, 360));
    }

    #[test]
    fn settle_sweep_against_bidder_sets_them() {
        assert_eq!(settle(Team::Us, 120, 360, false), (-120, 360));
        assert_eq!(settle(Team::Dem, 145, 360, false), (360, -145));
    }

    #[test]
    fn victory_requires_bid_made_at_500() {
        // Us reach 500 but fell short of the bid: set, no win.
        let r = round(Team::Us, 140, -140, 60);
        let v = detect_victory(&r, Totals::new(520, 230), false);
        assert!(!v.game_over);

        // Us reach 500 with the bid made.
        let r = round(Team::Us, 140, 145, 35);
        let v = detect_victory(&r, Totals::new(520, 230), false);
        assert_eq!(v.winner, Some(Team::Us));
        assert_eq!(v.victory_method, Some(VictoryMethod::WonOnBid));
    }

    #[test]
    fn crossing_500_alone_is_not_a_win() {
        // Non-bidding us drift past 500 on defensive points while dem make
        // their bid: nobody wins yet.
        let r = round(Team::Dem, 140, 40, 140);
        let v = detect_victory(&r, Totals::new(505, 450), false);
        assert!(!v.game_over);
    }

    #[test]
    fn setting_the_bidder_at_500_wins() {
        let r = round(Team::Dem, 140, 60, -140);
        let v = detect_victory(&r, Totals::new(510, 250), false);
        assert_eq!(v.winner, Some(Team::Us));
        assert_eq!(v.victory_method, Some(VictoryMethod::SetOtherTeam));
    }

    #[test]
    fn must_win_by_bid_suppresses_set_victory() {
        let r = round(Team::Dem, 140, 60, -140);
        let v = detect_victory(&r, Totals::new(510, 250), true);
        assert!(!v.game_over);
    }

    #[test]
    fn thousand_point_spread_ends_the_game() {
        let r = round(Team::Us, 100, 100, 80);
        let v = detect_victory(&r, Totals::new(700, -350), true);
        assert_eq!(v.winner, Some(Team::Us));
        assert_eq!(v.victory_method, Some(VictoryMethod::ThousandPointSpread));
    }

    #[test]
    fn penalty_round_docks_flagged_team() {
        let r = penalty_round(Team::Us, 140, Team::Dem, 180, Totals::new(200, 150));
        assert_eq!(r.us_points, 0);
        assert_eq!(r.dem_points, -180);
        assert_eq!(r.running_totals, Some(Totals::new(200, -30)));
        assert_eq!(r.penalty_points, Some(180));
    }

    #[test]
    fn penalty_can_set_the_bidder_into_a_loss() {
        // Dem bid, got flagged, and us already sit past 500.
        let r = penalty_round(Team::Dem, 140, Team::Dem, 140, Totals::new(505, 320));
        let totals = r.running_totals.unwrap();
        let v = detect_victory(&r, totals, false);
        assert_eq!(v.winner, Some(Team::Us));
        assert_eq!(v.victory_method, Some(VictoryMethod::SetOtherTeam));
    }
}
