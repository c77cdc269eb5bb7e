//! Calibrated logistic model of the probability that us eventually wins.
//!
//! Coefficients were fit offline on completed-game records (score
//! differential, round index, and round-over-round momentum as features)
//! and are fixed here; there is no online training path.

const INTERCEPT: f64 = 0.208_458_687_614_183_1;
const COEFF_DIFF: f64 = 0.004_211_07;
const COEFF_ROUND: f64 = -0.095_209_21;
const COEFF_MOMENTUM: f64 = 0.001_494_16;

/// Probability in (0, 1) that us eventually wins, given the current score
/// differential, zero-based round index, and momentum (change in
/// differential versus the previous round; 0 at round 0 against the
/// implicit 0/0 baseline).
pub fn logistic_prob(diff: f64, round_index: usize, momentum: f64) -> f64 {
    let z = INTERCEPT
        + COEFF_DIFF * diff
        + COEFF_ROUND * round_index as f64
        + COEFF_MOMENTUM * momentum;
    sigmoid(z)
}

/// Standard logistic sigmoid, branch-split to stay numerically stable for
/// large |x|.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}
