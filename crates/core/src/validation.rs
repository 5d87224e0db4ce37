//! Hit-rate statistics for validating tier assignments.
//!
//! Provides the Wilson score interval and a two-sided binomial test used to
//! judge whether a tier's observed win rate differs from a coin flip and
//! whether it agrees with the rate the tier is expected to hit.

use serde::{Deserialize, Serialize};

/// Largest sample for which the binomial test is computed exactly.
pub const EXACT_BINOMIAL_MAX_N: usize = 30;

/// z-score for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Win/loss/push counts with derived significance statistics.
///
/// Pushes count toward the sample size reported to users but are excluded
/// from the hit rate and the tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRateStats {
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
    /// wins / (wins + losses); zero when nothing was decided.
    pub hit_rate: f64,
    pub wilson_ci_lower: f64,
    pub wilson_ci_upper: f64,
    /// Two-sided p-value against `null_rate`.
    pub p_value: f64,
    pub is_significant: bool,
}

impl HitRateStats {
    /// Computes statistics from raw counts.
    #[must_use]
    pub fn from_counts(
        wins: usize,
        losses: usize,
        pushes: usize,
        null_rate: f64,
        alpha: f64,
    ) -> Self {
        let decided = wins + losses;
        let hit_rate = if decided == 0 {
            0.0
        } else {
            wins as f64 / decided as f64
        };
        let (wilson_ci_lower, wilson_ci_upper) = wilson_ci(wins, decided, Z_95);
        let p_value = binomial_test(wins, decided, null_rate);

        Self {
            wins,
            losses,
            pushes,
            hit_rate,
            wilson_ci_lower,
            wilson_ci_upper,
            p_value,
            is_significant: decided > 0 && p_value < alpha,
        }
    }

    /// Picks graded, pushes included.
    #[must_use]
    pub fn total(&self) -> usize {
        self.wins + self.losses + self.pushes
    }

    /// True when `rate` lies inside the Wilson interval.
    #[must_use]
    pub fn interval_contains(&self, rate: f64) -> bool {
        self.wins + self.losses > 0 && self.wilson_ci_lower <= rate && rate <= self.wilson_ci_upper
    }
}

/// Wilson score confidence interval for a proportion.
///
/// ```text
/// CI = (p + z^2/(2n) +/- z * sqrt(p(1-p)/n + z^2/(4n^2))) / (1 + z^2/n)
/// ```
///
/// # Examples
/// ```
/// use axiom_core::validation::wilson_ci;
///
/// let (lower, upper) = wilson_ci(50, 100, 1.96);
/// assert!(lower > 0.39 && lower < 0.41);
/// assert!(upper > 0.59 && upper < 0.61);
/// ```
#[must_use]
pub fn wilson_ci(wins: usize, n: usize, z: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }

    let n_f = n as f64;
    let p = wins as f64 / n_f;
    let z_sq = z * z;

    let denominator = 1.0 + z_sq / n_f;
    let center = p + z_sq / (2.0 * n_f);
    let spread = z * (p * (1.0 - p) / n_f + z_sq / (4.0 * n_f * n_f)).sqrt();

    let lower = (center - spread) / denominator;
    let upper = (center + spread) / denominator;

    (lower.max(0.0), upper.min(1.0))
}

/// Two-sided binomial test of `successes` out of `n` against `p0`.
///
/// Exact for `n <= EXACT_BINOMIAL_MAX_N` (sums every outcome no more likely
/// than the observed one); above that, the normal approximation with
/// continuity correction.
///
/// # Examples
/// ```
/// use axiom_core::validation::binomial_test;
///
/// assert!(binomial_test(55, 100, 0.5) > 0.05);
/// assert!(binomial_test(65, 100, 0.5) < 0.05);
/// ```
#[must_use]
pub fn binomial_test(successes: usize, n: usize, p0: f64) -> f64 {
    if n == 0 {
        return 1.0;
    }
    if p0 <= 0.0 || p0 >= 1.0 {
        let expected_all = if p0 <= 0.0 { successes == 0 } else { successes == n };
        return if expected_all { 1.0 } else { 0.0 };
    }
    if n <= EXACT_BINOMIAL_MAX_N {
        return exact_two_sided(successes, n, p0);
    }

    let n_f = n as f64;
    let expected = n_f * p0;
    let std_dev = (n_f * p0 * (1.0 - p0)).sqrt();

    let z = (successes as f64 - expected).abs() - 0.5;
    if z <= 0.0 {
        return 1.0;
    }
    (2.0 * (1.0 - standard_normal_cdf(z / std_dev))).clamp(0.0, 1.0)
}

fn exact_two_sided(successes: usize, n: usize, p0: f64) -> f64 {
    let pmf: Vec<f64> = (0..=n).map(|k| binomial_pmf(k, n, p0)).collect();
    let observed = pmf[successes.min(n)];
    // Relative slack so outcomes tied with the observed one are counted.
    let cutoff = observed * (1.0 + 1e-7);
    let p: f64 = pmf.iter().filter(|&&q| q <= cutoff).sum();
    p.min(1.0)
}

fn binomial_pmf(k: usize, n: usize, p: f64) -> f64 {
    let mut coefficient = 1.0;
    for i in 0..k {
        coefficient *= (n - i) as f64 / (i + 1) as f64;
    }
    coefficient * p.powi(k as i32) * (1.0 - p).powi((n - k) as i32)
}

/// Standard normal CDF, Abramowitz and Stegun 26.2.17. Accurate to ~1e-5.
fn standard_normal_cdf(x: f64) -> f64 {
    if x < 0.0 {
        return 1.0 - standard_normal_cdf(-x);
    }

    let b1 = 0.319_381_530;
    let b2 = -0.356_563_782;
    let b3 = 1.781_477_937;
    let b4 = -1.821_255_978;
    let b5 = 1.330_274_429;
    let p = 0.231_641_9;

    let t = 1.0 / (1.0 + p * x);
    let poly = t * (b1 + t * (b2 + t * (b3 + t * (b4 + t * b5))));
    let pdf = (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt();
    1.0 - pdf * poly
}
