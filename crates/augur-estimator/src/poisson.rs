//! Block-arrival quantiles under a Poisson model.
//!
//! Blocks arrive as a Poisson process with one block per
//! [`BLOCK_INTERVAL_SECS`](augur_core::constants::BLOCK_INTERVAL_SECS) on
//! average, so the count mined over `N` target blocks is Poisson with mean `N`.
//! Probabilities are evaluated in log space to stay finite for large means.

/// Means above this use the normal approximation instead of walking the pmf.
pub const EXACT_MEAN_LIMIT: f64 = 10_000.0;

/// Largest `k` such that at least `k` blocks are mined with probability
/// `>= probability`, for a Poisson count with the given mean.
///
/// Returns 0 for a non-positive mean or when even one block is less likely
/// than `probability`. Runs in bounded time for any input.
pub fn blocks_mined_quantile(mean: f64, probability: f64) -> u64 {
    if mean <= 0.0 || !mean.is_finite() {
        return 0;
    }
    let probability = probability.clamp(0.0, 1.0);
    if mean > EXACT_MEAN_LIMIT {
        return normal_quantile(mean, probability);
    }
    let limit = (mean + 20.0 * mean.sqrt() + 50.0).ceil() as u64;
    let ln_mean = mean.ln();

    // cdf holds P(X <= k - 1); survival is P(X >= k).
    let mut cdf = 0.0f64;
    let mut ln_factorial = 0.0f64;
    let mut k = 0u64;
    while k < limit {
        if k > 0 {
            ln_factorial += (k as f64).ln();
        }
        let pmf = (-mean + k as f64 * ln_mean - ln_factorial).exp();
        let survival_next = 1.0 - (cdf + pmf);
        if survival_next < probability {
            break;
        }
        cdf += pmf;
        k += 1;
    }
    k
}

/// Normal approximation with continuity correction:
/// `P(X >= k) ~ 1 - Phi((k - 0.5 - mean) / sqrt(mean))`.
fn normal_quantile(mean: f64, probability: f64) -> u64 {
    if probability >= 1.0 {
        return 0;
    }
    let sigma = mean.sqrt();
    if probability <= 0.0 {
        return (mean + 20.0 * sigma + 50.0).ceil() as u64;
    }
    let k = (mean + 0.5 + sigma * inverse_normal_cdf(1.0 - probability)).floor();
    // `as` saturates, so huge means stay at u64::MAX.
    k.max(0.0) as u64
}

/// Standard normal cdf (Abramowitz & Stegun 7.1.26, |error| < 1.5e-7).
fn normal_cdf(z: f64) -> f64 {
    let x = z.abs() / std::f64::consts::SQRT_2;
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    let erf = 1.0 - poly * (-x * x).exp();
    if z >= 0.0 { 0.5 * (1.0 + erf) } else { 0.5 * (1.0 - erf) }
}

/// Inverse of [`normal_cdf`] by bisection on `[-10, 10]`.
fn inverse_normal_cdf(p: f64) -> f64 {
    let (mut lo, mut hi) = (-10.0f64, 10.0f64);
    for _ in 0..80 {
        let mid = 0.5 * (lo + hi);
        if normal_cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}
