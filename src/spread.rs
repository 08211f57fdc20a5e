//! Point-spread calibration.
//!
//! For most sports a rating differential maps to a spread linearly
//! (`spread = -diff / adjusted_k`). For low-scoring, draw-permitting sports
//! that mapping is badly behaved, so we instead fit a gamma distribution to
//! the absolute margins of recent finished games and push the win probability
//! through its quantile function. The sign convention everywhere is
//! "negative spread = home team favored".
//!
//! The fit is deliberately boring: outliers removed by the interquartile-range
//! rule, location pinned to the smallest observed margin, shape and scale by
//! moment matching over at most the 10,000 most recent games.

use tracing::warn;

/// Upper bound on how many finished games feed one fit.
const MAX_FIT_GAMES: usize = 10_000;

/// Fits with fewer usable margins than this are refused outright.
const MIN_FIT_GAMES: usize = 8;

/// Fitted gamma parameters over historical absolute margins. Immutable once
/// fit; recomputed from scratch each run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaParams {
    pub shape: f64,
    pub loc: f64,
    pub scale: f64,
}

/// How a run converts win probabilities to spreads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpreadModel {
    Gamma(GammaParams),
    Linear { adjusted_k: f64 },
}

impl SpreadModel {
    /// Implied spread for one event, from the home side's perspective.
    pub fn spread(&self, home_prob: f64, rating_diff: f64) -> f64 {
        match self {
            SpreadModel::Gamma(params) => spread_from_probability(home_prob, *params),
            SpreadModel::Linear { adjusted_k } => -rating_diff / adjusted_k,
        }
    }
}

impl GammaParams {
    /// Fit over signed margins of finished games in chronological order.
    /// Caps to the most recent [`MAX_FIT_GAMES`], trims outliers, takes
    /// absolute values, then moment-matches. Returns `None` when the sample
    /// is too small or degenerate to say anything.
    pub fn fit(margins: &[f64]) -> Option<GammaParams> {
        let start = margins.len().saturating_sub(MAX_FIT_GAMES);
        let recent = &margins[start..];

        let trimmed = trim_outliers(recent);
        let abs_margins: Vec<f64> = trimmed.iter().map(|m| m.abs()).collect();
        if abs_margins.len() < MIN_FIT_GAMES {
            return None;
        }

        let loc = abs_margins.iter().cloned().fold(f64::INFINITY, f64::min);
        let n = abs_margins.len() as f64;
        let mean = abs_margins.iter().map(|m| m - loc).sum::<f64>() / n;
        let var = abs_margins
            .iter()
            .map(|m| {
                let d = (m - loc) - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        if mean <= 0.0 || var <= 1e-9 {
            // every game decided by the same margin; nothing to fit
            return None;
        }

        let shape = mean * mean / var;
        let scale = var / mean;
        if !shape.is_finite() || !scale.is_finite() {
            return None;
        }
        let fitted = GammaParams { shape, loc, scale };

        // Moment matching can mis-fit a heavy-tailed margin history; flag
        // that instead of silently handing out skewed spreads.
        let median = percentile(&abs_margins, 50.0);
        let median_cdf = fitted.cdf(median);
        if (median_cdf - 0.5).abs() > 0.2 {
            warn!(
                median,
                median_cdf, "gamma fit matches the margin distribution poorly"
            );
        }
        Some(fitted)
    }

    /// Cumulative probability at `x`.
    pub fn cdf(&self, x: f64) -> f64 {
        if x <= self.loc {
            return 0.0;
        }
        lower_regularized(self.shape, (x - self.loc) / self.scale)
    }

    /// Quantile (inverse CDF), solved by bisection: monotone, bounded, and
    /// plenty fast for a per-event lookup.
    pub fn ppf(&self, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0 - 1e-12);
        if p == 0.0 {
            return self.loc;
        }

        let mut hi = 1.0f64;
        let mut expansions = 0;
        while lower_regularized(self.shape, hi) < p {
            hi *= 2.0;
            expansions += 1;
            if expansions > 200 {
                warn!(p, shape = self.shape, "gamma quantile failed to bracket");
                break;
            }
        }

        let mut lo = 0.0f64;
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if lower_regularized(self.shape, mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        self.loc + self.scale * 0.5 * (lo + hi)
    }
}

/// Convert a win probability into a signed spread through the fitted margin
/// distribution. The probability's distance from a coin flip picks a quantile
/// of the margin distribution; the `(q - 1) * 2` rescale re-centers "smallest
/// decisive margin" on a zero spread.
pub fn spread_from_probability(prob: f64, params: GammaParams) -> f64 {
    let x = (0.5 - prob).abs() * 2.0;
    let quantile = params.ppf(x);
    let adjusted = (quantile - 1.0) * 2.0;
    if prob > 0.5 {
        -adjusted
    } else {
        adjusted
    }
}

/// Drop values outside `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]`.
fn trim_outliers(values: &[f64]) -> Vec<f64> {
    if values.len() < 4 {
        return values.to_vec();
    }
    let q1 = percentile(values, 25.0);
    let q3 = percentile(values, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;
    values
        .iter()
        .cloned()
        .filter(|v| (lower..=upper).contains(v))
        .collect()
}

/// Linear-interpolated percentile, `q` in [0, 100].
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

// ── Incomplete gamma machinery ───────────────────────────────────────────────

/// Lanczos approximation of `ln Γ(x)`, good to ~15 significant digits for
/// x > 0.
fn ln_gamma(x: f64) -> f64 {
    const COEF: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_9e-2,
        -0.539_523_938_495_3e-5,
    ];
    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut ser = 1.000_000_000_190_015;
    for c in COEF {
        y += 1.0;
        ser += c / y;
    }
    -tmp + (2.506_628_274_631_000_5 * ser / x).ln()
}

/// Regularized lower incomplete gamma `P(a, x)`: series expansion for
/// `x < a + 1`, continued fraction for the complement otherwise.
fn lower_regularized(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let prefactor = (-x + a * x.ln() - ln_gamma(a)).exp();
    if x < a + 1.0 {
        let mut ap = a;
        let mut sum = 1.0 / a;
        let mut term = sum;
        for _ in 0..300 {
            ap += 1.0;
            term *= x / ap;
            sum += term;
            if term.abs() < sum.abs() * 1e-14 {
                break;
            }
        }
        (sum * prefactor).clamp(0.0, 1.0)
    } else {
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / 1e-30;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..300 {
            let an = -(i as f64) * (i as f64 - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < 1e-30 {
                d = 1e-30;
            }
            c = b + an / c;
            if c.abs() < 1e-30 {
                c = 1e-30;
            }
            d = 1.0 / d;
            let delta = d * c;
            h *= delta;
            if (delta - 1.0).abs() < 1e-14 {
                break;
            }
        }
        (1.0 - prefactor * h).clamp(0.0, 1.0)
    }
}
