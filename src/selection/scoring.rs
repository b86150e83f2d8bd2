//! # Chi-square probability score
//!
//! The fit quality of a trajectory is summarized by
//!
//! ```text
//! score = −ln P(χ² ≥ chi2 | ndof) = −ln Q(ndof / 2, chi2 / 2)
//! ```
//!
//! where `Q` is the regularized upper incomplete gamma function. Lower is better; a
//! perfect fit (`chi2 = 0`) scores exactly 0. `Q` is evaluated in log space so that very
//! bad fits keep a finite, ordered score instead of underflowing to `+∞`.
//!
//! Degenerate inputs never fault:
//! * `ndof == 0` returns [`ZERO_DOF_SCORE`],
//! * a non-finite chi-square returns [`ZERO_DOF_SCORE`] as well,
//! * a negative chi-square is treated as 0.
use crate::constants::ZERO_DOF_SCORE;
use crate::tracks::trajectory::Trajectory;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];
const LOG_2PI: f64 = 1.837_877_066_409_345_5;

const MAX_ITERATIONS: usize = 500;
const SERIES_EPS: f64 = 1e-15;
const FPMIN: f64 = 1e-300;

/// ln Γ(z) for z > 0 (Lanczos approximation).
fn ln_gamma(z: f64) -> f64 {
    debug_assert!(
        z.is_finite() && z > 0.0,
        "ln_gamma requires z > 0 and finite"
    );

    // ln Γ(z) = −ln z + O(z) near zero, where sin(πz) loses precision.
    if z < 1e-8 {
        return -z.ln();
    }

    if z < 0.5 {
        let sin_term = (std::f64::consts::PI * z).sin().abs();
        return std::f64::consts::PI.ln() - sin_term.ln() - ln_gamma(1.0 - z);
    }

    let shifted = z - 1.0;
    let mut x = LANCZOS_COEFFICIENTS[0];
    for (idx, coefficient) in LANCZOS_COEFFICIENTS.iter().copied().enumerate().skip(1) {
        x += coefficient / (shifted + idx as f64);
    }

    let t = shifted + LANCZOS_G + 0.5;
    0.5 * LOG_2PI + (shifted + 0.5) * t.ln() - t + x.ln()
}

/// ln Q(a, x), the log of the regularized upper incomplete gamma function.
///
/// Uses the power series of P(a, x) below `x = a + 1` and a Lentz continued fraction for
/// Q(a, x) above it.
fn ln_upper_regularized_gamma(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let ln_prefactor = -x + a * x.ln() - ln_gamma(a);

    if x < a + 1.0 {
        let mut term = 1.0 / a;
        let mut sum = term;
        let mut ap = a;
        for _ in 0..MAX_ITERATIONS {
            ap += 1.0;
            term *= x / ap;
            sum += term;
            if term.abs() < sum.abs() * SERIES_EPS {
                break;
            }
        }
        let lower = (ln_prefactor + sum.ln()).exp();
        (-lower.min(1.0)).ln_1p()
    } else {
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / FPMIN;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..=MAX_ITERATIONS {
            let an = -(i as f64) * (i as f64 - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < FPMIN {
                d = FPMIN;
            }
            c = b + an / c;
            if c.abs() < FPMIN {
                c = FPMIN;
            }
            d = 1.0 / d;
            let delta = d * c;
            h *= delta;
            if (delta - 1.0).abs() < SERIES_EPS {
                break;
            }
        }
        ln_prefactor + h.ln()
    }
}

/// Score a fit from its chi-square and degrees of freedom.
///
/// Arguments
/// -----------------
/// * `chi2`: total chi-square of the fit
/// * `ndof`: degrees of freedom
///
/// Return
/// ----------
/// * `−ln P(χ² ≥ chi2 | ndof)`, non-negative and non-decreasing in `chi2`
/// * [`ZERO_DOF_SCORE`] when `ndof == 0` or `chi2` is not finite
pub fn chi2_score(chi2: f64, ndof: u32) -> f64 {
    if ndof == 0 || !chi2.is_finite() {
        return ZERO_DOF_SCORE;
    }
    if chi2 <= 0.0 {
        return 0.0;
    }
    let score = -ln_upper_regularized_gamma(0.5 * f64::from(ndof), 0.5 * chi2);
    if score.is_nan() {
        ZERO_DOF_SCORE
    } else {
        score.clamp(0.0, ZERO_DOF_SCORE)
    }
}

/// Chi-square probability score (−ln P) of a fitted trajectory.
pub fn track_probability(trajectory: &Trajectory) -> f64 {
    chi2_score(trajectory.chi2(), trajectory.ndof())
}
