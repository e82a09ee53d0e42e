//! Numerically stable summation of exponentials in log space
//!
//! All probabilities of the envelope are kept as logarithms. To add (or
//! subtract) them without overflow we shift every exponent by the largest
//! one before exponentiating:
//!
//! $$ \log \sum_i e^{v_i} = m + \log \sum_i e^{v_i - m}, \quad m = \max_i v_i $$
//!

/// Sign attached to a term of [signed_log_sum_exp]
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    fn factor(self) -> f64 {
        match self {
            Sign::Plus => 1.0,
            Sign::Minus => -1.0,
        }
    }
}

/// Largest value of the sequence (`-∞` if empty)
fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}

///
/// Compute `log(Σ exp(vᵢ))`
///
/// Returns `-∞` for an empty slice or if all the terms are `-∞`.
///
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = max_of(values.iter().copied());

    if max.is_infinite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    sum.ln() + max
}

///
/// Compute log of a signed sum of exponentials `Σ ±exp(vᵢ)`
///
/// If the sum `S` is positive the result is `log(S)`. If it is negative the
/// result is `-log(-S)`, so the sign of the net sum is carried on the
/// returned value. An exactly zero sum gives `-∞`.
///
/// ```
/// # use adaptive_rejection::log_space::{signed_log_sum_exp, Sign};
/// // log(3 - 1)
/// let v = signed_log_sum_exp(&[(3.0_f64.ln(), Sign::Plus), (0.0, Sign::Minus)]);
/// assert!((v - 2.0_f64.ln()).abs() < 1e-12);
/// ```
///
pub fn signed_log_sum_exp(terms: &[(f64, Sign)]) -> f64 {
    let max = max_of(terms.iter().map(|(v, _)| *v));

    if max.is_infinite() {
        return max;
    }

    let sum: f64 = terms
        .iter()
        .map(|(v, sign)| (v - max).exp() * sign.factor())
        .sum();

    if sum >= 0.0 {
        sum.ln() + max
    } else {
        -((-sum).ln() + max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_log_sum_exp() {
        let values = [-1.0, -2.0, -3.0];
        let reference = values.iter().map(|v: &f64| v.exp()).sum::<f64>().ln();
        assert_abs_diff_eq!(reference, log_sum_exp(&values), epsilon = 1e-12);
    }

    #[test]
    fn test_log_sum_exp_extreme_values() {
        // Would overflow/underflow if exponentiated directly
        assert_abs_diff_eq!(
            1000.0 + 2.0_f64.ln(),
            log_sum_exp(&[1000.0, 1000.0]),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            -1000.0 + 2.0_f64.ln(),
            log_sum_exp(&[-1000.0, -1000.0]),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_log_sum_exp_infinities() {
        assert_eq!(f64::NEG_INFINITY, log_sum_exp(&[]));
        assert_eq!(
            f64::NEG_INFINITY,
            log_sum_exp(&[f64::NEG_INFINITY, f64::NEG_INFINITY])
        );
        assert_abs_diff_eq!(0.5, log_sum_exp(&[f64::NEG_INFINITY, 0.5]), epsilon = 1e-15);
    }

    #[test]
    fn test_signed_sum() {
        let v = signed_log_sum_exp(&[(3.0_f64.ln(), Sign::Plus), (1.0_f64.ln(), Sign::Minus)]);
        assert_abs_diff_eq!(2.0_f64.ln(), v, epsilon = 1e-9);
    }

    #[test]
    fn test_signed_sum_negative_result() {
        // 1 - 3 = -2  => -log(2)
        let v = signed_log_sum_exp(&[(0.0, Sign::Plus), (3.0_f64.ln(), Sign::Minus)]);
        assert_abs_diff_eq!(-(2.0_f64.ln()), v, epsilon = 1e-9);
    }

    #[test]
    fn test_signed_sum_large_exponents() {
        // exp(800) * (e - 1)
        let v = signed_log_sum_exp(&[(801.0, Sign::Plus), (800.0, Sign::Minus)]);
        assert_abs_diff_eq!(800.0 + (1.0_f64.exp() - 1.0).ln(), v, epsilon = 1e-9);
    }

    #[test]
    fn test_signed_sum_cancellation() {
        let v = signed_log_sum_exp(&[(1.5, Sign::Plus), (1.5, Sign::Minus)]);
        assert_eq!(f64::NEG_INFINITY, v);
    }

    #[test]
    fn test_signed_sum_with_infinite_term() {
        let v = signed_log_sum_exp(&[(2.0, Sign::Plus), (f64::NEG_INFINITY, Sign::Minus)]);
        assert_abs_diff_eq!(2.0, v, epsilon = 1e-15);
    }
}
