//! Sampling from the piecewise-exponential envelope
//!
use crate::hull::{UpperSegment, FLAT_SLOPE};
use crate::log_space::{signed_log_sum_exp, Sign};
use crate::ArsError;
use rand::distributions::Open01;
use rand::Rng;

///
/// Draw a single candidate from the distribution `∝ exp(upper(x))`
///
/// The segment is selected from the cumulative probabilities of the segments
/// and the position within it by inverting the CDF of the truncated
/// exponential:
///
/// $$ U = \frac{e^{mx} - e^{ml}}{e^{mr} - e^{ml}} $$
///
/// Which is evaluated in log space, so large `m x` does not overflow.
///
/// # Errors
/// - the drawn number is above the total of the cumulative probabilities
/// - the inverted value is not finite
///
pub fn sample_upper_hull<R>(upper: &[UpperSegment], rng: &mut R) -> Result<f64, ArsError>
where
    R: Rng + ?Sized,
{
    let cumulative = upper
        .iter()
        .scan(0.0, |acc, s| {
            *acc += s.log_probability.exp();
            Some(*acc)
        })
        .collect::<Vec<f64>>();

    let drawn: f64 = rng.gen();
    let idx = cumulative.partition_point(|c| *c <= drawn);

    let segment = match upper.get(idx) {
        Some(s) => s,
        None => return Err(ArsError::EnvelopeSearchFailed { cumulative, drawn }),
    };

    let u: f64 = rng.sample(Open01);
    let m = segment.line.slope;
    let (left, right) = (segment.left, segment.right);

    let x = if m.abs() < FLAT_SLOPE {
        left + u * (right - left)
    } else {
        let log_u = u.ln();
        signed_log_sum_exp(&[
            (log_u + m * right, Sign::Plus),
            (log_u + m * left, Sign::Minus),
            (m * left, Sign::Plus),
        ]) / m
    };

    if x.is_finite() {
        Ok(x)
    } else {
        Err(ArsError::NonFiniteSample { x, segment: idx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hull::{Hulls, Line};
    use crate::Domain;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_exponential_envelope() {
        // Log-linear density gives an exact envelope of Exp(1)
        let mesh = [1.0, 2.0, 3.0];
        let values = mesh.map(|x| -x);
        let domain = Domain::new(0.0, f64::INFINITY).unwrap();
        let hulls = Hulls::new(&domain, &mesh, &values).unwrap();

        let mut rng = StdRng::seed_from_u64(8742);
        let samples = (0..20000)
            .map(|_| sample_upper_hull(hulls.upper(), &mut rng).unwrap())
            .collect::<Vec<_>>();

        assert!(samples.iter().all(|x| *x >= 0.0 && x.is_finite()));

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert_abs_diff_eq!(1.0, mean, epsilon = 0.05);
    }

    #[test]
    fn test_segment_frequencies() {
        let mesh = [-1.0, -0.3, 0.4, 1.0];
        let values = mesh.map(|x| -0.5 * x * x);
        let hulls = Hulls::new(&Domain::real_line(), &mesh, &values).unwrap();
        let upper = hulls.upper();

        let mut rng = StdRng::seed_from_u64(1234);
        let n = 50000;
        let mut counts = vec![0usize; upper.len()];

        for _ in 0..n {
            let x = sample_upper_hull(upper, &mut rng).unwrap();
            let idx = upper.partition_point(|s| s.right() < x);
            counts[idx.min(upper.len() - 1)] += 1;
        }

        for (count, segment) in std::iter::zip(counts, upper) {
            assert_abs_diff_eq!(
                segment.log_probability().exp(),
                count as f64 / n as f64,
                epsilon = 0.01
            );
        }
    }

    #[test]
    fn test_steep_segment() {
        // exp(m * x) overflows f64 for these values
        let upper = [UpperSegment {
            line: Line {
                slope: 500.0,
                intercept: 0.0,
            },
            left: 10.0,
            right: 11.0,
            log_probability: 0.0,
        }];
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..100 {
            let x = sample_upper_hull(&upper, &mut rng).unwrap();
            assert!((10.0..=11.0).contains(&x), "{x} outside of the segment");
        }
    }

    #[test]
    fn test_flat_segment() {
        let upper = [UpperSegment {
            line: Line {
                slope: 0.0,
                intercept: 1.0,
            },
            left: -2.0,
            right: 2.0,
            log_probability: 0.0,
        }];
        let mut rng = StdRng::seed_from_u64(6);

        let samples = (0..10000)
            .map(|_| sample_upper_hull(&upper, &mut rng).unwrap())
            .collect::<Vec<_>>();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;

        assert!(samples.iter().all(|x| (-2.0..=2.0).contains(x)));
        assert_abs_diff_eq!(0.0, mean, epsilon = 0.05);
    }

    #[test]
    fn test_failed_search() {
        let upper = [UpperSegment {
            line: Line {
                slope: -1.0,
                intercept: 0.0,
            },
            left: 0.0,
            right: 1.0,
            log_probability: f64::NEG_INFINITY,
        }];
        let mut rng = StdRng::seed_from_u64(7);

        match sample_upper_hull(&upper, &mut rng) {
            Err(ArsError::EnvelopeSearchFailed { cumulative, drawn }) => {
                assert_eq!(vec![0.0], cumulative);
                assert!((0.0..1.0).contains(&drawn));
            }
            other => panic!("Expected failed search, got {other:?}"),
        }
    }
}
