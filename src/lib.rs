//! Sample univariate log-concave distributions
//!
//! This crate implements derivative-free Adaptive Rejection Sampling (ARS)
//! (Gilks 1992). The target distribution is given only by a function
//! evaluating its (unnormalised) log-density `f`, which must be concave.
//!
//! A piecewise-linear envelope of `f` is constructed from secants through the
//! points at which `f` was evaluated. Candidates are drawn from
//! `∝ exp(envelope)` and accepted by the usual rejection scheme. Every
//! evaluation of `f` adds a point to the mesh, which makes the envelope
//! tighter and the rejection rate smaller as the sampling goes on.
//!
//! ```
//! # use adaptive_rejection::{ars, ArsError, Domain};
//! # use rand::SeedableRng;
//! # fn main() -> Result<(), ArsError> {
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//!
//! // Standard normal distribution
//! let samples = ars(|x| -0.5 * x * x, -1.0, 1.0, Domain::real_line(), 1000, &mut rng)?;
//!
//! assert_eq!(1000, samples.len());
//! # Ok(())}
//! ```
//!
//! # References
//! - Gilks, W. R. (1992). Derivative-free adaptive rejection sampling for
//!   Gibbs sampling. Bayesian Statistics 4, 641–649.
//!
use std::ops::{Bound, RangeBounds};
use thiserror::Error;

pub mod envelope;
pub mod hull;
pub mod log_space;
mod sampler;

pub use hull::{Hulls, LowerSegment, Position, UpperSegment};
pub use sampler::{ars, AdaptiveRejectionSampler, Options, SamplingStats};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArsError {
    #[error("Invalid domain ({left}, {right}), left bound must be below the right")]
    InvalidDomain { left: f64, right: f64 },
    #[error("Initial point a = {a} is not inside the domain left bound {left}")]
    StartOutsideDomain { a: f64, left: f64 },
    #[error("Initial point b = {b} is not inside the domain right bound {right}")]
    EndOutsideDomain { b: f64, right: f64 },
    #[error("Initial points must satisfy a < b, got a = {a} and b = {b}")]
    UnorderedPoints { a: f64, b: f64 },
    #[error("Domain is unbounded on the left but slope {slope} at {at} is not positive")]
    LeftTailDiverges { at: f64, slope: f64 },
    #[error("Domain is unbounded on the right but slope {slope} at {at} is not negative")]
    RightTailDiverges { at: f64, slope: f64 },
    #[error("At least one interior point is required in the initial mesh")]
    TooFewInteriorPoints,
    #[error("Mesh with {len} points is too small to build the hulls (3 required)")]
    MeshTooSmall { len: usize },
    #[error("Lengths of the mesh and the function values are different")]
    LengthMismatch,
    #[error("Values in the mesh are not sorted")]
    UnsortedMesh,
    #[error("Mesh contains repeated point {x}")]
    CoincidentMeshPoints { x: f64 },
    #[error("Log-density is not finite at {x} (got {value})")]
    NonFiniteDensity { x: f64, value: f64 },
    #[error("Drawn value {drawn} above the cumulative probabilities of the envelope {cumulative:?}")]
    EnvelopeSearchFailed { cumulative: Vec<f64>, drawn: f64 },
    #[error("Sample {x} drawn from envelope segment {segment} is not finite")]
    NonFiniteSample { x: f64, segment: usize },
    #[error("Log-density {value} at {x} is above the envelope {envelope}, function is not log-concave")]
    NotLogConcave { x: f64, value: f64, envelope: f64 },
    #[error("Sampling did not converge, {rejections} candidates were rejected")]
    NonConvergent { rejections: usize },
}

///
/// Support of the sampled distribution
///
/// Each of the bounds may be infinite. The bounds are never included in the
/// support, thus `Domain::from_range(0.0..=1.0)` is the same as
/// `Domain::from_range(0.0..1.0)`.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    left: f64,
    right: f64,
}

impl Domain {
    pub fn new(left: f64, right: f64) -> Result<Self, ArsError> {
        if left < right {
            Ok(Self { left, right })
        } else {
            Err(ArsError::InvalidDomain { left, right })
        }
    }

    /// Whole real line `(-∞, +∞)`
    pub fn real_line() -> Self {
        Self {
            left: f64::NEG_INFINITY,
            right: f64::INFINITY,
        }
    }

    /// Create from a range e.g. `0.0..` for the positive half of the real line
    ///
    /// ```
    /// # use adaptive_rejection::Domain;
    /// let domain = Domain::from_range(0.0..).unwrap();
    /// assert_eq!(f64::INFINITY, domain.right());
    /// ```
    ///
    pub fn from_range(range: impl RangeBounds<f64>) -> Result<Self, ArsError> {
        let left = match range.start_bound() {
            Bound::Included(v) | Bound::Excluded(v) => *v,
            Bound::Unbounded => f64::NEG_INFINITY,
        };
        let right = match range.end_bound() {
            Bound::Included(v) | Bound::Excluded(v) => *v,
            Bound::Unbounded => f64::INFINITY,
        };
        Self::new(left, right)
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    /// Check if `x` lies strictly within the bounds
    pub fn contains(&self, x: f64) -> bool {
        self.left < x && x < self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain() {
        let domain = Domain::new(-1.0, 2.0).unwrap();
        assert!(domain.contains(0.0));
        assert!(!domain.contains(-1.0));
        assert!(!domain.contains(2.0));
        assert!(!domain.contains(f64::NAN));

        assert!(Domain::real_line().contains(1e300));
    }

    #[test]
    fn test_domain_errors() {
        assert!(
            Domain::new(1.0, 1.0).is_err(),
            "Failed to detect empty domain"
        );
        assert!(
            Domain::new(2.0, 1.0).is_err(),
            "Failed to detect reversed bounds"
        );
        assert!(
            Domain::new(f64::NAN, 1.0).is_err(),
            "Failed to detect NaN bound"
        );
    }

    #[test]
    fn test_domain_from_range() {
        assert_eq!(Domain::real_line(), Domain::from_range(..).unwrap());
        assert_eq!(
            Domain::new(0.0, f64::INFINITY).unwrap(),
            Domain::from_range(0.0..).unwrap()
        );
        assert_eq!(
            Domain::new(f64::NEG_INFINITY, 3.0).unwrap(),
            Domain::from_range(..=3.0).unwrap()
        );
        assert_eq!(
            Domain::from_range(0.0..1.0).unwrap(),
            Domain::from_range(0.0..=1.0).unwrap()
        );
        assert!(Domain::from_range(1.0..0.0).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = ArsError::UnorderedPoints { a: 2.0, b: 1.0 };
        assert_eq!(
            "Initial points must satisfy a < b, got a = 2 and b = 1",
            err.to_string()
        );
    }
}
