//! Piecewise-linear bounds of a log-concave function
//!
//! For a mesh of abscissae `x₀ < x₁ < … < xₙ₋₁` with known values of the
//! log-density `f(xᵢ)` two bounds are constructed:
//!  - the *lower hull* (squeezing function) made of secants between the
//!    consecutive mesh points, valid on `[x₀, xₙ₋₁]`;
//!  - the *upper hull* (envelope) made of secants extended beyond the points
//!    they were drawn through, valid on the whole [Domain].
//!
//! Concavity guarantees that a secant lies below `f` between its points and
//! above `f` outside of them, which is all that is needed for both bounds.
//! Each segment of the upper hull also carries the normalised log-probability
//! of the piecewise-exponential distribution `∝ exp(upper(x))`.
//!
use crate::log_space::{log_sum_exp, signed_log_sum_exp, Sign};
use crate::{ArsError, Domain};
use is_sorted::IsSorted;

/// Slopes below this magnitude are integrated and sampled as flat
pub(crate) const FLAT_SLOPE: f64 = 1e-12;

/// Straight line `y = slope * x + intercept`
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    /// Line through the points `(x1, fx1)` and `(x2, fx2)`
    ///
    /// Requires `x1 != x2`.
    ///
    pub fn through(x1: f64, x2: f64, fx1: f64, fx2: f64) -> Self {
        let slope = (fx2 - fx1) / (x2 - x1);
        let intercept = fx1 - slope * x1;
        Self { slope, intercept }
    }

    /// Value of the line at `x`
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Abscissa at which two lines cross, kept within `[lo, hi]`
    ///
    /// Parallel lines (e.g. for log-linear density) have no crossing, in which
    /// case the midpoint of the interval is returned.
    ///
    pub fn crossing(&self, other: &Line, lo: f64, hi: f64) -> f64 {
        let x = (self.intercept - other.intercept) / (other.slope - self.slope);
        if x.is_finite() {
            x.clamp(lo, hi)
        } else {
            0.5 * (lo + hi)
        }
    }
}

///
/// Log of the integral of `exp(slope * t + intercept)` over `[x1, x2]`
///
/// Either of the bounds may be infinite as long as the integral converges
/// (e.g. `x2 = +∞` requires a negative slope). The difference of exponentials
/// is always taken with the positive term first, so the argument of the
/// logarithm stays positive for any sign of the slope.
///
pub fn log_integral(slope: f64, intercept: f64, x1: f64, x2: f64) -> f64 {
    if slope.abs() < FLAT_SLOPE {
        return intercept + (x2 - x1).ln();
    }

    let (hi, lo) = if slope > 0.0 {
        (slope * x2, slope * x1)
    } else {
        (slope * x1, slope * x2)
    };

    intercept - slope.abs().ln() + signed_log_sum_exp(&[(hi, Sign::Plus), (lo, Sign::Minus)])
}

/// Log of the integral of `exp(slope * t + intercept)` over `(-∞, x]`
///
/// Converges only for `slope > 0`.
///
pub fn log_integral_from_boundary(slope: f64, intercept: f64, x: f64) -> f64 {
    intercept - slope.ln() + slope * x
}

/// Log of the integral of `exp(slope * t + intercept)` over `[x, +∞)`
///
/// Converges only for `slope < 0`.
///
pub fn log_integral_to_boundary(slope: f64, intercept: f64, x: f64) -> f64 {
    intercept - (-slope).ln() + slope * x
}

/// Segment of the squeezing function
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowerSegment {
    pub(crate) line: Line,
    pub(crate) left: f64,
    pub(crate) right: f64,
}

impl LowerSegment {
    pub fn line(&self) -> Line {
        self.line
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }
}

/// Segment of the envelope function
///
/// Apart from the line and extent, holds `log P` where `P` is the
/// probability that a sample from the envelope falls into the segment.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpperSegment {
    pub(crate) line: Line,
    pub(crate) left: f64,
    pub(crate) right: f64,
    pub(crate) log_probability: f64,
}

impl UpperSegment {
    pub fn line(&self) -> Line {
        self.line
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn log_probability(&self) -> f64 {
        self.log_probability
    }
}

/// Position of a point relative to the squeezing function
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position<'a> {
    OutsideLeft,
    OutsideRight,
    Inside(&'a LowerSegment),
}

/// Lower and upper hull built from a single mesh
///
/// The pair is immutable. When the mesh changes a new pair is constructed.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Hulls {
    lower: Vec<LowerSegment>,
    upper: Vec<UpperSegment>,
}

impl Hulls {
    ///
    /// Build the hulls for a mesh and the log-density values at it
    ///
    /// For a mesh of `n` points the lower hull has `n - 1` segments and the
    /// upper hull `2n - 2`: a boundary segment on each side, a single segment
    /// in the first and last mesh interval, and two segments meeting at the
    /// crossing of the neighbouring secants in every other interval.
    ///
    /// # Errors
    /// - mesh with less than 3 points, not sorted, or containing duplicates
    /// - `values` of different length than the mesh
    /// - boundary segment of an unbounded side for which the tail diverges
    ///
    pub fn new(domain: &Domain, mesh: &[f64], values: &[f64]) -> Result<Self, ArsError> {
        let n = mesh.len();
        if n != values.len() {
            return Err(ArsError::LengthMismatch);
        } else if n < 3 {
            return Err(ArsError::MeshTooSmall { len: n });
        } else if !IsSorted::is_sorted(&mut mesh.iter()) {
            return Err(ArsError::UnsortedMesh);
        } else if let Some(w) = mesh.windows(2).find(|w| w[0] == w[1]) {
            return Err(ArsError::CoincidentMeshPoints { x: w[0] });
        }

        let secant = |i: usize| Line::through(mesh[i], mesh[i + 1], values[i], values[i + 1]);

        let lower = (0..n - 1)
            .map(|i| LowerSegment {
                line: secant(i),
                left: mesh[i],
                right: mesh[i + 1],
            })
            .collect();

        let mut pieces = Vec::with_capacity(2 * n - 2);

        // Left boundary
        let first = secant(0);
        let log_p = if domain.left().is_finite() {
            log_integral(first.slope, first.intercept, domain.left(), mesh[0])
        } else if first.slope > 0.0 {
            log_integral_from_boundary(first.slope, first.intercept, mesh[0])
        } else {
            return Err(ArsError::LeftTailDiverges {
                at: mesh[0],
                slope: first.slope,
            });
        };
        pieces.push((first, domain.left(), mesh[0], log_p));

        pieces.push(Self::piece(secant(1), mesh[0], mesh[1]));

        for i in 1..n - 2 {
            let before = secant(i - 1);
            let after = secant(i + 1);
            let x = before.crossing(&after, mesh[i], mesh[i + 1]);
            pieces.push(Self::piece(before, mesh[i], x));
            pieces.push(Self::piece(after, x, mesh[i + 1]));
        }

        pieces.push(Self::piece(secant(n - 3), mesh[n - 2], mesh[n - 1]));

        // Right boundary
        let last = secant(n - 2);
        let log_p = if domain.right().is_finite() {
            log_integral(last.slope, last.intercept, mesh[n - 1], domain.right())
        } else if last.slope < 0.0 {
            log_integral_to_boundary(last.slope, last.intercept, mesh[n - 1])
        } else {
            return Err(ArsError::RightTailDiverges {
                at: mesh[n - 1],
                slope: last.slope,
            });
        };
        pieces.push((last, mesh[n - 1], domain.right(), log_p));

        let log_z = log_sum_exp(&pieces.iter().map(|p| p.3).collect::<Vec<_>>());

        let upper = pieces
            .into_iter()
            .map(|(line, left, right, log_p)| UpperSegment {
                line,
                left,
                right,
                log_probability: log_p - log_z,
            })
            .collect();

        Ok(Self { lower, upper })
    }

    fn piece(line: Line, left: f64, right: f64) -> (Line, f64, f64, f64) {
        let log_p = log_integral(line.slope, line.intercept, left, right);
        (line, left, right, log_p)
    }

    /// Segments of the squeezing function ordered left to right
    pub fn lower(&self) -> &[LowerSegment] {
        &self.lower
    }

    /// Segments of the envelope ordered left to right
    pub fn upper(&self) -> &[UpperSegment] {
        &self.upper
    }

    ///
    /// Classify `x` with respect to the extent of the squeezing function
    ///
    pub fn locate(&self, x: f64) -> Position<'_> {
        // Lower hull always has at least 2 segments
        let (first, last) = match (self.lower.first(), self.lower.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Position::OutsideLeft,
        };

        if x < first.left {
            Position::OutsideLeft
        } else if x > last.right {
            Position::OutsideRight
        } else {
            let idx = self.lower.partition_point(|s| s.right < x);
            Position::Inside(&self.lower[idx.min(self.lower.len() - 1)])
        }
    }

    /// Value of the squeezing function at `x`
    ///
    /// Is `-∞` outside the mesh.
    ///
    pub fn lower_value(&self, x: f64) -> f64 {
        match self.locate(x) {
            Position::Inside(segment) => segment.line.at(x),
            Position::OutsideLeft | Position::OutsideRight => f64::NEG_INFINITY,
        }
    }

    /// Value of the envelope at `x`
    ///
    /// Points outside the domain take the value of the nearest boundary segment.
    ///
    pub fn upper_value(&self, x: f64) -> f64 {
        let idx = self.upper.partition_point(|s| s.right < x);
        match self.upper.get(idx).or(self.upper.last()) {
            Some(segment) => segment.line.at(x),
            None => f64::INFINITY,
        }
    }

    /// Get `(lower, upper)` bounds of the log-density at `x`
    pub fn evaluate(&self, x: f64) -> (f64, f64) {
        (self.lower_value(x), self.upper_value(x))
    }
}
