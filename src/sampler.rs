//! Adaptive accept/reject loop
//!
use crate::envelope::sample_upper_hull;
use crate::hull::Hulls;
use crate::{ArsError, Domain};
use rand::Rng;

/// Settings of the [AdaptiveRejectionSampler]
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    /// Number of points placed between `a` and `b` in the initial mesh
    pub interior_points: usize,
    /// Step of the finite difference used to check the slopes at `a` and `b`.
    /// Also the distance of the first and last interior point from them.
    pub derivative_step: f64,
    /// Maximum number of rejected candidates in a single call to `sample`
    pub max_rejections: usize,
    /// Relative excess over the envelope tolerated before the log-density is
    /// reported to be not log-concave
    pub concavity_tolerance: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interior_points: 3,
            derivative_step: 1e-3,
            max_rejections: 10_000,
            concavity_tolerance: 1e-8,
        }
    }
}

/// Counts of the outcomes of the rejection scheme
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingStats {
    /// Accepted by the squeezing test without evaluating the log-density
    pub squeeze_accepts: usize,
    /// Accepted after the log-density was evaluated
    pub function_accepts: usize,
    pub rejections: usize,
}

impl SamplingStats {
    /// Number of log-density evaluations made while sampling
    ///
    /// Does not include the evaluations at the initial mesh.
    ///
    pub fn evaluations(&self) -> usize {
        self.function_accepts + self.rejections
    }

    /// Fraction of all candidates that were accepted
    pub fn acceptance_rate(&self) -> f64 {
        let accepted = self.squeeze_accepts + self.function_accepts;
        let total = accepted + self.rejections;
        if total == 0 {
            0.0
        } else {
            accepted as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    SqueezeAccept,
    FunctionAccept,
    Reject,
}

///
/// Adaptive rejection sampler of a log-concave distribution
///
/// Keeps the mesh between the calls to [AdaptiveRejectionSampler::sample],
/// so every following batch of samples is drawn from an envelope at least as
/// tight as the one before.
///
/// ```
/// # use adaptive_rejection::{AdaptiveRejectionSampler, ArsError, Domain};
/// # use rand::SeedableRng;
/// # fn main() -> Result<(), ArsError> {
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
///
/// // Gamma(3, 1) distribution
/// let domain = Domain::from_range(0.0..)?;
/// let mut sampler = AdaptiveRejectionSampler::new(|x: f64| 2.0 * x.ln() - x, 1.0, 5.0, domain)?;
///
/// let first = sampler.sample(&mut rng, 100)?;
/// let second = sampler.sample(&mut rng, 100)?;
///
/// assert_eq!(100, first.len());
/// assert_eq!(100, second.len());
/// # Ok(())}
/// ```
///
pub struct AdaptiveRejectionSampler<F>
where
    F: Fn(f64) -> f64,
{
    func: F,
    domain: Domain,
    options: Options,
    mesh: Vec<f64>,
    values: Vec<f64>,
    hulls: Hulls,
    stats: SamplingStats,
}

/// Abscissae of the initial mesh
///
/// `a`, `b` and `k` points evenly spaced between `a + margin` and `b - margin`.
///
fn initial_mesh(a: f64, b: f64, step: f64, k: usize) -> Vec<f64> {
    let margin = step.min((b - a) / 4.0);
    let lo = a + margin;
    let hi = b - margin;

    let mut mesh = Vec::with_capacity(k + 2);
    mesh.push(a);
    if k == 1 {
        mesh.push(0.5 * (lo + hi));
    } else {
        let dx = (hi - lo) / (k - 1) as f64;
        mesh.extend((0..k).map(|i| lo + i as f64 * dx));
    }
    mesh.push(b);
    mesh
}

impl<F> AdaptiveRejectionSampler<F>
where
    F: Fn(f64) -> f64,
{
    /// Create a new sampler with default [Options]
    ///
    /// See [AdaptiveRejectionSampler::with_options].
    ///
    pub fn new(func: F, a: f64, b: f64, domain: Domain) -> Result<Self, ArsError> {
        Self::with_options(func, a, b, domain, Options::default())
    }

    ///
    /// Create a new sampler
    ///
    /// # Arguments
    /// - `func` - log-density of the distribution (up to a constant)
    /// - `a`, `b` - initial points `a < b` inside the domain
    /// - `domain` - support of the distribution
    /// - `options` - settings of the sampler
    ///
    /// # Errors
    /// If `a` or `b` are outside the domain or out of order. If the domain is
    /// unbounded on the left (right) the log-density must be increasing at `a`
    /// (decreasing at `b`), otherwise the envelope cannot be normalised.
    ///
    pub fn with_options(
        func: F,
        a: f64,
        b: f64,
        domain: Domain,
        options: Options,
    ) -> Result<Self, ArsError> {
        // Negated comparisons also catch NaNs
        if !(a > domain.left()) {
            return Err(ArsError::StartOutsideDomain {
                a,
                left: domain.left(),
            });
        } else if !(b < domain.right()) {
            return Err(ArsError::EndOutsideDomain {
                b,
                right: domain.right(),
            });
        } else if !(a < b) {
            return Err(ArsError::UnorderedPoints { a, b });
        } else if options.interior_points == 0 {
            return Err(ArsError::TooFewInteriorPoints);
        }

        let h = options.derivative_step;

        if domain.left().is_infinite() {
            let slope = (func(a + h) - func(a)) / h;
            if !(slope > 0.0) {
                return Err(ArsError::LeftTailDiverges { at: a, slope });
            }
        }
        if domain.right().is_infinite() {
            let slope = (func(b) - func(b - h)) / h;
            if !(slope < 0.0) {
                return Err(ArsError::RightTailDiverges { at: b, slope });
            }
        }

        let mesh = initial_mesh(a, b, h, options.interior_points);
        let values = mesh
            .iter()
            .map(|x| {
                let value = func(*x);
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(ArsError::NonFiniteDensity { x: *x, value })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        let hulls = Hulls::new(&domain, &mesh, &values)?;

        log::debug!("Initialised adaptive rejection sampler with mesh {mesh:?}");

        Ok(Self {
            func,
            domain,
            options,
            mesh,
            values,
            hulls,
            stats: SamplingStats::default(),
        })
    }

    ///
    /// Draw `n_samples` from the distribution
    ///
    /// Samples are returned in the order in which they were accepted.
    ///
    /// # Errors
    /// - numerical failure of the envelope sampling
    /// - log-density found to be not log-concave or not finite
    /// - more than [Options::max_rejections] candidates rejected
    ///
    pub fn sample<R>(&mut self, rng: &mut R, n_samples: usize) -> Result<Vec<f64>, ArsError>
    where
        R: Rng + ?Sized,
    {
        let mut samples = Vec::with_capacity(n_samples);
        let mut rejections = 0;

        while samples.len() < n_samples {
            let (x, outcome) = self.step(rng)?;
            log::trace!("Candidate {x}: {outcome:?}");

            match outcome {
                Outcome::SqueezeAccept => {
                    self.stats.squeeze_accepts += 1;
                    samples.push(x);
                }
                Outcome::FunctionAccept => {
                    self.stats.function_accepts += 1;
                    samples.push(x);
                }
                Outcome::Reject => {
                    self.stats.rejections += 1;
                    rejections += 1;
                    if rejections > self.options.max_rejections {
                        return Err(ArsError::NonConvergent { rejections });
                    }
                }
            }
        }

        log::debug!(
            "Drew {n_samples} samples with {rejections} rejections, mesh has {} points",
            self.mesh.len()
        );
        Ok(samples)
    }

    /// Propose a single candidate and decide its fate
    fn step<R>(&mut self, rng: &mut R) -> Result<(f64, Outcome), ArsError>
    where
        R: Rng + ?Sized,
    {
        let x = sample_upper_hull(self.hulls.upper(), rng)?;
        let (lower, upper) = self.hulls.evaluate(x);
        let u: f64 = rng.gen();

        let tolerance = self.options.concavity_tolerance * (1.0 + upper.abs());
        if lower > upper + tolerance {
            return Err(ArsError::NotLogConcave {
                x,
                value: lower,
                envelope: upper,
            });
        }

        if u <= (lower - upper).exp() {
            return Ok((x, Outcome::SqueezeAccept));
        }

        // Rounding may place a candidate exactly on a bound
        if !self.domain.contains(x) {
            log::warn!("Candidate {x} on the boundary of the domain is discarded");
            return Ok((x, Outcome::Reject));
        }

        let value = (self.func)(x);
        if !value.is_finite() {
            return Err(ArsError::NonFiniteDensity { x, value });
        } else if value > upper + tolerance {
            return Err(ArsError::NotLogConcave {
                x,
                value,
                envelope: upper,
            });
        }

        let outcome = if u <= (value - upper).exp() {
            Outcome::FunctionAccept
        } else {
            Outcome::Reject
        };

        self.refine(x, value)?;
        Ok((x, outcome))
    }

    /// Add a point to the mesh and rebuild the hulls
    ///
    /// State is only replaced once the new hulls are built.
    ///
    fn refine(&mut self, x: f64, value: f64) -> Result<(), ArsError> {
        let idx = self.mesh.partition_point(|p| *p < x);
        if self.mesh.get(idx) == Some(&x) {
            log::warn!("Candidate {x} is already in the mesh");
            return Ok(());
        }

        let mut mesh = self.mesh.clone();
        let mut values = self.values.clone();
        mesh.insert(idx, x);
        values.insert(idx, value);

        let hulls = Hulls::new(&self.domain, &mesh, &values)?;
        log::trace!("Rebuilt hulls for mesh of {} points", mesh.len());

        self.mesh = mesh;
        self.values = values;
        self.hulls = hulls;
        Ok(())
    }

    /// Points at which the log-density was evaluated
    pub fn mesh(&self) -> &[f64] {
        &self.mesh
    }

    /// Log-density at the mesh points
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn hulls(&self) -> &Hulls {
        &self.hulls
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Outcomes accumulated over all calls to `sample`
    pub fn stats(&self) -> SamplingStats {
        self.stats
    }
}

///
/// Draw `n_samples` from the distribution with log-density `func`
///
/// Shorthand for [AdaptiveRejectionSampler::new] followed by a single
/// [AdaptiveRejectionSampler::sample].
///
pub fn ars<F, R>(
    func: F,
    a: f64,
    b: f64,
    domain: Domain,
    n_samples: usize,
    rng: &mut R,
) -> Result<Vec<f64>, ArsError>
where
    F: Fn(f64) -> f64,
    R: Rng + ?Sized,
{
    AdaptiveRejectionSampler::new(func, a, b, domain)?.sample(rng, n_samples)
}
