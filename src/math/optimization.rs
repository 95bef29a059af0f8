pub mod bacterial;
pub mod bee_colony;
pub mod catalog;
pub mod finite_difference;
pub mod genetic;
pub mod gradient_descent;
pub mod history;
pub mod hybrid;
pub mod immune;
pub mod particle_swarm;
pub mod simplex;
pub mod sites;

#[cfg(test)]
mod tests;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::{Error, Result};

pub use bacterial::minimize as bacterial_minimize;
pub use bee_colony::minimize as bee_colony_minimize;
pub use catalog::{NamedObjective, ObjectiveCatalog};
pub use finite_difference::gradient;
pub use genetic::minimize as genetic_minimize;
pub use gradient_descent::minimize as gradient_descent_minimize;
pub use history::{Outcome, Snapshot, Status, TrajectoryRecorder};
pub use hybrid::minimize as hybrid_minimize;
pub use immune::minimize as immune_minimize;
pub use particle_swarm::minimize as particle_swarm_minimize;
pub use simplex::optimize as simplex_optimize;

/// A point of the search plane, `[x, y]`.
///
/// Points are `Copy`, so recording a position as a best always takes a
/// snapshot of it rather than a reference to a live agent.
pub type Point = [f64; 2];

/// A scalar objective over the plane. Lower is better.
pub trait ObjectiveFunction: Sync {
    /// Evaluates the objective at `(x, y)`.
    fn evaluate(&self, x: f64, y: f64) -> f64;

    /// Analytic gradient at `(x, y)`.
    /// Returns None if it is not available, in which case callers fall back to
    /// central differences.
    fn gradient(&self, _x: f64, _y: f64) -> Option<[f64; 2]> {
        None
    }

    /// Evaluates the objective at a point.
    fn at(&self, point: Point) -> f64 {
        self.evaluate(point[0], point[1])
    }
}

impl<F> ObjectiveFunction for F
where
    F: Fn(f64, f64) -> f64 + Sync,
{
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// The feasible box `[x_min, x_max] × [y_min, y_max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    lower: Point,
    upper: Point,
}

impl Bounds {
    /// Creates a box, rejecting empty, inverted or non-finite intervals.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Self> {
        for (name, lo, hi) in [("bounds.x", x_min, x_max), ("bounds.y", y_min, y_max)] {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(Error::invalid(name, "interval ends must be finite"));
            }
            if lo >= hi {
                return Err(Error::invalid(
                    name,
                    format!("lower end {lo} must be below upper end {hi}"),
                ));
            }
            if !(hi - lo).is_finite() {
                return Err(Error::invalid(name, "interval width overflows"));
            }
        }
        Ok(Self::unchecked([x_min, y_min], [x_max, y_max]))
    }

    /// Creates a box from `[[x_min, x_max], [y_min, y_max]]`.
    pub fn from_pairs(pairs: [[f64; 2]; 2]) -> Result<Self> {
        Self::new(pairs[0][0], pairs[0][1], pairs[1][0], pairs[1][1])
    }

    pub(crate) const fn unchecked(lower: Point, upper: Point) -> Self {
        Self { lower, upper }
    }

    pub fn lower(&self) -> Point {
        self.lower
    }

    pub fn upper(&self) -> Point {
        self.upper
    }

    /// Width of the box along each axis.
    pub fn span(&self) -> Point {
        [
            self.upper[0] - self.lower[0],
            self.upper[1] - self.lower[1],
        ]
    }

    pub fn contains(&self, point: Point) -> bool {
        (0..2).all(|i| point[i] >= self.lower[i] && point[i] <= self.upper[i])
    }

    /// Projects a point onto the box, axis by axis.
    pub fn clamp(&self, point: Point) -> Point {
        [
            point[0].clamp(self.lower[0], self.upper[0]),
            point[1].clamp(self.lower[1], self.upper[1]),
        ]
    }

    /// Draws a point uniformly from the box.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        [
            rng.gen_range(self.lower[0]..=self.upper[0]),
            rng.gen_range(self.lower[1]..=self.upper[1]),
        ]
    }

    /// Additive exterior penalty: `ratio * |coord - bound|` summed over every
    /// violated side. Zero inside the box.
    pub fn penalty(&self, point: Point, ratio: f64) -> f64 {
        let mut penalty = 0.0;
        for i in 0..2 {
            if point[i] < self.lower[i] {
                penalty += ratio * (point[i] - self.lower[i]).abs();
            } else if point[i] > self.upper[i] {
                penalty += ratio * (point[i] - self.upper[i]).abs();
            }
        }
        penalty
    }
}

/// Configuration shared by every optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationConfig {
    /// Iteration budget
    pub max_iterations: usize,
    /// PRNG seed; the same seed reproduces the same history
    pub seed: Option<u64>,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            seed: None,
        }
    }
}

impl OptimizationConfig {
    pub fn validate(&self) -> Result<()> {
        require_count("max_iterations", self.max_iterations)
    }

    pub(crate) fn rng(&self) -> ChaCha20Rng {
        match self.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        }
    }
}

/// Common entry point implemented by every bounded optimizer configuration.
pub trait Optimizer {
    /// Runs the optimizer on `objective` over `bounds`.
    fn optimize(
        &self,
        objective: &dyn ObjectiveFunction,
        bounds: &Bounds,
        config: &OptimizationConfig,
    ) -> Result<Outcome>;
}

/// The closed set of bounded optimizers, each carrying its own configuration.
#[derive(Debug, Clone)]
pub enum Method {
    GradientDescent(gradient_descent::GradientDescentConfig),
    ParticleSwarm(particle_swarm::SwarmConfig),
    BeeColony(bee_colony::BeeConfig),
    Hybrid(hybrid::HybridConfig),
    Genetic(genetic::GeneticConfig),
    Immune(immune::ImmuneConfig),
    Bacterial(bacterial::BacterialConfig),
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::GradientDescent(_) => "gradient descent",
            Method::ParticleSwarm(_) => "particle swarm",
            Method::BeeColony(_) => "bee colony",
            Method::Hybrid(_) => "hybrid swarm",
            Method::Genetic(_) => "genetic algorithm",
            Method::Immune(_) => "immune network",
            Method::Bacterial(_) => "bacterial foraging",
        }
    }
}

impl Optimizer for Method {
    fn optimize(
        &self,
        objective: &dyn ObjectiveFunction,
        bounds: &Bounds,
        config: &OptimizationConfig,
    ) -> Result<Outcome> {
        log::debug!("running {} for {} iterations", self.name(), config.max_iterations);
        match self {
            Method::GradientDescent(c) => c.optimize(objective, bounds, config),
            Method::ParticleSwarm(c) => c.optimize(objective, bounds, config),
            Method::BeeColony(c) => c.optimize(objective, bounds, config),
            Method::Hybrid(c) => c.optimize(objective, bounds, config),
            Method::Genetic(c) => c.optimize(objective, bounds, config),
            Method::Immune(c) => c.optimize(objective, bounds, config),
            Method::Bacterial(c) => c.optimize(objective, bounds, config),
        }
    }
}

pub(crate) fn require_count(name: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::invalid(name, "must be at least 1"));
    }
    Ok(())
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(Error::invalid(name, format!("must be finite and positive, got {value}")));
    }
    Ok(())
}

pub(crate) fn require_probability(name: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::invalid(name, format!("must lie in [0, 1], got {value}")));
    }
    Ok(())
}

pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::invalid(name, format!("must be finite, got {value}")));
    }
    Ok(())
}

pub(crate) fn distance(a: Point, b: Point) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Index of the smallest value; NaN never wins.
pub(crate) fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.map_or(true, |b| v < values[b]) {
            best = Some(i);
        }
    }
    best
}

/// Evaluates the objective at every point, on rayon's pool when the
/// `parallel` feature is enabled. Results keep the input order.
pub(crate) fn evaluate_all<F>(f: &F, points: &[Point]) -> Vec<f64>
where
    F: ObjectiveFunction + ?Sized,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        points.par_iter().map(|&p| f.at(p)).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        points.iter().map(|&p| f.at(p)).collect()
    }
}

/// Total order for sorting fitness values, NaN last.
pub(crate) fn fitness_order(a: f64, b: f64) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}
