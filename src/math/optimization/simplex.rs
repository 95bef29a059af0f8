//! Quadratic programs over the non-negative quadrant.
//!
//! The solver is Nelder-Mead on the objective plus a shifted quadratic
//! exterior penalty (augmented Lagrangian). Each round restarts from the
//! previous solution with updated multipliers, and the penalty weight grows
//! only while the violation is not shrinking fast enough.

use crate::error::{Error, Result};
use crate::math::optimization::{
    fitness_order, require_count, require_positive, ObjectiveFunction, Outcome, Point, Status,
    TrajectoryRecorder,
};

/// Whether the program is minimized or maximized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// The half-plane `a·x + b·y ≤ c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearConstraint {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl LinearConstraint {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// How far `point` lies outside the half-plane, zero if inside.
    pub fn violation(&self, point: Point) -> f64 {
        (self.a * point[0] + self.b * point[1] - self.c).max(0.0)
    }
}

/// `a1·x² + a2·y² + a3·x·y + a4·x + a5·y` subject to linear constraints and
/// `x ≥ 0`, `y ≥ 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticProgram {
    pub coefficients: [f64; 5],
    pub constraints: Vec<LinearConstraint>,
    pub sense: Sense,
}

impl QuadraticProgram {
    pub fn new(coefficients: [f64; 5], sense: Sense) -> Self {
        Self {
            coefficients,
            constraints: Vec::new(),
            sense,
        }
    }

    /// Adds `a·x + b·y ≤ c`.
    pub fn with_constraint(mut self, a: f64, b: f64, c: f64) -> Self {
        self.constraints.push(LinearConstraint::new(a, b, c));
        self
    }

    /// Builds a program from constraints packed as `[a, b, c, a, b, c, ...]`.
    pub fn from_flat(coefficients: [f64; 5], packed: &[f64], sense: Sense) -> Result<Self> {
        if packed.len() % 3 != 0 {
            return Err(Error::invalid(
                "constraints",
                format!("expected triples of (a, b, c), got {} numbers", packed.len()),
            ));
        }
        let constraints = packed
            .chunks_exact(3)
            .map(|t| LinearConstraint::new(t[0], t[1], t[2]))
            .collect();
        Ok(Self {
            coefficients,
            constraints,
            sense,
        })
    }

    pub fn objective(&self, point: Point) -> f64 {
        let [x, y] = point;
        let [a1, a2, a3, a4, a5] = self.coefficients;
        a1 * x * x + a2 * y * y + a3 * x * y + a4 * x + a5 * y
    }

    /// Largest violation over all constraints, including non-negativity.
    pub fn max_violation(&self, point: Point) -> f64 {
        self.slacks(point).map(|g| g.max(0.0)).fold(0.0, f64::max)
    }

    /// `g(point)` for every constraint written as `g ≤ 0`, the two
    /// non-negativity constraints last.
    fn slacks(&self, point: Point) -> impl Iterator<Item = f64> + '_ {
        self.constraints
            .iter()
            .map(move |c| c.a * point[0] + c.b * point[1] - c.c)
            .chain([-point[0], -point[1]])
    }

    fn constraint_count(&self) -> usize {
        self.constraints.len() + 2
    }

    /// Objective turned into a minimization, plus `w/2 · Σ max(0, λ/w + g)²`.
    fn augmented(&self, point: Point, weight: f64, multipliers: &[f64]) -> f64 {
        let sign = match self.sense {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        };
        let shifted: f64 = self
            .slacks(point)
            .zip(multipliers)
            .map(|(g, &lambda)| (lambda / weight + g).max(0.0).powi(2))
            .sum();
        sign * self.objective(point) + 0.5 * weight * shifted
    }
}

impl ObjectiveFunction for QuadraticProgram {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        self.objective([x, y])
    }
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexConfig {
    /// Nelder-Mead iterations allowed over all penalty rounds
    pub max_iterations: usize,
    /// Simplex diameter and value spread below which a round has converged
    pub tolerance: f64,
    /// Largest constraint violation accepted as feasible
    pub feasibility_tolerance: f64,
    /// Penalty weight of the first round
    pub initial_penalty: f64,
    /// Factor the penalty weight grows by when a round did not cut the
    /// violation to a quarter
    pub penalty_growth: f64,
    pub max_penalty_rounds: usize,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-9,
            feasibility_tolerance: 1e-6,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            max_penalty_rounds: 30,
        }
    }
}

impl SimplexConfig {
    pub fn validate(&self) -> Result<()> {
        require_count("max_iterations", self.max_iterations)?;
        require_positive("tolerance", self.tolerance)?;
        require_positive("feasibility_tolerance", self.feasibility_tolerance)?;
        require_positive("initial_penalty", self.initial_penalty)?;
        if !(self.penalty_growth.is_finite() && self.penalty_growth > 1.0) {
            return Err(Error::invalid(
                "penalty_growth",
                format!("must be finite and above 1, got {}", self.penalty_growth),
            ));
        }
        require_count("max_penalty_rounds", self.max_penalty_rounds)
    }
}

/// Solves a quadratic program from `start`.
///
/// The outcome holds a single snapshot: the final point, its objective value
/// (in the program's own sense, not negated) and the number of Nelder-Mead
/// iterations used. It is converged when the last round converged and the
/// point is feasible within `feasibility_tolerance`.
///
/// # Examples
///
/// ```
/// use optim2d::math::optimization::simplex::{optimize, QuadraticProgram, Sense, SimplexConfig};
///
/// // (x - 2)² + (y - 2)² without the constant, on x + y ≤ 2
/// let program = QuadraticProgram::new([1.0, 1.0, 0.0, -4.0, -4.0], Sense::Minimize)
///     .with_constraint(1.0, 1.0, 2.0);
///
/// let outcome = optimize([0.0, 0.0], &program, &SimplexConfig::default()).unwrap();
/// assert!(outcome.converged);
/// assert!((outcome.best().unwrap().x - 1.0).abs() < 1e-4);
/// ```
pub fn optimize(start: Point, program: &QuadraticProgram, simplex_config: &SimplexConfig) -> Result<Outcome> {
    simplex_config.validate()?;
    if !(start[0].is_finite() && start[1].is_finite()) {
        return Err(Error::invalid("start", "coordinates must be finite"));
    }
    log::debug!(
        "quadratic program ({:?}) with {} constraints from ({}, {})",
        program.sense,
        program.constraints.len(),
        start[0],
        start[1]
    );

    let mut point = start;
    let mut weight = simplex_config.initial_penalty;
    let mut multipliers = vec![0.0; program.constraint_count()];
    let mut last_violation = f64::INFINITY;
    let mut used = 0;
    let mut converged = false;

    for round in 1..=simplex_config.max_penalty_rounds {
        let budget = simplex_config.max_iterations - used;
        if budget == 0 {
            break;
        }
        let search = nelder_mead(
            |p| program.augmented(p, weight, &multipliers),
            point,
            budget,
            simplex_config.tolerance,
        );
        used += search.iterations;
        point = search.point;

        let violation = program.max_violation(point);
        log::trace!("penalty round {round}: weight {weight:e}, violation {violation:e}");
        converged = search.converged && violation <= simplex_config.feasibility_tolerance;
        if converged {
            break;
        }

        for (lambda, g) in multipliers.iter_mut().zip(program.slacks(point)) {
            *lambda = (*lambda + weight * g).max(0.0);
        }
        if violation > 0.25 * last_violation {
            weight *= simplex_config.penalty_growth;
        }
        last_violation = violation;
    }

    let status = if converged {
        Status::SolverSucceeded(program.sense)
    } else {
        log::warn!(
            "quadratic program not solved after {used} iterations, violation {:e}",
            program.max_violation(point)
        );
        Status::SolverFailed(program.sense)
    };

    let mut recorder = TrajectoryRecorder::with_capacity(1);
    recorder.record(used, point, program.objective(point));
    Ok(recorder.finish(status))
}

struct Search {
    point: Point,
    iterations: usize,
    converged: bool,
}

// Nelder-Mead over the plane. Converged once the simplex diameter and the
// spread of its values both drop below `tolerance`.
fn nelder_mead<F>(f: F, start: Point, max_iterations: usize, tolerance: f64) -> Search
where
    F: Fn(Point) -> f64,
{
    let alpha = 1.0; // reflection coefficient
    let gamma = 2.0; // expansion coefficient
    let rho = 0.5; // contraction coefficient
    let sigma = 0.5; // shrink coefficient

    let mut simplex = initialize_simplex(start);
    let mut values = simplex.map(&f);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        order_simplex(&mut simplex, &mut values);

        let size_measure = compute_simplex_size(&simplex);
        let value_range = values[2] - values[0];
        if size_measure < tolerance && value_range <= tolerance * (1.0 + values[0].abs()) {
            converged = true;
            break;
        }

        let centroid = compute_centroid(&simplex[..2]);

        let reflected = reflect(centroid, simplex[2], alpha);
        let reflected_value = f(reflected);

        if values[0] <= reflected_value && reflected_value < values[1] {
            simplex[2] = reflected;
            values[2] = reflected_value;
        } else if reflected_value < values[0] {
            let expanded = reflect(centroid, simplex[2], gamma);
            let expanded_value = f(expanded);

            if expanded_value < reflected_value {
                simplex[2] = expanded;
                values[2] = expanded_value;
            } else {
                simplex[2] = reflected;
                values[2] = reflected_value;
            }
        } else {
            let contracted = reflect(centroid, simplex[2], -rho);
            let contracted_value = f(contracted);

            if contracted_value < values[2] {
                simplex[2] = contracted;
                values[2] = contracted_value;
            } else {
                // Shrink towards the best vertex
                let best = simplex[0];
                for i in 1..3 {
                    simplex[i] = [
                        best[0] + sigma * (simplex[i][0] - best[0]),
                        best[1] + sigma * (simplex[i][1] - best[1]),
                    ];
                    values[i] = f(simplex[i]);
                }
            }
        }

        iterations += 1;
    }

    order_simplex(&mut simplex, &mut values);
    Search {
        point: simplex[0],
        iterations,
        converged,
    }
}

// Initial simplex: the start plus one vertex nudged along each axis
fn initialize_simplex(start: Point) -> [Point; 3] {
    let scale = 0.1;
    let mut simplex = [start; 3];
    for i in 0..2 {
        let vertex = &mut simplex[i + 1][i];
        if *vertex == 0.0 {
            *vertex = scale;
        } else {
            *vertex *= 1.0 + scale;
        }
    }
    simplex
}

// Order simplex vertices by function value
fn order_simplex(simplex: &mut [Point; 3], values: &mut [f64; 3]) {
    let mut order = [0, 1, 2];
    order.sort_by(|&a, &b| fitness_order(values[a], values[b]));
    let sorted_simplex = order.map(|i| simplex[i]);
    let sorted_values = order.map(|i| values[i]);
    *simplex = sorted_simplex;
    *values = sorted_values;
}

fn compute_centroid(points: &[Point]) -> Point {
    let m = points.len() as f64;
    let sum = points
        .iter()
        .fold([0.0, 0.0], |acc, p| [acc[0] + p[0], acc[1] + p[1]]);
    [sum[0] / m, sum[1] / m]
}

// Reflect point through centroid
fn reflect(centroid: Point, point: Point, coefficient: f64) -> Point {
    [
        centroid[0] + coefficient * (centroid[0] - point[0]),
        centroid[1] + coefficient * (centroid[1] - point[1]),
    ]
}

// Largest distance between any two vertices
fn compute_simplex_size(simplex: &[Point; 3]) -> f64 {
    let mut max_dist: f64 = 0.0;
    for i in 0..3 {
        for j in (i + 1)..3 {
            let dist = (simplex[i][0] - simplex[j][0]).hypot(simplex[i][1] - simplex[j][1]);
            max_dist = max_dist.max(dist);
        }
    }
    max_dist
}
