use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};
use crate::math::optimization::{
    argmin, evaluate_all, require_count, require_positive, require_probability, Bounds,
    ObjectiveFunction, OptimizationConfig, Optimizer, Outcome, Point, Status, TrajectoryRecorder,
};

/// Configuration specific to genetic algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneticConfig {
    /// Population size
    pub population_size: usize,
    /// Tournament size for selection
    pub tournament_size: usize,
    /// Whether parents are recombined at all
    pub crossover_enabled: bool,
    /// Probability of crossover for a pair of parents
    pub crossover_rate: f64,
    /// Whether children are mutated at all
    pub mutation_enabled: bool,
    /// Probability of mutation, per gene
    pub mutation_rate: f64,
    /// Standard deviation of a mutation as a fraction of the box span
    pub mutation_scale: f64,
    /// Generations the best value must stay flat over to stop
    pub convergence_window: usize,
    /// Largest change of the best value over the window that still counts as flat
    pub convergence_tolerance: f64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            tournament_size: 3,
            crossover_enabled: true,
            crossover_rate: 0.8,
            mutation_enabled: true,
            mutation_rate: 0.1,
            mutation_scale: 0.1,
            convergence_window: 20,
            convergence_tolerance: 1e-6,
        }
    }
}

impl GeneticConfig {
    pub fn validate(&self) -> Result<()> {
        require_count("population_size", self.population_size)?;
        require_count("tournament_size", self.tournament_size)?;
        require_probability("crossover_rate", self.crossover_rate)?;
        require_probability("mutation_rate", self.mutation_rate)?;
        require_positive("mutation_scale", self.mutation_scale)?;
        require_count("convergence_window", self.convergence_window)?;
        require_positive("convergence_tolerance", self.convergence_tolerance)
    }
}

/// Minimizes an objective function using a Genetic Algorithm.
///
/// Chromosomes are points of the plane. Each generation is bred entirely from
/// the previous one through tournament selection, blend crossover and Gaussian
/// mutation, with children clamped to `bounds`. The recorded best is the best
/// individual seen so far.
///
/// # Arguments
///
/// * `f` - The objective function to minimize
/// * `bounds` - Box the population lives in
/// * `config` - Generation budget and seed
/// * `ga_config` - Configuration specific to the genetic algorithm
///
/// # Returns
///
/// `Stagnated` once the best value has moved less than the tolerance over the
/// convergence window, `BudgetExhausted` otherwise.
///
/// # Examples
///
/// ```
/// use optim2d::{Bounds, OptimizationConfig};
/// use optim2d::math::optimization::genetic::{minimize, GeneticConfig};
///
/// let bounds = Bounds::new(-10.0, 10.0, -10.0, 10.0).unwrap();
/// let config = OptimizationConfig { max_iterations: 200, seed: Some(3) };
///
/// let outcome = minimize(&|x: f64, y: f64| x * x + y * y, &bounds, &config, &GeneticConfig::default()).unwrap();
/// assert!(outcome.best().unwrap().f_value < 1.0);
/// ```
pub fn minimize<F>(
    f: &F,
    bounds: &Bounds,
    config: &OptimizationConfig,
    ga_config: &GeneticConfig,
) -> Result<Outcome>
where
    F: ObjectiveFunction + ?Sized,
{
    config.validate()?;
    ga_config.validate()?;
    log::debug!(
        "genetic algorithm: population {}, crossover {} ({}), mutation {} ({})",
        ga_config.population_size,
        ga_config.crossover_enabled,
        ga_config.crossover_rate,
        ga_config.mutation_enabled,
        ga_config.mutation_rate
    );

    let span = bounds.span();
    let mutation = [
        gaussian(ga_config.mutation_scale * span[0])?,
        gaussian(ga_config.mutation_scale * span[1])?,
    ];

    let mut rng = config.rng();
    let mut population: Vec<Point> = (0..ga_config.population_size)
        .map(|_| bounds.sample(&mut rng))
        .collect();
    let mut fitness = evaluate_all(f, &population);

    let (mut best_position, mut best_value) = match argmin(&fitness) {
        Some(i) => (population[i], fitness[i]),
        None => (bounds.lower(), f64::INFINITY),
    };
    let mut best_history = Vec::with_capacity(config.max_iterations);
    let mut recorder = TrajectoryRecorder::with_capacity(config.max_iterations.min(1024));

    for generation in 1..=config.max_iterations {
        let mut offspring = Vec::with_capacity(ga_config.population_size);
        while offspring.len() < ga_config.population_size {
            let parent1 = tournament_select(&population, &fitness, ga_config.tournament_size, &mut rng);
            let parent2 = tournament_select(&population, &fitness, ga_config.tournament_size, &mut rng);

            let children = if ga_config.crossover_enabled && rng.gen::<f64>() < ga_config.crossover_rate {
                crossover(parent1, parent2, &mut rng)
            } else {
                (parent1, parent2)
            };

            for mut child in [children.0, children.1] {
                if offspring.len() == ga_config.population_size {
                    break;
                }
                if ga_config.mutation_enabled {
                    mutate(&mut child, &mutation, ga_config.mutation_rate, &mut rng);
                }
                offspring.push(bounds.clamp(child));
            }
        }

        population = offspring;
        fitness = evaluate_all(f, &population);
        if let Some(i) = argmin(&fitness) {
            if fitness[i] < best_value {
                best_position = population[i];
                best_value = fitness[i];
            }
        }

        recorder.record(generation, best_position, best_value);
        best_history.push(best_value);

        if compute_convergence_metric(&best_history, ga_config.convergence_window)
            < ga_config.convergence_tolerance
        {
            return Ok(recorder.finish(Status::Stagnated));
        }
    }

    Ok(recorder.finish(Status::BudgetExhausted))
}

fn gaussian(std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std_dev).map_err(|e| Error::invalid("mutation_scale", e.to_string()))
}

// Tournament selection
fn tournament_select<R: Rng + ?Sized>(
    population: &[Point],
    fitness: &[f64],
    tournament_size: usize,
    rng: &mut R,
) -> Point {
    let mut best_idx = rng.gen_range(0..population.len());
    let mut best_fitness = fitness[best_idx];

    for _ in 1..tournament_size {
        let idx = rng.gen_range(0..population.len());
        if fitness[idx] < best_fitness || best_fitness.is_nan() {
            best_idx = idx;
            best_fitness = fitness[idx];
        }
    }

    population[best_idx]
}

// Blend crossover: each gene mixes with weight 0.25 or 1.75, so children can
// land outside the segment between their parents.
fn crossover<R: Rng + ?Sized>(parent1: Point, parent2: Point, rng: &mut R) -> (Point, Point) {
    let mut child1 = parent1;
    let mut child2 = parent2;

    for i in 0..2 {
        let beta = if rng.gen::<bool>() { 0.25 } else { 1.75 };
        child1[i] = beta * parent1[i] + (1.0 - beta) * parent2[i];
        child2[i] = beta * parent2[i] + (1.0 - beta) * parent1[i];
    }

    (child1, child2)
}

// Gaussian mutation, gene by gene
fn mutate<R: Rng + ?Sized>(individual: &mut Point, steps: &[Normal<f64>; 2], rate: f64, rng: &mut R) {
    for (gene, step) in individual.iter_mut().zip(steps) {
        if rng.gen::<f64>() < rate {
            *gene += step.sample(rng);
        }
    }
}

// Spread of the best value over the trailing window
fn compute_convergence_metric(best_history: &[f64], window_size: usize) -> f64 {
    if best_history.len() < window_size {
        return f64::MAX;
    }

    let window = &best_history[best_history.len() - window_size..];
    let min_fitness = window.iter().copied().fold(f64::INFINITY, f64::min);
    let max_fitness = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    max_fitness - min_fitness
}

impl Optimizer for GeneticConfig {
    fn optimize(
        &self,
        objective: &dyn ObjectiveFunction,
        bounds: &Bounds,
        config: &OptimizationConfig,
    ) -> Result<Outcome> {
        minimize(objective, bounds, config, self)
    }
}
