use rand::Rng;

use crate::error::Result;
use crate::math::optimization::{
    evaluate_all, fitness_order, require_count, require_positive, Bounds, ObjectiveFunction,
    OptimizationConfig, Optimizer, Outcome, Point, Status, TrajectoryRecorder,
};

/// Best values closer than this count as no improvement.
const STAGNATION_EPSILON: f64 = 1e-16;

/// Configuration specific to the artificial immune network.
#[derive(Debug, Clone, PartialEq)]
pub struct ImmuneConfig {
    /// Antibodies kept between iterations
    pub population_size: usize,
    /// Best antibodies selected for cloning (`nb`)
    pub clone_parents: usize,
    /// Clones made of each selected antibody (`nc`)
    pub clones_per_parent: usize,
    /// Best clones merged back into the population (`nd`)
    pub clones_kept: usize,
    /// Initial mutation amplitude; decays linearly to zero over the budget
    pub mutation: f64,
    /// Iterations without improvement before the run stops
    pub tolerance_steps: usize,
}

impl Default for ImmuneConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            clone_parents: 10,
            clones_per_parent: 10,
            clones_kept: 20,
            mutation: 1.0,
            tolerance_steps: 20,
        }
    }
}

impl ImmuneConfig {
    pub fn validate(&self) -> Result<()> {
        require_count("population_size", self.population_size)?;
        require_count("clone_parents", self.clone_parents)?;
        require_count("clones_per_parent", self.clones_per_parent)?;
        require_count("clones_kept", self.clones_kept)?;
        require_positive("mutation", self.mutation)?;
        require_count("tolerance_steps", self.tolerance_steps)
    }
}

struct Network {
    antibodies: Vec<Point>,
    fitness: Vec<f64>,
}

impl Network {
    /// Indices ordered best first.
    fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.antibodies.len()).collect();
        order.sort_by(|&a, &b| fitness_order(self.fitness[a], self.fitness[b]));
        order
    }

    /// Keeps the `count` best antibodies, best first.
    fn truncate_to_best(&mut self, count: usize) {
        let order = self.ranking();
        let keep = &order[..count.min(order.len())];
        self.antibodies = keep.iter().map(|&i| self.antibodies[i]).collect();
        self.fitness = keep.iter().map(|&i| self.fitness[i]).collect();
    }
}

/// Minimizes an objective function with a clonal-selection immune network.
///
/// Every iteration clones the best antibodies, mutates the clones with an
/// amplitude that shrinks linearly over the budget, and lets the best clones
/// compete with their parents for a place in the population. Stops as
/// `Stagnated` once the best value has not changed for `tolerance_steps`
/// iterations.
pub fn minimize<F>(
    f: &F,
    bounds: &Bounds,
    config: &OptimizationConfig,
    immune_config: &ImmuneConfig,
) -> Result<Outcome>
where
    F: ObjectiveFunction + ?Sized,
{
    config.validate()?;
    immune_config.validate()?;
    log::debug!(
        "immune network: {} antibodies, nb {}, nc {}, nd {}, mutation {}",
        immune_config.population_size,
        immune_config.clone_parents,
        immune_config.clones_per_parent,
        immune_config.clones_kept,
        immune_config.mutation
    );

    let mut rng = config.rng();
    let antibodies: Vec<Point> = (0..immune_config.population_size)
        .map(|_| bounds.sample(&mut rng))
        .collect();
    let fitness = evaluate_all(f, &antibodies);
    let mut network = Network { antibodies, fitness };

    let decay = immune_config.mutation / config.max_iterations as f64;
    let mut mutation_rate = immune_config.mutation;
    let mut best_position = bounds.lower();
    let mut best_value = f64::INFINITY;
    let mut no_improvement = 0;
    let mut recorder = TrajectoryRecorder::with_capacity(config.max_iterations.min(1024));

    for iteration in 1..=config.max_iterations {
        let ranking = network.ranking();
        let mut clones = Vec::with_capacity(immune_config.clone_parents * immune_config.clones_per_parent);
        for &parent in ranking.iter().take(immune_config.clone_parents) {
            let origin = network.antibodies[parent];
            for _ in 0..immune_config.clones_per_parent {
                clones.push(bounds.clamp([
                    origin[0] + mutation_rate * rng.gen_range(-0.5..0.5),
                    origin[1] + mutation_rate * rng.gen_range(-0.5..0.5),
                ]));
            }
        }
        let clone_fitness = evaluate_all(f, &clones);

        let mut matured = Network {
            antibodies: clones,
            fitness: clone_fitness,
        };
        matured.truncate_to_best(immune_config.clones_kept);
        network.antibodies.extend(matured.antibodies);
        network.fitness.extend(matured.fitness);
        network.truncate_to_best(immune_config.population_size);

        mutation_rate -= decay;

        let (current_position, current_value) = (network.antibodies[0], network.fitness[0]);
        if (best_value - current_value).abs() < STAGNATION_EPSILON {
            no_improvement += 1;
        } else {
            no_improvement = 0;
        }
        if current_value < best_value {
            best_position = current_position;
            best_value = current_value;
        }
        recorder.record(iteration, best_position, best_value);

        if no_improvement >= immune_config.tolerance_steps {
            return Ok(recorder.finish(Status::Stagnated));
        }
    }

    Ok(recorder.finish(Status::BudgetExhausted))
}

impl Optimizer for ImmuneConfig {
    fn optimize(
        &self,
        objective: &dyn ObjectiveFunction,
        bounds: &Bounds,
        config: &OptimizationConfig,
    ) -> Result<Outcome> {
        minimize(objective, bounds, config, self)
    }
}
