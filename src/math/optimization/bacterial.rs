use rand::Rng;

use crate::error::Result;
use crate::math::optimization::finite_difference::norm;
use crate::math::optimization::{
    argmin, fitness_order, require_count, require_positive, require_probability, Bounds,
    ObjectiveFunction, OptimizationConfig, Optimizer, Outcome, Point, Status, TrajectoryRecorder,
};

/// Configuration specific to bacterial foraging.
///
/// The number of chemotaxis steps is the shared `max_iterations`.
#[derive(Debug, Clone, PartialEq)]
pub struct BacterialConfig {
    pub population_size: usize,
    /// Reproduction happens on each of the first `n_reproduction` steps
    pub n_reproduction: usize,
    /// Upper limit on elimination-dispersal events
    pub n_elimination: usize,
    /// Initial swim length; shrinks linearly to near zero over the run
    pub chemotaxis_step: f64,
    /// Reproductions required before elimination may happen
    pub elimination_threshold: usize,
    /// Chance of an elimination-dispersal event per step
    pub elimination_probability: f64,
    /// Bacteria respawned by one event
    pub elimination_count: usize,
}

impl Default for BacterialConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            n_reproduction: 10,
            n_elimination: 5,
            chemotaxis_step: 0.5,
            elimination_threshold: 3,
            elimination_probability: 0.25,
            elimination_count: 5,
        }
    }
}

impl BacterialConfig {
    pub fn validate(&self) -> Result<()> {
        require_count("population_size", self.population_size)?;
        require_positive("chemotaxis_step", self.chemotaxis_step)?;
        require_probability("elimination_probability", self.elimination_probability)
    }
}

#[derive(Debug, Clone)]
struct Bacterium {
    position: Point,
    value: f64,
    /// Sum of every value seen along the way; lower is healthier
    health: f64,
    improved_last_step: bool,
    direction: Point,
}

impl Bacterium {
    fn spawn<F, R>(f: &F, bounds: &Bounds, rng: &mut R) -> Self
    where
        F: ObjectiveFunction + ?Sized,
        R: Rng + ?Sized,
    {
        let position = bounds.sample(rng);
        let value = f.at(position);
        Self {
            position,
            value,
            health: value,
            improved_last_step: true,
            direction: tumble(rng),
        }
    }

    /// Swims one step, tumbling first if the previous step did not help.
    fn swim<F, R>(&mut self, f: &F, bounds: &Bounds, step: f64, rng: &mut R)
    where
        F: ObjectiveFunction + ?Sized,
        R: Rng + ?Sized,
    {
        if !self.improved_last_step {
            self.direction = tumble(rng);
        }
        self.position = bounds.clamp([
            self.position[0] + step * self.direction[0],
            self.position[1] + step * self.direction[1],
        ]);

        let value = f.at(self.position);
        self.health += value;
        self.improved_last_step = value <= self.value;
        self.value = value;
    }
}

/// A uniformly oriented unit vector.
fn tumble<R: Rng + ?Sized>(rng: &mut R) -> Point {
    loop {
        let v = [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)];
        let length = norm(v);
        if length > 0.0 {
            return [v[0] / length, v[1] / length];
        }
    }
}

struct Colony {
    bacteria: Vec<Bacterium>,
    step: f64,
    step_reduction: f64,
    reproductions: usize,
    eliminations: usize,
    best_position: Point,
    best_value: f64,
}

impl Colony {
    fn chemotaxis<F, R>(&mut self, f: &F, bounds: &Bounds, rng: &mut R)
    where
        F: ObjectiveFunction + ?Sized,
        R: Rng + ?Sized,
    {
        for bacterium in &mut self.bacteria {
            bacterium.swim(f, bounds, self.step, rng);
        }
        self.step -= self.step_reduction;
    }

    /// The healthier half splits in two; the weaker half dies.
    fn reproduction(&mut self, limit: usize) {
        if self.reproductions >= limit {
            return;
        }
        self.bacteria
            .sort_by(|a, b| fitness_order(a.health, b.health));
        let size = self.bacteria.len();
        self.bacteria = (0..size).map(|i| self.bacteria[i / 2].clone()).collect();
        self.reproductions += 1;
    }

    fn elimination<F, R>(
        &mut self,
        f: &F,
        bounds: &Bounds,
        bacterial_config: &BacterialConfig,
        rng: &mut R,
    ) where
        F: ObjectiveFunction + ?Sized,
        R: Rng + ?Sized,
    {
        let q: f64 = rng.gen();
        if self.reproductions < bacterial_config.elimination_threshold
            || q >= bacterial_config.elimination_probability
            || self.eliminations >= bacterial_config.n_elimination
        {
            return;
        }
        for _ in 0..bacterial_config.elimination_count {
            let i = rng.gen_range(0..self.bacteria.len());
            self.bacteria[i] = Bacterium::spawn(f, bounds, rng);
        }
        self.eliminations += 1;
        log::trace!("elimination-dispersal event {}", self.eliminations);
    }

    fn update_best(&mut self) {
        let values: Vec<f64> = self.bacteria.iter().map(|b| b.value).collect();
        if let Some(i) = argmin(&values) {
            if values[i] < self.best_value {
                self.best_position = self.bacteria[i].position;
                self.best_value = values[i];
            }
        }
    }
}

/// Minimizes an objective function by bacterial foraging.
///
/// Each of the `max_iterations` steps runs chemotaxis, then reproduction, then
/// elimination-dispersal, and records the best position ever visited.
pub fn minimize<F>(
    f: &F,
    bounds: &Bounds,
    config: &OptimizationConfig,
    bacterial_config: &BacterialConfig,
) -> Result<Outcome>
where
    F: ObjectiveFunction + ?Sized,
{
    config.validate()?;
    bacterial_config.validate()?;
    log::debug!(
        "bacterial foraging: {} bacteria, step {}, {} chemotaxis steps",
        bacterial_config.population_size,
        bacterial_config.chemotaxis_step,
        config.max_iterations
    );

    let mut rng = config.rng();
    let bacteria = (0..bacterial_config.population_size)
        .map(|_| Bacterium::spawn(f, bounds, &mut rng))
        .collect();
    let mut colony = Colony {
        bacteria,
        step: bacterial_config.chemotaxis_step,
        step_reduction: bacterial_config.chemotaxis_step / config.max_iterations as f64,
        reproductions: 0,
        eliminations: 0,
        best_position: bounds.lower(),
        best_value: f64::INFINITY,
    };
    colony.update_best();
    let mut recorder = TrajectoryRecorder::with_capacity(config.max_iterations.min(1024));

    for iteration in 1..=config.max_iterations {
        colony.chemotaxis(f, bounds, &mut rng);
        colony.reproduction(bacterial_config.n_reproduction);
        colony.elimination(f, bounds, bacterial_config, &mut rng);
        colony.update_best();
        recorder.record(iteration, colony.best_position, colony.best_value);
    }

    Ok(recorder.finish(Status::BudgetCompleted))
}

impl Optimizer for BacterialConfig {
    fn optimize(
        &self,
        objective: &dyn ObjectiveFunction,
        bounds: &Bounds,
        config: &OptimizationConfig,
    ) -> Result<Outcome> {
        minimize(objective, bounds, config, self)
    }
}
