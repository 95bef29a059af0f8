use rand::Rng;

use crate::error::{Error, Result};
use crate::math::optimization::{
    require_count, require_positive, Bounds, ObjectiveFunction, OptimizationConfig, Optimizer,
    Outcome, Point, Status, TrajectoryRecorder,
};

/// Configuration specific to the constriction-coefficient particle swarm.
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmConfig {
    /// Number of particles
    pub swarm_size: usize,
    /// Scales the constriction coefficient
    pub current_velocity_ratio: f64,
    /// Pull towards the particle's own best (φp)
    pub local_velocity_ratio: f64,
    /// Pull towards the swarm best (φg)
    pub global_velocity_ratio: f64,
    /// Slope of the penalty applied outside the bounds
    pub penalty_ratio: f64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            swarm_size: 50,
            current_velocity_ratio: 0.5,
            local_velocity_ratio: 2.0,
            global_velocity_ratio: 5.0,
            penalty_ratio: 10.0,
        }
    }
}

impl SwarmConfig {
    pub fn validate(&self) -> Result<()> {
        require_count("swarm_size", self.swarm_size)?;
        require_positive("current_velocity_ratio", self.current_velocity_ratio)?;
        require_positive("local_velocity_ratio", self.local_velocity_ratio)?;
        require_positive("global_velocity_ratio", self.global_velocity_ratio)?;
        require_positive("penalty_ratio", self.penalty_ratio)?;
        self.constriction().map(|_| ())
    }

    /// The constriction coefficient χ = 2κ / |2 − φ − √(φ² − 4φ)|.
    ///
    /// Defined only when φ = φp + φg exceeds 4.
    pub fn constriction(&self) -> Result<f64> {
        let phi = self.local_velocity_ratio + self.global_velocity_ratio;
        if phi <= 4.0 {
            return Err(Error::ConstraintViolation(format!(
                "local_velocity_ratio + global_velocity_ratio must exceed 4, got {phi}"
            )));
        }
        Ok(2.0 * self.current_velocity_ratio / (2.0 - phi - (phi * phi - 4.0 * phi).sqrt()).abs())
    }
}

#[derive(Debug, Clone)]
struct Particle {
    position: Point,
    velocity: Point,
    best_position: Point,
    best_fitness: f64,
}

struct Swarm<'a, F: ?Sized> {
    f: &'a F,
    bounds: Bounds,
    penalty_ratio: f64,
    particles: Vec<Particle>,
    best_position: Point,
    best_value: f64,
}

impl<'a, F> Swarm<'a, F>
where
    F: ObjectiveFunction + ?Sized,
{
    fn new<R: Rng + ?Sized>(
        f: &'a F,
        bounds: Bounds,
        pso_config: &SwarmConfig,
        rng: &mut R,
    ) -> Self {
        let span = bounds.span();
        let mut swarm = Self {
            f,
            bounds,
            penalty_ratio: pso_config.penalty_ratio,
            particles: Vec::with_capacity(pso_config.swarm_size),
            best_position: bounds.lower(),
            best_value: f64::INFINITY,
        };

        for _ in 0..pso_config.swarm_size {
            let position = bounds.sample(rng);
            let velocity = [
                span[0] * rng.gen_range(-1.0..=1.0),
                span[1] * rng.gen_range(-1.0..=1.0),
            ];
            let fitness = swarm.fitness(position);
            swarm.particles.push(Particle {
                position,
                velocity,
                best_position: position,
                best_fitness: fitness,
            });
        }
        swarm
    }

    /// Penalized fitness of `position`. The raw value updates the swarm best
    /// immediately, so particles later in the same sweep already see it.
    fn fitness(&mut self, position: Point) -> f64 {
        let raw = self.f.at(position);
        if raw < self.best_value {
            self.best_position = position;
            self.best_value = raw;
        }
        raw + self.bounds.penalty(position, self.penalty_ratio)
    }

    fn step<R: Rng + ?Sized>(&mut self, chi: f64, phi_p: f64, phi_g: f64, rng: &mut R) {
        for i in 0..self.particles.len() {
            let mut particle = self.particles[i].clone();
            for d in 0..2 {
                let r1: f64 = rng.gen();
                let r2: f64 = rng.gen();
                particle.velocity[d] = chi * particle.velocity[d]
                    + chi * phi_p * r1 * (particle.best_position[d] - particle.position[d])
                    + chi * phi_g * r2 * (self.best_position[d] - particle.position[d]);
                particle.position[d] += particle.velocity[d];
            }

            let fitness = self.fitness(particle.position);
            if fitness < particle.best_fitness {
                particle.best_fitness = fitness;
                particle.best_position = particle.position;
            }
            self.particles[i] = particle;
        }
    }
}

/// Minimizes an objective function with a particle swarm.
///
/// Positions are not clamped; leaving `bounds` costs a linear penalty in the
/// fitness that drives each particle's own best. The swarm best tracks raw
/// objective values. Runs exactly `max_iterations` iterations and records the
/// swarm best after each one.
///
/// # Examples
///
/// ```
/// use optim2d::{Bounds, OptimizationConfig};
/// use optim2d::math::optimization::particle_swarm::{minimize, SwarmConfig};
///
/// let bounds = Bounds::new(-5.0, 5.0, -5.0, 5.0).unwrap();
/// let config = OptimizationConfig { max_iterations: 50, seed: Some(1) };
///
/// let outcome = minimize(&|x: f64, y: f64| x * x + y * y, &bounds, &config, &SwarmConfig::default()).unwrap();
/// assert_eq!(outcome.history.len(), 50);
/// ```
pub fn minimize<F>(
    f: &F,
    bounds: &Bounds,
    config: &OptimizationConfig,
    pso_config: &SwarmConfig,
) -> Result<Outcome>
where
    F: ObjectiveFunction + ?Sized,
{
    config.validate()?;
    pso_config.validate()?;
    let chi = pso_config.constriction()?;
    log::debug!(
        "particle swarm: {} particles, chi {chi:.6}, phi_p {}, phi_g {}",
        pso_config.swarm_size,
        pso_config.local_velocity_ratio,
        pso_config.global_velocity_ratio
    );

    let mut rng = config.rng();
    let mut swarm = Swarm::new(f, *bounds, pso_config, &mut rng);
    let mut recorder = TrajectoryRecorder::with_capacity(config.max_iterations);

    for iteration in 1..=config.max_iterations {
        swarm.step(
            chi,
            pso_config.local_velocity_ratio,
            pso_config.global_velocity_ratio,
            &mut rng,
        );
        recorder.record(iteration, swarm.best_position, swarm.best_value);
    }

    Ok(recorder.finish(Status::BudgetCompleted))
}

impl Optimizer for SwarmConfig {
    fn optimize(
        &self,
        objective: &dyn ObjectiveFunction,
        bounds: &Bounds,
        config: &OptimizationConfig,
    ) -> Result<Outcome> {
        minimize(objective, bounds, config, self)
    }
}
