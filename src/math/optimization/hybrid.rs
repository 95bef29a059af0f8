//! Particle swarm and bee colony interleaved in one population.
//!
//! Every iteration first moves all agents with an inertia-weight PSO update,
//! then runs a bee-colony pass over the same agents. The best agents claim
//! sites, and each site buys local-search trials for the agents at the head of
//! the fitness order, leaders included. A trial perturbs the agent's own
//! position and is kept only on improvement. Up to `scout_count` of the worst
//! remaining agents restart uniformly; the rest keep their PSO move.

use rand::Rng;

use crate::error::Result;
use crate::math::optimization::sites::{
    classify, patch_offset, radius_limit, validate_radius, RadiusController, RadiusDirection,
    RadiusEvent, SiteMetric,
};
use crate::math::optimization::{
    fitness_order, require_count, require_finite, Bounds, ObjectiveFunction, OptimizationConfig,
    Optimizer, Outcome, Point, Status, TrajectoryRecorder,
};

/// Configuration specific to the hybrid swarm.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridConfig {
    pub swarm_size: usize,
    /// Inertia weight `w`
    pub inertia: f64,
    /// Cognitive coefficient `c1`
    pub cognitive: f64,
    /// Social coefficient `c2`
    pub social: f64,
    /// Most agents left without a trial that restart uniformly, worst first
    pub scout_count: usize,
    pub selected_bee_count: usize,
    pub best_bee_count: usize,
    pub selected_sites_count: usize,
    pub best_sites_count: usize,
    pub radius: f64,
    pub koeff: f64,
    pub tolerance: usize,
    pub global_tolerance: usize,
    pub metric: SiteMetric,
    pub direction: RadiusDirection,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            swarm_size: 50,
            inertia: 0.7,
            cognitive: 1.5,
            social: 1.5,
            scout_count: 20,
            selected_bee_count: 15,
            best_bee_count: 30,
            selected_sites_count: 3,
            best_sites_count: 2,
            radius: 0.5,
            koeff: 0.9,
            tolerance: 5,
            global_tolerance: 10,
            metric: SiteMetric::Euclidean,
            direction: RadiusDirection::GrowOnImprovement,
        }
    }
}

impl HybridConfig {
    pub fn validate(&self) -> Result<()> {
        require_count("swarm_size", self.swarm_size)?;
        require_finite("inertia", self.inertia)?;
        require_finite("cognitive", self.cognitive)?;
        require_finite("social", self.social)?;
        require_count("best_sites_count", self.best_sites_count)?;
        validate_radius(self.radius, self.koeff, self.tolerance, self.global_tolerance)
    }
}

#[derive(Debug, Clone)]
struct Agent {
    position: Point,
    velocity: Point,
    fitness: f64,
    best_position: Point,
    best_fitness: f64,
}

impl Agent {
    /// Moves to `position` with a known value, keeping the personal best current.
    fn settle(&mut self, position: Point, fitness: f64) {
        self.position = position;
        self.fitness = fitness;
        if fitness < self.best_fitness {
            self.best_position = position;
            self.best_fitness = fitness;
        }
    }
}

struct HybridSwarm<'a, F: ?Sized> {
    f: &'a F,
    bounds: Bounds,
    agents: Vec<Agent>,
    best_position: Point,
    best_value: f64,
}

impl<'a, F> HybridSwarm<'a, F>
where
    F: ObjectiveFunction + ?Sized,
{
    fn new<R: Rng + ?Sized>(f: &'a F, bounds: Bounds, size: usize, rng: &mut R) -> Self {
        let span = bounds.span();
        let agents = (0..size)
            .map(|_| {
                let position = bounds.sample(rng);
                let velocity = [
                    rng.gen_range(0.0..=span[0]),
                    rng.gen_range(0.0..=span[1]),
                ];
                let fitness = f.at(position);
                Agent {
                    position,
                    velocity,
                    fitness,
                    best_position: position,
                    best_fitness: fitness,
                }
            })
            .collect();

        let mut swarm = Self {
            f,
            bounds,
            agents,
            best_position: bounds.lower(),
            best_value: f64::INFINITY,
        };
        swarm.update_global_best();
        swarm
    }

    /// Global best over personal bests; only ever improves.
    fn update_global_best(&mut self) {
        for agent in &self.agents {
            if agent.best_fitness < self.best_value {
                self.best_position = agent.best_position;
                self.best_value = agent.best_fitness;
            }
        }
    }

    fn pso_step<R: Rng + ?Sized>(&mut self, hybrid_config: &HybridConfig, rng: &mut R) {
        let global = self.best_position;
        for agent in &mut self.agents {
            let mut position = agent.position;
            for d in 0..2 {
                let r1: f64 = rng.gen();
                let r2: f64 = rng.gen();
                agent.velocity[d] = hybrid_config.inertia * agent.velocity[d]
                    + hybrid_config.cognitive * r1 * (agent.best_position[d] - agent.position[d])
                    + hybrid_config.social * r2 * (global[d] - agent.position[d]);
                position[d] += agent.velocity[d];
            }
            let position = self.bounds.clamp(position);
            agent.settle(position, self.f.at(position));
        }
        self.update_global_best();
    }

    /// Local search on own position, accepted only if it improves the agent.
    fn local_search<R: Rng + ?Sized>(&mut self, i: usize, radius: f64, rng: &mut R) {
        let offset = patch_offset(radius, rng);
        let origin = self.agents[i].position;
        let candidate = self
            .bounds
            .clamp([origin[0] + offset[0], origin[1] + offset[1]]);
        let value = self.f.at(candidate);
        if value < self.agents[i].fitness {
            self.agents[i].settle(candidate, value);
        }
    }

    fn bee_step<R: Rng + ?Sized>(&mut self, hybrid_config: &HybridConfig, radius: f64, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.agents.len()).collect();
        order.sort_by(|&a, &b| fitness_order(self.agents[a].fitness, self.agents[b].fitness));
        let positions: Vec<Point> = self.agents.iter().map(|a| a.position).collect();
        let sites = classify(
            &order,
            &positions,
            radius,
            hybrid_config.metric,
            hybrid_config.best_sites_count,
            hybrid_config.selected_sites_count,
        );

        // Trials go to the best agents in sorted order, leaders included.
        let trials = (sites.best.len() * hybrid_config.best_bee_count
            + sites.selected.len() * hybrid_config.selected_bee_count)
            .min(order.len());
        for &i in &order[..trials] {
            self.local_search(i, radius, rng);
        }

        let leftover = &order[trials..];
        let scouts = hybrid_config.scout_count.min(leftover.len());
        for &i in &leftover[leftover.len() - scouts..] {
            let position = self.bounds.sample(rng);
            let value = self.f.at(position);
            self.agents[i].settle(position, value);
        }
        self.update_global_best();
    }
}

/// Minimizes an objective function with the hybrid PSO + bee colony swarm.
///
/// The reported best is the best personal best ever seen, so it never gets
/// worse between iterations or between the two halves of an iteration.
pub fn minimize<F>(
    f: &F,
    bounds: &Bounds,
    config: &OptimizationConfig,
    hybrid_config: &HybridConfig,
) -> Result<Outcome>
where
    F: ObjectiveFunction + ?Sized,
{
    config.validate()?;
    hybrid_config.validate()?;
    log::debug!(
        "hybrid swarm: {} agents, w {}, c1 {}, c2 {}, radius {}",
        hybrid_config.swarm_size,
        hybrid_config.inertia,
        hybrid_config.cognitive,
        hybrid_config.social,
        hybrid_config.radius
    );

    let mut rng = config.rng();
    let mut swarm = HybridSwarm::new(f, *bounds, hybrid_config.swarm_size, &mut rng);
    let mut radius = RadiusController::new(
        hybrid_config.radius,
        hybrid_config.koeff,
        hybrid_config.direction,
        hybrid_config.tolerance,
        hybrid_config.global_tolerance,
    )
    .with_limit(radius_limit(bounds));
    let mut recorder = TrajectoryRecorder::with_capacity(config.max_iterations.min(1024));

    for iteration in 1..=config.max_iterations {
        swarm.pso_step(hybrid_config, &mut rng);
        swarm.bee_step(hybrid_config, radius.radius(), &mut rng);
        recorder.record(iteration, swarm.best_position, swarm.best_value);

        if radius.observe(swarm.best_value) == RadiusEvent::LimitReached {
            return Ok(recorder.finish(Status::ExpansionLimitReached));
        }
    }

    Ok(recorder.finish(Status::BudgetCompleted))
}

impl Optimizer for HybridConfig {
    fn optimize(
        &self,
        objective: &dyn ObjectiveFunction,
        bounds: &Bounds,
        config: &OptimizationConfig,
    ) -> Result<Outcome> {
        minimize(objective, bounds, config, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::optimization::catalog::{rastrigin, rosenbrock};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn seeded(max_iterations: usize, seed: u64) -> OptimizationConfig {
        OptimizationConfig {
            max_iterations,
            seed: Some(seed),
        }
    }

    #[test]
    fn test_hybrid_rosenbrock() {
        let bounds = Bounds::new(-5.0, 5.0, -5.0, 5.0).unwrap();
        let outcome = minimize(&rosenbrock, &bounds, &seeded(100, 8), &HybridConfig::default()).unwrap();

        assert!(outcome.converged);
        assert!(outcome.best().unwrap().f_value < 1.0);
        assert!(outcome.history.iter().all(|s| bounds.contains(s.point())));
    }

    #[test]
    fn test_best_never_increases_across_sub_steps() {
        let bounds = Bounds::new(-5.12, 5.12, -5.12, 5.12).unwrap();
        let hybrid_config = HybridConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let mut swarm = HybridSwarm::new(&rastrigin, bounds, hybrid_config.swarm_size, &mut rng);

        let mut previous = swarm.best_value;
        for _ in 0..30 {
            swarm.pso_step(&hybrid_config, &mut rng);
            assert!(swarm.best_value <= previous);
            previous = swarm.best_value;

            swarm.bee_step(&hybrid_config, hybrid_config.radius, &mut rng);
            assert!(swarm.best_value <= previous);
            previous = swarm.best_value;

            let personal_min = swarm
                .agents
                .iter()
                .map(|a| a.best_fitness)
                .fold(f64::INFINITY, f64::min);
            assert_eq!(swarm.best_value, personal_min);
        }
    }

    #[test]
    fn test_agents_stay_in_bounds() {
        let bounds = Bounds::new(0.0, 1.0, 0.0, 1.0).unwrap();
        let hybrid_config = HybridConfig {
            swarm_size: 30,
            radius: 2.0,
            ..Default::default()
        };
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let mut swarm = HybridSwarm::new(&rosenbrock, bounds, hybrid_config.swarm_size, &mut rng);

        for _ in 0..10 {
            swarm.pso_step(&hybrid_config, &mut rng);
            swarm.bee_step(&hybrid_config, hybrid_config.radius, &mut rng);
            assert!(swarm.agents.iter().all(|a| bounds.contains(a.position)));
        }
    }

    #[test]
    fn test_flat_landscape_hits_expansion_limit() {
        let flat = |_x: f64, _y: f64| 0.0;
        let bounds = Bounds::new(-1.0, 1.0, -1.0, 1.0).unwrap();
        let hybrid_config = HybridConfig {
            swarm_size: 20,
            tolerance: 2,
            global_tolerance: 3,
            ..Default::default()
        };

        let outcome = minimize(&flat, &bounds, &seeded(500, 1), &hybrid_config).unwrap();

        assert_eq!(outcome.status, Status::ExpansionLimitReached);
        assert_eq!(outcome.history.len(), 1 + 2 * 3);
    }

    fn swarm_at<'a, F>(f: &'a F, bounds: Bounds, positions: &[Point]) -> HybridSwarm<'a, F>
    where
        F: ObjectiveFunction,
    {
        let agents = positions
            .iter()
            .map(|&position| {
                let fitness = f.at(position);
                Agent {
                    position,
                    velocity: [0.0, 0.0],
                    fitness,
                    best_position: position,
                    best_fitness: fitness,
                }
            })
            .collect();
        let mut swarm = HybridSwarm {
            f,
            bounds,
            agents,
            best_position: bounds.lower(),
            best_value: f64::INFINITY,
        };
        swarm.update_global_best();
        swarm
    }

    #[test]
    fn test_trials_perturb_own_position_and_refine_leaders() {
        let sphere = |x: f64, y: f64| x * x + y * y;
        let bounds = Bounds::new(-5.0, 5.0, -5.0, 5.0).unwrap();
        let hybrid_config = HybridConfig {
            best_sites_count: 1,
            selected_sites_count: 0,
            best_bee_count: 4,
            scout_count: 0,
            ..Default::default()
        };
        let radius = 0.1;
        let mut swarm = swarm_at(&sphere, bounds, &[[0.5, 0.5], [3.0, 3.0], [-3.0, -3.0], [3.0, -3.0]]);
        let start_leader = swarm.agents[0].fitness;
        let mut rng = ChaCha20Rng::seed_from_u64(17);

        for _ in 0..30 {
            let before = swarm.agents.clone();
            swarm.bee_step(&hybrid_config, radius, &mut rng);
            for (old, new) in before.iter().zip(&swarm.agents) {
                assert!((new.position[0] - old.position[0]).abs() <= radius + 1e-12);
                assert!((new.position[1] - old.position[1]).abs() <= radius + 1e-12);
                assert!(new.fitness <= old.fitness);
            }
        }
        assert!(swarm.agents[0].fitness < start_leader);
    }

    #[test]
    fn test_only_scout_count_agents_restart() {
        let sphere = |x: f64, y: f64| x * x + y * y;
        let bounds = Bounds::new(-5.0, 5.0, -5.0, 5.0).unwrap();
        let hybrid_config = HybridConfig {
            best_sites_count: 1,
            selected_sites_count: 0,
            best_bee_count: 1,
            scout_count: 1,
            ..Default::default()
        };
        let start = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [4.0, 4.0]];
        let mut swarm = swarm_at(&sphere, bounds, &start);
        let mut rng = ChaCha20Rng::seed_from_u64(2);

        swarm.bee_step(&hybrid_config, 0.1, &mut rng);

        // Agent 0 carries the single trial and cannot improve on the minimum.
        assert_eq!(swarm.agents[0].position, start[0]);
        assert_eq!(swarm.agents[1].position, start[1]);
        assert_eq!(swarm.agents[2].position, start[2]);
        assert_ne!(swarm.agents[3].position, start[3]);
    }

    #[test]
    fn test_tiny_koeff_keeps_radius_finite() {
        let bounds = Bounds::new(-5.12, 5.12, -5.12, 5.12).unwrap();
        let hybrid_config = HybridConfig {
            koeff: 1e-200,
            ..Default::default()
        };

        let outcome = minimize(&rastrigin, &bounds, &seeded(2000, 1), &hybrid_config).unwrap();

        assert!(outcome.converged);
        assert!(outcome.history.iter().all(|s| bounds.contains(s.point())));
    }

    #[test]
    fn test_seed_reproduces_history() {
        let bounds = Bounds::new(-5.0, 5.0, -5.0, 5.0).unwrap();
        let first = minimize(&rosenbrock, &bounds, &seeded(25, 13), &HybridConfig::default()).unwrap();
        let second = minimize(&rosenbrock, &bounds, &seeded(25, 13), &HybridConfig::default()).unwrap();
        assert_eq!(first.history, second.history);
    }
}
