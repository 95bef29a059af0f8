use rand::Rng;

use crate::error::Result;
use crate::math::optimization::sites::{
    classify, patch_offset, radius_limit, validate_radius, RadiusController, RadiusDirection,
    RadiusEvent, SiteMetric, Sites,
};
use crate::math::optimization::{
    argmin, evaluate_all, fitness_order, require_count, Bounds, ObjectiveFunction,
    OptimizationConfig, Optimizer, Outcome, Point, Status, TrajectoryRecorder,
};

/// Configuration specific to the bee colony optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct BeeConfig {
    /// Bees that restart uniformly each iteration
    pub scout_count: usize,
    /// Followers sent to each selected site
    pub selected_bee_count: usize,
    /// Followers sent to each best site
    pub best_bee_count: usize,
    pub selected_sites_count: usize,
    pub best_sites_count: usize,
    /// Initial patch half-width
    pub radius: f64,
    /// Radius multiplier, in (0, 1]
    pub koeff: f64,
    /// Stagnating iterations before the radius is adjusted
    pub tolerance: usize,
    /// Radius adjustments allowed before the run stops
    pub global_tolerance: usize,
    pub metric: SiteMetric,
    pub direction: RadiusDirection,
}

impl Default for BeeConfig {
    fn default() -> Self {
        Self {
            scout_count: 20,
            selected_bee_count: 10,
            best_bee_count: 20,
            selected_sites_count: 3,
            best_sites_count: 2,
            radius: 1.0,
            koeff: 0.9,
            tolerance: 5,
            global_tolerance: 10,
            metric: SiteMetric::PerAxis,
            direction: RadiusDirection::ShrinkOnImprovement,
        }
    }
}

impl BeeConfig {
    pub fn validate(&self) -> Result<()> {
        require_count("best_sites_count", self.best_sites_count)?;
        require_count("colony size", self.colony_size())?;
        validate_radius(self.radius, self.koeff, self.tolerance, self.global_tolerance)
    }

    /// scouts + selected followers · selected sites + best followers · best sites
    pub fn colony_size(&self) -> usize {
        self.scout_count
            + self.selected_bee_count * self.selected_sites_count
            + self.best_bee_count * self.best_sites_count
    }
}

struct Hive<'a, F: ?Sized> {
    f: &'a F,
    bounds: Bounds,
    positions: Vec<Point>,
    fitness: Vec<f64>,
    best_position: Point,
    best_value: f64,
}

impl<'a, F> Hive<'a, F>
where
    F: ObjectiveFunction + ?Sized,
{
    fn new<R: Rng + ?Sized>(f: &'a F, bounds: Bounds, size: usize, rng: &mut R) -> Self {
        let positions: Vec<Point> = (0..size).map(|_| bounds.sample(rng)).collect();
        let fitness = evaluate_all(f, &positions);
        let mut hive = Self {
            f,
            bounds,
            positions,
            fitness,
            best_position: bounds.lower(),
            best_value: f64::INFINITY,
        };
        hive.refresh_best();
        hive
    }

    fn refresh_best(&mut self) {
        if let Some(i) = argmin(&self.fitness) {
            if self.fitness[i] <= self.best_value {
                self.best_position = self.positions[i];
                self.best_value = self.fitness[i];
            }
        }
    }

    fn sorted(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.positions.len()).collect();
        order.sort_by(|&a, &b| fitness_order(self.fitness[a], self.fitness[b]));
        order
    }

    /// One colony iteration: pick sites, send followers, restart scouts.
    fn next_iteration<R: Rng + ?Sized>(&mut self, bee_config: &BeeConfig, radius: f64, rng: &mut R) {
        let order = self.sorted();
        let sites = classify(
            &order,
            &self.positions,
            radius,
            bee_config.metric,
            bee_config.best_sites_count,
            bee_config.selected_sites_count,
        );

        let mut idle = order.into_iter().filter(|&i| !sites.is_leader(i));
        let mut moved = Vec::with_capacity(self.positions.len());
        for (leader, count) in dispatch_plan(&sites, bee_config) {
            let center = self.positions[leader];
            for agent in idle.by_ref().take(count) {
                let offset = patch_offset(radius, rng);
                self.positions[agent] =
                    self.bounds.clamp([center[0] + offset[0], center[1] + offset[1]]);
                moved.push(agent);
            }
        }
        for scout in idle {
            self.positions[scout] = self.bounds.sample(rng);
            moved.push(scout);
        }

        let points: Vec<Point> = moved.iter().map(|&i| self.positions[i]).collect();
        for (i, value) in moved.into_iter().zip(evaluate_all(self.f, &points)) {
            self.fitness[i] = value;
        }
        self.refresh_best();
    }
}

/// `(leader, follower count)` for every site, best sites first.
fn dispatch_plan(sites: &Sites, bee_config: &BeeConfig) -> Vec<(usize, usize)> {
    sites
        .best
        .iter()
        .map(|&leader| (leader, bee_config.best_bee_count))
        .chain(
            sites
                .selected
                .iter()
                .map(|&leader| (leader, bee_config.selected_bee_count)),
        )
        .collect()
}

/// Minimizes an objective function with a bee colony.
///
/// Every iteration the best bees claim non-overlapping patches; followers are
/// scattered uniformly inside the patches and clamped to `bounds`, the rest
/// scout the whole box. The patch radius adapts to progress, and the run stops
/// early once the radius has been adjusted `global_tolerance` times.
pub fn minimize<F>(
    f: &F,
    bounds: &Bounds,
    config: &OptimizationConfig,
    bee_config: &BeeConfig,
) -> Result<Outcome>
where
    F: ObjectiveFunction + ?Sized,
{
    config.validate()?;
    bee_config.validate()?;
    log::debug!(
        "bee colony: {} bees, radius {}, koeff {}, {:?}",
        bee_config.colony_size(),
        bee_config.radius,
        bee_config.koeff,
        bee_config.metric
    );

    let mut rng = config.rng();
    let mut hive = Hive::new(f, *bounds, bee_config.colony_size(), &mut rng);
    let mut radius = RadiusController::new(
        bee_config.radius,
        bee_config.koeff,
        bee_config.direction,
        bee_config.tolerance,
        bee_config.global_tolerance,
    )
    .with_limit(radius_limit(bounds));
    let mut recorder = TrajectoryRecorder::with_capacity(config.max_iterations.min(1024));

    for iteration in 1..=config.max_iterations {
        hive.next_iteration(bee_config, radius.radius(), &mut rng);
        recorder.record(iteration, hive.best_position, hive.best_value);

        if radius.observe(hive.best_value) == RadiusEvent::LimitReached {
            return Ok(recorder.finish(Status::ExpansionLimitReached));
        }
    }

    Ok(recorder.finish(Status::BudgetCompleted))
}

impl Optimizer for BeeConfig {
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
    use crate::error::Error;
    use crate::math::optimization::catalog::{himmelblau, rastrigin};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn seeded(max_iterations: usize, seed: u64) -> OptimizationConfig {
        OptimizationConfig {
            max_iterations,
            seed: Some(seed),
        }
    }

    #[test]
    fn test_bee_himmelblau() {
        let bounds = Bounds::new(-5.0, 5.0, -5.0, 5.0).unwrap();
        let outcome = minimize(&himmelblau, &bounds, &seeded(300, 5), &BeeConfig::default()).unwrap();

        assert!(outcome.converged);
        assert!(outcome.best().unwrap().f_value < 0.1);
    }

    #[test]
    fn test_positions_stay_in_bounds() {
        // The unconstrained minimum of this bowl sits outside the box.
        let bowl = |x: f64, y: f64| (x - 10.0).powi(2) + (y + 10.0).powi(2);
        let bounds = Bounds::new(-2.0, 2.0, -1.0, 3.0).unwrap();
        let bee_config = BeeConfig {
            radius: 3.0,
            ..Default::default()
        };
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let mut hive = Hive::new(&bowl, bounds, bee_config.colony_size(), &mut rng);

        for _ in 0..20 {
            hive.next_iteration(&bee_config, bee_config.radius, &mut rng);
            assert!(hive.positions.iter().all(|&p| bounds.contains(p)));
        }

        let outcome = minimize(&bowl, &bounds, &seeded(50, 9), &bee_config).unwrap();
        assert!(outcome.history.iter().all(|s| bounds.contains(s.point())));
    }

    #[test]
    fn test_best_never_increases() {
        let bounds = Bounds::new(-5.12, 5.12, -5.12, 5.12).unwrap();
        let outcome = minimize(&rastrigin, &bounds, &seeded(100, 2), &BeeConfig::default()).unwrap();
        for pair in outcome.history.windows(2) {
            assert!(pair[1].f_value <= pair[0].f_value);
        }
    }

    #[test]
    fn test_flat_landscape_hits_expansion_limit() {
        let flat = |_x: f64, _y: f64| 0.0;
        let bounds = Bounds::new(-1.0, 1.0, -1.0, 1.0).unwrap();
        let bee_config = BeeConfig {
            tolerance: 3,
            global_tolerance: 4,
            ..Default::default()
        };

        let outcome = minimize(&flat, &bounds, &seeded(1000, 0), &bee_config).unwrap();

        assert_eq!(outcome.status, Status::ExpansionLimitReached);
        assert_eq!(outcome.message, "expansion limit reached");
        assert!(outcome.converged);
        assert_eq!(outcome.history.len(), 1 + 3 * 4);
    }

    #[test]
    fn test_seed_reproduces_history() {
        let bounds = Bounds::new(-5.0, 5.0, -5.0, 5.0).unwrap();
        let first = minimize(&himmelblau, &bounds, &seeded(40, 77), &BeeConfig::default()).unwrap();
        let second = minimize(&himmelblau, &bounds, &seeded(40, 77), &BeeConfig::default()).unwrap();
        assert_eq!(first.history, second.history);
    }

    #[test]
    fn test_dispatch_plan_orders_best_sites_first() {
        let sites = Sites {
            best: vec![4, 1],
            selected: vec![7],
        };
        let bee_config = BeeConfig::default();
        assert_eq!(
            dispatch_plan(&sites, &bee_config),
            vec![(4, 20), (1, 20), (7, 10)]
        );
    }

    #[test]
    fn test_leaders_do_not_use_follower_slots() {
        let sphere = |x: f64, y: f64| x * x + y * y;
        let bounds = Bounds::new(-5.0, 5.0, -5.0, 5.0).unwrap();
        let bee_config = BeeConfig {
            scout_count: 0,
            best_bee_count: 2,
            selected_bee_count: 0,
            best_sites_count: 2,
            selected_sites_count: 0,
            ..Default::default()
        };
        // Sorted order: leader, second leader, then the two followers.
        let positions = vec![[0.0, 0.0], [1.5, 0.0], [0.0, -1.6], [0.0, 1.7]];
        let fitness = positions.iter().map(|p| sphere(p[0], p[1])).collect();
        let mut hive = Hive {
            f: &sphere,
            bounds,
            positions,
            fitness,
            best_position: [0.0, 0.0],
            best_value: 0.0,
        };
        let mut rng = ChaCha20Rng::seed_from_u64(6);

        hive.next_iteration(&bee_config, 1.0, &mut rng);

        assert_eq!(hive.positions[0], [0.0, 0.0]);
        assert_eq!(hive.positions[1], [1.5, 0.0]);
        // Both followers belong to the first leader's patch.
        for follower in &hive.positions[2..] {
            assert!(follower[0].abs() <= 1.0 && follower[1].abs() <= 1.0);
        }
    }

    #[test]
    fn test_tiny_koeff_keeps_radius_finite() {
        let bounds = Bounds::new(-5.12, 5.12, -5.12, 5.12).unwrap();
        let bee_config = BeeConfig {
            koeff: 1e-200,
            ..Default::default()
        };

        let outcome = minimize(&rastrigin, &bounds, &seeded(2000, 1), &bee_config).unwrap();

        assert!(outcome.converged);
        assert!(outcome.history.iter().all(|s| bounds.contains(s.point())));
    }

    #[test]
    fn test_invalid_koeff() {
        let bounds = Bounds::new(-1.0, 1.0, -1.0, 1.0).unwrap();
        let bee_config = BeeConfig {
            koeff: 1.2,
            ..Default::default()
        };
        assert!(matches!(
            minimize(&himmelblau, &bounds, &OptimizationConfig::default(), &bee_config),
            Err(Error::ConstraintViolation(_))
        ));
    }
}
