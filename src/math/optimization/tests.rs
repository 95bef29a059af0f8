use crate::error::Error;
use crate::math::optimization::{
    argmin, bacterial::BacterialConfig, bee_colony::BeeConfig, evaluate_all, fitness_order,
    genetic::GeneticConfig, gradient_descent::GradientDescentConfig, hybrid::HybridConfig,
    immune::ImmuneConfig, particle_swarm::SwarmConfig, Bounds, Method, ObjectiveCatalog,
    ObjectiveFunction, OptimizationConfig, Optimizer, Status,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cmp::Ordering;

fn population_methods() -> Vec<Method> {
    vec![
        Method::ParticleSwarm(SwarmConfig {
            swarm_size: 20,
            ..Default::default()
        }),
        Method::BeeColony(BeeConfig::default()),
        Method::Hybrid(HybridConfig {
            swarm_size: 20,
            ..Default::default()
        }),
        Method::Genetic(GeneticConfig::default()),
        Method::Immune(ImmuneConfig::default()),
        Method::Bacterial(BacterialConfig::default()),
    ]
}

fn seeded(max_iterations: usize, seed: u64) -> OptimizationConfig {
    OptimizationConfig {
        max_iterations,
        seed: Some(seed),
    }
}

#[test]
fn test_every_method_runs_through_dispatch() {
    let catalog = ObjectiveCatalog::standard();
    let himmelblau = catalog.lookup("himmelblau").unwrap();
    let bounds = himmelblau.bounds();

    let mut methods = population_methods();
    methods.push(Method::GradientDescent(GradientDescentConfig {
        start: [1.0, 1.0],
        step: 0.01,
        ..Default::default()
    }));

    for method in &methods {
        let outcome = method.optimize(himmelblau, &bounds, &seeded(40, 1)).unwrap();
        assert!(!outcome.history.is_empty(), "{} recorded nothing", method.name());
        assert!(outcome.history.len() <= 41);
        for (i, snapshot) in outcome.history.iter().enumerate() {
            assert_eq!(snapshot.iteration, i + 1, "{}", method.name());
        }
        let best = outcome.best().unwrap();
        assert!(best.f_value.is_finite());
        assert!(best.f_value <= outcome.history[0].f_value);
        assert_eq!(outcome.message, outcome.status.to_string());
    }
}

#[test]
fn test_same_seed_same_history() {
    let catalog = ObjectiveCatalog::standard();
    let rastrigin = catalog.lookup("rastrigin").unwrap();
    let bounds = rastrigin.bounds();

    for method in population_methods() {
        let first = method.optimize(rastrigin, &bounds, &seeded(25, 99)).unwrap();
        let second = method.optimize(rastrigin, &bounds, &seeded(25, 99)).unwrap();
        assert_eq!(first.history, second.history, "{} is not reproducible", method.name());

        let other = method.optimize(rastrigin, &bounds, &seeded(25, 100)).unwrap();
        assert_ne!(first.history, other.history, "{} ignored its seed", method.name());
    }
}

#[test]
fn test_bounded_methods_report_points_inside_the_box() {
    // Minimum of the bowl lies outside the box.
    let bowl = |x: f64, y: f64| (x + 4.0).powi(2) + (y - 4.0).powi(2);
    let bounds = Bounds::new(-1.0, 1.0, -2.0, 2.0).unwrap();

    for method in population_methods() {
        if matches!(method, Method::ParticleSwarm(_)) {
            continue;
        }
        let outcome = method.optimize(&bowl, &bounds, &seeded(80, 4)).unwrap();
        assert!(
            outcome.history.iter().all(|s| bounds.contains(s.point())),
            "{} left the box",
            method.name()
        );
        let best = outcome.best().unwrap();
        assert!(best.x < -0.9 && best.y > 1.9, "{} missed the corner", method.name());
    }
}

#[test]
fn test_catalog_minima_are_found() {
    let catalog = ObjectiveCatalog::standard();
    for name in ["sphere", "himmelblau", "isom"] {
        let objective = catalog.lookup(name).unwrap();
        let (_, minimum) = objective.minimum().unwrap();
        let outcome = Method::Immune(ImmuneConfig::default())
            .optimize(objective, &objective.bounds(), &seeded(150, 5))
            .unwrap();
        assert!(
            outcome.best().unwrap().f_value - minimum < 1e-2,
            "{name}: {} vs {minimum}",
            outcome.best().unwrap().f_value
        );
    }
}

#[test]
fn test_gradient_descent_uses_analytic_gradient() {
    let catalog = ObjectiveCatalog::standard();
    let himmelblau = catalog.lookup("himmelblau").unwrap();
    let gd_config = GradientDescentConfig {
        start: [1.0, 1.0],
        step: 0.01,
        ..Default::default()
    };
    let outcome = Method::GradientDescent(gd_config)
        .optimize(himmelblau, &himmelblau.bounds(), &seeded(5000, 0))
        .unwrap();

    assert!(outcome.converged);
    let best = outcome.best().unwrap();
    assert!(best.f_value < 1e-6);
    let first = outcome.history[0];
    let expected = himmelblau.gradient(1.0, 1.0).unwrap();
    assert!((first.grad_norm.unwrap() - expected[0].hypot(expected[1])).abs() < 1e-12);
}

#[test]
fn test_zero_budget_is_rejected() {
    let sphere = |x: f64, y: f64| x * x + y * y;
    let bounds = Bounds::new(-1.0, 1.0, -1.0, 1.0).unwrap();
    for method in population_methods() {
        assert!(matches!(
            method.optimize(&sphere, &bounds, &seeded(0, 0)),
            Err(Error::InvalidParameter {
                name: "max_iterations",
                ..
            })
        ));
    }
}

#[test]
fn test_bounds_validation() {
    assert!(Bounds::new(-1.0, 1.0, -1.0, 1.0).is_ok());
    assert!(matches!(
        Bounds::new(1.0, -1.0, -1.0, 1.0),
        Err(Error::InvalidParameter { name: "bounds.x", .. })
    ));
    assert!(matches!(
        Bounds::new(-1.0, 1.0, 2.0, 2.0),
        Err(Error::InvalidParameter { name: "bounds.y", .. })
    ));
    assert!(Bounds::new(f64::NEG_INFINITY, 1.0, -1.0, 1.0).is_err());
    assert!(matches!(
        Bounds::new(-1e308, 1e308, -1.0, 1.0),
        Err(Error::InvalidParameter { name: "bounds.x", .. })
    ));
    let wide = Bounds::new(-8e307, 8e307, -8e307, 8e307).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    assert!(wide.contains(wide.sample(&mut rng)));
    assert_eq!(
        Bounds::from_pairs([[-15.0, -5.0], [-3.0, 3.0]]).unwrap(),
        Bounds::new(-15.0, -5.0, -3.0, 3.0).unwrap()
    );
}

#[test]
fn test_bounds_geometry() {
    let bounds = Bounds::new(-2.0, 2.0, 0.0, 1.0).unwrap();
    assert_eq!(bounds.span(), [4.0, 1.0]);
    assert_eq!(bounds.clamp([5.0, -1.0]), [2.0, 0.0]);
    assert_eq!(bounds.clamp([0.5, 0.5]), [0.5, 0.5]);
    assert!(bounds.contains([2.0, 1.0]));
    assert!(!bounds.contains([2.0 + 1e-12, 1.0]));

    assert_eq!(bounds.penalty([0.0, 0.5], 10.0), 0.0);
    assert_eq!(bounds.penalty([3.0, 0.5], 10.0), 10.0);
    assert_eq!(bounds.penalty([-3.0, 3.0], 2.0), 2.0 + 4.0);

    let mut rng = ChaCha20Rng::seed_from_u64(1);
    for _ in 0..1000 {
        assert!(bounds.contains(bounds.sample(&mut rng)));
    }
}

#[test]
fn test_fitness_helpers() {
    assert_eq!(argmin(&[3.0, f64::NAN, 1.0, 1.0]), Some(2));
    assert_eq!(argmin(&[f64::NAN]), None);
    assert_eq!(argmin(&[]), None);

    assert_eq!(fitness_order(1.0, 2.0), Ordering::Less);
    assert_eq!(fitness_order(f64::NAN, 2.0), Ordering::Greater);
    assert_eq!(fitness_order(2.0, f64::NAN), Ordering::Less);

    let mut values = vec![2.0, f64::NAN, -1.0];
    values.sort_by(|a, b| fitness_order(*a, *b));
    assert_eq!(values[0], -1.0);
    assert!(values[2].is_nan());
}

#[test]
fn test_evaluate_all_keeps_order() {
    let f = |x: f64, y: f64| 10.0 * x + y;
    let points: Vec<[f64; 2]> = (0..100).map(|i| [i as f64, 1.0]).collect();
    let values = evaluate_all(&f, &points);
    for (i, v) in values.iter().enumerate() {
        assert_eq!(*v, 10.0 * i as f64 + 1.0);
    }
}

#[test]
fn test_history_exports_as_csv() {
    let catalog = ObjectiveCatalog::standard();
    let sphere = catalog.lookup("sphere").unwrap();
    let outcome = Method::Immune(ImmuneConfig::default())
        .optimize(sphere, &sphere.bounds(), &seeded(10, 2))
        .unwrap();

    let mut buffer = Vec::new();
    outcome.write_csv(&mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert_eq!(text.lines().count(), outcome.history.len() + 1);
    assert!(text.lines().skip(1).all(|line| line.ends_with(',')));
}

#[test]
fn test_status_of_run_to_budget_methods() {
    let sphere = |x: f64, y: f64| x * x + y * y;
    let bounds = Bounds::new(-1.0, 1.0, -1.0, 1.0).unwrap();
    let pso = Method::ParticleSwarm(SwarmConfig::default())
        .optimize(&sphere, &bounds, &seeded(10, 0))
        .unwrap();
    let bacterial = Method::Bacterial(BacterialConfig::default())
        .optimize(&sphere, &bounds, &seeded(10, 0))
        .unwrap();

    for outcome in [pso, bacterial] {
        assert_eq!(outcome.status, Status::BudgetCompleted);
        assert!(outcome.converged);
        assert_eq!(outcome.history.len(), 10);
    }
}
