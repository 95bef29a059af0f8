pub mod optimization;

pub use optimization::{
    bacterial::BacterialConfig, bacterial_minimize, bee_colony::BeeConfig, bee_colony_minimize,
    genetic::GeneticConfig, genetic_minimize, gradient_descent::GradientDescentConfig,
    gradient_descent_minimize, hybrid::HybridConfig, hybrid_minimize, immune::ImmuneConfig,
    immune_minimize, particle_swarm::SwarmConfig, particle_swarm_minimize,
    simplex::{QuadraticProgram, Sense, SimplexConfig},
    simplex_optimize, Bounds, Method, ObjectiveFunction, OptimizationConfig, Optimizer, Outcome,
    Status,
};
