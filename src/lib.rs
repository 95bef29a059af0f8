//! Classical and swarm optimization algorithms over a bounded planar search space.
//!
//! Every algorithm takes an objective `f(x, y)`, a search box and its own
//! configuration, and returns an [`Outcome`]: the per-iteration trajectory of
//! the best point found, a success verdict and a human-readable status message.
//!
//! ```
//! use optim2d::{Bounds, ObjectiveCatalog, OptimizationConfig};
//! use optim2d::math::optimization::particle_swarm::{minimize, SwarmConfig};
//!
//! let catalog = ObjectiveCatalog::standard();
//! let sphere = catalog.lookup("sphere").unwrap();
//! let bounds = Bounds::new(-5.0, 5.0, -5.0, 5.0).unwrap();
//! let config = OptimizationConfig { max_iterations: 100, seed: Some(7) };
//!
//! let outcome = minimize(sphere, &bounds, &config, &SwarmConfig::default()).unwrap();
//! assert!(outcome.converged);
//! assert!(outcome.best().unwrap().f_value < 1.0);
//! ```

pub mod error;
pub mod math;

pub use error::{Error, Result};
pub use math::optimization::{
    Bounds, Method, NamedObjective, ObjectiveCatalog, ObjectiveFunction, OptimizationConfig,
    Optimizer, Outcome, Point, Snapshot, Status,
};
