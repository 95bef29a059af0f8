//! Named test objectives.
//!
//! The catalog is an explicit registry: callers build one (usually with
//! [`ObjectiveCatalog::standard`]), optionally register their own functions,
//! and pass the looked-up entry to an optimizer.

use std::collections::HashMap;
use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::math::optimization::{Bounds, ObjectiveFunction, Point};

/// A registered objective with its canonical search box and known minimum.
#[derive(Debug, Clone)]
pub struct NamedObjective {
    name: String,
    function: fn(f64, f64) -> f64,
    gradient: Option<fn(f64, f64) -> [f64; 2]>,
    bounds: Bounds,
    minimum: Option<(Point, f64)>,
}

impl NamedObjective {
    pub fn new(name: impl Into<String>, function: fn(f64, f64) -> f64, bounds: Bounds) -> Self {
        Self {
            name: name.into(),
            function,
            gradient: None,
            bounds,
            minimum: None,
        }
    }

    /// Attaches an analytic gradient.
    pub fn with_gradient(mut self, gradient: fn(f64, f64) -> [f64; 2]) -> Self {
        self.gradient = Some(gradient);
        self
    }

    /// Attaches the known global minimum.
    pub fn with_minimum(mut self, location: Point, value: f64) -> Self {
        self.minimum = Some((location, value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The box this function is usually searched over.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Location and value of a global minimum, if known.
    pub fn minimum(&self) -> Option<(Point, f64)> {
        self.minimum
    }
}

impl ObjectiveFunction for NamedObjective {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        (self.function)(x, y)
    }

    fn gradient(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        self.gradient.map(|g| g(x, y))
    }
}

/// Registry of objectives keyed by a normalized name.
#[derive(Debug, Clone, Default)]
pub struct ObjectiveCatalog {
    entries: HashMap<String, NamedObjective>,
}

impl ObjectiveCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The eight standard bivariate test functions.
    pub fn standard() -> Self {
        let square = |lo: f64, hi: f64| Bounds::unchecked([lo, lo], [hi, hi]);
        let mut catalog = Self::new();

        catalog.register(
            NamedObjective::new("rosenbrock", rosenbrock, square(-5.0, 5.0))
                .with_gradient(rosenbrock_gradient)
                .with_minimum([1.0, 1.0], 0.0),
        );
        catalog.register(
            NamedObjective::new("rastrigin", rastrigin, square(-5.12, 5.12))
                .with_minimum([0.0, 0.0], 0.0),
        );
        catalog.register(
            NamedObjective::new(
                "bukin",
                bukin_n6,
                Bounds::unchecked([-15.0, -3.0], [-5.0, 3.0]),
            )
            .with_minimum([-10.0, 1.0], 0.0),
        );
        catalog.register(
            NamedObjective::new("himmelblau", himmelblau, square(-5.0, 5.0))
                .with_gradient(himmelblau_gradient)
                .with_minimum([3.0, 2.0], 0.0),
        );
        catalog.register(
            NamedObjective::new("isom", isom, square(0.0, 6.0)).with_minimum([PI, PI], -1.0),
        );
        catalog.register(
            NamedObjective::new("goldstein-price", goldstein_price, square(-2.0, 2.0))
                .with_minimum([0.0, -1.0], 3.0),
        );
        catalog.register(
            NamedObjective::new("cross-in-tray", cross_in_tray, square(-10.0, 10.0))
                .with_minimum([1.349406608602084, 1.349406608602084], -2.062611870822739),
        );
        catalog.register(
            NamedObjective::new("sphere", sphere, square(-5.0, 5.0))
                .with_gradient(sphere_gradient)
                .with_minimum([0.0, 0.0], 0.0),
        );

        catalog
    }

    /// Adds or replaces an entry.
    pub fn register(&mut self, objective: NamedObjective) {
        self.entries.insert(normalize(objective.name()), objective);
    }

    /// Finds an objective by name, ignoring case, spaces, dashes and underscores.
    pub fn lookup(&self, name: &str) -> Result<&NamedObjective> {
        self.entries
            .get(&normalize(name))
            .ok_or_else(|| Error::UnknownObjective(name.to_string()))
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.values().map(|e| e.name()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn rosenbrock(x: f64, y: f64) -> f64 {
    (1.0 - x).powi(2) + 100.0 * (y - x * x).powi(2)
}

fn rosenbrock_gradient(x: f64, y: f64) -> [f64; 2] {
    [
        -2.0 * (1.0 - x) - 400.0 * x * (y - x * x),
        200.0 * (y - x * x),
    ]
}

pub fn rastrigin(x: f64, y: f64) -> f64 {
    20.0 + (x * x - 10.0 * (2.0 * PI * x).cos()) + (y * y - 10.0 * (2.0 * PI * y).cos())
}

pub fn bukin_n6(x: f64, y: f64) -> f64 {
    100.0 * (y - 0.01 * x * x).abs().sqrt() + 0.01 * (x + 10.0).abs()
}

pub fn himmelblau(x: f64, y: f64) -> f64 {
    (x * x + y - 11.0).powi(2) + (x + y * y - 7.0).powi(2)
}

fn himmelblau_gradient(x: f64, y: f64) -> [f64; 2] {
    let a = x * x + y - 11.0;
    let b = x + y * y - 7.0;
    [4.0 * x * a + 2.0 * b, 2.0 * a + 4.0 * y * b]
}

pub fn isom(x: f64, y: f64) -> f64 {
    -x.cos() * y.cos() * (-((x - PI).powi(2) + (y - PI).powi(2))).exp()
}

pub fn goldstein_price(x: f64, y: f64) -> f64 {
    let a = 1.0
        + (x + y + 1.0).powi(2)
            * (19.0 - 14.0 * x + 3.0 * x * x - 14.0 * y + 6.0 * x * y + 3.0 * y * y);
    let b = 30.0
        + (2.0 * x - 3.0 * y).powi(2)
            * (18.0 - 32.0 * x + 12.0 * x * x + 48.0 * y - 36.0 * x * y + 27.0 * y * y);
    a * b
}

pub fn cross_in_tray(x: f64, y: f64) -> f64 {
    let exponent = (100.0 - (x * x + y * y).sqrt() / PI).abs();
    -0.0001 * ((x.sin() * y.sin() * exponent.exp()).abs() + 1.0).powf(0.1)
}

pub fn sphere(x: f64, y: f64) -> f64 {
    x * x + y * y
}

fn sphere_gradient(x: f64, y: f64) -> [f64; 2] {
    [2.0 * x, 2.0 * y]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_standard_minima() {
        let catalog = ObjectiveCatalog::standard();
        assert_eq!(catalog.len(), 8);
        for name in catalog.names() {
            let entry = catalog.lookup(name).unwrap();
            let (location, value) = entry.minimum().unwrap();
            assert!(entry.bounds().contains(location), "{name} minimum outside its box");
            assert_abs_diff_eq!(entry.at(location), value, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_lookup_is_lenient_about_spelling() {
        let catalog = ObjectiveCatalog::standard();
        assert_eq!(catalog.lookup("Goldstein Price").unwrap().name(), "goldstein-price");
        assert_eq!(catalog.lookup("CROSS_IN_TRAY").unwrap().name(), "cross-in-tray");
        assert_eq!(catalog.lookup("Rosenbrock").unwrap().name(), "rosenbrock");
    }

    #[test]
    fn test_unknown_name() {
        let catalog = ObjectiveCatalog::standard();
        assert_eq!(
            catalog.lookup("booth").unwrap_err(),
            Error::UnknownObjective("booth".into())
        );
        assert!(ObjectiveCatalog::new().lookup("sphere").is_err());
    }

    #[test]
    fn test_register_custom() {
        let mut catalog = ObjectiveCatalog::new();
        let bounds = Bounds::new(-10.0, 10.0, -10.0, 10.0).unwrap();
        catalog.register(
            NamedObjective::new("Booth", |x, y| (x + 2.0 * y - 7.0).powi(2) + (2.0 * x + y - 5.0).powi(2), bounds)
                .with_minimum([1.0, 3.0], 0.0),
        );
        let booth = catalog.lookup("booth").unwrap();
        assert_eq!(booth.evaluate(1.0, 3.0), 0.0);
        assert_eq!(booth.gradient(1.0, 3.0), None);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(rosenbrock(0.0, 0.0), 1.0);
        assert_eq!(himmelblau(0.0, 0.0), 170.0);
        assert_abs_diff_eq!(goldstein_price(0.0, 0.0), 600.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bukin_n6(0.0, 0.0), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(isom(0.0, 0.0), -(-2.0 * PI * PI).exp(), epsilon = 1e-15);
    }
}
