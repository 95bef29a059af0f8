//! Patch bookkeeping shared by the bee colony and hybrid optimizers:
//! greedy site-leader selection and the adaptive patch radius.

use rand::Rng;

use crate::error::{Error, Result};
use crate::math::optimization::{distance, require_count, require_positive, Bounds, Point};

/// A change of the best value smaller than this counts as stagnation.
pub const IMPROVEMENT_THRESHOLD: f64 = 1e-5;

/// How "inside a leader's patch" is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteMetric {
    /// Square patch: inside iff every coordinate is within the radius.
    PerAxis,
    /// Disc patch: inside iff the Euclidean distance is within the radius.
    Euclidean,
}

impl SiteMetric {
    /// True when `candidate` lies outside the patch of `radius` around `leader`.
    pub fn outside(self, candidate: Point, leader: Point, radius: f64) -> bool {
        match self {
            SiteMetric::PerAxis => (0..2).any(|i| (candidate[i] - leader[i]).abs() > radius),
            SiteMetric::Euclidean => distance(candidate, leader) > radius,
        }
    }
}

/// Which way the radius moves when the best value improves.
/// Stagnation always moves it the other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusDirection {
    /// Improvement multiplies the radius by `koeff` (narrows the patches).
    ShrinkOnImprovement,
    /// Improvement divides the radius by `koeff` (widens the patches).
    GrowOnImprovement,
}

/// Leaders chosen for one iteration, as indices into the population.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sites {
    pub best: Vec<usize>,
    pub selected: Vec<usize>,
}

impl Sites {
    pub fn is_leader(&self, index: usize) -> bool {
        self.best.contains(&index) || self.selected.contains(&index)
    }
}

/// Greedy leader selection.
///
/// `order` lists population indices best first. The first one always leads a
/// best site; later agents lead a best site if they lie outside every accepted
/// best-site patch, then a selected site if they also lie outside every
/// accepted selected-site patch.
pub fn classify(
    order: &[usize],
    positions: &[Point],
    radius: f64,
    metric: SiteMetric,
    best_count: usize,
    selected_count: usize,
) -> Sites {
    let mut sites = Sites::default();
    let Some(&first) = order.first() else {
        return sites;
    };
    sites.best.push(first);

    let far_from = |candidate: usize, leaders: &[usize]| {
        leaders
            .iter()
            .all(|&l| metric.outside(positions[candidate], positions[l], radius))
    };

    let mut cursor = 1;
    while cursor < order.len() && sites.best.len() < best_count {
        let candidate = order[cursor];
        if far_from(candidate, &sites.best) {
            sites.best.push(candidate);
        }
        cursor += 1;
    }

    while cursor < order.len() && sites.selected.len() < selected_count {
        let candidate = order[cursor];
        if far_from(candidate, &sites.best) && far_from(candidate, &sites.selected) {
            sites.selected.push(candidate);
        }
        cursor += 1;
    }

    sites
}

/// What [`RadiusController::observe`] decided for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusEvent {
    Improved,
    Stagnating,
    /// Stagnated for `tolerance` iterations; the radius moved against the
    /// improvement direction and one expansion was spent.
    Adjusted,
    /// The last allowed expansion was spent.
    LimitReached,
}

/// Adaptive patch radius with a stagnation counter and an expansion budget.
#[derive(Debug, Clone)]
pub struct RadiusController {
    radius: f64,
    koeff: f64,
    direction: RadiusDirection,
    tolerance: usize,
    expansions_left: usize,
    stagnation: usize,
    last_best: f64,
    limit: f64,
}

impl RadiusController {
    pub fn new(
        radius: f64,
        koeff: f64,
        direction: RadiusDirection,
        tolerance: usize,
        global_tolerance: usize,
    ) -> Self {
        Self {
            radius,
            koeff,
            direction,
            tolerance,
            expansions_left: global_tolerance,
            stagnation: 0,
            last_best: f64::INFINITY,
            limit: f64::MAX,
        }
    }

    /// Caps the radius at `limit`, now and after every adjustment.
    pub fn with_limit(mut self, limit: f64) -> Self {
        self.limit = limit;
        self.radius = self.radius.min(limit);
        self
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn expansions_left(&self) -> usize {
        self.expansions_left
    }

    /// Feeds the best value of the iteration that just finished.
    pub fn observe(&mut self, best: f64) -> RadiusEvent {
        if (best - self.last_best).abs() > IMPROVEMENT_THRESHOLD {
            self.last_best = best;
            self.stagnation = 0;
            self.radius = match self.direction {
                RadiusDirection::ShrinkOnImprovement => self.radius * self.koeff,
                RadiusDirection::GrowOnImprovement => self.radius / self.koeff,
            }
            .min(self.limit);
            return RadiusEvent::Improved;
        }

        self.stagnation += 1;
        if self.stagnation < self.tolerance {
            return RadiusEvent::Stagnating;
        }

        self.stagnation = 0;
        self.radius = match self.direction {
            RadiusDirection::ShrinkOnImprovement => self.radius / self.koeff,
            RadiusDirection::GrowOnImprovement => self.radius * self.koeff,
        }
        .min(self.limit);
        self.expansions_left = self.expansions_left.saturating_sub(1);
        log::debug!(
            "patch radius adjusted to {:.6}, {} expansions left",
            self.radius,
            self.expansions_left
        );
        if self.expansions_left == 0 {
            RadiusEvent::LimitReached
        } else {
            RadiusEvent::Adjusted
        }
    }
}

/// Largest useful patch radius for `bounds`: its widest side.
pub fn radius_limit(bounds: &Bounds) -> f64 {
    let span = bounds.span();
    span[0].max(span[1])
}

/// Uniform offset inside the square of half-width `radius`.
pub(crate) fn patch_offset<R: Rng + ?Sized>(radius: f64, rng: &mut R) -> Point {
    [
        radius * rng.gen_range(-1.0..=1.0),
        radius * rng.gen_range(-1.0..=1.0),
    ]
}

/// Checks the parameters every radius-adaptive optimizer shares.
pub(crate) fn validate_radius(
    radius: f64,
    koeff: f64,
    tolerance: usize,
    global_tolerance: usize,
) -> Result<()> {
    require_positive("radius", radius)?;
    if !(koeff > 0.0 && koeff <= 1.0) {
        return Err(Error::ConstraintViolation(format!(
            "radius coefficient koeff must lie in (0, 1], got {koeff}"
        )));
    }
    require_count("tolerance", tolerance)?;
    require_count("global_tolerance", global_tolerance)
}
