use crate::error::Result;
use crate::math::optimization::finite_difference::{gradient_or_estimate, norm, DEFAULT_STEP};
use crate::math::optimization::{
    require_count, require_finite, require_positive, Bounds, ObjectiveFunction,
    OptimizationConfig, Optimizer, Outcome, Point, Status, TrajectoryRecorder,
};

/// Configuration specific to gradient descent with step halving.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientDescentConfig {
    /// Starting point
    pub start: Point,
    /// Initial step multiplier `t`
    pub step: f64,
    /// Stop when the gradient norm drops below this (ε1)
    pub gradient_tolerance: f64,
    /// Stop when both the step length and the change in value drop below this (ε2)
    pub step_tolerance: f64,
    /// Maximum number of step halvings per iteration before giving up
    pub max_halvings: usize,
    /// A gradient component above this magnitude is treated as divergence
    pub divergence_threshold: f64,
    /// Step used by the central-difference gradient
    pub difference_step: f64,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            start: [0.0, 0.0],
            step: 0.1,
            gradient_tolerance: 1e-6,
            step_tolerance: 1e-6,
            max_halvings: 64,
            divergence_threshold: 1e10,
            difference_step: DEFAULT_STEP,
        }
    }
}

impl GradientDescentConfig {
    pub fn validate(&self) -> Result<()> {
        require_finite("start.x", self.start[0])?;
        require_finite("start.y", self.start[1])?;
        require_positive("step", self.step)?;
        require_positive("gradient_tolerance", self.gradient_tolerance)?;
        require_positive("step_tolerance", self.step_tolerance)?;
        require_count("max_halvings", self.max_halvings)?;
        require_positive("divergence_threshold", self.divergence_threshold)?;
        require_positive("difference_step", self.difference_step)
    }
}

/// Minimizes an objective function using steepest descent with step halving.
///
/// Each iteration records the current point, then tries `x - t·∇f(x)` and
/// halves `t` until the objective decreases. The gradient comes from
/// [`ObjectiveFunction::gradient`] when available, central differences
/// otherwise.
///
/// # Arguments
///
/// * `f` - The objective function to minimize
/// * `config` - Iteration budget
/// * `gd_config` - Starting point, step and tolerances
///
/// # Returns
///
/// An [`Outcome`] whose status is one of `GradientConverged`, `StepConverged`,
/// `Diverged`, `BacktrackingFailed` or `BudgetExhausted`.
///
/// # Examples
///
/// ```
/// use optim2d::OptimizationConfig;
/// use optim2d::math::optimization::gradient_descent::{minimize, GradientDescentConfig};
///
/// let sphere = |x: f64, y: f64| x * x + y * y;
/// let gd_config = GradientDescentConfig { start: [1.0, 1.0], ..Default::default() };
///
/// let outcome = minimize(&sphere, &OptimizationConfig::default(), &gd_config).unwrap();
/// assert!(outcome.converged);
/// ```
pub fn minimize<F>(
    f: &F,
    config: &OptimizationConfig,
    gd_config: &GradientDescentConfig,
) -> Result<Outcome>
where
    F: ObjectiveFunction + ?Sized,
{
    config.validate()?;
    gd_config.validate()?;
    log::debug!(
        "gradient descent from ({}, {}), step {}, max {} iterations",
        gd_config.start[0],
        gd_config.start[1],
        gd_config.step,
        config.max_iterations
    );

    let mut recorder = TrajectoryRecorder::with_capacity(config.max_iterations.min(1024));
    let mut point = gd_config.start;

    for iteration in 1..=config.max_iterations {
        let grad = gradient_or_estimate(f, point, gd_config.difference_step);
        let value = f.at(point);

        if grad
            .iter()
            .any(|g| !g.is_finite() || g.abs() > gd_config.divergence_threshold)
        {
            log::warn!("gradient exploded at iteration {iteration}: {grad:?}");
            return Ok(recorder.finish(Status::Diverged));
        }

        let grad_norm = norm(grad);
        recorder.record_with_gradient(iteration, point, value, grad_norm);

        if grad_norm < gd_config.gradient_tolerance {
            return Ok(recorder.finish(Status::GradientConverged));
        }

        let mut multiplier = gd_config.step;
        let mut candidate = descend(point, grad, multiplier);
        let mut candidate_value = f.at(candidate);
        let mut halvings = 0;
        while candidate_value >= value || candidate_value.is_nan() {
            if halvings == gd_config.max_halvings {
                log::warn!("no decrease after {halvings} halvings at iteration {iteration}");
                return Ok(recorder.finish(Status::BacktrackingFailed));
            }
            multiplier /= 2.0;
            halvings += 1;
            candidate = descend(point, grad, multiplier);
            candidate_value = f.at(candidate);
        }

        let moved = norm([candidate[0] - point[0], candidate[1] - point[1]]);
        if moved < gd_config.step_tolerance
            && (candidate_value - value).abs() < gd_config.step_tolerance
        {
            let final_grad = gradient_or_estimate(f, candidate, gd_config.difference_step);
            recorder.record_with_gradient(iteration + 1, candidate, candidate_value, norm(final_grad));
            return Ok(recorder.finish(Status::StepConverged));
        }

        point = candidate;
    }

    Ok(recorder.finish(Status::BudgetExhausted))
}

fn descend(point: Point, grad: [f64; 2], multiplier: f64) -> Point {
    [
        point[0] - multiplier * grad[0],
        point[1] - multiplier * grad[1],
    ]
}

impl Optimizer for GradientDescentConfig {
    /// Gradient descent is unconstrained; `bounds` is not used.
    fn optimize(
        &self,
        objective: &dyn ObjectiveFunction,
        _bounds: &Bounds,
        config: &OptimizationConfig,
    ) -> Result<Outcome> {
        minimize(objective, config, self)
    }
}
