use crate::math::optimization::{ObjectiveFunction, Point};

/// Default step for [`gradient`].
pub const DEFAULT_STEP: f64 = 1e-5;

/// Central-difference gradient of `f` at `point` with step `h`.
///
/// Truncation error is O(h²); very small steps trade it for cancellation error.
pub fn gradient<F>(f: &F, point: Point, h: f64) -> [f64; 2]
where
    F: ObjectiveFunction + ?Sized,
{
    let [x, y] = point;
    [
        (f.evaluate(x + h, y) - f.evaluate(x - h, y)) / (2.0 * h),
        (f.evaluate(x, y + h) - f.evaluate(x, y - h)) / (2.0 * h),
    ]
}

/// Analytic gradient when the objective has one, central differences otherwise.
pub(crate) fn gradient_or_estimate<F>(f: &F, point: Point, h: f64) -> [f64; 2]
where
    F: ObjectiveFunction + ?Sized,
{
    f.gradient(point[0], point[1])
        .unwrap_or_else(|| gradient(f, point, h))
}

pub(crate) fn norm(v: [f64; 2]) -> f64 {
    v[0].hypot(v[1])
}
