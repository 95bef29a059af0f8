use std::fmt;
use std::io::{self, Write};

use crate::math::optimization::simplex::Sense;
use crate::math::optimization::Point;

/// One recorded iteration of an optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// 1-based iteration number
    pub iteration: usize,
    pub x: f64,
    pub y: f64,
    /// Objective value at `(x, y)`
    pub f_value: f64,
    /// Gradient norm at `(x, y)`, for gradient-based methods
    pub grad_norm: Option<f64>,
}

impl Snapshot {
    pub fn point(&self) -> Point {
        [self.x, self.y]
    }
}

/// Why an optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Gradient norm fell below its tolerance.
    GradientConverged,
    /// Both the step length and the change in value fell below tolerance.
    StepConverged,
    /// The best value stopped changing for the configured number of iterations.
    Stagnated,
    /// A run-to-budget method used its whole iteration budget.
    BudgetCompleted,
    /// The adaptive patch radius ran out of allowed expansions.
    ExpansionLimitReached,
    /// The gradient exploded.
    Diverged,
    /// Step halving never produced a decrease.
    BacktrackingFailed,
    /// The iteration budget ran out before any stopping rule fired.
    BudgetExhausted,
    /// The constrained solver found a feasible optimum.
    SolverSucceeded(Sense),
    /// The constrained solver failed or ended infeasible.
    SolverFailed(Sense),
}

impl Status {
    /// The optimizer's own success verdict.
    pub fn converged(&self) -> bool {
        matches!(
            self,
            Status::GradientConverged
                | Status::StepConverged
                | Status::Stagnated
                | Status::BudgetCompleted
                | Status::ExpansionLimitReached
                | Status::SolverSucceeded(_)
        )
    }

    /// True for the divergence category.
    pub fn diverged(&self) -> bool {
        matches!(self, Status::Diverged | Status::BacktrackingFailed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Status::GradientConverged => "converged (gradient norm below tolerance)",
            Status::StepConverged => "converged (change in function value below tolerance)",
            Status::Stagnated => "optimum found (no further improvement)",
            Status::BudgetCompleted => "optimum found",
            Status::ExpansionLimitReached => "expansion limit reached",
            Status::Diverged => "diverged (gradient norm too large)",
            Status::BacktrackingFailed => "diverged (step halving found no decrease)",
            Status::BudgetExhausted => "not converged (maximum number of iterations reached)",
            Status::SolverSucceeded(Sense::Minimize) => "minimum found",
            Status::SolverSucceeded(Sense::Maximize) => "maximum found",
            Status::SolverFailed(Sense::Minimize) => "minimum not found",
            Status::SolverFailed(Sense::Maximize) => "maximum not found",
        };
        f.write_str(message)
    }
}

/// Result of an optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Recorded iterations in increasing order; the last one is the reported solution
    pub history: Vec<Snapshot>,
    /// Success verdict, see [`Status::converged`]
    pub converged: bool,
    /// Human-readable status
    pub message: String,
    pub status: Status,
}

impl Outcome {
    pub fn new(history: Vec<Snapshot>, status: Status) -> Self {
        Self {
            history,
            converged: status.converged(),
            message: status.to_string(),
            status,
        }
    }

    /// The reported solution, if any iteration was recorded.
    pub fn best(&self) -> Option<&Snapshot> {
        self.history.last()
    }

    pub fn iterations(&self) -> usize {
        self.history.len()
    }

    /// Splits into the `(history, converged, message)` triple.
    pub fn into_parts(self) -> (Vec<Snapshot>, bool, String) {
        (self.history, self.converged, self.message)
    }

    /// Writes the history as CSV with an `iteration,x,y,f_value,grad_norm` header.
    /// A missing gradient norm is written as an empty field.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "iteration,x,y,f_value,grad_norm")?;
        for s in &self.history {
            write!(out, "{},{:.16},{:.16},{:.16},", s.iteration, s.x, s.y, s.f_value)?;
            match s.grad_norm {
                Some(g) => writeln!(out, "{g:.16}")?,
                None => writeln!(out)?,
            }
        }
        Ok(())
    }
}

/// Accumulates one snapshot per committed iteration.
#[derive(Debug, Default)]
pub struct TrajectoryRecorder {
    records: Vec<Snapshot>,
}

impl TrajectoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, iteration: usize, point: Point, f_value: f64) {
        self.push(iteration, point, f_value, None);
    }

    pub fn record_with_gradient(
        &mut self,
        iteration: usize,
        point: Point,
        f_value: f64,
        grad_norm: f64,
    ) {
        self.push(iteration, point, f_value, Some(grad_norm));
    }

    fn push(&mut self, iteration: usize, point: Point, f_value: f64, grad_norm: Option<f64>) {
        log::trace!(
            "iteration {iteration}: ({:.6}, {:.6}) -> {f_value:.6e}",
            point[0],
            point[1]
        );
        self.records.push(Snapshot {
            iteration,
            x: point[0],
            y: point[1],
            f_value,
            grad_norm,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.records.last()
    }

    /// Seals the history with its terminal status.
    pub fn finish(self, status: Status) -> Outcome {
        match self.records.last() {
            Some(last) => log::info!(
                "{status} after {} iterations, f({:.6}, {:.6}) = {:.6e}",
                self.records.len(),
                last.x,
                last.y,
                last.f_value
            ),
            None => log::info!("{status} before the first iteration"),
        }
        Outcome::new(self.records, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_keeps_order() {
        let mut recorder = TrajectoryRecorder::new();
        recorder.record(1, [1.0, 2.0], 5.0);
        recorder.record(2, [0.5, 1.0], 1.25);
        assert_eq!(recorder.len(), 2);

        let outcome = recorder.finish(Status::BudgetCompleted);
        assert!(outcome.converged);
        assert_eq!(outcome.message, "optimum found");
        assert_eq!(outcome.history[0].iteration, 1);
        assert_eq!(outcome.best().unwrap().point(), [0.5, 1.0]);
        assert_eq!(outcome.best().unwrap().grad_norm, None);
    }

    #[test]
    fn test_status_categories() {
        assert!(Status::ExpansionLimitReached.converged());
        assert!(!Status::BudgetExhausted.converged());
        assert!(!Status::Diverged.converged());
        assert!(Status::BacktrackingFailed.diverged());
        assert!(!Status::SolverFailed(Sense::Maximize).converged());
        assert_eq!(
            Status::SolverSucceeded(Sense::Maximize).to_string(),
            "maximum found"
        );
    }

    #[test]
    fn test_into_parts() {
        let mut recorder = TrajectoryRecorder::with_capacity(1);
        recorder.record_with_gradient(1, [0.0, 0.0], 0.0, 1e-9);
        let (history, converged, message) = recorder.finish(Status::GradientConverged).into_parts();
        assert_eq!(history.len(), 1);
        assert!(converged);
        assert!(message.starts_with("converged"));
    }

    #[test]
    fn test_write_csv() {
        let mut recorder = TrajectoryRecorder::new();
        recorder.record_with_gradient(1, [1.0, -1.0], 2.0, 0.5);
        recorder.record(2, [0.0, 0.0], 0.0);
        let outcome = recorder.finish(Status::StepConverged);

        let mut buffer = Vec::new();
        outcome.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.trim_end().split('\n').collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "iteration,x,y,f_value,grad_norm");
        assert!(lines[1].starts_with("1,1.0000000000000000,-1.0000000000000000,"));
        assert!(lines[1].ends_with(",0.5000000000000000"));
        assert!(lines[2].ends_with(','));
    }
}
