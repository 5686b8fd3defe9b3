use crate::config::SolverConfig;
use crate::data::Domain;
use crate::error::{EngineError, ScheduleError};
use crate::model::{self, Quadruple, TimetableModel};
use crate::verify::{Violation, verify};
use good_lp::{ResolutionError, Solution as _, SolutionStatus, SolverModel, default_solver};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Lifecycle of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SolveStatus {
    NotSolved,
    Solving,
    Optimal,
    /// A verified incumbent accepted in best-effort mode.
    Feasible,
    Infeasible,
    Unbounded,
    Error,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStatus::NotSolved => "NotSolved",
            SolveStatus::Solving => "Solving",
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Feasible => "Feasible",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::Unbounded => "Unbounded",
            SolveStatus::Error => "Error",
        };
        f.write_str(name)
    }
}

/// The set of quadruples assigned by a solve, in (course, room, day, slot)
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    assignments: Vec<Quadruple>,
    objective: f64,
    proven_optimal: bool,
}

impl Solution {
    pub fn new(mut assignments: Vec<Quadruple>, objective: f64, proven_optimal: bool) -> Self {
        assignments.sort();
        assignments.dedup();
        Self {
            assignments,
            objective,
            proven_optimal,
        }
    }

    pub fn assignments(&self) -> &[Quadruple] {
        &self.assignments
    }

    pub fn is_assigned(&self, q: &Quadruple) -> bool {
        self.assignments.binary_search(q).is_ok()
    }

    /// Objective value of the rounded assignment.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn is_proven_optimal(&self) -> bool {
        self.proven_optimal
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Optimal(Solution),
    /// A verified schedule that is not proven optimal: either the search hit
    /// its limit in best-effort mode, or it stopped within a configured gap.
    BestEffort(Solution),
    Infeasible,
    Unbounded,
    Error(EngineError),
}

impl SolveOutcome {
    pub fn status(&self) -> SolveStatus {
        match self {
            SolveOutcome::Optimal(_) => SolveStatus::Optimal,
            SolveOutcome::BestEffort(_) => SolveStatus::Feasible,
            SolveOutcome::Infeasible => SolveStatus::Infeasible,
            SolveOutcome::Unbounded => SolveStatus::Unbounded,
            SolveOutcome::Error(_) => SolveStatus::Error,
        }
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveOutcome::Optimal(s) | SolveOutcome::BestEffort(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Solution, ScheduleError> {
        match self {
            SolveOutcome::Optimal(s) | SolveOutcome::BestEffort(s) => Ok(s),
            SolveOutcome::Infeasible => Err(ScheduleError::Infeasible),
            SolveOutcome::Unbounded => Err(ScheduleError::Unbounded),
            SolveOutcome::Error(e) => Err(ScheduleError::Solver(e)),
        }
    }
}

/// A relaxation-derived value counts as assigned when it lies within
/// `epsilon` of 1.
pub fn is_assigned(value: f64, epsilon: f64) -> bool {
    (value - 1.0).abs() <= epsilon
}

/// Solves the timetable with the HiGHS MILP solver.
pub fn solve(domain: &Domain, config: &SolverConfig) -> SolveOutcome {
    let never = AtomicBool::new(false);
    solve_with_cancel(domain, config, &never)
}

/// Like [`solve`], but gives up with [`EngineError::Cancelled`] once `cancel`
/// is set. The flag is only observed between phases: it never interrupts a
/// running HiGHS search, so without a time limit a cancel takes effect only
/// after the search finishes.
pub fn solve_with_cancel(
    domain: &Domain,
    config: &SolverConfig,
    cancel: &AtomicBool,
) -> SolveOutcome {
    let start_time = Instant::now();
    trace!("Solve status: {}", SolveStatus::NotSolved);

    let outcome = if cancel.load(Ordering::Relaxed) {
        SolveOutcome::Error(EngineError::Cancelled)
    } else {
        let model = model::build(domain, config);
        if cancel.load(Ordering::Relaxed) {
            SolveOutcome::Error(EngineError::Cancelled)
        } else {
            info!("Solve status: {}", SolveStatus::Solving);
            run(model, domain, config, cancel)
        }
    };

    let duration = start_time.elapsed();
    match &outcome {
        SolveOutcome::Error(e) => warn!(
            "Solve ended with {} after {:.2?}: {}",
            outcome.status(),
            duration,
            e
        ),
        _ => info!("Solve ended with {} in {:.2?}", outcome.status(), duration),
    }
    outcome
}

fn run(
    model: TimetableModel,
    domain: &Domain,
    config: &SolverConfig,
    cancel: &AtomicBool,
) -> SolveOutcome {
    let penalty = if domain.teachers().is_empty() {
        0.0
    } else {
        model.penalty_weight()
    };
    let TimetableModel {
        variables,
        layout,
        assign,
        costs,
        objective,
        constraints,
        ..
    } = model;

    let mut problem = variables
        .minimise(objective)
        .using(default_solver)
        .set_option("threads", config.threads) // single thread keeps runs reproducible
        .set_option("random_seed", config.random_seed)
        .set_option("mip_rel_gap", config.mip_rel_gap)
        .set_option("mip_abs_gap", config.mip_abs_gap)
        .set_option("output_flag", config.verbose)
        .set_option("log_to_console", config.verbose);
    if let Some(limit) = config.time_limit() {
        problem = problem.set_option("time_limit", limit.as_secs_f64());
    }
    for (_, constraint) in constraints {
        problem.add_constraint(constraint);
    }

    let search_start = Instant::now();
    let result = problem.solve();
    debug!("HiGHS returned after {:.2?}", search_start.elapsed());

    if cancel.load(Ordering::Relaxed) {
        return SolveOutcome::Error(EngineError::Cancelled);
    }

    let values = match result {
        Ok(values) => values,
        Err(ResolutionError::Infeasible) => return SolveOutcome::Infeasible,
        Err(ResolutionError::Unbounded) => return SolveOutcome::Unbounded,
        // HiGHS stopped at a limit before finding any incumbent.
        Err(ResolutionError::Other("NoSolutionFound")) => {
            return SolveOutcome::Error(EngineError::TimedOut);
        }
        Err(e) => return SolveOutcome::Error(EngineError::Backend(e.to_string())),
    };
    let status = values.status();
    debug!("HiGHS solution status: {:?}", status);

    let eps = config.rounding_epsilon;
    let assigned: Vec<Quadruple> = assign
        .iter()
        .positions(|var| is_assigned(values.value(*var), eps))
        .map(|i| layout.quadruple(i))
        .collect();
    let base: f64 = assign
        .iter()
        .zip(&costs)
        .filter(|(var, _)| is_assigned(values.value(**var), eps))
        .map(|(_, cost)| cost)
        .sum();
    trace!("{} of {} quadruples assigned", assigned.len(), assign.len());

    let proven = matches!(status, SolutionStatus::Optimal);
    let mut solution = Solution::new(assigned, base, proven);
    let unmet = domain
        .teachers()
        .iter()
        .filter(|t| {
            !solution
                .assignments()
                .iter()
                .any(|q| q.course == t.course() && q.slot == t.slot_index())
        })
        .count();
    solution.objective += unmet as f64 * penalty;

    let violations = verify(&solution, domain, config);
    settle(status, solution, &violations, config.best_effort)
}

/// Decides what a solution HiGHS handed back is worth, given why the search
/// stopped and whether the rounded assignment passed verification.
fn settle(
    status: SolutionStatus,
    solution: Solution,
    violations: &[Violation],
    best_effort: bool,
) -> SolveOutcome {
    match status {
        SolutionStatus::TimeLimit if best_effort && violations.is_empty() => {
            info!("Search limit reached; returning best incumbent.");
            SolveOutcome::BestEffort(solution)
        }
        SolutionStatus::TimeLimit => SolveOutcome::Error(EngineError::TimedOut),
        _ if !violations.is_empty() => {
            let detail = violations.iter().take(3).join("; ");
            SolveOutcome::Error(EngineError::RejectedSolution(detail))
        }
        SolutionStatus::Optimal => SolveOutcome::Optimal(solution),
        // Within the gap the caller configured, but not proven.
        SolutionStatus::GapLimit => SolveOutcome::BestEffort(solution),
    }
}
