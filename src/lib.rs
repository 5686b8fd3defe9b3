//! Course timetabling as a binary integer program.
//!
//! A [`Domain`](data::Domain) is compiled by [`model::build`] into decision
//! variables and hard constraints, solved with HiGHS by [`solver::solve`] and
//! projected into presentation views by [`report::project`].

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod report;
pub mod server;
pub mod solver;
pub mod verify;

use crate::config::SolverConfig;
use crate::data::{Catalog, Domain, SchedulingInput};
use crate::error::ScheduleError;
use crate::report::Timetable;

/// Validates the input, solves it and projects the result.
pub fn schedule(
    input: &SchedulingInput,
    catalog: Catalog,
    config: &SolverConfig,
) -> Result<Timetable, ScheduleError> {
    let domain = Domain::new(input, catalog)?;
    let solution = solver::solve(&domain, config).into_result()?;
    Ok(report::project(&solution, &domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExclusivityMode;
    use crate::data::Day;
    use crate::error::{ErrorKind, InputError};
    use crate::solver::{Solution, SolveOutcome, SolveStatus};
    use crate::verify::verify;
    use std::collections::BTreeSet;

    fn domain(input: SchedulingInput) -> Domain {
        Domain::new(&input, Catalog::standard()).unwrap()
    }

    fn solve_optimal(domain: &Domain, config: &SolverConfig) -> Solution {
        match solver::solve(domain, config) {
            SolveOutcome::Optimal(solution) => solution,
            other => panic!("expected an optimal schedule, got {:?}", other.status()),
        }
    }

    fn assert_hard_constraints(solution: &Solution, domain: &Domain, config: &SolverConfig) {
        let violations = verify(solution, domain, config);
        assert!(violations.is_empty(), "violations: {violations:?}");
        for summary in report::course_summary(solution, domain) {
            assert!(summary.is_met(), "{summary:?}");
        }
    }

    #[test]
    fn two_short_courses_fit() {
        let d = domain(
            SchedulingInput::default()
                .with_course("A", 100)
                .with_course("B", 100),
        );
        let solution = solve_optimal(&d, &SolverConfig::default());
        assert_eq!(solution.assignments().len(), 4);
        let summary = report::course_summary(&solution, &d);
        assert_eq!(summary[0].assigned_minutes, 100);
        assert_eq!(summary[1].assigned_minutes, 100);
        assert_hard_constraints(&solution, &d, &SolverConfig::default());
    }

    #[test]
    fn course_longer_than_the_week_is_infeasible() {
        let d = domain(SchedulingInput::default().with_course("A", 5000));
        let outcome = solver::solve(&d, &SolverConfig::default());
        assert_eq!(outcome.status(), SolveStatus::Infeasible);
        assert!(outcome.solution().is_none());
    }

    #[test]
    fn misaligned_duration_is_rejected_before_solving() {
        let err = schedule(
            &SchedulingInput::default().with_course("A", 120),
            Catalog::standard(),
            &SolverConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidInput(InputError::MisalignedDuration { minutes: 120, .. })
        ));
    }

    #[test]
    fn daily_cap_spreads_long_course_over_days() {
        let d = domain(SchedulingInput::default().with_course("A", 250));
        let solution = solve_optimal(&d, &SolverConfig::default());
        let days: BTreeSet<usize> = solution.assignments().iter().map(|q| q.day).collect();
        assert!(days.len() >= 2);
        assert_hard_constraints(&solution, &d, &SolverConfig::default());
    }

    #[test]
    fn uncontested_preference_is_honoured() {
        let d = domain(
            SchedulingInput::default()
                .with_course("A", 50)
                .with_teacher("Ruiz", "A", 7),
        );
        let solution = solve_optimal(&d, &SolverConfig::default());
        assert_eq!(solution.assignments().len(), 1);
        assert_eq!(d.slots()[solution.assignments()[0].slot].ordinal, 7);

        let report = report::teacher_report(&solution, &d);
        assert!(report[0].satisfied);
        assert_eq!(report[0].placement.as_ref().unwrap().slot, 7);
    }

    #[test]
    fn contested_preference_goes_unmet_but_schedule_stays_valid() {
        let mut catalog = Catalog::standard();
        catalog.days = vec![Day::new("Monday")];
        let d = Domain::new(
            &SchedulingInput::default()
                .with_course("A", 50)
                .with_course("B", 50)
                .with_teacher("Ruiz", "A", 1)
                .with_teacher("Lopez", "B", 1),
            catalog,
        )
        .unwrap();
        let config = SolverConfig::default();
        let solution = solve_optimal(&d, &config);
        assert_hard_constraints(&solution, &d, &config);

        let report = report::teacher_report(&solution, &d);
        let satisfied = report.iter().filter(|r| r.satisfied).count();
        assert_eq!(satisfied, 1);
        let unmet = report.iter().find(|r| !r.satisfied).unwrap();
        let placed = unmet.placement.as_ref().unwrap();
        assert_ne!(placed.slot, 1);
    }

    #[test]
    fn repeated_solves_are_identical() {
        let d = domain(
            SchedulingInput::default()
                .with_course("A", 150)
                .with_course("B", 200)
                .with_course("C", 100)
                .with_teacher("Ruiz", "B", 4),
        );
        let config = SolverConfig::default();
        let first = solve_optimal(&d, &config);
        let second = solve_optimal(&d, &config);
        assert_eq!(first, second);
        assert_eq!(
            report::project(&first, &d),
            report::project(&second, &d)
        );
    }

    #[test]
    fn mixed_catalog_respects_every_hard_constraint() {
        let d = domain(
            SchedulingInput::default()
                .with_course("A", 150)
                .with_course("B", 200)
                .with_course("C", 100)
                .with_course("D", 250)
                .with_teacher("Ruiz", "A", 2)
                .with_teacher("Lopez", "D", 9),
        );
        let config = SolverConfig::default();
        let solution = solve_optimal(&d, &config);
        assert_hard_constraints(&solution, &d, &config);

        // global exclusivity: one course per (day, slot) institution-wide
        let times: BTreeSet<(usize, usize)> = solution
            .assignments()
            .iter()
            .map(|q| (q.day, q.slot))
            .collect();
        assert_eq!(times.len(), solution.assignments().len());
    }

    #[test]
    fn room_only_mode_still_keeps_rooms_exclusive() {
        let d = domain(
            SchedulingInput::default()
                .with_course("A", 200)
                .with_course("B", 200)
                .with_course("C", 200),
        );
        let config = SolverConfig::default().with_exclusivity(ExclusivityMode::RoomOnly);
        let solution = solve_optimal(&d, &config);
        assert_hard_constraints(&solution, &d, &config);
    }

    #[test]
    fn schedule_returns_all_views() {
        let timetable = schedule(
            &SchedulingInput::default()
                .with_course("Algebra", 100)
                .with_teacher("Ruiz", "Algebra", 3),
            Catalog::standard(),
            &SolverConfig::default(),
        )
        .unwrap();
        assert!(timetable.optimal);
        assert_eq!(timetable.grid.occupied(), 2);
        assert_eq!(timetable.room_grids.len(), 6);
        assert!(timetable.teachers[0].satisfied);
    }

    #[test]
    fn infeasible_and_errors_stay_distinct() {
        let err = schedule(
            &SchedulingInput::default().with_course("A", 5000),
            Catalog::standard(),
            &SolverConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, ScheduleError::Infeasible);
        assert_eq!(err.kind(), ErrorKind::Infeasible);
    }
}
