use crate::config::{ExclusivityMode, SolverConfig};
use crate::data::Domain;
use crate::model::{ConstraintFamily, Quadruple};
use crate::solver::Solution;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A hard constraint broken by a concrete assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub family: ConstraintFamily,
    pub detail: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.family, self.detail)
    }
}

/// Re-checks every hard constraint against a rounded solution. An empty
/// result means the solution is acceptable.
pub fn verify(solution: &Solution, domain: &Domain, config: &SolverConfig) -> Vec<Violation> {
    let mut violations = Vec::new();
    let assigned = solution.assignments();
    let course_name = |c: usize| domain.course(c).name();
    let at = |d: usize, s: usize| {
        format!(
            "{} slot {}",
            domain.days()[d].name,
            domain.slots()[s].ordinal
        )
    };

    let per_course: BTreeMap<usize, usize> = assigned
        .iter()
        .map(|q| q.course)
        .counts()
        .into_iter()
        .collect();
    for (c, course) in domain.courses().iter().enumerate() {
        let minutes =
            per_course.get(&c).copied().unwrap_or(0) as u64 * domain.slot_minutes() as u64;
        if minutes != course.required_minutes() {
            violations.push(Violation {
                family: ConstraintFamily::Duration,
                detail: format!(
                    "{} has {} minutes, requires {}",
                    course.name(),
                    minutes,
                    course.required_minutes()
                ),
            });
        }
    }

    // entries per (day, slot, course)
    let per_time: BTreeMap<(usize, usize, usize), usize> = assigned
        .iter()
        .map(|q| (q.day, q.slot, q.course))
        .counts()
        .into_iter()
        .collect();

    if config.exclusivity == ExclusivityMode::Global {
        let by_time = per_time
            .iter()
            .map(|(&(d, s, c), &n)| ((d, s), (c, n)))
            .into_group_map();
        for ((d, s), active) in by_time.into_iter().sorted_by_key(|(k, _)| *k) {
            for ((c1, n1), (c2, n2)) in active.iter().sorted().tuple_combinations() {
                if n1 + n2 > 1 {
                    violations.push(Violation {
                        family: ConstraintFamily::GlobalExclusivity,
                        detail: format!(
                            "{} and {} both run at {}",
                            course_name(*c1),
                            course_name(*c2),
                            at(d, s)
                        ),
                    });
                }
            }
        }
    }

    let per_room: BTreeMap<(usize, usize, usize), usize> = assigned
        .iter()
        .map(|q| (q.room, q.day, q.slot))
        .counts()
        .into_iter()
        .collect();
    for (&(r, d, s), &n) in &per_room {
        if n > 1 {
            violations.push(Violation {
                family: ConstraintFamily::RoomExclusivity,
                detail: format!(
                    "room {} holds {} courses at {}",
                    domain.rooms()[r].id,
                    n,
                    at(d, s)
                ),
            });
        }
    }

    let occupied: BTreeSet<Quadruple> = assigned.iter().copied().collect();
    for q in assigned {
        let ordinal = domain.slots()[q.slot].ordinal;
        let Some(next) = domain.slots().get(q.slot + 1) else {
            continue;
        };
        if next.ordinal != ordinal + 1 {
            continue;
        }
        for r in 0..domain.rooms().len() {
            let moved = Quadruple {
                room: r,
                slot: q.slot + 1,
                ..*q
            };
            if r != q.room && occupied.contains(&moved) {
                violations.push(Violation {
                    family: ConstraintFamily::RoomContinuity,
                    detail: format!(
                        "{} moves from room {} to room {} after {}",
                        course_name(q.course),
                        domain.rooms()[q.room].id,
                        domain.rooms()[r].id,
                        at(q.day, q.slot)
                    ),
                });
            }
        }
    }

    let per_day: BTreeMap<(usize, usize), usize> = assigned
        .iter()
        .map(|q| (q.course, q.day))
        .counts()
        .into_iter()
        .collect();
    for (&(c, d), &n) in &per_day {
        if n > config.daily_cap as usize {
            violations.push(Violation {
                family: ConstraintFamily::DailyCap,
                detail: format!(
                    "{} takes {} slots on {}, cap is {}",
                    course_name(c),
                    n,
                    domain.days()[d].name,
                    config.daily_cap
                ),
            });
        }
    }

    let taught: BTreeSet<usize> = domain.teachers().iter().map(|t| t.course()).collect();
    for (&(d, s, c), &n) in &per_time {
        if n > 1 && taught.contains(&c) {
            violations.push(Violation {
                family: ConstraintFamily::TeacherSinglePlace,
                detail: format!(
                    "{} is taught in {} rooms at {}",
                    course_name(c),
                    n,
                    at(d, s)
                ),
            });
        }
    }

    violations
}
