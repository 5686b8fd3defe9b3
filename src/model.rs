use crate::config::{ExclusivityMode, SolverConfig};
use crate::data::{CourseIdx, DayIdx, Domain, RoomIdx, SlotIdx};
use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint, variable};
use itertools::{Itertools, iproduct};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Share of the unit base cost spent on the positional tie-break.
const TIE_BREAK_SPREAD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintFamily {
    Duration,
    GlobalExclusivity,
    RoomExclusivity,
    RoomContinuity,
    DailyCap,
    TeacherSinglePlace,
    PreferenceLink,
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintFamily::Duration => "duration",
            ConstraintFamily::GlobalExclusivity => "global exclusivity",
            ConstraintFamily::RoomExclusivity => "room exclusivity",
            ConstraintFamily::RoomContinuity => "room continuity",
            ConstraintFamily::DailyCap => "daily cap",
            ConstraintFamily::TeacherSinglePlace => "teacher single place",
            ConstraintFamily::PreferenceLink => "preference link",
        };
        f.write_str(name)
    }
}

/// One (course, room, day, slot) decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quadruple {
    pub course: CourseIdx,
    pub room: RoomIdx,
    pub day: DayIdx,
    pub slot: SlotIdx,
}

/// Maps quadruples onto a flat, course-major variable vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    courses: usize,
    rooms: usize,
    days: usize,
    slots: usize,
}

impl VariableLayout {
    pub fn new(domain: &Domain) -> Self {
        Self {
            courses: domain.courses().len(),
            rooms: domain.rooms().len(),
            days: domain.days().len(),
            slots: domain.slots().len(),
        }
    }

    pub fn len(&self) -> usize {
        self.courses * self.per_course()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn per_course(&self) -> usize {
        self.rooms * self.days * self.slots
    }

    pub fn index(&self, course: CourseIdx, room: RoomIdx, day: DayIdx, slot: SlotIdx) -> usize {
        ((course * self.rooms + room) * self.days + day) * self.slots + slot
    }

    pub fn quadruple(&self, index: usize) -> Quadruple {
        let slot = index % self.slots;
        let rest = index / self.slots;
        let day = rest % self.days;
        let rest = rest / self.days;
        Quadruple {
            course: rest / self.rooms,
            room: rest % self.rooms,
            day,
            slot,
        }
    }

    pub fn course_range(&self, course: CourseIdx) -> std::ops::Range<usize> {
        let start = course * self.per_course();
        start..start + self.per_course()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStats {
    pub decision_variables: usize,
    pub preference_variables: usize,
    pub constraints: BTreeMap<ConstraintFamily, usize>,
}

impl ModelStats {
    pub fn total_constraints(&self) -> usize {
        self.constraints.values().sum()
    }

    pub fn count(&self, family: ConstraintFamily) -> usize {
        self.constraints.get(&family).copied().unwrap_or(0)
    }
}

/// A compiled binary timetabling model, ready to hand to a MILP backend.
pub struct TimetableModel {
    pub(crate) variables: ProblemVariables,
    pub(crate) layout: VariableLayout,
    pub(crate) assign: Vec<Variable>,
    /// Objective coefficient of each entry of `assign`.
    pub(crate) costs: Vec<f64>,
    /// One satisfaction variable per teacher, in domain order.
    pub(crate) preferences: Vec<Variable>,
    pub(crate) objective: Expression,
    pub(crate) constraints: Vec<(ConstraintFamily, Constraint)>,
    penalty_weight: f64,
}

impl TimetableModel {
    pub fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    pub fn penalty_weight(&self) -> f64 {
        self.penalty_weight
    }

    pub fn stats(&self) -> ModelStats {
        let mut constraints = BTreeMap::new();
        for (family, _) in &self.constraints {
            *constraints.entry(*family).or_insert(0) += 1;
        }
        ModelStats {
            decision_variables: self.assign.len(),
            preference_variables: self.preferences.len(),
            constraints,
        }
    }
}

/// Rank of every room when ordered by id.
fn room_ranks(domain: &Domain) -> Vec<usize> {
    let mut ranks = vec![0; domain.rooms().len()];
    let order = (0..domain.rooms().len()).sorted_by(|&a, &b| {
        domain.rooms()[a].id.cmp(&domain.rooms()[b].id)
    });
    for (rank, room) in order.enumerate() {
        ranks[room] = rank;
    }
    ranks
}

/// Objective coefficient of a decision variable at the given position rank.
/// Lies in `[1, 1 + TIE_BREAK_SPREAD)` and grows with the rank.
pub(crate) fn base_coefficient(rank: usize, positions: usize) -> f64 {
    1.0 + TIE_BREAK_SPREAD * rank as f64 / positions as f64
}

/// Smallest penalty that strictly exceeds any attainable base objective.
fn penalty_floor(domain: &Domain) -> f64 {
    let scheduled: u64 = (0..domain.courses().len())
        .map(|c| domain.required_slots(c))
        .sum();
    scheduled as f64 * (1.0 + TIE_BREAK_SPREAD) + 1.0
}

/// Penalty per unmet preference: the configured weight, raised to the
/// dominance floor when it is too small.
pub fn effective_penalty_weight(domain: &Domain, config: &SolverConfig) -> f64 {
    let floor = penalty_floor(domain);
    match config.penalty_weight {
        Some(weight) if weight >= floor => weight,
        Some(weight) => {
            warn!(
                "Penalty weight {} does not dominate the base objective; raising it to {}.",
                weight, floor
            );
            floor
        }
        None => floor,
    }
}

/// Compiles a domain into decision variables, hard constraints and the
/// weighted objective. Every call starts from a fresh variable space.
pub fn build(domain: &Domain, config: &SolverConfig) -> TimetableModel {
    let layout = VariableLayout::new(domain);
    let rooms = 0..domain.rooms().len();
    let days = 0..domain.days().len();
    let slots = 0..domain.slots().len();

    info!(
        "Building timetable model with {} courses, {} rooms, {} days, {} slots and {} teachers...",
        domain.courses().len(),
        domain.rooms().len(),
        domain.days().len(),
        domain.slots().len(),
        domain.teachers().len()
    );

    let mut variables = ProblemVariables::new();
    // x_crds = 1 if course c is taught in room r on day d in slot s
    let assign = variables.add_vector(variable().binary(), layout.len());
    let x = |c: CourseIdx, r: RoomIdx, d: DayIdx, s: SlotIdx| assign[layout.index(c, r, d, s)];

    // objective: slot count, nudged towards the smallest room id, then day, then slot
    let positions = domain.catalog().positions();
    let ranks = room_ranks(domain);
    let costs: Vec<f64> = (0..layout.len())
        .map(|i| {
            let q = layout.quadruple(i);
            let rank = (ranks[q.room] * layout.days + q.day) * layout.slots + q.slot;
            base_coefficient(rank, positions)
        })
        .collect();
    let mut objective = Expression::from(0.0);
    for (&cost, &var) in costs.iter().zip(&assign) {
        objective += cost * var;
    }

    let penalty_weight = effective_penalty_weight(domain, config);

    let mut preferences = Vec::with_capacity(domain.teachers().len());
    for _ in domain.teachers() {
        let satisfied = variables.add(variable().min(0.0).max(1.0));
        objective += Expression::from(penalty_weight);
        objective -= penalty_weight * satisfied;
        preferences.push(satisfied);
    }

    let mut constraints: Vec<(ConstraintFamily, Constraint)> = Vec::new();

    let slot_minutes = domain.slot_minutes() as f64;
    for (c, course) in domain.courses().iter().enumerate() {
        let minutes: Expression = layout
            .course_range(c)
            .map(|i| slot_minutes * assign[i])
            .sum();
        let required = course.required_minutes() as f64;
        constraints.push((ConstraintFamily::Duration, constraint!(minutes == required)));
    }

    if config.exclusivity == ExclusivityMode::Global {
        for (d, s) in iproduct!(days.clone(), slots.clone()) {
            for (c1, c2) in (0..domain.courses().len()).tuple_combinations() {
                let pair: Expression = rooms
                    .clone()
                    .map(|r| x(c1, r, d, s))
                    .chain(rooms.clone().map(|r| x(c2, r, d, s)))
                    .sum();
                constraints.push((ConstraintFamily::GlobalExclusivity, constraint!(pair <= 1.0)));
            }
        }
    } else {
        debug!("Global exclusivity disabled; only rooms are exclusive.");
    }

    for (r, d, s) in iproduct!(rooms.clone(), days.clone(), slots.clone()) {
        let occupied: Expression = (0..domain.courses().len()).map(|c| x(c, r, d, s)).sum();
        constraints.push((ConstraintFamily::RoomExclusivity, constraint!(occupied <= 1.0)));
    }

    // consecutive ordinals within a day must not switch rooms
    let adjacent: Vec<(SlotIdx, SlotIdx)> = slots
        .clone()
        .tuple_windows()
        .filter(|&(a, b)| domain.slots()[b].ordinal == domain.slots()[a].ordinal + 1)
        .collect();
    for c in 0..domain.courses().len() {
        for d in days.clone() {
            for &(s, next) in &adjacent {
                for (r1, r2) in iproduct!(rooms.clone(), rooms.clone()) {
                    if r1 == r2 {
                        continue;
                    }
                    let here = x(c, r1, d, s);
                    let there = x(c, r2, d, next);
                    constraints.push((
                        ConstraintFamily::RoomContinuity,
                        constraint!(here + there <= 1.0),
                    ));
                }
            }
        }
    }

    let cap = config.daily_cap as f64;
    for (c, d) in iproduct!(0..domain.courses().len(), days.clone()) {
        let per_day: Expression = iproduct!(rooms.clone(), slots.clone())
            .map(|(r, s)| x(c, r, d, s))
            .sum();
        constraints.push((ConstraintFamily::DailyCap, constraint!(per_day <= cap)));
    }

    let taught: Vec<CourseIdx> = domain
        .teachers()
        .iter()
        .map(|t| t.course())
        .unique()
        .collect();
    for c in taught {
        for (d, s) in iproduct!(days.clone(), slots.clone()) {
            let places: Expression = rooms.clone().map(|r| x(c, r, d, s)).sum();
            constraints.push((
                ConstraintFamily::TeacherSinglePlace,
                constraint!(places <= 1.0),
            ));
        }
    }

    for (teacher, &satisfied) in domain.teachers().iter().zip(&preferences) {
        let at_preferred: Expression = iproduct!(rooms.clone(), days.clone())
            .map(|(r, d)| x(teacher.course(), r, d, teacher.slot_index()))
            .sum();
        constraints.push((
            ConstraintFamily::PreferenceLink,
            constraint!(satisfied <= at_preferred),
        ));
    }

    let model = TimetableModel {
        variables,
        layout,
        assign,
        costs,
        preferences,
        objective,
        constraints,
        penalty_weight,
    };
    let stats = model.stats();
    for (family, count) in &stats.constraints {
        debug!("{} {} constraints", count, family);
    }
    info!(
        "Model ready: {} decision variables, {} preference variables, {} constraints.",
        stats.decision_variables,
        stats.preference_variables,
        stats.total_constraints()
    );
    model
}
