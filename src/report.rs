use crate::data::{CourseIdx, Domain, RoomIdx};
use crate::error::InputError;
use crate::model::Quadruple;
use crate::solver::Solution;
use itertools::Itertools;
use serde::Serialize;
use std::fmt;

/// A day × slot table of labels; `cells[slot][day]`, empty string when free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    pub title: String,
    pub days: Vec<String>,
    pub slots: Vec<String>,
    pub cells: Vec<Vec<String>>,
}

impl Grid {
    fn empty(title: String, domain: &Domain) -> Self {
        Self {
            title,
            days: domain.days().iter().map(|d| d.name.clone()).collect(),
            slots: domain.slots().iter().map(|s| s.label()).collect(),
            cells: vec![vec![String::new(); domain.days().len()]; domain.slots().len()],
        }
    }

    pub fn cell(&self, day: usize, slot: usize) -> &str {
        &self.cells[slot][day]
    }

    /// Number of non-empty cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().flatten().filter(|c| !c.is_empty()).count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self.slots.iter().map(|s| s.len()).max().unwrap_or(0);
        let widths: Vec<usize> = (0..self.days.len())
            .map(|d| {
                self.cells
                    .iter()
                    .map(|row| row[d].len())
                    .chain([self.days[d].len()])
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        writeln!(f, "{}", self.title)?;
        write!(f, "{:label_width$}", "")?;
        for (day, width) in self.days.iter().zip(widths.iter().copied()) {
            write!(f, " | {day:width$}")?;
        }
        writeln!(f)?;
        for (slot, row) in self.slots.iter().zip(&self.cells) {
            write!(f, "{slot:label_width$}")?;
            for (cell, width) in row.iter().zip(widths.iter().copied()) {
                write!(f, " | {cell:width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub course: String,
    pub assigned_minutes: u64,
    pub required_minutes: u64,
}

impl CourseSummary {
    pub fn is_met(&self) -> bool {
        self.assigned_minutes == self.required_minutes
    }
}

/// Where a session actually takes place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub day: String,
    pub slot: u8,
    pub time: String,
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherReport {
    pub teacher: String,
    pub course: String,
    pub preferred_slot: u8,
    pub preferred_time: String,
    pub satisfied: bool,
    /// The session at the preferred slot when satisfied, otherwise the
    /// earliest session of the course.
    pub placement: Option<Placement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUsage {
    pub course: String,
    pub minutes: u64,
    pub sessions: usize,
}

/// Every view of a solved timetable, ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub optimal: bool,
    pub grid: Grid,
    pub room_grids: Vec<Grid>,
    pub courses: Vec<CourseSummary>,
    pub teachers: Vec<TeacherReport>,
}

fn placement(q: &Quadruple, domain: &Domain) -> Placement {
    let slot = &domain.slots()[q.slot];
    Placement {
        day: domain.days()[q.day].name.clone(),
        slot: slot.ordinal,
        time: slot.label(),
        room: domain.rooms()[q.room].id.clone(),
    }
}

fn room_index(domain: &Domain, room: &str) -> Result<RoomIdx, InputError> {
    domain
        .catalog()
        .room_index(room)
        .ok_or_else(|| InputError::UnknownRoom(room.to_string()))
}

/// Labels every (day, slot) with `course (room)` of its session. Under
/// room-only exclusivity parallel sessions are joined with `, `.
pub fn schedule_grid(solution: &Solution, domain: &Domain) -> Grid {
    let mut grid = Grid::empty("Timetable".to_string(), domain);
    let sessions = solution
        .assignments()
        .iter()
        .sorted_by_key(|q| (q.day, q.slot, q.room, q.course))
        .chunk_by(|q| (q.day, q.slot));
    for ((day, slot), group) in &sessions {
        grid.cells[slot][day] = group
            .map(|q| {
                format!(
                    "{} ({})",
                    domain.course(q.course).name(),
                    domain.rooms()[q.room].id
                )
            })
            .join(", ");
    }
    grid
}

/// The timetable of a single room, labelled with course names only.
pub fn room_grid(solution: &Solution, domain: &Domain, room: &str) -> Result<Grid, InputError> {
    let r = room_index(domain, room)?;
    let mut grid = Grid::empty(format!("Room {room}"), domain);
    for q in solution.assignments().iter().filter(|q| q.room == r) {
        grid.cells[q.slot][q.day] = domain.course(q.course).name().to_string();
    }
    Ok(grid)
}

/// Courses taught in a room with their minutes there; idle courses omitted.
pub fn room_usage(
    solution: &Solution,
    domain: &Domain,
    room: &str,
) -> Result<Vec<RoomUsage>, InputError> {
    let r = room_index(domain, room)?;
    let per_course = solution
        .assignments()
        .iter()
        .filter(|q| q.room == r)
        .map(|q| q.course)
        .counts();
    Ok(per_course
        .into_iter()
        .sorted()
        .map(|(c, sessions)| RoomUsage {
            course: domain.course(c).name().to_string(),
            minutes: sessions as u64 * domain.slot_minutes() as u64,
            sessions,
        })
        .collect())
}

pub fn course_summary(solution: &Solution, domain: &Domain) -> Vec<CourseSummary> {
    let per_course = solution.assignments().iter().map(|q| q.course).counts();
    domain
        .courses()
        .iter()
        .enumerate()
        .map(|(c, course)| CourseSummary {
            course: course.name().to_string(),
            assigned_minutes: per_course.get(&c).copied().unwrap_or(0) as u64
                * domain.slot_minutes() as u64,
            required_minutes: course.required_minutes(),
        })
        .collect()
}

fn sessions_of(solution: &Solution, course: CourseIdx) -> impl Iterator<Item = &Quadruple> {
    solution
        .assignments()
        .iter()
        .filter(move |q| q.course == course)
}

pub fn teacher_report(solution: &Solution, domain: &Domain) -> Vec<TeacherReport> {
    domain
        .teachers()
        .iter()
        .map(|t| {
            let preferred = sessions_of(solution, t.course())
                .filter(|q| q.slot == t.slot_index())
                .min_by_key(|q| (q.day, q.room));
            let satisfied = preferred.is_some();
            let session = preferred.or_else(|| {
                sessions_of(solution, t.course()).min_by_key(|q| (q.day, q.slot, q.room))
            });
            TeacherReport {
                teacher: t.teacher().to_string(),
                course: domain.course(t.course()).name().to_string(),
                preferred_slot: t.preferred_slot(),
                preferred_time: domain.slots()[t.slot_index()].label(),
                satisfied,
                placement: session.map(|q| placement(q, domain)),
            }
        })
        .collect()
}

/// Projects a solution onto every report view.
pub fn project(solution: &Solution, domain: &Domain) -> Timetable {
    let room_grids = domain
        .rooms()
        .iter()
        .filter_map(|room| room_grid(solution, domain, &room.id).ok())
        .collect();
    Timetable {
        optimal: solution.is_proven_optimal(),
        grid: schedule_grid(solution, domain),
        room_grids,
        courses: course_summary(solution, domain),
        teachers: teacher_report(solution, domain),
    }
}
