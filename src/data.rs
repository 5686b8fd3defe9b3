use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Length of every teaching slot in minutes.
pub const SLOT_MINUTES: u32 = 50;
/// Highest slot ordinal a day can have.
pub const MAX_SLOT_ORDINAL: u8 = 16;

// Positions inside the catalog and the course list.
pub type CourseIdx = usize;
pub type RoomIdx = usize;
pub type DayIdx = usize;
pub type SlotIdx = usize;

/// Wall-clock time of day with minute resolution, written as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    minutes: u16,
}

impl ClockTime {
    pub const fn from_hm(hours: u16, minutes: u16) -> Self {
        Self {
            minutes: hours * 60 + minutes,
        }
    }

    /// Minutes since midnight.
    pub fn minutes(&self) -> u16 {
        self.minutes
    }

    pub fn plus_minutes(&self, minutes: u32) -> Self {
        Self {
            minutes: self.minutes + minutes as u16,
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (h, m) = value
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got '{value}'"))?;
        let hours: u16 = h.parse().map_err(|_| format!("bad hour in '{value}'"))?;
        let minutes: u16 = m.parse().map_err(|_| format!("bad minute in '{value}'"))?;
        if hours > 23 || minutes > 59 {
            return Err(format!("'{value}' is not a time of day"));
        }
        Ok(ClockTime::from_hm(hours, minutes))
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Room {
    pub id: String,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Day {
    pub name: String,
}

impl Day {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A teaching interval within a day. Ordinals are contiguous even where the
/// wall-clock intervals are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub ordinal: u8,
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeSlot {
    pub fn new(ordinal: u8, start: ClockTime, minutes: u32) -> Self {
        Self {
            ordinal,
            start,
            end: start.plus_minutes(minutes),
        }
    }

    pub fn duration_minutes(&self) -> i32 {
        self.end.minutes() as i32 - self.start.minutes() as i32
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// The fixed rooms, days and slots a timetable is laid out on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub rooms: Vec<Room>,
    pub days: Vec<Day>,
    pub slots: Vec<TimeSlot>,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
}

fn default_slot_minutes() -> u32 {
    SLOT_MINUTES
}

const STANDARD_SLOT_STARTS: [(u16, u16); 16] = [
    (7, 0),
    (7, 50),
    (9, 0),
    (10, 0),
    (11, 0),
    (11, 50),
    (13, 0),
    (13, 50),
    (15, 0),
    (15, 50),
    (17, 0),
    (17, 50),
    (19, 0),
    (19, 50),
    (21, 0),
    (21, 50),
];

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// Rooms 501..506, Monday..Saturday and the sixteen daily slots.
    pub fn standard() -> Self {
        let rooms = (501..=506).map(|n| Room::new(n.to_string())).collect();
        let days = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"]
            .into_iter()
            .map(Day::new)
            .collect();
        let slots = STANDARD_SLOT_STARTS
            .iter()
            .enumerate()
            .map(|(i, &(h, m))| TimeSlot::new(i as u8 + 1, ClockTime::from_hm(h, m), SLOT_MINUTES))
            .collect();
        Self {
            rooms,
            days,
            slots,
            slot_minutes: SLOT_MINUTES,
        }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        let invalid = |msg: String| Err(InputError::InvalidCatalog(msg));

        if self.slot_minutes == 0 {
            return invalid("slot duration must be positive".to_string());
        }
        if self.rooms.is_empty() || self.days.is_empty() || self.slots.is_empty() {
            return invalid("rooms, days and slots must all be non-empty".to_string());
        }

        let mut room_ids = HashSet::new();
        for room in &self.rooms {
            if room.id.trim().is_empty() {
                return invalid("room ids must not be empty".to_string());
            }
            if !room_ids.insert(room.id.as_str()) {
                return invalid(format!("room '{}' is listed more than once", room.id));
            }
        }

        let mut day_names = HashSet::new();
        for day in &self.days {
            if !day_names.insert(day.name.as_str()) {
                return invalid(format!("day '{}' is listed more than once", day.name));
            }
        }

        let mut previous: Option<&TimeSlot> = None;
        for slot in &self.slots {
            if slot.ordinal == 0 || slot.ordinal > MAX_SLOT_ORDINAL {
                return invalid(format!("slot ordinal {} is outside 1..=16", slot.ordinal));
            }
            if slot.duration_minutes() != self.slot_minutes as i32 {
                return invalid(format!(
                    "slot {} ({}) does not last {} minutes",
                    slot.ordinal,
                    slot.label(),
                    self.slot_minutes
                ));
            }
            if let Some(prev) = previous {
                if slot.ordinal <= prev.ordinal {
                    return invalid("slot ordinals must be strictly increasing".to_string());
                }
                if slot.start < prev.end {
                    return invalid(format!(
                        "slot {} overlaps slot {}",
                        slot.ordinal, prev.ordinal
                    ));
                }
            }
            previous = Some(slot);
        }
        Ok(())
    }

    pub fn room_index(&self, id: &str) -> Option<RoomIdx> {
        self.rooms.iter().position(|r| r.id == id)
    }

    pub fn slot_index(&self, ordinal: u8) -> Option<SlotIdx> {
        self.slots.iter().position(|s| s.ordinal == ordinal)
    }

    /// Number of (room, day, slot) positions.
    pub fn positions(&self) -> usize {
        self.rooms.len() * self.days.len() * self.slots.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub name: String,
    pub required_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherInput {
    pub name: String,
    pub course: String,
    pub preferred_slot: i64,
}

/// Unvalidated scheduling request as handed over by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingInput {
    pub courses: Vec<CourseInput>,
    #[serde(default)]
    pub teachers: Vec<TeacherInput>,
}

impl SchedulingInput {
    pub fn with_course(mut self, name: impl Into<String>, required_minutes: i64) -> Self {
        self.courses.push(CourseInput {
            name: name.into(),
            required_minutes,
        });
        self
    }

    pub fn with_teacher(
        mut self,
        name: impl Into<String>,
        course: impl Into<String>,
        preferred_slot: i64,
    ) -> Self {
        self.teachers.push(TeacherInput {
            name: name.into(),
            course: course.into(),
            preferred_slot,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    name: String,
    required_minutes: u64,
}

impl Course {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_minutes(&self) -> u64 {
        self.required_minutes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherPreference {
    teacher: String,
    course: CourseIdx,
    preferred_slot: u8,
    slot: SlotIdx,
}

impl TeacherPreference {
    pub fn teacher(&self) -> &str {
        &self.teacher
    }

    pub fn course(&self) -> CourseIdx {
        self.course
    }

    /// Preferred slot ordinal (1-based).
    pub fn preferred_slot(&self) -> u8 {
        self.preferred_slot
    }

    /// Position of the preferred slot in the catalog.
    pub fn slot_index(&self) -> SlotIdx {
        self.slot
    }
}

/// Validated, immutable scheduling instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    catalog: Catalog,
    courses: Vec<Course>,
    teachers: Vec<TeacherPreference>,
}

impl Domain {
    pub fn new(input: &SchedulingInput, catalog: Catalog) -> Result<Self, InputError> {
        catalog.validate()?;

        if input.courses.is_empty() {
            return Err(InputError::NoCourses);
        }

        let slot_minutes = catalog.slot_minutes;
        let mut courses: Vec<Course> = Vec::with_capacity(input.courses.len());
        for course in &input.courses {
            let name = course.name.trim();
            if name.is_empty() {
                return Err(InputError::EmptyCourseName);
            }
            if courses.iter().any(|c| c.name == name) {
                return Err(InputError::DuplicateCourse(name.to_string()));
            }
            if course.required_minutes <= 0 {
                return Err(InputError::NonPositiveMinutes {
                    course: name.to_string(),
                    minutes: course.required_minutes,
                });
            }
            if course.required_minutes % slot_minutes as i64 != 0 {
                return Err(InputError::MisalignedDuration {
                    course: name.to_string(),
                    minutes: course.required_minutes,
                    slot_minutes,
                });
            }
            courses.push(Course {
                name: name.to_string(),
                required_minutes: course.required_minutes as u64,
            });
        }

        let mut teachers: Vec<TeacherPreference> = Vec::with_capacity(input.teachers.len());
        for teacher in &input.teachers {
            let name = teacher.name.trim();
            if name.is_empty() {
                return Err(InputError::EmptyTeacherName);
            }
            if teachers.iter().any(|t| t.teacher == name) {
                return Err(InputError::DuplicateTeacher(name.to_string()));
            }
            let course = courses
                .iter()
                .position(|c| c.name == teacher.course.trim())
                .ok_or_else(|| InputError::UnknownCourse {
                    teacher: name.to_string(),
                    course: teacher.course.clone(),
                })?;
            if teacher.preferred_slot < 1 || teacher.preferred_slot > MAX_SLOT_ORDINAL as i64 {
                return Err(InputError::SlotOutOfRange {
                    teacher: name.to_string(),
                    slot: teacher.preferred_slot,
                });
            }
            let preferred_slot = teacher.preferred_slot as u8;
            let slot = catalog
                .slot_index(preferred_slot)
                .ok_or_else(|| InputError::SlotNotInCatalog {
                    teacher: name.to_string(),
                    slot: preferred_slot,
                })?;
            teachers.push(TeacherPreference {
                teacher: name.to_string(),
                course,
                preferred_slot,
                slot,
            });
        }

        Ok(Self {
            catalog,
            courses,
            teachers,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn course(&self, idx: CourseIdx) -> &Course {
        &self.courses[idx]
    }

    pub fn rooms(&self) -> &[Room] {
        &self.catalog.rooms
    }

    pub fn days(&self) -> &[Day] {
        &self.catalog.days
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.catalog.slots
    }

    pub fn teachers(&self) -> &[TeacherPreference] {
        &self.teachers
    }

    pub fn slot_minutes(&self) -> u32 {
        self.catalog.slot_minutes
    }

    /// Slots a course must occupy per week.
    pub fn required_slots(&self, idx: CourseIdx) -> u64 {
        self.courses[idx].required_minutes / self.slot_minutes() as u64
    }
}
