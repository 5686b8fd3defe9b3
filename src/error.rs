use thiserror::Error;

/// Rejections raised while validating scheduling input. None of these ever
/// reach the solver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("at least one course is required")]
    NoCourses,

    #[error("course names must not be empty")]
    EmptyCourseName,

    #[error("course '{0}' is listed more than once")]
    DuplicateCourse(String),

    #[error("course '{course}' requires {minutes} minutes; required minutes must be positive")]
    NonPositiveMinutes { course: String, minutes: i64 },

    #[error(
        "course '{course}' requires {minutes} minutes, which is not a multiple of the {slot_minutes}-minute slot"
    )]
    MisalignedDuration {
        course: String,
        minutes: i64,
        slot_minutes: u32,
    },

    #[error("teacher names must not be empty")]
    EmptyTeacherName,

    #[error("teacher '{0}' is listed more than once")]
    DuplicateTeacher(String),

    #[error("teacher '{teacher}' references unknown course '{course}'")]
    UnknownCourse { teacher: String, course: String },

    #[error("teacher '{teacher}' prefers slot {slot}; slots are numbered 1..=16")]
    SlotOutOfRange { teacher: String, slot: i64 },

    #[error("teacher '{teacher}' prefers slot {slot}, which the slot catalog does not offer")]
    SlotNotInCatalog { teacher: String, slot: u8 },

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("unknown room '{0}'")]
    UnknownRoom(String),
}

/// Failures of the solving engine itself, as opposed to a model that simply
/// has no solution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("solver backend failed: {0}")]
    Backend(String),

    /// HiGHS stopped at its time limit, or at an iteration or memory limit,
    /// without an acceptable schedule.
    #[error("search limit reached before an acceptable schedule was found")]
    TimedOut,

    #[error("solve was cancelled")]
    Cancelled,

    #[error("solver returned a schedule that violates hard constraints: {0}")]
    RejectedSolution(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("requirements cannot be satisfied with the current rooms, days and slots")]
    Infeasible,

    #[error("the model is unbounded")]
    Unbounded,

    #[error("solver failed, try again: {0}")]
    Solver(#[from] EngineError),
}

/// Coarse classification used by presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Infeasible,
    Error,
}

impl ScheduleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScheduleError::InvalidInput(_) => ErrorKind::InvalidInput,
            ScheduleError::Infeasible => ErrorKind::Infeasible,
            ScheduleError::Unbounded | ScheduleError::Solver(_) => ErrorKind::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infeasible_and_engine_errors_have_distinct_kinds() {
        assert_eq!(ScheduleError::Infeasible.kind(), ErrorKind::Infeasible);
        assert_eq!(
            ScheduleError::from(EngineError::TimedOut).kind(),
            ErrorKind::Error
        );
        assert_eq!(
            ScheduleError::from(InputError::NoCourses).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn messages_name_the_offending_item() {
        let err = InputError::MisalignedDuration {
            course: "Algebra".to_string(),
            minutes: 120,
            slot_minutes: 50,
        };
        assert_eq!(
            err.to_string(),
            "course 'Algebra' requires 120 minutes, which is not a multiple of the 50-minute slot"
        );
    }
}
