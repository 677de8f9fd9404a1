//! The value shape stored in the engine's results map.

use std::fmt;

/// The value a task's `work` returns on a successful attempt: either an
/// integer status code (`0` success / `-1` failure) or a boolean success
/// flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Status(i32),
    Flag(bool),
}

impl TaskOutcome {
    /// Treat the outcome as a success/failure flag: `Status(0)` and
    /// `Flag(true)` are success, everything else is failure.
    pub fn is_success(&self) -> bool {
        match self {
            TaskOutcome::Status(code) => *code == 0,
            TaskOutcome::Flag(flag) => *flag,
        }
    }
}

impl From<i32> for TaskOutcome {
    fn from(code: i32) -> Self {
        TaskOutcome::Status(code)
    }
}

impl From<bool> for TaskOutcome {
    fn from(flag: bool) -> Self {
        TaskOutcome::Flag(flag)
    }
}

/// The value recorded in the results map for a finalized task: either the
/// value `work` returned on its last attempt, or an error-tagged value
/// carrying the final failure's string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Ok(TaskOutcome),
    Err(String),
}

impl TaskResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, TaskResult::Ok(outcome) if outcome.is_success())
    }

    pub fn as_outcome(&self) -> Option<&TaskOutcome> {
        match self {
            TaskResult::Ok(outcome) => Some(outcome),
            TaskResult::Err(_) => None,
        }
    }
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskResult::Ok(TaskOutcome::Status(code)) => write!(f, "status={code}"),
            TaskResult::Ok(TaskOutcome::Flag(flag)) => write!(f, "flag={flag}"),
            TaskResult::Err(msg) => write!(f, "error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_zero_is_success() {
        assert!(TaskOutcome::Status(0).is_success());
        assert!(!TaskOutcome::Status(-1).is_success());
    }

    #[test]
    fn flag_true_is_success() {
        assert!(TaskOutcome::Flag(true).is_success());
        assert!(!TaskOutcome::Flag(false).is_success());
    }

    #[test]
    fn task_result_is_ok_requires_successful_outcome() {
        assert!(TaskResult::Ok(TaskOutcome::Status(0)).is_ok());
        assert!(!TaskResult::Ok(TaskOutcome::Status(-1)).is_ok());
        assert!(!TaskResult::Err("boom".into()).is_ok());
    }
}
