//! Terminal outcome of one execution.

use crate::error::{ExecError, Result};
use crate::process::INVALID_EXIT_VALUE;
use serde::Serialize;
use std::time::Duration;

/// Exit code plus the failure (if any) of one execution.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Exit code of the process, or [`INVALID_EXIT_VALUE`] if it never ran.
    pub exit_code: i32,
    /// Launch, stream, exit-value, or timeout failure.
    pub error: Option<ExecError>,
    /// The watchdog timeout fired and killed the process.
    pub killed_by_timeout: bool,
    /// The process was killed by an explicit cancel request.
    pub cancelled: bool,
    /// Wall time from launch attempt to result.
    pub duration: Duration,
}

impl ExecutionResult {
    /// Result for an execution that failed before producing an exit code.
    pub(crate) fn failed(error: ExecError, duration: Duration) -> Self {
        Self {
            exit_code: INVALID_EXIT_VALUE,
            error: Some(error),
            killed_by_timeout: false,
            cancelled: false,
            duration,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn timed_out(&self) -> bool {
        self.killed_by_timeout
    }

    /// Convert into the exit code, or the captured failure.
    pub fn into_result(self) -> Result<i32> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.exit_code),
        }
    }

    /// Serializable summary.
    pub fn report(&self) -> ExecutionReport {
        ExecutionReport {
            exit_code: self.exit_code,
            success: self.is_success(),
            killed_by_timeout: self.killed_by_timeout,
            cancelled: self.cancelled,
            duration_ms: self.duration.as_millis() as u64,
            error: self.error.as_ref().map(ToString::to_string),
        }
    }
}

/// JSON-friendly view of an [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub exit_code: i32,
    pub success: bool,
    pub killed_by_timeout: bool,
    pub cancelled: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_result_is_success() {
        let result = ExecutionResult {
            exit_code: 0,
            error: None,
            killed_by_timeout: false,
            cancelled: false,
            duration: Duration::from_millis(5),
        };
        assert!(result.is_success());
        assert_eq!(result.into_result().unwrap(), 0);

        let result = ExecutionResult {
            exit_code: 1,
            error: Some(ExecError::ExitValue { code: 1 }),
            killed_by_timeout: false,
            cancelled: false,
            duration: Duration::from_millis(5),
        };
        assert!(!result.is_success());
        assert!(matches!(
            result.into_result(),
            Err(ExecError::ExitValue { code: 1 })
        ));
    }

    #[test]
    fn failed_result_has_invalid_exit_value() {
        let result = ExecutionResult::failed(ExecError::ResultLost, Duration::ZERO);
        assert_eq!(result.exit_code, INVALID_EXIT_VALUE);
        assert!(!result.timed_out());
    }

    #[test]
    fn report_serializes_to_json() {
        let result = ExecutionResult {
            exit_code: 137,
            error: None,
            killed_by_timeout: true,
            cancelled: false,
            duration: Duration::from_millis(2001),
        };

        let json = serde_json::to_value(result.report()).unwrap();
        assert_eq!(json["exit_code"], 137);
        assert_eq!(json["success"], true);
        assert_eq!(json["killed_by_timeout"], true);
        assert_eq!(json["duration_ms"], 2001);
        assert!(json.get("error").is_none());
    }
}
