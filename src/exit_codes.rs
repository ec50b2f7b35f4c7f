//! Exit code constants for the runexec binary.
//!
//! When the child completes, its own exit code is passed through. The
//! constants below cover the cases where the child's code is not meaningful:
//! - 0: Success
//! - 2: Usage or configuration error
//! - 124: Child killed by the watchdog timeout
//! - 125: Internal failure (stream copy, wait, kill)
//! - 127: Child could not be launched

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Bad arguments or invalid configuration.
pub const USAGE_ERROR: i32 = 2;

/// The child was killed after exceeding its timeout.
pub const TIMEOUT: i32 = 124;

/// Stream copy, wait, or kill failed inside runexec.
pub const INTERNAL_FAILURE: i32 = 125;

/// The child process could not be created.
pub const LAUNCH_FAILURE: i32 = 127;
