//! Host operating-system family.
//!
//! Detected once at startup and passed explicitly to whatever needs it
//! (launcher selection), so tests can exercise either family on any host.

use serde::{Deserialize, Serialize};

/// OS family that determines how commands are launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    /// Unix-like hosts (Linux, macOS, BSD).
    Unix,
    /// Windows hosts, whose command interpreter needs the working directory
    /// applied inside the shell.
    Windows,
}

impl OsFamily {
    /// Family of the host this binary was compiled for.
    pub fn detect() -> Self {
        if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::Unix
        }
    }

    /// Parse a family name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "unix" | "linux" | "mac" | "macos" => Some(Self::Unix),
            "windows" | "win" | "win32" => Some(Self::Windows),
            _ => None,
        }
    }
}

impl Default for OsFamily {
    fn default() -> Self {
        Self::detect()
    }
}
