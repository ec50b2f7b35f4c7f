//! Command description consumed by the launchers.
//!
//! Arguments are stored exactly as supplied: each element becomes one argv
//! slot and is never re-tokenized. Quoting and variable substitution happen
//! before a `CommandSpec` is built.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Environment passed to a launched process.
///
/// `None` at the call sites means "inherit the caller's environment"; a map
/// replaces the environment entirely.
pub type Environment = BTreeMap<String, String>;

/// An executable plus its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    executable: String,
    arguments: Vec<String>,
    is_file: bool,
}

impl CommandSpec {
    /// Create a command for an executable name or path.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: Vec::new(),
            is_file: false,
        }
    }

    /// Create a command whose executable is an explicit file.
    ///
    /// Launchers use the path as-is and skip working-directory lookup.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: path.into().to_string_lossy().into_owned(),
            arguments: Vec::new(),
            is_file: true,
        }
    }

    /// Build a command from a full argv. Returns `None` for an empty argv.
    pub fn from_argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut iter = argv.into_iter();
        let executable = iter.next()?.into();
        Some(Self::new(executable).args(iter))
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    /// Append several arguments in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Whether the executable was given as an explicit file.
    pub fn is_file(&self) -> bool {
        self.is_file
    }

    /// Replace the executable, keeping the arguments.
    pub(crate) fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Executable followed by the arguments.
    pub fn to_argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.arguments.len() + 1);
        argv.push(self.executable.clone());
        argv.extend(self.arguments.iter().cloned());
        argv
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.to_argv().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_keep_their_boundaries() {
        let cmd = CommandSpec::new("printf")
            .arg("%s\n")
            .arg("hello world")
            .args(["a b", "", "c"]);

        assert_eq!(cmd.executable(), "printf");
        assert_eq!(cmd.arguments(), ["%s\n", "hello world", "a b", "", "c"]);
        assert_eq!(cmd.to_argv().len(), 6);
    }

    #[test]
    fn from_argv_splits_executable() {
        let cmd = CommandSpec::from_argv(["ls", "-la", "/tmp"]).unwrap();
        assert_eq!(cmd.executable(), "ls");
        assert_eq!(cmd.arguments(), ["-la", "/tmp"]);
        assert!(!cmd.is_file());

        assert!(CommandSpec::from_argv(Vec::<String>::new()).is_none());
    }

    #[test]
    fn from_path_marks_file() {
        let cmd = CommandSpec::from_path("/usr/bin/env").arg("true");
        assert!(cmd.is_file());
        assert_eq!(cmd.executable(), "/usr/bin/env");
    }

    #[test]
    fn display_lists_argv() {
        let cmd = CommandSpec::new("echo").arg("hi");
        assert_eq!(cmd.to_string(), "[echo, hi]");
    }
}
