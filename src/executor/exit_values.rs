//! Exit-value policy.

use std::collections::BTreeSet;

/// Decides which exit codes count as success.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExitValues {
    /// Only 0 is success.
    #[default]
    ZeroOnly,
    /// Exactly these codes are success.
    Allowed(BTreeSet<i32>),
    /// Every code is accepted; exit-value failures are never reported.
    Any,
}

impl ExitValues {
    /// Accept exactly `codes`. An empty set falls back to [`ExitValues::ZeroOnly`].
    pub fn allowed<I: IntoIterator<Item = i32>>(codes: I) -> Self {
        let codes: BTreeSet<i32> = codes.into_iter().collect();
        if codes.is_empty() {
            ExitValues::ZeroOnly
        } else {
            ExitValues::Allowed(codes)
        }
    }

    pub fn is_failure(&self, code: i32) -> bool {
        match self {
            ExitValues::ZeroOnly => code != 0,
            ExitValues::Allowed(codes) => !codes.contains(&code),
            ExitValues::Any => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accepts_only_zero() {
        let policy = ExitValues::default();
        assert!(!policy.is_failure(0));
        for code in [1, 2, -1, 127, 255] {
            assert!(policy.is_failure(code), "code {}", code);
        }
    }

    #[test]
    fn allowed_set_accepts_exactly_its_members() {
        let policy = ExitValues::allowed([0, 1, 2]);
        for code in -3..10 {
            assert_eq!(policy.is_failure(code), !(0..=2).contains(&code), "code {}", code);
        }
    }

    #[test]
    fn empty_allowed_set_means_zero_only() {
        assert_eq!(ExitValues::allowed([]), ExitValues::ZeroOnly);
    }

    #[test]
    fn any_accepts_everything() {
        let policy = ExitValues::Any;
        assert!(!policy.is_failure(0));
        assert!(!policy.is_failure(143));
        assert!(!policy.is_failure(-1));
    }
}
