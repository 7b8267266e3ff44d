//! Classify a finished downloader launch into a retry policy kind.

use serde::Serialize;

/// How one supervised launch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Directory size stopped changing; the child was killed.
    Hung,
    /// Child exited on its own with this code (signals reported as 128+N).
    Exited(i32),
}

/// Retry-relevant classification of a [`Termination`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminationKind {
    /// Stalled transfer.
    Hung,
    /// Exit code in the configured fatal set (e.g. 137).
    Fatal { code: i32 },
    /// Any other exit, including success; goes on to verification.
    Finished { code: i32 },
}

impl TerminationKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, TerminationKind::Hung | TerminationKind::Fatal { .. })
    }
}

/// Classify a termination against the set of fatal exit codes.
pub fn classify(termination: Termination, fatal_exit_codes: &[i32]) -> TerminationKind {
    match termination {
        Termination::Hung => TerminationKind::Hung,
        Termination::Exited(code) if fatal_exit_codes.contains(&code) => {
            TerminationKind::Fatal { code }
        }
        Termination::Exited(code) => TerminationKind::Finished { code },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hung_is_retryable() {
        let kind = classify(Termination::Hung, &[137]);
        assert_eq!(kind, TerminationKind::Hung);
        assert!(kind.is_retryable());
    }

    #[test]
    fn sigkill_code_is_fatal() {
        let kind = classify(Termination::Exited(137), &[137]);
        assert_eq!(kind, TerminationKind::Fatal { code: 137 });
        assert!(kind.is_retryable());
    }

    #[test]
    fn other_codes_finish() {
        for code in [0, 1, 2, 143, 255] {
            let kind = classify(Termination::Exited(code), &[137]);
            assert_eq!(kind, TerminationKind::Finished { code });
            assert!(!kind.is_retryable());
        }
    }

    #[test]
    fn fatal_set_is_configurable() {
        assert_eq!(
            classify(Termination::Exited(143), &[137, 143]),
            TerminationKind::Fatal { code: 143 }
        );
    }
}
