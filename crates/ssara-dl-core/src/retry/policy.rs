use serde::Serialize;
use std::time::Duration;

use super::classify::TerminationKind;
use crate::config::RetryConfig;

/// Which pass a launch belongs to. Each pass has its own launch ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Primary download pass.
    Parallel,
    /// Verification re-download pass.
    Serial,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Parallel => write!(f, "parallel"),
            Mode::Serial => write!(f, "serial"),
        }
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not relaunch.
    NoRetry,
    /// Relaunch after the given delay.
    RetryAfter(Duration),
}

/// Bounded relaunch policy with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Launch ceiling for the primary pass.
    pub max_attempts: u32,
    /// Launch ceiling for the verification pass.
    pub verify_max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
    /// Exit codes that count as a crash.
    pub fatal_exit_codes: Vec<i32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            verify_max_attempts: cfg.verify_max_attempts,
            base_delay: Duration::from_secs_f64(cfg.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
            fatal_exit_codes: cfg.fatal_exit_codes.clone(),
        }
    }
}

impl RetryPolicy {
    /// Maximum launches allowed in `mode`.
    pub fn ceiling(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Parallel => self.max_attempts,
            Mode::Serial => self.verify_max_attempts,
        }
    }

    /// Whether another launch is allowed after `launches` launches in `mode`.
    pub fn can_launch(&self, mode: Mode, launches: u32) -> bool {
        launches < self.ceiling(mode)
    }

    /// Backoff before the launch following launch number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        // base * 2^(attempt-1), capped.
        let exp = 1u32 << attempt.saturating_sub(1).min(8);
        self.base_delay.saturating_mul(exp).min(self.max_delay)
    }

    /// Decide whether to relaunch after launch number `attempt` ended as `kind`.
    pub fn decide(&self, mode: Mode, attempt: u32, kind: TerminationKind) -> RetryDecision {
        if !kind.is_retryable() || !self.can_launch(mode, attempt) {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff(attempt))
    }
}
