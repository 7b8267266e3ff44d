use serde::Serialize;

/// Final result of a supervised download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Downloader finished and every expected file is present.
    Success,
    /// The primary pass had no launches left when the run started.
    CeilingReached,
    /// Every allowed launch stalled.
    HungExhausted,
    /// Every allowed launch crashed; `code` is the last fatal exit code.
    FatalExhausted { code: i32 },
    /// Serial relaunches used up with these files still missing.
    VerificationIncomplete { missing: Vec<String> },
    /// Stopped on request.
    Aborted,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::CeilingReached | Outcome::HungExhausted => 2,
            Outcome::FatalExhausted { .. } => 3,
            Outcome::VerificationIncomplete { .. } => 4,
            Outcome::Aborted => 130,
        }
    }
}

/// Summary of one run, printed as JSON by `ssara-dl download --json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dataset: String,
    pub outcome: Outcome,
    /// Launches in the primary pass.
    pub launches: u32,
    /// Launches in the verification pass.
    pub serial_launches: u32,
    /// Total backoff slept between launches.
    pub backoff_secs: f64,
    pub elapsed_secs: f64,
}
