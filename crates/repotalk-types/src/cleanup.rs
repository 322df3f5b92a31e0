use std::fmt;

/// Outcome of a best-effort cleanup step.
///
/// Cleanup never fails the operation that triggered it. Callers get this value
/// back so a failed cleanup is visible instead of silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    /// Everything that needed removing was removed
    Done,
    /// Nothing to clean up
    Skipped,
    /// Cleanup was attempted and at least one step failed
    Failed(String),
}

impl Cleanup {
    pub fn failed(reason: impl Into<String>) -> Self {
        Cleanup::Failed(reason.into())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Cleanup::Failed(_))
    }

    /// Combine two cleanup outcomes; any failure wins, then `Done` over `Skipped`.
    pub fn and(self, other: Cleanup) -> Cleanup {
        match (self, other) {
            (Cleanup::Failed(a), Cleanup::Failed(b)) => Cleanup::Failed(format!("{}; {}", a, b)),
            (Cleanup::Failed(a), _) | (_, Cleanup::Failed(a)) => Cleanup::Failed(a),
            (Cleanup::Done, _) | (_, Cleanup::Done) => Cleanup::Done,
            (Cleanup::Skipped, Cleanup::Skipped) => Cleanup::Skipped,
        }
    }
}

impl fmt::Display for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cleanup::Done => f.write_str("done"),
            Cleanup::Skipped => f.write_str("skipped"),
            Cleanup::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}
