/// Visit and outcome state definitions for tracking crawl progress
///
/// `VisitState` is what the frontier records per URL; `PageOutcome` is the
/// terminal result the engine reports for one processed URL.
use std::fmt;

/// Represents the frontier's view of a URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VisitState {
    /// Known and queued, not yet handed out
    Unvisited,

    /// Handed to a worker and currently being fetched or extracted
    InFlight,

    /// Fetched and extracted (with or without records)
    Done,

    /// Could not be fetched or parsed; carries the reason
    Failed(String),
}

impl VisitState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Returns true if this state may move to `next`
    ///
    /// The only legal path is Unvisited -> InFlight -> {Done | Failed}.
    pub fn can_transition_to(&self, next: &VisitState) -> bool {
        matches!(
            (self, next),
            (Self::Unvisited, Self::InFlight)
                | (Self::InFlight, Self::Done)
                | (Self::InFlight, Self::Failed(_))
        )
    }

    /// Short name of the state, without the failure reason
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unvisited => "unvisited",
            Self::InFlight => "in_flight",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed ({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Terminal result of processing one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Extraction produced at least one record
    Emitted,

    /// Extraction succeeded but produced no records
    ExtractedEmpty,

    /// The fetch (or parse) failed after all retries
    FetchFailed,
}

impl PageOutcome {
    /// Returns true if the page was fetched and extracted
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Emitted | Self::ExtractedEmpty)
    }

    /// The visit state the frontier records for this outcome
    pub fn visit_state(&self, reason: Option<&str>) -> VisitState {
        match self {
            Self::Emitted | Self::ExtractedEmpty => VisitState::Done,
            Self::FetchFailed => VisitState::Failed(reason.unwrap_or("unknown").to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emitted => "emitted",
            Self::ExtractedEmpty => "extracted_empty",
            Self::FetchFailed => "fetch_failed",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
