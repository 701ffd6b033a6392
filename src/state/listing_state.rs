/// Listing state definitions for tracking a detail parse
///
/// A listing parse moves `Fetching -> {Removed, Absent, Extracting} -> Done`.
use std::fmt;

/// Represents the current state of one listing's detail parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingState {
    // ===== Active States =====
    /// Detail page is being fetched
    Fetching,

    /// Detail page was fetched and fields are being extracted
    Extracting,

    // ===== Settled States =====
    /// Site redirected to its removal marker; the listing no longer exists
    Removed,

    /// Detail page was not found or returned an unexpected status
    Absent,

    /// Parse finished
    Done,
}

impl ListingState {
    /// Returns true if no further transition is expected
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the listing is known to be gone after this state
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Removed | Self::Absent)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: ListingState) -> bool {
        matches!(
            (self, next),
            (Self::Fetching, Self::Removed)
                | (Self::Fetching, Self::Absent)
                | (Self::Fetching, Self::Extracting)
                | (Self::Fetching, Self::Done)
                | (Self::Removed, Self::Done)
                | (Self::Absent, Self::Done)
                | (Self::Extracting, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Removed => "removed",
            Self::Absent => "absent",
            Self::Done => "done",
        }
    }

    /// Returns all possible listing states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Fetching,
            Self::Extracting,
            Self::Removed,
            Self::Absent,
            Self::Done,
        ]
    }
}

impl fmt::Display for ListingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
