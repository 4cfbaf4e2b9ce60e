/// The reason an optimizing tier refused to build an automaton.
///
/// A bailout is never a match failure. The controller records it and pins
/// the pattern below the failed tier for the rest of its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BailoutError {
    /// The automaton exceeded the configured state limit.
    TooManyStates { limit: usize },
    /// The capture-group buffer would need more rows or offsets than the
    /// encoding can address.
    TooManyCaptureSlots,
    /// The pattern uses a construct the tier cannot represent.
    Unsupported(String),
}

impl std::fmt::Display for BailoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BailoutError::TooManyStates { limit } => {
                write!(f, "automaton exceeds the limit of {} states", limit)
            }
            BailoutError::TooManyCaptureSlots => {
                write!(f, "too many capture-group slots")
            }
            BailoutError::Unsupported(what) => {
                write!(f, "unsupported by this tier: {}", what)
            }
        }
    }
}

impl std::error::Error for BailoutError {}

/// An error that aborted a search before it produced a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The host raised the interrupt flag while the interpreter was running.
    Interrupted { offset: usize },
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::Interrupted { offset } => {
                write!(f, "search interrupted at offset {}", offset)
            }
        }
    }
}

impl std::error::Error for MatchError {}
