use crate::ranges::RangeSet;

/// A state ID in the NFA
pub type NfaStateId = usize;

/// A zero-width assertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Look {
    /// Holds only at the start of the search region.
    Start,
    /// Holds only at the end of the search region.
    End,
}

/// A Thompson NFA state.
///
/// Capture offsets are numbered `2 * group` for a group's start and
/// `2 * group + 1` for its end. Group 0 is the overall match and is saved
/// explicitly like any other group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NfaState {
    /// Consumes one code unit in `ranges`.
    Char { ranges: RangeSet, next: NfaStateId },
    /// Epsilon transitions, highest priority first.
    Split { alternatives: Box<[NfaStateId]> },
    /// Records the current position in capture offset `offset`.
    Save { offset: usize, next: NfaStateId },
    /// Resets capture offsets, used when a quantified group starts a new
    /// iteration.
    ClearGroups { offsets: Box<[usize]>, next: NfaStateId },
    Look { look: Look, next: NfaStateId },
    Match,
}

/// An immutable NFA, the input of the backtracking interpreter and of the
/// automaton compiler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nfa {
    states: Vec<NfaState>,
    start: NfaStateId,
    group_count: usize,
    pattern: String,
}

impl Nfa {
    /// Panics if a transition points outside `states` or a capture offset
    /// exceeds `2 * group_count`.
    pub fn new(states: Vec<NfaState>, start: NfaStateId, group_count: usize) -> Nfa {
        assert!(start < states.len(), "NFA start state {} out of range", start);
        assert!(group_count >= 1, "the overall match is always group 0");
        let check = |id: NfaStateId| assert!(id < states.len(), "NFA transition to {} out of range", id);
        for state in states.iter() {
            match state {
                NfaState::Char { next, .. } | NfaState::Look { next, .. } => check(*next),
                NfaState::Split { alternatives } => alternatives.iter().copied().for_each(check),
                NfaState::Save { offset, next } => {
                    assert!(*offset < group_count * 2);
                    check(*next);
                }
                NfaState::ClearGroups { offsets, next } => {
                    assert!(offsets.iter().all(|&o| o < group_count * 2));
                    check(*next);
                }
                NfaState::Match => {}
            }
        }
        Nfa { states, start, group_count, pattern: String::new() }
    }

    /// Attaches the source pattern, used only in diagnostics.
    pub fn with_pattern(mut self, pattern: &str) -> Nfa {
        self.pattern = pattern.to_string();
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    pub fn state(&self, id: NfaStateId) -> &NfaState {
        &self.states[id]
    }

    pub fn start(&self) -> NfaStateId {
        self.start
    }

    /// The number of capture groups, including group 0.
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// True if every path from the start crosses a `^` assertion before
    /// consuming input, in which case the pattern can only match at the
    /// start of the region.
    pub fn is_start_anchored(&self) -> bool {
        let mut seen = vec![false; self.states.len()];
        let mut stack = vec![self.start];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id], true) {
                continue;
            }
            match &self.states[id] {
                NfaState::Look { look: Look::Start, .. } => {}
                NfaState::Char { .. } | NfaState::Match => return false,
                NfaState::Look { look: Look::End, next }
                | NfaState::Save { next, .. }
                | NfaState::ClearGroups { next, .. } => stack.push(*next),
                NfaState::Split { alternatives } => stack.extend(alternatives.iter().copied()),
            }
        }
        true
    }
}
