//! NFA construction helpers: a patchable state builder and the reversal used
//! for backward scans.

use regex_exec::nfa::{Look, Nfa, NfaState, NfaStateId};
use regex_exec::ranges::RangeSet;

use crate::{BuildError, BuildResult};

/// The target of a state whose successor has not been connected yet.
const UNPATCHED: NfaStateId = NfaStateId::MAX;

/// A state under construction.
#[derive(Clone, Debug)]
enum State {
    Char { ranges: RangeSet, next: NfaStateId },
    /// Epsilon transitions in priority order. Connecting appends.
    Epsilon { alternatives: Vec<NfaStateId> },
    Save { offset: usize, next: NfaStateId },
    Clear { offsets: Vec<usize>, next: NfaStateId },
    Look { look: Look, next: NfaStateId },
    Match,
}

/// A piece of NFA with one entry and one dangling exit.
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    pub start: NfaStateId,
    pub end: NfaStateId,
}

/// Accumulates NFA states and patches their successors.
#[derive(Debug)]
pub struct Builder {
    states: Vec<State>,
    limit: usize,
}

impl Builder {
    pub fn new(limit: usize) -> Builder {
        Builder { states: Vec::new(), limit }
    }

    fn push(&mut self, state: State) -> BuildResult<NfaStateId> {
        if self.states.len() >= self.limit {
            return Err(BuildError::TooManyStates { limit: self.limit });
        }
        self.states.push(state);
        Ok(self.states.len() - 1)
    }

    pub fn char(&mut self, ranges: RangeSet) -> BuildResult<NfaStateId> {
        self.push(State::Char { ranges, next: UNPATCHED })
    }

    /// An epsilon state with no successors yet.
    pub fn epsilon(&mut self) -> BuildResult<NfaStateId> {
        self.push(State::Epsilon { alternatives: Vec::new() })
    }

    pub fn save(&mut self, offset: usize) -> BuildResult<NfaStateId> {
        self.push(State::Save { offset, next: UNPATCHED })
    }

    pub fn clear(&mut self, offsets: Vec<usize>) -> BuildResult<NfaStateId> {
        self.push(State::Clear { offsets, next: UNPATCHED })
    }

    pub fn look(&mut self, look: Look) -> BuildResult<NfaStateId> {
        self.push(State::Look { look, next: UNPATCHED })
    }

    pub fn match_state(&mut self) -> BuildResult<NfaStateId> {
        self.push(State::Match)
    }

    /// Connects `from` to `to`. Epsilon states gain `to` as their
    /// lowest-priority alternative so far; every other state gets its single
    /// successor patched.
    pub fn connect(&mut self, from: NfaStateId, to: NfaStateId) {
        match self.states[from] {
            State::Char { ref mut next, .. }
            | State::Save { ref mut next, .. }
            | State::Clear { ref mut next, .. }
            | State::Look { ref mut next, .. } => {
                debug_assert_eq!(*next, UNPATCHED, "state {} connected twice", from);
                *next = to;
            }
            State::Epsilon { ref mut alternatives } => alternatives.push(to),
            State::Match => {}
        }
    }

    /// Lowers the built states into an immutable NFA. Panics if a state was
    /// left unconnected.
    pub fn finish(self, start: NfaStateId, group_count: usize) -> Nfa {
        let states = self
            .states
            .into_iter()
            .map(|state| match state {
                State::Char { ranges, next } => NfaState::Char { ranges, next },
                State::Epsilon { alternatives } => {
                    NfaState::Split { alternatives: alternatives.into_boxed_slice() }
                }
                State::Save { offset, next } => NfaState::Save { offset, next },
                State::Clear { offsets, next } => {
                    NfaState::ClearGroups { offsets: offsets.into_boxed_slice(), next }
                }
                State::Look { look, next } => NfaState::Look { look, next },
                State::Match => NfaState::Match,
            })
            .collect();
        Nfa::new(states, start, group_count)
    }
}

/// Builds the NFA of the reversed language, for backward scans.
///
/// Every edge of `nfa` is flipped. State `i` of the result stands for state
/// `i` of the input and fans out, as a split, to all of its predecessors;
/// consuming edges and assertions become fresh states appended after the
/// originals. Capture offsets are dropped. Alternative order is
/// meaningless in the result, which only serves to find the leftmost start.
pub fn reverse(nfa: &Nfa) -> Nfa {
    let n = nfa.states().len();
    let mut fan_out: Vec<Vec<NfaStateId>> = vec![Vec::new(); n];
    let mut extra = Vec::new();
    let mut accepting = Vec::new();
    for (id, state) in nfa.states().iter().enumerate() {
        match *state {
            NfaState::Char { ref ranges, next } => {
                fan_out[next].push(n + extra.len());
                extra.push(NfaState::Char { ranges: ranges.clone(), next: id });
            }
            NfaState::Split { ref alternatives } => {
                for &alt in alternatives.iter() {
                    fan_out[alt].push(id);
                }
            }
            NfaState::Save { next, .. } | NfaState::ClearGroups { next, .. } => fan_out[next].push(id),
            NfaState::Look { look, next } => {
                fan_out[next].push(n + extra.len());
                extra.push(NfaState::Look { look, next: id });
            }
            NfaState::Match => accepting.push(id),
        }
    }
    fan_out[nfa.start()].push(n + extra.len());
    extra.push(NfaState::Match);
    let start = if accepting.len() == 1 {
        accepting[0]
    } else {
        extra.push(NfaState::Split { alternatives: accepting.into_boxed_slice() });
        n + extra.len() - 1
    };
    let mut states: Vec<NfaState> = fan_out
        .into_iter()
        .map(|alternatives| NfaState::Split { alternatives: alternatives.into_boxed_slice() })
        .collect();
    states.extend(extra);
    Nfa::new(states, start, 1).with_pattern(nfa.pattern())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_patches_and_lowers() {
        let mut b = Builder::new(16);
        let a = b.char(RangeSet::single(u32::from('a'))).unwrap();
        let split = b.epsilon().unwrap();
        let m = b.match_state().unwrap();
        b.connect(a, split);
        b.connect(split, a);
        b.connect(split, m);
        let nfa = b.finish(a, 1);
        assert_eq!(nfa.state(split), &NfaState::Split { alternatives: vec![a, m].into_boxed_slice() });
    }

    #[test]
    fn builder_enforces_limit() {
        let mut b = Builder::new(1);
        b.epsilon().unwrap();
        assert_eq!(b.epsilon(), Err(BuildError::TooManyStates { limit: 1 }));
    }

    #[test]
    fn reverse_flips_edges() {
        // a then b
        let states = vec![
            NfaState::Char { ranges: RangeSet::single(u32::from('a')), next: 1 },
            NfaState::Char { ranges: RangeSet::single(u32::from('b')), next: 2 },
            NfaState::Match,
        ];
        let rev = reverse(&Nfa::new(states, 0, 1));
        assert_eq!(rev.start(), 2);
        // 2 -> reads 'b' -> 1 -> reads 'a' -> 0 -> match
        let NfaState::Split { ref alternatives } = *rev.state(2) else { panic!() };
        let NfaState::Char { ref ranges, next } = *rev.state(alternatives[0]) else { panic!() };
        assert!(ranges.contains(u32::from('b')));
        assert_eq!(next, 1);
        let NfaState::Split { ref alternatives } = *rev.state(0) else { panic!() };
        assert_eq!(rev.state(alternatives[0]), &NfaState::Match);
    }
}
