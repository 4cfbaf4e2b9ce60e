//! The interpreting tier: a bounded backtracker over the NFA.
//!
//! Alternatives are explored in priority order, so the first path that
//! reaches `Match` is the leftmost, highest-priority match. Every
//! `(state, position)` pair is explored at most once per search, which keeps
//! the worst case at `O(states * haystack)` instead of exponential: whether a
//! pair leads to a match never depends on the capture offsets recorded so
//! far, so a pair that failed once fails again.
//!
//! The memo takes `states * positions` bits. Above the configured limit only
//! a window of positions starting at the current start is memoized; pairs
//! outside it are explored again when reached. Memory stays bounded and
//! results are unchanged, only the time bound is lost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::MatchError;
use crate::input::{Haystack, SearchBounds};
use crate::nfa::{Look, Nfa, NfaState, NfaStateId};

#[derive(Clone, Debug)]
enum Frame {
    Explore { state: NfaStateId, at: usize },
    Restore { offset: usize, value: usize },
}

/// The default memo limit, 256 KiB.
pub const DEFAULT_VISITED_LIMIT: usize = 256 * 1024 * 8;

/// Searches an NFA by backtracking.
#[derive(Clone, Debug)]
pub struct Backtracker {
    nfa: Arc<Nfa>,
    visited_limit: usize,
}

struct Search<'a, H: ?Sized> {
    nfa: &'a Nfa,
    haystack: &'a H,
    bounds: SearchBounds,
    interrupt: Option<&'a AtomicBool>,
    visited: Vec<u64>,
    /// First memoized position.
    base: usize,
    /// Number of memoized positions.
    window: usize,
    stack: Vec<Frame>,
    slots: Vec<usize>,
}

impl Backtracker {
    pub fn new(nfa: Arc<Nfa>) -> Backtracker {
        Backtracker { nfa, visited_limit: DEFAULT_VISITED_LIMIT }
    }

    /// Caps the memo of one search at `bits`.
    pub fn visited_limit(mut self, bits: usize) -> Backtracker {
        self.visited_limit = bits;
        self
    }

    /// True if a search of `bounds` can memoize every position.
    pub fn fits(&self, bounds: SearchBounds) -> bool {
        let positions = bounds.to.saturating_sub(bounds.from) + 1;
        self.nfa.states().len().checked_mul(positions).map_or(false, |bits| bits <= self.visited_limit)
    }

    pub fn nfa(&self) -> &Arc<Nfa> {
        &self.nfa
    }

    /// Finds the leftmost match in `bounds` and returns its capture
    /// boundaries (`2 * group_count` entries, `None` for unset).
    ///
    /// `interrupt` is polled once per NFA transition.
    pub fn search<H: Haystack + ?Sized>(
        &self,
        haystack: &H,
        bounds: SearchBounds,
        interrupt: Option<&AtomicBool>,
    ) -> Result<Option<Box<[Option<usize>]>>, MatchError> {
        bounds.assert_valid(haystack.len());
        let positions = bounds.to - bounds.from + 1;
        let states = self.nfa.states().len().max(1);
        let window = if self.fits(bounds) { positions } else { (self.visited_limit / states).max(1) };
        if window < positions {
            trace!("memoizing {} of {} positions for {:?}", window, positions, self.nfa.pattern());
        }
        let mut search = Search {
            nfa: &self.nfa,
            haystack,
            bounds,
            interrupt,
            visited: vec![0; (states * window + 63) / 64],
            base: bounds.from,
            window,
            stack: Vec::new(),
            slots: vec![0; self.nfa.group_count() * 2],
        };
        let anchored = self.nfa.is_start_anchored();
        for start in bounds.from..=bounds.to {
            if anchored && start > bounds.region_from {
                break;
            }
            if start - search.base >= search.window {
                search.base = start;
                search.visited.iter_mut().for_each(|w| *w = 0);
            }
            if search.backtrack(start)? {
                return Ok(Some(search.slots.iter().map(|&v| v.checked_sub(1)).collect()));
            }
        }
        Ok(None)
    }
}

impl<'a, H: Haystack + ?Sized> Search<'a, H> {
    fn backtrack(&mut self, start: usize) -> Result<bool, MatchError> {
        self.slots.iter_mut().for_each(|v| *v = 0);
        self.stack.clear();
        self.stack.push(Frame::Explore { state: self.nfa.start(), at: start });
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Restore { offset, value } => self.slots[offset] = value,
                Frame::Explore { state, at } => {
                    if self.step(state, at)? {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    /// Follows one thread until it matches or dies, pushing lower-priority
    /// alternatives and undo records as it goes.
    fn step(&mut self, mut state: NfaStateId, mut at: usize) -> Result<bool, MatchError> {
        loop {
            if !self.mark_visited(state, at) {
                return Ok(false);
            }
            if let Some(flag) = self.interrupt {
                if flag.load(Ordering::Relaxed) {
                    return Err(MatchError::Interrupted { offset: at });
                }
            }
            match self.nfa.state(state) {
                NfaState::Char { ranges, next } => {
                    if at >= self.bounds.to || !ranges.contains(self.haystack.code_unit(at)) {
                        return Ok(false);
                    }
                    state = *next;
                    at += 1;
                }
                NfaState::Split { alternatives } => {
                    let Some((&first, rest)) = alternatives.split_first() else {
                        return Ok(false);
                    };
                    for &alt in rest.iter().rev() {
                        self.stack.push(Frame::Explore { state: alt, at });
                    }
                    state = first;
                }
                NfaState::Save { offset, next } => {
                    self.stack.push(Frame::Restore { offset: *offset, value: self.slots[*offset] });
                    self.slots[*offset] = at + 1;
                    state = *next;
                }
                NfaState::ClearGroups { offsets, next } => {
                    for &offset in offsets.iter() {
                        self.stack.push(Frame::Restore { offset, value: self.slots[offset] });
                        self.slots[offset] = 0;
                    }
                    state = *next;
                }
                NfaState::Look { look, next } => {
                    let holds = match look {
                        Look::Start => at == self.bounds.region_from,
                        Look::End => at == self.bounds.region_to,
                    };
                    if !holds {
                        return Ok(false);
                    }
                    state = *next;
                }
                NfaState::Match => return Ok(true),
            }
        }
    }

    /// Returns false if `(state, at)` was already explored. Positions
    /// outside the window always count as unexplored.
    fn mark_visited(&mut self, state: NfaStateId, at: usize) -> bool {
        let offset = match at.checked_sub(self.base) {
            Some(offset) if offset < self.window => offset,
            _ => return true,
        };
        let bit = state * self.window + offset;
        let (word, mask) = (bit / 64, 1u64 << (bit % 64));
        if self.visited[word] & mask != 0 {
            return false;
        }
        self.visited[word] |= mask;
        true
    }
}
