//! Trace finders: backward DFAs that identify which path through a
//! bounded-length pattern produced a match.
//!
//! A pattern without unbounded repetition has finitely many paths from the
//! NFA start to its match state. Along one path every capture offset sits at
//! a fixed distance from the match start, so the path determines the whole
//! result. Paths are enumerated in priority order; scanning backward from
//! the match end, the automaton tracks how far into each path it has read,
//! and a state in which some path was read completely selects the
//! highest-priority such path.

use std::collections::HashMap;
use std::sync::Arc;

use regex_exec::dfa::{
    Dfa, DfaState, Direction, Entries, StateFlags, StateId, StateKind, Transition,
};
use regex_exec::nfa::{Look, Nfa, NfaState, NfaStateId};
use regex_exec::ranges::RangeSet;
use regex_exec::{PreCalculatedResult, TraceFinder};

use crate::determinize::alphabet;
use crate::{BuildError, BuildResult, Config};

/// One path from the NFA start to its match state.
#[derive(Clone, Debug)]
struct Trace {
    chars: Vec<RangeSet>,
    /// Crossed `^` before consuming anything.
    anchored_start: bool,
    /// Crossed `$` after consuming everything.
    anchored_end: bool,
    result: PreCalculatedResult,
}

#[derive(Clone, Debug)]
struct Walk {
    state: NfaStateId,
    chars: Vec<RangeSet>,
    offsets: Vec<Option<usize>>,
    anchored_start: bool,
    pending_end: bool,
}

/// Enumerates the paths of `nfa` in priority order, or returns `None` once
/// there are more than `limit` of them or the walk gets too long.
fn traces(nfa: &Nfa, limit: usize) -> Option<Vec<Trace>> {
    let mut budget = limit.saturating_mul(nfa.states().len()).saturating_mul(4);
    let mut found = Vec::new();
    let mut stack = vec![Walk {
        state: nfa.start(),
        chars: Vec::new(),
        offsets: vec![None; nfa.group_count() * 2],
        anchored_start: false,
        pending_end: false,
    }];
    while let Some(mut walk) = stack.pop() {
        loop {
            budget = budget.checked_sub(1)?;
            match *nfa.state(walk.state) {
                NfaState::Char { ref ranges, next } => {
                    if walk.pending_end {
                        break;
                    }
                    walk.chars.push(ranges.clone());
                    walk.state = next;
                }
                NfaState::Split { ref alternatives } => {
                    let Some((&first, rest)) = alternatives.split_first() else {
                        break;
                    };
                    for &alt in rest.iter().rev() {
                        stack.push(Walk { state: alt, ..walk.clone() });
                    }
                    walk.state = first;
                }
                NfaState::Save { offset, next } => {
                    walk.offsets[offset] = Some(walk.chars.len());
                    walk.state = next;
                }
                NfaState::ClearGroups { ref offsets, next } => {
                    offsets.iter().for_each(|&o| walk.offsets[o] = None);
                    walk.state = next;
                }
                NfaState::Look { look: Look::Start, next } => {
                    // `^` after consuming input never holds.
                    if !walk.chars.is_empty() {
                        break;
                    }
                    walk.anchored_start = true;
                    walk.state = next;
                }
                NfaState::Look { look: Look::End, next } => {
                    walk.pending_end = true;
                    walk.state = next;
                }
                NfaState::Match => {
                    if found.len() == limit {
                        return None;
                    }
                    found.push(Trace {
                        result: PreCalculatedResult::new(walk.offsets),
                        chars: walk.chars,
                        anchored_start: walk.anchored_start,
                        anchored_end: walk.pending_end,
                    });
                    break;
                }
            }
        }
    }
    Some(found)
}

/// A set of `(trace, characters still to read)` pairs, sorted.
type Key = Vec<(u16, usize)>;

/// Builds a trace finder for `nfa`, or returns `None` if the pattern has
/// too many paths. The caller guarantees the NFA has no cycles.
pub(crate) fn build(nfa: &Nfa, config: &Config) -> BuildResult<Option<TraceFinder>> {
    let limit = config.get_trace_finder_paths().min(usize::from(u16::MAX));
    let Some(traces) = traces(nfa, limit) else {
        debug!("no trace finder for {:?}: too many paths", nfa.pattern());
        return Ok(None);
    };
    let mut builder = TraceBuilder {
        traces: &traces,
        state_limit: config.get_dfa_state_limit(),
        keys: Vec::new(),
        ids: HashMap::new(),
        transitions: Vec::new(),
    };
    let entry = |at_end: bool| -> Key {
        traces
            .iter()
            .enumerate()
            .filter(|(_, t)| at_end || !t.anchored_end)
            .map(|(i, t)| (i as u16, t.chars.len()))
            .collect()
    };
    let begin = builder.intern(entry(true))?;
    let not_begin = builder.intern(entry(false))?;
    let mut next = 0;
    while next < builder.keys.len() {
        builder.expand(next)?;
        next += 1;
    }

    let tree_threshold = config.get_matcher_tree_threshold();
    let entries = Entries::by_boundary((begin, None), (not_begin, None));
    let mut states = vec![DfaState::initial(entries)];
    for (i, key) in builder.keys.iter().enumerate() {
        let done = |anchored: bool| {
            key.iter()
                .find(|&&(t, left)| left == 0 && traces[usize::from(t)].anchored_start == anchored)
                .map(|&(t, _)| t)
        };
        let kind = StateKind::TraceFinder {
            anchored_result: done(true),
            unanchored_result: done(false),
        };
        let transitions = std::mem::take(&mut builder.transitions[i]);
        let range_count: usize = transitions.iter().map(|t| t.ranges.ranges().len()).sum();
        let mut state =
            DfaState::new(StateId::new(i + 1), StateFlags::empty(), transitions).with_kind(kind);
        if range_count >= tree_threshold {
            state = state.with_matcher_tree();
        }
        states.push(state);
    }
    debug!(
        "built trace finder with {} paths and {} states for {:?}",
        traces.len(),
        states.len(),
        nfa.pattern(),
    );
    Ok(Some(TraceFinder {
        backward: Arc::new(Dfa::new(Direction::Backward, states)),
        results: traces.into_iter().map(|t| t.result).collect(),
    }))
}

struct TraceBuilder<'t> {
    traces: &'t [Trace],
    state_limit: usize,
    /// `keys[i]` is state `i + 1`.
    keys: Vec<Key>,
    ids: HashMap<Key, StateId>,
    transitions: Vec<Vec<Transition>>,
}

impl<'t> TraceBuilder<'t> {
    fn intern(&mut self, key: Key) -> BuildResult<StateId> {
        if key.is_empty() {
            return Ok(StateId::NO_SUCCESSOR);
        }
        if let Some(&id) = self.ids.get(&key) {
            return Ok(id);
        }
        if self.keys.len() + 1 >= self.state_limit {
            return Err(BuildError::TooManyStates { limit: self.state_limit });
        }
        let id = StateId::new(self.keys.len() + 1);
        self.keys.push(key.clone());
        self.transitions.push(Vec::new());
        self.ids.insert(key, id);
        Ok(id)
    }

    /// The character set the trace `t` reads next, with `left` characters
    /// still unread, going backward.
    fn next_chars(&self, t: u16, left: usize) -> &'t RangeSet {
        &self.traces[usize::from(t)].chars[left - 1]
    }

    fn expand(&mut self, index: usize) -> BuildResult<()> {
        let key = self.keys[index].clone();
        let pending: Vec<(u16, usize)> = key.into_iter().filter(|&(_, left)| left > 0).collect();
        let intervals = alphabet(pending.iter().map(|&(t, left)| self.next_chars(t, left)));
        let mut groups: Vec<(StateId, Vec<(u32, u32)>)> = Vec::new();
        for (lo, hi) in intervals {
            let successor: Key = pending
                .iter()
                .filter(|&&(t, left)| self.next_chars(t, left).contains(lo))
                .map(|&(t, left)| (t, left - 1))
                .collect();
            let target = self.intern(successor)?;
            if !target.is_valid() {
                continue;
            }
            match groups.iter_mut().find(|(id, _)| *id == target) {
                Some((_, ranges)) => ranges.push((lo, hi)),
                None => groups.push((target, vec![(lo, hi)])),
            }
        }
        self.transitions[index] = groups
            .into_iter()
            .map(|(target, ranges)| Transition::new(RangeSet::new(ranges), target))
            .collect();
        Ok(())
    }
}
