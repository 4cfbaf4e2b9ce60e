//! Immutable DFA artifacts and their executor.
//!
//! A [`Dfa`] is produced by an external automaton compiler and only executed
//! here. State 0 is always the initial state; it consumes no input and only
//! selects the entry state for a search.

use std::sync::Arc;

use crate::captures::CaptureTransition;
use crate::ranges::{MatcherTree, RangeSet};

mod executor;

pub use self::executor::{Executor, TraceHit};

/// The ID of a DFA state, an index into [`Dfa::states`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    /// Marks a transition, or an initial-state entry, that leads nowhere.
    pub const NO_SUCCESSOR: StateId = StateId(u32::MAX);

    pub fn new(id: usize) -> StateId {
        let id = u32::try_from(id).expect("DFA state ID overflow");
        assert!(id != u32::MAX, "DFA state ID overflow");
        StateId(id)
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub fn is_valid(self) -> bool {
        self != StateId::NO_SUCCESSOR
    }
}

/// Flag set of a DFA state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StateFlags(u8);

impl StateFlags {
    pub const FINAL: StateFlags = StateFlags(1);
    pub const ANCHORED_FINAL: StateFlags = StateFlags(1 << 1);
    pub const BACKWARD_PREFIX: StateFlags = StateFlags(1 << 2);

    pub fn empty() -> StateFlags {
        StateFlags(0)
    }

    pub fn contains(self, other: StateFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: StateFlags) {
        self.0 |= other.0;
    }

    pub fn with(mut self, other: StateFlags) -> StateFlags {
        self.insert(other);
        self
    }
}

/// Scan direction of a DFA.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One outgoing transition of a DFA state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub ranges: RangeSet,
    pub target: StateId,
    /// Index into [`CaptureInfo::transitions`], for capture-tracking DFAs.
    pub capture: Option<u32>,
}

impl Transition {
    pub fn new(ranges: RangeSet, target: StateId) -> Transition {
        Transition { ranges, target, capture: None }
    }

    pub fn with_capture(mut self, capture: u32) -> Transition {
        self.capture = Some(capture);
        self
    }
}

/// Where a search enters the automaton.
///
/// Entries are grouped by whether the full fixed prefix could be rewound
/// before the search start (prefix unanchored) or the rewind was cut short
/// by the region start (prefix anchored), and by whether the scan begins at
/// the region boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entries {
    targets: [StateId; 4],
    captures: [Option<u32>; 4],
}

impl Entries {
    /// The same entry for every kind of search start.
    pub fn uniform(target: StateId, capture: Option<u32>) -> Entries {
        Entries { targets: [target; 4], captures: [capture; 4] }
    }

    /// Distinct entries for starts at and away from the region boundary.
    pub fn by_boundary(
        begin: (StateId, Option<u32>),
        not_begin: (StateId, Option<u32>),
    ) -> Entries {
        Entries {
            targets: [begin.0, not_begin.0, begin.0, not_begin.0],
            captures: [begin.1, not_begin.1, begin.1, not_begin.1],
        }
    }

    /// Sets the entry for one of the four start kinds.
    pub fn set(&mut self, prefix_unanchored: bool, begin: bool, entry: (StateId, Option<u32>)) {
        let slot = Entries::slot(prefix_unanchored, begin);
        self.targets[slot] = entry.0;
        self.captures[slot] = entry.1;
    }

    pub fn get(&self, prefix_unanchored: bool, begin: bool) -> (StateId, Option<u32>) {
        let slot = Entries::slot(prefix_unanchored, begin);
        (self.targets[slot], self.captures[slot])
    }

    fn slot(prefix_unanchored: bool, begin: bool) -> usize {
        usize::from(prefix_unanchored) * 2 + usize::from(!begin)
    }
}

/// A pattern-leading literal that the executor finds with a substring scan
/// instead of stepping through the automaton.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InnerLiteral {
    pub literal: Box<[u32]>,
    /// The state reached after consuming the literal from this state.
    pub target: StateId,
    /// A backward automaton that must accept, scanning left from the literal
    /// occurrence, before the occurrence is taken. `automaton_compiler`
    /// always leaves this unset.
    pub prefix: Option<Arc<Dfa>>,
}

/// Behavior beyond plain transition dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateKind {
    Plain,
    Initial(Entries),
    InnerLiteral(InnerLiteral),
    /// A backward state whose acceptance maps directly to a precalculated
    /// result.
    TraceFinder { anchored_result: Option<u16>, unanchored_result: Option<u16> },
}

/// A DFA state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DfaState {
    id: StateId,
    flags: StateFlags,
    transitions: Box<[Transition]>,
    loop_to_self: Option<u16>,
    loop_exits: Option<Box<[u32]>>,
    tree: Option<MatcherTree>,
    kind: StateKind,
    backward_prefix: Option<StateId>,
}

/// Self-loops are fast-forwarded with an index-of-any scan only when the
/// characters leaving the loop fit in this many code units.
pub const MAX_LOOP_EXITS: u64 = 4;

impl DfaState {
    /// Builds a state, detecting a loop-to-self transition and, when its
    /// complement is small, the exit set for index-of-any scanning.
    pub fn new(id: StateId, flags: StateFlags, transitions: Vec<Transition>) -> DfaState {
        let loop_to_self = transitions
            .iter()
            .position(|t| t.target == id)
            .map(|i| u16::try_from(i).expect("too many transitions"));
        let loop_exits = loop_to_self.and_then(|i| {
            let exits = transitions[usize::from(i)].ranges.complement();
            if exits.size() <= MAX_LOOP_EXITS {
                Some(exits.code_units().collect())
            } else {
                None
            }
        });
        DfaState {
            id,
            flags,
            transitions: transitions.into_boxed_slice(),
            loop_to_self,
            loop_exits,
            tree: None,
            kind: StateKind::Plain,
            backward_prefix: None,
        }
    }

    /// The initial state, always at index 0.
    pub fn initial(entries: Entries) -> DfaState {
        let mut state = DfaState::new(StateId::new(0), StateFlags::empty(), vec![]);
        state.kind = StateKind::Initial(entries);
        state
    }

    /// Enables binary-search dispatch through a merged range table.
    pub fn with_matcher_tree(mut self) -> DfaState {
        self.tree = Some(MatcherTree::from_transitions(self.transitions.iter().map(|t| &t.ranges)));
        self
    }

    pub fn with_kind(mut self, kind: StateKind) -> DfaState {
        self.kind = kind;
        self
    }

    /// Sets the state entered once a backward scan runs past the logical
    /// search start. `automaton_compiler` never sets this.
    pub fn with_backward_prefix(mut self, target: StateId) -> DfaState {
        self.flags.insert(StateFlags::BACKWARD_PREFIX);
        self.backward_prefix = Some(target);
        self
    }

    /// Disables index-of-any fast-forwarding for this state's self-loop.
    pub fn without_loop_scan(mut self) -> DfaState {
        self.loop_exits = None;
        self
    }

    /// A copy of this state under a new ID, as produced by node splitting.
    /// Transitions back to the state itself follow the copy.
    pub fn with_id(&self, id: StateId) -> DfaState {
        let mut copy = self.clone();
        copy.id = id;
        for t in copy.transitions.iter_mut() {
            if t.target == self.id {
                t.target = id;
            }
        }
        copy
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn flags(&self) -> StateFlags {
        self.flags
    }

    pub fn is_final(&self) -> bool {
        self.flags.contains(StateFlags::FINAL)
    }

    pub fn is_anchored_final(&self) -> bool {
        self.flags.contains(StateFlags::ANCHORED_FINAL)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn loop_to_self(&self) -> Option<usize> {
        self.loop_to_self.map(usize::from)
    }

    pub fn loop_exits(&self) -> Option<&[u32]> {
        self.loop_exits.as_deref()
    }

    pub fn matcher_tree(&self) -> Option<&MatcherTree> {
        self.tree.as_ref()
    }

    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    pub fn backward_prefix(&self) -> Option<StateId> {
        self.backward_prefix
    }

    /// Returns the index of the transition matching `c`.
    ///
    /// Uses the merged range table when the state has one and a linear scan
    /// otherwise. Debug builds check the two strategies against each other.
    #[inline]
    pub fn match_transition(&self, c: u32) -> Option<usize> {
        match self.tree {
            Some(ref tree) => {
                let found = tree.lookup(c);
                debug_assert_eq!(found, self.match_transition_linear(c), "state {:?}", self.id);
                found
            }
            None => self.match_transition_linear(c),
        }
    }

    /// Like [`match_transition`](Self::match_transition), but always runs
    /// both strategies and panics if they disagree.
    pub fn match_transition_checked(&self, c: u32) -> Option<usize> {
        let linear = self.match_transition_linear(c);
        if let Some(ref tree) = self.tree {
            let bisected = tree.lookup(c);
            assert_eq!(
                bisected, linear,
                "matcher tree disagrees with linear scan in state {:?} for code unit {:#x}",
                self.id, c,
            );
        }
        linear
    }

    fn match_transition_linear(&self, c: u32) -> Option<usize> {
        self.transitions.iter().position(|t| t.ranges.contains(c))
    }
}

/// Capture-group layout of a capture-tracking DFA.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureInfo {
    /// Logical rows the result buffer needs: the largest thread count of
    /// any state.
    pub rows: usize,
    pub group_count: usize,
    pub transitions: Box<[CaptureTransition]>,
}

/// An executable DFA.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dfa {
    direction: Direction,
    states: Box<[DfaState]>,
    prefix_length: usize,
    captures: Option<CaptureInfo>,
}

impl Dfa {
    /// Panics unless state 0 is the initial state, every state's ID equals
    /// its index and every transition target exists.
    pub fn new(direction: Direction, states: Vec<DfaState>) -> Dfa {
        assert!(
            matches!(states.first().map(|s| s.kind()), Some(StateKind::Initial(_))),
            "state 0 must be the initial state",
        );
        let check = |target: StateId| {
            assert!(
                !target.is_valid() || target.as_usize() < states.len(),
                "transition target {:?} out of range",
                target,
            )
        };
        for (i, state) in states.iter().enumerate() {
            assert_eq!(state.id().as_usize(), i, "state ID must match its index");
            state.transitions().iter().for_each(|t| check(t.target));
            if let Some(prefix) = state.backward_prefix() {
                check(prefix);
            }
            match state.kind() {
                StateKind::Initial(entries) => entries.targets.iter().copied().for_each(check),
                StateKind::InnerLiteral(lit) => check(lit.target),
                _ => {}
            }
        }
        Dfa { direction, states: states.into_boxed_slice(), prefix_length: 0, captures: None }
    }

    /// Sets the fixed length of the prefix a forward search rewinds over
    /// before its start.
    pub fn with_prefix_length(mut self, prefix_length: usize) -> Dfa {
        self.prefix_length = prefix_length;
        self
    }

    /// Turns this DFA into a capture-tracking one.
    pub fn with_captures(mut self, captures: CaptureInfo) -> Dfa {
        assert_eq!(self.direction, Direction::Forward, "capture tracking is forward only");
        let count = captures.transitions.len();
        for state in self.states.iter() {
            for t in state.transitions().iter() {
                assert!(t.capture.map_or(false, |c| (c as usize) < count), "missing capture transition");
            }
        }
        self.captures = Some(captures);
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    pub fn state(&self, id: StateId) -> &DfaState {
        &self.states[id.as_usize()]
    }

    pub fn prefix_length(&self) -> usize {
        self.prefix_length
    }

    pub fn captures(&self) -> Option<&CaptureInfo> {
        self.captures.as_ref()
    }

    pub(crate) fn entries(&self) -> &Entries {
        match self.states[0].kind() {
            StateKind::Initial(entries) => entries,
            _ => unreachable!("state 0 is always the initial state"),
        }
    }
}
