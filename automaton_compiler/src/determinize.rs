//! Subset construction from an NFA to the DFAs executed by `regex-exec`.
//!
//! A DFA state is the ordered list of NFA threads alive at a position, in
//! priority order. Each entry is either a thread waiting on a consuming
//! state, an accepting thread, or an accepting thread that still needs the
//! region end (it crossed a `$` on its way). Forward automata follow
//! leftmost-first semantics: an accepting thread cuts off every thread of
//! lower priority, and once some thread accepted the unanchored search
//! stops starting new threads. Backward automata look for the leftmost
//! start, so they keep every thread and order is irrelevant.
//!
//! Capture-tracking automata give every waiting thread a row of the result
//! buffer. The program of a transition moves each successor thread's row
//! into place: the first successor of a thread takes over its row through
//! a swap in the indirection table, further successors get a copy, threads
//! started fresh get a cleared row. Offsets recorded along the closure path
//! are then set or cleared.

use std::collections::HashMap;
use std::sync::Arc;

use regex_exec::captures::{CaptureTransition, FinalTransition, IndexOp, PartialTransition};
use regex_exec::dfa::{
    CaptureInfo, Dfa, DfaState, Direction, Entries, InnerLiteral, StateFlags, StateId, StateKind,
    Transition,
};
use regex_exec::input::MAX_CODE_UNIT;
use regex_exec::nfa::{Look, Nfa, NfaState, NfaStateId};
use regex_exec::ranges::RangeSet;

use crate::{BuildError, BuildResult, Config};

/// What kind of automaton to build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Mode {
    pub direction: Direction,
    /// Start new threads at every position until something matched.
    pub unanchored: bool,
    pub captures: bool,
}

impl Mode {
    pub fn forward(unanchored: bool, captures: bool) -> Mode {
        Mode { direction: Direction::Forward, unanchored, captures }
    }

    pub fn backward() -> Mode {
        Mode { direction: Direction::Backward, unanchored: false, captures: false }
    }

    fn leftmost_first(&self) -> bool {
        self.direction == Direction::Forward
    }

    /// The assertion that is decided when the scan enters the automaton.
    /// The other one can only be decided where the scan ends.
    fn entry_look(&self) -> Look {
        match self.direction {
            Direction::Forward => Look::Start,
            Direction::Backward => Look::End,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Item {
    /// A thread waiting on a consuming NFA state.
    Char(NfaStateId),
    /// A thread that accepts only where the scan may end: the region end
    /// going forward, the region start going backward.
    AnchoredMatch,
    Match,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Save(usize),
    Clear(usize),
}

/// A thread reached by an epsilon closure.
#[derive(Clone, Debug)]
struct Reached {
    item: Item,
    /// The row of the thread it descends from, `None` for a fresh thread.
    parent: Option<usize>,
    ops: Vec<Op>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Key {
    items: Vec<Item>,
    /// New threads still start at every position.
    searching: bool,
}

impl Key {
    fn is_dead(&self) -> bool {
        self.items.is_empty() && !self.searching
    }

    fn rows(&self) -> usize {
        self.items.iter().filter(|item| matches!(item, Item::Char(_))).count()
    }
}

/// One epsilon closure, shared by all threads stepping to one position so
/// that a lower-priority thread reaching an NFA state already claimed is
/// dropped.
struct Closure<'a> {
    nfa: &'a Nfa,
    entry_look: Look,
    at_entry_boundary: bool,
    track: bool,
    seen: Vec<[bool; 2]>,
    reached: Vec<Reached>,
}

impl<'a> Closure<'a> {
    fn new(nfa: &'a Nfa, mode: Mode, at_entry_boundary: bool) -> Closure<'a> {
        Closure {
            nfa,
            entry_look: mode.entry_look(),
            at_entry_boundary,
            track: mode.captures,
            seen: vec![[false; 2]; nfa.states().len()],
            reached: Vec::new(),
        }
    }

    /// Follows epsilon transitions from `from` depth first, highest
    /// priority first.
    ///
    /// Crossing the assertion that is only decided at the scan's end puts
    /// the path in pending mode: it can still accept, as an anchored match,
    /// but no longer consume.
    fn walk(&mut self, from: NfaStateId, parent: Option<usize>) {
        let mut stack = vec![(from, false, Vec::new())];
        while let Some((id, pending, mut ops)) = stack.pop() {
            if std::mem::replace(&mut self.seen[id][usize::from(pending)], true) {
                continue;
            }
            match *self.nfa.state(id) {
                NfaState::Char { .. } => {
                    if !pending {
                        self.reached.push(Reached { item: Item::Char(id), parent, ops });
                    }
                }
                NfaState::Match => {
                    let item = if pending { Item::AnchoredMatch } else { Item::Match };
                    self.reached.push(Reached { item, parent, ops });
                }
                NfaState::Split { ref alternatives } => {
                    for &alt in alternatives.iter().rev() {
                        stack.push((alt, pending, ops.clone()));
                    }
                }
                NfaState::Save { offset, next } => {
                    if self.track {
                        ops.push(Op::Save(offset));
                    }
                    stack.push((next, pending, ops));
                }
                NfaState::ClearGroups { ref offsets, next } => {
                    if self.track {
                        ops.extend(offsets.iter().map(|&o| Op::Clear(o)));
                    }
                    stack.push((next, pending, ops));
                }
                NfaState::Look { look, next } => {
                    if look != self.entry_look {
                        stack.push((next, true, ops));
                    } else if self.at_entry_boundary {
                        stack.push((next, pending, ops));
                    }
                }
            }
        }
    }

    fn has_match(&self) -> bool {
        self.reached.iter().any(|r| r.item == Item::Match)
    }
}

/// Builds one DFA from an NFA.
pub(crate) struct Determinizer<'a> {
    nfa: &'a Nfa,
    mode: Mode,
    state_limit: usize,
    tree_threshold: usize,
    literal: Option<Vec<u32>>,
    /// `keys[i]` is state `i + 1`; state 0 is the initial state.
    keys: Vec<Key>,
    ids: HashMap<Key, StateId>,
    transitions: Vec<Vec<Transition>>,
    programs: Vec<CaptureTransition>,
    program_ids: HashMap<CaptureTransition, u32>,
}

impl<'a> Determinizer<'a> {
    pub fn new(nfa: &'a Nfa, mode: Mode, config: &Config) -> Determinizer<'a> {
        Determinizer {
            nfa,
            mode,
            state_limit: config.get_dfa_state_limit(),
            tree_threshold: config.get_matcher_tree_threshold(),
            literal: None,
            keys: Vec::new(),
            ids: HashMap::new(),
            transitions: Vec::new(),
            programs: Vec::new(),
            program_ids: HashMap::new(),
        }
    }

    /// Lets the searching state skip ahead to occurrences of `literal`,
    /// which every match must start with.
    pub fn with_leading_literal(mut self, literal: Option<Vec<u32>>) -> Determinizer<'a> {
        self.literal = literal;
        self
    }

    pub fn build(mut self) -> BuildResult<Dfa> {
        if self.mode.captures && self.nfa.group_count() * 2 > usize::from(u16::MAX) {
            return Err(BuildError::TooManyCaptureSlots);
        }
        if self.mode.unanchored && self.closure(false).reached.is_empty() {
            // Only `^`-anchored threads exist: restarting can never help.
            self.mode.unanchored = false;
        }
        let begin = self.entry(true)?;
        let not_begin = self.entry(false)?;
        let literal = self.plan_literal()?;

        let mut next = 0;
        while next < self.keys.len() {
            self.expand(next)?;
            next += 1;
        }

        let mut states = vec![DfaState::initial(Entries::by_boundary(begin, not_begin))];
        for (i, key) in self.keys.iter().enumerate() {
            let id = StateId::new(i + 1);
            let mut flags = StateFlags::empty();
            if key.items.contains(&Item::Match) {
                flags.insert(StateFlags::FINAL);
            }
            if key.items.contains(&Item::AnchoredMatch) {
                flags.insert(StateFlags::ANCHORED_FINAL);
            }
            let transitions = std::mem::take(&mut self.transitions[i]);
            let range_count: usize = transitions.iter().map(|t| t.ranges.ranges().len()).sum();
            let mut state = DfaState::new(id, flags, transitions);
            if range_count >= self.tree_threshold {
                state = state.with_matcher_tree();
            }
            if let Some((from, ref literal)) = literal {
                if from == id {
                    state = state.with_kind(StateKind::InnerLiteral(literal.clone()));
                }
            }
            states.push(state);
        }
        debug!(
            "built {:?} DFA with {} states for {:?} (captures: {}, unanchored: {})",
            self.mode.direction,
            states.len(),
            self.nfa.pattern(),
            self.mode.captures,
            self.mode.unanchored,
        );
        let mut dfa = Dfa::new(self.mode.direction, states);
        if self.mode.captures {
            let rows = self.keys.iter().map(Key::rows).max().unwrap_or(0).max(1);
            dfa = dfa.with_captures(CaptureInfo {
                rows,
                group_count: self.nfa.group_count(),
                transitions: self.programs.into_boxed_slice(),
            });
        }
        Ok(dfa)
    }

    fn closure(&self, at_entry_boundary: bool) -> Closure<'a> {
        let mut closure = Closure::new(self.nfa, self.mode, at_entry_boundary);
        closure.walk(self.nfa.start(), None);
        closure
    }

    fn entry(&mut self, at_boundary: bool) -> BuildResult<(StateId, Option<u32>)> {
        let mut reached = self.closure(at_boundary).reached;
        let key = self.settle(&mut reached, self.mode.unanchored);
        if key.is_dead() {
            return Ok((StateId::NO_SUCCESSOR, None));
        }
        let target = self.intern(key)?;
        let capture = if self.mode.captures { Some(self.program(&reached, 0)?) } else { None };
        Ok((target, capture))
    }

    /// Orders and trims a successor's thread list and derives its key.
    fn settle(&self, reached: &mut Vec<Reached>, searching: bool) -> Key {
        if self.mode.leftmost_first() {
            if let Some(i) = reached.iter().position(|r| r.item == Item::Match) {
                reached.truncate(i + 1);
            }
        }
        let matched = reached.iter().any(|r| r.item == Item::Match);
        let mut items: Vec<Item> = reached.iter().map(|r| r.item).collect();
        if !self.mode.leftmost_first() {
            items.sort();
            items.dedup();
        }
        Key { items, searching: searching && !matched }
    }

    /// Computes the threads alive after `key` consumes `c`.
    fn step(&self, key: &Key, c: u32) -> Vec<Reached> {
        let mut closure = Closure::new(self.nfa, self.mode, false);
        let mut row = 0;
        for item in key.items.iter() {
            if let Item::Char(id) = *item {
                if let NfaState::Char { ref ranges, next } = *self.nfa.state(id) {
                    if ranges.contains(c) {
                        closure.walk(next, Some(row));
                    }
                }
                row += 1;
            }
        }
        if key.searching && !closure.has_match() {
            closure.walk(self.nfa.start(), None);
        }
        closure.reached
    }

    fn intern(&mut self, key: Key) -> BuildResult<StateId> {
        if let Some(&id) = self.ids.get(&key) {
            return Ok(id);
        }
        if self.keys.len() + 1 >= self.state_limit {
            return Err(BuildError::TooManyStates { limit: self.state_limit });
        }
        if self.mode.captures && key.rows() > usize::from(u16::MAX) {
            return Err(BuildError::TooManyCaptureSlots);
        }
        let id = StateId::new(self.keys.len() + 1);
        self.keys.push(key.clone());
        self.transitions.push(Vec::new());
        self.ids.insert(key, id);
        Ok(id)
    }

    /// Computes the transitions of state `keys[index]`.
    fn expand(&mut self, index: usize) -> BuildResult<()> {
        let key = self.keys[index].clone();
        let consuming: Vec<&RangeSet> = key
            .items
            .iter()
            .filter_map(|item| match *item {
                Item::Char(id) => match *self.nfa.state(id) {
                    NfaState::Char { ref ranges, .. } => Some(ranges),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        if consuming.is_empty() && !key.searching {
            return Ok(());
        }
        let intervals = alphabet(consuming);
        let mut groups: Vec<(StateId, Option<u32>, Vec<(u32, u32)>)> = Vec::new();
        let mut group_ids: HashMap<(StateId, Option<u32>), usize> = HashMap::new();
        for (lo, hi) in intervals {
            let mut reached = self.step(&key, lo);
            let successor = self.settle(&mut reached, key.searching);
            if successor.is_dead() {
                continue;
            }
            let target = self.intern(successor)?;
            let capture =
                if self.mode.captures { Some(self.program(&reached, key.rows())?) } else { None };
            let slot = *group_ids.entry((target, capture)).or_insert_with(|| {
                groups.push((target, capture, Vec::new()));
                groups.len() - 1
            });
            groups[slot].2.push((lo, hi));
        }
        self.transitions[index] = groups
            .into_iter()
            .map(|(target, capture, ranges)| {
                let t = Transition::new(RangeSet::new(ranges), target);
                match capture {
                    Some(ct) => t.with_capture(ct),
                    None => t,
                }
            })
            .collect();
        Ok(())
    }

    /// Finds the searching state that only holds freshly started threads
    /// and the state it reaches by consuming the leading literal.
    fn plan_literal(&mut self) -> BuildResult<Option<(StateId, InnerLiteral)>> {
        if self.mode.captures || !self.mode.unanchored || self.mode.direction != Direction::Forward {
            return Ok(None);
        }
        let Some(literal) = self.literal.clone() else {
            return Ok(None);
        };
        let mut reached = self.closure(false).reached;
        let mut current = self.settle(&mut reached, true);
        let searching = self.intern(current.clone())?;
        for &c in literal.iter() {
            let mut reached = self.step(&current, c);
            current = self.settle(&mut reached, current.searching);
            if current.is_dead() {
                return Ok(None);
            }
        }
        let target = self.intern(current)?;
        let literal = InnerLiteral { literal: literal.into_boxed_slice(), target, prefix: None };
        Ok(Some((searching, literal)))
    }

    /// Encodes the capture program of a transition from a state with
    /// `parent_rows` rows into the thread list `reached`.
    fn program(&mut self, reached: &[Reached], parent_rows: usize) -> BuildResult<u32> {
        let transition = encode(reached, parent_rows, self.nfa.group_count() * 2)?;
        if let Some(&id) = self.program_ids.get(&transition) {
            return Ok(id);
        }
        let id = u32::try_from(self.programs.len()).map_err(|_| BuildError::TooManyCaptureSlots)?;
        self.programs.push(transition.clone());
        self.program_ids.insert(transition, id);
        Ok(id)
    }
}

/// Splits the code unit space into maximal intervals on which every set in
/// `sets` is constant.
pub(crate) fn alphabet<'r, I: IntoIterator<Item = &'r RangeSet>>(sets: I) -> Vec<(u32, u32)> {
    let mut starts = vec![0];
    for set in sets {
        for &(lo, hi) in set.ranges() {
            starts.push(lo);
            if hi < MAX_CODE_UNIT {
                starts.push(hi + 1);
            }
        }
    }
    starts.sort_unstable();
    starts.dedup();
    starts
        .iter()
        .enumerate()
        .map(|(i, &lo)| (lo, starts.get(i + 1).map_or(MAX_CODE_UNIT, |&next| next - 1)))
        .collect()
}

fn slot(n: usize) -> BuildResult<u16> {
    u16::try_from(n).map_err(|_| BuildError::TooManyCaptureSlots)
}

/// The net effect of `ops` on a row of `width` offsets, as offsets to set
/// and offsets to clear. A fresh row clears everything it does not set.
fn net_ops(ops: &[Op], width: usize, fresh: bool) -> BuildResult<(Vec<u16>, Vec<u16>)> {
    let mut last = vec![None; width];
    for op in ops {
        match *op {
            Op::Save(o) => last[o] = Some(true),
            Op::Clear(o) => last[o] = Some(false),
        }
    }
    let (mut set, mut unset) = (Vec::new(), Vec::new());
    for (offset, op) in last.into_iter().enumerate() {
        match op {
            Some(true) => set.push(slot(offset)?),
            Some(false) => unset.push(slot(offset)?),
            None if fresh => unset.push(slot(offset)?),
            None => {}
        }
    }
    Ok((set, unset))
}

fn final_transition(reached: &Reached, width: usize) -> BuildResult<FinalTransition> {
    let (set, unset) = net_ops(&reached.ops, width, reached.parent.is_none())?;
    Ok(FinalTransition {
        pre_reorder_slot: reached.parent.map(slot).transpose()?,
        program: PartialTransition::new(
            vec![],
            vec![],
            vec![IndexOp::new(0, set)],
            vec![IndexOp::new(0, unset)],
        ),
    })
}

/// Builds the row program that turns the rows of a state with
/// `parent_rows` threads into the rows of the successor list `reached`.
fn encode(reached: &[Reached], parent_rows: usize, width: usize) -> BuildResult<CaptureTransition> {
    let rows: Vec<&Reached> =
        reached.iter().filter(|r| matches!(r.item, Item::Char(_))).collect();
    let size = parent_rows.max(rows.len());
    // position[row of the parent state] = its logical slot right now,
    // occupant[logical slot] = the parent row sitting there.
    let mut position: Vec<usize> = (0..size).collect();
    let mut occupant: Vec<usize> = (0..size).collect();
    let mut primary: HashMap<usize, usize> = HashMap::new();
    let mut swaps = Vec::new();
    for (target, r) in rows.iter().enumerate() {
        let Some(parent) = r.parent else { continue };
        if primary.contains_key(&parent) {
            continue;
        }
        primary.insert(parent, target);
        let from = position[parent];
        if from != target {
            let displaced = occupant[target];
            swaps.push((slot(target)?, slot(from)?));
            occupant.swap(target, from);
            position[displaced] = from;
            position[parent] = target;
        }
    }
    let mut copies = Vec::new();
    let mut updates = Vec::new();
    let mut clears = Vec::new();
    for (target, r) in rows.iter().enumerate() {
        if let Some(parent) = r.parent {
            let source = primary[&parent];
            if source != target {
                copies.push((slot(source)?, slot(target)?));
            }
        }
        let (set, unset) = net_ops(&r.ops, width, r.parent.is_none())?;
        updates.push(IndexOp::new(slot(target)?, set));
        clears.push(IndexOp::new(slot(target)?, unset));
    }
    let program = PartialTransition::new(swaps, copies, updates, clears);

    let to_final = match reached.iter().find(|r| r.item == Item::Match) {
        Some(r) => Some(final_transition(r, width)?),
        None => None,
    };
    let first_accepting =
        reached.iter().find(|r| matches!(r.item, Item::Match | Item::AnchoredMatch));
    let to_anchored_final = match first_accepting {
        Some(r) if r.item == Item::AnchoredMatch => Some(final_transition(r, width)?),
        _ => None,
    };
    Ok(CaptureTransition { program, to_final, to_anchored_final })
}

/// Shorthand used by the tier compiler.
pub(crate) fn build(nfa: &Nfa, mode: Mode, config: &Config) -> BuildResult<Arc<Dfa>> {
    Determinizer::new(nfa, mode, config).build().map(Arc::new)
}

#[cfg(test)]
mod tests {
    use regex_exec::backtrack::Backtracker;
    use regex_exec::dfa::Executor;
    use regex_exec::SearchBounds;

    use super::*;
    use crate::compiler::Compiler;
    use crate::nfa::reverse;

    fn nfa(pattern: &str) -> Nfa {
        let hir = Compiler::parse(pattern).unwrap();
        Compiler::new(&Config::new()).compile(&hir).unwrap().with_pattern(pattern)
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn interpret(nfa: &Nfa, hay: &[char], bounds: SearchBounds) -> Option<Vec<Option<usize>>> {
        Backtracker::new(Arc::new(nfa.clone()))
            .search(hay, bounds, None)
            .unwrap()
            .map(|g| g.into_vec())
    }

    /// Runs the lazy pipeline: forward end, backward start, anchored
    /// captures from the start.
    fn lazy(nfa: &Nfa, hay: &[char], bounds: SearchBounds) -> Option<Vec<Option<usize>>> {
        let config = Config::new();
        let forward = Determinizer::new(nfa, Mode::forward(true, false), &config).build().unwrap();
        let backward = Determinizer::new(&reverse(nfa), Mode::backward(), &config).build().unwrap();
        let captures =
            Determinizer::new(nfa, Mode::forward(false, true), &config).build().unwrap();
        let end = Executor::new(&forward).verify_matchers(true).find_end(hay, bounds)?;
        let start = Executor::new(&backward).verify_matchers(true).find_start(hay, end, bounds)?;
        Executor::new(&captures)
            .verify_matchers(true)
            .captures(hay, bounds, start, Some(end))
            .map(|g| g.into_vec())
    }

    fn eager(nfa: &Nfa, hay: &[char], bounds: SearchBounds) -> Option<Vec<Option<usize>>> {
        let dfa =
            Determinizer::new(nfa, Mode::forward(true, true), &Config::new()).build().unwrap();
        Executor::new(&dfa)
            .verify_matchers(true)
            .captures(hay, bounds, bounds.from, None)
            .map(|g| g.into_vec())
    }

    fn agree(pattern: &str, haystack: &str) {
        let _ = env_logger::builder().is_test(true).try_init();
        let nfa = nfa(pattern);
        let hay = chars(haystack);
        let bounds = SearchBounds::full(hay.len());
        let expected = interpret(&nfa, &hay, bounds);
        assert_eq!(lazy(&nfa, &hay, bounds), expected, "lazy: {:?} on {:?}", pattern, haystack);
        assert_eq!(eager(&nfa, &hay, bounds), expected, "eager: {:?} on {:?}", pattern, haystack);
    }

    #[test]
    fn alphabet_partitions_code_units() {
        let a = RangeSet::new([(u32::from('a'), u32::from('c'))]);
        let b = RangeSet::new([(u32::from('b'), u32::from('z'))]);
        let parts = alphabet([&a, &b]);
        assert_eq!(
            parts,
            vec![
                (0, u32::from('a') - 1),
                (u32::from('a'), u32::from('a')),
                (u32::from('b'), u32::from('c')),
                (u32::from('d'), u32::from('z')),
                (u32::from('z') + 1, MAX_CODE_UNIT),
            ]
        );
        assert_eq!(alphabet(std::iter::empty()), vec![(0, MAX_CODE_UNIT)]);
    }

    #[test]
    fn two_groups_track_like_the_interpreter() {
        agree("(a)(b)", "xaby");
        agree("(a+)(b?)", "caaab");
        agree("(a|ab)(c|bcd)(d*)", "abcd");
    }

    #[test]
    fn leftmost_first_priorities() {
        agree("a|ab", "xab");
        agree("(a+?)(a*)", "aaa");
        agree("(?:(a)|b)+", "abab");
        agree("(a*)b|(a+)c", "aaac");
    }

    #[test]
    fn anchors_in_every_position() {
        agree("^ab", "ab");
        agree("^ab", "cab");
        agree("(a$|b)", "bab");
        agree("(?:^|x)a", "xa");
        agree("a(?:$|b)", "aab");
        agree("$", "abc");
        agree("^$", "");
    }

    #[test]
    fn empty_matches() {
        agree("", "abc");
        agree("a*", "bbb");
        agree("(a*)", "baa");
    }

    #[test]
    fn search_windows_and_regions() {
        let nfa = nfa("(a+)$");
        let hay = chars("aaaa");
        let bounds = SearchBounds { from: 1, to: 3, region_from: 0, region_to: 3 };
        let expected = interpret(&nfa, &hay, bounds);
        assert_eq!(expected, Some(vec![Some(1), Some(3), Some(1), Some(3)]));
        assert_eq!(lazy(&nfa, &hay, bounds), expected);
        assert_eq!(eager(&nfa, &hay, bounds), expected);
    }

    #[test]
    fn anchored_pattern_has_no_unanchored_entry() {
        let nfa = nfa("^abc");
        let dfa = Determinizer::new(&nfa, Mode::forward(true, false), &Config::new()).build().unwrap();
        let hay = chars("xabc");
        assert_eq!(Executor::new(&dfa).find_end(&hay[..], SearchBounds::full(4)), None);
        let bounds = SearchBounds { from: 1, to: 4, region_from: 1, region_to: 4 };
        assert_eq!(Executor::new(&dfa).find_end(&hay[..], bounds), Some(4));
    }

    #[test]
    fn leading_literal_becomes_inner_literal_state() {
        let nfa = nfa("foo");
        let dfa = Determinizer::new(&nfa, Mode::forward(true, false), &Config::new())
            .with_leading_literal(Some("foo".chars().map(u32::from).collect()))
            .build()
            .unwrap();
        assert!(dfa.states().iter().any(|s| matches!(s.kind(), StateKind::InnerLiteral(_))));
        let hay = chars("xxfooyy");
        assert_eq!(Executor::new(&dfa).find_end(&hay[..], SearchBounds::full(7)), Some(5));
        let hay = chars("fofofoo");
        assert_eq!(Executor::new(&dfa).find_end(&hay[..], SearchBounds::full(7)), Some(7));
        let hay = chars("fofo");
        assert_eq!(Executor::new(&dfa).find_end(&hay[..], SearchBounds::full(4)), None);
    }

    #[test]
    fn state_limit_is_enforced() {
        let nfa = nfa("(a|b)*a(a|b)(a|b)(a|b)(a|b)(a|b)");
        let config = Config::new().dfa_state_limit(10);
        let err = Determinizer::new(&nfa, Mode::forward(true, false), &config).build().unwrap_err();
        assert_eq!(err, BuildError::TooManyStates { limit: 10 });
    }

    #[test]
    fn wide_states_get_matcher_trees() {
        let nfa = nfa("[a-c]|[e-g]|[i-k]|[m-o]|[q-s]");
        let config = Config::new().matcher_tree_threshold(3);
        let dfa = Determinizer::new(&nfa, Mode::forward(true, false), &config).build().unwrap();
        assert!(dfa.states().iter().any(|s| s.matcher_tree().is_some()));
        let hay = chars("zzr");
        assert_eq!(Executor::new(&dfa).verify_matchers(true).find_end(&hay[..], SearchBounds::full(3)), Some(3));
    }

    #[test]
    fn program_swaps_rows_into_successor_order() {
        // Two parent rows whose threads swap priority.
        let reached = vec![
            Reached { item: Item::Char(7), parent: Some(1), ops: vec![Op::Save(2)] },
            Reached { item: Item::Char(8), parent: Some(0), ops: vec![] },
            Reached { item: Item::Char(9), parent: Some(0), ops: vec![] },
        ];
        let ct = encode(&reached, 2, 4).unwrap();
        assert_eq!(ct.program.reorder_swaps(), &[(0, 1)]);
        assert_eq!(ct.program.array_copies(), &[(1, 2)]);
        assert_eq!(&*ct.program.index_updates()[0].offsets, &[2]);
        assert!(ct.to_final.is_none());
    }

    #[test]
    fn fresh_rows_are_cleared() {
        let reached = vec![Reached { item: Item::Char(3), parent: None, ops: vec![Op::Save(0)] }];
        let ct = encode(&reached, 0, 4).unwrap();
        assert_eq!(&*ct.program.index_updates()[0].offsets, &[0]);
        assert_eq!(&*ct.program.index_clears()[0].offsets, &[1, 2, 3]);
    }

    #[test]
    fn anchored_final_precedes_plain_final() {
        let reached = vec![
            Reached { item: Item::AnchoredMatch, parent: Some(0), ops: vec![Op::Save(1)] },
            Reached { item: Item::Match, parent: Some(1), ops: vec![Op::Save(1)] },
        ];
        let ct = encode(&reached, 2, 2).unwrap();
        assert_eq!(ct.to_anchored_final.unwrap().pre_reorder_slot, Some(0));
        assert_eq!(ct.to_final.unwrap().pre_reorder_slot, Some(1));
    }

    quickcheck::quickcheck! {
        fn dfa_tiers_agree_with_interpreter(seed: Vec<u8>) -> bool {
            const PATTERNS: &[&str] =
                &["(a|b)*c", "(a+)(b*)", "a(b|c)+?d", "(ab|a)(bc|c)?", "^(a|b)b", "(b+)$"];
            let pattern = PATTERNS[seed.first().map_or(0, |&b| b as usize) % PATTERNS.len()];
            let hay: Vec<char> = seed.iter().skip(1).map(|&b| ['a', 'b', 'c', 'd'][b as usize % 4]).collect();
            let nfa = nfa(pattern);
            let bounds = SearchBounds::full(hay.len());
            let expected = interpret(&nfa, &hay, bounds);
            lazy(&nfa, &hay, bounds) == expected && eager(&nfa, &hay, bounds) == expected
        }
    }
}
