//! Runs DFAs over haystacks.
//!
//! Backward-prefix states and inner-literal prefix checks are consumer-facing
//! hooks: `automaton_compiler` never emits them, and automata from other
//! producers may use them.

use crate::captures::{CaptureBuffer, CaptureTransition};
use crate::dfa::{Dfa, DfaState, Direction, InnerLiteral, StateId, StateKind};
use crate::input::{Haystack, SearchBounds};

/// The outcome of a trace-finder scan: the match start plus the index of
/// the precalculated result that describes every group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceHit {
    pub start: usize,
    pub result: u16,
}

/// Runs a [`Dfa`] over a haystack.
///
/// An executor is a borrowed view; every run owns its locals, so one DFA can
/// be executed by any number of threads at once.
#[derive(Clone, Copy, Debug)]
pub struct Executor<'a> {
    dfa: &'a Dfa,
    verify: bool,
}

/// Per-run state.
struct Locals<'h, H: ?Sized> {
    haystack: &'h H,
    bounds: SearchBounds,
    /// Forward: the search start. Backward: the lowest position a match
    /// start may have.
    logical_start: usize,
    index: usize,
    /// Forward: exclusive upper end of the scan. Backward: the lowest
    /// position the scan may reach.
    bound: usize,
    result: Option<usize>,
    trace_result: Option<u16>,
}

impl<'a> Executor<'a> {
    pub fn new(dfa: &'a Dfa) -> Executor<'a> {
        Executor { dfa, verify: false }
    }

    /// Runs both transition-matching strategies on every step and panics
    /// if they ever disagree.
    pub fn verify_matchers(mut self, yes: bool) -> Executor<'a> {
        self.verify = yes;
        self
    }

    pub fn dfa(&self) -> &'a Dfa {
        self.dfa
    }

    /// Returns the end of the leftmost match in `bounds`, or `None`.
    ///
    /// Requires a forward DFA.
    pub fn find_end<H: Haystack + ?Sized>(&self, haystack: &H, bounds: SearchBounds) -> Option<usize> {
        let mut locals = self.forward_locals(haystack, bounds);
        self.run(&mut locals, false);
        locals.result
    }

    /// Reports whether any match exists, stopping at the first final state.
    pub fn is_match<H: Haystack + ?Sized>(&self, haystack: &H, bounds: SearchBounds) -> bool {
        let mut locals = self.forward_locals(haystack, bounds);
        self.run(&mut locals, true);
        locals.result.is_some()
    }

    /// Scans backward from a known match end and returns the match start.
    ///
    /// Requires a backward DFA.
    pub fn find_start<H: Haystack + ?Sized>(
        &self,
        haystack: &H,
        end: usize,
        bounds: SearchBounds,
    ) -> Option<usize> {
        let mut locals = self.backward_locals(haystack, end, bounds);
        self.run(&mut locals, false);
        locals.result
    }

    /// Like [`find_start`](Self::find_start), for a backward trace-finder
    /// DFA.
    pub fn find_start_trace<H: Haystack + ?Sized>(
        &self,
        haystack: &H,
        end: usize,
        bounds: SearchBounds,
    ) -> Option<TraceHit> {
        let mut locals = self.backward_locals(haystack, end, bounds);
        self.run(&mut locals, false);
        match (locals.result, locals.trace_result) {
            (Some(start), Some(result)) => Some(TraceHit { start, result }),
            _ => None,
        }
    }

    /// Runs a capture-tracking DFA from `start` and returns the capture
    /// boundaries of the match, two per group.
    ///
    /// With `known_end` set the run does not search: it stops at the known
    /// end and only exports the result there. Without it every transition
    /// into a final state exports, so the last export wins.
    pub fn captures<H: Haystack + ?Sized>(
        &self,
        haystack: &H,
        bounds: SearchBounds,
        start: usize,
        known_end: Option<usize>,
    ) -> Option<Box<[Option<usize>]>> {
        let info = self.dfa.captures().expect("not a capture-tracking DFA");
        bounds.assert_valid(haystack.len());
        assert!(bounds.from <= start && start <= bounds.to, "capture start {} out of bounds", start);
        if let Some(end) = known_end {
            assert!(start <= end && end <= bounds.to, "known end {} out of bounds", end);
        }
        let mut buffer = CaptureBuffer::new(info.rows, info.group_count);
        let mut locals = Locals {
            haystack,
            bounds,
            logical_start: start,
            index: start,
            bound: known_end.unwrap_or(bounds.to),
            result: None,
            trace_result: None,
        };
        let run = CaptureRun { transitions: &info.transitions, searching: known_end.is_none(), known_end };

        let (mut current, entry) =
            self.dfa.entries().get(true, locals.index == bounds.region_from);
        if !current.is_valid() {
            return None;
        }
        if let Some(ct) = entry {
            run.take(&mut buffer, &mut locals, ct);
        }
        while current.is_valid() && locals.index < locals.bound {
            let state = self.dfa.state(current);
            let c = haystack.code_unit(locals.index);
            let Some(t) = self.dispatch(state, c) else { break };
            locals.index += 1;
            let transition = &state.transitions()[t];
            let ct = transition.capture.expect("capture-tracking transition without a program");
            if state.loop_to_self() == Some(t) {
                self.run_capture_loop(state, &run, &mut buffer, &mut locals, t, ct);
                continue;
            }
            run.take(&mut buffer, &mut locals, ct);
            current = transition.target;
        }
        locals.result.map(|_| buffer.result_boundaries())
    }

    fn forward_locals<'h, H: Haystack + ?Sized>(
        &self,
        haystack: &'h H,
        bounds: SearchBounds,
    ) -> Locals<'h, H> {
        assert_eq!(self.dfa.direction(), Direction::Forward, "forward scan on a backward DFA");
        bounds.assert_valid(haystack.len());
        Locals {
            haystack,
            bounds,
            logical_start: bounds.from,
            index: bounds.from,
            bound: bounds.to,
            result: None,
            trace_result: None,
        }
    }

    fn backward_locals<'h, H: Haystack + ?Sized>(
        &self,
        haystack: &'h H,
        end: usize,
        bounds: SearchBounds,
    ) -> Locals<'h, H> {
        assert_eq!(self.dfa.direction(), Direction::Backward, "backward scan on a forward DFA");
        bounds.assert_valid(haystack.len());
        assert!(bounds.from <= end && end <= bounds.to, "match end {} out of bounds", end);
        let bound = bounds
            .from
            .saturating_sub(self.dfa.prefix_length())
            .max(bounds.region_from);
        Locals {
            haystack,
            bounds,
            logical_start: bounds.from,
            index: end,
            bound,
            result: None,
            trace_result: None,
        }
    }

    /// Picks the entry state and positions `index` where the scan begins.
    fn enter<H: Haystack + ?Sized>(&self, locals: &mut Locals<'_, H>) -> StateId {
        let entries = self.dfa.entries();
        match self.dfa.direction() {
            Direction::Forward => {
                let prefix = self.dfa.prefix_length();
                let rewind = prefix.min(locals.logical_start - locals.bounds.region_from);
                locals.index = locals.logical_start - rewind;
                entries.get(rewind == prefix, locals.index == locals.bounds.region_from).0
            }
            Direction::Backward => entries.get(true, locals.index == locals.bounds.region_to).0,
        }
    }

    /// The plain (non-capturing) execution loop shared by both directions.
    fn run<H: Haystack + ?Sized>(&self, locals: &mut Locals<'_, H>, stop_early: bool) {
        let forward = self.dfa.direction() == Direction::Forward;
        let mut current = self.enter(locals);
        let mut in_prefix = false;
        while current.is_valid() {
            let state = self.dfa.state(current);
            self.record(state, locals);
            if stop_early && locals.result.is_some() {
                return;
            }
            if let StateKind::InnerLiteral(literal) = state.kind() {
                if !self.jump_to_literal(literal, locals) {
                    return;
                }
                current = literal.target;
                continue;
            }
            let c = if forward {
                if state.loop_to_self().is_some() {
                    if let Some(exits) = state.loop_exits() {
                        let next = locals
                            .haystack
                            .index_of_any(locals.index, locals.bound, exits)
                            .unwrap_or(locals.bound);
                        if next > locals.index {
                            locals.index = next;
                            self.record(state, locals);
                            if stop_early && locals.result.is_some() {
                                return;
                            }
                        }
                    }
                }
                if locals.index >= locals.bound {
                    return;
                }
                locals.index += 1;
                locals.haystack.code_unit(locals.index - 1)
            } else {
                if locals.index <= locals.bound {
                    return;
                }
                if !in_prefix && locals.index <= locals.logical_start {
                    if let Some(prefix) = state.backward_prefix() {
                        trace!("backward prefix: {:?} -> {:?} at {}", current, prefix, locals.index);
                        in_prefix = true;
                        current = prefix;
                        continue;
                    }
                }
                locals.index -= 1;
                locals.haystack.code_unit(locals.index)
            };
            current = match self.dispatch(state, c) {
                Some(t) => state.transitions()[t].target,
                None => return,
            };
        }
    }

    /// Records the current position if `state` accepts there.
    fn record<H: Haystack + ?Sized>(&self, state: &DfaState, locals: &mut Locals<'_, H>) {
        let at_anchor = match self.dfa.direction() {
            Direction::Forward => locals.index == locals.bounds.region_to,
            Direction::Backward => locals.index == locals.bounds.region_from,
        };
        if let StateKind::TraceFinder { anchored_result, unanchored_result } = *state.kind() {
            let anchored = anchored_result.filter(|_| at_anchor);
            let pick = match (unanchored_result, anchored) {
                (Some(u), Some(a)) => Some(u.min(a)),
                (u, a) => u.or(a),
            };
            if let Some(result) = pick {
                locals.result = Some(locals.index);
                locals.trace_result = Some(result);
            }
            return;
        }
        if state.is_final() || (at_anchor && state.is_anchored_final()) {
            locals.result = Some(locals.index);
        }
    }

    /// Moves `index` past the next acceptable occurrence of the literal.
    /// Returns false if there is none.
    fn jump_to_literal<H: Haystack + ?Sized>(
        &self,
        literal: &InnerLiteral,
        locals: &mut Locals<'_, H>,
    ) -> bool {
        let mut from = locals.index;
        loop {
            let Some(at) = locals.haystack.index_of_literal(from, locals.bound, &literal.literal)
            else {
                return false;
            };
            if let Some(ref prefix) = literal.prefix {
                let bounds = SearchBounds { from: locals.bounds.region_from, to: at, ..locals.bounds };
                let accepted = Executor::new(prefix)
                    .verify_matchers(self.verify)
                    .find_start(locals.haystack, at, bounds)
                    .is_some();
                if !accepted {
                    from = at + 1;
                    continue;
                }
            }
            locals.index = at + literal.literal.len();
            return true;
        }
    }

    /// A capture-tracking self-loop, entered right after its first
    /// iteration consumed a code unit.
    ///
    /// The loop runs in three phases: consume every further loop code unit,
    /// apply the loop program, then hand back to the caller to dispatch the
    /// code unit that left the loop. A program that reorders rows must run
    /// once per iteration. One that only sets or clears offsets leaves the
    /// same buffer after any number of runs as after the last two, so it is
    /// applied at the penultimate and the last position only.
    fn run_capture_loop<H: Haystack + ?Sized>(
        &self,
        state: &DfaState,
        run: &CaptureRun<'_>,
        buffer: &mut CaptureBuffer,
        locals: &mut Locals<'_, H>,
        t: usize,
        ct: u32,
    ) {
        if run.transitions[ct as usize].program.does_reorder_results() {
            run.take(buffer, locals, ct);
            while locals.index < locals.bound
                && self.dispatch(state, locals.haystack.code_unit(locals.index)) == Some(t)
            {
                locals.index += 1;
                run.take(buffer, locals, ct);
            }
            return;
        }
        let first = locals.index;
        match state.loop_exits() {
            Some(exits) => {
                locals.index = locals
                    .haystack
                    .index_of_any(locals.index, locals.bound, exits)
                    .unwrap_or(locals.bound);
            }
            None => {
                while locals.index < locals.bound
                    && self.dispatch(state, locals.haystack.code_unit(locals.index)) == Some(t)
                {
                    locals.index += 1;
                }
            }
        }
        let last = locals.index;
        if last > first {
            locals.index = last - 1;
            run.take(buffer, locals, ct);
            locals.index = last;
        }
        run.take(buffer, locals, ct);
    }

    #[inline]
    fn dispatch(&self, state: &DfaState, c: u32) -> Option<usize> {
        if self.verify {
            state.match_transition_checked(c)
        } else {
            state.match_transition(c)
        }
    }
}

/// Run-wide parameters of a capture-tracking execution.
struct CaptureRun<'a> {
    transitions: &'a [CaptureTransition],
    searching: bool,
    known_end: Option<usize>,
}

impl<'a> CaptureRun<'a> {
    /// Applies capture transition `ct` at the current position, exporting a
    /// result when it enters a final state and the run wants one here.
    fn take<H: Haystack + ?Sized>(&self, buffer: &mut CaptureBuffer, locals: &mut Locals<'_, H>, ct: u32) {
        let transition = &self.transitions[ct as usize];
        let index = locals.index;
        let to_final = if index == locals.bounds.region_to {
            transition.to_anchored_final.as_ref().or(transition.to_final.as_ref())
        } else {
            transition.to_final.as_ref()
        };
        match to_final {
            Some(to_final) => {
                let export = self.searching || self.known_end == Some(index);
                buffer.apply_pre_final_state(&transition.program, to_final, export, index);
                if export {
                    locals.result = Some(index);
                }
            }
            None => buffer.apply(&transition.program, index),
        }
    }
}
