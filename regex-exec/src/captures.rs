//! Capture-group bookkeeping for DFA execution.
//!
//! A capture-tracking DFA state stands for an ordered list of NFA threads.
//! Each live thread owns one logical row of a [`CaptureBuffer`]; a row holds
//! two offsets per capture group. Taking a DFA transition rearranges the rows
//! to match the successor's thread list, which is what a
//! [`PartialTransition`] encodes.
//!
//! Rows are addressed through an indirection table (`order`). Moving a
//! thread's row to another logical position is a swap in `order`, so a
//! transition that only permutes threads touches no result data at all.
//!
//! Stored offsets are `position + 1`; zero means "unset".

use std::sync::Arc;

use once_cell::sync::Lazy;

/// Sets or clears a list of offsets within one logical row.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexOp {
    pub slot: u16,
    pub offsets: Box<[u16]>,
}

impl IndexOp {
    pub fn new(slot: u16, offsets: Vec<u16>) -> IndexOp {
        IndexOp { slot, offsets: offsets.into_boxed_slice() }
    }
}

/// The buffer-mutation program attached to one DFA transition.
///
/// Applying it runs the four instruction lists in a fixed order: reorder
/// swaps, array copies, index updates, index clears. Swaps come first
/// because they change which physical row every later instruction targets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PartialTransition {
    reorder_swaps: Box<[(u16, u16)]>,
    array_copies: Box<[(u16, u16)]>,
    index_updates: Box<[IndexOp]>,
    index_clears: Box<[IndexOp]>,
}

static NOOP: Lazy<Arc<PartialTransition>> = Lazy::new(|| Arc::new(PartialTransition::default()));

impl PartialTransition {
    /// Builds a program and interns it: an empty program always comes back
    /// as the shared no-op instance.
    ///
    /// `array_copies` holds `(source, target)` pairs of logical rows.
    pub fn new(
        reorder_swaps: Vec<(u16, u16)>,
        array_copies: Vec<(u16, u16)>,
        index_updates: Vec<IndexOp>,
        index_clears: Vec<IndexOp>,
    ) -> Arc<PartialTransition> {
        let index_updates: Vec<IndexOp> =
            index_updates.into_iter().filter(|op| !op.offsets.is_empty()).collect();
        let index_clears: Vec<IndexOp> =
            index_clears.into_iter().filter(|op| !op.offsets.is_empty()).collect();
        if reorder_swaps.is_empty()
            && array_copies.is_empty()
            && index_updates.is_empty()
            && index_clears.is_empty()
        {
            return PartialTransition::noop();
        }
        Arc::new(PartialTransition {
            reorder_swaps: reorder_swaps.into_boxed_slice(),
            array_copies: array_copies.into_boxed_slice(),
            index_updates: index_updates.into_boxed_slice(),
            index_clears: index_clears.into_boxed_slice(),
        })
    }

    /// The shared empty program.
    pub fn noop() -> Arc<PartialTransition> {
        Arc::clone(&NOOP)
    }

    pub fn is_noop(&self) -> bool {
        self.reorder_swaps.is_empty()
            && self.array_copies.is_empty()
            && self.index_updates.is_empty()
            && self.index_clears.is_empty()
    }

    /// True if applying this program moves or duplicates rows.
    ///
    /// A self-loop whose program does not reorder only sets or clears
    /// offsets to the current position, so applying it at every iteration
    /// leaves the same buffer as applying it at the last one.
    pub fn does_reorder_results(&self) -> bool {
        !self.reorder_swaps.is_empty() || !self.array_copies.is_empty()
    }

    pub fn reorder_swaps(&self) -> &[(u16, u16)] {
        &self.reorder_swaps
    }

    pub fn array_copies(&self) -> &[(u16, u16)] {
        &self.array_copies
    }

    pub fn index_updates(&self) -> &[IndexOp] {
        &self.index_updates
    }

    pub fn index_clears(&self) -> &[IndexOp] {
        &self.index_clears
    }
}

/// The part of a transition that produces a match result.
///
/// The result is derived from the row that the matching thread occupied
/// before the transition's reorder step, followed by `program`, which only
/// updates or clears offsets of the scratch result (addressed as slot 0).
/// A `pre_reorder_slot` of `None` means the thread was started fresh by the
/// unanchored search loop and had no row yet.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FinalTransition {
    pub pre_reorder_slot: Option<u16>,
    pub program: Arc<PartialTransition>,
}

/// A capture-tracking DFA transition: the row program plus its dedicated
/// transitions into a final and an anchored-final result.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CaptureTransition {
    pub program: Arc<PartialTransition>,
    pub to_final: Option<FinalTransition>,
    pub to_anchored_final: Option<FinalTransition>,
}

impl CaptureTransition {
    pub fn plain(program: Arc<PartialTransition>) -> CaptureTransition {
        CaptureTransition { program, to_final: None, to_anchored_final: None }
    }
}

/// The per-run capture-group result buffer.
#[derive(Clone, Debug)]
pub struct CaptureBuffer {
    width: usize,
    results: Vec<usize>,
    order: Vec<usize>,
    current_result: Vec<usize>,
}

impl CaptureBuffer {
    /// A buffer with `rows` logical rows for `group_count` groups (group 0,
    /// the whole match, included).
    pub fn new(rows: usize, group_count: usize) -> CaptureBuffer {
        let width = group_count * 2;
        CaptureBuffer {
            width,
            results: vec![0; rows * width],
            order: (0..rows).map(|row| row * width).collect(),
            current_result: vec![0; width],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        self.order.len()
    }

    /// Zeroes every row and the scratch result and restores the identity
    /// ordering.
    pub fn reset(&mut self) {
        self.results.iter_mut().for_each(|v| *v = 0);
        self.current_result.iter_mut().for_each(|v| *v = 0);
        let width = self.width;
        self.order.iter_mut().enumerate().for_each(|(row, o)| *o = row * width);
    }

    /// The physical offsets of the logical rows.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// The raw contents of logical row `slot`.
    pub fn row(&self, slot: usize) -> &[usize] {
        let base = self.order[slot];
        &self.results[base..base + self.width]
    }

    /// The raw scratch result.
    pub fn current_result(&self) -> &[usize] {
        &self.current_result
    }

    /// Runs `transition` at input position `index`.
    pub fn apply(&mut self, transition: &PartialTransition, index: usize) {
        for &(a, b) in transition.reorder_swaps.iter() {
            self.order.swap(usize::from(a), usize::from(b));
        }
        for &(source, target) in transition.array_copies.iter() {
            let from = self.order[usize::from(source)];
            let to = self.order[usize::from(target)];
            self.results.copy_within(from..from + self.width, to);
        }
        for op in transition.index_updates.iter() {
            let base = self.order[usize::from(op.slot)];
            for &offset in op.offsets.iter() {
                self.results[base + usize::from(offset)] = index + 1;
            }
        }
        for op in transition.index_clears.iter() {
            let base = self.order[usize::from(op.slot)];
            for &offset in op.offsets.iter() {
                self.results[base + usize::from(offset)] = 0;
            }
        }
    }

    /// Runs a transition that enters a final state.
    ///
    /// When `export` is set (searching, or the run reached its known end) the
    /// matching thread's row is first exported to the scratch result, before
    /// the row program can reorder or overwrite it, and the final-state
    /// program is applied to the scratch result. The row program runs in
    /// either case so that threads of higher priority keep going.
    pub fn apply_pre_final_state(
        &mut self,
        transition: &PartialTransition,
        to_final: &FinalTransition,
        export: bool,
        index: usize,
    ) {
        if export {
            match to_final.pre_reorder_slot {
                Some(slot) => self.export_result(usize::from(slot)),
                None => self.current_result.iter_mut().for_each(|v| *v = 0),
            }
            self.apply_final_state(&to_final.program, index);
        }
        self.apply(transition, index);
    }

    /// Applies a final-state program to the scratch result.
    pub fn apply_final_state(&mut self, program: &PartialTransition, index: usize) {
        debug_assert!(program.reorder_swaps.is_empty());
        assert!(program.array_copies.is_empty(), "final-state transitions never copy rows");
        for op in program.index_updates.iter() {
            debug_assert_eq!(op.slot, 0);
            for &offset in op.offsets.iter() {
                self.current_result[usize::from(offset)] = index + 1;
            }
        }
        for op in program.index_clears.iter() {
            debug_assert_eq!(op.slot, 0);
            for &offset in op.offsets.iter() {
                self.current_result[usize::from(offset)] = 0;
            }
        }
    }

    /// Copies logical row `slot` into the scratch result.
    pub fn export_result(&mut self, slot: usize) {
        let base = self.order[slot];
        self.current_result.copy_from_slice(&self.results[base..base + self.width]);
    }

    /// Decodes the scratch result into positions.
    pub fn result_boundaries(&self) -> Box<[Option<usize>]> {
        decode(&self.current_result)
    }
}

/// Turns stored `position + 1` offsets back into positions.
pub fn decode(raw: &[usize]) -> Box<[Option<usize>]> {
    raw.iter().map(|&v| v.checked_sub(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(rows: usize, groups: usize) -> CaptureBuffer {
        let mut buf = CaptureBuffer::new(rows, groups);
        let width = buf.width();
        for (i, v) in buf.results.iter_mut().enumerate() {
            *v = i / width * 10 + i % width + 1;
        }
        buf
    }

    #[test]
    fn noop_is_shared_and_idempotent() {
        let a = PartialTransition::new(vec![], vec![], vec![IndexOp::new(0, vec![])], vec![]);
        let b = PartialTransition::noop();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_noop());

        let mut buf = filled(3, 2);
        let before = (buf.results.clone(), buf.order.clone());
        buf.apply(&a, 42);
        buf.apply(&a, 43);
        assert_eq!(before, (buf.results.clone(), buf.order.clone()));
    }

    #[test]
    fn swaps_move_no_data() {
        let mut buf = filled(3, 1);
        let data = buf.results.clone();
        let t = PartialTransition::new(vec![(0, 2)], vec![], vec![], vec![]);
        buf.apply(&t, 0);
        assert_eq!(buf.results, data);
        assert_eq!(buf.order(), &[4, 2, 0]);
        assert_eq!(buf.row(0), &[21, 22]);
        assert_eq!(buf.row(2), &[1, 2]);
    }

    #[test]
    fn apply_order_is_swap_copy_set_clear() {
        let mut buf = filled(2, 2);
        // Swap rows, copy new row 0 over row 1, set offset 0 and clear
        // offset 3 of row 1.
        let t = PartialTransition::new(
            vec![(0, 1)],
            vec![(0, 1)],
            vec![IndexOp::new(1, vec![0, 3])],
            vec![IndexOp::new(1, vec![3])],
        );
        buf.apply(&t, 7);
        assert_eq!(buf.row(0), &[11, 12, 13, 14]);
        assert_eq!(buf.row(1), &[8, 12, 13, 0]);
    }

    #[test]
    fn final_export_reads_pre_reorder_row() {
        let mut buf = filled(2, 1);
        let program = PartialTransition::new(vec![(0, 1)], vec![(0, 1)], vec![], vec![]);
        let to_final = FinalTransition {
            pre_reorder_slot: Some(0),
            program: PartialTransition::new(vec![], vec![], vec![IndexOp::new(0, vec![1])], vec![]),
        };
        buf.apply_pre_final_state(&program, &to_final, true, 5);
        assert_eq!(buf.current_result(), &[1, 6]);
        assert_eq!(&*buf.result_boundaries(), &[Some(0), Some(5)]);
        // Without export the scratch result is untouched.
        let mut other = filled(2, 1);
        other.apply_pre_final_state(&program, &to_final, false, 5);
        assert_eq!(other.current_result(), &[0, 0]);
        assert_eq!(other.row(0), buf.row(0));
    }

    #[test]
    fn fresh_thread_final_starts_from_unset() {
        let mut buf = filled(1, 2);
        buf.export_result(0);
        let to_final = FinalTransition {
            pre_reorder_slot: None,
            program: PartialTransition::new(vec![], vec![], vec![IndexOp::new(0, vec![0, 1])], vec![]),
        };
        buf.apply_pre_final_state(&PartialTransition::noop(), &to_final, true, 3);
        assert_eq!(&*buf.result_boundaries(), &[Some(3), Some(3), None, None]);
    }

    #[test]
    #[should_panic]
    fn final_state_program_must_not_copy() {
        let mut buf = filled(2, 1);
        let bad = PartialTransition::new(vec![], vec![(0, 1)], vec![], vec![]);
        buf.apply_final_state(&bad, 0);
    }

    quickcheck::quickcheck! {
        fn swaps_are_their_own_inverse(pairs: Vec<(u8, u8)>) -> bool {
            let rows = 6u16;
            let forward: Vec<(u16, u16)> =
                pairs.iter().map(|&(a, b)| (u16::from(a) % rows, u16::from(b) % rows)).collect();
            let backward: Vec<(u16, u16)> = forward.iter().rev().copied().collect();
            let mut buf = filled(usize::from(rows), 2);
            let before = buf.order.clone();
            buf.apply(&PartialTransition::new(forward, vec![], vec![], vec![]), 0);
            buf.apply(&PartialTransition::new(backward, vec![], vec![], vec![]), 0);
            let mut sorted = buf.order.clone();
            sorted.sort_unstable();
            buf.order == before && sorted == before
        }

        fn order_stays_a_permutation(pairs: Vec<(u8, u8)>, copies: Vec<(u8, u8)>) -> bool {
            let rows = 5u16;
            let swaps = pairs.iter().map(|&(a, b)| (u16::from(a) % rows, u16::from(b) % rows)).collect();
            let copies = copies.iter().map(|&(a, b)| (u16::from(a) % rows, u16::from(b) % rows)).collect();
            let mut buf = filled(usize::from(rows), 1);
            buf.apply(&PartialTransition::new(swaps, copies, vec![], vec![]), 3);
            let mut sorted = buf.order.clone();
            sorted.sort_unstable();
            sorted == (0..usize::from(rows)).map(|r| r * 2).collect::<Vec<_>>()
        }
    }
}
