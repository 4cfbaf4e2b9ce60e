use crate::input::MAX_CODE_UNIT;

/// A set of code units stored as sorted, disjoint, non-adjacent inclusive
/// ranges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeSet {
    ranges: Box<[(u32, u32)]>,
}

impl RangeSet {
    /// Builds a canonical set from arbitrary, possibly overlapping ranges.
    /// Empty ranges (`lo > hi`) are ignored.
    pub fn new<I: IntoIterator<Item = (u32, u32)>>(ranges: I) -> RangeSet {
        let mut raw: Vec<(u32, u32)> = ranges.into_iter().filter(|&(lo, hi)| lo <= hi).collect();
        raw.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(raw.len());
        for (lo, hi) in raw {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => {
                    last.1 = last.1.max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        RangeSet { ranges: merged.into_boxed_slice() }
    }

    pub fn empty() -> RangeSet {
        RangeSet::default()
    }

    pub fn single(c: u32) -> RangeSet {
        RangeSet::new([(c, c)])
    }

    /// Every code unit up to [`MAX_CODE_UNIT`].
    pub fn any() -> RangeSet {
        RangeSet::new([(0, MAX_CODE_UNIT)])
    }

    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, c: u32) -> bool {
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if hi < c {
                    std::cmp::Ordering::Less
                } else if lo > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// The number of code units in the set.
    pub fn size(&self) -> u64 {
        self.ranges.iter().map(|&(lo, hi)| u64::from(hi - lo) + 1).sum()
    }

    /// The code units in `0..=MAX_CODE_UNIT` not in this set.
    pub fn complement(&self) -> RangeSet {
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = 0u32;
        for &(lo, hi) in self.ranges.iter() {
            if lo > next {
                out.push((next, lo - 1));
            }
            next = hi.saturating_add(1);
        }
        if next <= MAX_CODE_UNIT && self.ranges.last().map_or(true, |&(_, hi)| hi < MAX_CODE_UNIT) {
            out.push((next, MAX_CODE_UNIT));
        }
        RangeSet { ranges: out.into_boxed_slice() }
    }

    pub fn union(&self, other: &RangeSet) -> RangeSet {
        RangeSet::new(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    /// Iterates over every code unit. Only sensible for small sets.
    pub fn code_units(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|&(lo, hi)| lo..=hi)
    }
}

/// Merged range table used for binary-search transition dispatch.
///
/// `boundaries[i]` is at the same time the inclusive lower bound of interval
/// `i + 1` and the exclusive upper bound of interval `i`; interval `0` starts
/// at zero and the last interval ends after [`MAX_CODE_UNIT`]. `successors`
/// holds one transition index (or `None`) per interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatcherTree {
    boundaries: Box<[u32]>,
    successors: Box<[Option<u16>]>,
}

impl MatcherTree {
    pub fn new(boundaries: Vec<u32>, successors: Vec<Option<u16>>) -> MatcherTree {
        assert_eq!(boundaries.len() + 1, successors.len());
        assert!(boundaries.windows(2).all(|w| w[0] < w[1]));
        MatcherTree {
            boundaries: boundaries.into_boxed_slice(),
            successors: successors.into_boxed_slice(),
        }
    }

    /// Merges the range sets of a state's transitions, in declaration order,
    /// into one table. Where sets overlap the earlier transition wins, exactly
    /// as in a linear scan.
    pub fn from_transitions<'a, I>(transitions: I) -> MatcherTree
    where
        I: IntoIterator<Item = &'a RangeSet>,
    {
        let sets: Vec<&RangeSet> = transitions.into_iter().collect();
        let mut points: Vec<u64> = vec![0];
        for set in sets.iter() {
            for &(lo, hi) in set.ranges() {
                points.push(u64::from(lo));
                points.push(u64::from(hi) + 1);
            }
        }
        points.sort_unstable();
        points.dedup();

        let mut boundaries = Vec::new();
        let mut successors = vec![None];
        for point in points {
            let Ok(c) = u32::try_from(point) else { continue };
            if c > MAX_CODE_UNIT {
                continue;
            }
            let successor = sets.iter().position(|set| set.contains(c)).map(|i| {
                u16::try_from(i).expect("too many transitions for a matcher tree")
            });
            push_interval(&mut boundaries, &mut successors, c, successor);
        }
        MatcherTree::new(boundaries, successors)
    }

    pub fn boundaries(&self) -> &[u32] {
        &self.boundaries
    }

    pub fn successors(&self) -> &[Option<u16>] {
        &self.successors
    }

    /// Finds the transition index for `c` by bisecting the boundaries.
    #[inline]
    pub fn lookup(&self, c: u32) -> Option<usize> {
        let (mut from, mut to) = (0, self.boundaries.len());
        while from < to {
            let mid = from + (to - from) / 2;
            if c < self.boundaries[mid] {
                to = mid;
            } else {
                from = mid + 1;
            }
        }
        self.successors[from].map(usize::from)
    }
}

fn push_interval(
    boundaries: &mut Vec<u32>,
    successors: &mut Vec<Option<u16>>,
    start: u32,
    successor: Option<u16>,
) {
    // The last element of `successors` belongs to the interval still open.
    let last = successors.len() - 1;
    if start == 0 {
        successors[last] = successor;
    } else if successors[last] != successor {
        boundaries.push(start);
        successors.push(successor);
    }
}
