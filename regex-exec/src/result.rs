//! Match results.
//!
//! Tiers return the cheapest result that answers the call: a boolean search
//! never computes boundaries, and the lazy tier only runs its backward and
//! capture-group passes when a boundary is first asked for.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use once_cell::unsync::OnceCell;

use crate::controller::{LazyArtifacts, Profile};
use crate::dfa::Executor;
use crate::input::{Haystack, SearchBounds};

/// Group boundaries of a trace-finder result, relative to the match start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreCalculatedResult {
    boundaries: Box<[Option<usize>]>,
}

impl PreCalculatedResult {
    /// `boundaries` holds two offsets per group, group 0 first, each
    /// relative to the match start.
    pub fn new(boundaries: Vec<Option<usize>>) -> PreCalculatedResult {
        assert!(boundaries.len() >= 2 && boundaries.len() % 2 == 0);
        assert_eq!(boundaries[0], Some(0), "group 0 starts at the match start");
        PreCalculatedResult { boundaries: boundaries.into_boxed_slice() }
    }

    pub fn group_count(&self) -> usize {
        self.boundaries.len() / 2
    }

    pub fn boundaries(&self) -> &[Option<usize>] {
        &self.boundaries
    }

    /// The absolute boundaries of this result for a match at `start`.
    pub fn materialize(&self, start: usize) -> Box<[Option<usize>]> {
        self.boundaries.iter().map(|b| b.map(|off| start + off)).collect()
    }
}

/// The outcome of one search.
pub enum Match<'h, H: ?Sized> {
    NoMatch,
    /// A match exists; its boundaries were never computed.
    BooleanMatch,
    /// A match with only the overall group.
    SingleRange { start: usize, end: usize },
    /// A match whose boundaries are computed on first access.
    Lazy(LazyMatch<'h, H>),
}

/// A match whose group boundaries are resolved at most once.
pub struct LazyMatch<'h, H: ?Sized> {
    haystack: &'h H,
    bounds: SearchBounds,
    end: usize,
    source: Source,
    groups: OnceCell<Box<[Option<usize>]>>,
}

enum Source {
    Resolved,
    Deferred {
        start: Option<usize>,
        artifacts: Arc<LazyArtifacts>,
        profile: Option<Arc<Profile>>,
        verify: bool,
    },
}

impl<'h, H: Haystack + ?Sized> LazyMatch<'h, H> {
    /// A match whose end is known and whose start and groups are computed
    /// by the lazy tier's automata when first needed.
    pub fn deferred(
        haystack: &'h H,
        bounds: SearchBounds,
        end: usize,
        artifacts: Arc<LazyArtifacts>,
        profile: Option<Arc<Profile>>,
        verify: bool,
    ) -> LazyMatch<'h, H> {
        LazyMatch {
            haystack,
            bounds,
            end,
            source: Source::Deferred { start: None, artifacts, profile, verify },
            groups: OnceCell::new(),
        }
    }

    /// Like [`deferred`](Self::deferred), with the start already known.
    pub fn with_start(mut self, start: usize) -> LazyMatch<'h, H> {
        if let Source::Deferred { start: ref mut known, .. } = self.source {
            *known = Some(start);
        }
        self
    }

    /// A match whose boundaries are already known.
    pub fn resolved(haystack: &'h H, bounds: SearchBounds, groups: Box<[Option<usize>]>) -> LazyMatch<'h, H> {
        validate(&groups);
        let end = groups[1].expect("a match always has an end");
        let cell = OnceCell::new();
        let _ = cell.set(groups);
        LazyMatch { haystack, bounds, end, source: Source::Resolved, groups: cell }
    }

    pub fn end_of_match(&self) -> usize {
        self.end
    }

    /// Every group boundary, two per group.
    pub fn groups(&self) -> &[Option<usize>] {
        self.groups.get_or_init(|| {
            let groups = self.compute();
            validate(&groups);
            assert_eq!(groups[1], Some(self.end), "computed match end differs from the found end");
            groups
        })
    }

    /// True once the boundaries have been computed.
    pub fn is_resolved(&self) -> bool {
        self.groups.get().is_some()
    }

    /// A copy of this match that does not report its capture pass to the
    /// call profile. Resolving the copy leaves `self` unresolved.
    pub(crate) fn unprofiled(&self) -> LazyMatch<'h, H> {
        let source = match self.source {
            Source::Resolved => Source::Resolved,
            Source::Deferred { start, ref artifacts, verify, .. } => {
                Source::Deferred { start, artifacts: Arc::clone(artifacts), profile: None, verify }
            }
        };
        LazyMatch {
            haystack: self.haystack,
            bounds: self.bounds,
            end: self.end,
            source,
            groups: self.groups.clone(),
        }
    }

    fn compute(&self) -> Box<[Option<usize>]> {
        let Source::Deferred { start, ref artifacts, ref profile, verify } = self.source else {
            unreachable!("resolved matches are memoized at construction")
        };
        if let Some(ref finder) = artifacts.trace_finder {
            let hit = Executor::new(&finder.backward)
                .verify_matchers(verify)
                .find_start_trace(self.haystack, self.end, self.bounds)
                .expect("trace finder found no start for a known match");
            return finder.results[usize::from(hit.result)].materialize(hit.start);
        }
        let start = start.unwrap_or_else(|| {
            Executor::new(&artifacts.backward)
                .verify_matchers(verify)
                .find_start(self.haystack, self.end, self.bounds)
                .expect("backward scan found no start for a known match")
        });
        match artifacts.captures {
            Some(ref captures) => {
                if let Some(profile) = profile {
                    profile.capture_passes.fetch_add(1, Ordering::Relaxed);
                }
                Executor::new(captures)
                    .verify_matchers(verify)
                    .captures(self.haystack, self.bounds, start, Some(self.end))
                    .expect("capture pass lost a known match")
            }
            None => vec![Some(start), Some(self.end)].into_boxed_slice(),
        }
    }
}

/// Panics unless every group is either fully set or fully unset and no
/// group ends before it starts.
fn validate(groups: &[Option<usize>]) {
    assert!(groups.len() >= 2 && groups.len() % 2 == 0, "malformed boundaries {:?}", groups);
    assert!(groups[0].is_some(), "a match always has a start: {:?}", groups);
    for (g, pair) in groups.chunks(2).enumerate() {
        match (pair[0], pair[1]) {
            (Some(start), Some(end)) => {
                assert!(start <= end, "group {} ends before it starts: {:?}", g, groups)
            }
            (None, None) => {}
            _ => panic!("group {} has only one boundary: {:?}", g, groups),
        }
    }
}

impl<'h, H: Haystack + ?Sized> Match<'h, H> {
    pub fn has_match(&self) -> bool {
        !matches!(self, Match::NoMatch)
    }

    /// The start of group `g`, or `None` if there is no match or the group
    /// did not participate.
    ///
    /// Panics on a [`Match::BooleanMatch`], which has no boundaries.
    pub fn start(&self, g: usize) -> Option<usize> {
        self.boundary(2 * g)
    }

    /// The end of group `g`. See [`start`](Self::start).
    pub fn end(&self, g: usize) -> Option<usize> {
        self.boundary(2 * g + 1)
    }

    /// The number of groups, including group 0. Zero without boundaries.
    pub fn group_count(&self) -> usize {
        match self {
            Match::NoMatch | Match::BooleanMatch => 0,
            Match::SingleRange { .. } => 1,
            Match::Lazy(lazy) => lazy.groups().len() / 2,
        }
    }

    /// All boundaries, two per group, or `None` without a full result.
    pub fn boundaries(&self) -> Option<Box<[Option<usize>]>> {
        match self {
            Match::NoMatch | Match::BooleanMatch => None,
            Match::SingleRange { start, end } => Some(vec![Some(*start), Some(*end)].into_boxed_slice()),
            Match::Lazy(lazy) => Some(lazy.groups().into()),
        }
    }

    /// The participating group (other than 0) with the largest end. Ties go
    /// to the lowest group number.
    pub fn last_group(&self) -> Option<usize> {
        let boundaries = self.boundaries()?;
        let mut best: Option<(usize, usize)> = None;
        for g in 1..boundaries.len() / 2 {
            if let Some(end) = boundaries[2 * g + 1] {
                if best.map_or(true, |(_, e)| end > e) {
                    best = Some((g, end));
                }
            }
        }
        best.map(|(g, _)| g)
    }

    /// Compares two results of the same search.
    ///
    /// A [`Match::BooleanMatch`] on the left is compatible with any match on
    /// the right. The reverse comparison is a caller bug and panics: a full
    /// result can never be checked against a boolean one.
    pub fn is_same_result(&self, other: &Match<'_, H>) -> bool {
        match (self, other) {
            (Match::NoMatch, other) => !other.has_match(),
            (Match::BooleanMatch, other) => other.has_match(),
            (_, Match::BooleanMatch) => {
                panic!("cannot compare a full match result against a boolean match")
            }
            (_, Match::NoMatch) => false,
            (this, other) => this.boundaries() == other.boundaries(),
        }
    }

    /// A copy for comparisons that must not count as a caller asking for
    /// groups.
    pub(crate) fn unprofiled(&self) -> Match<'h, H> {
        match self {
            Match::NoMatch => Match::NoMatch,
            Match::BooleanMatch => Match::BooleanMatch,
            Match::SingleRange { start, end } => Match::SingleRange { start: *start, end: *end },
            Match::Lazy(lazy) => Match::Lazy(lazy.unprofiled()),
        }
    }

    fn boundary(&self, i: usize) -> Option<usize> {
        match self {
            Match::NoMatch => None,
            Match::BooleanMatch => panic!("a boolean match has no boundaries"),
            Match::SingleRange { start, end } => match i {
                0 => Some(*start),
                1 => Some(*end),
                _ => None,
            },
            Match::Lazy(lazy) => lazy.groups().get(i).copied().flatten(),
        }
    }
}

impl<'h, H: ?Sized> fmt::Debug for Match<'h, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Match::NoMatch => write!(f, "NoMatch"),
            Match::BooleanMatch => write!(f, "BooleanMatch"),
            Match::SingleRange { start, end } => write!(f, "SingleRange({}..{})", start, end),
            Match::Lazy(lazy) => fmt::Debug::fmt(lazy, f),
        }
    }
}

impl<'h, H: ?Sized> fmt::Debug for LazyMatch<'h, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.groups.get() {
            Some(groups) => write!(f, "Lazy({:?})", groups),
            None => write!(f, "Lazy(end={}, unresolved)", self.end),
        }
    }
}
