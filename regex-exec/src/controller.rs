//! The adaptive execution controller.
//!
//! A pattern starts out in the backtracking interpreter. Once its call
//! profile crosses the configured thresholds the controller asks a
//! [`TierCompiler`] for automata and promotes the pattern to the lazy DFA
//! tier, and later, if callers keep asking for capture groups, to the eager
//! DFA tier. A compiler bailout pins the pattern below the failed tier for
//! good.
//!
//! Matching never blocks: the active tier is read through an [`ArcSwap`].
//! The mutex is only taken to compile, so that concurrent callers crossing
//! the threshold at the same time compile once.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::backtrack::{Backtracker, DEFAULT_VISITED_LIMIT};
use crate::dfa::{Dfa, Executor};
use crate::error::{BailoutError, MatchError};
use crate::input::{Haystack, SearchBounds};
use crate::nfa::Nfa;
use crate::result::{LazyMatch, Match, PreCalculatedResult};

/// Builds the automata of the optimizing tiers for one pattern.
pub trait TierCompiler: Send + Sync {
    fn compile_lazy(&self) -> Result<LazyArtifacts, BailoutError>;

    fn compile_eager(&self) -> Result<EagerArtifacts, BailoutError>;
}

/// A backward DFA whose accepting states select a precalculated result.
#[derive(Clone, Debug)]
pub struct TraceFinder {
    pub backward: Arc<Dfa>,
    pub results: Box<[PreCalculatedResult]>,
}

/// The automata of the lazy DFA tier.
#[derive(Clone, Debug)]
pub struct LazyArtifacts {
    /// Unanchored forward DFA finding the end of the leftmost match.
    pub forward: Arc<Dfa>,
    /// Backward DFA finding the start from a known end.
    pub backward: Arc<Dfa>,
    /// Anchored forward capture-tracking DFA, absent if the pattern has no
    /// groups besides group 0.
    pub captures: Option<Arc<Dfa>>,
    /// Replaces the backward and capture passes when present.
    pub trace_finder: Option<TraceFinder>,
}

/// The automaton of the eager DFA tier.
#[derive(Clone, Debug)]
pub struct EagerArtifacts {
    /// Unanchored forward capture-tracking DFA in searching mode.
    pub captures: Arc<Dfa>,
}

/// An execution tier, in promotion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Interpreting,
    LazyDfa,
    EagerDfa,
}

/// The configuration of a [`Controller`].
#[derive(Clone, Debug, Default)]
pub struct Config {
    lazy_promotion_calls: Option<u64>,
    lazy_promotion_scanned: Option<u64>,
    eager_promotion_calls: Option<u64>,
    eager_capture_percent: Option<u64>,
    regression_mode: Option<bool>,
    interpreter_visited_limit: Option<usize>,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Promote to the lazy DFA after this many calls. Defaults to 10.
    pub fn lazy_promotion_calls(mut self, calls: u64) -> Config {
        self.lazy_promotion_calls = Some(calls);
        self
    }

    /// Promote to the lazy DFA once the interpreter has been asked to scan
    /// this many code units in total. Defaults to 100,000.
    pub fn lazy_promotion_scanned(mut self, code_units: u64) -> Config {
        self.lazy_promotion_scanned = Some(code_units);
        self
    }

    /// The number of lazy-tier calls before the eager tier is considered.
    /// Defaults to 10.
    pub fn eager_promotion_calls(mut self, calls: u64) -> Config {
        self.eager_promotion_calls = Some(calls);
        self
    }

    /// Promote to the eager DFA once at least this percentage of lazy-tier
    /// calls needed a capture-group pass. Defaults to 50.
    pub fn eager_capture_percent(mut self, percent: u64) -> Config {
        self.eager_capture_percent = Some(percent);
        self
    }

    /// Re-run every compiled tier on each call and panic if any of them
    /// disagrees. Also checks both transition-matching strategies on every
    /// step. Meant for testing the engine itself.
    pub fn regression_mode(mut self, yes: bool) -> Config {
        self.regression_mode = Some(yes);
        self
    }

    /// The most memo bits the interpreter allocates for one search.
    /// A search needing more promotes to the lazy DFA on the spot; a
    /// pattern without one memoizes a window of positions at a time.
    /// Defaults to 256 KiB.
    pub fn interpreter_visited_limit(mut self, bits: usize) -> Config {
        self.interpreter_visited_limit = Some(bits);
        self
    }

    pub fn get_lazy_promotion_calls(&self) -> u64 {
        self.lazy_promotion_calls.unwrap_or(10)
    }

    pub fn get_lazy_promotion_scanned(&self) -> u64 {
        self.lazy_promotion_scanned.unwrap_or(100_000)
    }

    pub fn get_eager_promotion_calls(&self) -> u64 {
        self.eager_promotion_calls.unwrap_or(10)
    }

    pub fn get_eager_capture_percent(&self) -> u64 {
        self.eager_capture_percent.unwrap_or(50)
    }

    pub fn get_regression_mode(&self) -> bool {
        self.regression_mode.unwrap_or(false)
    }

    pub fn get_interpreter_visited_limit(&self) -> usize {
        self.interpreter_visited_limit.unwrap_or(DEFAULT_VISITED_LIMIT)
    }

    /// Overwrites the settings of `self` with those set in `o`.
    pub fn overwrite(&self, o: Config) -> Config {
        Config {
            lazy_promotion_calls: o.lazy_promotion_calls.or(self.lazy_promotion_calls),
            lazy_promotion_scanned: o.lazy_promotion_scanned.or(self.lazy_promotion_scanned),
            eager_promotion_calls: o.eager_promotion_calls.or(self.eager_promotion_calls),
            eager_capture_percent: o.eager_capture_percent.or(self.eager_capture_percent),
            regression_mode: o.regression_mode.or(self.regression_mode),
            interpreter_visited_limit: o.interpreter_visited_limit.or(self.interpreter_visited_limit),
        }
    }
}

/// Call counters since the last promotion or reset.
#[derive(Debug, Default)]
pub struct Profile {
    pub(crate) calls: AtomicU64,
    pub(crate) scanned: AtomicU64,
    pub(crate) capture_passes: AtomicU64,
}

impl Profile {
    fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.scanned.store(0, Ordering::Relaxed);
        self.capture_passes.store(0, Ordering::Relaxed);
    }
}

/// A snapshot of a controller's tier and profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stats {
    pub tier: Tier,
    pub calls: u64,
    pub scanned: u64,
    pub capture_passes: u64,
    pub lazy_failed: bool,
    pub eager_failed: bool,
}

/// The active tier together with every automaton compiled so far.
#[derive(Debug)]
enum SearchNode {
    Interpreting,
    Lazy(Arc<LazyArtifacts>),
    Eager { lazy: Arc<LazyArtifacts>, eager: Arc<EagerArtifacts> },
}

impl SearchNode {
    fn tier(&self) -> Tier {
        match self {
            SearchNode::Interpreting => Tier::Interpreting,
            SearchNode::Lazy(_) => Tier::LazyDfa,
            SearchNode::Eager { .. } => Tier::EagerDfa,
        }
    }

    fn lazy(&self) -> Option<&Arc<LazyArtifacts>> {
        match self {
            SearchNode::Interpreting => None,
            SearchNode::Lazy(lazy) | SearchNode::Eager { lazy, .. } => Some(lazy),
        }
    }
}

/// Runs one pattern through whichever tier it has been promoted to.
pub struct Controller {
    interpreter: Backtracker,
    compiler: Arc<dyn TierCompiler>,
    config: Config,
    active: ArcSwap<SearchNode>,
    compiling: Mutex<()>,
    lazy_failed: AtomicBool,
    eager_failed: AtomicBool,
    profile: Arc<Profile>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl Controller {
    pub fn new(nfa: Arc<Nfa>, compiler: Arc<dyn TierCompiler>, config: Config) -> Controller {
        Controller {
            interpreter: Backtracker::new(nfa).visited_limit(config.get_interpreter_visited_limit()),
            compiler,
            config,
            active: ArcSwap::from_pointee(SearchNode::Interpreting),
            compiling: Mutex::new(()),
            lazy_failed: AtomicBool::new(false),
            eager_failed: AtomicBool::new(false),
            profile: Arc::new(Profile::default()),
            interrupt: None,
        }
    }

    /// Polls `flag` once per interpreter transition; raising it makes the
    /// running search fail with [`MatchError::Interrupted`].
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Controller {
        self.interrupt = Some(flag);
        self
    }

    pub fn nfa(&self) -> &Nfa {
        self.interpreter.nfa()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tier(&self) -> Tier {
        self.active.load().tier()
    }

    /// Searches `bounds` and returns the leftmost match.
    ///
    /// # Panics
    ///
    /// Panics if the search is interrupted. Use [`try_run`](Self::try_run)
    /// when an interrupt flag is installed.
    pub fn run<'h, H: Haystack + ?Sized>(&self, haystack: &'h H, bounds: SearchBounds) -> Match<'h, H> {
        match self.try_run(haystack, bounds) {
            Ok(m) => m,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_run<'h, H: Haystack + ?Sized>(
        &self,
        haystack: &'h H,
        bounds: SearchBounds,
    ) -> Result<Match<'h, H>, MatchError> {
        self.search(haystack, bounds, false)
    }

    /// Like [`try_run`](Self::try_run), but the result is at most a
    /// [`Match::BooleanMatch`].
    pub fn try_run_boolean<'h, H: Haystack + ?Sized>(
        &self,
        haystack: &'h H,
        bounds: SearchBounds,
    ) -> Result<Match<'h, H>, MatchError> {
        self.search(haystack, bounds, true)
    }

    pub fn is_match<H: Haystack + ?Sized>(&self, haystack: &H, bounds: SearchBounds) -> bool {
        match self.try_run_boolean(haystack, bounds) {
            Ok(m) => m.has_match(),
            Err(err) => panic!("{}", err),
        }
    }

    /// Clears the call profile the promotion policy looks at.
    pub fn reset_profile(&self) {
        debug!("profile reset for {:?}", self.nfa().pattern());
        self.profile.reset();
    }

    pub fn stats(&self) -> Stats {
        Stats {
            tier: self.tier(),
            calls: self.profile.calls.load(Ordering::Relaxed),
            scanned: self.profile.scanned.load(Ordering::Relaxed),
            capture_passes: self.profile.capture_passes.load(Ordering::Relaxed),
            lazy_failed: self.lazy_failed.load(Ordering::Relaxed),
            eager_failed: self.eager_failed.load(Ordering::Relaxed),
        }
    }

    fn search<'h, H: Haystack + ?Sized>(
        &self,
        haystack: &'h H,
        bounds: SearchBounds,
        boolean: bool,
    ) -> Result<Match<'h, H>, MatchError> {
        bounds.assert_valid(haystack.len());
        self.maybe_promote(bounds);
        self.profile.calls.fetch_add(1, Ordering::Relaxed);
        self.profile.scanned.fetch_add((bounds.to - bounds.from) as u64, Ordering::Relaxed);

        let node = self.active.load_full();
        trace!("searching {:?} with {:?}", bounds, node.tier());
        let verify = self.config.get_regression_mode();
        let result = self.run_node(&node, haystack, bounds, boolean, verify, Some(&self.profile))?;
        if verify {
            self.check_regression(&node, haystack, bounds, boolean, &result)?;
        }
        Ok(result)
    }

    fn run_node<'h, H: Haystack + ?Sized>(
        &self,
        node: &SearchNode,
        haystack: &'h H,
        bounds: SearchBounds,
        boolean: bool,
        verify: bool,
        profile: Option<&Arc<Profile>>,
    ) -> Result<Match<'h, H>, MatchError> {
        let interrupt = self.interrupt.as_deref();
        let m = match node {
            SearchNode::Interpreting => match self.interpreter.search(haystack, bounds, interrupt)? {
                None => Match::NoMatch,
                Some(_) if boolean => Match::BooleanMatch,
                Some(groups) => full_match(haystack, bounds, groups),
            },
            SearchNode::Lazy(lazy) | SearchNode::Eager { lazy, .. } if boolean => {
                let exec = Executor::new(&lazy.forward).verify_matchers(verify);
                if exec.is_match(haystack, bounds) {
                    Match::BooleanMatch
                } else {
                    Match::NoMatch
                }
            }
            SearchNode::Lazy(lazy) => {
                let exec = Executor::new(&lazy.forward).verify_matchers(verify);
                match exec.find_end(haystack, bounds) {
                    None => Match::NoMatch,
                    Some(end) => Match::Lazy(LazyMatch::deferred(
                        haystack,
                        bounds,
                        end,
                        Arc::clone(lazy),
                        profile.cloned(),
                        verify,
                    )),
                }
            }
            SearchNode::Eager { eager, .. } => {
                let exec = Executor::new(&eager.captures).verify_matchers(verify);
                match exec.captures(haystack, bounds, bounds.from, None) {
                    None => Match::NoMatch,
                    Some(groups) => full_match(haystack, bounds, groups),
                }
            }
        };
        Ok(m)
    }

    /// Runs every tier available in `node` and panics unless all of them
    /// agree with `result`.
    fn check_regression<H: Haystack + ?Sized>(
        &self,
        node: &SearchNode,
        haystack: &H,
        bounds: SearchBounds,
        boolean: bool,
        result: &Match<'_, H>,
    ) -> Result<(), MatchError> {
        // Resolving the caller's result here must not count as a capture
        // pass, or checking would change which tier the pattern ends in.
        let result = &result.unprofiled();
        let mut nodes = vec![SearchNode::Interpreting];
        if let Some(lazy) = node.lazy() {
            nodes.push(SearchNode::Lazy(Arc::clone(lazy)));
        }
        if let SearchNode::Eager { lazy, eager } = node {
            nodes.push(SearchNode::Eager { lazy: Arc::clone(lazy), eager: Arc::clone(eager) });
        }
        let mut candidates = Vec::with_capacity(nodes.len());
        for n in nodes.iter() {
            candidates.push((n.tier(), self.run_node(n, haystack, bounds, boolean, true, None)?));
        }
        for (tier, candidate) in candidates.iter() {
            let same = result.is_same_result(candidate) && result.last_group() == candidate.last_group();
            if same {
                continue;
            }
            let input = render(haystack);
            error!(
                "tier mismatch for pattern {:?} on input {:?} with {:?}: {:?} returned {:?}, {:?} returned {:?}",
                self.nfa().pattern(),
                input,
                bounds,
                node.tier(),
                result,
                tier,
                candidate,
            );
            for (other, m) in candidates.iter() {
                error!("  {:?}: {:?}", other, m);
            }
            panic!(
                "tier mismatch for pattern {:?} on input {:?} with {:?}: {:?} returned {:?}, {:?} returned {:?}",
                self.nfa().pattern(),
                input,
                bounds,
                node.tier(),
                result,
                tier,
                candidate,
            );
        }
        Ok(())
    }

    fn maybe_promote(&self, bounds: SearchBounds) {
        let calls = self.profile.calls.load(Ordering::Relaxed);
        match self.tier() {
            Tier::Interpreting => {
                if self.lazy_failed.load(Ordering::Relaxed) {
                    return;
                }
                let scanned = self.profile.scanned.load(Ordering::Relaxed);
                if calls >= self.config.get_lazy_promotion_calls()
                    || scanned >= self.config.get_lazy_promotion_scanned()
                {
                    self.promote(Tier::LazyDfa);
                } else if !self.interpreter.fits(bounds) {
                    debug!("{:?} exceeds the interpreter memo limit for {:?}", bounds, self.nfa().pattern());
                    self.promote(Tier::LazyDfa);
                }
            }
            Tier::LazyDfa => {
                if self.eager_failed.load(Ordering::Relaxed)
                    || calls < self.config.get_eager_promotion_calls()
                {
                    return;
                }
                let passes = self.profile.capture_passes.load(Ordering::Relaxed);
                if passes * 100 >= calls * self.config.get_eager_capture_percent() {
                    self.promote(Tier::EagerDfa);
                }
            }
            Tier::EagerDfa => {}
        }
    }

    fn promote(&self, target: Tier) {
        let _guard = match self.compiling.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let current = self.active.load_full();
        if current.tier() >= target {
            return;
        }
        let failed = match target {
            Tier::Interpreting => return,
            Tier::LazyDfa => &self.lazy_failed,
            Tier::EagerDfa => &self.eager_failed,
        };
        if failed.load(Ordering::Relaxed) {
            return;
        }
        let compiled = match current.lazy() {
            Some(lazy) if target == Tier::EagerDfa => self
                .compiler
                .compile_eager()
                .map(|eager| SearchNode::Eager { lazy: Arc::clone(lazy), eager: Arc::new(eager) }),
            _ => self.compiler.compile_lazy().map(|lazy| SearchNode::Lazy(Arc::new(lazy))),
        };
        match compiled {
            Ok(node) => {
                debug!("promoted {:?} from {:?} to {:?}", self.nfa().pattern(), current.tier(), target);
                self.active.store(Arc::new(node));
                self.profile.reset();
            }
            Err(_err) => {
                debug!("{:?} stays below {:?}: {}", self.nfa().pattern(), target, _err);
                failed.store(true, Ordering::Relaxed);
            }
        }
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("pattern", &self.nfa().pattern())
            .field("stats", &self.stats())
            .field("config", &self.config)
            .finish()
    }
}

fn full_match<'h, H: Haystack + ?Sized>(
    haystack: &'h H,
    bounds: SearchBounds,
    groups: Box<[Option<usize>]>,
) -> Match<'h, H> {
    if groups.len() == 2 {
        match (groups[0], groups[1]) {
            (Some(start), Some(end)) if start <= end => return Match::SingleRange { start, end },
            _ => panic!("invalid match boundaries {:?}", groups),
        }
    }
    Match::Lazy(LazyMatch::resolved(haystack, bounds, groups))
}

/// The haystack as text, for diagnostics.
fn render<H: Haystack + ?Sized>(haystack: &H) -> String {
    (0..haystack.len())
        .map(|i| char::from_u32(haystack.code_unit(i)).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::dfa::{Direction, DfaState, Entries, StateFlags, StateId, Transition};
    use crate::nfa::NfaState;
    use crate::ranges::RangeSet;

    fn id(n: usize) -> StateId {
        StateId::new(n)
    }

    fn ch(c: char) -> RangeSet {
        RangeSet::single(u32::from(c))
    }

    /// NFA for `ab` with group 0.
    fn ab_nfa() -> Arc<Nfa> {
        Arc::new(
            Nfa::new(
                vec![
                    NfaState::Save { offset: 0, next: 1 },
                    NfaState::Char { ranges: ch('a'), next: 2 },
                    NfaState::Char { ranges: ch('b'), next: 3 },
                    NfaState::Save { offset: 1, next: 4 },
                    NfaState::Match,
                ],
                0,
                1,
            )
            .with_pattern("ab"),
        )
    }

    /// Hand-built lazy automata for `ab`.
    fn ab_lazy() -> LazyArtifacts {
        let not_a = ch('a').complement();
        let forward = Dfa::new(
            Direction::Forward,
            vec![
                DfaState::initial(Entries::uniform(id(1), None)),
                DfaState::new(
                    id(1),
                    StateFlags::empty(),
                    vec![Transition::new(ch('a'), id(2)), Transition::new(not_a.clone(), id(1))],
                ),
                DfaState::new(
                    id(2),
                    StateFlags::empty(),
                    vec![
                        Transition::new(ch('b'), id(3)),
                        Transition::new(ch('a'), id(2)),
                        Transition::new(RangeSet::new([(u32::from('a'), u32::from('b'))]).complement(), id(1)),
                    ],
                ),
                DfaState::new(id(3), StateFlags::FINAL, vec![]),
            ],
        );
        let backward = Dfa::new(
            Direction::Backward,
            vec![
                DfaState::initial(Entries::uniform(id(1), None)),
                DfaState::new(id(1), StateFlags::empty(), vec![Transition::new(ch('b'), id(2))]),
                DfaState::new(id(2), StateFlags::empty(), vec![Transition::new(ch('a'), id(3))]),
                DfaState::new(id(3), StateFlags::FINAL, vec![]),
            ],
        );
        LazyArtifacts { forward: Arc::new(forward), backward: Arc::new(backward), captures: None, trace_finder: None }
    }

    #[derive(Default)]
    struct Counting {
        lazy_calls: AtomicUsize,
        eager_calls: AtomicUsize,
        lazy_bails: bool,
    }

    impl TierCompiler for Counting {
        fn compile_lazy(&self) -> Result<LazyArtifacts, BailoutError> {
            self.lazy_calls.fetch_add(1, Ordering::SeqCst);
            if self.lazy_bails {
                return Err(BailoutError::TooManyStates { limit: 1 });
            }
            Ok(ab_lazy())
        }

        fn compile_eager(&self) -> Result<EagerArtifacts, BailoutError> {
            self.eager_calls.fetch_add(1, Ordering::SeqCst);
            Err(BailoutError::Unsupported("eager".to_string()))
        }
    }

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn promotes_to_lazy_after_threshold() {
        init_logging();
        let compiler = Arc::new(Counting::default());
        let config = Config::new().lazy_promotion_calls(3).regression_mode(true);
        let ctl = Controller::new(ab_nfa(), compiler.clone(), config);
        let hay: &[u8] = b"xxab";
        for _ in 0..3 {
            assert_eq!(ctl.tier(), Tier::Interpreting);
            let m = ctl.run(hay, SearchBounds::full(4));
            assert_eq!((m.start(0), m.end(0)), (Some(2), Some(4)));
        }
        let m = ctl.run(hay, SearchBounds::full(4));
        assert_eq!(ctl.tier(), Tier::LazyDfa);
        assert_eq!((m.start(0), m.end(0)), (Some(2), Some(4)));
        assert!(!ctl.is_match(&b"xxa"[..], SearchBounds::full(3)));
        assert_eq!(compiler.lazy_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bailout_pins_interpreter() {
        init_logging();
        let compiler = Arc::new(Counting { lazy_bails: true, ..Counting::default() });
        let config = Config::new().lazy_promotion_calls(0).regression_mode(true);
        let ctl = Controller::new(ab_nfa(), compiler.clone(), config);
        let hay: &[u8] = b"abab";
        for _ in 0..5 {
            assert!(ctl.is_match(hay, SearchBounds::full(4)));
        }
        assert_eq!(ctl.tier(), Tier::Interpreting);
        assert!(ctl.stats().lazy_failed);
        assert_eq!(compiler.lazy_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn eager_bailout_stays_lazy() {
        init_logging();
        let compiler = Arc::new(Counting::default());
        let config = Config::new()
            .lazy_promotion_calls(0)
            .eager_promotion_calls(2)
            .eager_capture_percent(0)
            .regression_mode(true);
        let ctl = Controller::new(ab_nfa(), compiler.clone(), config);
        let hay: &[u8] = b"ab";
        for _ in 0..6 {
            let m = ctl.run(hay, SearchBounds::full(2));
            assert_eq!(m.end(0), Some(2));
        }
        let stats = ctl.stats();
        assert_eq!(stats.tier, Tier::LazyDfa);
        assert!(stats.eager_failed);
        assert_eq!(compiler.eager_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn oversized_search_promotes_at_once() {
        init_logging();
        let compiler = Arc::new(Counting::default());
        let config = Config::new().lazy_promotion_calls(100).interpreter_visited_limit(5 * 4);
        let ctl = Controller::new(ab_nfa(), compiler.clone(), config);
        let short: &[u8] = b"xab";
        assert_eq!(ctl.run(short, SearchBounds::full(3)).start(0), Some(1));
        assert_eq!(ctl.tier(), Tier::Interpreting);
        let long: &[u8] = b"xxab";
        assert_eq!(ctl.run(long, SearchBounds::full(4)).start(0), Some(2));
        assert_eq!(ctl.tier(), Tier::LazyDfa);
        assert_eq!(compiler.lazy_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn oversized_search_without_lazy_tier_still_matches() {
        init_logging();
        let compiler = Arc::new(Counting { lazy_bails: true, ..Counting::default() });
        let config = Config::new().lazy_promotion_calls(100).interpreter_visited_limit(1);
        let ctl = Controller::new(ab_nfa(), compiler.clone(), config);
        let hay: &[u8] = b"aaabxab";
        for _ in 0..3 {
            let m = ctl.run(hay, SearchBounds::full(7));
            assert_eq!((m.start(0), m.end(0)), (Some(2), Some(4)));
        }
        assert_eq!(ctl.tier(), Tier::Interpreting);
        assert!(ctl.stats().lazy_failed);
        assert_eq!(compiler.lazy_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn profile_counts_and_resets() {
        let compiler = Arc::new(Counting { lazy_bails: true, ..Counting::default() });
        let ctl = Controller::new(ab_nfa(), compiler, Config::new().lazy_promotion_calls(100));
        let hay: &[u8] = b"xxab";
        ctl.run(hay, SearchBounds::full(4));
        ctl.run(hay, SearchBounds::starting_at(4, 1));
        let stats = ctl.stats();
        assert_eq!((stats.calls, stats.scanned), (2, 7));
        ctl.reset_profile();
        assert_eq!(ctl.stats().calls, 0);
    }

    #[test]
    fn interrupt_surfaces_as_error() {
        let flag = Arc::new(AtomicBool::new(true));
        let compiler = Arc::new(Counting::default());
        let ctl = Controller::new(ab_nfa(), compiler, Config::new().lazy_promotion_calls(100))
            .with_interrupt(flag.clone());
        let hay: &[u8] = b"xxab";
        assert!(matches!(
            ctl.try_run(hay, SearchBounds::full(4)),
            Err(MatchError::Interrupted { .. })
        ));
        flag.store(false, Ordering::SeqCst);
        assert!(ctl.try_run(hay, SearchBounds::full(4)).unwrap().has_match());
    }

    /// A compiler whose forward automaton reports a wrong end.
    struct Broken;

    impl TierCompiler for Broken {
        fn compile_lazy(&self) -> Result<LazyArtifacts, BailoutError> {
            let mut art = ab_lazy();
            art.forward = Arc::new(Dfa::new(
                Direction::Forward,
                vec![
                    DfaState::initial(Entries::uniform(id(1), None)),
                    DfaState::new(id(1), StateFlags::empty(), vec![]),
                ],
            ));
            Ok(art)
        }

        fn compile_eager(&self) -> Result<EagerArtifacts, BailoutError> {
            Err(BailoutError::TooManyCaptureSlots)
        }
    }

    #[test]
    #[should_panic(expected = "tier mismatch")]
    fn regression_mode_catches_disagreement() {
        let config = Config::new().lazy_promotion_calls(0).regression_mode(true);
        let ctl = Controller::new(ab_nfa(), Arc::new(Broken), config);
        let hay: &[u8] = b"ab";
        ctl.run(hay, SearchBounds::full(2));
    }

    #[test]
    fn config_overwrite_keeps_unset_fields() {
        let base = Config::new().lazy_promotion_calls(5).regression_mode(true);
        let merged = base.overwrite(Config::new().lazy_promotion_calls(7));
        assert_eq!(merged.get_lazy_promotion_calls(), 7);
        assert!(merged.get_regression_mode());
        assert_eq!(merged.get_eager_capture_percent(), 50);
    }

    #[test]
    fn controller_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Controller>();
    }
}
