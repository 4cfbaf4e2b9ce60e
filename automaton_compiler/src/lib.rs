/*!
Builds the automata that `regex-exec` executes.

A pattern is parsed with `regex-syntax` and its HIR is lowered by the
[`Compiler`] into a Thompson NFA with explicit capture offsets. From that
NFA a [`PatternCompiler`] builds, on demand, the DFAs of the optimizing
tiers:

* an unanchored forward DFA that finds the end of the leftmost match,
* a backward DFA, over the reversed NFA, that finds its start,
* anchored and unanchored capture-tracking DFAs whose transitions carry
  partial-transition programs,
* for patterns with a bounded match length, a trace finder that maps the
  start found by a backward scan directly to precomputed capture offsets.

Only a subset of the regex syntax is supported: literals, classes,
concatenation, alternation, greedy and lazy repetition, capture groups and
the `^`/`$` text anchors. Anything else is reported as
[`BuildError::Unsupported`].
*/

#![deny(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

#[macro_use]
mod macros;

pub mod compiler;
mod determinize;
pub mod nfa;
mod tiers;
mod trace;

pub use crate::compiler::Compiler;
pub use crate::tiers::PatternCompiler;

use regex_exec::BailoutError;

/// The result of building an automaton.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors that can occur while building automata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The pattern does not parse.
    Syntax(String),
    /// The pattern uses a feature the compiler does not support.
    Unsupported(String),
    /// An automaton grew past its configured state limit.
    TooManyStates { limit: usize },
    /// Capture tracking needs more rows or offsets than a transition
    /// program can address.
    TooManyCaptureSlots,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Syntax(msg) => write!(f, "{}", msg),
            BuildError::Unsupported(feature) => write!(f, "unsupported feature: {}", feature),
            BuildError::TooManyStates { limit } => {
                write!(f, "automaton exceeds the limit of {} states", limit)
            }
            BuildError::TooManyCaptureSlots => write!(f, "too many capture slots"),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<BuildError> for BailoutError {
    fn from(err: BuildError) -> BailoutError {
        match err {
            BuildError::TooManyStates { limit } => BailoutError::TooManyStates { limit },
            BuildError::TooManyCaptureSlots => BailoutError::TooManyCaptureSlots,
            BuildError::Syntax(msg) | BuildError::Unsupported(msg) => BailoutError::Unsupported(msg),
        }
    }
}

/// The configuration of the automaton compiler.
#[derive(Clone, Debug, Default)]
pub struct Config {
    dfa_state_limit: Option<usize>,
    nfa_size_limit: Option<usize>,
    trace_finder_paths: Option<usize>,
    matcher_tree_threshold: Option<usize>,
    inner_literal: Option<bool>,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// The most states any one DFA may have. Building a bigger one fails
    /// with [`BuildError::TooManyStates`]. Defaults to 10,000.
    pub fn dfa_state_limit(mut self, limit: usize) -> Config {
        self.dfa_state_limit = Some(limit);
        self
    }

    /// The most states the NFA may have. Defaults to 100,000.
    pub fn nfa_size_limit(mut self, limit: usize) -> Config {
        self.nfa_size_limit = Some(limit);
        self
    }

    /// The most distinct match paths a pattern may have for a trace finder
    /// to be built. Zero disables trace finders. Defaults to 32.
    pub fn trace_finder_paths(mut self, paths: usize) -> Config {
        self.trace_finder_paths = Some(paths);
        self
    }

    /// States whose transitions hold at least this many ranges dispatch
    /// through a binary-search tree instead of a linear scan. Defaults
    /// to 8.
    pub fn matcher_tree_threshold(mut self, ranges: usize) -> Config {
        self.matcher_tree_threshold = Some(ranges);
        self
    }

    /// Whether a pattern starting with a literal skips ahead with a
    /// substring search. Defaults to true.
    pub fn inner_literal(mut self, yes: bool) -> Config {
        self.inner_literal = Some(yes);
        self
    }

    pub fn get_dfa_state_limit(&self) -> usize {
        self.dfa_state_limit.unwrap_or(10_000)
    }

    pub fn get_nfa_size_limit(&self) -> usize {
        self.nfa_size_limit.unwrap_or(100_000)
    }

    pub fn get_trace_finder_paths(&self) -> usize {
        self.trace_finder_paths.unwrap_or(32)
    }

    pub fn get_matcher_tree_threshold(&self) -> usize {
        self.matcher_tree_threshold.unwrap_or(8)
    }

    pub fn get_inner_literal(&self) -> bool {
        self.inner_literal.unwrap_or(true)
    }

    /// Overwrites the settings of `self` with those set in `o`.
    pub fn overwrite(&self, o: Config) -> Config {
        Config {
            dfa_state_limit: o.dfa_state_limit.or(self.dfa_state_limit),
            nfa_size_limit: o.nfa_size_limit.or(self.nfa_size_limit),
            trace_finder_paths: o.trace_finder_paths.or(self.trace_finder_paths),
            matcher_tree_threshold: o.matcher_tree_threshold.or(self.matcher_tree_threshold),
            inner_literal: o.inner_literal.or(self.inner_literal),
        }
    }
}
