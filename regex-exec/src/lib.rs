/*!
The execution core of a tiered regex engine.

A pattern is represented twice: as a Thompson [`Nfa`](nfa::Nfa), executed by
a bounded [backtracking interpreter](backtrack::Backtracker), and as a set
of prebuilt [DFAs](dfa::Dfa) produced by an external automaton compiler
through the [`TierCompiler`] trait. The [`Controller`] decides, per pattern
and based on how it is used, which of them answers a search:

* **Interpreting**: the NFA backtracker. Needs no compilation.
* **Lazy DFA**: a forward DFA finds the match end. The start and the
  capture groups are only computed, by a backward DFA and an anchored
  capture-tracking DFA, when the caller asks for them.
* **Eager DFA**: one unanchored capture-tracking DFA computes everything in
  a single forward pass.

Capture groups are tracked by DFAs through [partial
transitions](captures::PartialTransition): small programs attached to each
DFA transition that permute, copy, set and clear rows of a
[`CaptureBuffer`](captures::CaptureBuffer).

Text is read through the [`Haystack`] trait, implemented for `[u8]`,
`[u16]` and `[char]`.

# Crate features

* **logging** (default) - Emits diagnostics through the `log` crate.
* **perf-literal** (default) - Uses `memchr` for index-of-any and substring
  scans over byte haystacks.
*/

#![deny(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

#[macro_use]
mod macros;

pub mod backtrack;
pub mod captures;
pub mod controller;
pub mod dfa;
mod error;
pub mod input;
pub mod nfa;
pub mod ranges;
pub mod result;

pub use crate::controller::{
    Config, Controller, EagerArtifacts, LazyArtifacts, Stats, Tier, TierCompiler, TraceFinder,
};
pub use crate::error::{BailoutError, MatchError};
pub use crate::input::{Haystack, SearchBounds};
pub use crate::result::{LazyMatch, Match, PreCalculatedResult};
