/*!
This crate provides regular expressions whose execution strategy adapts to
how each pattern is used.

A [`Regex`] starts out in a bounded backtracking interpreter, which needs
nothing but the pattern's NFA. Once a pattern has been searched often
enough, or over enough text, it is promoted to a *lazy DFA* tier: a
forward DFA finds where the leftmost match ends, and the start and the
capture groups are only computed, by a backward DFA and an anchored
capture-tracking DFA, if the caller asks for them. If callers keep asking
for groups, the pattern is promoted once more to an *eager DFA* tier that
tracks every group in a single forward pass.

When an automaton cannot be built, for example because it would exceed the
configured state limit, the pattern simply stays in the tier below for the
rest of its life. Matching results never depend on the tier.

# Example

```
use tiered_regex::Regex;

let re = Regex::new(r"([0-9]{4})-([0-9]{2})").unwrap();
let caps = re.captures("released 2010-03").unwrap();
assert_eq!(&caps[1], "2010");
assert_eq!(&caps[2], "03");
```

# Tiers and configuration

The promotion policy and the automaton limits are set through a
[`RegexBuilder`], with an [`EngineConfig`] and a [`CompilerConfig`]
respectively. The current tier and call profile are visible through
[`Regex::stats`].

```
use tiered_regex::{EngineConfig, RegexBuilder, Tier};

let re = RegexBuilder::new("a*b")
    .engine(EngineConfig::new().lazy_promotion_calls(2))
    .build()
    .unwrap();
for _ in 0..3 {
    assert_eq!(re.find("aaab").map(|m| m.range()), Some(0..4));
}
assert_eq!(re.tier(), Tier::LazyDfa);
```

# Syntax

Patterns are parsed by `regex-syntax`, but only a subset can be executed:
literals, classes, concatenation, alternation, greedy and lazy repetition,
capture groups and the `^` and `$` anchors, which match only at the
beginning and end of the haystack. Other constructs are rejected with
[`Error::Build`].

# Other haystacks

[`Regex::search`] runs over any [`Haystack`]: byte slices, UTF-16 slices
and `char` slices are supported out of the box.

# Crate features

* **logging** (default) - Emits tier promotions, bailouts and
  regression-mode mismatches through the `log` crate.
* **perf-literal** (default) - Uses `memchr` to scan byte haystacks.
*/

#![deny(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

pub use automaton_compiler::{BuildError, Config as CompilerConfig};
pub use regex_exec::{
    Config as EngineConfig, Haystack, Match as SearchMatch, MatchError, SearchBounds, Stats, Tier,
};

pub use crate::builders::RegexBuilder;
pub use crate::error::Error;
pub use crate::regex::{Captures, Match, Matches, Regex};

mod builders;
mod error;
mod regex;
