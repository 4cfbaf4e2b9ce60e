use tiered_regex::{CompilerConfig, EngineConfig, Regex, RegexBuilder, Tier};

use crate::{regex_in, TIERS};

#[test]
fn star_then_literal() -> anyhow::Result<()> {
    for tier in TIERS {
        let re = regex_in(tier, "a*b")?;
        assert_eq!(re.find("aaab").map(|m| m.range()), Some(0..4), "{:?}", tier);
    }
    Ok(())
}

#[test]
fn two_groups() -> anyhow::Result<()> {
    for tier in TIERS {
        let re = regex_in(tier, "(a)(b)")?;
        let caps = re.captures("xaby").expect("a match");
        assert_eq!(caps.get(0).map(|m| m.range()), Some(1..3), "{:?}", tier);
        assert_eq!(caps.get(1).map(|m| m.range()), Some(1..2), "{:?}", tier);
        assert_eq!(caps.get(2).map(|m| m.range()), Some(2..3), "{:?}", tier);
    }
    Ok(())
}

#[test]
fn inner_literal() -> anyhow::Result<()> {
    for tier in TIERS {
        let re = regex_in(tier, "foo")?;
        assert_eq!(re.find("xxfooyy").map(|m| m.range()), Some(2..5), "{:?}", tier);
        assert_eq!(re.find("fofofoo").map(|m| m.range()), Some(4..7), "{:?}", tier);
        assert!(re.find("fofo").is_none());
    }
    Ok(())
}

#[test]
fn oversized_dfa_stays_interpreting() -> anyhow::Result<()> {
    let pattern = "(a|b)*a(a|b)(a|b)(a|b)(a|b)(a|b)";
    let pinned = RegexBuilder::new(pattern)
        .engine(EngineConfig::new().lazy_promotion_calls(0).regression_mode(true))
        .compiler(CompilerConfig::new().dfa_state_limit(10))
        .build()?;
    let reference = crate::regex_in(Tier::Interpreting, pattern)?;
    for hay in ["xaabbbb", "bbbbbbbb", "ababab", "baaaaaab"] {
        assert_eq!(pinned.is_match(hay), reference.is_match(hay), "{:?}", hay);
        assert_eq!(pinned.find(hay), reference.find(hay), "{:?}", hay);
    }
    assert!(pinned.is_match("xaabbbb"));
    let stats = pinned.stats();
    assert_eq!(stats.tier, Tier::Interpreting);
    assert!(stats.lazy_failed);
    Ok(())
}

#[test]
fn oversized_dfa_with_small_interpreter_memo() -> anyhow::Result<()> {
    let pattern = "(a|b)*a(a|b)(a|b)(a|b)(a|b)(a|b)";
    let windowed = RegexBuilder::new(pattern)
        .engine(EngineConfig::new().lazy_promotion_calls(0).interpreter_visited_limit(64))
        .compiler(CompilerConfig::new().dfa_state_limit(10))
        .build()?;
    let reference = crate::regex_in(Tier::Interpreting, pattern)?;
    let long = "ba".repeat(200);
    for hay in ["xaabbbb", "bbbbbbbb", "baaaaaab", long.as_str()] {
        let last = |re: &Regex| re.captures(hay).and_then(|c| c.get(1).map(|m| m.range()));
        assert_eq!(last(&windowed), last(&reference), "{:?}", hay);
        assert_eq!(windowed.find(hay), reference.find(hay), "{:?}", hay);
    }
    assert_eq!(windowed.tier(), Tier::Interpreting);
    Ok(())
}

#[test]
fn anchored_start() -> anyhow::Result<()> {
    for tier in TIERS {
        let re = regex_in(tier, "^abc")?;
        assert!(re.find("xabc").is_none(), "{:?}", tier);
        assert_eq!(re.find("abc").map(|m| m.range()), Some(0..3), "{:?}", tier);
        assert_eq!(re.find("abcabc").map(|m| m.range()), Some(0..3), "{:?}", tier);
    }
    Ok(())
}
