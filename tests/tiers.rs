use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tiered_regex::{
    EngineConfig, MatchError, Regex, RegexBuilder, SearchBounds, SearchMatch, Tier,
};

use crate::regex_in;

#[test]
fn promotes_on_call_count() -> anyhow::Result<()> {
    let re = RegexBuilder::new("ab+")
        .engine(EngineConfig::new().lazy_promotion_calls(3).eager_promotion_calls(u64::MAX))
        .build()?;
    for _ in 0..3 {
        assert!(re.is_match("xabb"));
        assert_eq!(re.tier(), Tier::Interpreting);
    }
    assert!(re.is_match("xabb"));
    assert_eq!(re.tier(), Tier::LazyDfa);
    // Promotion starts a fresh profile.
    assert_eq!(re.stats().calls, 1);
    Ok(())
}

#[test]
fn promotes_on_scanned_length() -> anyhow::Result<()> {
    let re = RegexBuilder::new("z")
        .engine(EngineConfig::new().lazy_promotion_calls(u64::MAX).lazy_promotion_scanned(100))
        .build()?;
    let long = "a".repeat(100);
    assert!(!re.is_match(&long));
    assert_eq!(re.stats().scanned, 100);
    assert_eq!(re.tier(), Tier::Interpreting);
    assert!(!re.is_match("a"));
    assert_eq!(re.tier(), Tier::LazyDfa);
    Ok(())
}

#[test]
fn long_first_search_promotes_at_once() -> anyhow::Result<()> {
    let re = RegexBuilder::new("(a|b)*c")
        .engine(EngineConfig::new().lazy_promotion_calls(u64::MAX).interpreter_visited_limit(1 << 10))
        .regression_mode(true)
        .build()?;
    assert_eq!(re.find("abc").map(|m| m.range()), Some(0..3));
    assert_eq!(re.tier(), Tier::Interpreting);
    let long = format!("{}c", "ab".repeat(5_000));
    assert_eq!(re.find(&long).map(|m| m.range()), Some(0..long.len()));
    assert_eq!(re.tier(), Tier::LazyDfa);
    Ok(())
}

#[test]
fn capture_heavy_use_promotes_to_eager() -> anyhow::Result<()> {
    let engine = EngineConfig::new().lazy_promotion_calls(0).eager_promotion_calls(4);
    let groups = RegexBuilder::new("(a+)(b+)").engine(engine.clone()).build()?;
    let booleans = RegexBuilder::new("(a+)(b+)").engine(engine).build()?;
    for _ in 0..6 {
        assert_eq!(&groups.captures("xaabb").expect("a match")[2], "bb");
        assert!(booleans.is_match("xaabb"));
    }
    assert_eq!(groups.tier(), Tier::EagerDfa);
    assert_eq!(booleans.tier(), Tier::LazyDfa);
    Ok(())
}

#[test]
fn regression_mode_keeps_the_tier_sequence() -> anyhow::Result<()> {
    let hay: Vec<char> = "xaabb".chars().collect();
    let mut ends = Vec::new();
    for checked in [false, true] {
        let re = RegexBuilder::new("(a+)(b+)")
            .engine(EngineConfig::new().lazy_promotion_calls(0).eager_promotion_calls(4))
            .regression_mode(checked)
            .build()?;
        re.is_match("");
        re.reset_profile();
        for _ in 0..10 {
            assert!(re.search(&hay[..]).has_match());
        }
        ends.push(re.stats());
    }
    assert_eq!(ends[0], ends[1]);
    assert_eq!(ends[1].tier, Tier::LazyDfa);
    assert_eq!((ends[1].calls, ends[1].capture_passes), (10, 0));
    Ok(())
}

#[test]
fn trace_finder_patterns_stay_lazy() -> anyhow::Result<()> {
    let engine = EngineConfig::new().lazy_promotion_calls(0).eager_promotion_calls(4);
    let bounded = RegexBuilder::new("(a)(b)").engine(engine).build()?;
    for _ in 0..20 {
        let caps = bounded.captures("xaby").expect("a match");
        assert_eq!((&caps[1], &caps[2]), ("a", "b"));
    }
    let stats = bounded.stats();
    assert_eq!(stats.tier, Tier::LazyDfa);
    assert_eq!(stats.capture_passes, 0);
    assert!(!stats.eager_failed);
    Ok(())
}

#[test]
fn lazy_results_are_computed_once() -> anyhow::Result<()> {
    let re = regex_in(Tier::LazyDfa, "(a+)b")?;
    let hay: Vec<char> = "xaab".chars().collect();
    let m = re.search(&hay[..]);
    match m {
        SearchMatch::Lazy(ref lazy) => {
            assert_eq!(lazy.end_of_match(), 4);
            assert!(!lazy.is_resolved());
        }
        ref other => panic!("expected a lazy match, got {:?}", other),
    }
    assert_eq!(re.stats().capture_passes, 0);
    assert_eq!(m.start(0), Some(1));
    assert_eq!(m.start(1), Some(1));
    assert_eq!(m.end(1), Some(3));
    assert_eq!(m.last_group(), Some(1));
    assert_eq!(re.stats().capture_passes, 1);
    Ok(())
}

#[test]
fn boolean_results_never_resolve() -> anyhow::Result<()> {
    let re = regex_in(Tier::LazyDfa, "(a+)b")?;
    assert!(re.is_match("xaab"));
    assert_eq!(re.stats().capture_passes, 0);
    Ok(())
}

#[test]
fn boolean_match_is_compatible_with_any_match() -> anyhow::Result<()> {
    let re = regex_in(Tier::Interpreting, "(a)")?;
    let hay: Vec<char> = "ba".chars().collect();
    let full = re.search(&hay[..]);
    let boolean: SearchMatch<'_, [char]> = SearchMatch::BooleanMatch;
    let none: SearchMatch<'_, [char]> = SearchMatch::NoMatch;
    assert!(boolean.is_same_result(&full));
    assert!(!boolean.is_same_result(&none));
    assert!(!full.is_same_result(&none));
    assert!(full.is_same_result(&full));
    Ok(())
}

#[test]
#[should_panic(expected = "boolean match")]
fn full_match_is_never_compared_with_boolean() {
    let re = Regex::new("(a)").unwrap();
    let hay: Vec<char> = "ba".chars().collect();
    let full = re.search(&hay[..]);
    full.is_same_result(&SearchMatch::BooleanMatch);
}

#[test]
fn reset_profile_keeps_tier() -> anyhow::Result<()> {
    let re = regex_in(Tier::LazyDfa, "abc")?;
    re.is_match("abc");
    re.is_match("abc");
    assert_eq!(re.stats().calls, 2);
    re.reset_profile();
    let stats = re.stats();
    assert_eq!(stats.calls, 0);
    assert_eq!(stats.scanned, 0);
    assert_eq!(stats.tier, Tier::LazyDfa);
    Ok(())
}

#[test]
fn interrupted_search() -> anyhow::Result<()> {
    let flag = Arc::new(AtomicBool::new(false));
    let re = RegexBuilder::new("a+b")
        .engine(EngineConfig::new().lazy_promotion_calls(u64::MAX))
        .interrupt(Arc::clone(&flag))
        .build()?;
    let hay = b"aaaaaaaa";
    let bounds = SearchBounds::full(hay.len());
    assert!(!re.try_search(&hay[..], bounds)?.has_match());
    flag.store(true, Ordering::SeqCst);
    assert!(matches!(re.try_search(&hay[..], bounds), Err(MatchError::Interrupted { .. })));
    Ok(())
}

#[test]
fn other_haystacks() -> anyhow::Result<()> {
    for tier in crate::TIERS {
        let re = regex_in(tier, "(b+)c")?;
        let bytes = re.search(&b"abbc"[..]);
        assert_eq!((bytes.start(1), bytes.end(1)), (Some(1), Some(3)));
        let utf16: Vec<u16> = "xébc".encode_utf16().collect();
        let m = re.search(&utf16[..]);
        assert_eq!((m.start(0), m.end(0)), (Some(2), Some(4)));
    }
    Ok(())
}

#[test]
fn search_within_bounds() -> anyhow::Result<()> {
    for tier in crate::TIERS {
        let re = regex_in(tier, "a+$")?;
        let hay: Vec<char> = "aaba".chars().collect();
        let region = SearchBounds { from: 0, to: 2, region_from: 0, region_to: 2 };
        let m = re.search_with(&hay[..], region);
        assert_eq!((m.start(0), m.end(0)), (Some(0), Some(2)), "{:?}", tier);
        let m = re.search_with(&hay[..], SearchBounds::full(hay.len()));
        assert_eq!((m.start(0), m.end(0)), (Some(3), Some(4)), "{:?}", tier);
    }
    Ok(())
}

#[test]
fn shared_between_threads() -> anyhow::Result<()> {
    let re = RegexBuilder::new("(x+)y")
        .engine(EngineConfig::new().lazy_promotion_calls(5).eager_promotion_calls(5))
        .regression_mode(true)
        .build()?;
    std::thread::scope(|s| {
        for _ in 0..4 {
            let re = re.clone();
            s.spawn(move || {
                for _ in 0..50 {
                    let caps = re.captures("axxyb").expect("a match");
                    assert_eq!(&caps[1], "xx");
                }
            });
        }
    });
    assert_eq!(re.tier(), Tier::EagerDfa);
    Ok(())
}
