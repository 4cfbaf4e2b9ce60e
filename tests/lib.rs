mod scenarios;
mod tiers;

use tiered_regex::{EngineConfig, Regex, RegexBuilder, Tier};

/// Builds `pattern` in regression mode and warms it up until it runs in
/// `tier`.
///
/// Promotion thresholds are set to zero, so every call promotes by one
/// tier; regression mode then checks each search against every tier built
/// so far.
pub(crate) fn regex_in(tier: Tier, pattern: &str) -> anyhow::Result<Regex> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = EngineConfig::new().regression_mode(true);
    engine = match tier {
        Tier::Interpreting => engine.lazy_promotion_calls(u64::MAX).lazy_promotion_scanned(u64::MAX),
        Tier::LazyDfa => engine.lazy_promotion_calls(0).eager_promotion_calls(u64::MAX),
        Tier::EagerDfa => engine.lazy_promotion_calls(0).eager_promotion_calls(0).eager_capture_percent(0),
    };
    let re = RegexBuilder::new(pattern).engine(engine).build()?;
    for _ in 0..2 {
        if re.tier() == tier {
            break;
        }
        re.is_match("");
    }
    anyhow::ensure!(re.tier() == tier, "{:?} stuck in {:?}: {:?}", pattern, re.tier(), re.stats());
    re.reset_profile();
    Ok(re)
}

pub(crate) const TIERS: [Tier; 3] = [Tier::Interpreting, Tier::LazyDfa, Tier::EagerDfa];
