use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use automaton_compiler::PatternCompiler;
use regex_exec::Controller;

use crate::{Error, Regex};

/// A configurable builder for a [`Regex`].
///
/// Settings for the engine (when to promote, regression mode) and for the
/// automaton compiler (size limits, optimizations) are kept separately and
/// merged: calling [`engine`](Self::engine) or [`compiler`](Self::compiler)
/// twice overwrites only the options set the second time.
///
/// # Example
///
/// ```
/// use tiered_regex::{CompilerConfig, EngineConfig, RegexBuilder, Tier};
///
/// let re = RegexBuilder::new(r"(\w+)@(\w+)")
///     .engine(EngineConfig::new().lazy_promotion_calls(1))
///     .compiler(CompilerConfig::new().dfa_state_limit(1_000))
///     .build()
///     .unwrap();
/// assert_eq!(re.tier(), Tier::Interpreting);
/// assert!(re.is_match("me@example"));
/// assert!(re.is_match("me@example"));
/// assert_eq!(re.tier(), Tier::LazyDfa);
/// ```
#[derive(Clone, Debug)]
pub struct RegexBuilder {
    pattern: String,
    engine: regex_exec::Config,
    compiler: automaton_compiler::Config,
    interrupt: Option<Arc<AtomicBool>>,
}

impl RegexBuilder {
    pub fn new(pattern: &str) -> RegexBuilder {
        RegexBuilder {
            pattern: pattern.to_string(),
            engine: regex_exec::Config::new(),
            compiler: automaton_compiler::Config::new(),
            interrupt: None,
        }
    }

    /// Compiles the pattern. Only the NFA is built here; the DFAs of the
    /// optimizing tiers are built when the pattern gets promoted.
    pub fn build(&self) -> Result<Regex, Error> {
        let compiler = PatternCompiler::new(&self.pattern, self.compiler.clone())?;
        let nfa = Arc::clone(compiler.nfa());
        let mut controller = Controller::new(nfa, Arc::new(compiler), self.engine.clone());
        if let Some(ref flag) = self.interrupt {
            controller = controller.with_interrupt(Arc::clone(flag));
        }
        Ok(Regex::from_controller(&self.pattern, controller))
    }

    /// Applies the engine options set in `config`.
    pub fn engine(&mut self, config: regex_exec::Config) -> &mut RegexBuilder {
        self.engine = self.engine.overwrite(config);
        self
    }

    /// Applies the automaton compiler options set in `config`.
    pub fn compiler(&mut self, config: automaton_compiler::Config) -> &mut RegexBuilder {
        self.compiler = self.compiler.overwrite(config);
        self
    }

    /// Shorthand for enabling or disabling regression mode on the engine.
    pub fn regression_mode(&mut self, yes: bool) -> &mut RegexBuilder {
        self.engine(regex_exec::Config::new().regression_mode(yes))
    }

    /// Installs a flag that aborts an interpreter search once raised. See
    /// [`Regex::try_search`].
    pub fn interrupt(&mut self, flag: Arc<AtomicBool>) -> &mut RegexBuilder {
        self.interrupt = Some(flag);
        self
    }
}
