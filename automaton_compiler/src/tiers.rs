//! The tier compiler handed to the execution controller.

use std::sync::Arc;

use regex_exec::nfa::Nfa;
use regex_exec::{BailoutError, EagerArtifacts, LazyArtifacts, TierCompiler};
use regex_syntax::hir::{self, Hir, HirKind};

use crate::compiler::{code_units, Compiler};
use crate::determinize::{self, Determinizer, Mode};
use crate::{nfa, trace, BuildResult, Config};

/// Compiles one pattern: its NFA up front, its DFAs when a tier asks.
#[derive(Clone, Debug)]
pub struct PatternCompiler {
    nfa: Arc<Nfa>,
    config: Config,
    leading_literal: Option<Vec<u32>>,
    bounded: bool,
}

impl PatternCompiler {
    /// Parses and compiles `pattern`.
    pub fn new(pattern: &str, config: Config) -> BuildResult<PatternCompiler> {
        let hir = Compiler::parse(pattern)?;
        PatternCompiler::from_hir(pattern, &hir, config)
    }

    /// Compiles an already parsed pattern. `pattern` is only kept for
    /// diagnostics.
    pub fn from_hir(pattern: &str, hir: &Hir, config: Config) -> BuildResult<PatternCompiler> {
        let nfa = Compiler::new(&config).compile(hir)?.with_pattern(pattern);
        let leading_literal = if config.get_inner_literal() { leading_literal(hir) } else { None };
        Ok(PatternCompiler {
            nfa: Arc::new(nfa),
            config,
            leading_literal,
            bounded: hir.properties().maximum_len().is_some(),
        })
    }

    pub fn nfa(&self) -> &Arc<Nfa> {
        &self.nfa
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Builds the automata of the lazy DFA tier.
    pub fn lazy(&self) -> BuildResult<LazyArtifacts> {
        let forward = Determinizer::new(&self.nfa, Mode::forward(true, false), &self.config)
            .with_leading_literal(self.leading_literal.clone())
            .build()?;
        let reversed = nfa::reverse(&self.nfa);
        let backward = determinize::build(&reversed, Mode::backward(), &self.config)?;
        let has_groups = self.nfa.group_count() > 1;
        let captures = if has_groups {
            Some(determinize::build(&self.nfa, Mode::forward(false, true), &self.config)?)
        } else {
            None
        };
        let traceable = has_groups && self.bounded && self.config.get_trace_finder_paths() > 0;
        let trace_finder =
            if traceable { trace::build(&self.nfa, &self.config)? } else { None };
        Ok(LazyArtifacts { forward: Arc::new(forward), backward, captures, trace_finder })
    }

    /// Builds the automaton of the eager DFA tier.
    pub fn eager(&self) -> BuildResult<EagerArtifacts> {
        let captures = determinize::build(&self.nfa, Mode::forward(true, true), &self.config)?;
        Ok(EagerArtifacts { captures })
    }
}

impl TierCompiler for PatternCompiler {
    fn compile_lazy(&self) -> Result<LazyArtifacts, BailoutError> {
        self.lazy().map_err(BailoutError::from)
    }

    fn compile_eager(&self) -> Result<EagerArtifacts, BailoutError> {
        self.eager().map_err(BailoutError::from)
    }
}

/// The literal every match starts with, if it is at least two code units
/// long and the pattern has no `^` that would make the first position
/// special.
fn leading_literal(hir: &Hir) -> Option<Vec<u32>> {
    if hir.properties().look_set().contains(hir::Look::Start) {
        return None;
    }
    let first = match hir.kind() {
        HirKind::Concat(subs) => subs.first()?,
        _ => hir,
    };
    let HirKind::Literal(ref literal) = *first.kind() else {
        return None;
    };
    let units = code_units(&literal.0);
    if units.len() >= 2 {
        Some(units)
    } else {
        None
    }
}
