//! Lowers a `regex-syntax` HIR into a Thompson NFA.

use regex_exec::nfa::{Look, Nfa};
use regex_exec::ranges::RangeSet;
use regex_syntax::hir::{self, Class, Hir, HirKind};
use regex_syntax::ParserBuilder;

use crate::nfa::{Builder, Fragment};
use crate::{BuildError, BuildResult, Config};

/// Compiler that converts a regex-syntax HIR into an NFA.
///
/// The whole pattern is wrapped in the saves of group 0, so every group,
/// the overall match included, is recorded the same way. Unanchored
/// searching is left to the engines: the NFA itself matches at one start.
#[derive(Debug)]
pub struct Compiler {
    builder: Builder,
}

impl Compiler {
    pub fn new(config: &Config) -> Compiler {
        Compiler { builder: Builder::new(config.get_nfa_size_limit()) }
    }

    /// Parses `pattern` with the default syntax settings.
    pub fn parse(pattern: &str) -> BuildResult<Hir> {
        ParserBuilder::new().build().parse(pattern).map_err(|e| BuildError::Syntax(e.to_string()))
    }

    /// Compiles `hir` into an NFA.
    pub fn compile(mut self, hir: &Hir) -> BuildResult<Nfa> {
        let group_count = hir.properties().explicit_captures_len() + 1;
        let open = self.builder.save(0)?;
        let body = self.compile_hir(hir)?;
        let close = self.builder.save(1)?;
        let accept = self.builder.match_state()?;
        self.builder.connect(open, body.start);
        self.builder.connect(body.end, close);
        self.builder.connect(close, accept);
        Ok(self.builder.finish(open, group_count))
    }

    fn compile_hir(&mut self, hir: &Hir) -> BuildResult<Fragment> {
        match hir.kind() {
            HirKind::Empty => self.compile_empty(),
            HirKind::Literal(literal) => self.compile_literal(literal),
            HirKind::Class(class) => self.compile_class(class),
            HirKind::Look(look) => self.compile_look(*look),
            HirKind::Repetition(rep) => self.compile_repetition(rep),
            HirKind::Capture(capture) => self.compile_capture(capture),
            HirKind::Concat(concat) => self.compile_concat(concat),
            HirKind::Alternation(alternation) => self.compile_alternation(alternation),
        }
    }

    fn compile_empty(&mut self) -> BuildResult<Fragment> {
        let start = self.builder.epsilon()?;
        Ok(Fragment { start, end: start })
    }

    fn compile_literal(&mut self, literal: &hir::Literal) -> BuildResult<Fragment> {
        let units = code_units(&literal.0);
        let Some((&first, rest)) = units.split_first() else {
            return self.compile_empty();
        };
        let start = self.builder.char(RangeSet::single(first))?;
        let mut end = start;
        for &c in rest {
            let next = self.builder.char(RangeSet::single(c))?;
            self.builder.connect(end, next);
            end = next;
        }
        Ok(Fragment { start, end })
    }

    fn compile_class(&mut self, class: &Class) -> BuildResult<Fragment> {
        let ranges = match class {
            Class::Unicode(class) => {
                RangeSet::new(class.iter().map(|r| (u32::from(r.start()), u32::from(r.end()))))
            }
            Class::Bytes(class) => {
                RangeSet::new(class.iter().map(|r| (u32::from(r.start()), u32::from(r.end()))))
            }
        };
        let state = self.builder.char(ranges)?;
        Ok(Fragment { start: state, end: state })
    }

    fn compile_look(&mut self, look: hir::Look) -> BuildResult<Fragment> {
        let look = match look {
            hir::Look::Start => Look::Start,
            hir::Look::End => Look::End,
            other => return Err(BuildError::Unsupported(format!("look-around assertion {:?}", other))),
        };
        let state = self.builder.look(look)?;
        Ok(Fragment { start: state, end: state })
    }

    fn compile_capture(&mut self, capture: &hir::Capture) -> BuildResult<Fragment> {
        let group = capture.index as usize;
        let open = self.builder.save(2 * group)?;
        let body = self.compile_hir(&capture.sub)?;
        let close = self.builder.save(2 * group + 1)?;
        self.builder.connect(open, body.start);
        self.builder.connect(body.end, close);
        Ok(Fragment { start: open, end: close })
    }

    fn compile_concat(&mut self, concat: &[Hir]) -> BuildResult<Fragment> {
        let Some((first, rest)) = concat.split_first() else {
            return self.compile_empty();
        };
        let first = self.compile_hir(first)?;
        let mut end = first.end;
        for hir in rest {
            let next = self.compile_hir(hir)?;
            self.builder.connect(end, next.start);
            end = next.end;
        }
        Ok(Fragment { start: first.start, end })
    }

    /// Alternatives are tried in pattern order.
    fn compile_alternation(&mut self, alternation: &[Hir]) -> BuildResult<Fragment> {
        let split = self.builder.epsilon()?;
        let join = self.builder.epsilon()?;
        for hir in alternation {
            let alt = self.compile_hir(hir)?;
            self.builder.connect(split, alt.start);
            self.builder.connect(alt.end, join);
        }
        Ok(Fragment { start: split, end: join })
    }

    /// Compiles `sub{min,max}` as `min` mandatory copies followed by either
    /// a loop or `max - min` nested optional copies. Greedy repetitions try
    /// another iteration before leaving; lazy ones the other way around.
    ///
    /// Groups inside the repeated expression are cleared whenever an
    /// iteration starts, so a group reports only the last iteration that
    /// entered it.
    fn compile_repetition(&mut self, rep: &hir::Repetition) -> BuildResult<Fragment> {
        if rep.max != Some(rep.min) && rep.sub.properties().minimum_len() == Some(0) {
            return Err(BuildError::Unsupported(
                "repetition of an expression that can match the empty string".to_string(),
            ));
        }
        let mut clear = Vec::new();
        capture_offsets(&rep.sub, &mut clear);

        let start = self.builder.epsilon()?;
        let mut end = start;
        for _ in 0..rep.min {
            let body = self.compile_iteration(&rep.sub, &clear)?;
            self.builder.connect(end, body.start);
            end = body.end;
        }
        let exit = self.builder.epsilon()?;
        match rep.max {
            None => {
                let split = self.builder.epsilon()?;
                let body = self.compile_iteration(&rep.sub, &clear)?;
                self.builder.connect(end, split);
                self.connect_choice(split, body.start, exit, rep.greedy);
                self.builder.connect(body.end, split);
            }
            Some(max) => {
                for _ in rep.min..max {
                    let split = self.builder.epsilon()?;
                    let body = self.compile_iteration(&rep.sub, &clear)?;
                    self.builder.connect(end, split);
                    self.connect_choice(split, body.start, exit, rep.greedy);
                    end = body.end;
                }
                self.builder.connect(end, exit);
            }
        }
        Ok(Fragment { start, end: exit })
    }

    fn compile_iteration(&mut self, sub: &Hir, clear: &[usize]) -> BuildResult<Fragment> {
        let body = self.compile_hir(sub)?;
        if clear.is_empty() {
            return Ok(body);
        }
        let reset = self.builder.clear(clear.to_vec())?;
        self.builder.connect(reset, body.start);
        Ok(Fragment { start: reset, end: body.end })
    }

    fn connect_choice(&mut self, split: usize, again: usize, exit: usize, greedy: bool) {
        if greedy {
            self.builder.connect(split, again);
            self.builder.connect(split, exit);
        } else {
            self.builder.connect(split, exit);
            self.builder.connect(split, again);
        }
    }
}

/// Decodes literal bytes into code units: Unicode scalar values for UTF-8,
/// the raw bytes otherwise.
pub(crate) fn code_units(bytes: &[u8]) -> Vec<u32> {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.chars().map(u32::from).collect(),
        Err(_) => bytes.iter().map(|&b| u32::from(b)).collect(),
    }
}

/// Collects the capture offsets of every group inside `hir`.
fn capture_offsets(hir: &Hir, offsets: &mut Vec<usize>) {
    match hir.kind() {
        HirKind::Capture(capture) => {
            let group = capture.index as usize;
            offsets.extend([2 * group, 2 * group + 1]);
            capture_offsets(&capture.sub, offsets);
        }
        HirKind::Repetition(rep) => capture_offsets(&rep.sub, offsets),
        HirKind::Concat(subs) | HirKind::Alternation(subs) => {
            subs.iter().for_each(|sub| capture_offsets(sub, offsets))
        }
        HirKind::Empty | HirKind::Literal(_) | HirKind::Class(_) | HirKind::Look(_) => {}
    }
}
