/*!

The context: assertion processing and satisfiability checking.

A context owns the SAT core, the bit-vector solver, the gate manager, the
internalization table, and the equality cache. Assertions flow through the pipeline

1. flatten (`flatten.rs`): split top-level conjunctions, flatten nested disjunctions,
   classify conjuncts into the four buckets, collect candidate substitutions;
2. candidate substitutions (`subst.rs`): commit cycle-free variable eliminations,
   demote the rest;
3. internalization (`internalize.rs`): translate the surviving buckets into core
   literals, theory variables, gates, and clauses.

An assertion either commits completely or not at all: on an internalization error the
internalization-table trail is rolled back to where the assertion began. A contradiction
detected during processing parks the context in `Unsat` instead.

*/

mod flatten;
mod internalize;
mod model;
mod subst;

#[cfg(test)]
mod tests;

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use enumflags2::{bitflags, BitFlags};

use crate::{
  api::{BvSolverInterface, CheckStatus, Error},
  core::{
    bvsolver::BitBlaster,
    eq_cache::EqCache,
    gates::GateManager,
    intern::InternTable,
    sat::{SatSolver, SearchParams, SolverStatus},
    term::{Term, TermError, TermTable},
  },
};

pub use model::{Model, Value};

/// Preprocessing and behavior options.
#[bitflags]
#[repr(u16)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContextOption {
  /// Eliminate variables via substitution.
  VarElim,
  /// Rewrite nested `or` into flat `or`.
  FlattenOr,
  /// Rewrite arithmetic disequalities into disjunctions of strict inequalities.
  /// Implies `FlattenOr`. No-op in the pure bit-vector fragment (no arithmetic sorts).
  FlattenDiseq,
  /// Abstraction-based equality learning.
  EqAbstract,
  /// Bit-vector arithmetic elimination.
  BvArithElim,
  /// Keep if-then-else terms for the theory solver.
  KeepIte,
  /// Symmetry breaking.
  BreakSym,
  /// Elimination of unconstrained terms by pseudo-inverses.
  PseudoInverse,
  /// Dump internal state while processing (debugging).
  Dump,
  /// Keep going on unsupported constructs where possible.
  Lax,
}

pub type ContextOptions = BitFlags<ContextOption>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContextMode {
  /// A single `check` after all assertions.
  OneCheck,
  /// Assert/check cycles without push/pop.
  MultiChecks,
  /// Push/pop supported.
  PushPop,
  /// Push/pop plus clean interrupts.
  Interactive,
}

/// Which theory solvers are attached.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContextArch {
  /// Pure Boolean: no theory solver.
  NoSolvers,
  /// The bit-vector solver.
  Bv,
}

/// Result of a successful `assert_formula`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AssertStatus {
  Asserted,
  /// The assertion simplified to false; the context is now unsatisfiable.
  TriviallyUnsat,
}

/// Internal control flow for the assertion pipeline.
#[derive(Debug)]
pub(crate) enum Abort {
  TriviallyUnsat,
  Error(Error),
}

impl From<Error> for Abort {
  fn from(e: Error) -> Self {
    Abort::Error(e)
  }
}

impl From<TermError> for Abort {
  fn from(e: TermError) -> Self {
    Abort::Error(e.into())
  }
}

/// Snapshot for a context push.
struct ContextSnapshot {
  intern_mark: usize,
}

pub struct Context {
  pub(crate) mode: ContextMode,
  pub(crate) arch: ContextArch,
  pub(crate) options: ContextOptions,

  pub(crate) core: SatSolver,
  pub(crate) bv: Option<Box<dyn BvSolverInterface>>,
  pub(crate) gates: GateManager,
  pub(crate) intern: InternTable,
  pub(crate) eq_cache: EqCache,

  // Flattening output buckets, scratch per assertion.
  pub(crate) top_eqs: Vec<Term>,
  pub(crate) top_atoms: Vec<Term>,
  pub(crate) top_formulas: Vec<Term>,
  pub(crate) top_interns: Vec<Term>,
  pub(crate) subst_eqs: Vec<Term>,

  status: CheckStatus,
  stop_flag: Arc<AtomicBool>,
  frames: Vec<ContextSnapshot>,
}

impl Context {
  /// A context for the given mode and architecture, with the default preprocessing
  /// options (variable elimination and or-flattening).
  pub fn new(mode: ContextMode, arch: ContextArch) -> Self {
    let bv: Option<Box<dyn BvSolverInterface>> = match arch {
      ContextArch::NoSolvers => None,
      ContextArch::Bv => Some(Box::new(BitBlaster::new())),
    };
    let core = SatSolver::new();
    let stop_flag = core.stop_handle();
    Context {
      mode,
      arch,
      options: ContextOption::VarElim | ContextOption::FlattenOr,
      core,
      bv,
      gates: GateManager::new(),
      intern: InternTable::new(),
      eq_cache: EqCache::new(),
      top_eqs: Vec::new(),
      top_atoms: Vec::new(),
      top_formulas: Vec::new(),
      top_interns: Vec::new(),
      subst_eqs: Vec::new(),
      status: CheckStatus::Idle,
      stop_flag,
      frames: Vec::new(),
    }
  }

  // region Options and introspection

  pub fn enable_option(&mut self, option: ContextOption) {
    self.options |= option;
    if option == ContextOption::FlattenDiseq {
      self.options |= ContextOption::FlattenOr;
    }
  }

  pub fn disable_option(&mut self, option: ContextOption) {
    self.options &= !BitFlags::from(option);
  }

  #[inline(always)]
  pub fn option_enabled(&self, option: ContextOption) -> bool {
    self.options.contains(option)
  }

  #[inline(always)]
  pub fn status(&self) -> CheckStatus {
    self.status
  }

  #[inline(always)]
  pub fn mode(&self) -> ContextMode {
    self.mode
  }

  /// Number of open frames (= calls to `push`).
  #[inline(always)]
  pub fn base_level(&self) -> u32 {
    self.frames.len() as u32
  }

  pub fn core_stats(&self) -> &crate::core::sat::SolverStats {
    &self.core.stats
  }

  #[inline(always)]
  pub(crate) fn supports_pushpop(&self) -> bool {
    matches!(self.mode, ContextMode::PushPop | ContextMode::Interactive)
  }

  #[inline(always)]
  pub(crate) fn supports_multichecks(&self) -> bool {
    !matches!(self.mode, ContextMode::OneCheck)
  }

  #[inline(always)]
  pub(crate) fn supports_cleaninterrupt(&self) -> bool {
    matches!(self.mode, ContextMode::Interactive)
  }

  // endregion

  // region Assertions

  /// Asserts the Boolean formula `f`.
  ///
  /// On an internalization error, the context is left exactly as it was before the
  /// call. A detected contradiction returns `TriviallyUnsat` and parks the context in
  /// the `Unsat` status.
  pub fn assert_formula(&mut self, terms: &mut TermTable, f: Term) -> Result<AssertStatus, Error> {
    match self.status {
      CheckStatus::Unsat => return Ok(AssertStatus::TriviallyUnsat),
      CheckStatus::Idle => {}
      CheckStatus::Sat | CheckStatus::Unknown if self.supports_multichecks() => self.clear(),
      _ => return Err(Error::Internal),
    }
    if !terms.good_term(f) {
      return Err(Error::Internal);
    }
    if !terms.is_boolean(f) {
      return Err(Error::Type);
    }

    let intern_mark = self.intern.trail_mark();
    match self.process_assertion(terms, f) {
      Ok(()) => {
        if !self.core.propagate_assertions() {
          self.status = CheckStatus::Unsat;
          return Ok(AssertStatus::TriviallyUnsat);
        }
        Ok(AssertStatus::Asserted)
      }
      Err(Abort::TriviallyUnsat) => {
        self.status = CheckStatus::Unsat;
        Ok(AssertStatus::TriviallyUnsat)
      }
      Err(Abort::Error(e)) => {
        // Failed assertions never partially commit.
        self.intern.undo_to(intern_mark);
        Err(e)
      }
    }
  }

  pub fn assert_formulas(&mut self, terms: &mut TermTable, fs: &[Term]) -> Result<AssertStatus, Error> {
    let mut out = AssertStatus::Asserted;
    for &f in fs {
      if self.assert_formula(terms, f)? == AssertStatus::TriviallyUnsat {
        out = AssertStatus::TriviallyUnsat;
      }
    }
    Ok(out)
  }

  fn process_assertion(&mut self, terms: &mut TermTable, f: Term) -> Result<(), Abort> {
    self.top_eqs.clear();
    self.top_atoms.clear();
    self.top_formulas.clear();
    self.top_interns.clear();
    self.subst_eqs.clear();

    flatten::flatten_assertion(self, terms, f)?;
    subst::process_candidate_subst(self, terms)?;
    internalize::assert_toplevel(self, terms)?;
    Ok(())
  }

  /// Internalizes a Boolean term to a core literal without asserting it.
  pub fn internalize(&mut self, terms: &TermTable, t: Term) -> Result<crate::core::sat::Lit, Error> {
    if !terms.good_term(t) || !terms.is_boolean(t) {
      return Err(Error::Type);
    }
    let mark = self.intern.trail_mark();
    internalize::internalize_to_literal(self, terms, t).map_err(|abort| {
      self.intern.undo_to(mark);
      match abort {
        Abort::TriviallyUnsat => Error::Internal,
        Abort::Error(e) => e,
      }
    })
  }

  // endregion

  // region Check, models, interrupts

  /// Runs the search. Returns `Sat`, `Unsat`, `Unknown`, or `Interrupted`.
  pub fn check(&mut self, params: &SearchParams) -> CheckStatus {
    match self.status {
      CheckStatus::Unsat => return self.status,
      CheckStatus::Sat | CheckStatus::Unknown => {
        if !self.supports_multichecks() {
          return self.status;
        }
        self.clear();
      }
      CheckStatus::Idle => {}
      _ => return self.status,
    }

    self.status = CheckStatus::Searching;
    let result = self.core.solve(params);
    self.status = match result {
      SolverStatus::Sat => CheckStatus::Sat,
      SolverStatus::Unsat => CheckStatus::Unsat,
      SolverStatus::Interrupted => CheckStatus::Interrupted,
      SolverStatus::Unknown => CheckStatus::Unknown,
    };
    satyr_abs::info!(status = %self.status, conflicts = self.core.stats.conflicts, "check finished");
    self.status
  }

  /// A handle for interrupting a running `check` from another thread or a signal
  /// handler. Setting the flag never takes any lock.
  pub fn interrupt_handle(&self) -> InterruptHandle {
    InterruptHandle(Arc::clone(&self.stop_flag))
  }

  /// Requests interruption of the current search (lock-free).
  pub fn stop_search(&self) {
    self.stop_flag.store(true, Ordering::Relaxed);
  }

  /// After an interrupted check in a mode with clean interrupts, restores the context
  /// to its pre-check state.
  pub fn cleanup(&mut self) -> Result<(), Error> {
    if !self.supports_cleaninterrupt() {
      return Err(Error::Internal);
    }
    if self.status == CheckStatus::Interrupted {
      self.core.backtrack(self.core.base_level());
      self.status = CheckStatus::Idle;
    }
    Ok(())
  }

  /// Clears the Boolean assignment after `Sat`/`Unknown` and returns to `Idle` so more
  /// formulas can be asserted.
  pub fn clear(&mut self) {
    if matches!(self.status, CheckStatus::Sat | CheckStatus::Unknown | CheckStatus::Interrupted) {
      self.core.backtrack(self.core.base_level());
      self.status = CheckStatus::Idle;
    }
  }

  /// Builds a model from the current satisfying assignment. The context status must be
  /// `Sat` (or `Unknown`).
  pub fn build_model(&mut self, terms: &TermTable) -> Result<Model, Error> {
    if !matches!(self.status, CheckStatus::Sat | CheckStatus::Unknown) {
      return Err(Error::Internal);
    }
    model::build_model(self, terms)
  }

  /// Negates the current decision literals and adds the resulting blocking clause.
  /// With no decisions the blocking clause is empty and the context becomes `Unsat`.
  pub fn assert_blocking_clause(&mut self) -> Result<AssertStatus, Error> {
    if !matches!(self.status, CheckStatus::Sat | CheckStatus::Unknown) {
      return Err(Error::Internal);
    }
    let decisions = self.core.decision_literals();
    self.core.backtrack(self.core.base_level());
    if decisions.is_empty() {
      self.core.add_empty_clause();
      self.status = CheckStatus::Unsat;
      return Ok(AssertStatus::TriviallyUnsat);
    }
    let mut blocking: Vec<crate::core::sat::Lit> = decisions.iter().map(|&l| !l).collect();
    self.core.simplify_and_add_clause(&mut blocking);
    self.status = CheckStatus::Idle;
    Ok(AssertStatus::Asserted)
  }

  // endregion

  // region Push / pop

  pub fn push(&mut self) -> Result<(), Error> {
    if !self.supports_pushpop() {
      return Err(Error::Internal);
    }
    match self.status {
      CheckStatus::Idle => {}
      CheckStatus::Sat | CheckStatus::Unknown => self.clear(),
      _ => return Err(Error::Internal),
    }
    self.frames.push(ContextSnapshot {
      intern_mark: self.intern.trail_mark(),
    });
    self.core.push();
    self.eq_cache.push();
    if let Some(bv) = self.bv.as_deref_mut() {
      bv.push();
    }
    Ok(())
  }

  pub fn pop(&mut self) -> Result<(), Error> {
    if !self.supports_pushpop() {
      return Err(Error::Internal);
    }
    let snapshot = self.frames.pop().ok_or(Error::Internal)?;
    self.clear();
    self.intern.undo_to(snapshot.intern_mark);
    self.core.pop();
    self.eq_cache.pop();
    let nvars = self.core.nvars();
    if let Some(bv) = self.bv.as_deref_mut() {
      bv.pop(nvars);
    }
    self.gates.remove_dead(nvars);
    self.status = CheckStatus::Idle;
    Ok(())
  }

  /// Removes every assertion and learned fact; the term table is untouched.
  pub fn reset(&mut self) {
    self.core = SatSolver::new();
    self.stop_flag = self.core.stop_handle();
    self.bv = match self.arch {
      ContextArch::NoSolvers => None,
      ContextArch::Bv => Some(Box::new(BitBlaster::new())),
    };
    self.gates = GateManager::new();
    self.intern = InternTable::new();
    self.eq_cache.reset();
    self.frames.clear();
    self.status = CheckStatus::Idle;
  }

  // endregion

  /// Marks every term the context still references, so a term-table collection cannot
  /// reclaim anything this context depends on.
  pub fn gc_mark(&self, terms: &mut TermTable) {
    self.intern.mark_referenced_terms(terms);
  }

  /// Splits the context into the bit-vector solver and the SAT core, the two halves an
  /// internalization step mutates together.
  pub(crate) fn bv_core(&mut self) -> Result<(&mut dyn BvSolverInterface, &mut SatSolver), Abort> {
    match self.bv.as_deref_mut() {
      Some(bv) => Ok((bv, &mut self.core)),
      None => Err(Abort::Error(Error::BvNotSupported)),
    }
  }
}

/// A cloneable, lock-free interrupt handle (safe to use from a signal handler).
#[derive(Clone)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
  pub fn stop_search(&self) {
    self.0.store(true, Ordering::Relaxed);
  }
}
