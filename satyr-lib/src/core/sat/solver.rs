/*!

The CDCL solver.

Assignment stack, watched-literal propagation over the packed pool, first-UIP conflict
analysis with self-subsumption minimization, phase-saving decisions from the activity
heap, Luby restarts, learned-clause reduction, and level-zero database simplification.

The solver supports frames (`push`/`pop`) for the context: a frame boundary behaves like
a decision level without a decision, so assignments made inside a frame are undone by the
pop, and clauses added inside a frame are truncated away.

Determinism: all randomness comes from an in-line linear congruential generator seeded
through [`SearchParams`]; given a seed, runs are reproducible.

*/

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use ordered_float::OrderedFloat;
use satyr_abs::SmallVec;

use super::{
  clause_pool::{Cidx, ClausePool},
  heap::VarHeap,
  literal::{AnteTag, BVal, BVar, Lit, TRUE_LIT},
  watch::Watch,
};

/// Tombstone marker for removed entries of the binary-clause log.
const BIN_TOMBSTONE: (u32, u32) = (u32::MAX, u32::MAX);

/// Clause activities are rescaled past this threshold.
const CLAUSE_ACTIVITY_THRESHOLD: f32 = 1e20;

/// Floor for the learned-clause reduction threshold.
const MIN_REDUCE_THRESHOLD: u32 = 1000;

// Numerical-Recipes linear congruential generator.
const PRNG_MULTIPLIER: u32 = 1664525;
const PRNG_INCREMENT: u32 = 1013904223;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum SolverStatus {
  #[default]
  Unknown,
  Sat,
  Unsat,
  Interrupted,
}

/// Search and heuristic parameters.
#[derive(Copy, Clone, Debug)]
pub struct SearchParams {
  pub seed: u32,
  /// Probability of replacing a heap pick by a uniform random variable.
  pub randomness: f32,
  pub var_decay: f64,
  pub clause_decay: f32,
  /// Restart intervals are `luby(k) * luby_unit` conflicts.
  pub luby_unit: u32,
}

impl Default for SearchParams {
  fn default() -> Self {
    SearchParams {
      seed: 0xabcdef98,
      randomness: 0.02,
      var_decay: 0.95,
      clause_decay: 0.999,
      luby_unit: 100,
    }
  }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SolverStats {
  /// 1 + number of restarts.
  pub starts: u32,
  pub simplify_calls: u32,
  pub reduce_calls: u32,
  pub decisions: u64,
  pub random_decisions: u64,
  pub propagations: u64,
  pub conflicts: u64,
  pub prob_clauses_deleted: u64,
  pub learned_clauses_deleted: u64,
  pub literals_before_simpl: u64,
  pub subsumed_literals: u64,
}

/// The assignment stack: literals assigned true, a propagation pointer, and per-level
/// start markers (`level_index[d]` = stack position where level `d` begins).
#[derive(Default)]
struct SolStack {
  lit: Vec<Lit>,
  prop_ptr: u32,
  level_index: Vec<u32>,
}

enum Conflict {
  /// A false binary clause `{a, b}`.
  Binary(Lit, Lit),
  /// A false pool clause.
  Clause(Cidx),
}

/// Snapshot taken by `push`.
struct CoreSnapshot {
  nvars: u32,
  pool_size: u32,
  pool_learned: u32,
  pool_has_learned: bool,
  bin_log_len: u32,
  units: u32,
  binaries: u32,
  num_prob_clauses: u32,
  num_prob_literals: u32,
}

pub struct SatSolver {
  status: SolverStatus,
  decision_level: u32,
  base_level: u32,
  prng: u32,

  nvars: u32,
  value: Vec<u8>,
  ante_tag: Vec<AnteTag>,
  ante_data: Vec<u32>,
  level: Vec<u32>,
  watch: Vec<Watch>,

  heap: VarHeap,
  stack: SolStack,

  cla_inc: f32,
  inv_cla_decay: f32,
  has_empty_clause: bool,
  units: u32,
  binaries: u32,
  pool: ClausePool,
  /// Every binary clause ever added, with tombstones; the watch vectors are rebuilt
  /// from this log and the pool after destructive operations.
  bin_log: Vec<(u32, u32)>,

  /// Conflict-analysis marks, by variable.
  seen: Vec<bool>,
  stop_flag: Arc<AtomicBool>,
  frames: Vec<CoreSnapshot>,
  /// Stack height after the last database simplification.
  last_simplify_top: u32,
  reduce_threshold: u32,

  pub stats: SolverStats,
}

impl SatSolver {
  pub fn new() -> Self {
    let mut solver = SatSolver {
      status: SolverStatus::Unknown,
      decision_level: 0,
      base_level: 0,
      prng: SearchParams::default().seed,
      nvars: 0,
      value: Vec::with_capacity(64),
      ante_tag: Vec::with_capacity(64),
      ante_data: Vec::with_capacity(64),
      level: Vec::with_capacity(64),
      watch: Vec::with_capacity(128),
      heap: VarHeap::new(),
      stack: SolStack {
        lit: Vec::with_capacity(64),
        prop_ptr: 0,
        level_index: vec![0],
      },
      cla_inc: 1.0,
      inv_cla_decay: 1.0 / 0.999,
      has_empty_clause: false,
      units: 0,
      binaries: 0,
      pool: ClausePool::new(),
      bin_log: Vec::new(),
      seen: Vec::with_capacity(64),
      stop_flag: Arc::new(AtomicBool::new(false)),
      frames: Vec::new(),
      last_simplify_top: 0,
      reduce_threshold: MIN_REDUCE_THRESHOLD,
      stats: SolverStats::default(),
    };

    // Variable 0 is reserved and permanently true, making literals 0/1 true/false.
    solver.nvars = 1;
    solver.value.push(BVal::True as u8);
    solver.ante_tag.push(AnteTag::Unit);
    solver.ante_data.push(0);
    solver.level.push(0);
    solver.watch.push(Watch::default());
    solver.watch.push(Watch::default());
    solver.seen.push(false);
    solver
  }

  // region Variables and values

  #[inline(always)]
  pub fn nvars(&self) -> u32 {
    self.nvars
  }

  #[inline(always)]
  pub fn status(&self) -> SolverStatus {
    self.status
  }

  #[inline(always)]
  pub fn decision_level(&self) -> u32 {
    self.decision_level
  }

  #[inline(always)]
  pub fn base_level(&self) -> u32 {
    self.base_level
  }

  /// A handle that interrupts the search from another thread or a signal handler
  /// without taking any lock.
  pub fn stop_handle(&self) -> Arc<AtomicBool> {
    Arc::clone(&self.stop_flag)
  }

  pub fn new_var(&mut self) -> BVar {
    let x = self.nvars;
    self.nvars += 1;
    self.value.push(BVal::UndefFalse as u8);
    self.ante_tag.push(AnteTag::None);
    self.ante_data.push(0);
    self.level.push(0);
    self.watch.push(Watch::default());
    self.watch.push(Watch::default());
    self.seen.push(false);
    self.heap.extend(1);
    x
  }

  pub fn add_vars(&mut self, n: u32) {
    for _ in 0..n {
      self.new_var();
    }
  }

  #[inline(always)]
  pub fn var_value(&self, x: BVar) -> BVal {
    BVal::from_u8(self.value[x as usize])
  }

  #[inline(always)]
  pub fn lit_value(&self, l: Lit) -> BVal {
    BVal::from_u8(self.value[l.var() as usize] ^ l.sign() as u8)
  }

  #[inline(always)]
  pub fn lit_is_true(&self, l: Lit) -> bool {
    self.lit_value(l) == BVal::True
  }

  #[inline(always)]
  pub fn lit_is_false(&self, l: Lit) -> bool {
    self.lit_value(l) == BVal::False
  }

  #[inline(always)]
  pub fn var_is_assigned(&self, x: BVar) -> bool {
    !self.var_value(x).is_unassigned()
  }

  // endregion

  // region Assignment

  fn assign_decision(&mut self, l: Lit) {
    let v = l.var() as usize;
    self.value[v] = 0b10 | l.is_pos() as u8;
    self.ante_tag[v] = AnteTag::Decision;
    self.ante_data[v] = 0;
    self.level[v] = self.decision_level;
    self.stack.lit.push(l);
  }

  fn assign_propagated(&mut self, l: Lit, tag: AnteTag, data: u32) {
    debug_assert!(self.lit_value(l).is_unassigned());
    let v = l.var() as usize;
    self.value[v] = 0b10 | l.is_pos() as u8;
    self.ante_tag[v] = tag;
    self.ante_data[v] = data;
    self.level[v] = self.decision_level;
    self.stack.lit.push(l);
  }

  /// Undoes all assignments above `level` and resets the propagation pointer. Preferred
  /// polarities keep the last assigned value.
  pub fn backtrack(&mut self, level: u32) {
    debug_assert!(level + 1 >= self.base_level);
    if self.decision_level <= level {
      return;
    }
    let target = self.stack.level_index[(level + 1) as usize] as usize;
    while self.stack.lit.len() > target {
      let l = self.stack.lit.pop().unwrap();
      let v = l.var() as usize;
      self.value[v] &= 1;
      self.ante_tag[v] = AnteTag::None;
      self.heap.insert(l.var());
    }
    self.stack.level_index.truncate((level + 1) as usize);
    self.stack.prop_ptr = self.stack.lit.len() as u32;
    self.decision_level = level;
  }

  /// The decision literals of the current assignment, in stack order.
  pub fn decision_literals(&self) -> Vec<Lit> {
    self
      .stack
      .lit
      .iter()
      .copied()
      .filter(|l| self.ante_tag[l.var() as usize] == AnteTag::Decision)
      .collect()
  }

  // endregion

  // region Clause addition

  /// Adds the empty clause: the problem is unsatisfiable.
  pub fn add_empty_clause(&mut self) {
    self.has_empty_clause = true;
    self.status = SolverStatus::Unsat;
  }

  /// Adds a unit clause. The literal is asserted at the current base level.
  pub fn add_unit_clause(&mut self, l: Lit) {
    debug_assert!(self.decision_level == self.base_level);
    match self.lit_value(l) {
      BVal::True => {}
      BVal::False => self.add_empty_clause(),
      _ => {
        self.assign_propagated(l, AnteTag::Unit, 0);
        self.units += 1;
      }
    }
  }

  pub fn add_binary_clause(&mut self, l1: Lit, l2: Lit) {
    self.bin_log.push((l1.raw(), l2.raw()));
    self.watch[l1.index()].push_binary(l2);
    self.watch[l2.index()].push_binary(l1);
    self.binaries += 1;
  }

  pub fn add_ternary_clause(&mut self, l1: Lit, l2: Lit, l3: Lit) {
    self.add_clause(&[l1, l2, l3]);
  }

  /// Adds a simplified clause: no duplicate, complementary, or assigned literals.
  pub fn add_clause(&mut self, lits: &[Lit]) {
    match lits.len() {
      0 => self.add_empty_clause(),
      1 => self.add_unit_clause(lits[0]),
      2 => self.add_binary_clause(lits[0], lits[1]),
      _ => {
        self.prepare_for_problem_clause();
        let cidx = self.pool.add_clause(lits, false);
        self.watch[lits[0].index()].push_clause(cidx);
        self.watch[lits[1].index()].push_clause(cidx);
      }
    }
  }

  /// Simplifies `lits` against the base-level assignment (drops false literals, detects
  /// satisfied and tautological clauses, removes duplicates) and adds the result.
  pub fn simplify_and_add_clause(&mut self, lits: &mut Vec<Lit>) {
    debug_assert!(self.decision_level == self.base_level);
    lits.sort_by_key(|l| l.raw());
    lits.dedup();

    let mut previous: Option<Lit> = None;
    for &l in lits.iter() {
      if self.lit_is_true(l) {
        return; // satisfied at the base level
      }
      if let Some(p) = previous {
        if Lit::are_opposite(p, l) {
          return; // tautology
        }
      }
      previous = Some(l);
    }
    lits.retain(|&l| !self.lit_is_false(l));
    self.add_clause(lits);
  }

  /// Learned clauses are parked at the end of the pool; adding a problem clause after a
  /// check requires dropping them so the `[problem | learned]` split stays valid.
  fn prepare_for_problem_clause(&mut self) {
    if self.pool.has_learned() {
      debug_assert!(self.decision_level == self.base_level);
      // Base assignments may cite learned clauses as antecedents; demote them to units
      // before their clauses disappear.
      for i in 0..self.stack.lit.len() {
        let v = self.stack.lit[i].var() as usize;
        if self.ante_tag[v] == AnteTag::Clause {
          self.ante_tag[v] = AnteTag::Unit;
          self.ante_data[v] = 0;
        }
      }
      self.pool.reset_learned();
      self.rebuild_watches();
    }
  }

  // endregion

  // region Propagation

  /// Boolean constraint propagation to fixpoint, or the first conflict.
  fn propagate(&mut self) -> Result<(), Conflict> {
    while (self.stack.prop_ptr as usize) < self.stack.lit.len() {
      let l = self.stack.lit[self.stack.prop_ptr as usize];
      self.stack.prop_ptr += 1;
      self.stats.propagations += 1;
      if let Err(conflict) = self.propagate_literal(l) {
        return Err(conflict);
      }
    }
    Ok(())
  }

  /// Examines every clause watching `not(l)` after `l` became true.
  fn propagate_literal(&mut self, l: Lit) -> Result<(), Conflict> {
    let neg = !l;
    let mut w = std::mem::take(&mut self.watch[neg.index()]);
    let data = &mut w.data;
    let mut read = 0usize;
    let mut write = 0usize;
    let mut result = Ok(());

    'records: while read < data.len() {
      let record = data[read];
      read += 1;

      match Watch::decode(record) {
        Err(other) => {
          // Binary clause {neg, other}.
          data[write] = record;
          write += 1;
          match self.lit_value(other) {
            BVal::True => {}
            BVal::False => {
              result = Err(Conflict::Binary(neg, other));
              break 'records;
            }
            _ => self.assign_propagated(other, AnteTag::Binary, neg.raw()),
          }
        }
        Ok(cidx) => {
          // Normalize so position 1 holds the false watched literal `neg`.
          if self.pool.lit(cidx, 0) == neg {
            self.pool.swap_lits(cidx, 0, 1);
          }
          let other = self.pool.lit(cidx, 0);
          if self.lit_value(other) == BVal::True {
            data[write] = record;
            write += 1;
            continue;
          }

          // Look for a non-false replacement among the unwatched literals.
          let len = self.pool.len(cidx);
          let mut replacement = None;
          for k in 2..len {
            if self.lit_value(self.pool.lit(cidx, k)) != BVal::False {
              replacement = Some(k);
              break;
            }
          }

          match replacement {
            Some(k) => {
              // Re-watch: the record moves to the new literal's vector.
              self.pool.swap_lits(cidx, 1, k);
              let new_watched = self.pool.lit(cidx, 1);
              self.watch[new_watched.index()].push_clause(cidx);
            }
            None if self.lit_value(other) == BVal::False => {
              data[write] = record;
              write += 1;
              result = Err(Conflict::Clause(cidx));
              break 'records;
            }
            None => {
              data[write] = record;
              write += 1;
              self.assign_propagated(other, AnteTag::Clause, cidx);
            }
          }
        }
      }
    }

    // Keep any unprocessed records (only on conflict exit).
    while read < data.len() {
      data[write] = data[read];
      write += 1;
      read += 1;
    }
    data.truncate(write);
    self.watch[neg.index()] = w;
    result
  }

  // endregion

  // region Conflict analysis

  /// The literals of the clause that propagated `x`, excluding `x`'s own literal.
  fn reason_lits(&mut self, x: BVar) -> SmallVec<[Lit; 8]> {
    match self.ante_tag[x as usize] {
      AnteTag::Binary => {
        let other = Lit::from_raw(self.ante_data[x as usize]);
        let mut v = SmallVec::new();
        v.push(other);
        v
      }
      AnteTag::Clause => {
        let cidx = self.ante_data[x as usize];
        if self.pool.is_learned(cidx) {
          self.bump_clause_activity(cidx);
        }
        self.pool.lits(cidx).filter(|l| l.var() != x).collect()
      }
      _ => SmallVec::new(),
    }
  }

  fn conflict_lits(&self, conflict: &Conflict) -> SmallVec<[Lit; 8]> {
    match conflict {
      Conflict::Binary(a, b) => {
        let mut v = SmallVec::new();
        v.push(*a);
        v.push(*b);
        v
      }
      Conflict::Clause(cidx) => self.pool.lits(*cidx).collect(),
    }
  }

  /// First-UIP analysis. Learns a clause, backtracks, and asserts the learned literal.
  fn resolve_conflict(&mut self, conflict: Conflict) {
    debug_assert!(self.decision_level > self.base_level);
    if let Conflict::Clause(cidx) = conflict {
      if self.pool.is_learned(cidx) {
        self.bump_clause_activity(cidx);
      }
    }

    let mut learned: Vec<Lit> = vec![TRUE_LIT]; // slot 0 is the asserting literal
    let mut to_clear: Vec<BVar> = Vec::new();
    let mut path_count = 0usize;
    let mut index = self.stack.lit.len();

    let mut pending = self.conflict_lits(&conflict);
    let uip = loop {
      for &q in pending.iter() {
        let v = q.var();
        if !self.seen[v as usize] && self.level[v as usize] > self.base_level {
          self.seen[v as usize] = true;
          to_clear.push(v);
          self.heap.bump(v);
          if self.level[v as usize] == self.decision_level {
            path_count += 1;
          } else {
            learned.push(q);
          }
        }
      }

      // Walk the trail down to the next marked literal.
      loop {
        index -= 1;
        if self.seen[self.stack.lit[index].var() as usize] {
          break;
        }
      }
      let p = self.stack.lit[index];
      path_count -= 1;
      if path_count == 0 {
        break p;
      }
      pending = self.reason_lits(p.var());
    };
    learned[0] = !uip;

    // Self-subsumption minimization: drop any literal whose antecedent is entirely
    // marked or below the base level.
    let keep: Vec<Lit> = learned[1..]
      .iter()
      .copied()
      .filter(|&q| !self.literal_is_redundant(q))
      .collect();
    let removed = learned.len() - 1 - keep.len();
    self.stats.subsumed_literals += removed as u64;
    learned.truncate(1);
    learned.extend(keep);

    for v in to_clear {
      self.seen[v as usize] = false;
    }

    // Backtrack to the second-highest level among the learned literals.
    let backjump = if learned.len() == 1 {
      self.base_level
    } else {
      let mut best = 1;
      for i in 2..learned.len() {
        if self.level[learned[i].var() as usize] > self.level[learned[best].var() as usize] {
          best = i;
        }
      }
      learned.swap(1, best);
      self.level[learned[1].var() as usize]
    };
    self.backtrack(backjump);
    self.install_learned_clause(&learned);

    self.heap.decay_activities();
    self.cla_inc *= self.inv_cla_decay;
  }

  fn literal_is_redundant(&self, q: Lit) -> bool {
    let x = q.var() as usize;
    match self.ante_tag[x] {
      AnteTag::Binary => {
        let other = Lit::from_raw(self.ante_data[x]);
        let v = other.var() as usize;
        self.seen[v] || self.level[v] <= self.base_level
      }
      AnteTag::Clause => {
        let cidx = self.ante_data[x];
        self.pool.lits(cidx).all(|l| {
          let v = l.var() as usize;
          v == x || self.seen[v] || self.level[v] <= self.base_level
        })
      }
      _ => false,
    }
  }

  /// Stores a learned clause and asserts its first literal.
  fn install_learned_clause(&mut self, lits: &[Lit]) {
    match lits.len() {
      1 => {
        self.assign_propagated(lits[0], AnteTag::Unit, 0);
        self.units += 1;
      }
      2 => {
        self.add_binary_clause(lits[0], lits[1]);
        self.assign_propagated(lits[0], AnteTag::Binary, lits[1].raw());
      }
      _ => {
        let cidx = self.pool.add_clause(lits, true);
        self.pool.set_activity(cidx, self.cla_inc);
        self.watch[lits[0].index()].push_clause(cidx);
        self.watch[lits[1].index()].push_clause(cidx);
        self.assign_propagated(lits[0], AnteTag::Clause, cidx);
      }
    }
  }

  fn bump_clause_activity(&mut self, cidx: Cidx) {
    let act = self.pool.activity(cidx) + self.cla_inc;
    self.pool.set_activity(cidx, act);
    if act > CLAUSE_ACTIVITY_THRESHOLD {
      let scale = 1.0 / CLAUSE_ACTIVITY_THRESHOLD;
      let mut idx = self.pool.learned_base();
      while let Some(c) = self.pool.next_clause(idx) {
        let a = self.pool.activity(c);
        self.pool.set_activity(c, a * scale);
        idx = c + ((self.pool.len(c) + 2 + 3) & !3);
      }
      self.cla_inc *= scale;
    }
  }

  // endregion

  // region Decisions

  #[inline(always)]
  fn next_random(&mut self) -> u32 {
    self.prng = self.prng.wrapping_mul(PRNG_MULTIPLIER).wrapping_add(PRNG_INCREMENT);
    self.prng
  }

  /// Picks and assigns a decision variable; returns false when every variable is
  /// assigned (the assignment is a model).
  fn decide(&mut self, random_threshold: u32) -> bool {
    let mut candidate: Option<BVar> = None;

    if self.nvars > 1 && random_threshold > 0 && self.next_random() < random_threshold {
      let x = 1 + self.next_random() % (self.nvars - 1);
      if !self.var_is_assigned(x) {
        candidate = Some(x);
        self.stats.random_decisions += 1;
      }
    }

    if candidate.is_none() {
      while let Some(x) = self.heap.pop_max() {
        if !self.var_is_assigned(x) {
          candidate = Some(x);
          break;
        }
      }
    }

    if candidate.is_none() {
      // Sweep the tail of variables that may never have entered the heap.
      let mut x = self.heap.vmax();
      while x < self.nvars {
        if !self.var_is_assigned(x) {
          candidate = Some(x);
          break;
        }
        x += 1;
      }
      self.heap.advance_vmax(x.min(self.nvars));
    }

    match candidate {
      None => false,
      Some(x) => {
        self.stats.decisions += 1;
        self.decision_level += 1;
        self.stack.level_index.push(self.stack.lit.len() as u32);
        let preferred = self.var_value(x).prefers_true();
        self.assign_decision(Lit::of(x, preferred));
        true
      }
    }
  }

  // endregion

  // region Search

  /// Runs the CDCL search. On `Sat` the satisfying assignment stays in place for model
  /// extraction; on `Unsat` the empty clause was derived at the base level.
  pub fn solve(&mut self, params: &SearchParams) -> SolverStatus {
    if self.has_empty_clause {
      self.status = SolverStatus::Unsat;
      return self.status;
    }

    self.prng = params.seed;
    self.heap.set_decay(params.var_decay);
    self.inv_cla_decay = 1.0 / params.clause_decay;
    let random_threshold = (params.randomness as f64 * 4294967296.0) as u32;
    self.stats.starts += 1;
    self.reduce_threshold = self
      .reduce_threshold
      .max(self.pool.num_prob_clauses / 4)
      .max(MIN_REDUCE_THRESHOLD);
    self.stop_flag.store(false, Ordering::Relaxed);

    let mut restart_number = 0u32;
    let mut conflicts_this_restart = 0u64;
    let mut restart_interval = luby(1) as u64 * params.luby_unit as u64;

    loop {
      match self.propagate() {
        Err(conflict) => {
          self.stats.conflicts += 1;
          conflicts_this_restart += 1;
          if self.decision_level == self.base_level {
            self.add_empty_clause();
            self.status = SolverStatus::Unsat;
            return self.status;
          }
          self.resolve_conflict(conflict);
          if self.stop_flag.load(Ordering::Relaxed) {
            self.status = SolverStatus::Interrupted;
            return self.status;
          }
        }
        Ok(()) => {
          if conflicts_this_restart >= restart_interval {
            restart_number += 1;
            conflicts_this_restart = 0;
            restart_interval = luby(restart_number + 1) as u64 * params.luby_unit as u64;
            self.stats.starts += 1;
            self.backtrack(self.base_level);
            satyr_abs::trace!(restart_number, conflicts = self.stats.conflicts, "restart");

            if self.stop_flag.load(Ordering::Relaxed) {
              self.status = SolverStatus::Interrupted;
              return self.status;
            }
            // Deleting or shortening problem clauses is only permanent knowledge when
            // no frame is open, so simplification runs at level 0 proper.
            if self.base_level == 0 && self.stack.lit.len() as u32 > self.last_simplify_top {
              self.simplify_clause_database();
              if self.has_empty_clause {
                self.status = SolverStatus::Unsat;
                return self.status;
              }
            }
            if self.pool.num_learned_clauses > self.reduce_threshold {
              self.reduce_learned_clause_set();
            }
            continue;
          }
          if !self.decide(random_threshold) {
            self.status = SolverStatus::Sat;
            return self.status;
          }
        }
      }
    }
  }

  /// Propagates the base-level queue; used by the context after adding assertions.
  /// Returns false if a contradiction is found.
  pub fn propagate_assertions(&mut self) -> bool {
    debug_assert!(self.decision_level == self.base_level);
    if self.has_empty_clause {
      return false;
    }
    match self.propagate() {
      Ok(()) => true,
      Err(_) => {
        self.add_empty_clause();
        false
      }
    }
  }

  // endregion

  // region Simplification and reduction

  fn rebuild_watches(&mut self) {
    for w in self.watch.iter_mut() {
      w.clear();
    }
    for &(a, b) in self.bin_log.iter() {
      if (a, b) == BIN_TOMBSTONE {
        continue;
      }
      let (a, b) = (Lit::from_raw(a), Lit::from_raw(b));
      self.watch[a.index()].push_binary(b);
      self.watch[b.index()].push_binary(a);
    }
    let mut idx = 0;
    while let Some(cidx) = self.pool.next_clause(idx) {
      let l0 = self.pool.lit(cidx, 0);
      let l1 = self.pool.lit(cidx, 1);
      self.watch[l0.index()].push_clause(cidx);
      self.watch[l1.index()].push_clause(cidx);
      idx = cidx + ((self.pool.len(cidx) + 2 + 3) & !3);
    }
  }

  /// Level-zero database simplification: deletes satisfied clauses, strips false
  /// literals, and rebuilds the watch vectors. Must run at the base level with the
  /// propagation queue empty.
  pub fn simplify_clause_database(&mut self) {
    debug_assert!(self.decision_level == 0 && self.base_level == 0);
    debug_assert!(self.stack.prop_ptr as usize == self.stack.lit.len());
    self.stats.simplify_calls += 1;
    self.stats.literals_before_simpl += self.pool.num_prob_literals as u64 + self.pool.num_learned_literals as u64;

    // Base assignments become units; their clause antecedents may be deleted below.
    for i in 0..self.stack.lit.len() {
      let v = self.stack.lit[i].var() as usize;
      if self.ante_tag[v] != AnteTag::Decision {
        self.ante_tag[v] = AnteTag::Unit;
        self.ante_data[v] = 0;
      }
    }

    // Binary clauses: drop satisfied ones. At fixpoint a binary clause cannot have a
    // false literal without the other being true.
    for i in 0..self.bin_log.len() {
      let entry = self.bin_log[i];
      if entry == BIN_TOMBSTONE {
        continue;
      }
      let a = Lit::from_raw(entry.0);
      let b = Lit::from_raw(entry.1);
      if self.lit_is_true(a) || self.lit_is_true(b) {
        self.bin_log[i] = BIN_TOMBSTONE;
        self.binaries -= 1;
      }
    }

    // Pool clauses: delete satisfied, shrink false literals away.
    let mut idx = 0;
    let mut units: Vec<Lit> = Vec::new();
    while let Some(cidx) = self.pool.next_clause(idx) {
      let len = self.pool.len(cidx);
      idx = cidx + ((len + 2 + 3) & !3);

      let satisfied = self.pool.lits(cidx).any(|l| self.lit_is_true(l));
      if satisfied {
        if self.pool.is_learned(cidx) {
          self.stats.learned_clauses_deleted += 1;
        } else {
          self.stats.prob_clauses_deleted += 1;
        }
        self.pool.delete_clause(cidx);
        continue;
      }

      let false_count = self.pool.lits(cidx).filter(|&l| self.lit_is_false(l)).count() as u32;
      if false_count == 0 {
        continue;
      }
      self.stats.subsumed_literals += false_count as u64;
      let keep: Vec<Lit> = self.pool.lits(cidx).filter(|&l| !self.lit_is_false(l)).collect();
      match keep.len() {
        0 => {
          self.add_empty_clause();
          return;
        }
        1 => {
          units.push(keep[0]);
          self.pool.delete_clause(cidx);
        }
        2 => {
          self.bin_log.push((keep[0].raw(), keep[1].raw()));
          self.binaries += 1;
          self.pool.delete_clause(cidx);
        }
        _ => {
          // Move the surviving literals to the front, then shrink in place.
          for (i, &l) in keep.iter().enumerate() {
            let pos = (0..len).find(|&k| self.pool.lit(cidx, k) == l).unwrap();
            self.pool.swap_lits(cidx, i as u32, pos.max(i as u32));
          }
          self.pool.shrink_clause(cidx, keep.len() as u32);
        }
      }
    }

    self.rebuild_watches();
    for l in units {
      self.add_unit_clause(l);
    }
    let _ = self.propagate_assertions();
    self.last_simplify_top = self.stack.lit.len() as u32;
  }

  /// Halves the learned pool, deleting the lowest-activity clauses that are not
  /// currently the reason for an assignment. Runs at the base level after a restart.
  pub fn reduce_learned_clause_set(&mut self) {
    debug_assert!(self.decision_level == self.base_level);
    self.stats.reduce_calls += 1;

    let mut learned: Vec<(Cidx, f32)> = Vec::with_capacity(self.pool.num_learned_clauses as usize);
    let mut idx = self.pool.learned_base();
    while let Some(cidx) = self.pool.next_clause(idx) {
      learned.push((cidx, self.pool.activity(cidx)));
      idx = cidx + ((self.pool.len(cidx) + 2 + 3) & !3);
    }

    learned.sort_by_key(|&(_, act)| OrderedFloat(act));
    let target = learned.len() / 2;
    let mut deleted = 0usize;
    for &(cidx, _) in learned.iter() {
      if deleted >= target {
        break;
      }
      if self.clause_is_reason(cidx) {
        continue;
      }
      self.pool.delete_clause(cidx);
      self.stats.learned_clauses_deleted += 1;
      deleted += 1;
    }

    self.rebuild_watches();
    self.reduce_threshold += self.reduce_threshold / 4;
    satyr_abs::debug!(deleted, remaining = self.pool.num_learned_clauses, "reduced learned clauses");
  }

  fn clause_is_reason(&self, cidx: Cidx) -> bool {
    let l0 = self.pool.lit(cidx, 0);
    let v = l0.var() as usize;
    self.lit_is_true(l0) && self.ante_tag[v] == AnteTag::Clause && self.ante_data[v] == cidx
  }

  // endregion

  // region Frames (push/pop)

  /// Opens a frame: a pseudo decision level that `pop` unwinds. Learned clauses are
  /// dropped first so the snapshot boundary is a clean problem-clause offset.
  pub fn push(&mut self) {
    debug_assert!(self.decision_level == self.base_level);
    self.prepare_for_problem_clause();
    self.frames.push(CoreSnapshot {
      nvars: self.nvars,
      pool_size: self.pool.size(),
      pool_learned: self.pool.learned_base(),
      pool_has_learned: self.pool.has_learned(),
      bin_log_len: self.bin_log.len() as u32,
      units: self.units,
      binaries: self.binaries,
      num_prob_clauses: self.pool.num_prob_clauses,
      num_prob_literals: self.pool.num_prob_literals,
    });
    self.base_level += 1;
    self.decision_level += 1;
    self.stack.level_index.push(self.stack.lit.len() as u32);
  }

  /// Closes the current frame: unwinds its assignments, drops its variables and
  /// clauses (including all learned clauses acquired since the push), and rebuilds the
  /// watch vectors.
  pub fn pop(&mut self) {
    let snapshot = self.frames.pop().expect("pop without matching push");
    self.backtrack(self.base_level - 1);
    self.base_level -= 1;

    self.pool.truncate(snapshot.pool_size, snapshot.pool_learned, snapshot.pool_has_learned);
    self.pool.num_prob_clauses = snapshot.num_prob_clauses;
    self.pool.num_prob_literals = snapshot.num_prob_literals;
    self.pool.num_learned_clauses = 0;
    self.pool.num_learned_literals = 0;
    self.bin_log.truncate(snapshot.bin_log_len as usize);
    self.units = snapshot.units;
    self.binaries = snapshot.binaries;

    let nvars = snapshot.nvars;
    self.nvars = nvars;
    self.value.truncate(nvars as usize);
    self.ante_tag.truncate(nvars as usize);
    self.ante_data.truncate(nvars as usize);
    self.level.truncate(nvars as usize);
    self.watch.truncate(2 * nvars as usize);
    self.seen.truncate(nvars as usize);
    self.heap.shrink(nvars);

    self.rebuild_watches();
    self.has_empty_clause = false;
    self.status = SolverStatus::Unknown;
    self.last_simplify_top = self.last_simplify_top.min(self.stack.lit.len() as u32);
  }

  // endregion

  // region Test support

  /// Structural watch soundness: every pool clause is watched on its first two
  /// literals, and every live binary clause has its two inlined records.
  pub fn check_watch_invariant(&self) -> bool {
    let mut idx = 0;
    while let Some(cidx) = self.pool.next_clause(idx) {
      for i in 0..2 {
        let l = self.pool.lit(cidx, i);
        if !self.watch[l.index()].data.contains(&cidx) {
          return false;
        }
      }
      idx = cidx + ((self.pool.len(cidx) + 2 + 3) & !3);
    }
    for &(a, b) in self.bin_log.iter() {
      if (a, b) == BIN_TOMBSTONE {
        continue;
      }
      let (a, b) = (Lit::from_raw(a), Lit::from_raw(b));
      let rec_b = (b.raw() << 1) | 1;
      let rec_a = (a.raw() << 1) | 1;
      if !self.watch[a.index()].data.contains(&rec_b) || !self.watch[b.index()].data.contains(&rec_a) {
        return false;
      }
    }
    true
  }

  /// Propagation completeness: at a fixpoint no clause has exactly one unassigned
  /// literal with all others false.
  pub fn check_propagation_fixpoint(&self) -> bool {
    let mut idx = 0;
    while let Some(cidx) = self.pool.next_clause(idx) {
      let any_true = self.pool.lits(cidx).any(|l| self.lit_is_true(l));
      if !any_true {
        let unassigned = self.pool.lits(cidx).filter(|&l| self.lit_value(l).is_unassigned()).count();
        if unassigned <= 1 {
          return false;
        }
      }
      idx = cidx + ((self.pool.len(cidx) + 2 + 3) & !3);
    }
    for &(a, b) in self.bin_log.iter() {
      if (a, b) == BIN_TOMBSTONE {
        continue;
      }
      let (a, b) = (Lit::from_raw(a), Lit::from_raw(b));
      if !self.lit_is_true(a) && !self.lit_is_true(b) {
        let unassigned = [a, b].iter().filter(|&&l| self.lit_value(l).is_unassigned()).count();
        if unassigned <= 1 {
          return false;
        }
      }
    }
    true
  }

  /// No variable is assigned above the current decision level, and the level markers
  /// are consistent with the stack.
  pub fn check_backtrack_state(&self) -> bool {
    for x in 1..self.nvars {
      if self.var_is_assigned(x) && self.level[x as usize] > self.decision_level {
        return false;
      }
    }
    self.stack.level_index.len() as u32 == self.decision_level + 1
  }

  // endregion
}

impl Default for SatSolver {
  fn default() -> Self {
    Self::new()
  }
}

/// The Luby sequence: 1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8, ...
fn luby(i: u32) -> u32 {
  debug_assert!(i >= 1);
  let mut x = i - 1;
  let mut size = 1u32;
  let mut seq = 0u32;
  while size < x + 1 {
    seq += 1;
    size = 2 * size + 1;
  }
  while size - 1 != x {
    size = (size - 1) / 2;
    seq -= 1;
    x %= size;
  }
  1 << seq
}
