/*!

The internalization table: a polarity-aware union-find over term indices.

Each class has a root. A root either is "not internalized yet" (no code), or carries the
object the class translates to: a SAT-core literal for Boolean classes, a bit-vector
theory variable otherwise. A variable-elimination substitution `x := t` points `x`'s
class at `t`'s root.

Polarity travels through edges: if `x`'s positive occurrence maps to the occurrence `u`,
then `x`'s negative occurrence maps to `u`'s opposite, and a literal code stored for a
root always describes the root's positive occurrence.

Every mutation is logged on a trail so the context can (a) roll back a failed assertion
atomically and (b) truncate to a push-frame snapshot on pop. `find` therefore performs no
path compression. Cycles are forbidden: [`InternTable::reaches`] is the occurs-check used
before a substitution is accepted.

*/

use satyr_abs::NatSet;

use crate::{
  api::Thvar,
  core::{
    bvarith::CONST_IDX,
    sat::Lit,
    term::{Term, TermDesc, TermTable},
  },
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InternCode {
  /// The class's positive occurrence is this core literal.
  Literal(Lit),
  /// The class is this bit-vector theory variable.
  Thvar(Thvar),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum TrailEntry {
  /// The index was a fresh root and got a parent edge.
  Parent(u32),
  /// The index was an uncoded root and got a code.
  Code(u32),
}

pub struct InternTable {
  /// `parent[i]` is the occurrence that `i`'s positive occurrence maps to; a root maps
  /// to itself. Indices beyond the vector are implicit roots.
  parent: Vec<Term>,
  code: Vec<Option<InternCode>>,
  trail: Vec<TrailEntry>,
}

impl InternTable {
  pub fn new() -> Self {
    InternTable {
      parent: Vec::new(),
      code: Vec::new(),
      trail: Vec::new(),
    }
  }

  fn ensure(&mut self, idx: u32) {
    let needed = (idx + 1) as usize;
    if self.parent.len() < needed {
      for i in self.parent.len()..needed {
        self.parent.push(Term::positive(i as u32));
        self.code.push(None);
      }
    }
  }

  #[inline(always)]
  fn parent_of(&self, idx: u32) -> Term {
    match self.parent.get(idx as usize) {
      Some(&p) => p,
      None => Term::positive(idx),
    }
  }

  /// The root occurrence of `t`'s class, with `t`'s polarity applied.
  pub fn get_root(&self, t: Term) -> Term {
    let mut current = t;
    loop {
      let idx = current.index();
      let p = self.parent_of(idx);
      if p == Term::positive(idx) {
        return current;
      }
      current = p.with_sign(current.is_positive());
    }
  }

  /// Whether `t`'s index is the root of its class.
  #[inline(always)]
  pub fn is_root(&self, t: Term) -> bool {
    self.parent_of(t.index()) == Term::positive(t.index())
  }

  /// The code of the class of `t`, polarity-adjusted for literals. `t` must be a root
  /// occurrence (as returned by [`InternTable::get_root`]).
  pub fn root_code(&self, t: Term) -> Option<InternCode> {
    debug_assert!(self.is_root(t));
    match self.code.get(t.index() as usize).copied().flatten() {
      None => None,
      Some(InternCode::Literal(l)) => {
        let adjusted = if t.is_negative() { !l } else { l };
        Some(InternCode::Literal(adjusted))
      }
      Some(code @ InternCode::Thvar(_)) => {
        debug_assert!(t.is_positive());
        Some(code)
      }
    }
  }

  /// Maps the root occurrence `r` to the literal `l`. Stored for the positive
  /// occurrence, so mapping `r-` to `l` records `not(l)`.
  pub fn map_root_to_literal(&mut self, r: Term, l: Lit) {
    debug_assert!(self.is_root(r));
    let idx = r.index();
    self.ensure(idx);
    debug_assert!(self.code[idx as usize].is_none());
    let stored = if r.is_negative() { !l } else { l };
    self.code[idx as usize] = Some(InternCode::Literal(stored));
    self.trail.push(TrailEntry::Code(idx));
  }

  /// Maps the root occurrence `r` (positive, bit-vector) to a theory variable.
  pub fn map_root_to_thvar(&mut self, r: Term, v: Thvar) {
    debug_assert!(self.is_root(r) && r.is_positive());
    let idx = r.index();
    self.ensure(idx);
    debug_assert!(self.code[idx as usize].is_none());
    self.code[idx as usize] = Some(InternCode::Thvar(v));
    self.trail.push(TrailEntry::Code(idx));
  }

  /// Records the substitution `x := t`: `x`'s class is pointed at `t`'s root. `x` must
  /// be an uncoded root; polarity is folded into the edge.
  pub fn substitute(&mut self, x: Term, t: Term) {
    debug_assert!(self.is_root(x));
    debug_assert!(self.code.get(x.index() as usize).copied().flatten().is_none());
    let target = self.get_root(t);
    debug_assert!(target.index() != x.index(), "substitution cycle");
    let idx = x.index();
    self.ensure(idx);
    // parent edge is stored for the positive occurrence of x.
    self.parent[idx as usize] = target.with_sign(x.is_positive());
    self.trail.push(TrailEntry::Parent(idx));
  }

  /// Whether the term dag of `t` (followed through class roots) reaches index `x`. The
  /// occurs-check that keeps the table acyclic.
  pub fn reaches(&self, terms: &TermTable, t: Term, x: u32) -> bool {
    let mut visited = NatSet::new();
    let mut stack: Vec<u32> = Vec::new();

    let root = self.get_root(t);
    if root.index() == x {
      return true;
    }
    stack.push(root.index());
    while let Some(i) = stack.pop() {
      if !visited.insert(i as usize) {
        continue;
      }
      if i == x {
        return true;
      }
      let occ = Term::positive(i);
      if !terms.good_idx(i) {
        continue;
      }
      let push = |stack: &mut Vec<u32>, s: Term| {
        let r = self.get_root(s);
        stack.push(r.index());
      };
      match terms.desc(occ) {
        TermDesc::Integer(_) | TermDesc::BvConst64(_) | TermDesc::BvConst(_) => {}
        TermDesc::Composite(args) => {
          for &arg in args.iter() {
            push(&mut stack, arg);
          }
        }
        TermDesc::Select { arg, .. } => push(&mut stack, *arg),
        TermDesc::Poly64(p) => {
          for mono in &p.monos {
            if mono.var != CONST_IDX {
              push(&mut stack, Term::positive(mono.var));
            }
          }
        }
        TermDesc::Poly(p) => {
          for mono in &p.monos {
            if mono.var != CONST_IDX {
              push(&mut stack, Term::positive(mono.var));
            }
          }
        }
        TermDesc::PowerProduct(r) => {
          for &(base, _) in terms.pprods().prod(*r).factors() {
            push(&mut stack, base);
          }
        }
      }
    }
    false
  }

  /// Verifies cycle-freedom by walking every parent chain.
  pub fn is_acyclic(&self) -> bool {
    for start in 0..self.parent.len() as u32 {
      let mut seen = NatSet::new();
      let mut i = start;
      loop {
        if !seen.insert(i as usize) {
          return false;
        }
        let p = self.parent_of(i);
        if p == Term::positive(i) {
          break;
        }
        i = p.index();
      }
    }
    true
  }

  /// Marks every term index this table references (mapped roots and substitution
  /// endpoints) as a GC root in the term table.
  pub fn mark_referenced_terms(&self, terms: &mut TermTable) {
    for i in 0..self.parent.len() as u32 {
      let touched = self.parent[i as usize] != Term::positive(i) || self.code[i as usize].is_some();
      if touched && terms.good_idx(i) {
        terms.set_gc_mark(i);
        let root = self.get_root(Term::positive(i));
        if terms.good_idx(root.index()) {
          terms.set_gc_mark(root.index());
        }
      }
    }
  }

  /// Position of the trail, for snapshots.
  #[inline(always)]
  pub fn trail_mark(&self) -> usize {
    self.trail.len()
  }

  /// Rolls back every mutation past `mark`.
  pub fn undo_to(&mut self, mark: usize) {
    while self.trail.len() > mark {
      match self.trail.pop().unwrap() {
        TrailEntry::Parent(idx) => {
          self.parent[idx as usize] = Term::positive(idx);
        }
        TrailEntry::Code(idx) => {
          self.code[idx as usize] = None;
        }
      }
    }
  }
}

impl Default for InternTable {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn roots_and_polarity() {
    let mut intern = InternTable::new();
    let p = Term::positive(10);

    assert_eq!(intern.get_root(p), p);
    assert_eq!(intern.get_root(p.opposite()), p.opposite());

    intern.map_root_to_literal(p, Lit::pos(4));
    assert_eq!(intern.root_code(p), Some(InternCode::Literal(Lit::pos(4))));
    assert_eq!(
      intern.root_code(p.opposite()),
      Some(InternCode::Literal(Lit::neg(4)))
    );
  }

  #[test]
  fn negative_occurrence_mapping_stores_complement() {
    let mut intern = InternTable::new();
    let p = Term::positive(10);

    // "~p is mapped to l" means "p is mapped to ~l".
    intern.map_root_to_literal(p.opposite(), Lit::pos(4));
    assert_eq!(intern.root_code(p), Some(InternCode::Literal(Lit::neg(4))));
  }

  #[test]
  fn substitution_routes_through_roots() {
    let mut intern = InternTable::new();
    let x = Term::positive(5);
    let y = Term::positive(6);
    let z = Term::positive(7);

    intern.substitute(x, y);
    intern.substitute(y, z);
    assert_eq!(intern.get_root(x), z);
    assert_eq!(intern.get_root(x.opposite()), z.opposite());
    assert!(intern.is_acyclic());

    // Coding the final root is visible through the chain.
    intern.map_root_to_literal(z, Lit::pos(9));
    let root = intern.get_root(x.opposite());
    assert_eq!(intern.root_code(root), Some(InternCode::Literal(Lit::neg(9))));
  }

  #[test]
  fn polarity_folds_through_substitution_edges() {
    let mut intern = InternTable::new();
    let x = Term::positive(5);
    let y = Term::positive(6);

    // x := ~y, so ~x has root y+.
    intern.substitute(x, y.opposite());
    assert_eq!(intern.get_root(x), y.opposite());
    assert_eq!(intern.get_root(x.opposite()), y);
  }

  #[test]
  fn occurs_check_detects_self_reference() {
    let mut terms = TermTable::new();
    let tau = terms.types_mut().bitvector_type(8).unwrap();
    let x = terms.new_uninterpreted(tau);
    let y = terms.new_uninterpreted(tau);
    let shifted = terms.bvshl(y, x).unwrap();

    let intern = InternTable::new();
    assert!(intern.reaches(&terms, shifted, x.index()));
    assert!(intern.reaches(&terms, shifted, y.index()));
    let z = terms.new_uninterpreted(tau);
    assert!(!intern.reaches(&terms, shifted, z.index()));
  }

  #[test]
  fn occurs_check_follows_substitutions() {
    let mut terms = TermTable::new();
    let tau = terms.types_mut().bitvector_type(8).unwrap();
    let x = terms.new_uninterpreted(tau);
    let y = terms.new_uninterpreted(tau);
    let z = terms.new_uninterpreted(tau);
    let sum = terms.bvshl(z, z).unwrap();

    let mut intern = InternTable::new();
    // y := shl(z, z); then a term over y reaches z through the class edge.
    intern.substitute(y, sum);
    let over_y = terms.bvlshr(y, x).unwrap();
    assert!(intern.reaches(&terms, over_y, z.index()));
  }

  #[test]
  fn trail_rollback_restores_prior_state() {
    let mut intern = InternTable::new();
    let x = Term::positive(5);
    let y = Term::positive(6);
    let p = Term::positive(7);

    intern.substitute(x, y);
    let mark = intern.trail_mark();
    intern.map_root_to_literal(p, Lit::pos(3));
    intern.map_root_to_literal(y, Lit::pos(4));

    intern.undo_to(mark);
    assert_eq!(intern.root_code(p), None);
    assert_eq!(intern.root_code(y), None);
    // The pre-mark substitution survives.
    assert_eq!(intern.get_root(x), y);

    intern.undo_to(0);
    assert_eq!(intern.get_root(x), x);
  }

  #[test]
  fn bool_constant_roots() {
    // The true/false occurrences are their own roots; the context maps them eagerly.
    let mut intern = InternTable::new();
    let t = crate::core::term::TRUE_TERM;
    intern.map_root_to_literal(t, crate::core::sat::TRUE_LIT);
    assert_eq!(
      intern.root_code(intern.get_root(crate::core::term::FALSE_TERM)),
      Some(InternCode::Literal(crate::core::sat::FALSE_LIT))
    );
  }
}
