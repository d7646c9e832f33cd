/*!

The Boolean gate manager: hash-consed Tseitin encodings of `and`, `or`, `xor`, and
if-then-else over SAT-core literals.

Every gate constructor folds constants, normalizes operand order and polarity, and
consults a structural cache so that one logical gate is encoded at most once. Gate
clauses go through the simplifying clause adder, so operands that are already fixed at
the base level shrink the encoding instead of corrupting the watch invariant.

*/

use satyr_abs::HashMap;

use crate::core::sat::{Lit, SatSolver, FALSE_LIT, TRUE_LIT};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
enum GateKey {
  /// Operands ordered by raw encoding.
  And(Lit, Lit),
  /// Operands positive, ordered by variable.
  Xor(Lit, Lit),
  /// Condition and then-branch positive.
  Ite(Lit, Lit, Lit),
}

#[derive(Default)]
pub struct GateManager {
  cache: HashMap<GateKey, Lit>,
}

impl GateManager {
  pub fn new() -> Self {
    Self::default()
  }

  fn fresh(&mut self, core: &mut SatSolver) -> Lit {
    Lit::pos(core.new_var())
  }

  fn add(&mut self, core: &mut SatSolver, lits: &[Lit]) {
    let mut v = lits.to_vec();
    core.simplify_and_add_clause(&mut v);
  }

  /// `x = a AND b`.
  pub fn and2(&mut self, core: &mut SatSolver, a: Lit, b: Lit) -> Lit {
    if a == FALSE_LIT || b == FALSE_LIT || Lit::are_opposite(a, b) {
      return FALSE_LIT;
    }
    if a == TRUE_LIT || a == b {
      return b;
    }
    if b == TRUE_LIT {
      return a;
    }

    let (a, b) = if a.raw() <= b.raw() { (a, b) } else { (b, a) };
    let key = GateKey::And(a, b);
    if let Some(&x) = self.cache.get(&key) {
      return x;
    }
    let x = self.fresh(core);
    self.add(core, &[!x, a]);
    self.add(core, &[!x, b]);
    self.add(core, &[x, !a, !b]);
    self.cache.insert(key, x);
    x
  }

  /// `x = a OR b`, derived by De Morgan from the AND gate.
  #[inline(always)]
  pub fn or2(&mut self, core: &mut SatSolver, a: Lit, b: Lit) -> Lit {
    !self.and2(core, !a, !b)
  }

  /// `x = a XOR b`.
  pub fn xor2(&mut self, core: &mut SatSolver, a: Lit, b: Lit) -> Lit {
    if a == TRUE_LIT {
      return !b;
    }
    if a == FALSE_LIT {
      return b;
    }
    if b == TRUE_LIT {
      return !a;
    }
    if b == FALSE_LIT {
      return a;
    }
    if a == b {
      return FALSE_LIT;
    }
    if Lit::are_opposite(a, b) {
      return TRUE_LIT;
    }

    // xor is polarity-insensitive up to the output sign.
    let sign = (a.sign() ^ b.sign()) != 0;
    let a0 = Lit::pos(a.var());
    let b0 = Lit::pos(b.var());
    let (a0, b0) = if a0.var() <= b0.var() { (a0, b0) } else { (b0, a0) };

    let key = GateKey::Xor(a0, b0);
    let x = match self.cache.get(&key) {
      Some(&x) => x,
      None => {
        let x = self.fresh(core);
        self.add(core, &[!x, a0, b0]);
        self.add(core, &[!x, !a0, !b0]);
        self.add(core, &[x, !a0, b0]);
        self.add(core, &[x, a0, !b0]);
        self.cache.insert(key, x);
        x
      }
    };
    if sign {
      !x
    } else {
      x
    }
  }

  /// `x = (a == b)` for Booleans.
  #[inline(always)]
  pub fn iff(&mut self, core: &mut SatSolver, a: Lit, b: Lit) -> Lit {
    !self.xor2(core, a, b)
  }

  /// `x = if c then a else b`.
  pub fn ite(&mut self, core: &mut SatSolver, c: Lit, a: Lit, b: Lit) -> Lit {
    if c == TRUE_LIT {
      return a;
    }
    if c == FALSE_LIT {
      return b;
    }
    if a == b {
      return a;
    }
    if Lit::are_opposite(a, b) {
      // (ite c a ~a) is (c == a).
      return self.iff(core, c, a);
    }
    if a == TRUE_LIT {
      return self.or2(core, c, b);
    }
    if a == FALSE_LIT {
      return self.and2(core, !c, b);
    }
    if b == TRUE_LIT {
      return self.or2(core, !c, a);
    }
    if b == FALSE_LIT {
      return self.and2(core, c, a);
    }

    // Normalize: condition positive, then-branch positive.
    if !c.is_pos() {
      return self.ite(core, !c, b, a);
    }
    if !a.is_pos() {
      return !self.ite(core, c, !a, !b);
    }

    let key = GateKey::Ite(c, a, b);
    if let Some(&x) = self.cache.get(&key) {
      return x;
    }
    let x = self.fresh(core);
    self.add(core, &[!x, !c, a]);
    self.add(core, &[!x, c, b]);
    self.add(core, &[x, !c, !a]);
    self.add(core, &[x, c, !b]);
    self.cache.insert(key, x);
    x
  }

  /// n-ary conjunction (left fold).
  pub fn and_n(&mut self, core: &mut SatSolver, lits: &[Lit]) -> Lit {
    let mut acc = TRUE_LIT;
    for &l in lits {
      acc = self.and2(core, acc, l);
      if acc == FALSE_LIT {
        break;
      }
    }
    acc
  }

  /// n-ary disjunction (left fold).
  pub fn or_n(&mut self, core: &mut SatSolver, lits: &[Lit]) -> Lit {
    let mut acc = FALSE_LIT;
    for &l in lits {
      acc = self.or2(core, acc, l);
      if acc == TRUE_LIT {
        break;
      }
    }
    acc
  }

  /// n-ary exclusive or (left fold).
  pub fn xor_n(&mut self, core: &mut SatSolver, lits: &[Lit]) -> Lit {
    let mut acc = FALSE_LIT;
    for &l in lits {
      acc = self.xor2(core, acc, l);
    }
    acc
  }

  /// Drops cache entries mentioning variables at or above `nvars`. Called after a
  /// solver frame pop invalidates those variables.
  pub fn remove_dead(&mut self, nvars: u32) {
    self.cache.retain(|key, &mut out| {
      let live = |l: Lit| l.var() < nvars;
      live(out)
        && match *key {
          GateKey::And(a, b) | GateKey::Xor(a, b) => live(a) && live(b),
          GateKey::Ite(c, a, b) => live(c) && live(a) && live(b),
        }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::sat::{SearchParams, SolverStatus};

  /// Exhaustively checks a 2-input gate against a reference function by solving.
  fn check_gate2(build: impl Fn(&mut GateManager, &mut SatSolver, Lit, Lit) -> Lit, reference: impl Fn(bool, bool) -> bool) {
    for va in [false, true] {
      for vb in [false, true] {
        let mut core = SatSolver::new();
        let mut gates = GateManager::new();
        let a = Lit::pos(core.new_var());
        let b = Lit::pos(core.new_var());
        let x = build(&mut gates, &mut core, a, b);
        core.add_unit_clause(if va { a } else { !a });
        core.add_unit_clause(if vb { b } else { !b });
        assert_eq!(core.solve(&SearchParams::default()), SolverStatus::Sat);
        assert_eq!(core.lit_is_true(x), reference(va, vb), "inputs {va} {vb}");
      }
    }
  }

  #[test]
  fn and_gate_truth_table() {
    check_gate2(|g, c, a, b| g.and2(c, a, b), |x, y| x && y);
  }

  #[test]
  fn or_gate_truth_table() {
    check_gate2(|g, c, a, b| g.or2(c, a, b), |x, y| x || y);
  }

  #[test]
  fn xor_gate_truth_table() {
    check_gate2(|g, c, a, b| g.xor2(c, a, b), |x, y| x != y);
  }

  #[test]
  fn iff_gate_truth_table() {
    check_gate2(|g, c, a, b| g.iff(c, a, b), |x, y| x == y);
  }

  #[test]
  fn constant_folding() {
    let mut core = SatSolver::new();
    let mut gates = GateManager::new();
    let a = Lit::pos(core.new_var());

    assert_eq!(gates.and2(&mut core, TRUE_LIT, a), a);
    assert_eq!(gates.and2(&mut core, FALSE_LIT, a), FALSE_LIT);
    assert_eq!(gates.and2(&mut core, a, !a), FALSE_LIT);
    assert_eq!(gates.or2(&mut core, a, !a), TRUE_LIT);
    assert_eq!(gates.xor2(&mut core, a, a), FALSE_LIT);
    assert_eq!(gates.xor2(&mut core, TRUE_LIT, a), !a);
    assert_eq!(gates.ite(&mut core, TRUE_LIT, a, FALSE_LIT), a);
    assert_eq!(gates.ite(&mut core, a, TRUE_LIT, FALSE_LIT), a);
  }

  #[test]
  fn structural_sharing() {
    let mut core = SatSolver::new();
    let mut gates = GateManager::new();
    let a = Lit::pos(core.new_var());
    let b = Lit::pos(core.new_var());

    let x1 = gates.and2(&mut core, a, b);
    let x2 = gates.and2(&mut core, b, a);
    assert_eq!(x1, x2);

    // xor polarity normalization: (~a xor b) is the negation of (a xor b).
    let y1 = gates.xor2(&mut core, a, b);
    let y2 = gates.xor2(&mut core, !a, b);
    assert_eq!(y2, !y1);

    let before = core.nvars();
    let _ = gates.and2(&mut core, a, b);
    assert_eq!(core.nvars(), before);
  }
}
