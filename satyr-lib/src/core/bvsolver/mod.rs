/*!

The default bit-vector solver: a bit-blaster.

A theory variable is a vector of core literals, low-order bit first. Constructors build
combinational circuits through the gate manager (ripple-carry adders, shift-add
multipliers, barrel shifters, comparator chains); division and remainder are constrained
by multiplier axioms rather than a combinational divider:

```text
y != 0  ->  q*y + r = x  (over the integers)  and  r < y
y == 0  ->  q = 1...1  and  r = x
```

which matches the SMT-LIB total semantics for zero divisors. Signed operations are
derived from the unsigned ones on magnitudes.

*/

use satyr_abs::{
  numeric::{BigUint, Zero},
  HashMap,
};

use crate::{
  api::{BvSolverInterface, Thvar},
  core::{
    bvarith::{BvConst, BvConst64, BvPoly, BvPoly64, CONST_IDX},
    gates::GateManager,
    sat::{Lit, SatSolver, FALSE_LIT, TRUE_LIT},
    term::PowerProduct,
  },
};

pub struct BitBlaster {
  /// Theory variable -> bit literals, low-order first.
  vars: Vec<Vec<Lit>>,
  gates: GateManager,
  /// Shared quotient/remainder pairs: `bvdiv` and `bvrem` on the same operands reuse
  /// one set of division axioms.
  udiv_cache: HashMap<(u32, u32), (Thvar, Thvar)>,
  model_ready: bool,
  frames: Vec<usize>,
}

impl BitBlaster {
  pub fn new() -> Self {
    BitBlaster {
      vars: Vec::new(),
      gates: GateManager::new(),
      udiv_cache: HashMap::default(),
      model_ready: false,
      frames: Vec::new(),
    }
  }

  fn alloc(&mut self, bits: Vec<Lit>) -> Thvar {
    debug_assert!(!bits.is_empty());
    self.vars.push(bits);
    Thvar((self.vars.len() - 1) as u32)
  }

  #[inline(always)]
  fn bits(&self, x: Thvar) -> Vec<Lit> {
    self.vars[x.index()].clone()
  }

  #[inline(always)]
  pub fn width(&self, x: Thvar) -> u32 {
    self.vars[x.index()].len() as u32
  }

  fn clause(&mut self, core: &mut SatSolver, lits: &[Lit]) {
    let mut v = lits.to_vec();
    core.simplify_and_add_clause(&mut v);
  }

  // region Circuits

  /// (sum, carry-out) of a full adder.
  fn full_adder(&mut self, core: &mut SatSolver, a: Lit, b: Lit, cin: Lit) -> (Lit, Lit) {
    let axb = self.gates.xor2(core, a, b);
    let sum = self.gates.xor2(core, axb, cin);
    let ab = self.gates.and2(core, a, b);
    let c_axb = self.gates.and2(core, cin, axb);
    let cout = self.gates.or2(core, ab, c_axb);
    (sum, cout)
  }

  /// Ripple-carry addition; returns the sum bits and the final carry.
  fn add_vec(&mut self, core: &mut SatSolver, a: &[Lit], b: &[Lit], cin: Lit) -> (Vec<Lit>, Lit) {
    debug_assert_eq!(a.len(), b.len());
    let mut carry = cin;
    let mut sum = Vec::with_capacity(a.len());
    for i in 0..a.len() {
      let (s, c) = self.full_adder(core, a[i], b[i], carry);
      sum.push(s);
      carry = c;
    }
    (sum, carry)
  }

  /// Two's complement negation: `add(not a, 1)`.
  fn neg_vec(&mut self, core: &mut SatSolver, a: &[Lit]) -> Vec<Lit> {
    let inverted: Vec<Lit> = a.iter().map(|&l| !l).collect();
    let zeros = vec![FALSE_LIT; a.len()];
    let (sum, _) = self.add_vec(core, &inverted, &zeros, TRUE_LIT);
    sum
  }

  /// Per-bit `if c then a else b`.
  fn mux_vec(&mut self, core: &mut SatSolver, c: Lit, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
    debug_assert_eq!(a.len(), b.len());
    (0..a.len()).map(|i| self.gates.ite(core, c, a[i], b[i])).collect()
  }

  /// Left shift by a constant amount; gate-free.
  fn shl_const(a: &[Lit], k: usize) -> Vec<Lit> {
    let n = a.len();
    (0..n).map(|i| if i < k { FALSE_LIT } else { a[i - k] }).collect()
  }

  /// Right shift by a constant amount, filling with `fill`.
  fn shr_const(a: &[Lit], k: usize, fill: Lit) -> Vec<Lit> {
    let n = a.len();
    (0..n).map(|i| if i + k < n { a[i + k] } else { fill }).collect()
  }

  /// `a * coeff` modulo `2^n`, by shift-and-add over the set bits of `coeff`.
  fn mul_const_bits(&mut self, core: &mut SatSolver, a: &[Lit], coeff_bit: impl Fn(usize) -> bool) -> Vec<Lit> {
    let n = a.len();
    let mut acc = vec![FALSE_LIT; n];
    for k in 0..n {
      if coeff_bit(k) {
        let shifted = Self::shl_const(a, k);
        let (sum, _) = self.add_vec(core, &acc, &shifted, FALSE_LIT);
        acc = sum;
      }
    }
    acc
  }

  /// `a * b` modulo `2^n`.
  fn mul_vec(&mut self, core: &mut SatSolver, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
    let n = a.len();
    let mut acc = vec![FALSE_LIT; n];
    for k in 0..n {
      let partial: Vec<Lit> = (0..n)
        .map(|i| {
          if i < k {
            FALSE_LIT
          } else {
            self.gates.and2(core, a[i - k], b[k])
          }
        })
        .collect();
      let (sum, _) = self.add_vec(core, &acc, &partial, FALSE_LIT);
      acc = sum;
    }
    acc
  }

  /// `a * b` as a full `2n`-bit product.
  fn mul_vec_full(&mut self, core: &mut SatSolver, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
    let n = a.len();
    let wide_a: Vec<Lit> = a.iter().copied().chain(std::iter::repeat(FALSE_LIT).take(n)).collect();
    let mut acc = vec![FALSE_LIT; 2 * n];
    for k in 0..n {
      let partial: Vec<Lit> = (0..2 * n)
        .map(|i| {
          if i < k || i - k >= 2 * n {
            FALSE_LIT
          } else {
            self.gates.and2(core, wide_a[i - k], b[k])
          }
        })
        .collect();
      let (sum, _) = self.add_vec(core, &acc, &partial, FALSE_LIT);
      acc = sum;
    }
    acc
  }

  /// Unsigned `a >= b`: a comparator chain from the low-order bit up, so the last
  /// (highest) differing bit decides.
  fn uge_lit(&mut self, core: &mut SatSolver, a: &[Lit], b: &[Lit]) -> Lit {
    debug_assert_eq!(a.len(), b.len());
    let mut ge = TRUE_LIT;
    for i in 0..a.len() {
      let eq = self.gates.iff(core, a[i], b[i]);
      ge = self.gates.ite(core, eq, ge, a[i]);
    }
    ge
  }

  fn eq_lit(&mut self, core: &mut SatSolver, a: &[Lit], b: &[Lit]) -> Lit {
    debug_assert_eq!(a.len(), b.len());
    let bits: Vec<Lit> = (0..a.len()).map(|i| self.gates.iff(core, a[i], b[i])).collect();
    self.gates.and_n(core, &bits)
  }

  /// Quotient/remainder pair constrained by the division axioms; cached per operand
  /// pair so `bvdiv` and `bvrem` share one circuit.
  fn unsigned_divmod(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> (Thvar, Thvar) {
    if let Some(&pair) = self.udiv_cache.get(&(x.0, y.0)) {
      return pair;
    }
    let xb = self.bits(x);
    let yb = self.bits(y);
    let n = xb.len();

    let qb: Vec<Lit> = (0..n).map(|_| Lit::pos(core.new_var())).collect();
    let rb: Vec<Lit> = (0..n).map(|_| Lit::pos(core.new_var())).collect();
    let divisor_nonzero = self.gates.or_n(core, &yb);

    // y != 0: q*y + r = x over the integers (no wraparound) and r < y.
    let product = self.mul_vec_full(core, &qb, &yb);
    for &high_bit in product.iter().skip(n) {
      self.clause(core, &[!divisor_nonzero, !high_bit]);
    }
    let (sum, carry) = self.add_vec(core, &product[..n], &rb, FALSE_LIT);
    self.clause(core, &[!divisor_nonzero, !carry]);
    for i in 0..n {
      let same = self.gates.iff(core, sum[i], xb[i]);
      self.clause(core, &[!divisor_nonzero, same]);
    }
    let r_ge_y = self.uge_lit(core, &rb, &yb);
    self.clause(core, &[!divisor_nonzero, !r_ge_y]);

    // y == 0: q = all ones, r = x.
    for i in 0..n {
      self.clause(core, &[divisor_nonzero, qb[i]]);
      let same = self.gates.iff(core, rb[i], xb[i]);
      self.clause(core, &[divisor_nonzero, same]);
    }

    let q = self.alloc(qb);
    let r = self.alloc(rb);
    self.udiv_cache.insert((x.0, y.0), (q, r));
    (q, r)
  }

  /// Absolute value under two's complement, as a fresh literal vector.
  fn abs_vec(&mut self, core: &mut SatSolver, a: &[Lit]) -> Vec<Lit> {
    let sign = a[a.len() - 1];
    let negated = self.neg_vec(core, a);
    self.mux_vec(core, sign, &negated, a)
  }

  // endregion
}

impl Default for BitBlaster {
  fn default() -> Self {
    Self::new()
  }
}

impl BvSolverInterface for BitBlaster {
  fn create_var(&mut self, core: &mut SatSolver, nbits: u32) -> Thvar {
    let bits: Vec<Lit> = (0..nbits).map(|_| Lit::pos(core.new_var())).collect();
    self.alloc(bits)
  }

  fn create_const(&mut self, _core: &mut SatSolver, c: &BvConst) -> Thvar {
    let bits: Vec<Lit> = (0..c.bitsize)
      .map(|i| if c.bit(i) { TRUE_LIT } else { FALSE_LIT })
      .collect();
    self.alloc(bits)
  }

  fn create_const64(&mut self, _core: &mut SatSolver, c: &BvConst64) -> Thvar {
    let bits: Vec<Lit> = (0..c.bitsize)
      .map(|i| if c.bit(i) { TRUE_LIT } else { FALSE_LIT })
      .collect();
    self.alloc(bits)
  }

  fn create_poly(&mut self, core: &mut SatSolver, p: &BvPoly, map: &[Option<Thvar>]) -> Thvar {
    let n = p.bitsize as usize;
    let mut acc = vec![FALSE_LIT; n];
    for (i, mono) in p.monos.iter().enumerate() {
      let term_bits = if mono.var == CONST_IDX {
        let coeff = &mono.coeff;
        (0..n)
          .map(|k| if coeff.bit(k as u64) { TRUE_LIT } else { FALSE_LIT })
          .collect()
      } else {
        let x = map[i].expect("monomial variable has no theory variable");
        let xb = self.bits(x);
        let coeff = mono.coeff.clone();
        self.mul_const_bits(core, &xb, |k| coeff.bit(k as u64))
      };
      let (sum, _) = self.add_vec(core, &acc, &term_bits, FALSE_LIT);
      acc = sum;
    }
    self.alloc(acc)
  }

  fn create_poly64(&mut self, core: &mut SatSolver, p: &BvPoly64, map: &[Option<Thvar>]) -> Thvar {
    let n = p.bitsize as usize;
    let mut acc = vec![FALSE_LIT; n];
    for (i, mono) in p.monos.iter().enumerate() {
      let term_bits = if mono.var == CONST_IDX {
        (0..n)
          .map(|k| if (mono.coeff >> k) & 1 != 0 { TRUE_LIT } else { FALSE_LIT })
          .collect()
      } else {
        let x = map[i].expect("monomial variable has no theory variable");
        let xb = self.bits(x);
        let coeff = mono.coeff;
        self.mul_const_bits(core, &xb, |k| (coeff >> k) & 1 != 0)
      };
      let (sum, _) = self.add_vec(core, &acc, &term_bits, FALSE_LIT);
      acc = sum;
    }
    self.alloc(acc)
  }

  fn create_pprod(&mut self, core: &mut SatSolver, p: &PowerProduct, nbits: u32, map: &[Thvar]) -> Thvar {
    let n = nbits as usize;
    // acc = 1, then exponentiation by squaring per factor.
    let mut acc: Vec<Lit> = (0..n).map(|i| if i == 0 { TRUE_LIT } else { FALSE_LIT }).collect();
    for (i, &(_, exponent)) in p.factors().iter().enumerate() {
      let mut base = self.bits(map[i]);
      let mut e = exponent;
      while e > 0 {
        if e & 1 != 0 {
          acc = self.mul_vec(core, &acc, &base);
        }
        e >>= 1;
        if e > 0 {
          base = self.mul_vec(core, &base, &base);
        }
      }
    }
    self.alloc(acc)
  }

  fn create_bvarray(&mut self, _core: &mut SatSolver, bits: &[Lit]) -> Thvar {
    self.alloc(bits.to_vec())
  }

  fn create_bvite(&mut self, core: &mut SatSolver, c: Lit, x: Thvar, y: Thvar) -> Thvar {
    let xb = self.bits(x);
    let yb = self.bits(y);
    let bits = self.mux_vec(core, c, &xb, &yb);
    self.alloc(bits)
  }

  fn create_bvdiv(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar {
    self.unsigned_divmod(core, x, y).0
  }

  fn create_bvrem(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar {
    self.unsigned_divmod(core, x, y).1
  }

  fn create_bvsdiv(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar {
    let xb = self.bits(x);
    let yb = self.bits(y);
    let n = xb.len();
    let sx = xb[n - 1];
    let sy = yb[n - 1];

    let ax = self.abs_vec(core, &xb);
    let ay = self.abs_vec(core, &yb);
    let ax_v = self.alloc(ax);
    let ay_v = self.alloc(ay);
    let (uq, _) = self.unsigned_divmod(core, ax_v, ay_v);

    let uq_bits = self.bits(uq);
    let negated = self.neg_vec(core, &uq_bits);
    let sign_differs = self.gates.xor2(core, sx, sy);
    let bits = self.mux_vec(core, sign_differs, &negated, &uq_bits);
    self.alloc(bits)
  }

  fn create_bvsrem(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar {
    let xb = self.bits(x);
    let yb = self.bits(y);
    let n = xb.len();
    let sx = xb[n - 1];

    let ax = self.abs_vec(core, &xb);
    let ay = self.abs_vec(core, &yb);
    let ax_v = self.alloc(ax);
    let ay_v = self.alloc(ay);
    let (_, ur) = self.unsigned_divmod(core, ax_v, ay_v);

    // The remainder takes the sign of the dividend.
    let ur_bits = self.bits(ur);
    let negated = self.neg_vec(core, &ur_bits);
    let bits = self.mux_vec(core, sx, &negated, &ur_bits);
    self.alloc(bits)
  }

  fn create_bvsmod(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar {
    let xb = self.bits(x);
    let yb = self.bits(y);
    let n = xb.len();
    let sx = xb[n - 1];
    let sy = yb[n - 1];

    let ax = self.abs_vec(core, &xb);
    let ay = self.abs_vec(core, &yb);
    let ax_v = self.alloc(ax);
    let ay_v = self.alloc(ay);
    let (_, u) = self.unsigned_divmod(core, ax_v, ay_v);
    let ub = self.bits(u);

    // Case split from the SMT-LIB definition; the result has the divisor's sign.
    let u_neg = self.neg_vec(core, &ub);
    let (u_neg_plus_y, _) = self.add_vec(core, &u_neg, &yb, FALSE_LIT);
    let (u_plus_y, _) = self.add_vec(core, &ub, &yb, FALSE_LIT);

    let on_sx = self.mux_vec(core, sy, &u_neg, &u_neg_plus_y); // sx set
    let on_not_sx = self.mux_vec(core, sy, &u_plus_y, &ub); // sx clear
    let selected = self.mux_vec(core, sx, &on_sx, &on_not_sx);

    let u_nonzero = self.gates.or_n(core, &ub);
    let bits = self.mux_vec(core, u_nonzero, &selected, &ub);
    self.alloc(bits)
  }

  fn create_bvshl(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar {
    let bits = self.barrel_shift(core, x, y, ShiftKind::Left);
    self.alloc(bits)
  }

  fn create_bvlshr(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar {
    let bits = self.barrel_shift(core, x, y, ShiftKind::LogicalRight);
    self.alloc(bits)
  }

  fn create_bvashr(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar {
    let bits = self.barrel_shift(core, x, y, ShiftKind::ArithmeticRight);
    self.alloc(bits)
  }

  fn select_bit(&mut self, _core: &mut SatSolver, x: Thvar, i: u32) -> Lit {
    self.vars[x.index()][i as usize]
  }

  fn set_bit(&mut self, core: &mut SatSolver, x: Thvar, i: u32, tt: bool) {
    let l = self.vars[x.index()][i as usize];
    self.clause(core, &[if tt { l } else { !l }]);
  }

  fn create_eq_atom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Lit {
    let xb = self.bits(x);
    let yb = self.bits(y);
    self.eq_lit(core, &xb, &yb)
  }

  fn create_ge_atom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Lit {
    let xb = self.bits(x);
    let yb = self.bits(y);
    self.uge_lit(core, &xb, &yb)
  }

  fn create_sge_atom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Lit {
    // Signed comparison is unsigned comparison with the sign bits flipped.
    let mut xb = self.bits(x);
    let mut yb = self.bits(y);
    let n = xb.len();
    xb[n - 1] = !xb[n - 1];
    yb[n - 1] = !yb[n - 1];
    self.uge_lit(core, &xb, &yb)
  }

  fn assert_eq_axiom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar, tt: bool) {
    let l = self.create_eq_atom(core, x, y);
    self.clause(core, &[if tt { l } else { !l }]);
  }

  fn assert_ge_axiom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar, tt: bool) {
    let l = self.create_ge_atom(core, x, y);
    self.clause(core, &[if tt { l } else { !l }]);
  }

  fn assert_sge_axiom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar, tt: bool) {
    let l = self.create_sge_atom(core, x, y);
    self.clause(core, &[if tt { l } else { !l }]);
  }

  fn build_model(&mut self, _core: &SatSolver) {
    self.model_ready = true;
  }

  fn free_model(&mut self) {
    self.model_ready = false;
  }

  fn value_in_model(&self, core: &SatSolver, x: Thvar) -> Option<BvConst> {
    if !self.model_ready {
      return None;
    }
    let bits = &self.vars[x.index()];
    let mut value = BigUint::zero();
    for (i, &l) in bits.iter().enumerate() {
      if core.lit_is_true(l) {
        value.set_bit(i as u64, true);
      }
    }
    Some(BvConst::new(bits.len() as u32, value))
  }

  fn push(&mut self) {
    self.frames.push(self.vars.len());
  }

  fn pop(&mut self, core_nvars: u32) {
    let mark = self.frames.pop().expect("bv solver pop without push");
    self.vars.truncate(mark);
    let nvars = self.vars.len() as u32;
    self.udiv_cache.retain(|&(x, y), &mut (q, r)| {
      x < nvars && y < nvars && q.0 < nvars && r.0 < nvars
    });
    self.gates.remove_dead(core_nvars);
    self.model_ready = false;
  }

  fn reset(&mut self) {
    self.vars.clear();
    self.udiv_cache.clear();
    self.gates = GateManager::new();
    self.model_ready = false;
    self.frames.clear();
  }
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum ShiftKind {
  Left,
  LogicalRight,
  ArithmeticRight,
}

impl BitBlaster {
  /// Barrel shifter: one mux layer per shift-amount bit, then an overflow mux that
  /// selects the fill vector when the amount is at least the width.
  fn barrel_shift(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar, kind: ShiftKind) -> Vec<Lit> {
    let xb = self.bits(x);
    let yb = self.bits(y);
    let n = xb.len();
    let sign = xb[n - 1];
    let fill = match kind {
      ShiftKind::ArithmeticRight => sign,
      _ => FALSE_LIT,
    };

    // Stages cover shift amounts up to 2^m - 1 >= n - 1.
    let stages = if n <= 1 { 0 } else { 32 - ((n - 1) as u32).leading_zeros() as usize };
    let mut acc = xb;
    for k in 0..stages.min(n) {
      let shifted = match kind {
        ShiftKind::Left => Self::shl_const(&acc, 1 << k),
        _ => Self::shr_const(&acc, 1 << k, fill),
      };
      acc = self.mux_vec(core, yb[k], &shifted, &acc);
    }

    // Amount bits beyond the staged range force the fill vector.
    let high = &yb[stages.min(n)..];
    if !high.is_empty() {
      let overflow = self.gates.or_n(core, high);
      let fill_vec = vec![fill; n];
      acc = self.mux_vec(core, overflow, &fill_vec, &acc);
    }
    acc
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::sat::{SearchParams, SolverStatus};

  /// Fixes a variable to a concrete value, solves, and reads another variable back.
  fn fix(bb: &mut BitBlaster, core: &mut SatSolver, x: Thvar, value: u64) {
    let n = bb.width(x);
    for i in 0..n {
      bb.set_bit(core, x, i, (value >> i) & 1 != 0);
    }
  }

  fn read(bb: &BitBlaster, core: &SatSolver, x: Thvar) -> u64 {
    let c = bb.value_in_model(core, x).unwrap();
    c.as_const64().unwrap().value
  }

  /// Builds an 8-bit binary-operator circuit, fixes the inputs, and checks the output.
  fn check_binop(
    op: impl Fn(&mut BitBlaster, &mut SatSolver, Thvar, Thvar) -> Thvar,
    a: u64,
    b: u64,
    expected: u64,
  ) {
    let mut core = SatSolver::new();
    let mut bb = BitBlaster::new();
    let x = bb.create_var(&mut core, 8);
    let y = bb.create_var(&mut core, 8);
    let z = op(&mut bb, &mut core, x, y);
    fix(&mut bb, &mut core, x, a);
    fix(&mut bb, &mut core, y, b);
    assert_eq!(core.solve(&SearchParams::default()), SolverStatus::Sat);
    bb.build_model(&core);
    assert_eq!(read(&bb, &core, z), expected, "op({a:#x}, {b:#x})");
  }

  #[test]
  fn addition_via_poly() {
    // x + y as a polynomial 1*x + 1*y.
    let mut core = SatSolver::new();
    let mut bb = BitBlaster::new();
    let x = bb.create_var(&mut core, 8);
    let y = bb.create_var(&mut core, 8);
    let p = BvPoly64 {
      bitsize: 8,
      monos: vec![
        crate::core::bvarith::Mono64 { coeff: 1, var: 10 },
        crate::core::bvarith::Mono64 { coeff: 1, var: 11 },
      ],
    };
    let z = bb.create_poly64(&mut core, &p, &[Some(x), Some(y)]);
    fix(&mut bb, &mut core, x, 0xf0);
    fix(&mut bb, &mut core, y, 0x21);
    assert_eq!(core.solve(&SearchParams::default()), SolverStatus::Sat);
    bb.build_model(&core);
    assert_eq!(read(&bb, &core, z), 0x11); // wraps modulo 256
  }

  #[test]
  fn multiplication_via_pprod() {
    let mut core = SatSolver::new();
    let mut bb = BitBlaster::new();
    let x = bb.create_var(&mut core, 8);
    let p = PowerProduct::new(vec![(crate::core::term::Term::positive(10), 2)]).unwrap();
    let z = bb.create_pprod(&mut core, &p, 8, &[x]);
    fix(&mut bb, &mut core, x, 13);
    assert_eq!(core.solve(&SearchParams::default()), SolverStatus::Sat);
    bb.build_model(&core);
    assert_eq!(read(&bb, &core, z), (13 * 13) & 0xff);
  }

  #[test]
  fn unsigned_division_and_remainder() {
    check_binop(|bb, c, x, y| bb.create_bvdiv(c, x, y), 100, 7, 14);
    check_binop(|bb, c, x, y| bb.create_bvrem(c, x, y), 100, 7, 2);
    // Division by zero: quotient all ones, remainder the dividend.
    check_binop(|bb, c, x, y| bb.create_bvdiv(c, x, y), 100, 0, 0xff);
    check_binop(|bb, c, x, y| bb.create_bvrem(c, x, y), 100, 0, 100);
  }

  #[test]
  fn signed_division_follows_smtlib() {
    // -7 sdiv 2 = -3 (truncation toward zero): 0xf9 sdiv 2 = 0xfd.
    check_binop(|bb, c, x, y| bb.create_bvsdiv(c, x, y), 0xf9, 0x02, 0xfd);
    // -7 srem 2 = -1 = 0xff.
    check_binop(|bb, c, x, y| bb.create_bvsrem(c, x, y), 0xf9, 0x02, 0xff);
    // -7 smod 2 = 1 (sign of the divisor).
    check_binop(|bb, c, x, y| bb.create_bvsmod(c, x, y), 0xf9, 0x02, 0x01);
    // 7 smod -2 = -1 = 0xff.
    check_binop(|bb, c, x, y| bb.create_bvsmod(c, x, y), 0x07, 0xfe, 0xff);
  }

  #[test]
  fn shifts() {
    check_binop(|bb, c, x, y| bb.create_bvshl(c, x, y), 0b0000_0101, 3, 0b0010_1000);
    check_binop(|bb, c, x, y| bb.create_bvlshr(c, x, y), 0b1010_0000, 3, 0b0001_0100);
    check_binop(|bb, c, x, y| bb.create_bvashr(c, x, y), 0b1010_0000, 3, 0b1111_0100);
    // Shift by at least the width: zeros (or sign fill for ashr).
    check_binop(|bb, c, x, y| bb.create_bvshl(c, x, y), 0xff, 8, 0);
    check_binop(|bb, c, x, y| bb.create_bvshl(c, x, y), 0xff, 200, 0);
    check_binop(|bb, c, x, y| bb.create_bvashr(c, x, y), 0x80, 9, 0xff);
  }

  #[test]
  fn comparison_atoms() {
    let mut core = SatSolver::new();
    let mut bb = BitBlaster::new();
    let x = bb.create_var(&mut core, 4);
    let y = bb.create_var(&mut core, 4);
    let ge = bb.create_ge_atom(&mut core, x, y);
    let sge = bb.create_sge_atom(&mut core, x, y);
    let eq = bb.create_eq_atom(&mut core, x, y);
    fix(&mut bb, &mut core, x, 0x9); // -7 signed
    fix(&mut bb, &mut core, y, 0x2);
    assert_eq!(core.solve(&SearchParams::default()), SolverStatus::Sat);
    assert!(core.lit_is_true(ge)); // 9 >= 2 unsigned
    assert!(core.lit_is_false(sge)); // -7 < 2 signed
    assert!(core.lit_is_false(eq));
  }

  #[test]
  fn eq_axiom_propagates_constants() {
    let mut core = SatSolver::new();
    let mut bb = BitBlaster::new();
    let x = bb.create_var(&mut core, 8);
    let c = bb.create_const64(&mut core, &BvConst64::new(8, 0x0f));
    bb.assert_eq_axiom(&mut core, x, c, true);
    assert_eq!(core.solve(&SearchParams::default()), SolverStatus::Sat);
    bb.build_model(&core);
    assert_eq!(read(&bb, &core, x), 0x0f);
  }

  #[test]
  fn disequality_of_single_bits() {
    let mut core = SatSolver::new();
    let mut bb = BitBlaster::new();
    let a = bb.create_var(&mut core, 1);
    let b = bb.create_var(&mut core, 1);
    bb.assert_eq_axiom(&mut core, a, b, false);
    assert_eq!(core.solve(&SearchParams::default()), SolverStatus::Sat);
    bb.build_model(&core);
    assert_ne!(read(&bb, &core, a), read(&bb, &core, b));
  }

  #[test]
  fn bvite_selects_branch() {
    let mut core = SatSolver::new();
    let mut bb = BitBlaster::new();
    let c = Lit::pos(core.new_var());
    let x = bb.create_var(&mut core, 8);
    let y = bb.create_var(&mut core, 8);
    let z = bb.create_bvite(&mut core, c, x, y);
    fix(&mut bb, &mut core, x, 0xaa);
    fix(&mut bb, &mut core, y, 0x55);
    core.add_unit_clause(!c);
    assert_eq!(core.solve(&SearchParams::default()), SolverStatus::Sat);
    bb.build_model(&core);
    assert_eq!(read(&bb, &core, z), 0x55);
  }
}
