/*!

The bit-vector solver interface.

The context does not know how bit-vector reasoning is implemented; it drives a solver
through this trait, passing the SAT core explicitly so the solver can allocate Boolean
variables and emit clauses. Theory variables are opaque `Thvar` handles whose meaning is
private to the solver.

Conventions shared by all implementations:

- In `create_poly`/`create_poly64`, `map[i]` is the theory variable for the `i`-th
  monomial's term, except that `map[0]` is `None` when the polynomial has a constant
  monomial (the constant needs no variable).
- In `create_pprod`, `map[i]` is the theory variable for the `i`-th factor's base term.
- In `create_bvarray`, `bits[0]` is the low-order bit.
- The three `assert_*_axiom` functions assert the atom when `tt` is true and its negation
  otherwise.
- `value_in_model` may only be called between `build_model` and `free_model`, with the
  SAT core holding a satisfying assignment.

*/

use crate::core::{
  bvarith::{BvConst, BvConst64, BvPoly, BvPoly64},
  sat::{Lit, SatSolver},
  term::PowerProduct,
};

/// An opaque handle on a theory variable inside a bit-vector solver.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Thvar(pub(crate) u32);

impl Thvar {
  #[inline(always)]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

pub trait BvSolverInterface {
  // region Term constructors

  /// A fresh variable of `nbits` bits.
  fn create_var(&mut self, core: &mut SatSolver, nbits: u32) -> Thvar;

  /// A variable constrained to the given constant (more than 64 bits).
  fn create_const(&mut self, core: &mut SatSolver, c: &BvConst) -> Thvar;

  /// A variable constrained to the given constant (at most 64 bits).
  fn create_const64(&mut self, core: &mut SatSolver, c: &BvConst64) -> Thvar;

  fn create_poly(&mut self, core: &mut SatSolver, p: &BvPoly, map: &[Option<Thvar>]) -> Thvar;

  fn create_poly64(&mut self, core: &mut SatSolver, p: &BvPoly64, map: &[Option<Thvar>]) -> Thvar;

  fn create_pprod(&mut self, core: &mut SatSolver, p: &PowerProduct, nbits: u32, map: &[Thvar]) -> Thvar;

  /// A variable whose bits are the given core literals; `bits[0]` is the low-order bit.
  fn create_bvarray(&mut self, core: &mut SatSolver, bits: &[Lit]) -> Thvar;

  fn create_bvite(&mut self, core: &mut SatSolver, c: Lit, x: Thvar, y: Thvar) -> Thvar;

  // endregion

  // region Binary operators

  fn create_bvdiv(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar;
  fn create_bvrem(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar;
  fn create_bvsdiv(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar;
  fn create_bvsrem(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar;
  fn create_bvsmod(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar;
  fn create_bvshl(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar;
  fn create_bvlshr(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar;
  fn create_bvashr(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Thvar;

  // endregion

  // region Bits and atoms

  /// Bit `i` of `x` as a core literal.
  fn select_bit(&mut self, core: &mut SatSolver, x: Thvar, i: u32) -> Lit;

  /// Fix bit `i` of `x` to `tt`.
  fn set_bit(&mut self, core: &mut SatSolver, x: Thvar, i: u32, tt: bool);

  fn create_eq_atom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Lit;

  /// Unsigned `x >= y`.
  fn create_ge_atom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Lit;

  /// Signed `x >= y`.
  fn create_sge_atom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar) -> Lit;

  fn assert_eq_axiom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar, tt: bool);
  fn assert_ge_axiom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar, tt: bool);
  fn assert_sge_axiom(&mut self, core: &mut SatSolver, x: Thvar, y: Thvar, tt: bool);

  // endregion

  // region Model construction

  fn build_model(&mut self, core: &SatSolver);
  fn free_model(&mut self);

  /// The value of `x` in the model, or `None` if no model is available.
  fn value_in_model(&self, core: &SatSolver, x: Thvar) -> Option<BvConst>;

  // endregion

  // region Control

  /// Opens a frame matching a context push.
  fn push(&mut self);

  /// Closes a frame. `core_nvars` is the solver's variable count after its own pop, so
  /// the implementation can drop anything referencing dead core variables.
  fn pop(&mut self, core_nvars: u32);

  /// Drops all state.
  fn reset(&mut self);

  // endregion
}
