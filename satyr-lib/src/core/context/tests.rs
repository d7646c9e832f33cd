/*!

End-to-end scenarios: assertions built through the term API, checked, and validated
against the models the context reconstructs. These mirror the SMT-LIB fragments a front
end would produce (the parser itself lives outside this crate).

*/

use once_cell::sync::Lazy;
use satyr_abs::IString;

static LOGGING: Lazy<()> = Lazy::new(satyr_abs::log::init_test_logging);

use crate::{
  api::{CheckStatus, Error},
  core::{
    bvarith::BvArithBuffer64,
    context::{AssertStatus, Context, ContextArch, ContextMode, Value},
    sat::SearchParams,
    term::{Term, TermTable, Type, FALSE_TERM, TRUE_TERM},
  },
};

fn ctx_and_terms(mode: ContextMode) -> (Context, TermTable) {
  Lazy::force(&LOGGING);
  (Context::new(mode, ContextArch::Bv), TermTable::new())
}

fn bv_type(terms: &mut TermTable, n: u32) -> Type {
  terms.types_mut().bitvector_type(n).unwrap()
}

fn bv_const(terms: &mut TermTable, n: u32, value: u64) -> Term {
  terms.bv64_constant(n, value).unwrap()
}

/// `x + c` over `n` bits, as a polynomial term.
fn plus_const(terms: &mut TermTable, n: u32, x: Term, c: u64) -> Term {
  let mut buffer = BvArithBuffer64::new(n);
  buffer.add_mono(1, x.index());
  buffer.add_const(c);
  terms.bv64_poly(&mut buffer).unwrap()
}

fn check_model_satisfies(ctx: &mut Context, terms: &TermTable, assertions: &[Term]) {
  let model = ctx.build_model(terms).unwrap();
  for &f in assertions {
    assert_eq!(
      model.eval(terms, f).unwrap(),
      Value::Bool(true),
      "assertion {f} not satisfied by the model"
    );
  }
}

#[test]
fn constant_equality_gives_that_value() {
  // (declare-const x (_ BitVec 8)) (assert (= x #b00001111)) (check-sat) (get-value (x))
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 8);
  let x = terms.new_uninterpreted(tau);
  terms.set_term_name(x, IString::from("x"));
  let c = bv_const(&mut terms, 8, 0b0000_1111);
  let f = terms.eq(x, c).unwrap();

  assert_eq!(ctx.assert_formula(&mut terms, f), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);

  let model = ctx.build_model(&terms).unwrap();
  let value = model.eval(&terms, x).unwrap();
  assert_eq!(value.as_bv().unwrap().as_const64().unwrap().value, 0b0000_1111);
  check_model_satisfies(&mut ctx, &terms, &[f]);
}

#[test]
fn contradictory_bounds_are_unsat() {
  // (assert (bvult x #b0010)) (assert (bvuge x #b0010)) -> unsat
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 4);
  let x = terms.new_uninterpreted(tau);
  let two = bv_const(&mut terms, 4, 2);
  let ge = terms.bvge_atom(x, two).unwrap();
  let lt = terms.not(ge).unwrap();

  assert_eq!(ctx.assert_formula(&mut terms, lt), Ok(AssertStatus::Asserted));
  let _ = ctx.assert_formula(&mut terms, ge).unwrap();
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Unsat);
}

#[test]
fn overflow_wraps_to_all_ones() {
  // (assert (= (bvadd x #x00000001) #x00000000)) -> sat with x = #xffffffff
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 32);
  let x = terms.new_uninterpreted(tau);
  let sum = plus_const(&mut terms, 32, x, 1);
  let zero = bv_const(&mut terms, 32, 0);
  let f = terms.eq(sum, zero).unwrap();

  assert_eq!(ctx.assert_formula(&mut terms, f), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);

  let model = ctx.build_model(&terms).unwrap();
  let value = model.eval(&terms, x).unwrap();
  assert_eq!(value.as_bv().unwrap().as_const64().unwrap().value, 0xffff_ffff);
  check_model_satisfies(&mut ctx, &terms, &[f]);
}

#[test]
fn distinct_single_bits() {
  // (assert (distinct a b)) over (_ BitVec 1) -> sat with a != b
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 1);
  let a = terms.new_uninterpreted(tau);
  let b = terms.new_uninterpreted(tau);
  let f = terms.distinct(&[a, b]).unwrap();

  assert_eq!(ctx.assert_formula(&mut terms, f), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);

  let model = ctx.build_model(&terms).unwrap();
  let va = model.eval(&terms, a).unwrap();
  let vb = model.eval(&terms, b).unwrap();
  assert_ne!(va, vb);
  check_model_satisfies(&mut ctx, &terms, &[f]);
}

#[test]
fn push_pop_frames_are_independent() {
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::PushPop);
  let p = terms.new_uninterpreted(Type::BOOL);

  ctx.push().unwrap();
  assert_eq!(ctx.assert_formula(&mut terms, p), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);
  {
    let model = ctx.build_model(&terms).unwrap();
    assert_eq!(model.eval(&terms, p).unwrap(), Value::Bool(true));
  }

  ctx.pop().unwrap();
  let not_p = terms.not(p).unwrap();
  assert_eq!(ctx.assert_formula(&mut terms, not_p), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);
  let model = ctx.build_model(&terms).unwrap();
  assert_eq!(model.eval(&terms, p).unwrap(), Value::Bool(false));
}

#[test]
fn xor_chain_parity() {
  // A 128-variable XOR chain constrained to odd parity; deterministic under the seed.
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let vars: Vec<Term> = (0..128).map(|_| terms.new_uninterpreted(Type::BOOL)).collect();
  let chain = terms.xor(&vars).unwrap();

  assert_eq!(ctx.assert_formula(&mut terms, chain), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);

  let model = ctx.build_model(&terms).unwrap();
  let mut parity = false;
  for &v in &vars {
    parity ^= model.eval(&terms, v).unwrap().as_bool().unwrap();
  }
  assert!(parity, "model must have odd parity");
  check_model_satisfies(&mut ctx, &terms, &[chain]);
}

#[test]
fn trivially_unsat_parks_the_context() {
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  assert_eq!(
    ctx.assert_formula(&mut terms, FALSE_TERM),
    Ok(AssertStatus::TriviallyUnsat)
  );
  assert_eq!(ctx.status(), CheckStatus::Unsat);
  // Further assertions collapse and the check stays unsat.
  let p = terms.new_uninterpreted(Type::BOOL);
  assert_eq!(ctx.assert_formula(&mut terms, p), Ok(AssertStatus::TriviallyUnsat));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Unsat);
}

#[test]
fn asserting_true_is_a_no_op() {
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  assert_eq!(ctx.assert_formula(&mut terms, TRUE_TERM), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);
}

#[test]
fn contradictory_constant_equalities_collapse() {
  // x = 1 and x = 2: the first becomes a substitution, the second simplifies to false.
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 8);
  let x = terms.new_uninterpreted(tau);
  let one = bv_const(&mut terms, 8, 1);
  let two = bv_const(&mut terms, 8, 2);
  let f1 = terms.eq(x, one).unwrap();
  let f2 = terms.eq(x, two).unwrap();

  assert_eq!(ctx.assert_formula(&mut terms, f1), Ok(AssertStatus::Asserted));
  assert_eq!(
    ctx.assert_formula(&mut terms, f2),
    Ok(AssertStatus::TriviallyUnsat)
  );
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Unsat);
}

#[test]
fn substitution_chains_commit_in_dependency_order() {
  // x = y, y = z + 1: both become substitutions; z stays free.
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 8);
  let x = terms.new_uninterpreted(tau);
  let y = terms.new_uninterpreted(tau);
  let z = terms.new_uninterpreted(tau);
  let z1 = plus_const(&mut terms, 8, z, 1);
  let f1 = terms.eq(x, y).unwrap();
  let f2 = terms.eq(y, z1).unwrap();
  let seven = bv_const(&mut terms, 8, 7);
  let f3 = terms.eq(z, seven).unwrap();

  for f in [f1, f2, f3] {
    assert_eq!(ctx.assert_formula(&mut terms, f), Ok(AssertStatus::Asserted));
  }
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);

  let model = ctx.build_model(&terms).unwrap();
  assert_eq!(model.eval(&terms, z).unwrap().as_bv().unwrap().as_const64().unwrap().value, 7);
  assert_eq!(model.eval(&terms, y).unwrap().as_bv().unwrap().as_const64().unwrap().value, 8);
  assert_eq!(model.eval(&terms, x).unwrap().as_bv().unwrap().as_const64().unwrap().value, 8);
  check_model_satisfies(&mut ctx, &terms, &[f1, f2, f3]);
}

#[test]
fn substitution_cycles_are_broken() {
  // x = y + 1 and y = x + 1: a substitution cycle; over 8 bits this is unsat
  // (it implies 0 = 2).
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 8);
  let x = terms.new_uninterpreted(tau);
  let y = terms.new_uninterpreted(tau);
  let y1 = plus_const(&mut terms, 8, y, 1);
  let x1 = plus_const(&mut terms, 8, x, 1);
  let f1 = terms.eq(x, y1).unwrap();
  let f2 = terms.eq(y, x1).unwrap();

  let _ = ctx.assert_formula(&mut terms, f1).unwrap();
  let _ = ctx.assert_formula(&mut terms, f2).unwrap();
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Unsat);
}

#[test]
fn ite_equality_flattening_forces_the_condition() {
  // (ite c 1 2) = 1 forces c; the branch constants are structurally distinct.
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 8);
  let c = terms.new_uninterpreted(Type::BOOL);
  let one = bv_const(&mut terms, 8, 1);
  let two = bv_const(&mut terms, 8, 2);
  let ite = terms.ite(tau, c, one, two).unwrap();
  let f = terms.eq(ite, one).unwrap();

  assert_eq!(ctx.assert_formula(&mut terms, f), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);
  let model = ctx.build_model(&terms).unwrap();
  assert_eq!(model.eval(&terms, c).unwrap(), Value::Bool(true));
}

#[test]
fn shifts_and_division_end_to_end() {
  // (x >> 1) = 5 and (x rem 3) = d: pin x, read the remainder back.
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 8);
  let x = terms.new_uninterpreted(tau);
  let d = terms.new_uninterpreted(tau);
  let one = bv_const(&mut terms, 8, 1);
  let three = bv_const(&mut terms, 8, 3);
  let five = bv_const(&mut terms, 8, 5);
  let ten = bv_const(&mut terms, 8, 10);

  let shifted = terms.bvlshr(x, one).unwrap();
  let f1 = terms.eq(shifted, five).unwrap();
  let f2 = terms.eq(x, ten).unwrap();
  let rem = terms.bvrem(x, three).unwrap();
  let f3 = terms.eq(rem, d).unwrap();

  for f in [f1, f2, f3] {
    assert_eq!(ctx.assert_formula(&mut terms, f), Ok(AssertStatus::Asserted));
  }
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);
  let model = ctx.build_model(&terms).unwrap();
  assert_eq!(model.eval(&terms, d).unwrap().as_bv().unwrap().as_const64().unwrap().value, 1);
  check_model_satisfies(&mut ctx, &terms, &[f1, f2, f3]);
}

#[test]
fn failed_assertions_do_not_commit() {
  // Without a bit-vector solver, a bit-vector assertion fails with BvNotSupported and
  // leaves the context usable.
  let mut ctx = Context::new(ContextMode::MultiChecks, ContextArch::NoSolvers);
  let mut terms = TermTable::new();
  let tau = bv_type(&mut terms, 8);
  let x = terms.new_uninterpreted(tau);
  let c = bv_const(&mut terms, 8, 3);
  let ge = terms.bvge_atom(x, c).unwrap();
  // Use the negation so the conjunct lands in top_atoms and needs the theory solver.
  let f = terms.not(ge).unwrap();

  assert_eq!(ctx.assert_formula(&mut terms, f), Err(Error::BvNotSupported));
  assert_eq!(ctx.status(), CheckStatus::Idle);

  // Pure Boolean work still goes through.
  let p = terms.new_uninterpreted(Type::BOOL);
  let q = terms.new_uninterpreted(Type::BOOL);
  let or = terms.or(&[p, q]).unwrap();
  let not_p = terms.not(p).unwrap();
  assert_eq!(ctx.assert_formula(&mut terms, or), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.assert_formula(&mut terms, not_p), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);
  let model = ctx.build_model(&terms).unwrap();
  assert_eq!(model.eval(&terms, q).unwrap(), Value::Bool(true));
}

#[test]
fn blocking_clauses_enumerate_models() {
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let p = terms.new_uninterpreted(Type::BOOL);
  let q = terms.new_uninterpreted(Type::BOOL);
  let or = terms.or(&[p, q]).unwrap();
  assert_eq!(ctx.assert_formula(&mut terms, or), Ok(AssertStatus::Asserted));

  let mut rounds = 0;
  loop {
    match ctx.check(&SearchParams::default()) {
      CheckStatus::Sat => {
        rounds += 1;
        assert!(rounds <= 4, "enumeration must terminate");
        if ctx.assert_blocking_clause().unwrap() == AssertStatus::TriviallyUnsat {
          break;
        }
      }
      CheckStatus::Unsat => break,
      other => panic!("unexpected status {other}"),
    }
  }
  assert!(rounds >= 1);
}

#[test]
fn deterministic_given_a_seed() {
  let run = || {
    let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
    let tau = bv_type(&mut terms, 16);
    let x = terms.new_uninterpreted(tau);
    let y = terms.new_uninterpreted(tau);
    let lim = bv_const(&mut terms, 16, 1000);
    let ge_x = terms.bvge_atom(lim, x).unwrap();
    let ge_y = terms.bvge_atom(y, x).unwrap();
    let ne = terms.eq(x, y).unwrap();
    let ne = terms.not(ne).unwrap();
    for f in [ge_x, ge_y, ne] {
      ctx.assert_formula(&mut terms, f).unwrap();
    }
    assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);
    let model = ctx.build_model(&terms).unwrap();
    (
      model.eval(&terms, x).unwrap().as_bv().unwrap().clone(),
      model.eval(&terms, y).unwrap().as_bv().unwrap().clone(),
    )
  };
  assert_eq!(run(), run());
}

#[test]
fn gc_keeps_everything_the_context_references() {
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 8);
  let x = terms.new_uninterpreted(tau);
  let c = bv_const(&mut terms, 8, 9);
  let f = terms.eq(x, c).unwrap();
  ctx.assert_formula(&mut terms, f).unwrap();

  // A dead term with no marks disappears; everything the context uses survives.
  let dead = terms.bvge_atom(x, c).unwrap();
  ctx.gc_mark(&mut terms);
  terms.gc(false);

  assert!(terms.good_term(x));
  assert!(terms.good_term(c));
  assert!(!terms.live_idx(dead.index()));

  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);
  let model = ctx.build_model(&terms).unwrap();
  assert_eq!(model.eval(&terms, x).unwrap().as_bv().unwrap().as_const64().unwrap().value, 9);
}

#[test]
fn uninterpreted_bool_constants_via_bvarray() {
  // Compose Booleans into a vector: bvarray(p, true) = #b10 forces p false... bit 0 is
  // the low-order bit, so the value is 2 when p is false and 3 when p is true.
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let p = terms.new_uninterpreted(Type::BOOL);
  let arr = terms.bvarray(&[p, TRUE_TERM]).unwrap();
  let two = bv_const(&mut terms, 2, 2);
  let f = terms.eq(arr, two).unwrap();

  assert_eq!(ctx.assert_formula(&mut terms, f), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);
  let model = ctx.build_model(&terms).unwrap();
  assert_eq!(model.eval(&terms, p).unwrap(), Value::Bool(false));
}

#[test]
fn multi_check_with_added_assertions() {
  let (mut ctx, mut terms) = ctx_and_terms(ContextMode::MultiChecks);
  let tau = bv_type(&mut terms, 8);
  let x = terms.new_uninterpreted(tau);
  let ten = bv_const(&mut terms, 8, 10);
  let ge = terms.bvge_atom(x, ten).unwrap();

  assert_eq!(ctx.assert_formula(&mut terms, ge), Ok(AssertStatus::Asserted));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Sat);

  // Add the complementary constraint and re-check.
  let lt = terms.not(ge).unwrap();
  assert_eq!(ctx.assert_formula(&mut terms, lt), Ok(AssertStatus::TriviallyUnsat));
  assert_eq!(ctx.check(&SearchParams::default()), CheckStatus::Unsat);
}
