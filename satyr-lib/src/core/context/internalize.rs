/*!

Internalization: translation of terms into SAT-core literals and bit-vector theory
variables, and top-level assertion of the flattened buckets.

Every translated subterm is recorded in the internalization table, so shared subterms
are translated once. Boolean structure goes through the gate manager; bit-vector
structure goes through the bit-vector solver interface; bit-vector atoms asserted at the
top level become theory axioms instead of literals.

*/

use crate::{
  api::{Error, Thvar},
  core::{
    bvarith::CONST_IDX,
    context::{flatten::flatten_or_leaves, Abort, Context},
    intern::InternCode,
    sat::{Lit, FALSE_LIT, TRUE_LIT},
    term::{Term, TermDesc, TermKind, TermTable},
  },
};

/// Translates a Boolean term occurrence into a core literal.
pub(crate) fn internalize_to_literal(ctx: &mut Context, terms: &TermTable, t: Term) -> Result<Lit, Abort> {
  let r = ctx.intern.get_root(t);
  if let Some(code) = ctx.intern.root_code(r) {
    return match code {
      InternCode::Literal(l) => Ok(l),
      InternCode::Thvar(_) => Err(Error::Internal.into()),
    };
  }

  let body = r.unsigned();
  let l = match terms.kind(body) {
    TermKind::Constant => TRUE_LIT,

    TermKind::Uninterpreted => Lit::pos(ctx.core.new_var()),

    TermKind::Ite => {
      let args = terms.composite_args(body);
      let (c, a, b) = (args[0], args[1], args[2]);
      let lc = internalize_to_literal(ctx, terms, c)?;
      let la = internalize_to_literal(ctx, terms, a)?;
      let lb = internalize_to_literal(ctx, terms, b)?;
      ctx.gates.ite(&mut ctx.core, lc, la, lb)
    }

    TermKind::Eq => {
      let args = terms.composite_args(body);
      let (a, b) = (args[0], args[1]);
      match ctx.eq_cache.find(a, b) {
        Some(cached) => cached,
        None => {
          let la = internalize_to_literal(ctx, terms, a)?;
          let lb = internalize_to_literal(ctx, terms, b)?;
          let l = ctx.gates.iff(&mut ctx.core, la, lb);
          ctx.eq_cache.insert(a, b, l);
          l
        }
      }
    }

    TermKind::Or => {
      let leaves = flatten_or_leaves(ctx, terms, body);
      let mut lits = Vec::with_capacity(leaves.len());
      for leaf in leaves {
        lits.push(internalize_to_literal(ctx, terms, leaf)?);
      }
      ctx.gates.or_n(&mut ctx.core, &lits)
    }

    TermKind::Xor => {
      let args: Vec<Term> = terms.composite_args(body).to_vec();
      let mut lits = Vec::with_capacity(args.len());
      for arg in args {
        lits.push(internalize_to_literal(ctx, terms, arg)?);
      }
      ctx.gates.xor_n(&mut ctx.core, &lits)
    }

    TermKind::Bit => {
      let (index, arg) = match terms.desc(body) {
        TermDesc::Select { index, arg } => (*index, *arg),
        _ => return Err(Error::Internal.into()),
      };
      let v = internalize_to_bv(ctx, terms, arg)?;
      let (bv, core) = ctx.bv_core()?;
      bv.select_bit(core, v, index)
    }

    TermKind::BvEqAtom => {
      let args = terms.composite_args(body);
      let (a, b) = (args[0], args[1]);
      match ctx.eq_cache.find(a, b) {
        Some(cached) => cached,
        None => {
          let x = internalize_to_bv(ctx, terms, a)?;
          let y = internalize_to_bv(ctx, terms, b)?;
          let (bv, core) = ctx.bv_core()?;
          let l = bv.create_eq_atom(core, x, y);
          ctx.eq_cache.insert(a, b, l);
          l
        }
      }
    }

    TermKind::BvGeAtom | TermKind::BvSgeAtom => {
      let kind = terms.kind(body);
      let args = terms.composite_args(body);
      let (a, b) = (args[0], args[1]);
      let x = internalize_to_bv(ctx, terms, a)?;
      let y = internalize_to_bv(ctx, terms, b)?;
      let (bv, core) = ctx.bv_core()?;
      if kind == TermKind::BvGeAtom {
        bv.create_ge_atom(core, x, y)
      } else {
        bv.create_sge_atom(core, x, y)
      }
    }

    TermKind::Distinct => distinct_literal(ctx, terms, body)?,

    _ => return Err(Error::Type.into()),
  };

  ctx.intern.map_root_to_literal(body, l);
  Ok(if r.is_negative() { !l } else { l })
}

/// Translates a bit-vector term into a theory variable.
pub(crate) fn internalize_to_bv(ctx: &mut Context, terms: &TermTable, t: Term) -> Result<Thvar, Abort> {
  debug_assert!(t.is_positive() && terms.is_bitvector(t));
  let r = ctx.intern.get_root(t);
  if let Some(code) = ctx.intern.root_code(r) {
    return match code {
      InternCode::Thvar(v) => Ok(v),
      InternCode::Literal(_) => Err(Error::Internal.into()),
    };
  }

  let v = match terms.kind(r) {
    TermKind::BvConst64 => {
      let c = match terms.desc(r) {
        TermDesc::BvConst64(c) => *c,
        _ => return Err(Error::Internal.into()),
      };
      let (bv, core) = ctx.bv_core()?;
      bv.create_const64(core, &c)
    }

    TermKind::BvConst => {
      let c = match terms.desc(r) {
        TermDesc::BvConst(c) => (**c).clone(),
        _ => return Err(Error::Internal.into()),
      };
      let (bv, core) = ctx.bv_core()?;
      bv.create_const(core, &c)
    }

    TermKind::Uninterpreted => {
      let nbits = terms.bitsize(r);
      let (bv, core) = ctx.bv_core()?;
      bv.create_var(core, nbits)
    }

    TermKind::Ite => {
      let args = terms.composite_args(r);
      let (c, a, b) = (args[0], args[1], args[2]);
      let lc = internalize_to_literal(ctx, terms, c)?;
      let x = internalize_to_bv(ctx, terms, a)?;
      let y = internalize_to_bv(ctx, terms, b)?;
      let (bv, core) = ctx.bv_core()?;
      bv.create_bvite(core, lc, x, y)
    }

    TermKind::BvArray => {
      let args: Vec<Term> = terms.composite_args(r).to_vec();
      let mut bits = Vec::with_capacity(args.len());
      for arg in args {
        bits.push(internalize_to_literal(ctx, terms, arg)?);
      }
      let (bv, core) = ctx.bv_core()?;
      bv.create_bvarray(core, &bits)
    }

    TermKind::BvPoly64 => {
      let p = match terms.desc(r) {
        TermDesc::Poly64(p) => (**p).clone(),
        _ => return Err(Error::Internal.into()),
      };
      let mut map: Vec<Option<Thvar>> = Vec::with_capacity(p.monos.len());
      for mono in &p.monos {
        if mono.var == CONST_IDX {
          map.push(None);
        } else {
          map.push(Some(internalize_to_bv(ctx, terms, Term::positive(mono.var))?));
        }
      }
      let (bv, core) = ctx.bv_core()?;
      bv.create_poly64(core, &p, &map)
    }

    TermKind::BvPoly => {
      let p = match terms.desc(r) {
        TermDesc::Poly(p) => (**p).clone(),
        _ => return Err(Error::Internal.into()),
      };
      let mut map: Vec<Option<Thvar>> = Vec::with_capacity(p.monos.len());
      for mono in &p.monos {
        if mono.var == CONST_IDX {
          map.push(None);
        } else {
          map.push(Some(internalize_to_bv(ctx, terms, Term::positive(mono.var))?));
        }
      }
      let (bv, core) = ctx.bv_core()?;
      bv.create_poly(core, &p, &map)
    }

    TermKind::PowerProduct => {
      let p = match terms.desc(r) {
        TermDesc::PowerProduct(i) => terms.pprods().prod(*i).clone(),
        _ => return Err(Error::Internal.into()),
      };
      let nbits = terms.bitsize(r);
      let mut map: Vec<Thvar> = Vec::with_capacity(p.len());
      for &(base, _) in p.factors() {
        map.push(internalize_to_bv(ctx, terms, base)?);
      }
      let (bv, core) = ctx.bv_core()?;
      bv.create_pprod(core, &p, nbits, &map)
    }

    kind @ (TermKind::BvDiv
    | TermKind::BvRem
    | TermKind::BvSdiv
    | TermKind::BvSrem
    | TermKind::BvSmod
    | TermKind::BvShl
    | TermKind::BvLshr
    | TermKind::BvAshr) => {
      let args = terms.composite_args(r);
      let (a, b) = (args[0], args[1]);
      let x = internalize_to_bv(ctx, terms, a)?;
      let y = internalize_to_bv(ctx, terms, b)?;
      let (bv, core) = ctx.bv_core()?;
      match kind {
        TermKind::BvDiv => bv.create_bvdiv(core, x, y),
        TermKind::BvRem => bv.create_bvrem(core, x, y),
        TermKind::BvSdiv => bv.create_bvsdiv(core, x, y),
        TermKind::BvSrem => bv.create_bvsrem(core, x, y),
        TermKind::BvSmod => bv.create_bvsmod(core, x, y),
        TermKind::BvShl => bv.create_bvshl(core, x, y),
        TermKind::BvLshr => bv.create_bvlshr(core, x, y),
        _ => bv.create_bvashr(core, x, y),
      }
    }

    _ => return Err(Error::Type.into()),
  };

  ctx.intern.map_root_to_thvar(r, v);
  Ok(v)
}

/// `distinct` is a generic atom: over Booleans it degenerates (only two values exist);
/// over bit-vectors it is the conjunction of pairwise disequalities.
fn distinct_literal(ctx: &mut Context, terms: &TermTable, body: Term) -> Result<Lit, Abort> {
  let args: Vec<Term> = terms.composite_args(body).to_vec();
  if terms.is_boolean(args[0]) {
    if args.len() > 2 {
      return Ok(FALSE_LIT);
    }
    let l1 = internalize_to_literal(ctx, terms, args[0])?;
    let l2 = internalize_to_literal(ctx, terms, args[1])?;
    return Ok(ctx.gates.xor2(&mut ctx.core, l1, l2));
  }

  let mut vars = Vec::with_capacity(args.len());
  for &arg in &args {
    vars.push(internalize_to_bv(ctx, terms, arg)?);
  }
  let mut diseqs = Vec::new();
  for i in 0..vars.len() {
    for j in i + 1..vars.len() {
      let (bv, core) = ctx.bv_core()?;
      let eq = bv.create_eq_atom(core, vars[i], vars[j]);
      diseqs.push(!eq);
    }
  }
  Ok(ctx.gates.and_n(&mut ctx.core, &diseqs))
}

/// Asserts everything the flattening pass collected.
pub(crate) fn assert_toplevel(ctx: &mut Context, terms: &mut TermTable) -> Result<(), Abort> {
  let interns = std::mem::take(&mut ctx.top_interns);
  for r in interns {
    match ctx.intern.root_code(r) {
      Some(InternCode::Literal(l)) => ctx.core.add_unit_clause(l),
      _ => return Err(Error::Internal.into()),
    }
  }

  let eqs = std::mem::take(&mut ctx.top_eqs);
  for e in eqs {
    assert_toplevel_eq(ctx, terms, e)?;
  }

  let atoms = std::mem::take(&mut ctx.top_atoms);
  for a in atoms {
    assert_toplevel_atom(ctx, terms, a)?;
  }

  let formulas = std::mem::take(&mut ctx.top_formulas);
  for f in formulas {
    assert_toplevel_formula(ctx, terms, f)?;
  }
  Ok(())
}

/// A positive equality asserted true: a theory axiom for bit-vectors, iff clauses for
/// Booleans (demoted substitution candidates land here too).
fn assert_toplevel_eq(ctx: &mut Context, terms: &TermTable, e: Term) -> Result<(), Abort> {
  debug_assert!(e.is_positive());
  let args = terms.composite_args(e.unsigned());
  let (a, b) = (args[0], args[1]);
  match terms.kind(e.unsigned()) {
    TermKind::BvEqAtom => {
      let x = internalize_to_bv(ctx, terms, a)?;
      let y = internalize_to_bv(ctx, terms, b)?;
      let (bv, core) = ctx.bv_core()?;
      bv.assert_eq_axiom(core, x, y, true);
      Ok(())
    }
    TermKind::Eq => {
      let la = internalize_to_literal(ctx, terms, a)?;
      let lb = internalize_to_literal(ctx, terms, b)?;
      add_clause(ctx, &[!la, lb]);
      add_clause(ctx, &[la, !lb]);
      Ok(())
    }
    _ => Err(Error::Internal.into()),
  }
}

fn assert_toplevel_atom(ctx: &mut Context, terms: &TermTable, atom: Term) -> Result<(), Abort> {
  let tt = atom.is_positive();
  let body = atom.unsigned();
  match terms.kind(body) {
    TermKind::BvEqAtom | TermKind::BvGeAtom | TermKind::BvSgeAtom => {
      let kind = terms.kind(body);
      let args = terms.composite_args(body);
      let (a, b) = (args[0], args[1]);
      let x = internalize_to_bv(ctx, terms, a)?;
      let y = internalize_to_bv(ctx, terms, b)?;
      let (bv, core) = ctx.bv_core()?;
      match kind {
        TermKind::BvEqAtom => bv.assert_eq_axiom(core, x, y, tt),
        TermKind::BvGeAtom => bv.assert_ge_axiom(core, x, y, tt),
        _ => bv.assert_sge_axiom(core, x, y, tt),
      }
      Ok(())
    }

    TermKind::Bit => {
      // The atom's root is already marked true, so build the bit literal from the
      // structure rather than through the internalization table.
      let (index, arg) = match terms.desc(body) {
        TermDesc::Select { index, arg } => (*index, *arg),
        _ => return Err(Error::Internal.into()),
      };
      let v = internalize_to_bv(ctx, terms, arg)?;
      let (bv, core) = ctx.bv_core()?;
      let l = bv.select_bit(core, v, index);
      ctx.core.add_unit_clause(if tt { l } else { !l });
      Ok(())
    }

    TermKind::Distinct => assert_toplevel_distinct(ctx, terms, body, tt),

    _ => Err(Error::Internal.into()),
  }
}

/// `distinct` asserted true is pairwise disequality axioms; negated it is one clause of
/// equalities.
fn assert_toplevel_distinct(ctx: &mut Context, terms: &TermTable, body: Term, tt: bool) -> Result<(), Abort> {
  let args: Vec<Term> = terms.composite_args(body).to_vec();

  if terms.is_boolean(args[0]) {
    if tt && args.len() > 2 {
      // More than two pairwise-distinct Booleans cannot exist.
      return Err(Abort::TriviallyUnsat);
    }
    let l = distinct_literal(ctx, terms, body)?;
    ctx.core.add_unit_clause(if tt { l } else { !l });
    return Ok(());
  }

  let mut vars = Vec::with_capacity(args.len());
  for &arg in &args {
    vars.push(internalize_to_bv(ctx, terms, arg)?);
  }

  if tt {
    for i in 0..vars.len() {
      for j in i + 1..vars.len() {
        let (bv, core) = ctx.bv_core()?;
        bv.assert_eq_axiom(core, vars[i], vars[j], false);
      }
    }
  } else {
    let mut clause = Vec::new();
    for i in 0..vars.len() {
      for j in i + 1..vars.len() {
        let (bv, core) = ctx.bv_core()?;
        clause.push(bv.create_eq_atom(core, vars[i], vars[j]));
      }
    }
    add_clause(ctx, &clause);
  }
  Ok(())
}

fn assert_toplevel_formula(ctx: &mut Context, terms: &TermTable, f: Term) -> Result<(), Abort> {
  let tt = f.is_positive();
  let body = f.unsigned();
  match terms.kind(body) {
    TermKind::Or => {
      // Flattening only routes positive disjunctions here.
      debug_assert!(tt);
      let leaves = flatten_or_leaves(ctx, terms, body);
      let mut clause = Vec::with_capacity(leaves.len());
      for leaf in leaves {
        clause.push(internalize_to_literal(ctx, terms, leaf)?);
      }
      add_clause(ctx, &clause);
      Ok(())
    }

    TermKind::Xor => {
      let args: Vec<Term> = terms.composite_args(body).to_vec();
      let mut lits = Vec::with_capacity(args.len());
      for arg in args {
        lits.push(internalize_to_literal(ctx, terms, arg)?);
      }
      let l = ctx.gates.xor_n(&mut ctx.core, &lits);
      ctx.core.add_unit_clause(if tt { l } else { !l });
      Ok(())
    }

    TermKind::Ite => {
      let args = terms.composite_args(body);
      let (c, a, b) = (args[0], args[1], args[2]);
      let lc = internalize_to_literal(ctx, terms, c)?;
      let la = internalize_to_literal(ctx, terms, a)?;
      let lb = internalize_to_literal(ctx, terms, b)?;
      if tt {
        add_clause(ctx, &[!lc, la]);
        add_clause(ctx, &[lc, lb]);
      } else {
        add_clause(ctx, &[!lc, !la]);
        add_clause(ctx, &[lc, !lb]);
      }
      Ok(())
    }

    TermKind::Eq => {
      let args = terms.composite_args(body);
      let (a, b) = (args[0], args[1]);
      let la = internalize_to_literal(ctx, terms, a)?;
      let lb = internalize_to_literal(ctx, terms, b)?;
      if tt {
        add_clause(ctx, &[!la, lb]);
        add_clause(ctx, &[la, !lb]);
      } else {
        add_clause(ctx, &[la, lb]);
        add_clause(ctx, &[!la, !lb]);
      }
      Ok(())
    }

    _ => Err(Error::Internal.into()),
  }
}

fn add_clause(ctx: &mut Context, lits: &[Lit]) {
  let mut v = lits.to_vec();
  ctx.core.simplify_and_add_clause(&mut v);
}
