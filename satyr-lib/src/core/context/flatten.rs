/*!

Assertion flattening and classification.

The assertion is treated as a conjunction: a work queue holds conjuncts still to be
classified. Negated disjunctions split into more conjuncts; everything else lands in one
of the four buckets (`top_eqs`, `top_atoms`, `top_formulas`, `top_interns`) or becomes a
candidate substitution. Every classified conjunct is marked true in the internalization
table, so a later occurrence of the same subformula collapses to the constant.

ITE-equality flattening happens here too: `(ite c a b) = k` with `k` structurally
distinct from `b` rewrites to the conjuncts `c` and `a = k` (and symmetrically), applied
recursively down the chosen branch. Structural distinctness is decided for constants,
where hash consing makes inequality of indices semantic.

*/

use std::collections::VecDeque;

use satyr_abs::HashSet;

use crate::{
  api::Error,
  core::{
    context::{Abort, Context, ContextOption},
    sat::TRUE_LIT,
    term::{Term, TermKind, TermTable, FALSE_TERM, TRUE_TERM},
  },
};

/// Whether the root occurrence `r` is the constant true (directly or through its code).
pub(crate) fn term_is_true(ctx: &Context, r: Term) -> bool {
  if r == TRUE_TERM {
    return true;
  }
  matches!(
    ctx.intern.root_code(r),
    Some(crate::core::intern::InternCode::Literal(l)) if l == TRUE_LIT
  )
}

pub(crate) fn term_is_false(ctx: &Context, r: Term) -> bool {
  term_is_true(ctx, r.opposite())
}

/// Marks the root occurrence `r` as asserted true.
fn mark_true(ctx: &mut Context, r: Term) {
  ctx.intern.map_root_to_literal(r, TRUE_LIT);
}

/// Two terms that cannot be equal, decided structurally: distinct constants of one type
/// share no value because constants are hash-consed.
fn structurally_distinct(terms: &TermTable, a: Term, b: Term) -> bool {
  a != b && terms.kind(a).is_constant() && terms.kind(b).is_constant()
}

pub(crate) fn flatten_assertion(ctx: &mut Context, terms: &mut TermTable, f: Term) -> Result<(), Abort> {
  let mut queue: VecDeque<Term> = VecDeque::new();
  queue.push_back(f);

  while let Some(t) = queue.pop_front() {
    let r = ctx.intern.get_root(t);
    if term_is_true(ctx, r) {
      continue;
    }
    if term_is_false(ctx, r) {
      return Err(Abort::TriviallyUnsat);
    }
    if ctx.intern.root_code(r).is_some() {
      // Internalized in an earlier assertion or frame; assert its literal later.
      ctx.top_interns.push(r);
      continue;
    }

    let body = r.unsigned();
    match terms.kind(body) {
      TermKind::Constant => {
        // true/false are caught above; no other Boolean constants exist.
        return Err(Error::Internal.into());
      }

      TermKind::Uninterpreted => {
        // A Boolean variable asserted outright: map it to the constant.
        mark_true(ctx, r);
      }

      TermKind::Or => {
        if r.is_negative() {
          // not(or a1 ... an) is the conjunction of the negations.
          for &arg in terms.composite_args(body).to_vec().iter() {
            queue.push_back(arg.opposite());
          }
        } else {
          mark_true(ctx, r);
          ctx.top_formulas.push(r);
        }
      }

      TermKind::Eq => {
        // Boolean equality (iff). Cheap rewrites first: equal or opposite roots decide
        // the equality, and a constant side turns it into a plain assertion.
        let args = terms.composite_args(body);
        let (a, b) = (args[0], args[1]);
        let (a, b) = if r.is_negative() { (a.opposite(), b) } else { (a, b) };
        match simplify_bool_eq(ctx, terms, a, b) {
          Some(true) => continue,
          Some(false) => return Err(Abort::TriviallyUnsat),
          None => {}
        }
        if a == TRUE_TERM || a == FALSE_TERM {
          queue.push_back(b.with_sign(a == TRUE_TERM));
          continue;
        }
        if b == TRUE_TERM || b == FALSE_TERM {
          queue.push_back(a.with_sign(b == TRUE_TERM));
          continue;
        }
        mark_true(ctx, r);
        ctx.top_formulas.push(r);
      }

      TermKind::Xor | TermKind::Ite => {
        mark_true(ctx, r);
        ctx.top_formulas.push(r);
      }

      TermKind::BvEqAtom => {
        if r.is_negative() {
          mark_true(ctx, r);
          ctx.top_atoms.push(r);
        } else {
          flatten_toplevel_bveq(ctx, terms, r, &mut queue)?;
        }
      }

      TermKind::BvGeAtom | TermKind::BvSgeAtom | TermKind::Bit => {
        mark_true(ctx, r);
        ctx.top_atoms.push(r);
      }

      TermKind::Distinct => {
        // distinct is classified as a generic atom, whatever the argument sort.
        mark_true(ctx, r);
        ctx.top_atoms.push(r);
      }

      _ => {
        // A bit-vector term in Boolean position: the term table should have refused it.
        return Err(Error::Type.into());
      }
    }
  }
  Ok(())
}

/// A positive bit-vector equality asserted at the top level: try the cheap
/// simplifications, ITE-equality flattening, and variable elimination before settling
/// for `top_eqs`.
fn flatten_toplevel_bveq(
  ctx: &mut Context,
  terms: &mut TermTable,
  r: Term,
  queue: &mut VecDeque<Term>,
) -> Result<(), Abort> {
  let args = terms.composite_args(r.unsigned());
  let (a, b) = (args[0], args[1]);

  match simplify_bitvector_eq(ctx, terms, a, b) {
    Some(true) => return Ok(()),
    Some(false) => return Err(Abort::TriviallyUnsat),
    None => {}
  }

  // (ite c x y) = k with a constant mismatch on a branch collapses the ite.
  if let Some((conditions, residual_eq)) = flatten_ite_equality(terms, a, b)? {
    for c in conditions {
      queue.push_back(c);
    }
    queue.push_back(residual_eq);
    return Ok(());
  }

  if ctx.option_enabled(ContextOption::VarElim) {
    if let Some((x, t)) = pick_subst_candidate(ctx, terms, a, b) {
      if terms.kind(t.unsigned()).is_constant() {
        // Cheap case: substituting by a constant can never create a cycle.
        ctx.intern.substitute(x, t);
        mark_true(ctx, r);
        return Ok(());
      }
      ctx.subst_eqs.push(r);
      mark_true(ctx, r);
      return Ok(());
    }
  }

  mark_true(ctx, r);
  ctx.top_eqs.push(r);
  Ok(())
}

/// Cheap equality simplification by roots: identical roots are equal; distinct
/// constants are unequal.
pub(crate) fn simplify_bitvector_eq(ctx: &Context, terms: &TermTable, a: Term, b: Term) -> Option<bool> {
  let ra = ctx.intern.get_root(a);
  let rb = ctx.intern.get_root(b);
  if ra == rb {
    return Some(true);
  }
  if structurally_distinct(terms, ra.unsigned(), rb.unsigned()) {
    return Some(false);
  }
  None
}

/// The Boolean analogue, also catching opposite roots.
pub(crate) fn simplify_bool_eq(ctx: &Context, _terms: &TermTable, a: Term, b: Term) -> Option<bool> {
  let ra = ctx.intern.get_root(a);
  let rb = ctx.intern.get_root(b);
  if ra == rb {
    return Some(true);
  }
  if Term::are_opposite(ra, rb) {
    return Some(false);
  }
  None
}

/// Rewrites `(ite c x y) = k` into conjuncts when a branch is structurally distinct
/// from `k`, recursively along the surviving branch. Returns the collected Boolean
/// conditions and the residual equality, or `None` if the pattern does not apply.
fn flatten_ite_equality(terms: &mut TermTable, a: Term, b: Term) -> Result<Option<(Vec<Term>, Term)>, Abort> {
  let (mut t, k) = if terms.kind(a.unsigned()) == TermKind::Ite && terms.is_bitvector(a) {
    (a, b)
  } else if terms.kind(b.unsigned()) == TermKind::Ite && terms.is_bitvector(b) {
    (b, a)
  } else {
    return Ok(None);
  };

  let mut conditions: Vec<Term> = Vec::new();
  loop {
    if terms.kind(t.unsigned()) != TermKind::Ite {
      break;
    }
    let args = terms.composite_args(t.unsigned());
    let (c, x, y) = (args[0], args[1], args[2]);
    if structurally_distinct(terms, y, k) {
      // The else-branch cannot match: the condition must hold.
      conditions.push(c);
      t = x;
    } else if structurally_distinct(terms, x, k) {
      conditions.push(c.opposite());
      t = y;
    } else {
      break;
    }
  }

  if conditions.is_empty() {
    return Ok(None);
  }
  let residual = terms.eq(t, k).map_err(Abort::from)?;
  Ok(Some((conditions, residual)))
}

/// If one side is an uninterpreted term that is still a free root, returns it (as the
/// substitution variable) and the other side. Prefers the left side.
fn pick_subst_candidate(ctx: &Context, terms: &TermTable, a: Term, b: Term) -> Option<(Term, Term)> {
  let free_var = |x: Term| -> bool {
    terms.kind(x.unsigned()) == TermKind::Uninterpreted
      && ctx.intern.is_root(x)
      && ctx.intern.root_code(ctx.intern.get_root(x)).is_none()
  };
  if free_var(a) && !ctx.intern.reaches(terms, b, a.index()) {
    return Some((a, b));
  }
  if free_var(b) && !ctx.intern.reaches(terms, a, b.index()) {
    return Some((b, a));
  }
  None
}

/// Recursively flattens a (positive) `or` term into its leaves, skipping duplicates.
/// Used at assertion time to emit one flat clause.
pub(crate) fn flatten_or_leaves(ctx: &Context, terms: &TermTable, or: Term) -> Vec<Term> {
  debug_assert!(or.is_positive());
  let mut leaves: Vec<Term> = Vec::new();
  let mut seen: HashSet<Term> = HashSet::default();
  let mut stack: Vec<Term> = vec![or];

  while let Some(t) = stack.pop() {
    if !seen.insert(t) {
      continue;
    }
    let flatten = ctx.option_enabled(ContextOption::FlattenOr);
    if t.is_positive() && terms.kind(t.unsigned()) == TermKind::Or && (flatten || t == or) {
      for &arg in terms.composite_args(t.unsigned()) {
        stack.push(arg);
      }
    } else {
      leaves.push(t);
    }
  }
  leaves
}
