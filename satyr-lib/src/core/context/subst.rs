/*!

Delayed candidate substitutions.

Flattening collects equalities `x = t` (with `x` an uninterpreted free root) whose
right-hand side is not a constant. Committing them blindly could create cycles
(`x = f(y)` together with `y = g(x)`), so the candidates are ordered by a tri-color
depth-first search over their dependency graph: white = unvisited, grey = on the current
path, black = done. Hitting a grey node means the equality that triggered the edge is a
cycle member; it is demoted back to `top_eqs` and handled as an ordinary equality.
Surviving candidates are committed innermost-first, and each commit re-checks the
occurs-condition against the already-committed state.

*/

use satyr_abs::{HashMap, NatSet};

use crate::core::{
  bvarith::CONST_IDX,
  context::{Abort, Context},
  term::{Term, TermDesc, TermKind, TermTable},
};

/// A delayed candidate: the equality term, the variable occurrence, and the value term.
struct Candidate {
  eq: Term,
  x: Term,
  t: Term,
}

pub(crate) fn process_candidate_subst(ctx: &mut Context, terms: &TermTable) -> Result<(), Abort> {
  if ctx.subst_eqs.is_empty() {
    return Ok(());
  }
  let delayed = std::mem::take(&mut ctx.subst_eqs);

  // Re-derive each candidate; earlier commits may have claimed a variable already.
  let mut pending: HashMap<u32, Candidate> = HashMap::default();
  let mut order: Vec<u32> = Vec::new();
  for eq in delayed {
    match derive_candidate(ctx, terms, eq) {
      Some(candidate) => {
        let key = candidate.x.index();
        if pending.contains_key(&key) {
          // Two candidate definitions for one variable: keep the first.
          ctx.top_eqs.push(eq);
        } else {
          order.push(key);
          pending.insert(key, candidate);
        }
      }
      None => ctx.top_eqs.push(eq),
    }
  }

  let mut grey = NatSet::new();
  let mut black = NatSet::new();
  for &x in &order {
    visit(ctx, terms, x, &pending, &mut grey, &mut black)?;
  }

  debug_assert!(ctx.intern.is_acyclic());
  Ok(())
}

/// Depth-first commit of candidate `x`. Grey-hit demotes the triggering equality.
fn visit(
  ctx: &mut Context,
  terms: &TermTable,
  x: u32,
  pending: &HashMap<u32, Candidate>,
  grey: &mut NatSet,
  black: &mut NatSet,
) -> Result<(), Abort> {
  if black.contains(x as usize) {
    return Ok(());
  }
  let candidate = match pending.get(&x) {
    Some(c) => c,
    None => return Ok(()),
  };
  grey.insert(x as usize);

  let mut demoted = false;
  for dep in candidate_deps(ctx, terms, candidate.t, pending) {
    if grey.contains(dep as usize) {
      // A cycle through `dep`: this equality cannot become a substitution.
      ctx.top_eqs.push(candidate.eq);
      demoted = true;
      break;
    }
    visit(ctx, terms, dep, pending, grey, black)?;
  }

  if !demoted {
    // Committed dependencies may have rerouted `t`'s class; re-check the occurs
    // condition and that `x` is still a free root before committing.
    let still_free = ctx.intern.is_root(candidate.x)
      && ctx.intern.root_code(ctx.intern.get_root(candidate.x)).is_none();
    if still_free && !ctx.intern.reaches(terms, candidate.t, x) {
      ctx.intern.substitute(candidate.x, candidate.t);
    } else {
      ctx.top_eqs.push(candidate.eq);
    }
  }

  grey.remove(x as usize);
  black.insert(x as usize);
  Ok(())
}

/// Decodes the candidate shape of a (positive) equality occurrence, if it still
/// applies: one side an uninterpreted free root, types compatible (guaranteed by the
/// constructor), and no immediate occurs-violation.
fn derive_candidate(ctx: &Context, terms: &TermTable, eq: Term) -> Option<Candidate> {
  debug_assert!(eq.is_positive());
  let kind = terms.kind(eq.unsigned());
  if kind != TermKind::BvEqAtom && kind != TermKind::Eq {
    return None;
  }
  let args = terms.composite_args(eq.unsigned());
  let (a, b) = (args[0], args[1]);

  let free_var = |x: Term| -> bool {
    terms.kind(x.unsigned()) == TermKind::Uninterpreted
      && ctx.intern.is_root(x)
      && ctx.intern.root_code(ctx.intern.get_root(x)).is_none()
  };
  if free_var(a) {
    return Some(Candidate { eq, x: a, t: b });
  }
  if free_var(b) {
    return Some(Candidate { eq, x: b, t: a });
  }
  None
}

/// The pending-candidate variables reachable from `t` through descriptors and class
/// roots.
fn candidate_deps(
  ctx: &Context,
  terms: &TermTable,
  t: Term,
  pending: &HashMap<u32, Candidate>,
) -> Vec<u32> {
  let mut deps: Vec<u32> = Vec::new();
  let mut visited = NatSet::new();
  let mut stack: Vec<u32> = vec![ctx.intern.get_root(t).index()];

  while let Some(i) = stack.pop() {
    if !visited.insert(i as usize) {
      continue;
    }
    if pending.contains_key(&i) {
      deps.push(i);
      continue;
    }
    if !terms.good_idx(i) {
      continue;
    }
    let push = |stack: &mut Vec<u32>, s: Term| {
      stack.push(ctx.intern.get_root(s).index());
    };
    match terms.desc(Term::positive(i)) {
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
  deps
}
