/*!

Models: concrete values for the uninterpreted terms of a satisfiable context, and a
term evaluator over those values.

A model is built by walking the internalization map. Uninterpreted terms mapped to a
core literal read the SAT assignment; terms mapped to a theory variable query the
bit-vector solver's model; terms eliminated by substitution are evaluated from their
class root; everything else receives a default value (false, or the zero vector).

Once built, a model is self-contained: [`Model::eval`] interprets any term of the table
against it, which is what `get-value` style queries and the model-soundness checks use.

*/

use satyr_abs::{
  numeric::{BigUint, One, Zero},
  HashMap,
};

use crate::{
  api::Error,
  core::{
    bvarith::{norm64, BvConst, CONST_IDX},
    context::Context,
    intern::InternCode,
    term::{Term, TermDesc, TermKind, TermTable, TypeDesc},
  },
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
  Bool(bool),
  Bv(BvConst),
}

impl Value {
  pub fn as_bool(&self) -> Result<bool, Error> {
    match self {
      Value::Bool(b) => Ok(*b),
      Value::Bv(_) => Err(Error::Type),
    }
  }

  pub fn as_bv(&self) -> Result<&BvConst, Error> {
    match self {
      Value::Bv(c) => Ok(c),
      Value::Bool(_) => Err(Error::Type),
    }
  }
}

#[derive(Default)]
pub struct Model {
  /// Values of uninterpreted terms, keyed by positive occurrence.
  values: HashMap<Term, Value>,
}

impl Model {
  /// The recorded value of an uninterpreted term, if any.
  pub fn value_of(&self, t: Term) -> Option<&Value> {
    self.values.get(&t.unsigned())
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Evaluates an arbitrary term against this model. Uninterpreted terms without a
  /// recorded value default to false / the zero vector.
  pub fn eval(&self, terms: &TermTable, t: Term) -> Result<Value, Error> {
    let mut cache: HashMap<Term, Value> = HashMap::default();
    self.eval_cached(terms, t, &mut cache)
  }

  fn eval_cached(&self, terms: &TermTable, t: Term, cache: &mut HashMap<Term, Value>) -> Result<Value, Error> {
    let body = t.unsigned();
    let value = match cache.get(&body) {
      Some(v) => v.clone(),
      None => {
        let v = self.eval_body(terms, body, cache)?;
        cache.insert(body, v.clone());
        v
      }
    };
    if t.is_negative() {
      Ok(Value::Bool(!value.as_bool()?))
    } else {
      Ok(value)
    }
  }

  fn eval_body(&self, terms: &TermTable, body: Term, cache: &mut HashMap<Term, Value>) -> Result<Value, Error> {
    debug_assert!(body.is_positive());
    let n = terms.bitsize(body);
    match terms.kind(body) {
      TermKind::Constant => Ok(Value::Bool(true)),

      TermKind::Uninterpreted => Ok(
        self
          .values
          .get(&body)
          .cloned()
          .unwrap_or_else(|| default_value(terms, body)),
      ),

      TermKind::BvConst64 => match terms.desc(body) {
        TermDesc::BvConst64(c) => Ok(Value::Bv(BvConst::from_u64(c.bitsize, c.value))),
        _ => Err(Error::Internal),
      },

      TermKind::BvConst => match terms.desc(body) {
        TermDesc::BvConst(c) => Ok(Value::Bv((**c).clone())),
        _ => Err(Error::Internal),
      },

      TermKind::Ite => {
        let args = terms.composite_args(body);
        let c = self.eval_cached(terms, args[0], cache)?.as_bool()?;
        self.eval_cached(terms, if c { args[1] } else { args[2] }, cache)
      }

      TermKind::Eq | TermKind::BvEqAtom => {
        let args = terms.composite_args(body);
        let va = self.eval_cached(terms, args[0], cache)?;
        let vb = self.eval_cached(terms, args[1], cache)?;
        Ok(Value::Bool(va == vb))
      }

      TermKind::Distinct => {
        let args = terms.composite_args(body);
        let mut vals = Vec::with_capacity(args.len());
        for &arg in args {
          vals.push(self.eval_cached(terms, arg, cache)?);
        }
        let mut all_distinct = true;
        'outer: for i in 0..vals.len() {
          for j in i + 1..vals.len() {
            if vals[i] == vals[j] {
              all_distinct = false;
              break 'outer;
            }
          }
        }
        Ok(Value::Bool(all_distinct))
      }

      TermKind::Or => {
        let args = terms.composite_args(body);
        for &arg in args {
          if self.eval_cached(terms, arg, cache)?.as_bool()? {
            return Ok(Value::Bool(true));
          }
        }
        Ok(Value::Bool(false))
      }

      TermKind::Xor => {
        let args = terms.composite_args(body);
        let mut parity = false;
        for &arg in args {
          parity ^= self.eval_cached(terms, arg, cache)?.as_bool()?;
        }
        Ok(Value::Bool(parity))
      }

      TermKind::Bit => match terms.desc(body) {
        TermDesc::Select { index, arg } => {
          let v = self.eval_cached(terms, *arg, cache)?;
          Ok(Value::Bool(v.as_bv()?.bit(*index)))
        }
        _ => Err(Error::Internal),
      },

      TermKind::BvArray => {
        let args = terms.composite_args(body).to_vec();
        let mut value = BigUint::zero();
        for (i, arg) in args.iter().enumerate() {
          if self.eval_cached(terms, *arg, cache)?.as_bool()? {
            value.set_bit(i as u64, true);
          }
        }
        Ok(Value::Bv(BvConst::new(n, value)))
      }

      TermKind::BvGeAtom => {
        let (x, y) = self.eval_bv_pair(terms, body, cache)?;
        Ok(Value::Bool(x.value >= y.value))
      }

      TermKind::BvSgeAtom => {
        let (x, y) = self.eval_bv_pair(terms, body, cache)?;
        let w = x.bitsize;
        // Flipping the sign bit turns signed order into unsigned order.
        let flip = BigUint::one() << (w - 1);
        Ok(Value::Bool((&x.value ^ &flip) >= (&y.value ^ &flip)))
      }

      TermKind::BvDiv => {
        let (x, y) = self.eval_bv_pair(terms, body, cache)?;
        let value = if y.value.is_zero() {
          ones(n)
        } else {
          &x.value / &y.value
        };
        Ok(Value::Bv(BvConst::new(n, value)))
      }

      TermKind::BvRem => {
        let (x, y) = self.eval_bv_pair(terms, body, cache)?;
        let value = if y.value.is_zero() {
          x.value.clone()
        } else {
          &x.value % &y.value
        };
        Ok(Value::Bv(BvConst::new(n, value)))
      }

      TermKind::BvSdiv => {
        let (x, y) = self.eval_bv_pair(terms, body, cache)?;
        Ok(Value::Bv(BvConst::new(n, signed_div(&x.value, &y.value, n))))
      }

      TermKind::BvSrem => {
        let (x, y) = self.eval_bv_pair(terms, body, cache)?;
        Ok(Value::Bv(BvConst::new(n, signed_rem(&x.value, &y.value, n))))
      }

      TermKind::BvSmod => {
        let (x, y) = self.eval_bv_pair(terms, body, cache)?;
        Ok(Value::Bv(BvConst::new(n, signed_mod(&x.value, &y.value, n))))
      }

      TermKind::BvShl => {
        let (x, y) = self.eval_bv_pair(terms, body, cache)?;
        let value = match shift_amount(&y.value, n) {
          None => BigUint::zero(),
          Some(k) => &x.value << k,
        };
        Ok(Value::Bv(BvConst::new(n, value)))
      }

      TermKind::BvLshr => {
        let (x, y) = self.eval_bv_pair(terms, body, cache)?;
        let value = match shift_amount(&y.value, n) {
          None => BigUint::zero(),
          Some(k) => &x.value >> k,
        };
        Ok(Value::Bv(BvConst::new(n, value)))
      }

      TermKind::BvAshr => {
        let (x, y) = self.eval_bv_pair(terms, body, cache)?;
        let negative = x.value.bit((n - 1) as u64);
        let value = match shift_amount(&y.value, n) {
          None => {
            if negative {
              ones(n)
            } else {
              BigUint::zero()
            }
          }
          Some(k) => {
            let shifted = &x.value >> k;
            if negative && k > 0 {
              // Fill the vacated high bits with ones.
              let fill = (ones(k) << (n - k as u32)) & ones(n);
              shifted | fill
            } else {
              shifted
            }
          }
        };
        Ok(Value::Bv(BvConst::new(n, value)))
      }

      TermKind::BvPoly64 => match terms.desc(body) {
        TermDesc::Poly64(p) => {
          let p = (**p).clone();
          let mut acc: u64 = 0;
          for mono in &p.monos {
            let term_value = if mono.var == CONST_IDX {
              mono.coeff
            } else {
              let v = self.eval_cached(terms, Term::positive(mono.var), cache)?;
              let c = v.as_bv()?.as_const64().ok_or(Error::Internal)?;
              mono.coeff.wrapping_mul(c.value)
            };
            acc = acc.wrapping_add(term_value);
          }
          Ok(Value::Bv(BvConst::from_u64(n, norm64(n, acc))))
        }
        _ => Err(Error::Internal),
      },

      TermKind::BvPoly => match terms.desc(body) {
        TermDesc::Poly(p) => {
          let p = (**p).clone();
          let modulus = BigUint::one() << n;
          let mut acc = BigUint::zero();
          for mono in &p.monos {
            let term_value = if mono.var == CONST_IDX {
              mono.coeff.clone()
            } else {
              let v = self.eval_cached(terms, Term::positive(mono.var), cache)?;
              (&mono.coeff * &v.as_bv()?.value) % &modulus
            };
            acc = (acc + term_value) % &modulus;
          }
          Ok(Value::Bv(BvConst::new(n, acc)))
        }
        _ => Err(Error::Internal),
      },

      TermKind::PowerProduct => match terms.desc(body) {
        TermDesc::PowerProduct(i) => {
          let p = terms.pprods().prod(*i).clone();
          let modulus = BigUint::one() << n;
          let mut acc = BigUint::one();
          for &(base, exponent) in p.factors() {
            let v = self.eval_cached(terms, base, cache)?;
            let powered = v.as_bv()?.value.modpow(&BigUint::from(exponent), &modulus);
            acc = (acc * powered) % &modulus;
          }
          Ok(Value::Bv(BvConst::new(n, acc)))
        }
        _ => Err(Error::Internal),
      },

      _ => Err(Error::Internal),
    }
  }

  fn eval_bv_pair(
    &self,
    terms: &TermTable,
    body: Term,
    cache: &mut HashMap<Term, Value>,
  ) -> Result<(BvConst, BvConst), Error> {
    let args = terms.composite_args(body);
    let x = self.eval_cached(terms, args[0], cache)?.as_bv()?.clone();
    let y = self.eval_cached(terms, args[1], cache)?.as_bv()?.clone();
    Ok((x, y))
  }
}

fn default_value(terms: &TermTable, t: Term) -> Value {
  match terms.types().desc(terms.type_of(t)) {
    TypeDesc::Bool => Value::Bool(false),
    TypeDesc::BitVec(n) => Value::Bv(BvConst::zero(n)),
  }
}

fn ones(n: u32) -> BigUint {
  (BigUint::one() << n) - BigUint::one()
}

/// Shift amounts at or above the width are reported as `None`.
fn shift_amount(amount: &BigUint, n: u32) -> Option<u32> {
  if *amount >= BigUint::from(n) {
    None
  } else {
    let mut k: u32 = 0;
    for (i, digit) in amount.iter_u32_digits().enumerate() {
      if i == 0 {
        k = digit;
      }
    }
    Some(k)
  }
}

fn magnitude(v: &BigUint, n: u32) -> (BigUint, bool) {
  if v.bit((n - 1) as u64) {
    ((BigUint::one() << n) - v, true)
  } else {
    (v.clone(), false)
  }
}

fn from_signed(mag: BigUint, negative: bool, n: u32) -> BigUint {
  if negative && !mag.is_zero() {
    ((BigUint::one() << n) - mag) & ones(n)
  } else {
    mag & ones(n)
  }
}

fn signed_div(x: &BigUint, y: &BigUint, n: u32) -> BigUint {
  if y.is_zero() {
    // bvsdiv x 0 is 1 when x is negative, else all ones (-1).
    return if x.bit((n - 1) as u64) {
      BigUint::one()
    } else {
      ones(n)
    };
  }
  let (mx, sx) = magnitude(x, n);
  let (my, sy) = magnitude(y, n);
  from_signed(mx / my, sx != sy, n)
}

fn signed_rem(x: &BigUint, y: &BigUint, n: u32) -> BigUint {
  if y.is_zero() {
    return x.clone();
  }
  let (mx, sx) = magnitude(x, n);
  let (my, _) = magnitude(y, n);
  from_signed(mx % my, sx, n)
}

fn signed_mod(x: &BigUint, y: &BigUint, n: u32) -> BigUint {
  if y.is_zero() {
    return x.clone();
  }
  let (mx, sx) = magnitude(x, n);
  let (my, sy) = magnitude(y, n);
  let u = mx % my;
  if u.is_zero() {
    return u;
  }
  let modulus = BigUint::one() << n;
  let neg_u = (&modulus - &u) % &modulus;
  match (sx, sy) {
    (false, false) => u,
    (true, false) => (neg_u + y) % &modulus,
    (false, true) => (u + y) % &modulus,
    (true, true) => neg_u,
  }
}

/// Builds a model by walking the internalization map for every live uninterpreted term.
pub(crate) fn build_model(ctx: &mut Context, terms: &TermTable) -> Result<Model, Error> {
  if let Some(bv) = ctx.bv.as_deref_mut() {
    bv.build_model(&ctx.core);
  }

  let mut model = Model::default();
  let mut result = Ok(());
  for idx in 2..terms.num_slots() as u32 {
    let occ = Term::positive(idx);
    if terms.live_idx(idx) && terms.good_idx(idx) && terms.kind(occ) == TermKind::Uninterpreted {
      if let Err(e) = ensure_value(ctx, terms, &mut model, occ) {
        result = Err(e);
        break;
      }
    }
  }

  if let Some(bv) = ctx.bv.as_deref_mut() {
    bv.free_model();
  }
  result.map(|_| model)
}

fn ensure_value(ctx: &Context, terms: &TermTable, model: &mut Model, x: Term) -> Result<(), Error> {
  debug_assert!(x.is_positive());
  if model.values.contains_key(&x) {
    return Ok(());
  }

  let r = ctx.intern.get_root(x);
  if let Some(code) = ctx.intern.root_code(r) {
    let value = match code {
      InternCode::Literal(l) => Value::Bool(ctx.core.lit_is_true(l)),
      InternCode::Thvar(v) => {
        let bv = ctx.bv.as_deref().ok_or(Error::Internal)?;
        Value::Bv(bv.value_in_model(&ctx.core, v).ok_or(Error::Internal)?)
      }
    };
    model.values.insert(x, value);
    return Ok(());
  }

  if r.unsigned() == x {
    // Never internalized and never substituted: any value works.
    model.values.insert(x, default_value(terms, x));
    return Ok(());
  }

  // Eliminated by substitution: give every uninterpreted leaf of the class root a
  // value first, then evaluate the root. The intern table is acyclic, so this
  // terminates.
  for leaf in uninterpreted_leaves(terms, r.unsigned()) {
    if leaf != x {
      ensure_value(ctx, terms, model, leaf)?;
    }
  }
  let value = model.eval(terms, r)?;
  model.values.insert(x, value);
  Ok(())
}

/// The uninterpreted terms appearing in the dag of `body`.
fn uninterpreted_leaves(terms: &TermTable, body: Term) -> Vec<Term> {
  let mut leaves = Vec::new();
  let mut visited = satyr_abs::NatSet::new();
  let mut stack: Vec<u32> = vec![body.index()];

  while let Some(i) = stack.pop() {
    if !visited.insert(i as usize) || !terms.good_idx(i) {
      continue;
    }
    let occ = Term::positive(i);
    if terms.kind(occ) == TermKind::Uninterpreted {
      leaves.push(occ);
      continue;
    }
    match terms.desc(occ) {
      TermDesc::Integer(_) | TermDesc::BvConst64(_) | TermDesc::BvConst(_) => {}
      TermDesc::Composite(args) => {
        for &arg in args.iter() {
          stack.push(arg.index());
        }
      }
      TermDesc::Select { arg, .. } => stack.push(arg.index()),
      TermDesc::Poly64(p) => {
        for mono in &p.monos {
          if mono.var != CONST_IDX {
            stack.push(mono.var);
          }
        }
      }
      TermDesc::Poly(p) => {
        for mono in &p.monos {
          if mono.var != CONST_IDX {
            stack.push(mono.var);
          }
        }
      }
      TermDesc::PowerProduct(r) => {
        for &(base, _) in terms.pprods().prod(*r).factors() {
          stack.push(base.index());
        }
      }
    }
  }
  leaves
}
