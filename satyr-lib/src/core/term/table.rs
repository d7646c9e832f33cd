/*!

The term table.

Rows are parallel vectors `kind`/`desc`/`ty` plus a one-bit-per-slot mark set used by the
collector. Deleted indices chain into a free list through the `Integer` descriptor.
Constructors perform structural hash consing and nothing else: no simplification, no
rewriting. Type correctness *is* checked, and violations surface as distinct
[`TermError`] kinds.

*/

use satyr_abs::{HashMap, IString, NatSet, SmallVec};
use thiserror::Error;

use crate::core::{
  bvarith::{BvArithBuffer, BvArithBuffer64, BvConst, BvConst64, CONST_IDX},
  term::{
    descriptor::{structural_hash, TermDesc},
    kind::TermKind,
    occurrence::{Term, BOOL_CONST_IDX, RESERVED_IDX, TRUE_TERM},
    pprod::{PProdTable, PowerProduct},
    symbol_table::SymbolTable,
    types::{Type, TypeTable},
  },
};

/// Upper bound on the arity of composite terms.
pub const MAX_ARITY: usize = 1 << 20;

/// Failure modes of term construction and lookup.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum TermError {
  #[error("composite arity {0} exceeds the implementation limit")]
  TooManyArgs(usize),
  #[error("argument term has the wrong type")]
  TypeMismatch,
  #[error("bit-vector width {0} out of range")]
  BitsizeTooLarge(u32),
  #[error("term index is stale or reserved")]
  StaleTerm,
  #[error("constant index {0} out of range for the type")]
  BadConstantIndex(i32),
  #[error("power product is empty or a bare variable")]
  TrivialPowerProduct,
  #[error("total degree exceeds the implementation limit")]
  DegreeOverflow,
}

impl From<TermError> for crate::api::Error {
  fn from(e: TermError) -> Self {
    match e {
      TermError::TypeMismatch | TermError::BadConstantIndex(_) | TermError::BitsizeTooLarge(_) => {
        crate::api::Error::Type
      }
      _ => crate::api::Error::Internal,
    }
  }
}

pub struct TermTable {
  kind: Vec<TermKind>,
  desc: Vec<TermDesc>,
  ty: Vec<Type>,
  mark: NatSet,

  /// Head of the free list; -1 when empty.
  free_idx: i32,
  live_terms: u32,
  /// Serial numbers handed to fresh uninterpreted terms.
  uninterpreted_serial: i32,

  types: TypeTable,
  pprods: PProdTable,

  /// Hash-consing index: structural hash -> bucket of candidate indices.
  htbl: HashMap<u64, SmallVec<[u32; 1]>>,
  symbols: SymbolTable,
}

impl TermTable {
  pub fn new() -> Self {
    let mut table = TermTable {
      kind: Vec::with_capacity(64),
      desc: Vec::with_capacity(64),
      ty: Vec::with_capacity(64),
      mark: NatSet::new(),
      free_idx: -1,
      live_terms: 0,
      uninterpreted_serial: 0,
      types: TypeTable::new(),
      pprods: PProdTable::new(),
      htbl: HashMap::default(),
      symbols: SymbolTable::new(),
    };

    // Index 0 is reserved; index 1 is the Boolean constant `true`.
    table.push_row(TermKind::Reserved, Type::BOOL, TermDesc::Integer(0));
    table.push_row(TermKind::Constant, Type::BOOL, TermDesc::Integer(0));
    debug_assert_eq!(TRUE_TERM.index(), BOOL_CONST_IDX);
    table
  }

  // region Table plumbing

  fn push_row(&mut self, kind: TermKind, tau: Type, desc: TermDesc) -> u32 {
    self.kind.push(kind);
    self.ty.push(tau);
    self.desc.push(desc);
    self.live_terms += 1;
    (self.kind.len() - 1) as u32
  }

  fn alloc(&mut self, kind: TermKind, tau: Type, desc: TermDesc) -> u32 {
    if self.free_idx >= 0 {
      let i = self.free_idx as usize;
      self.free_idx = self.desc[i].as_integer();
      self.kind[i] = kind;
      self.ty[i] = tau;
      self.desc[i] = desc;
      self.live_terms += 1;
      i as u32
    } else {
      self.push_row(kind, tau, desc)
    }
  }

  /// Returns the positive occurrence of the term with the given shape, creating it if no
  /// structurally equal term exists.
  fn hash_cons(&mut self, kind: TermKind, tau: Type, desc: TermDesc) -> Term {
    let h = structural_hash(kind, tau, &desc);
    if let Some(bucket) = self.htbl.get(&h) {
      for &i in bucket {
        let i = i as usize;
        if self.kind[i] == kind && self.ty[i] == tau && self.desc[i] == desc {
          return Term::positive(i as u32);
        }
      }
    }
    let i = self.alloc(kind, tau, desc);
    self.htbl.entry(h).or_default().push(i);
    Term::positive(i)
  }

  // endregion

  // region Accessors

  #[inline(always)]
  pub fn num_slots(&self) -> usize {
    self.kind.len()
  }

  #[inline(always)]
  pub fn live_terms(&self) -> u32 {
    self.live_terms
  }

  #[inline(always)]
  pub fn types(&self) -> &TypeTable {
    &self.types
  }

  #[inline(always)]
  pub fn types_mut(&mut self) -> &mut TypeTable {
    &mut self.types
  }

  #[inline(always)]
  pub fn pprods(&self) -> &PProdTable {
    &self.pprods
  }

  #[inline(always)]
  pub fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  #[inline(always)]
  fn valid_idx(&self, i: u32) -> bool {
    (i as usize) < self.kind.len()
  }

  #[inline(always)]
  pub fn live_idx(&self, i: u32) -> bool {
    self.valid_idx(i) && self.kind[i as usize] != TermKind::Unused
  }

  #[inline(always)]
  pub fn good_idx(&self, i: u32) -> bool {
    self.valid_idx(i) && self.kind[i as usize] > TermKind::Reserved
  }

  /// A good term occurrence: a live, non-reserved index, with negative polarity only on
  /// Boolean terms.
  pub fn good_term(&self, t: Term) -> bool {
    self.good_idx(t.index()) && (t.is_positive() || self.is_boolean(t))
  }

  #[inline(always)]
  pub fn kind(&self, t: Term) -> TermKind {
    debug_assert!(self.good_idx(t.index()));
    self.kind[t.index() as usize]
  }

  #[inline(always)]
  pub fn type_of(&self, t: Term) -> Type {
    debug_assert!(self.good_idx(t.index()));
    self.ty[t.index() as usize]
  }

  #[inline(always)]
  pub fn desc(&self, t: Term) -> &TermDesc {
    debug_assert!(self.good_idx(t.index()));
    &self.desc[t.index() as usize]
  }

  #[inline(always)]
  pub fn is_boolean(&self, t: Term) -> bool {
    self.types.is_bool(self.type_of(t))
  }

  #[inline(always)]
  pub fn is_bitvector(&self, t: Term) -> bool {
    self.types.is_bitvector(self.type_of(t))
  }

  /// Width of a bit-vector term. Zero for Boolean terms.
  #[inline(always)]
  pub fn bitsize(&self, t: Term) -> u32 {
    self.types.bv_size(self.type_of(t))
  }

  pub fn composite_args(&self, t: Term) -> &[Term] {
    self.desc(t).as_composite()
  }

  /// Degree of a bit-vector term: 0 for constants, the product degree for power
  /// products, the maximal monomial degree for polynomials, 1 otherwise.
  pub fn degree(&self, t: Term) -> u64 {
    match self.kind(t) {
      k if k.is_constant() => 0,
      TermKind::PowerProduct => match self.desc(t) {
        TermDesc::PowerProduct(i) => self.pprods.prod(*i).degree(),
        _ => unreachable!(),
      },
      TermKind::BvPoly64 => match self.desc(t) {
        TermDesc::Poly64(p) => p
          .monos
          .iter()
          .map(|m| {
            if m.var == CONST_IDX {
              0
            } else {
              self.degree(Term::positive(m.var))
            }
          })
          .max()
          .unwrap_or(0),
        _ => unreachable!(),
      },
      TermKind::BvPoly => match self.desc(t) {
        TermDesc::Poly(p) => p
          .monos
          .iter()
          .map(|m| {
            if m.var == CONST_IDX {
              0
            } else {
              self.degree(Term::positive(m.var))
            }
          })
          .max()
          .unwrap_or(0),
        _ => unreachable!(),
      },
      _ => 1,
    }
  }

  // endregion

  // region Constructors

  /// Constant of the given type and index. In this fragment the only constructible
  /// constant is the Boolean `true` (index 0); bit-vector constants go through
  /// [`TermTable::bv64_constant`] and [`TermTable::bv_constant`].
  pub fn constant_term(&mut self, tau: Type, index: i32) -> Result<Term, TermError> {
    if !self.types.is_bool(tau) {
      return Err(TermError::TypeMismatch);
    }
    if index != 0 {
      return Err(TermError::BadConstantIndex(index));
    }
    Ok(TRUE_TERM)
  }

  /// Looks up a constant without constructing it.
  pub fn find_constant_term(&self, tau: Type, index: i32) -> Option<Term> {
    if self.types.is_bool(tau) && index == 0 {
      Some(TRUE_TERM)
    } else {
      None
    }
  }

  /// A fresh uninterpreted constant of type `tau`. Never hash-consed: every call returns
  /// a new term.
  pub fn new_uninterpreted(&mut self, tau: Type) -> Term {
    let serial = self.uninterpreted_serial;
    self.uninterpreted_serial += 1;
    let i = self.alloc(TermKind::Uninterpreted, tau, TermDesc::Integer(serial));
    Term::positive(i)
  }

  /// Boolean negation: flips the polarity bit. Only valid for Boolean terms.
  pub fn not(&self, t: Term) -> Result<Term, TermError> {
    if !self.good_term(t) {
      return Err(TermError::StaleTerm);
    }
    if !self.is_boolean(t) {
      return Err(TermError::TypeMismatch);
    }
    Ok(t.opposite())
  }

  /// `(ite cond left right)` where `left` and `right` have type `tau`.
  pub fn ite(&mut self, tau: Type, cond: Term, left: Term, right: Term) -> Result<Term, TermError> {
    self.check_good(&[cond, left, right])?;
    if !self.is_boolean(cond) || self.type_of(left) != tau || self.type_of(right) != tau {
      return Err(TermError::TypeMismatch);
    }
    Ok(self.hash_cons(TermKind::Ite, tau, TermDesc::composite(vec![cond, left, right])))
  }

  /// Equality. Boolean arguments build an `Eq` term; bit-vector arguments build the
  /// `BvEqAtom` the theory layer expects.
  pub fn eq(&mut self, left: Term, right: Term) -> Result<Term, TermError> {
    self.check_good(&[left, right])?;
    if self.type_of(left) != self.type_of(right) {
      return Err(TermError::TypeMismatch);
    }
    let kind = if self.is_boolean(left) {
      TermKind::Eq
    } else {
      TermKind::BvEqAtom
    };
    Ok(self.hash_cons(kind, Type::BOOL, TermDesc::composite(vec![left, right])))
  }

  /// `(distinct t1 ... tn)` over terms of one type.
  pub fn distinct(&mut self, args: &[Term]) -> Result<Term, TermError> {
    if args.len() < 2 || args.len() > MAX_ARITY {
      return Err(TermError::TooManyArgs(args.len()));
    }
    self.check_good(args)?;
    let tau = self.type_of(args[0]);
    if args.iter().any(|&t| self.type_of(t) != tau) {
      return Err(TermError::TypeMismatch);
    }
    Ok(self.hash_cons(TermKind::Distinct, Type::BOOL, TermDesc::composite(args.to_vec())))
  }

  /// n-ary disjunction.
  pub fn or(&mut self, args: &[Term]) -> Result<Term, TermError> {
    self.check_bool_composite(args)?;
    Ok(self.hash_cons(TermKind::Or, Type::BOOL, TermDesc::composite(args.to_vec())))
  }

  /// n-ary exclusive or.
  pub fn xor(&mut self, args: &[Term]) -> Result<Term, TermError> {
    self.check_bool_composite(args)?;
    Ok(self.hash_cons(TermKind::Xor, Type::BOOL, TermDesc::composite(args.to_vec())))
  }

  /// `(bit i bv)`: the Boolean view of bit `i` of `bv`. Bit 0 is the low-order bit.
  pub fn bit(&mut self, index: u32, bv: Term) -> Result<Term, TermError> {
    self.check_good(&[bv])?;
    if !self.is_bitvector(bv) || index >= self.bitsize(bv) {
      return Err(TermError::TypeMismatch);
    }
    Ok(self.hash_cons(TermKind::Bit, Type::BOOL, TermDesc::Select { index, arg: bv }))
  }

  /// A bit-vector constant of width `n <= 64`. The stored value is normalized.
  pub fn bv64_constant(&mut self, n: u32, value: u64) -> Result<Term, TermError> {
    if n == 0 || n > 64 {
      return Err(TermError::BitsizeTooLarge(n));
    }
    let tau = self.types.bitvector_type(n)?;
    let c = BvConst64::new(n, value);
    Ok(self.hash_cons(TermKind::BvConst64, tau, TermDesc::BvConst64(c)))
  }

  /// A bit-vector constant of any width. Widths of at most 64 bits use the compact form.
  pub fn bv_constant(&mut self, c: BvConst) -> Result<Term, TermError> {
    if let Some(c64) = c.as_const64() {
      return self.bv64_constant(c64.bitsize, c64.value);
    }
    let tau = self.types.bitvector_type(c.bitsize)?;
    Ok(self.hash_cons(TermKind::BvConst, tau, TermDesc::BvConst(Box::new(c))))
  }

  /// Builds a polynomial term from a normalizing buffer. The buffer is reset as a side
  /// effect. Degenerate polynomials collapse: an empty buffer becomes the zero constant,
  /// a lone constant monomial becomes a constant, and a lone `1 * t` becomes `t`.
  pub fn bv64_poly(&mut self, buffer: &mut BvArithBuffer64) -> Result<Term, TermError> {
    let p = buffer.take_poly();
    let n = p.bitsize;
    match p.monos.as_slice() {
      [] => self.bv64_constant(n, 0),
      [mono] if mono.var == CONST_IDX => self.bv64_constant(n, mono.coeff),
      [mono] if mono.coeff == 1 => Ok(Term::positive(mono.var)),
      _ => {
        let tau = self.types.bitvector_type(n)?;
        Ok(self.hash_cons(TermKind::BvPoly64, tau, TermDesc::Poly64(Box::new(p))))
      }
    }
  }

  /// Wide-coefficient variant of [`TermTable::bv64_poly`].
  pub fn bv_poly(&mut self, buffer: &mut BvArithBuffer) -> Result<Term, TermError> {
    use satyr_abs::numeric::One;

    let p = buffer.take_poly();
    let n = p.bitsize;
    match p.monos.as_slice() {
      [] => self.bv_constant(BvConst::zero(n)),
      [mono] if mono.var == CONST_IDX => {
        let c = BvConst::new(n, mono.coeff.clone());
        self.bv_constant(c)
      }
      [mono] if mono.coeff.is_one() => Ok(Term::positive(mono.var)),
      _ => {
        let tau = self.types.bitvector_type(n)?;
        Ok(self.hash_cons(TermKind::BvPoly, tau, TermDesc::Poly(Box::new(p))))
      }
    }
  }

  /// A power-product term `t1^d1 * ... * tn^dn`. All bases must be bit-vector terms of
  /// one type, which is also the result type.
  pub fn pprod_term(&mut self, p: PowerProduct) -> Result<Term, TermError> {
    let bases: Vec<Term> = p.factors().iter().map(|&(t, _)| t).collect();
    self.check_good(&bases)?;
    let tau = self.type_of(bases[0]);
    if !self.types.is_bitvector(tau) || bases.iter().any(|&t| self.type_of(t) != tau) {
      return Err(TermError::TypeMismatch);
    }
    let i = self.pprods.get_or_insert(p);
    Ok(self.hash_cons(TermKind::PowerProduct, tau, TermDesc::PowerProduct(i)))
  }

  /// A bit-vector assembled from Boolean terms; `args[0]` is the low-order bit.
  pub fn bvarray(&mut self, args: &[Term]) -> Result<Term, TermError> {
    if args.is_empty() || args.len() > crate::core::term::types::MAX_BV_SIZE as usize {
      return Err(TermError::BitsizeTooLarge(args.len() as u32));
    }
    self.check_good(args)?;
    if args.iter().any(|&t| !self.is_boolean(t)) {
      return Err(TermError::TypeMismatch);
    }
    let tau = self.types.bitvector_type(args.len() as u32)?;
    Ok(self.hash_cons(TermKind::BvArray, tau, TermDesc::composite(args.to_vec())))
  }

  fn bv_binop(&mut self, kind: TermKind, a: Term, b: Term) -> Result<Term, TermError> {
    self.check_good(&[a, b])?;
    let tau = self.type_of(a);
    if !self.types.is_bitvector(tau) || self.type_of(b) != tau {
      return Err(TermError::TypeMismatch);
    }
    Ok(self.hash_cons(kind, tau, TermDesc::composite(vec![a, b])))
  }

  pub fn bvdiv(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_binop(TermKind::BvDiv, a, b)
  }

  pub fn bvrem(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_binop(TermKind::BvRem, a, b)
  }

  pub fn bvsdiv(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_binop(TermKind::BvSdiv, a, b)
  }

  pub fn bvsrem(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_binop(TermKind::BvSrem, a, b)
  }

  pub fn bvsmod(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_binop(TermKind::BvSmod, a, b)
  }

  pub fn bvshl(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_binop(TermKind::BvShl, a, b)
  }

  pub fn bvlshr(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_binop(TermKind::BvLshr, a, b)
  }

  pub fn bvashr(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_binop(TermKind::BvAshr, a, b)
  }

  fn bv_atom(&mut self, kind: TermKind, a: Term, b: Term) -> Result<Term, TermError> {
    self.check_good(&[a, b])?;
    let tau = self.type_of(a);
    if !self.types.is_bitvector(tau) || self.type_of(b) != tau {
      return Err(TermError::TypeMismatch);
    }
    Ok(self.hash_cons(kind, Type::BOOL, TermDesc::composite(vec![a, b])))
  }

  pub fn bveq_atom(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_atom(TermKind::BvEqAtom, a, b)
  }

  /// Unsigned `a >= b`.
  pub fn bvge_atom(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_atom(TermKind::BvGeAtom, a, b)
  }

  /// Signed `a >= b`.
  pub fn bvsge_atom(&mut self, a: Term, b: Term) -> Result<Term, TermError> {
    self.bv_atom(TermKind::BvSgeAtom, a, b)
  }

  fn check_good(&self, args: &[Term]) -> Result<(), TermError> {
    for &t in args {
      if !self.good_term(t) {
        return Err(TermError::StaleTerm);
      }
    }
    Ok(())
  }

  fn check_bool_composite(&self, args: &[Term]) -> Result<(), TermError> {
    if args.is_empty() || args.len() > MAX_ARITY {
      return Err(TermError::TooManyArgs(args.len()));
    }
    self.check_good(args)?;
    if args.iter().any(|&t| !self.is_boolean(t)) {
      return Err(TermError::TypeMismatch);
    }
    Ok(())
  }

  // endregion

  // region Names

  /// Binds `name` to `t`, hiding a previous binding of the same name. The first name a
  /// term receives becomes its base (display) name.
  pub fn set_term_name(&mut self, t: Term, name: IString) {
    debug_assert!(self.good_term(t));
    self.symbols.set_name(name, t);
  }

  pub fn get_term_by_name(&self, name: &str) -> Option<Term> {
    self.symbols.find(name)
  }

  /// Pops the visible binding of `name`, revealing the previous one.
  pub fn remove_term_name(&mut self, name: &str) {
    self.symbols.remove_name(name);
  }

  /// The base name of `t`, if it has one.
  pub fn term_name(&self, t: Term) -> Option<&IString> {
    self.symbols.base_name(t)
  }

  /// Removes `t`'s base name and the symbol-table entry under that name.
  pub fn clear_term_name(&mut self, t: Term) {
    self.symbols.clear_name(t);
  }

  // endregion

  // region Garbage collection

  /// Marks index `i` as a root for the next collection.
  pub fn set_gc_mark(&mut self, i: u32) {
    debug_assert!(self.good_idx(i));
    self.mark.insert(i as usize);
  }

  pub fn clr_gc_mark(&mut self, i: u32) {
    self.mark.remove(i as usize);
  }

  pub fn is_marked(&self, i: u32) -> bool {
    self.mark.contains(i as usize)
  }

  /// Mark-and-sweep collection.
  ///
  /// Everything reachable from a marked root survives; so do the predefined indices and,
  /// when `keep_named` is set, everything reachable from the symbol table. When
  /// `keep_named` is not set, symbol-table entries for dead terms are purged. The type
  /// and power-product tables are swept with the sets reached here, and all marks are
  /// cleared at the end.
  pub fn gc(&mut self, keep_named: bool) {
    let mut reached_types = NatSet::new();
    let mut reached_pprods = NatSet::new();

    // Roots: predefined terms, user marks, and (optionally) named terms.
    self.mark.insert(RESERVED_IDX as usize);
    self.mark.insert(BOOL_CONST_IDX as usize);
    let mut worklist: Vec<u32> = self.mark.iter().map(|i| i as u32).collect();
    if keep_named {
      worklist.extend(self.symbols.iter_bound().map(|t| t.index()));
    }

    // Propagate marks to subterms, types, and power products. An index may be pushed
    // more than once before it is marked; re-processing is idempotent.
    while let Some(i) = worklist.pop() {
      if !self.live_idx(i) {
        continue;
      }
      self.mark.insert(i as usize);
      reached_types.insert(self.ty[i as usize].index());
      match &self.desc[i as usize] {
        TermDesc::Integer(_) | TermDesc::BvConst64(_) | TermDesc::BvConst(_) => {}
        TermDesc::Composite(args) => {
          for &arg in args.iter() {
            if !self.mark.contains(arg.index() as usize) {
              worklist.push(arg.index());
            }
          }
        }
        TermDesc::Select { arg, .. } => {
          if !self.mark.contains(arg.index() as usize) {
            worklist.push(arg.index());
          }
        }
        TermDesc::Poly64(p) => {
          for mono in &p.monos {
            if mono.var != CONST_IDX && !self.mark.contains(mono.var as usize) {
              worklist.push(mono.var);
            }
          }
        }
        TermDesc::Poly(p) => {
          for mono in &p.monos {
            if mono.var != CONST_IDX && !self.mark.contains(mono.var as usize) {
              worklist.push(mono.var);
            }
          }
        }
        TermDesc::PowerProduct(r) => {
          reached_pprods.insert(*r as usize);
          for &(base, _) in self.pprods.prod(*r).factors() {
            if !self.mark.contains(base.index() as usize) {
              worklist.push(base.index());
            }
          }
        }
      }
    }

    // Sweep unmarked terms to the free list.
    let mut swept = 0u32;
    for i in 2..self.kind.len() {
      if self.kind[i] == TermKind::Unused || self.mark.contains(i) {
        continue;
      }
      if self.kind[i] != TermKind::Uninterpreted {
        // Uninterpreted terms are never consed, so only consed kinds have bucket entries.
        let h = structural_hash(self.kind[i], self.ty[i], &self.desc[i]);
        if let Some(bucket) = self.htbl.get_mut(&h) {
          bucket.retain(|j| *j != i as u32);
          if bucket.is_empty() {
            self.htbl.remove(&h);
          }
        }
      }
      self.kind[i] = TermKind::Unused;
      self.desc[i] = TermDesc::Integer(self.free_idx);
      self.free_idx = i as i32;
      self.live_terms -= 1;
      swept += 1;
    }

    if !keep_named {
      let kind = &self.kind;
      self.symbols.purge_dead(|t| {
        let i = t.index() as usize;
        i < kind.len() && kind[i] != TermKind::Unused
      });
    }

    self.types.gc(&reached_types);
    self.pprods.gc(&reached_pprods);
    self.mark.clear();

    satyr_abs::debug!(
      swept,
      live = self.live_terms,
      "term table collection finished"
    );
  }

  // endregion
}

impl Default for TermTable {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use satyr_abs::numeric::BigUint;

  use super::*;
  use crate::core::term::occurrence::FALSE_TERM;

  fn bv8(table: &mut TermTable) -> Type {
    table.types_mut().bitvector_type(8).unwrap()
  }

  #[test]
  fn hash_consing_returns_identical_indices() {
    let mut table = TermTable::new();
    let tau = bv8(&mut table);
    let x = table.new_uninterpreted(tau);
    let y = table.new_uninterpreted(tau);

    let e1 = table.bveq_atom(x, y).unwrap();
    let e2 = table.bveq_atom(x, y).unwrap();
    assert_eq!(e1, e2);

    // Argument order matters: constructors do not normalize.
    let e3 = table.bveq_atom(y, x).unwrap();
    assert_ne!(e1, e3);

    let c1 = table.bv64_constant(8, 0x0f).unwrap();
    let c2 = table.bv64_constant(8, 0x0f).unwrap();
    assert_eq!(c1, c2);
    let c3 = table.bv64_constant(8, 0x10f).unwrap(); // normalizes to 0x0f
    assert_eq!(c1, c3);
  }

  #[test]
  fn uninterpreted_terms_are_always_fresh() {
    let mut table = TermTable::new();
    let tau = bv8(&mut table);
    let x = table.new_uninterpreted(tau);
    let y = table.new_uninterpreted(tau);
    assert_ne!(x, y);
  }

  #[test]
  fn negation_is_polarity_flip() {
    let mut table = TermTable::new();
    let p = table.new_uninterpreted(Type::BOOL);
    let not_p = table.not(p).unwrap();
    assert_eq!(not_p, p.opposite());
    assert_eq!(table.not(not_p).unwrap(), p);

    // Negation of a bit-vector term is a type error.
    let tau = bv8(&mut table);
    let x = table.new_uninterpreted(tau);
    assert_eq!(table.not(x), Err(TermError::TypeMismatch));
  }

  #[test]
  fn constant_term_contract() {
    let mut table = TermTable::new();
    assert_eq!(table.constant_term(Type::BOOL, 0), Ok(TRUE_TERM));
    assert_eq!(table.constant_term(Type::BOOL, 0).map(|t| t.opposite()), Ok(FALSE_TERM));
    assert!(matches!(
      table.constant_term(Type::BOOL, 3),
      Err(TermError::BadConstantIndex(3))
    ));
    let tau = bv8(&mut table);
    assert_eq!(table.constant_term(tau, 0), Err(TermError::TypeMismatch));
    assert_eq!(table.find_constant_term(Type::BOOL, 0), Some(TRUE_TERM));
  }

  #[test]
  fn wide_constants_use_compact_form_when_possible() {
    let mut table = TermTable::new();
    let via_wide = table.bv_constant(BvConst::from_u64(16, 0xabcd)).unwrap();
    let via_compact = table.bv64_constant(16, 0xabcd).unwrap();
    assert_eq!(via_wide, via_compact);
    assert_eq!(table.kind(via_wide), TermKind::BvConst64);

    let wide = table
      .bv_constant(BvConst::new(100, BigUint::from(1u32) << 99u32))
      .unwrap();
    assert_eq!(table.kind(wide), TermKind::BvConst);
    assert_eq!(table.bitsize(wide), 100);
  }

  #[test]
  fn poly_buffer_collapse_rules() {
    let mut table = TermTable::new();
    let tau = bv8(&mut table);
    let x = table.new_uninterpreted(tau);

    // x + 1 - x collapses to the constant 1.
    let mut buffer = BvArithBuffer64::new(8);
    buffer.add_mono(1, x.index());
    buffer.add_const(1);
    buffer.sub_mono(1, x.index());
    let t = table.bv64_poly(&mut buffer).unwrap();
    assert_eq!(t, table.bv64_constant(8, 1).unwrap());

    // 1 * x collapses to x itself.
    buffer.reset(8);
    buffer.add_mono(1, x.index());
    assert_eq!(table.bv64_poly(&mut buffer).unwrap(), x);

    // x + 1 is a real polynomial, and equal buffers cons to one term.
    buffer.reset(8);
    buffer.add_mono(1, x.index());
    buffer.add_const(1);
    let p1 = table.bv64_poly(&mut buffer).unwrap();
    buffer.add_const(1);
    buffer.add_mono(1, x.index());
    let p2 = table.bv64_poly(&mut buffer).unwrap();
    assert_eq!(p1, p2);
    assert_eq!(table.kind(p1), TermKind::BvPoly64);
  }

  #[test]
  fn name_binding_hides_and_reveals() {
    let mut table = TermTable::new();
    let tau = bv8(&mut table);
    let x = table.new_uninterpreted(tau);
    let y = table.new_uninterpreted(tau);

    table.set_term_name(x, IString::from("v"));
    table.set_term_name(y, IString::from("v"));
    assert_eq!(table.get_term_by_name("v"), Some(y));
    table.remove_term_name("v");
    assert_eq!(table.get_term_by_name("v"), Some(x));
    assert_eq!(table.term_name(x).map(|s| &s[..]), Some("v"));
  }

  #[test]
  fn gc_preserves_reachable_and_recycles_dead() {
    let mut table = TermTable::new();
    let tau = bv8(&mut table);
    let x = table.new_uninterpreted(tau);
    let y = table.new_uninterpreted(tau);
    let kept = table.bveq_atom(x, y).unwrap();
    let dead = table.bvge_atom(x, y).unwrap();

    table.set_gc_mark(kept.index());
    table.gc(false);

    // The marked atom and its subterms survive with their indices.
    assert!(table.good_term(kept));
    assert!(table.good_term(x));
    assert!(table.good_term(y));
    assert_eq!(table.kind(kept), TermKind::BvEqAtom);

    // The unmarked atom is gone and its index recycled.
    assert!(!table.live_idx(dead.index()));
    let recycled = table.bvsge_atom(x, y).unwrap();
    assert_eq!(recycled.index(), dead.index());

    // Re-consing the surviving atom still finds the old index.
    assert_eq!(table.bveq_atom(x, y).unwrap(), kept);
  }

  #[test]
  fn gc_keep_named_roots_the_symbol_table() {
    let mut table = TermTable::new();
    let tau = bv8(&mut table);
    let x = table.new_uninterpreted(tau);
    table.set_term_name(x, IString::from("x"));

    table.gc(true);
    assert!(table.good_term(x));
    assert_eq!(table.get_term_by_name("x"), Some(x));

    // Without keep_named, the binding is purged together with the term.
    table.gc(false);
    assert!(!table.live_idx(x.index()));
    assert_eq!(table.get_term_by_name("x"), None);
  }

  #[test]
  fn gc_sweeps_types_and_pprods() {
    let mut table = TermTable::new();
    let tau = bv8(&mut table);
    let wide = table.types_mut().bitvector_type(123).unwrap();
    let x = table.new_uninterpreted(tau);
    let y = table.new_uninterpreted(tau);
    let p = PowerProduct::new(vec![(x, 1), (y, 1)]).unwrap();
    let xy = table.pprod_term(p).unwrap();

    table.set_gc_mark(xy.index());
    table.gc(false);

    assert!(table.good_term(xy));
    assert!(table.good_term(x));
    // The 123-bit type had no surviving term and was swept.
    assert_eq!(table.types().live_types(), 2); // Bool and BitVec(8)
    let _ = wide;
    assert_eq!(table.pprods().live_prods(), 1);
  }
}
