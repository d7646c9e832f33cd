/*!

Term descriptors. The `TermKind` tag plus this sum type form the tagged payload of a
table row: an integer, a composite argument array, a bit-select pair, a constant
payload, a polynomial, or a power-product reference. The free list is chained through
the `Integer` variant of `Unused` slots.

*/

use std::hash::{Hash, Hasher};

use crate::core::{
  bvarith::{BvConst, BvConst64, BvPoly, BvPoly64},
  term::{kind::TermKind, occurrence::Term, types::Type},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TermDesc {
  /// Constant index, uninterpreted serial number, or free-list link.
  Integer(i32),
  /// Argument array of a composite term.
  Composite(Box<[Term]>),
  /// Bit selection: bit `index` of the bit-vector term `arg`.
  Select { index: u32, arg: Term },
  /// Compact bit-vector constant.
  BvConst64(BvConst64),
  /// Wide bit-vector constant.
  BvConst(Box<BvConst>),
  /// Polynomial with 64-bit coefficients.
  Poly64(Box<BvPoly64>),
  /// Polynomial with arbitrary-width coefficients.
  Poly(Box<BvPoly>),
  /// Index into the power-product table.
  PowerProduct(u32),
}

impl TermDesc {
  pub fn composite(args: impl Into<Box<[Term]>>) -> TermDesc {
    TermDesc::Composite(args.into())
  }

  #[inline(always)]
  pub fn as_composite(&self) -> &[Term] {
    match self {
      TermDesc::Composite(args) => args,
      _ => panic!("descriptor is not a composite"),
    }
  }

  #[inline(always)]
  pub fn as_integer(&self) -> i32 {
    match self {
      TermDesc::Integer(i) => *i,
      _ => panic!("descriptor is not an integer"),
    }
  }
}

impl Hash for TermDesc {
  fn hash<H: Hasher>(&self, state: &mut H) {
    std::mem::discriminant(self).hash(state);
    match self {
      TermDesc::Integer(i) => i.hash(state),
      TermDesc::Composite(args) => args.hash(state),
      TermDesc::Select { index, arg } => {
        index.hash(state);
        arg.hash(state);
      }
      TermDesc::BvConst64(c) => c.hash(state),
      TermDesc::BvConst(c) => c.hash(state),
      TermDesc::Poly64(p) => p.hash(state),
      TermDesc::Poly(p) => p.hash(state),
      TermDesc::PowerProduct(i) => i.hash(state),
    }
  }
}

/// The structural hash used by the hash-consing table: kind, type, and descriptor.
pub(crate) fn structural_hash(kind: TermKind, tau: Type, desc: &TermDesc) -> u64 {
  let mut hasher = std::collections::hash_map::DefaultHasher::new();
  kind.hash(&mut hasher);
  tau.0.hash(&mut hasher);
  desc.hash(&mut hasher);
  hasher.finish()
}
