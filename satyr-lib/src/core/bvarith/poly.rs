/*!

Bit-vector polynomials: ordered sequences of monomials `(coefficient, term)`.

A monomial's variable is a raw term *index* (not an occurrence; bit-vector terms only
have positive occurrences). The distinguished index [`CONST_IDX`] (= 0, the reserved term
index) marks the constant monomial, which always sits first; the remaining monomials are
in strictly increasing index order. Coefficients are nonzero and reduced modulo `2^n`.

Polynomials are built from the normalizing buffers in [`super::buffer`]; the struct
fields here are only read.

*/

use satyr_abs::numeric::BigUint;

/// The variable index of the constant monomial. Coincides with the reserved term index.
pub const CONST_IDX: u32 = 0;

/// A monomial with a coefficient of at most 64 bits.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Mono64 {
  pub coeff: u64,
  pub var: u32,
}

/// A polynomial over a bit-vector type of width at most 64.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BvPoly64 {
  pub bitsize: u32,
  pub monos: Vec<Mono64>,
}

impl BvPoly64 {
  /// Whether the monomial list satisfies the ordering/normalization invariants.
  pub fn is_normalized(&self) -> bool {
    let mut previous: Option<u32> = None;
    for mono in &self.monos {
      if mono.coeff == 0 || mono.coeff != super::norm64(self.bitsize, mono.coeff) {
        return false;
      }
      if let Some(p) = previous {
        if mono.var <= p {
          return false;
        }
      }
      previous = Some(mono.var);
    }
    true
  }

  /// The constant monomial's coefficient, if present.
  pub fn constant(&self) -> Option<u64> {
    self.monos.first().filter(|m| m.var == CONST_IDX).map(|m| m.coeff)
  }
}

/// A monomial with an arbitrary-width coefficient.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Mono {
  pub coeff: BigUint,
  pub var: u32,
}

/// A polynomial over a bit-vector type of any width.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BvPoly {
  pub bitsize: u32,
  pub monos: Vec<Mono>,
}

impl BvPoly {
  pub fn constant(&self) -> Option<&BigUint> {
    self.monos.first().filter(|m| m.var == CONST_IDX).map(|m| &m.coeff)
  }
}
