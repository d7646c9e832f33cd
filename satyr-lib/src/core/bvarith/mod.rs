/*!

Bit-vector constants and polynomials, plus the normalizing buffers used to build them.

Polynomials come in two flavors: a compact one for widths of at most 64 bits with `u64`
coefficients, and a generic one with arbitrary-precision coefficients. In both, monomials
are ordered by term index with the constant monomial (variable index [`CONST_IDX`])
first, and coefficients are kept normalized modulo `2^n`.

*/

mod buffer;
mod bvconst;
mod poly;

pub use buffer::{BvArithBuffer, BvArithBuffer64};
pub use bvconst::{mask64, norm64, BvConst, BvConst64};
pub use poly::{BvPoly, BvPoly64, Mono, Mono64, CONST_IDX};
