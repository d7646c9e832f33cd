#![allow(dead_code)]
/*!

The satyr solver core: satisfiability modulo the quantifier-free theory of bit-vectors
(QF_BV), plus uninterpreted constants of Boolean and bit-vector type.

The crate is organized the way the engine runs:

1. `core::term`: a hash-consed DAG of Boolean and bit-vector terms with polarity-bit
   occurrences and mark-and-sweep garbage collection.
2. `core::context`: assertion flattening, variable-elimination substitutions, and
   translation of terms into Boolean literals and bit-vector theory variables.
3. `core::sat`: a CDCL SAT engine over a packed clause pool with watched literals.
4. `core::bvsolver`: the default bit-blasting implementation of the bit-vector solver
   interface consumed by the context.

Everything a front end (SMT-LIB 2 parser, CLI) needs is re-exported from [`api`].

*/

pub mod api;
pub mod core;

pub use crate::api::{
  CheckStatus,
  Error,
  Thvar,
};
pub use crate::core::{
  context::{AssertStatus, Context, ContextArch, ContextMode, ContextOption, InterruptHandle, Model, Value},
  sat::{Lit, SearchParams},
  term::{Term, TermTable, Type},
};
