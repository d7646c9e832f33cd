/*!

Engine internals: the term table, the bit-vector arithmetic buffers, the internalization
table, the context/simplifier, the CDCL SAT core, the Boolean gate manager, and the
bit-blasting bit-vector solver.

*/

pub mod bvarith;
pub mod bvsolver;
pub mod context;
pub mod gates;
pub mod intern;
pub mod sat;
pub mod term;

pub(crate) mod eq_cache;
