/*!

The term table: a hash-consed DAG of Boolean and bit-vector terms.

Every term is a row in a global table identified by a 31-bit index. A *term occurrence*
packs an index together with a polarity bit; Boolean terms have a positive and a negative
occurrence, everything else only a positive one. Structural hash consing guarantees that
two constructor calls with equal arguments return the same index, so equality of
occurrences is equality of 32-bit words.

Terms are never freed eagerly. A mark-and-sweep collector, triggered explicitly by the
owner of the table, reclaims every term not reachable from a marked root (and, when
`keep_named` is set, from the symbol table). The type and power-product subtables run
their own sweeps using the sets of types and products reached during the term sweep.

*/

mod descriptor;
mod kind;
mod occurrence;
mod pprod;
mod symbol_table;
mod table;
mod types;

pub use descriptor::TermDesc;
pub use kind::TermKind;
pub use occurrence::{Term, BOOL_CONST_IDX, FALSE_TERM, RESERVED_IDX, TRUE_TERM};
pub use pprod::{PProdTable, PowerProduct, MAX_DEGREE};
pub use symbol_table::SymbolTable;
pub use table::{TermError, TermTable, MAX_ARITY};
pub use types::{Type, TypeDesc, TypeTable, MAX_BV_SIZE};
