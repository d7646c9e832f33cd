#![allow(unused)]
/*!

Types/type aliases that abstract over the implementing backing type.

A motivating example is the `IString` type, an interned string type. A number of external crates
could provide this functionality. This module redirects to whatever chosen implementation we want.
To use the [`string_cache` crate](https://crates.io/crates/string_cache), we just define `IString`
as an alias for `string_cache::DefaultAtom`:

```ignore
pub use string_cache::DefaultAtom as IString;
```

The `string_cache` atoms are reference counted, so identical names held in several tables share
one allocation, which is exactly the discipline the symbol tables need.

For types or infrastructure with very different backing implementations, we define an abstraction
layer over the implementation. For example, the `log` module could use any of a number of logging
frameworks for its implementation. Its (crate) public interface consists only of
`set_global_logging_threshold()`/`get_global_logging_threshold()` and the macros `critical!`,
`error!`, `warning!`, `info!`, `debug!`, and `trace!`. The backing implementation (currently
`tracing`) is encapsulated in the `log` module.

*/

mod nat_set;
mod string_util;

// Arbitrary precision arithmetic
pub mod numeric;

// region Hashing data structures
pub use std::collections::HashMap;
pub use std::collections::HashSet;

// For vectors that are expected to have few or zero elements.
pub use smallvec::{smallvec, SmallVec};
// endregion

// Logging
pub use tracing;
pub mod log;

// Interned string with a global, reference-counted cache.
pub use string_cache::DefaultAtom as IString;

// A set of (small) natural numbers
pub use nat_set::NatSet;

// Join sequences with a separator
pub use string_util::{join_iter, join_string};
