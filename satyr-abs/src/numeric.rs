/*!

Arbitrary precision arithmetic and number traits.

*/

// Arbitrary precision arithmetic
pub use num_bigint::{BigInt, BigUint, ParseBigIntError, Sign, ToBigInt, ToBigUint};

pub use num_traits as traits;
pub use num_traits::{One, Zero};
