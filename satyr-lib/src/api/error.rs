/*!

The error taxonomy for assertion processing and internalization.

Errors travel as ordinary `Result` values. Each variant carries a small negative integer
code, which is the wire format front ends report; `Error::code()` and
`Error::try_from(i32)` convert between the two. The codes are contract constants and must
not be renumbered.

*/

use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum Error {
  /// A bug: an internal invariant was violated.
  #[error("internal error")]
  Internal = -1,

  /// A bug or misuse: ill-typed term where a different type was required.
  #[error("type error")]
  Type = -2,

  #[error("formula contains a free variable")]
  FreeVariableInFormula = -3,

  #[error("logic not supported")]
  LogicNotSupported = -4,

  #[error("uninterpreted functions not supported by this architecture")]
  UfNotSupported = -5,

  #[error("bit-vectors not supported by this architecture")]
  BvNotSupported = -7,

  #[error("function applications not supported")]
  FunNotSupported = -8,

  #[error("quantifiers not supported")]
  QuantifiersNotSupported = -9,

  #[error("lambdas not supported")]
  LambdasNotSupported = -10,

  #[error("exception raised by the bit-vector solver")]
  BvSolverException = -17,
}

impl Error {
  /// The negative integer code reported to front ends.
  #[inline(always)]
  pub fn code(self) -> i32 {
    self.into()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_round_trip() {
    for error in [
      Error::Internal,
      Error::Type,
      Error::FreeVariableInFormula,
      Error::LogicNotSupported,
      Error::UfNotSupported,
      Error::BvNotSupported,
      Error::FunNotSupported,
      Error::QuantifiersNotSupported,
      Error::LambdasNotSupported,
      Error::BvSolverException,
    ] {
      assert!(error.code() < 0);
      assert_eq!(Error::try_from(error.code()).unwrap(), error);
    }
  }

  #[test]
  fn contract_codes_are_stable() {
    assert_eq!(Error::Internal.code(), -1);
    assert_eq!(Error::Type.code(), -2);
    assert_eq!(Error::BvSolverException.code(), -17);
  }
}
