/*!

The context status. `Idle` is the resting state between assertions and checks;
`Searching` is only observable from another thread (or from an interrupt handler) while
`check` runs.

*/

use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum CheckStatus {
  #[default]
  Idle,
  Searching,
  Unknown,
  Sat,
  Unsat,
  Interrupted,
}

impl Display for CheckStatus {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      CheckStatus::Idle => "idle",
      CheckStatus::Searching => "searching",
      CheckStatus::Unknown => "unknown",
      CheckStatus::Sat => "sat",
      CheckStatus::Unsat => "unsat",
      CheckStatus::Interrupted => "interrupted",
    };
    write!(f, "{}", name)
  }
}
