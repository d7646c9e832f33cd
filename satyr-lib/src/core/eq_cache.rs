/*!

The equality cache: a two-key map `(t1, t2) -> literal` remembering which core literal
was chosen for an equality, so that repeated internalizations of `t1 = t2` (for example
from ITE-equality flattening) reuse one literal.

Keys are unordered: `(t1, t2)` and `(t2, t1)` hit the same entry. Push/pop frames save
and restore the set of keys, mirroring the context's assertion frames.

*/

use satyr_abs::HashMap;

use crate::core::{sat::Lit, term::Term};

#[derive(Default)]
pub struct EqCache {
  map: HashMap<(Term, Term), Lit>,
  /// Keys inserted since the oldest frame, in order.
  trail: Vec<(Term, Term)>,
  frames: Vec<usize>,
}

#[inline(always)]
fn key(t1: Term, t2: Term) -> (Term, Term) {
  if t1 <= t2 {
    (t1, t2)
  } else {
    (t2, t1)
  }
}

impl EqCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn find(&self, t1: Term, t2: Term) -> Option<Lit> {
    self.map.get(&key(t1, t2)).copied()
  }

  /// Adds `(t1, t2) -> l`. The pair must not be cached yet.
  pub fn insert(&mut self, t1: Term, t2: Term, l: Lit) {
    let k = key(t1, t2);
    let previous = self.map.insert(k, l);
    debug_assert!(previous.is_none());
    self.trail.push(k);
  }

  pub fn push(&mut self) {
    self.frames.push(self.trail.len());
  }

  pub fn pop(&mut self) {
    let mark = self.frames.pop().expect("eq-cache pop without push");
    while self.trail.len() > mark {
      let k = self.trail.pop().unwrap();
      self.map.remove(&k);
    }
  }

  pub fn reset(&mut self) {
    self.map.clear();
    self.trail.clear();
    self.frames.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keys_are_unordered() {
    let mut cache = EqCache::new();
    let a = Term::positive(4);
    let b = Term::positive(9);
    cache.insert(a, b, Lit::pos(2));
    assert_eq!(cache.find(b, a), Some(Lit::pos(2)));
  }

  #[test]
  fn frames_restore_contents() {
    let mut cache = EqCache::new();
    let a = Term::positive(4);
    let b = Term::positive(9);
    let c = Term::positive(11);

    cache.insert(a, b, Lit::pos(2));
    cache.push();
    cache.insert(a, c, Lit::pos(3));
    assert!(cache.find(a, c).is_some());

    cache.pop();
    assert_eq!(cache.find(a, c), None);
    assert_eq!(cache.find(a, b), Some(Lit::pos(2)));
  }
}
