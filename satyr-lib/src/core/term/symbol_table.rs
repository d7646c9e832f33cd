/*!

The symbol table: a mapping from names to term occurrences with *hidden bindings*.

Assigning a name that is already bound pushes the new binding and hides the old one;
removing the name pops the most recent binding and reveals the previous. Separately, a
base-name registry maps each occurrence to at most one display name (the first name it
received), used for printing.

Names are [`IString`]s: interned, reference-counted strings, so the same name held by
several tables shares one allocation.

*/

use satyr_abs::{HashMap, IString, SmallVec};

use super::occurrence::Term;

#[derive(Default)]
pub struct SymbolTable {
  /// For each name, the stack of bindings; the last entry is the visible one.
  bindings: HashMap<IString, SmallVec<[Term; 1]>>,
  /// Base names for printing: at most one per occurrence.
  base_names: HashMap<Term, IString>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Binds `name` to `t`, hiding (not destroying) any previous binding. If `t` has no
  /// base name yet, `name` becomes its base name.
  pub fn set_name(&mut self, name: IString, t: Term) {
    self.bindings.entry(name.clone()).or_default().push(t);
    self.base_names.entry(t).or_insert(name);
  }

  /// The visible binding of `name`, if any.
  pub fn find(&self, name: &str) -> Option<Term> {
    let key = IString::from(name);
    self.bindings.get(&key).and_then(|stack| stack.last().copied())
  }

  /// Pops the visible binding of `name`, revealing the previous one. Does nothing if the
  /// name is unbound. The base-name registry is not affected.
  pub fn remove_name(&mut self, name: &str) {
    let key = IString::from(name);
    if let Some(stack) = self.bindings.get_mut(&key) {
      stack.pop();
      if stack.is_empty() {
        self.bindings.remove(&key);
      }
    }
  }

  /// The display name of `t`, if it ever received one.
  pub fn base_name(&self, t: Term) -> Option<&IString> {
    self.base_names.get(&t)
  }

  /// Removes `t`'s base name and its symbol-table binding under that name, if any.
  pub fn clear_name(&mut self, t: Term) {
    if let Some(name) = self.base_names.remove(&t) {
      if let Some(stack) = self.bindings.get_mut(&name) {
        stack.retain(|occ| *occ != t);
        if stack.is_empty() {
          self.bindings.remove(&name);
        }
      }
    }
  }

  /// Every occurrence reachable by name, visible or hidden. Used as GC roots when
  /// `keep_named` is set.
  pub fn iter_bound(&self) -> impl Iterator<Item = Term> + '_ {
    self.bindings.values().flat_map(|stack| stack.iter().copied())
  }

  /// Purges every binding whose term index fails the `live` predicate. Used by the GC
  /// when `keep_named` is not set.
  pub(crate) fn purge_dead(&mut self, live: impl Fn(Term) -> bool) {
    self.bindings.retain(|_, stack| {
      stack.retain(|t| live(*t));
      !stack.is_empty()
    });
    self.base_names.retain(|&t, _| live(t));
  }

  pub fn num_bindings(&self) -> usize {
    self.bindings.values().map(|stack| stack.len()).sum()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rebinding_hides_and_removal_reveals() {
    let mut table = SymbolTable::new();
    let t1 = Term::positive(10);
    let t2 = Term::positive(11);

    table.set_name(IString::from("x"), t1);
    assert_eq!(table.find("x"), Some(t1));

    table.set_name(IString::from("x"), t2);
    assert_eq!(table.find("x"), Some(t2));

    table.remove_name("x");
    assert_eq!(table.find("x"), Some(t1));

    table.remove_name("x");
    assert_eq!(table.find("x"), None);

    // Removing an unbound name is a no-op.
    table.remove_name("x");
    assert_eq!(table.find("x"), None);
  }

  #[test]
  fn base_name_is_first_name() {
    let mut table = SymbolTable::new();
    let t = Term::positive(10);

    table.set_name(IString::from("a"), t);
    table.set_name(IString::from("b"), t);
    assert_eq!(table.base_name(t).map(|s| &s[..]), Some("a"));

    // Removing the symbol binding leaves the base name in place.
    table.remove_name("a");
    assert_eq!(table.base_name(t).map(|s| &s[..]), Some("a"));

    table.clear_name(t);
    assert_eq!(table.base_name(t), None);
  }

  #[test]
  fn distinct_occurrences_can_carry_distinct_names() {
    let mut table = SymbolTable::new();
    let t = Term::positive(10);

    table.set_name(IString::from("p"), t);
    table.set_name(IString::from("not_p"), t.opposite());
    assert_eq!(table.find("p"), Some(t));
    assert_eq!(table.find("not_p"), Some(t.opposite()));
    assert_eq!(table.base_name(t.opposite()).map(|s| &s[..]), Some("not_p"));
  }

  #[test]
  fn purge_drops_only_dead_bindings() {
    let mut table = SymbolTable::new();
    let t1 = Term::positive(10);
    let t2 = Term::positive(11);
    table.set_name(IString::from("x"), t1);
    table.set_name(IString::from("x"), t2);

    table.purge_dead(|t| t == t1);
    assert_eq!(table.find("x"), Some(t1));
    assert_eq!(table.num_bindings(), 1);
  }
}
