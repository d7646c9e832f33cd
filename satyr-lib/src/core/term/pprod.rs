/*!

Power products: ordered multisets `t1^d1 * ... * tn^dn` of term occurrences with positive
exponents. Products are hash-consed in their own table, separately from terms, and swept
by their own collector using the set of product indices reached during the term sweep.

The empty product and single-variable products with exponent 1 are not representable
here: callers use the variable term directly (and the constant marker inside polynomials
plays the role of the empty product).

*/

use std::hash::{Hash, Hasher};

use satyr_abs::{HashMap, NatSet, SmallVec};

use super::{occurrence::Term, table::TermError};

/// Upper bound on the total degree of a power product.
pub const MAX_DEGREE: u64 = u32::MAX as u64;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PowerProduct {
  /// Factors ordered by term index; exponents are positive.
  factors: Vec<(Term, u32)>,
}

impl PowerProduct {
  /// Normalizes `factors`: sorts by term index and merges duplicate bases. Fails on an
  /// empty or trivial (single factor, exponent 1) product, a zero exponent, or a total
  /// degree above [`MAX_DEGREE`].
  pub fn new(mut factors: Vec<(Term, u32)>) -> Result<PowerProduct, TermError> {
    factors.sort_by_key(|&(t, _)| t.index());

    let mut merged: Vec<(Term, u32)> = Vec::with_capacity(factors.len());
    for (t, d) in factors {
      if d == 0 {
        return Err(TermError::DegreeOverflow);
      }
      match merged.last_mut() {
        Some((last, exp)) if *last == t => {
          *exp = exp.checked_add(d).ok_or(TermError::DegreeOverflow)?;
        }
        _ => merged.push((t, d)),
      }
    }

    if merged.is_empty() || (merged.len() == 1 && merged[0].1 == 1) {
      return Err(TermError::TrivialPowerProduct);
    }

    let degree: u64 = merged.iter().map(|&(_, d)| d as u64).sum();
    if degree > MAX_DEGREE {
      return Err(TermError::DegreeOverflow);
    }

    Ok(PowerProduct { factors: merged })
  }

  #[inline(always)]
  pub fn factors(&self) -> &[(Term, u32)] {
    &self.factors
  }

  #[inline(always)]
  pub fn len(&self) -> usize {
    self.factors.len()
  }

  #[inline(always)]
  pub fn is_empty(&self) -> bool {
    self.factors.is_empty()
  }

  pub fn degree(&self) -> u64 {
    self.factors.iter().map(|&(_, d)| d as u64).sum()
  }

  fn structural_hash(&self) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    self.factors.hash(&mut hasher);
    hasher.finish()
  }
}

/// The hash-consing table for power products.
pub struct PProdTable {
  prods: Vec<Option<PowerProduct>>,
  cache: HashMap<u64, SmallVec<[u32; 1]>>,
  free_list: Vec<u32>,
}

impl PProdTable {
  pub fn new() -> Self {
    PProdTable {
      prods: Vec::new(),
      cache: HashMap::default(),
      free_list: Vec::new(),
    }
  }

  /// Returns the index of `p`, inserting it if no structurally equal product exists.
  pub fn get_or_insert(&mut self, p: PowerProduct) -> u32 {
    let h = p.structural_hash();
    if let Some(bucket) = self.cache.get(&h) {
      for &i in bucket {
        if self.prods[i as usize].as_ref() == Some(&p) {
          return i;
        }
      }
    }

    let i = match self.free_list.pop() {
      Some(i) => {
        self.prods[i as usize] = Some(p);
        i
      }
      None => {
        self.prods.push(Some(p));
        (self.prods.len() - 1) as u32
      }
    };
    self.cache.entry(h).or_default().push(i);
    i
  }

  #[inline(always)]
  pub fn prod(&self, i: u32) -> &PowerProduct {
    self.prods[i as usize].as_ref().expect("stale power-product index")
  }

  pub fn live_prods(&self) -> usize {
    self.prods.iter().filter(|p| p.is_some()).count()
  }

  /// Sweeps every product whose index is not in `reached`.
  pub(crate) fn gc(&mut self, reached: &NatSet) {
    for i in 0..self.prods.len() {
      if self.prods[i].is_some() && !reached.contains(i) {
        let h = self.prods[i].as_ref().unwrap().structural_hash();
        if let Some(bucket) = self.cache.get_mut(&h) {
          bucket.retain(|j| *j != i as u32);
          if bucket.is_empty() {
            self.cache.remove(&h);
          }
        }
        self.prods[i] = None;
        self.free_list.push(i as u32);
      }
    }
  }
}

impl Default for PProdTable {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalization_merges_and_sorts() {
    let x = Term::positive(5);
    let y = Term::positive(3);
    let p = PowerProduct::new(vec![(x, 2), (y, 1), (x, 1)]).unwrap();
    assert_eq!(p.factors(), &[(y, 1), (x, 3)]);
    assert_eq!(p.degree(), 4);
  }

  #[test]
  fn trivial_products_are_rejected() {
    let x = Term::positive(5);
    assert!(PowerProduct::new(vec![]).is_err());
    assert!(PowerProduct::new(vec![(x, 1)]).is_err());
    // x^2 is fine
    assert!(PowerProduct::new(vec![(x, 2)]).is_ok());
  }

  #[test]
  fn consing_and_gc() {
    let x = Term::positive(5);
    let y = Term::positive(3);
    let mut table = PProdTable::new();

    let p = table.get_or_insert(PowerProduct::new(vec![(x, 1), (y, 1)]).unwrap());
    let q = table.get_or_insert(PowerProduct::new(vec![(y, 1), (x, 1)]).unwrap());
    assert_eq!(p, q);

    let r = table.get_or_insert(PowerProduct::new(vec![(x, 2)]).unwrap());
    assert_ne!(p, r);

    let mut reached = NatSet::new();
    reached.insert(r as usize);
    table.gc(&reached);

    assert_eq!(table.live_prods(), 1);
    // The slot for `p` is recycled and re-consing yields a fresh entry.
    let p2 = table.get_or_insert(PowerProduct::new(vec![(x, 1), (y, 1)]).unwrap());
    assert_eq!(p2, p);
  }
}
