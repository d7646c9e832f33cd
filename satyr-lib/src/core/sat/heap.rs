/*!

The variable heap for activity-based branching (VSIDS).

`heap[0]` is a sentinel (the reserved variable 0 with infinite activity), so every real
element has a parent at `i / 2`. `heap_index[x]` is the heap position of `x`, or -1 when
`x` is not in the heap.

The variable range is split at `vmax`: variables below `vmax` have been in the heap at
some point; variables in `[vmax, nvars)` may never have been inserted and are picked up
by a linear sweep when the heap runs dry. `vmax` only moves forward.

*/

use super::literal::BVar;

/// Activities are rescaled when one passes this threshold.
const ACTIVITY_THRESHOLD: f64 = 1e20;
const INV_ACTIVITY_THRESHOLD: f64 = 1e-20;

pub struct VarHeap {
  activity: Vec<f64>,
  heap_index: Vec<i32>,
  heap: Vec<BVar>,
  act_increment: f64,
  inv_act_decay: f64,
  vmax: u32,
}

impl VarHeap {
  pub fn new() -> Self {
    VarHeap {
      activity: vec![f64::INFINITY], // sentinel: variable 0
      heap_index: vec![-1],
      heap: vec![0], // heap[0] is the sentinel slot
      act_increment: 1.0,
      inv_act_decay: 1.0 / 0.95,
      vmax: 1,
    }
  }

  /// Registers `n` fresh variables with zero activity.
  pub fn extend(&mut self, n: usize) {
    self.activity.resize(self.activity.len() + n, 0.0);
    self.heap_index.resize(self.heap_index.len() + n, -1);
  }

  #[inline(always)]
  pub fn nvars(&self) -> usize {
    self.activity.len()
  }

  #[inline(always)]
  pub fn activity(&self, x: BVar) -> f64 {
    self.activity[x as usize]
  }

  #[inline(always)]
  pub fn vmax(&self) -> u32 {
    self.vmax
  }

  #[inline(always)]
  pub fn advance_vmax(&mut self, x: u32) {
    debug_assert!(x >= self.vmax);
    self.vmax = x;
  }

  pub fn set_decay(&mut self, decay: f64) {
    debug_assert!(decay > 0.0 && decay < 1.0);
    self.inv_act_decay = 1.0 / decay;
  }

  /// Multiplies the increment by `1/decay`; equivalent to decaying every activity.
  pub fn decay_activities(&mut self) {
    self.act_increment *= self.inv_act_decay;
  }

  /// Bumps `x`'s activity, rescaling everything when the threshold is crossed.
  pub fn bump(&mut self, x: BVar) {
    let a = self.activity[x as usize] + self.act_increment;
    self.activity[x as usize] = a;
    if a > ACTIVITY_THRESHOLD {
      for act in self.activity.iter_mut().skip(1) {
        *act *= INV_ACTIVITY_THRESHOLD;
      }
      self.act_increment *= INV_ACTIVITY_THRESHOLD;
    }
    // Restore heap order if x sits in the heap.
    let i = self.heap_index[x as usize];
    if i >= 0 {
      self.sift_up(i as usize);
    }
  }

  #[inline(always)]
  pub fn contains(&self, x: BVar) -> bool {
    self.heap_index[x as usize] >= 0
  }

  /// Inserting never advances `vmax`: the tail sweep must still visit variables the
  /// heap has not seen.
  pub fn insert(&mut self, x: BVar) {
    if self.contains(x) {
      return;
    }
    self.heap.push(x);
    let i = self.heap.len() - 1;
    self.heap_index[x as usize] = i as i32;
    self.sift_up(i);
  }

  /// Removes and returns the maximum-activity variable, or `None` if the heap is empty.
  pub fn pop_max(&mut self) -> Option<BVar> {
    if self.heap.len() <= 1 {
      return None;
    }
    let top = self.heap[1];
    self.heap_index[top as usize] = -1;
    let last = self.heap.pop().unwrap();
    if self.heap.len() > 1 {
      self.heap[1] = last;
      self.heap_index[last as usize] = 1;
      self.sift_down(1);
    }
    Some(top)
  }

  fn sift_up(&mut self, mut i: usize) {
    let x = self.heap[i];
    let a = self.activity[x as usize];
    while i > 1 {
      let parent = i / 2;
      let y = self.heap[parent];
      if self.activity[y as usize] >= a {
        break;
      }
      self.heap[i] = y;
      self.heap_index[y as usize] = i as i32;
      i = parent;
    }
    self.heap[i] = x;
    self.heap_index[x as usize] = i as i32;
  }

  fn sift_down(&mut self, mut i: usize) {
    let x = self.heap[i];
    let a = self.activity[x as usize];
    loop {
      let mut child = 2 * i;
      if child >= self.heap.len() {
        break;
      }
      if child + 1 < self.heap.len()
        && self.activity[self.heap[child + 1] as usize] > self.activity[self.heap[child] as usize]
      {
        child += 1;
      }
      let y = self.heap[child];
      if a >= self.activity[y as usize] {
        break;
      }
      self.heap[i] = y;
      self.heap_index[y as usize] = i as i32;
      i = child;
    }
    self.heap[i] = x;
    self.heap_index[x as usize] = i as i32;
  }

  /// Drops every variable at or above `nvars` (used when popping a solver frame).
  pub fn shrink(&mut self, nvars: u32) {
    let mut kept: Vec<BVar> = self.heap[1..].iter().copied().filter(|&x| x < nvars).collect();
    self.heap.truncate(1);
    self.activity.truncate(nvars as usize);
    self.heap_index.truncate(nvars as usize);
    for slot in self.heap_index.iter_mut() {
      *slot = -1;
    }
    for x in kept.drain(..) {
      self.heap.push(x);
      let i = self.heap.len() - 1;
      self.heap_index[x as usize] = i as i32;
      self.sift_up(i);
    }
    if self.vmax > nvars {
      self.vmax = nvars;
    }
  }
}

impl Default for VarHeap {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pops_in_activity_order() {
    let mut heap = VarHeap::new();
    heap.extend(5); // variables 1..=5
    for x in 1..=5u32 {
      heap.insert(x);
    }
    heap.bump(3);
    heap.bump(3);
    heap.bump(5);

    assert_eq!(heap.pop_max(), Some(3));
    assert_eq!(heap.pop_max(), Some(5));
    // The rest have equal (zero) activity; all must come out exactly once.
    let mut rest = vec![
      heap.pop_max().unwrap(),
      heap.pop_max().unwrap(),
      heap.pop_max().unwrap(),
    ];
    rest.sort();
    assert_eq!(rest, vec![1, 2, 4]);
    assert_eq!(heap.pop_max(), None);
  }

  #[test]
  fn rescale_preserves_order() {
    let mut heap = VarHeap::new();
    heap.extend(2);
    heap.insert(1);
    heap.insert(2);
    for _ in 0..4 {
      heap.bump(2);
    }
    // Force a rescale by inflating the increment.
    heap.set_decay(0.5);
    for _ in 0..80 {
      heap.decay_activities();
      heap.bump(2);
    }
    assert!(heap.activity(2) > heap.activity(1));
    assert_eq!(heap.pop_max(), Some(2));
  }

  #[test]
  fn reinsertion_is_idempotent() {
    let mut heap = VarHeap::new();
    heap.extend(3);
    heap.insert(1);
    heap.insert(1);
    assert_eq!(heap.pop_max(), Some(1));
    assert_eq!(heap.pop_max(), None);
    assert!(!heap.contains(1));
  }
}
