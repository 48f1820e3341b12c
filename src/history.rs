use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::symbols::Symbol;

/// The k most recently attached modifier labels on one side of a head, most
/// recent first. Cheap to clone; equal histories from the same cache share
/// storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct History(Rc<[Symbol]>);

impl History {
  pub fn most_recent(&self) -> Option<Symbol> {
    self.0.first().copied()
  }

  pub fn as_slice(&self) -> &[Symbol] {
    &self.0
  }
}

impl Deref for History {
  type Target = [Symbol];

  fn deref(&self) -> &[Symbol] {
    &self.0
  }
}

impl fmt::Display for History {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<")?;
    for (idx, s) in self.0.iter().enumerate() {
      if idx > 0 {
        write!(f, " ")?;
      }
      write!(f, "{}", s)?;
    }
    write!(f, ">")
  }
}

/// Interning table for modifier histories, owned by a single decoder.
///
/// Shifting a label into a history is memoized, so the same `(history, label)`
/// pair seen across many joins yields the same shared slice.
#[derive(Debug)]
pub struct HistoryCache {
  window: usize,
  canonical: FxHashSet<History>,
  shifts: FxHashMap<(History, Symbol), History>,
  start: History,
}

impl HistoryCache {
  pub fn new(window: usize) -> Self {
    let start = History(vec![Symbol::START; window].into());
    let mut canonical = FxHashSet::default();
    canonical.insert(start.clone());
    Self {
      window,
      canonical,
      shifts: FxHashMap::default(),
      start,
    }
  }

  /// A history of `window` start tokens
  pub fn start(&self) -> History {
    self.start.clone()
  }

  pub fn intern(&mut self, labels: &[Symbol]) -> History {
    assert_eq!(labels.len(), self.window, "history has wrong window size");
    if let Some(h) = self.canonical.get(labels) {
      return h.clone();
    }
    let h = History(labels.into());
    self.canonical.insert(h.clone());
    h
  }

  /// Prepends `label`, dropping the oldest entry
  pub fn shift(&mut self, history: &History, label: Symbol) -> History {
    if let Some(h) = self.shifts.get(&(history.clone(), label)) {
      return h.clone();
    }

    let mut labels = Vec::with_capacity(self.window);
    if self.window > 0 {
      labels.push(label);
      labels.extend_from_slice(&history[..self.window - 1]);
    }
    let shifted = self.intern(&labels);
    self.shifts.insert((history.clone(), label), shifted.clone());
    shifted
  }

  pub fn len(&self) -> usize {
    self.canonical.len()
  }

  pub fn is_empty(&self) -> bool {
    self.canonical.is_empty()
  }
}

impl std::borrow::Borrow<[Symbol]> for History {
  fn borrow(&self) -> &[Symbol] {
    &self.0
  }
}
