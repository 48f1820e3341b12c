use std::fmt;

use smallvec::SmallVec;

use crate::symbols::Symbol;

/// How a subcat frame stores its requirements
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SubcatKind {
  /// Unordered multiset; any outstanding argument may be discharged next
  #[default]
  Bag,
  /// Ordered list; removal takes the first matching requirement
  List,
}

/// The argument labels a head still requires on one side.
///
/// Both kinds share one representation. A bag keeps its elements sorted so
/// that equal multisets compare and hash equal; a list keeps insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subcat {
  kind: SubcatKind,
  elems: SmallVec<[Symbol; 4]>,
}

impl Subcat {
  pub fn empty(kind: SubcatKind) -> Self {
    Self {
      kind,
      elems: SmallVec::new(),
    }
  }

  pub fn with_requirements<I>(kind: SubcatKind, requirements: I) -> Self
  where
    I: IntoIterator<Item = Symbol>,
  {
    let mut subcat = Self::empty(kind);
    for r in requirements {
      subcat.add(r);
    }
    subcat
  }

  pub fn kind(&self) -> SubcatKind {
    self.kind
  }

  pub fn add(&mut self, requirement: Symbol) {
    match self.kind {
      SubcatKind::Bag => {
        let pos = self.elems.partition_point(|s| *s <= requirement);
        self.elems.insert(pos, requirement);
      }
      SubcatKind::List => self.elems.push(requirement),
    }
  }

  pub fn contains(&self, requirement: Symbol) -> bool {
    self.elems.contains(&requirement)
  }

  /// Discharges one occurrence of `requirement`. Returns false if absent.
  pub fn remove(&mut self, requirement: Symbol) -> bool {
    match self.elems.iter().position(|s| *s == requirement) {
      Some(pos) => {
        self.elems.remove(pos);
        true
      }
      None => false,
    }
  }

  /// Restores sorted order for bags. Lists are left alone.
  pub fn canonicalize(&mut self) {
    if self.kind == SubcatKind::Bag {
      self.elems.sort_unstable();
    }
  }

  pub fn is_empty(&self) -> bool {
    self.elems.is_empty()
  }

  pub fn len(&self) -> usize {
    self.elems.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
    self.elems.iter().copied()
  }
}

impl fmt::Display for Subcat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{{")?;
    for (idx, s) in self.elems.iter().enumerate() {
      if idx > 0 {
        write!(f, " ")?;
      }
      write!(f, "{}", s)?;
    }
    write!(f, "}}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const NP: Symbol = Symbol(10);
  const S: Symbol = Symbol(11);

  #[test]
  fn bags_ignore_order() {
    let a = Subcat::with_requirements(SubcatKind::Bag, [NP, S]);
    let b = Subcat::with_requirements(SubcatKind::Bag, [S, NP]);
    assert_eq!(a, b);
  }

  #[test]
  fn lists_keep_order() {
    let a = Subcat::with_requirements(SubcatKind::List, [NP, S]);
    let b = Subcat::with_requirements(SubcatKind::List, [S, NP]);
    assert_ne!(a, b);
    assert_eq!(a.iter().collect::<Vec<_>>(), vec![NP, S]);
  }

  #[test]
  fn removal_discharges_one_occurrence() {
    let mut bag = Subcat::with_requirements(SubcatKind::Bag, [NP, NP, S]);
    assert!(bag.remove(NP));
    assert!(bag.contains(NP));
    assert_eq!(bag.len(), 2);
    assert!(bag.remove(NP));
    assert!(!bag.contains(NP));
    assert!(!bag.remove(NP));
    assert!(bag.remove(S));
    assert!(bag.is_empty());
  }

  #[test]
  fn copies_are_independent() {
    let original = Subcat::with_requirements(SubcatKind::List, [NP]);
    let mut copy = original.clone();
    copy.remove(NP);
    assert!(original.contains(NP));
    assert!(copy.is_empty());
  }

  #[test]
  fn kinds_never_compare_equal() {
    assert_ne!(Subcat::empty(SubcatKind::Bag), Subcat::empty(SubcatKind::List));
  }
}
