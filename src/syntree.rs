use std::fmt;

/// A labeled node covering words `span.0..span.1` (half-open)
#[derive(Debug, PartialEq, Clone)]
pub struct Constituent<T> {
  pub value: T,
  pub span: (usize, usize),
}

impl<T> fmt::Display for Constituent<T>
where
  T: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}: {}", self.span.0, self.span.1, self.value)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Word<U> {
  pub value: U,
  pub span: (usize, usize),
}

impl<U> fmt::Display for Word<U>
where
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}: {}", self.span.0, self.span.1, self.value)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub enum SynTree<T, U> {
  Branch(Constituent<T>, Vec<SynTree<T, U>>),
  Leaf(Word<U>),
}

impl<T, U> SynTree<T, U> {
  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf(_))
  }

  pub fn is_branch(&self) -> bool {
    matches!(self, Self::Branch(_, _))
  }

  pub fn get_leaf(&self) -> Option<&Word<U>> {
    match self {
      Self::Leaf(w) => Some(w),
      _ => None,
    }
  }

  pub fn get_branch(&self) -> Option<(&Constituent<T>, &Vec<SynTree<T, U>>)> {
    match self {
      Self::Branch(c, cs) => Some((c, cs)),
      _ => None,
    }
  }

  pub fn span(&self) -> (usize, usize) {
    match self {
      Self::Branch(c, _) => c.span,
      Self::Leaf(w) => w.span,
    }
  }

  /// Leaves in left-to-right order
  pub fn leaves(&self) -> Vec<&Word<U>> {
    let mut out = Vec::new();
    self.collect_leaves(&mut out);
    out
  }

  fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Word<U>>) {
    match self {
      Self::Leaf(w) => out.push(w),
      Self::Branch(_, children) => {
        for c in children {
          c.collect_leaves(out);
        }
      }
    }
  }

  pub fn map<V, W, B, L>(&self, map_branch: &B, map_leaf: &L) -> SynTree<V, W>
  where
    B: Fn(&Constituent<T>) -> V,
    L: Fn(&Word<U>) -> W,
  {
    match self {
      Self::Branch(t, children) => {
        let children = children
          .iter()
          .map(|c| c.map(map_branch, map_leaf))
          .collect::<Vec<_>>();
        SynTree::Branch(
          Constituent {
            span: t.span,
            value: map_branch(t),
          },
          children,
        )
      }
      Self::Leaf(u) => SynTree::Leaf(Word {
        span: u.span,
        value: map_leaf(u),
      }),
    }
  }
}

impl<T, U> SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  /// Penn Treebank bracketing, e.g. `(S (NP (NN dogs)) (VP (VBP bark)))`
  pub fn to_bracketed(&self) -> String {
    match self {
      Self::Leaf(w) => w.value.to_string(),
      Self::Branch(c, children) => {
        let inner = children
          .iter()
          .map(|c| c.to_bracketed())
          .collect::<Vec<_>>()
          .join(" ");
        format!("({} {})", c.value, inner)
      }
    }
  }
}

impl<T, U> fmt::Display for SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Leaf(t) => write!(f, "{}", t),
      Self::Branch(t, ts) => {
        write!(f, "({}", t)?;
        if ts.len() == 1 {
          write!(f, " ({}))", ts[0])
        } else {
          for t in ts.iter() {
            // TODO: is there a nice way to do this that doesn't allocate a String?
            let fmt = format!("{}", t);
            for line in fmt.lines() {
              write!(f, "\n  {}", line)?;
            }
          }
          write!(f, ")")
        }
      }
    }
  }
}
