//! Dynamic-programming equivalence classes for chart items.
//!
//! Two items with equal keys are interchangeable for every future decision,
//! so a chart cell keeps only the best-scoring item per key. Every policy
//! only conflates items whose future events condition on identical values.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use smallvec::SmallVec;

use crate::item::{Item, ItemArena, Side, WordHistory};
use crate::policy::LanguagePolicy;
use crate::subcat::Subcat;
use crate::symbols::Symbol;
use crate::word::TaggedWord;
use crate::Err;

/// Which fields an item key compares. Exactly one is active per decoder.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum EquivalencePolicy {
  /// Label, head word, head label, subcats, modifier histories, verb flags
  #[default]
  Default,
  /// Base NPs compare recent modifier head words instead of subcats
  BaseNpAware,
  /// The most recent history slot only records whether it is the start token
  StartCollapsed,
  /// The most recent history slot is compared after canonicalization
  CanonicalMods,
}

impl fmt::Display for EquivalencePolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Default => "default",
      Self::BaseNpAware => "base-np",
      Self::StartCollapsed => "start-collapsed",
      Self::CanonicalMods => "canonical-mods",
    };
    write!(f, "{}", name)
  }
}

impl FromStr for EquivalencePolicy {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "default" => Ok(Self::Default),
      "base-np" => Ok(Self::BaseNpAware),
      "start-collapsed" => Ok(Self::StartCollapsed),
      "canonical-mods" => Ok(Self::CanonicalMods),
      _ => Err(format!("unknown equivalence policy {}", s).into()),
    }
  }
}

/// The most recent slot of a modifier history, as the active policy sees it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FirstSlot {
  Empty,
  Exact(Symbol),
  IsStart(bool),
  Canonical(Symbol),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HistoryKey {
  first: FirstSlot,
  rest: SmallVec<[Symbol; 4]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Shape {
  /// Completed constituents: nothing but these feeds a later decision
  Stopped {
    label: Symbol,
    head_word: TaggedWord,
    preterminal: bool,
    contains_verb: bool,
  },
  Growing {
    label: Symbol,
    head_word: TaggedWord,
    head_label: Option<Symbol>,
    subcats: [Subcat; 2],
    histories: [HistoryKey; 2],
    verbs: [bool; 2],
    /// Right modifiers are closed off once a left one attaches
    left_modified: bool,
  },
  /// Growing base NPs under `BaseNpAware`
  BaseNp {
    label: Symbol,
    head_word: TaggedWord,
    head_label: Option<Symbol>,
    histories: [HistoryKey; 2],
    prev_words: [WordHistory; 2],
    verbs: [bool; 2],
    left_modified: bool,
  },
}

/// Equivalence key of an item under one policy.
///
/// Keys built under different policies must never meet; comparing them is a
/// contract violation and panics.
#[derive(Debug, Clone)]
pub struct ItemKey {
  policy: EquivalencePolicy,
  shape: Shape,
}

impl ItemKey {
  pub fn new<P>(
    policy: EquivalencePolicy,
    item: &Item,
    arena: &ItemArena,
    lang: &P,
    base_np_barrier: bool,
  ) -> Self
  where
    P: LanguagePolicy + ?Sized,
  {
    let head_label = item.head_child.map(|h| arena.get(h).label);

    let shape = if item.stop {
      Shape::Stopped {
        label: item.label,
        head_word: item.head_word,
        preterminal: item.is_preterminal(),
        contains_verb: item.contains_verb(arena, lang, base_np_barrier),
      }
    } else {
      let histories = [
        history_key(policy, item, Side::Left, lang),
        history_key(policy, item, Side::Right, lang),
      ];
      let verbs = [item.left.verb, item.right.verb];
      let left_modified = !item.left.children.is_empty();

      if policy == EquivalencePolicy::BaseNpAware && lang.is_base_np(item.label) {
        Shape::BaseNp {
          label: item.label,
          head_word: item.head_word,
          head_label,
          histories,
          prev_words: [item.left.prev_words.clone(), item.right.prev_words.clone()],
          verbs,
          left_modified,
        }
      } else {
        Shape::Growing {
          label: item.label,
          head_word: item.head_word,
          head_label,
          subcats: [item.left.subcat.clone(), item.right.subcat.clone()],
          histories,
          verbs,
          left_modified,
        }
      }
    };

    Self { policy, shape }
  }
}

fn history_key<P>(policy: EquivalencePolicy, item: &Item, side: Side, lang: &P) -> HistoryKey
where
  P: LanguagePolicy + ?Sized,
{
  let history = item.prev_mods(side);
  let first = match history.most_recent() {
    None => FirstSlot::Empty,
    Some(label) => match policy {
      EquivalencePolicy::StartCollapsed => FirstSlot::IsStart(label == lang.start_label()),
      EquivalencePolicy::CanonicalMods => FirstSlot::Canonical(lang.canonical_mod_label(label)),
      EquivalencePolicy::Default | EquivalencePolicy::BaseNpAware => FirstSlot::Exact(label),
    },
  };
  let rest = history.iter().skip(1).copied().collect();
  HistoryKey { first, rest }
}

impl PartialEq for ItemKey {
  fn eq(&self, other: &Self) -> bool {
    assert_eq!(
      self.policy, other.policy,
      "compared item keys built under different equivalence policies"
    );
    self.shape == other.shape
  }
}

impl Eq for ItemKey {}

impl Hash for ItemKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.shape.hash(state);
  }
}
