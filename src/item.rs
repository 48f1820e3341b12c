use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::history::History;
use crate::policy::LanguagePolicy;
use crate::subcat::Subcat;
use crate::symbols::Symbol;
use crate::word::TaggedWord;

/// Which side of the head a modifier attaches on
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
  Left,
  Right,
}

impl Side {
  pub fn opposite(self) -> Self {
    match self {
      Self::Left => Self::Right,
      Self::Right => Self::Left,
    }
  }
}

impl fmt::Display for Side {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Left => write!(f, "left"),
      Self::Right => write!(f, "right"),
    }
  }
}

/// Index of an item in its `ItemArena`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ItemIdx(pub u32);

#[derive(Debug)]
struct ChildNode {
  item: ItemIdx,
  next: ChildList,
}

/// Persistent singly-linked list of modifier items, most recently attached
/// (outermost) first. That is the reverse of head-adjacent order: the
/// modifier next to the head is last. Prepending shares the tail, so items
/// built from one another share their unmodified modifier lists, and
/// extraction reorders each side into surface order.
#[derive(Debug, Clone, Default)]
pub struct ChildList(Option<Rc<ChildNode>>);

impl ChildList {
  pub fn new() -> Self {
    Self(None)
  }

  /// A new list with `item` in front of this one
  pub fn cons(&self, item: ItemIdx) -> Self {
    Self(Some(Rc::new(ChildNode {
      item,
      next: self.clone(),
    })))
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_none()
  }

  pub fn len(&self) -> usize {
    self.iter().count()
  }

  pub fn iter(&self) -> ChildIter<'_> {
    ChildIter(self.0.as_deref())
  }

  pub fn shares_tail_with(&self, other: &ChildList) -> bool {
    match (&self.0, &other.0) {
      (Some(a), Some(b)) => Rc::ptr_eq(a, b),
      (None, None) => true,
      _ => false,
    }
  }
}

pub struct ChildIter<'a>(Option<&'a ChildNode>);

impl Iterator for ChildIter<'_> {
  type Item = ItemIdx;

  fn next(&mut self) -> Option<ItemIdx> {
    let node = self.0?;
    self.0 = node.next.0.as_deref();
    Some(node.item)
  }
}

/// Small bounded window of the head words of recent modifiers on one side
pub type WordHistory = SmallVec<[TaggedWord; 2]>;

/// Everything an item knows about one side of its head
#[derive(Debug, Clone)]
pub struct SideInfo {
  pub subcat: Subcat,
  pub children: ChildList,
  pub prev_mods: History,
  pub prev_words: WordHistory,
  pub verb: bool,
}

/// A (possibly partial) constituent hypothesis.
///
/// Items are built by value, handed to `Chart::add`, and never mutated once
/// the chart accepts them. Growth happens by building a new item that shares
/// the head child and modifier lists of the old one.
#[derive(Debug, Clone)]
pub struct Item {
  pub label: Symbol,
  pub head_word: TaggedWord,
  pub head_child: Option<ItemIdx>,
  pub left: SideInfo,
  pub right: SideInfo,
  pub stop: bool,
  pub start: usize,
  pub end: usize,
  pub log_tree_prob: f64,
  pub log_prior: f64,
  /// Set when the item lost a beam or duplicate competition after being
  /// inserted. Garbage items stay addressable but take part in nothing new.
  pub garbage: bool,
  contains_verb: Cell<Option<bool>>,
}

impl Item {
  /// A preterminal for `word`, already stopped, with start-token histories
  pub fn preterminal(
    word: TaggedWord,
    position: usize,
    empty_subcat: Subcat,
    start_history: History,
    start_words: WordHistory,
    log_prior: f64,
  ) -> Self {
    let side = SideInfo {
      subcat: empty_subcat,
      children: ChildList::new(),
      prev_mods: start_history,
      prev_words: start_words,
      verb: false,
    };
    Self {
      label: word.tag,
      head_word: word,
      head_child: None,
      left: side.clone(),
      right: side,
      stop: true,
      start: position,
      end: position,
      log_tree_prob: 0.0,
      log_prior,
      garbage: false,
      contains_verb: Cell::new(None),
    }
  }

  /// A new unstopped item whose only child is `head`
  pub fn unary(
    label: Symbol,
    head: (ItemIdx, &Item),
    left_subcat: Subcat,
    right_subcat: Subcat,
    start_history: History,
    start_words: WordHistory,
  ) -> Self {
    let (head_idx, head_item) = head;
    let side = |subcat| SideInfo {
      subcat,
      children: ChildList::new(),
      prev_mods: start_history.clone(),
      prev_words: start_words.clone(),
      verb: false,
    };
    Self {
      label,
      head_word: head_item.head_word,
      head_child: Some(head_idx),
      left: side(left_subcat),
      right: side(right_subcat),
      stop: false,
      start: head_item.start,
      end: head_item.end,
      log_tree_prob: head_item.log_tree_prob,
      log_prior: 0.0,
      garbage: false,
      contains_verb: Cell::new(None),
    }
  }

  /// Ranking score: tree probability plus prior, in log space
  pub fn score(&self) -> f64 {
    self.log_tree_prob + self.log_prior
  }

  pub fn is_preterminal(&self) -> bool {
    self.head_child.is_none()
  }

  pub fn side(&self, side: Side) -> &SideInfo {
    match side {
      Side::Left => &self.left,
      Side::Right => &self.right,
    }
  }

  pub fn subcat(&self, side: Side) -> &Subcat {
    &self.side(side).subcat
  }

  pub fn children(&self, side: Side) -> &ChildList {
    &self.side(side).children
  }

  pub fn prev_mods(&self, side: Side) -> &History {
    &self.side(side).prev_mods
  }

  pub fn verb(&self, side: Side) -> bool {
    self.side(side).verb
  }

  /// The span boundary on `side`
  pub fn edge(&self, side: Side) -> usize {
    match side {
      Side::Left => self.start,
      Side::Right => self.end,
    }
  }

  /// Copies scalars and the per-side histories, sharing every child link
  pub fn shallow_copy(&self) -> Self {
    Self {
      garbage: false,
      contains_verb: Cell::new(None),
      ..self.clone()
    }
  }

  /// Grows one side of this item. Resets the memoized verb property, since
  /// the side's verb flag may have changed.
  pub fn set_side_info(&mut self, side: Side, info: SideInfo, edge: usize) {
    match side {
      Side::Left => {
        self.left = info;
        self.start = edge;
      }
      Side::Right => {
        self.right = info;
        self.end = edge;
      }
    }
    self.contains_verb.set(None);
  }

  pub fn set_verb(&mut self, side: Side, verb: bool) {
    match side {
      Side::Left => self.left.verb = verb,
      Side::Right => self.right.verb = verb,
    }
    self.contains_verb.set(None);
  }

  /// Whether a verb is dominated anywhere by this item. Base NPs act as a
  /// barrier when `base_np_barrier` is set. Memoized.
  pub fn contains_verb<P>(&self, arena: &ItemArena, policy: &P, base_np_barrier: bool) -> bool
  where
    P: LanguagePolicy + ?Sized,
  {
    if let Some(v) = self.contains_verb.get() {
      return v;
    }

    let v = if base_np_barrier && policy.is_base_np(self.label) {
      false
    } else if self.left.verb || self.right.verb {
      true
    } else if let Some(head) = self.head_child {
      arena.get(head).contains_verb(arena, policy, base_np_barrier)
    } else {
      policy.is_verb_tag(self.head_word.tag)
    };

    self.contains_verb.set(Some(v));
    v
  }
}

/// Backing store for every item of one sentence.
///
/// Indices stay valid until `clear`. Slots are never reused mid-sentence,
/// so an index held by a child list can't come to mean a different item;
/// storage is recycled between sentences instead.
#[derive(Debug, Default)]
pub struct ItemArena {
  items: Vec<Item>,
}

impl ItemArena {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn alloc(&mut self, item: Item) -> ItemIdx {
    let idx = u32::try_from(self.items.len()).expect("item arena overflowed u32");
    self.items.push(item);
    ItemIdx(idx)
  }

  /// Assumes valid, panics on a dangling index
  pub fn get(&self, idx: ItemIdx) -> &Item {
    self.items.get(idx.0 as usize).expect("Invalid ItemIdx")
  }

  pub(crate) fn mark_garbage(&mut self, idx: ItemIdx) {
    self
      .items
      .get_mut(idx.0 as usize)
      .expect("Invalid ItemIdx")
      .garbage = true;
  }

  /// Drops every item, keeping the allocation for the next sentence
  pub fn clear(&mut self) {
    self.items.clear();
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}
