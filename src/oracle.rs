//! The boundary between the decoder and the statistical model. Every
//! probability the decoder uses comes through `ProbabilityOracle`, in log
//! space.

use crate::item::Side;
use crate::subcat::Subcat;
use crate::symbols::Symbol;
use crate::word::TaggedWord;

/// Log-probability sentinel for impossible events. Anything at or below it,
/// including `-inf`, is treated as impossible.
pub const LOG_OF_ZERO: f64 = -1.0e300;

/// Whether the decoder must reject an event scored `log_prob`
pub fn is_impossible(log_prob: f64) -> bool {
  log_prob.is_nan() || log_prob <= LOG_OF_ZERO
}

/// Prior of a constituent labeled `label` headed by `word`. For preterminals
/// the label is the tag.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PriorEvent {
  pub word: TaggedWord,
  pub label: Symbol,
}

/// What the head-generation event conditions on, minus the subcat frames
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HeadContext {
  pub word: TaggedWord,
  pub parent: Symbol,
  pub head_label: Symbol,
}

/// Generating `head_label` as the head child of `parent`, together with the
/// subcat frames on each side
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HeadEvent<'a> {
  pub context: HeadContext,
  pub left_subcat: &'a Subcat,
  pub right_subcat: &'a Subcat,
}

/// Generating one modifier (or, for stop events, the stop sentinel) on one
/// side of a head
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ModifierEvent<'a> {
  pub mod_word: TaggedWord,
  pub head_word: TaggedWord,
  pub mod_label: Symbol,
  pub history: &'a [Symbol],
  pub parent: Symbol,
  pub head_label: Symbol,
  pub subcat: &'a Subcat,
  pub verb_intervening: bool,
  pub side: Side,
}

impl ModifierEvent<'_> {
  /// The history at the coarsest back-off level
  pub fn coarse_history(&self) -> CoarseHistory {
    CoarseHistory {
      side: self.side,
      parent: self.parent,
      head_label: self.head_label,
    }
  }

  pub fn future(&self) -> ModifierFuture {
    ModifierFuture {
      label: self.mod_label,
      tag: self.mod_word.tag,
    }
  }
}

/// Modifier-generation history with everything but the parent, head label
/// and side backed off
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CoarseHistory {
  pub side: Side,
  pub parent: Symbol,
  pub head_label: Symbol,
}

/// What a modifier-generation event predicts
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ModifierFuture {
  pub label: Symbol,
  pub tag: Symbol,
}

/// Read-only source of every probability the decoder needs.
///
/// Decoders running on different threads may share one oracle, which is why
/// implementations are expected to be `Sync` when used that way.
pub trait ProbabilityOracle {
  /// Every nonterminal a unary projection may produce
  fn nonterminals(&self) -> &[Symbol];

  /// Candidate tags for a word symbol (or unknown-word feature class)
  fn tags(&self, word: Symbol) -> &[Symbol];

  fn prior(&self, event: &PriorEvent) -> f64;

  fn head(&self, event: &HeadEvent<'_>) -> f64;

  /// Subcat frames ever observed on `side` for this head context
  fn possible_subcats(&self, side: Side, context: &HeadContext) -> &[Subcat];

  fn modifier(&self, event: &ModifierEvent<'_>) -> f64;

  /// Probability of generating no further modifiers on `event.side`. The
  /// event's modifier label and word are the stop sentinels.
  fn stop(&self, event: &ModifierEvent<'_>) -> f64;

  /// Whether `future` was ever observed following `history`. Oracles without
  /// a futures map license everything.
  fn future_possible(&self, _history: &CoarseHistory, _future: &ModifierFuture) -> bool {
    true
  }
}
