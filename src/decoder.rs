//! The CKY search itself: seeding, span-by-span completion, closure under
//! unary projection and stop events, and root selection.

use tracing::{debug, info, trace, warn};

use crate::chart::{Chart, LabelGroup};
use crate::history::HistoryCache;
use crate::item::{Item, ItemIdx, Side, SideInfo, WordHistory};
use crate::oracle::{is_impossible, HeadContext, HeadEvent, ModifierEvent, PriorEvent, ProbabilityOracle};
use crate::policy::LanguagePolicy;
use crate::settings::Settings;
use crate::subcat::Subcat;
use crate::symbols::{Symbol, SymbolTable};
use crate::syntree::{Constituent, SynTree, Word};
use crate::word::{Sentence, TaggedWord, Token};

/// The best derivation of a sentence
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
  /// Labels and word symbols, with half-open word spans. The top label is
  /// not part of the tree.
  pub tree: SynTree<Symbol, Symbol>,
  /// Log probability of the whole derivation, top transition included
  pub score: f64,
  pub sentence: Sentence,
}

impl Derivation {
  /// Resolves symbols to names. Unknown words show their input text.
  pub fn resolve(&self, symbols: &SymbolTable) -> SynTree<String, String> {
    self.tree.map(
      &|c| symbols.name(c.value).to_string(),
      &|w| match self.sentence.get(w.span.0) {
        Some(Token::Unknown { text, .. }) => text.clone(),
        _ => symbols.name(w.value).to_string(),
      },
    )
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
  Parse(Derivation),
  /// No top item survived. The input comes back untouched.
  NoParse(Sentence),
}

impl Decoded {
  pub fn derivation(&self) -> Option<&Derivation> {
    match self {
      Self::Parse(d) => Some(d),
      Self::NoParse(_) => None,
    }
  }
}

/// Decodes sentences one at a time against a shared oracle and language
/// policy. Owns its chart and history cache, which are reused between
/// sentences; run one decoder per thread.
pub struct Decoder<'a, O, L>
where
  O: ProbabilityOracle + ?Sized,
  L: LanguagePolicy + ?Sized,
{
  oracle: &'a O,
  lang: &'a L,
  settings: Settings,
  chart: Chart,
  histories: HistoryCache,
  start_words: WordHistory,
  commas: Vec<bool>,
  last_top_score: Option<f64>,
}

impl<'a, O, L> Decoder<'a, O, L>
where
  O: ProbabilityOracle + ?Sized,
  L: LanguagePolicy + ?Sized,
{
  /// `settings.subcat` must match the kind of frames `oracle` hands out
  pub fn new(oracle: &'a O, lang: &'a L, settings: Settings) -> Self {
    let start_words = std::iter::repeat_n(lang.start_word(), settings.prev_word_window).collect();
    Self {
      oracle,
      lang,
      chart: Chart::new(&settings),
      histories: HistoryCache::new(settings.history_window),
      start_words,
      commas: Vec::new(),
      last_top_score: None,
      settings,
    }
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  /// The chart as the last decode left it
  pub fn chart(&self) -> &Chart {
    &self.chart
  }

  /// Score of the last decode's winning top item, if it had one
  pub fn last_top_score(&self) -> Option<f64> {
    self.last_top_score
  }

  pub fn decode(&mut self, sentence: Sentence) -> Decoded {
    let n = sentence.len();
    self.last_top_score = None;

    if n == 0 {
      debug!("empty sentence");
      return Decoded::NoParse(sentence);
    }
    if n > self.settings.max_sentence_length {
      warn!(
        length = n,
        max = self.settings.max_sentence_length,
        "sentence too long, skipping"
      );
      return Decoded::NoParse(sentence);
    }

    debug!(length = n, "decoding sentence");
    let lang = self.lang;
    self.chart.set_size_and_clear(n);
    self.commas = sentence.tokens().iter().map(|t| lang.is_comma(t.word())).collect();

    self.initialize(&sentence);
    for width in 1..n {
      for start in 0..n - width {
        self.complete(start, start + width);
      }
      trace!(width, items = self.chart.arena().len(), "finished spans");
    }

    let Some(top) = self.finalize(n) else {
      info!(length = n, "no parse");
      return Decoded::NoParse(sentence);
    };

    let root = self.chart.item(top);
    let score = root.score();
    let head = root.head_child.expect("top items have a head child");
    let tree = extract(&self.chart, head);
    self.last_top_score = Some(score);
    debug!(score, items = self.chart.arena().len(), "parsed sentence");

    Decoded::Parse(Derivation {
      tree,
      score,
      sentence,
    })
  }

  /// Seeds one preterminal per candidate tag of every word, then closes
  /// each single-word cell
  fn initialize(&mut self, sentence: &Sentence) {
    let oracle = self.oracle;
    let lang = self.lang;

    for (i, token) in sentence.tokens().iter().enumerate() {
      let mut tags = match token.supplied_tags() {
        [] => oracle.tags(token.word()),
        tags => tags,
      };
      // outside the lexicon, even if the name is a known label or tag
      if tags.is_empty() {
        tags = oracle.tags(Symbol::UNKNOWN);
      }
      if tags.is_empty() {
        debug!(position = i, "no candidate tags");
      }

      for &tag in tags {
        let word = TaggedWord::new(token.word(), tag);
        let log_prior = oracle.prior(&PriorEvent { word, label: tag });
        if is_impossible(log_prior) {
          continue;
        }
        let item = Item::preterminal(
          word,
          i,
          Subcat::empty(self.settings.subcat),
          self.histories.start(),
          self.start_words.clone(),
          log_prior,
        );
        self.chart.add(i, i, item, lang);
      }

      self.closure(i, i);
    }
  }

  /// Closes a cell under unary projection and stop events. Every round
  /// projects the stopped items that are new since the last round and stops
  /// whatever can be stopped; it ends once a round stops nothing new.
  fn closure(&mut self, start: usize, end: usize) {
    let lang = self.lang;
    let mut frontier = self.chart.cell_items(start, end);
    let mut rounds = 0;

    while !frontier.is_empty() {
      rounds += 1;

      let mut unaries = Vec::new();
      for &idx in &frontier {
        self.project(idx, &mut unaries);
      }

      let mut growing = frontier;
      for item in unaries {
        if let Some(idx) = self.chart.add(start, end, item, lang) {
          growing.push(idx);
        }
      }

      let stopped = growing
        .into_iter()
        .filter_map(|idx| self.stop_item(idx))
        .collect::<Vec<_>>();
      frontier = stopped
        .into_iter()
        .filter_map(|item| self.chart.add(start, end, item, lang))
        .collect();
    }

    trace!(start, end, rounds, "closed cell");
  }

  /// Unary projections of a stopped item to every nonterminal, once per
  /// licensed pair of subcat frames
  fn project(&self, idx: ItemIdx, out: &mut Vec<Item>) {
    let oracle = self.oracle;
    let top = self.lang.top_label();
    let item = self.chart.item(idx);
    if item.garbage || !item.stop {
      return;
    }

    for &parent in oracle.nonterminals() {
      if parent == top {
        continue;
      }
      let context = HeadContext {
        word: item.head_word,
        parent,
        head_label: item.label,
      };
      let lefts = oracle.possible_subcats(Side::Left, &context);
      let rights = oracle.possible_subcats(Side::Right, &context);
      if lefts.is_empty() || rights.is_empty() {
        continue;
      }
      let log_prior = oracle.prior(&PriorEvent {
        word: item.head_word,
        label: parent,
      });
      if is_impossible(log_prior) {
        continue;
      }

      for left in lefts {
        for right in rights {
          let log_head = oracle.head(&HeadEvent {
            context,
            left_subcat: left,
            right_subcat: right,
          });
          if is_impossible(log_head) {
            continue;
          }
          let mut unary = Item::unary(
            parent,
            (idx, item),
            left.clone(),
            right.clone(),
            self.histories.start(),
            self.start_words.clone(),
          );
          unary.log_tree_prob += log_head;
          unary.log_prior = log_prior;
          out.push(unary);
        }
      }
    }
  }

  /// A stopped copy of an item whose frames are both discharged
  fn stop_item(&self, idx: ItemIdx) -> Option<Item> {
    let oracle = self.oracle;
    let lang = self.lang;
    let item = self.chart.item(idx);
    if item.garbage || item.stop || !item.left.subcat.is_empty() || !item.right.subcat.is_empty() {
      return None;
    }

    let head_label = head_label(&self.chart, item);
    let mut log_stop = 0.0;
    for side in [Side::Left, Side::Right] {
      let lp = oracle.stop(&ModifierEvent {
        mod_word: lang.stop_word(),
        head_word: item.head_word,
        mod_label: lang.stop_label(),
        history: item.prev_mods(side).as_slice(),
        parent: item.label,
        head_label,
        subcat: item.subcat(side),
        verb_intervening: item.verb(side),
        side,
      });
      if is_impossible(lp) {
        return None;
      }
      log_stop += lp;
    }

    let mut stopped = item.shallow_copy();
    stopped.stop = true;
    stopped.log_tree_prob += log_stop;
    Some(stopped)
  }

  /// Fills cell (start, end) from every pair of adjacent sub-spans, then
  /// closes it
  fn complete(&mut self, start: usize, end: usize) {
    let lang = self.lang;

    for split in start..end {
      if self.settings.comma_constraint && comma_blocks(&self.commas, split, end) {
        trace!(start, split, end, "split blocked by comma");
        continue;
      }

      for side in [Side::Left, Side::Right] {
        let (modificand_span, modifier_span) = match side {
          Side::Left => ((split + 1, end), (start, split)),
          Side::Right => ((start, split), (split + 1, end)),
        };
        let modifiers = self.live_items(modifier_span, |item| item.stop);
        if modifiers.is_empty() {
          continue;
        }
        let modificands = self.live_items(modificand_span, |item| can_take_modifier(item, side));

        for &modificand in &modificands {
          for &modifier in &modifiers {
            if let Some(joined) = self.join_items(modificand, modifier, side) {
              self.chart.add(start, end, joined, lang);
            }
          }
        }
      }
    }

    self.closure(start, end);
  }

  fn live_items<F>(&self, (start, end): (usize, usize), pred: F) -> Vec<ItemIdx>
  where
    F: Fn(&Item) -> bool,
  {
    self
      .chart
      .cell(start, end)
      .filter(|&idx| {
        let item = self.chart.item(idx);
        !item.garbage && pred(item)
      })
      .collect()
  }

  /// Attaches `modifier` to `side` of `modificand`, or `None` if the model
  /// rules the attachment out
  fn join_items(&mut self, modificand: ItemIdx, modifier: ItemIdx, side: Side) -> Option<Item> {
    let oracle = self.oracle;
    let lang = self.lang;
    let chart = &self.chart;
    let head = chart.item(modificand);
    let dep = chart.item(modifier);

    let mut subcat = head.subcat(side).clone();
    if !subcat.remove(dep.label) && lang.is_argument(dep.label) {
      return None;
    }

    let verb = head.verb(side);
    let event = ModifierEvent {
      mod_word: dep.head_word,
      head_word: head.head_word,
      mod_label: dep.label,
      history: head.prev_mods(side).as_slice(),
      parent: head.label,
      head_label: head_label(chart, head),
      subcat: head.subcat(side),
      verb_intervening: verb,
      side,
    };
    let log_mod = oracle.modifier(&event);
    if is_impossible(log_mod) {
      return None;
    }
    if self.settings.future_check && !oracle.future_possible(&event.coarse_history(), &event.future()) {
      return None;
    }

    let prev_mods = self.histories.shift(head.prev_mods(side), dep.label);
    let mut prev_words = head.side(side).prev_words.clone();
    if self.settings.prev_word_window > 0 {
      prev_words.insert(0, dep.head_word);
      prev_words.truncate(self.settings.prev_word_window);
    }
    let verb = verb || dep.contains_verb(chart.arena(), lang, self.settings.base_np_verb_barrier);

    let info = SideInfo {
      subcat,
      children: head.children(side).cons(modifier),
      prev_mods,
      prev_words,
      verb,
    };
    let mut joined = head.shallow_copy();
    joined.set_side_info(side, info, dep.edge(side));
    joined.log_tree_prob = head.log_tree_prob + dep.log_tree_prob + log_mod;
    joined.log_prior = head.log_prior;
    Some(joined)
  }

  /// Projects every stopped item of the full-sentence cell to the top label
  /// and returns the best top item
  fn finalize(&mut self, n: usize) -> Option<ItemIdx> {
    let oracle = self.oracle;
    let lang = self.lang;
    let top = lang.top_label();
    let end = n - 1;
    let empty = Subcat::empty(self.settings.subcat);

    let mut roots = Vec::new();
    for idx in self.chart.cell(0, end) {
      let item = self.chart.item(idx);
      if item.garbage || !item.stop || item.label == top {
        continue;
      }
      let log_head = oracle.head(&HeadEvent {
        context: HeadContext {
          word: item.head_word,
          parent: top,
          head_label: item.label,
        },
        left_subcat: &empty,
        right_subcat: &empty,
      });
      if is_impossible(log_head) {
        continue;
      }
      let mut root = Item::unary(
        top,
        (idx, item),
        empty.clone(),
        empty.clone(),
        self.histories.start(),
        self.start_words.clone(),
      );
      root.stop = true;
      root.log_tree_prob += log_head;
      roots.push(root);
    }

    trace!(candidates = roots.len(), "top transitions");
    for root in roots {
      self.chart.add(0, end, root, lang);
    }
    self.chart.get(0, end, top).and_then(LabelGroup::best)
  }
}

/// Left modifiers only after the right frame is discharged; right modifiers
/// only before any left modifier
fn can_take_modifier(item: &Item, side: Side) -> bool {
  !item.stop
    && match side {
      Side::Left => item.right.subcat.is_empty(),
      Side::Right => item.left.children.is_empty(),
    }
}

/// Whether splitting after word `split` strands a medial comma
fn comma_blocks(commas: &[bool], split: usize, end: usize) -> bool {
  commas[split] && !commas[end] && end + 1 < commas.len()
}

fn head_label(chart: &Chart, item: &Item) -> Symbol {
  item
    .head_child
    .map(|h| chart.item(h).label)
    .unwrap_or(item.label)
}

/// Rebuilds the tree under an item from head-child and modifier links
fn extract(chart: &Chart, idx: ItemIdx) -> SynTree<Symbol, Symbol> {
  let item = chart.item(idx);
  let span = (item.start, item.end + 1);
  let constituent = Constituent {
    value: item.label,
    span,
  };

  let Some(head) = item.head_child else {
    let leaf = SynTree::Leaf(Word {
      value: item.head_word.word,
      span,
    });
    return SynTree::Branch(constituent, vec![leaf]);
  };

  // both lists are outermost first
  let mut children = item.left.children.iter().collect::<Vec<_>>();
  children.push(head);
  let first_right = children.len();
  children.extend(item.right.children.iter());
  children[first_right..].reverse();

  SynTree::Branch(
    constituent,
    children.into_iter().map(|c| extract(chart, c)).collect(),
  )
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;
  use crate::equivalence::EquivalencePolicy;
  use crate::item::ChildList;
  use crate::oracle::{CoarseHistory, ModifierFuture};
  use crate::policy::TreebankPolicy;
  use crate::subcat::SubcatKind;
  use crate::table::TableOracle;
  use crate::testing::{NN, NP_A, VP, WORD};

  fn decode_with<O>(oracle: &O, symbols: &SymbolTable, settings: Settings, words: &[&str]) -> Decoded
  where
    O: ProbabilityOracle + ?Sized,
  {
    let lang = TreebankPolicy::new(symbols);
    let sentence = Sentence::from_words(symbols, &lang, words).unwrap();
    Decoder::new(oracle, &lang, settings).decode(sentence)
  }

  fn bracketed(model: &str, settings: Settings, words: &[&str]) -> Option<String> {
    let oracle: TableOracle = model.parse().unwrap();
    decode_with(&oracle, oracle.symbols(), settings, words)
      .derivation()
      .map(|d| d.resolve(oracle.symbols()).to_bracketed())
  }

  /// `b` heads X and needs a C-A argument on its right; `a` is a plain left
  /// modifier
  const ORDERED: &str = r#"
    tags a A; tags b B; tags c C;
    head X B [] [C-A] = 0;
    head C-A C [] [] = 0;
    stop C-A C left = 0; stop C-A C right = 0;
    mod X B left A = -0.5;
    mod X B right C-A = -0.25;
    stop X B left = 0; stop X B right = 0;
    head +TOP+ X [] [] = 0;
  "#;

  const NOUN_PHRASE: &str = r#"
    tags the DT; tags big JJ; tags dog NN;
    head NPB NN [] [] = 0;
    mod NPB NN left DT = -1;
    mod NPB NN left JJ = -1;
    stop NPB NN left = 0; stop NPB NN right = 0;
    head +TOP+ NPB [] [] = 0;
  "#;

  #[test]
  fn single_word_with_certain_events() {
    let oracle: TableOracle = "tags dog T; head +TOP+ T [] [] = 0;".parse().unwrap();
    let symbols = oracle.symbols();
    let t = symbols.get("T").unwrap();
    let dog = symbols.get("dog").unwrap();
    let lang = TreebankPolicy::new(symbols);
    let sentence = Sentence::from_words(symbols, &lang, &["dog"]).unwrap();

    let mut decoder = Decoder::new(&oracle, &lang, Settings::default());
    let derivation = match decoder.decode(sentence) {
      Decoded::Parse(d) => d,
      Decoded::NoParse(_) => panic!("expected a parse"),
    };

    assert_eq!(
      derivation.tree,
      SynTree::Branch(
        Constituent {
          value: t,
          span: (0, 1)
        },
        vec![SynTree::Leaf(Word {
          value: dog,
          span: (0, 1)
        })]
      )
    );
    assert_eq!(derivation.score, 0.0);
    assert_eq!(decoder.last_top_score(), Some(0.0));
    assert!(decoder.chart().get(0, 0, t).is_some());
  }

  #[test]
  fn impossible_top_transition_is_no_parse() {
    for model in ["tags dog T; head +TOP+ T [] [] = -inf;", "tags dog T;"] {
      let oracle: TableOracle = model.parse().unwrap();
      let symbols = oracle.symbols();
      let lang = TreebankPolicy::new(symbols);
      let sentence = Sentence::from_words(symbols, &lang, &["dog"]).unwrap();

      let mut decoder = Decoder::new(&oracle, &lang, Settings::default());
      assert_eq!(decoder.decode(sentence.clone()), Decoded::NoParse(sentence));
      assert_eq!(decoder.last_top_score(), None);
    }
  }

  #[test]
  fn arguments_discharge_before_left_modifiers() {
    let oracle: TableOracle = ORDERED.parse().unwrap();
    let symbols = oracle.symbols();
    let x = symbols.get("X").unwrap();
    let a = symbols.get("A").unwrap();
    let c_a = symbols.get("C-A").unwrap();
    let lang = TreebankPolicy::new(symbols);
    let sentence = Sentence::from_words(symbols, &lang, &["a", "b", "c"]).unwrap();

    let mut decoder = Decoder::new(&oracle, &lang, Settings::default());
    let decoded = decoder.decode(sentence);
    let derivation = decoded.derivation().unwrap();
    assert_eq!(
      derivation.resolve(symbols).to_bracketed(),
      "(X (A a) (B b) (C-A (C c)))"
    );
    assert_eq!(derivation.score, -0.75);

    // attaching `a` first would need X with its argument still pending
    let chart = decoder.chart();
    assert!(chart.get(0, 1, x).is_none());
    assert_eq!(chart.cell(0, 1).count(), 0);

    let full = chart.get(0, 2, x).unwrap();
    for idx in full.iter() {
      let item = chart.item(idx);
      assert!(item.right.subcat.is_empty());
      assert_eq!(item.prev_mods(Side::Left).as_slice(), &[a, Symbol::START]);
      assert_eq!(item.prev_mods(Side::Right).as_slice(), &[c_a, Symbol::START]);
    }
  }

  #[test]
  fn modifier_eligibility_follows_derivation_order() {
    let mut cache = HistoryCache::new(2);
    let pending = Subcat::with_requirements(SubcatKind::Bag, [NP_A]);
    let empty = Subcat::empty(SubcatKind::Bag);
    let head = Item::preterminal(
      TaggedWord::new(WORD, NN),
      0,
      empty.clone(),
      cache.start(),
      WordHistory::new(),
      0.0,
    );

    let fresh = Item::unary(VP, (ItemIdx(0), &head), empty.clone(), pending, cache.start(), WordHistory::new());
    assert!(!can_take_modifier(&fresh, Side::Left));
    assert!(can_take_modifier(&fresh, Side::Right));

    let mut modified = Item::unary(VP, (ItemIdx(0), &head), empty.clone(), empty.clone(), cache.start(), WordHistory::new());
    let info = SideInfo {
      subcat: empty,
      children: ChildList::new().cons(ItemIdx(1)),
      prev_mods: cache.shift(&cache.start(), NN),
      prev_words: WordHistory::new(),
      verb: false,
    };
    modified.set_side_info(Side::Left, info, 0);
    assert!(can_take_modifier(&modified, Side::Left));
    assert!(!can_take_modifier(&modified, Side::Right));

    assert!(!can_take_modifier(&head, Side::Left));
    assert!(!can_take_modifier(&head, Side::Right));
  }

  #[test]
  fn every_policy_finds_the_same_parse() {
    for equivalence in [
      EquivalencePolicy::Default,
      EquivalencePolicy::BaseNpAware,
      EquivalencePolicy::StartCollapsed,
      EquivalencePolicy::CanonicalMods,
    ] {
      let settings = Settings {
        equivalence,
        ..Settings::default()
      };
      assert_eq!(
        bracketed(ORDERED, settings.clone(), &["a", "b", "c"]).as_deref(),
        Some("(X (A a) (B b) (C-A (C c)))"),
        "{}",
        equivalence
      );
      assert_eq!(
        bracketed(NOUN_PHRASE, settings, &["the", "dog"]).as_deref(),
        Some("(NPB (DT the) (NN dog))"),
        "{}",
        equivalence
      );
    }
  }

  #[test]
  fn modifiers_keep_surface_order() {
    assert_eq!(
      bracketed(NOUN_PHRASE, Settings::default(), &["the", "big", "dog"]).as_deref(),
      Some("(NPB (DT the) (JJ big) (NN dog))")
    );
  }

  #[test]
  fn items_stay_inside_their_cells() {
    let oracle: TableOracle = ORDERED.parse().unwrap();
    let symbols = oracle.symbols();
    let lang = TreebankPolicy::new(symbols);
    let sentence = Sentence::from_words(symbols, &lang, &["a", "b", "c"]).unwrap();
    let mut decoder = Decoder::new(&oracle, &lang, Settings::default());
    decoder.decode(sentence);

    let chart = decoder.chart();
    let n = chart.len();
    for start in 0..n {
      for end in start..n {
        for idx in chart.cell(start, end) {
          let item = chart.item(idx);
          assert_eq!((item.start, item.end), (start, end));
          let children = item
            .head_child
            .into_iter()
            .chain(item.left.children.iter())
            .chain(item.right.children.iter());
          for child in children {
            let child = chart.item(child);
            assert!(child.start >= start && child.end <= end);
          }
        }
      }
    }
  }

  /// Delegates everything but the futures map, which licenses nothing
  struct NoFutures<'a>(&'a TableOracle);

  impl ProbabilityOracle for NoFutures<'_> {
    fn nonterminals(&self) -> &[Symbol] {
      self.0.nonterminals()
    }

    fn tags(&self, word: Symbol) -> &[Symbol] {
      self.0.tags(word)
    }

    fn prior(&self, event: &PriorEvent) -> f64 {
      self.0.prior(event)
    }

    fn head(&self, event: &HeadEvent<'_>) -> f64 {
      self.0.head(event)
    }

    fn possible_subcats(&self, side: Side, context: &HeadContext) -> &[Subcat] {
      self.0.possible_subcats(side, context)
    }

    fn modifier(&self, event: &ModifierEvent<'_>) -> f64 {
      self.0.modifier(event)
    }

    fn stop(&self, event: &ModifierEvent<'_>) -> f64 {
      self.0.stop(event)
    }

    fn future_possible(&self, _history: &CoarseHistory, _future: &ModifierFuture) -> bool {
      false
    }
  }

  #[test]
  fn unseen_futures_are_rejected_only_when_checked() {
    let table: TableOracle = NOUN_PHRASE.parse().unwrap();
    let oracle = NoFutures(&table);
    let words = ["the", "dog"];

    let checked = decode_with(&oracle, table.symbols(), Settings::default(), &words);
    assert!(matches!(checked, Decoded::NoParse(_)));

    let unchecked = Settings {
      future_check: false,
      ..Settings::default()
    };
    let decoded = decode_with(&oracle, table.symbols(), unchecked, &words);
    assert_eq!(decoded.derivation().unwrap().score, -1.0);
  }

  #[test]
  fn commas_block_medial_splits() {
    let commas = [false, true, false, false];
    assert!(comma_blocks(&commas, 1, 2));
    // the last word may follow a comma
    assert!(!comma_blocks(&commas, 1, 3));
    assert!(!comma_blocks(&commas, 0, 2));
    assert!(!comma_blocks(&[false, true, true, false], 1, 2));
  }

  #[test]
  fn comma_constraint_is_optional() {
    let model = r#"
      tags dog NN; tags , ,; tags cat NN; tags bark VB;
      head NPB NN [] [] = 0;
      mod NPB NN right , = -1;
      mod NPB NN right NN = -1;
      mod NPB NN right VB = -1;
      stop NPB NN left = 0; stop NPB NN right = 0;
      head +TOP+ NPB [] [] = 0;
    "#;
    let words = ["dog", ",", "cat", "bark"];

    // `cat` can only attach across the comma at a medial split
    assert_eq!(bracketed(model, Settings::default(), &words), None);

    let free = Settings {
      comma_constraint: false,
      ..Settings::default()
    };
    assert_eq!(
      bracketed(model, free, &words).as_deref(),
      Some("(NPB (NN dog) (, ,) (NN cat) (VB bark))")
    );
  }

  #[test]
  fn unknown_words_use_feature_classes() {
    let model = "tags +UNKNOWN+ NN; head +TOP+ NN [] [] = 0;";
    assert_eq!(
      bracketed(model, Settings::default(), &["blorp"]).as_deref(),
      Some("(NN blorp)")
    );
    // an unseen class falls back to +UNKNOWN+
    assert_eq!(
      bracketed(model, Settings::default(), &["Blorping"]).as_deref(),
      Some("(NN Blorping)")
    );
  }

  #[test]
  fn words_without_lexicon_tags_use_unknown_tags() {
    let model = r#"
      tags +UNKNOWN+ NN;
      prior NN loneword = -1;
      head +TOP+ NN [] [] = 0;
    "#;
    for word in ["blorp", "loneword", "NN", "+TOP+"] {
      assert_eq!(
        bracketed(model, Settings::default(), &[word]),
        Some(format!("(NN {})", word)),
        "{}",
        word
      );
    }
  }

  #[test]
  fn argument_modifiers_need_a_subcat_slot() {
    // `c` is an argument C-A or a plain C; `b` has no room for C-A
    let model = r#"
      tags b B; tags c C;
      head X B [] [] = 0;
      mod X B right C-A = 0;
      mod X B right C = -1;
      stop X B left = 0; stop X B right = 0;
      head C-A C [] [] = 0;
      stop C-A C left = 0; stop C-A C right = 0;
      head +TOP+ X [] [] = 0;
    "#;
    let oracle: TableOracle = model.parse().unwrap();
    let symbols = oracle.symbols();
    let x = symbols.get("X").unwrap();
    let c_a = symbols.get("C-A").unwrap();
    let lang = TreebankPolicy::new(symbols);
    assert!(lang.is_argument(c_a));

    let sentence = Sentence::from_words(symbols, &lang, &["b", "c"]).unwrap();
    let mut decoder = Decoder::new(&oracle, &lang, Settings::default());
    let decoded = decoder.decode(sentence);
    let derivation = decoded.derivation().unwrap();
    assert_eq!(derivation.resolve(symbols).to_bracketed(), "(X (B b) (C c))");
    assert_eq!(derivation.score, -1.0);

    let chart = decoder.chart();
    for idx in chart.get(0, 1, x).unwrap().iter() {
      for child in chart.item(idx).right.children.iter() {
        assert_ne!(chart.item(child).label, c_a);
      }
    }
  }

  /// Delegates to a table and logs every modifier event it scores
  struct Recording<'a> {
    table: &'a TableOracle,
    events: RefCell<Vec<(Side, Symbol, bool)>>,
  }

  impl ProbabilityOracle for Recording<'_> {
    fn nonterminals(&self) -> &[Symbol] {
      self.table.nonterminals()
    }

    fn tags(&self, word: Symbol) -> &[Symbol] {
      self.table.tags(word)
    }

    fn prior(&self, event: &PriorEvent) -> f64 {
      self.table.prior(event)
    }

    fn head(&self, event: &HeadEvent<'_>) -> f64 {
      self.table.head(event)
    }

    fn possible_subcats(&self, side: Side, context: &HeadContext) -> &[Subcat] {
      self.table.possible_subcats(side, context)
    }

    fn modifier(&self, event: &ModifierEvent<'_>) -> f64 {
      self
        .events
        .borrow_mut()
        .push((event.side, event.mod_label, event.verb_intervening));
      self.table.modifier(event)
    }

    fn stop(&self, event: &ModifierEvent<'_>) -> f64 {
      self.table.stop(event)
    }

    fn future_possible(&self, history: &CoarseHistory, future: &ModifierFuture) -> bool {
      self.table.future_possible(history, future)
    }
  }

  #[test]
  fn verb_modifiers_set_the_intervening_flag() {
    let model = r#"
      tags dog NN; tags ran VB; tags cat NN;
      head X NN [] [] = 0;
      mod X NN right VB = -1;
      mod X NN right NN = -1;
      stop X NN left = 0; stop X NN right = 0;
      head +TOP+ X [] [] = 0;
    "#;
    let table: TableOracle = model.parse().unwrap();
    let symbols = table.symbols();
    let x = symbols.get("X").unwrap();
    let nn = symbols.get("NN").unwrap();
    let vb = symbols.get("VB").unwrap();
    let oracle = Recording {
      table: &table,
      events: RefCell::new(Vec::new()),
    };
    let lang = TreebankPolicy::new(symbols);
    let sentence = Sentence::from_words(symbols, &lang, &["dog", "ran", "cat"]).unwrap();

    let mut decoder = Decoder::new(&oracle, &lang, Settings::default());
    let decoded = decoder.decode(sentence);
    assert_eq!(
      decoded.derivation().unwrap().resolve(symbols).to_bracketed(),
      "(X (NN dog) (VB ran) (NN cat))"
    );

    // `dog ran` only exists with `ran` attached on the right
    let chart = decoder.chart();
    for idx in chart.get(0, 1, x).unwrap().iter() {
      let item = chart.item(idx);
      assert_eq!(item.right.children.len(), 1);
      assert!(item.verb(Side::Right));
      assert!(!item.verb(Side::Left));
    }

    let events = oracle.events.borrow();
    let verb_flags = |label: Symbol| {
      events
        .iter()
        .filter(|&&(side, mod_label, _)| side == Side::Right && mod_label == label)
        .map(|&(_, _, verb)| verb)
        .collect::<Vec<_>>()
    };
    // the flag a modifier is scored with predates its own attachment
    assert_eq!(verb_flags(vb), vec![false]);
    assert_eq!(verb_flags(nn), vec![true]);
  }

  #[test]
  fn supplied_tags_restrict_candidates() {
    let model = r#"
      tags dog NN VB;
      head +TOP+ NN [] [] = 0;
      head +TOP+ VB [] [] = -1;
    "#;
    assert_eq!(bracketed(model, Settings::default(), &["dog"]).as_deref(), Some("(NN dog)"));
    assert_eq!(bracketed(model, Settings::default(), &["dog/VB"]).as_deref(), Some("(VB dog)"));
  }

  #[test]
  fn preterminal_trees_round_trip() {
    let model = r#"
      tags dog NN; tags ran VBD; tags , ,;
      head +TOP+ NN [] [] = 0;
      head +TOP+ VBD [] [] = -2;
      head +TOP+ , [] [] = -3;
    "#;
    let oracle: TableOracle = model.parse().unwrap();
    let symbols = oracle.symbols();
    for (word, tag) in [("dog", "NN"), ("ran", "VBD"), (",", ",")] {
      let decoded = decode_with(&oracle, symbols, Settings::default(), &[word]);
      let tree = decoded.derivation().unwrap().resolve(symbols);
      let (constituent, children) = tree.get_branch().unwrap();
      assert_eq!(constituent.value, tag);
      assert_eq!(children.len(), 1);
      assert_eq!(children[0].get_leaf().unwrap().value, word);
    }
  }

  #[test]
  fn over_long_and_empty_sentences_are_skipped() {
    let settings = Settings {
      max_sentence_length: 1,
      ..Settings::default()
    };
    assert_eq!(bracketed(NOUN_PHRASE, settings, &["the", "dog"]), None);
    assert_eq!(bracketed(NOUN_PHRASE, Settings::default(), &[]), None);
  }

  #[test]
  fn decoders_are_reusable() {
    let oracle: TableOracle = NOUN_PHRASE.parse().unwrap();
    let symbols = oracle.symbols();
    let lang = TreebankPolicy::new(symbols);
    let mut decoder = Decoder::new(&oracle, &lang, Settings::default());

    let two = Sentence::from_words(symbols, &lang, &["the", "dog"]).unwrap();
    let one = Sentence::from_words(symbols, &lang, &["dog"]).unwrap();
    assert!(decoder.decode(two.clone()).derivation().is_some());
    assert_eq!(decoder.last_top_score(), Some(-1.0));
    assert!(decoder.decode(one).derivation().is_some());
    assert_eq!(decoder.chart().len(), 1);
    assert_eq!(decoder.decode(two).derivation().unwrap().score, -1.0);
  }

  #[test]
  fn decoders_on_different_threads_share_an_oracle() {
    let oracle: TableOracle = ORDERED.parse().unwrap();
    let symbols = oracle.symbols();
    let lang = TreebankPolicy::new(symbols);

    let results = std::thread::scope(|scope| {
      let handles = (0..4)
        .map(|_| {
          scope.spawn(|| {
            let sentence = Sentence::from_words(symbols, &lang, &["a", "b", "c"]).unwrap();
            let mut decoder = Decoder::new(&oracle, &lang, Settings::default());
            decoder
              .decode(sentence)
              .derivation()
              .map(|d| d.resolve(symbols).to_bracketed())
          })
        })
        .collect::<Vec<_>>();
      handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect::<Vec<_>>()
    });

    for result in results {
      assert_eq!(result.as_deref(), Some("(X (A a) (B b) (C-A (C c)))"));
    }
  }
}
