use std::fs;
use std::path::Path;
use std::str::FromStr;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::item::Side;
use crate::oracle::{
  CoarseHistory, HeadContext, HeadEvent, ModifierEvent, ModifierFuture, PriorEvent,
  ProbabilityOracle, LOG_OF_ZERO,
};
use crate::parse_model::{parse_model, ModelEntry};
use crate::subcat::{Subcat, SubcatKind};
use crate::symbols::{Symbol, SymbolTable};
use crate::Err;

type HeadKey = (Symbol, Symbol, Subcat, Subcat);
type ModKey = (Symbol, Symbol, Side, Symbol);
type StopKey = (Symbol, Symbol, Side);

/// An oracle backed by explicit probability tables.
///
/// Events condition only on labels: head events on (parent, head label,
/// subcats), modifier events on (parent, head label, side, modifier label),
/// stop events on (parent, head label, side). Head, modifier and stop events
/// missing from the tables are impossible; missing priors are log 1.
#[derive(Debug, Clone)]
pub struct TableOracle {
  symbols: SymbolTable,
  nonterminals: Vec<Symbol>,
  tags: FxHashMap<Symbol, Vec<Symbol>>,
  priors: FxHashMap<(Symbol, Option<Symbol>), f64>,
  heads: FxHashMap<HeadKey, f64>,
  subcats: FxHashMap<(Side, Symbol, Symbol), Vec<Subcat>>,
  mods: FxHashMap<ModKey, f64>,
  stops: FxHashMap<StopKey, f64>,
  futures: FxHashMap<CoarseHistory, FxHashSet<Symbol>>,
}

impl TableOracle {
  /// Builds an oracle from parsed model statements, interning every name
  pub fn from_entries(entries: Vec<ModelEntry>, kind: SubcatKind) -> Self {
    let mut symbols = SymbolTable::new();
    let mut oracle = Self {
      symbols: SymbolTable::new(),
      nonterminals: Vec::new(),
      tags: FxHashMap::default(),
      priors: FxHashMap::default(),
      heads: FxHashMap::default(),
      subcats: FxHashMap::default(),
      mods: FxHashMap::default(),
      stops: FxHashMap::default(),
      futures: FxHashMap::default(),
    };
    let mut nonterminals = FxHashSet::default();

    for entry in entries {
      match entry {
        ModelEntry::Tags { word, tags } => {
          let word = symbols.intern(&word);
          let known = oracle.tags.entry(word).or_default();
          for tag in tags {
            let tag = symbols.intern(&tag);
            if !known.contains(&tag) {
              known.push(tag);
            }
          }
        }
        ModelEntry::Prior {
          label,
          word,
          log_prob,
        } => {
          let label = symbols.intern(&label);
          let word = word.map(|w| symbols.intern(&w));
          oracle.priors.insert((label, word), log_prob);
        }
        ModelEntry::Head {
          parent,
          head_label,
          left,
          right,
          log_prob,
        } => {
          let parent = symbols.intern(&parent);
          let head_label = symbols.intern(&head_label);
          let mut subcat = |names: Vec<String>| {
            Subcat::with_requirements(kind, names.iter().map(|n| symbols.intern(n)))
          };
          let left = subcat(left);
          let right = subcat(right);

          if parent != Symbol::TOP {
            nonterminals.insert(parent);
          }
          for (side, frame) in [(Side::Left, &left), (Side::Right, &right)] {
            let frames = oracle.subcats.entry((side, parent, head_label)).or_default();
            if !frames.contains(frame) {
              frames.push(frame.clone());
            }
          }
          oracle.heads.insert((parent, head_label, left, right), log_prob);
        }
        ModelEntry::Mod {
          parent,
          head_label,
          side,
          mod_label,
          log_prob,
        } => {
          let parent = symbols.intern(&parent);
          let head_label = symbols.intern(&head_label);
          let mod_label = symbols.intern(&mod_label);
          oracle
            .futures
            .entry(CoarseHistory {
              side,
              parent,
              head_label,
            })
            .or_default()
            .insert(mod_label);
          oracle
            .mods
            .insert((parent, head_label, side, mod_label), log_prob);
        }
        ModelEntry::Stop {
          parent,
          head_label,
          side,
          log_prob,
        } => {
          let parent = symbols.intern(&parent);
          let head_label = symbols.intern(&head_label);
          oracle.stops.insert((parent, head_label, side), log_prob);
        }
      }
    }

    let mut nonterminals = nonterminals.into_iter().collect::<Vec<_>>();
    nonterminals.sort();
    oracle.nonterminals = nonterminals;
    oracle.symbols = symbols;
    oracle
  }

  pub fn parse(src: &str, kind: SubcatKind) -> Result<Self, Err> {
    Ok(Self::from_entries(parse_model(src)?, kind))
  }

  pub fn read_from_file<P: AsRef<Path>>(path: P, kind: SubcatKind) -> Result<Self, Err> {
    let src = fs::read_to_string(path.as_ref())
      .map_err(|e| format!("reading {}: {}", path.as_ref().display(), e))?;
    Self::parse(&src, kind)
  }

  /// The vocabulary every symbol this oracle hands out belongs to
  pub fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  fn lookup<K>(table: &FxHashMap<K, f64>, key: &K) -> f64
  where
    K: std::hash::Hash + Eq,
  {
    table.get(key).copied().unwrap_or(LOG_OF_ZERO)
  }
}

impl FromStr for TableOracle {
  type Err = Err;

  /// Parses a model with bag subcat frames
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s, SubcatKind::Bag)
  }
}

impl ProbabilityOracle for TableOracle {
  fn nonterminals(&self) -> &[Symbol] {
    &self.nonterminals
  }

  fn tags(&self, word: Symbol) -> &[Symbol] {
    self.tags.get(&word).map(Vec::as_slice).unwrap_or(&[])
  }

  fn prior(&self, event: &PriorEvent) -> f64 {
    self
      .priors
      .get(&(event.label, Some(event.word.word)))
      .or_else(|| self.priors.get(&(event.label, None)))
      .copied()
      .unwrap_or(0.0)
  }

  fn head(&self, event: &HeadEvent<'_>) -> f64 {
    let key = (
      event.context.parent,
      event.context.head_label,
      event.left_subcat.clone(),
      event.right_subcat.clone(),
    );
    Self::lookup(&self.heads, &key)
  }

  fn possible_subcats(&self, side: Side, context: &HeadContext) -> &[Subcat] {
    self
      .subcats
      .get(&(side, context.parent, context.head_label))
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  fn modifier(&self, event: &ModifierEvent<'_>) -> f64 {
    let key = (event.parent, event.head_label, event.side, event.mod_label);
    Self::lookup(&self.mods, &key)
  }

  fn stop(&self, event: &ModifierEvent<'_>) -> f64 {
    let key = (event.parent, event.head_label, event.side);
    Self::lookup(&self.stops, &key)
  }

  fn future_possible(&self, history: &CoarseHistory, future: &ModifierFuture) -> bool {
    self
      .futures
      .get(history)
      .is_some_and(|labels| labels.contains(&future.label))
  }
}
