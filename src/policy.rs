//! Grammar- and treebank-specific predicates the decoder consults but does not
//! own.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::symbols::{Symbol, SymbolTable};
use crate::word::TaggedWord;

/// Read-only language policy. Shared between concurrent decoders, so
/// implementations must not rely on interior mutability.
pub trait LanguagePolicy {
  fn is_base_np(&self, label: Symbol) -> bool;

  fn is_verb_tag(&self, tag: Symbol) -> bool;

  fn is_comma(&self, word: Symbol) -> bool;

  /// Whether a modifier with this label must discharge a subcat requirement
  fn is_argument(&self, label: Symbol) -> bool;

  /// Maps a modifier label to the class it is conditioned on
  fn canonical_mod_label(&self, label: Symbol) -> Symbol {
    label
  }

  /// Feature class standing in for an out-of-vocabulary word
  fn word_features(&self, word: &str) -> String;

  fn start_label(&self) -> Symbol {
    Symbol::START
  }

  fn stop_label(&self) -> Symbol {
    Symbol::STOP
  }

  fn top_label(&self) -> Symbol {
    Symbol::TOP
  }

  fn start_word(&self) -> TaggedWord {
    TaggedWord::new(Symbol::START, Symbol::START)
  }

  fn stop_word(&self) -> TaggedWord {
    TaggedWord::new(Symbol::STOP, Symbol::STOP)
  }
}

/// Penn Treebank conventions, precomputed over a closed symbol table
#[derive(Debug, Clone)]
pub struct TreebankPolicy {
  base_np: Option<Symbol>,
  verb_tags: FxHashSet<Symbol>,
  commas: FxHashSet<Symbol>,
  arguments: FxHashSet<Symbol>,
  canonical: FxHashMap<Symbol, Symbol>,
}

impl TreebankPolicy {
  pub fn new(symbols: &SymbolTable) -> Self {
    regex_static!(VERB_TAG, r"^(VB[DGNPZ]?|MD)$");
    regex_static!(ARGUMENT, r"^(.+)-A$");

    let mut verb_tags = FxHashSet::default();
    let mut commas = FxHashSet::default();
    let mut arguments = FxHashSet::default();
    let mut canonical = FxHashMap::default();

    for (sym, name) in symbols.iter() {
      if VERB_TAG.is_match(name) {
        verb_tags.insert(sym);
      }
      if name == "," || name == ":" {
        commas.insert(sym);
      }
      if let Some(caps) = ARGUMENT.captures(name) {
        arguments.insert(sym);
        if let Some(bare) = symbols.get(&caps[1]) {
          canonical.insert(sym, bare);
        }
      }
    }

    Self {
      base_np: symbols.get("NPB"),
      verb_tags,
      commas,
      arguments,
      canonical,
    }
  }
}

impl LanguagePolicy for TreebankPolicy {
  fn is_base_np(&self, label: Symbol) -> bool {
    self.base_np == Some(label)
  }

  fn is_verb_tag(&self, tag: Symbol) -> bool {
    self.verb_tags.contains(&tag)
  }

  fn is_comma(&self, word: Symbol) -> bool {
    self.commas.contains(&word)
  }

  fn is_argument(&self, label: Symbol) -> bool {
    self.arguments.contains(&label)
  }

  fn canonical_mod_label(&self, label: Symbol) -> Symbol {
    self.canonical.get(&label).copied().unwrap_or(label)
  }

  /// `+UNKNOWN+` followed by capitalisation, digit and hyphen markers and a
  /// suffix class, e.g. `+UNKNOWN+cd-ing`
  fn word_features(&self, word: &str) -> String {
    regex_static!(SUFFIX, r"(ing|ed|ly|tion|s)$");

    let mut class = String::from("+UNKNOWN+");
    let mut chars = word.chars();
    if chars.next().is_some_and(char::is_uppercase) {
      if chars.all(|c| !c.is_lowercase()) {
        class.push('C');
      } else {
        class.push('c');
      }
    }
    if word.chars().any(|c| c.is_ascii_digit()) {
      class.push('d');
    }
    if word.contains('-') {
      class.push('h');
    }
    if let Some(m) = SUFFIX.find(&word.to_lowercase()) {
      class.push('-');
      class.push_str(m.as_str());
    }
    class
  }
}
