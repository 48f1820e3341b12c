//! Fixed symbols and a fixed language policy for unit tests that don't need a
//! symbol table.

use crate::policy::LanguagePolicy;
use crate::symbols::Symbol;

pub const NN: Symbol = Symbol(10);
pub const VB: Symbol = Symbol(11);
pub const VP: Symbol = Symbol(12);
pub const NP: Symbol = Symbol(13);
pub const NP_A: Symbol = Symbol(14);
pub const NPB: Symbol = Symbol(15);
pub const PP: Symbol = Symbol(16);
pub const S: Symbol = Symbol(17);
pub const COMMA: Symbol = Symbol(18);
pub const WORD: Symbol = Symbol(30);
pub const WORD2: Symbol = Symbol(31);

pub struct FixturePolicy;

impl FixturePolicy {
  pub fn new() -> Self {
    Self
  }
}

impl LanguagePolicy for FixturePolicy {
  fn is_base_np(&self, label: Symbol) -> bool {
    label == NPB
  }

  fn is_verb_tag(&self, tag: Symbol) -> bool {
    tag == VB
  }

  fn is_comma(&self, word: Symbol) -> bool {
    word == COMMA
  }

  fn is_argument(&self, label: Symbol) -> bool {
    label == NP_A
  }

  fn canonical_mod_label(&self, label: Symbol) -> Symbol {
    if label == NP_A { NP } else { label }
  }

  fn word_features(&self, _word: &str) -> String {
    "+UNKNOWN+".to_string()
  }
}
