use std::fmt;

use crate::policy::LanguagePolicy;
use crate::symbols::{Symbol, SymbolTable};
use crate::Err;

/// A lexical head: a word and its part of speech
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TaggedWord {
  pub word: Symbol,
  pub tag: Symbol,
}

impl TaggedWord {
  pub fn new(word: Symbol, tag: Symbol) -> Self {
    Self { word, tag }
  }
}

impl fmt::Display for TaggedWord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.word, self.tag)
  }
}

/// One position of a preprocessed sentence
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
  /// An in-vocabulary word. Empty `tags` means "ask the oracle".
  Known { word: Symbol, tags: Vec<Symbol> },
  /// An out-of-vocabulary word, replaced by its feature class
  Unknown {
    text: String,
    features: Symbol,
    tags: Vec<Symbol>,
  },
}

impl Token {
  /// The symbol the model sees in place of this word
  pub fn word(&self) -> Symbol {
    match self {
      Self::Known { word, .. } => *word,
      Self::Unknown { features, .. } => *features,
    }
  }

  /// Tags supplied with the input, if any
  pub fn supplied_tags(&self) -> &[Symbol] {
    match self {
      Self::Known { tags, .. } => tags,
      Self::Unknown { tags, .. } => tags,
    }
  }

  pub fn is_unknown(&self) -> bool {
    matches!(self, Self::Unknown { .. })
  }
}

/// A tokenized sentence. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
  tokens: Vec<Token>,
}

impl Sentence {
  pub fn new(tokens: Vec<Token>) -> Self {
    Self { tokens }
  }

  /// Maps raw `word` or `word/TAG` strings against a closed vocabulary.
  /// Words the vocabulary doesn't know become `Token::Unknown` with the
  /// policy's feature class, or `+UNKNOWN+` if that class was never seen.
  pub fn from_words<P>(symbols: &SymbolTable, policy: &P, words: &[&str]) -> Result<Self, Err>
  where
    P: LanguagePolicy + ?Sized,
  {
    let mut tokens = Vec::with_capacity(words.len());
    for raw in words {
      let (text, tag) = split_tag(raw);
      if text.is_empty() {
        return Err(format!("empty word in {:?}", raw).into());
      }

      let tags = match tag {
        Some(tag) => match symbols.get(tag) {
          Some(sym) => vec![sym],
          None => return Err(format!("unknown tag {} on word {}", tag, text).into()),
        },
        None => Vec::new(),
      };

      let token = match symbols.get(text) {
        Some(word) => Token::Known { word, tags },
        None => {
          let class = policy.word_features(text);
          Token::Unknown {
            text: text.to_string(),
            features: symbols.get(&class).unwrap_or(Symbol::UNKNOWN),
            tags,
          }
        }
      };
      tokens.push(token);
    }

    Ok(Self { tokens })
  }

  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  pub fn tokens(&self) -> &[Token] {
    &self.tokens
  }

  pub fn get(&self, idx: usize) -> Option<&Token> {
    self.tokens.get(idx)
  }
}

/// Splits `word/TAG` on the last slash; a bare slash is a word
fn split_tag(raw: &str) -> (&str, Option<&str>) {
  match raw.rfind('/') {
    Some(idx) if idx > 0 && idx + 1 < raw.len() => (&raw[..idx], Some(&raw[idx + 1..])),
    _ => (raw, None),
  }
}
