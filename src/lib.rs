#[macro_use]
extern crate lazy_static;

#[macro_use]
pub mod utils;

pub mod chart;
pub mod decoder;
pub mod equivalence;
pub mod history;
pub mod item;
pub mod oracle;
pub mod parse_model;
pub mod policy;
pub mod settings;
pub mod subcat;
pub mod symbols;
pub mod syntree;
pub mod table;
pub mod word;

#[cfg(test)]
mod testing;

pub use crate::decoder::{Decoded, Decoder, Derivation};
pub use crate::oracle::{ProbabilityOracle, LOG_OF_ZERO};
pub use crate::policy::{LanguagePolicy, TreebankPolicy};
pub use crate::settings::Settings;
pub use crate::table::TableOracle;
pub use crate::utils::Err;
use crate::word::Sentence;

impl TableOracle {
  /// Decodes raw `word` or `word/TAG` strings with treebank conventions.
  /// Builds a fresh decoder, so prefer `Decoder` for many sentences.
  pub fn decode_words(&self, settings: Settings, words: &[&str]) -> Result<Decoded, Err> {
    let lang = TreebankPolicy::new(self.symbols());
    let sentence = Sentence::from_words(self.symbols(), &lang, words)?;
    Ok(Decoder::new(self, &lang, settings).decode(sentence))
  }
}

#[test]
fn test_subject_verb_object() {
  let model: TableOracle = r#"
    tags she PRP; tags saw VBD; tags him PRP;
    head NPB PRP [] [] = 0;
    stop NPB PRP left = 0; stop NPB PRP right = 0;
    head NP-A NPB [] [] = -0.1;
    stop NP-A NPB left = 0; stop NP-A NPB right = 0;

    head VP VBD [] [NP-A] = -0.5;
    head VP VBD [] [] = -0.7;
    mod VP VBD right NP-A = -0.2;
    stop VP VBD left = 0; stop VP VBD right = -0.1;

    head S VP [NP-A] [] = -0.3;
    mod S VP left NP-A = -0.2;
    stop S VP left = 0; stop S VP right = 0;

    head +TOP+ S [] [] = 0;
  "#
  .parse()
  .unwrap();

  let bracketed = |words: &[&str]| {
    model
      .decode_words(Settings::default(), words)
      .unwrap()
      .derivation()
      .map(|d| d.resolve(model.symbols()).to_bracketed())
  };

  assert_eq!(
    bracketed(&["she", "saw", "him"]).as_deref(),
    Some("(S (NP-A (NPB (PRP she))) (VP (VBD saw) (NP-A (NPB (PRP him)))))")
  );
  // the subject is required, so a bare verb phrase is no sentence
  assert_eq!(bracketed(&["saw", "him"]), None);
  assert!(model.decode_words(Settings::default(), &["saw/NN"]).is_err());
}
