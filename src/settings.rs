use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::equivalence::EquivalencePolicy;
use crate::subcat::SubcatKind;
use crate::Err;

/// Knobs the decoder consumes but does not interpret beyond using them
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  /// Beam margin in log10 units, relative to the best item of a label group
  pub prune_factor: f64,
  /// Most items kept per (cell, label) group
  pub max_cell_size: usize,
  /// Number of previous modifier labels conditioned on (k)
  pub history_window: usize,
  /// Number of previous modifier head words kept for base-NP equivalence
  pub prev_word_window: usize,
  /// Reject splits that strand a medial comma
  pub comma_constraint: bool,
  /// Reject modifier events whose future was never seen after their history
  pub future_check: bool,
  pub equivalence: EquivalencePolicy,
  pub subcat: SubcatKind,
  /// Longer sentences are returned unparsed
  pub max_sentence_length: usize,
  /// Base NPs never count as containing a verb
  pub base_np_verb_barrier: bool,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      prune_factor: 4.0,
      max_cell_size: 100,
      history_window: 2,
      prev_word_window: 1,
      comma_constraint: true,
      future_check: true,
      equivalence: EquivalencePolicy::Default,
      subcat: SubcatKind::Bag,
      max_sentence_length: 100,
      base_np_verb_barrier: true,
    }
  }
}

impl Settings {
  /// The beam margin in natural-log units, comparable to item scores
  pub fn beam_width(&self) -> f64 {
    self.prune_factor * std::f64::consts::LN_10
  }

  pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Err> {
    let src = fs::read_to_string(path.as_ref())
      .map_err(|e| format!("reading {}: {}", path.as_ref().display(), e))?;
    src.parse()
  }

  fn set(&mut self, key: &str, value: &str) -> Result<(), Err> {
    match key {
      "prune_factor" => self.prune_factor = parse_value(key, value)?,
      "max_cell_size" => self.max_cell_size = parse_value(key, value)?,
      "history_window" => self.history_window = parse_value(key, value)?,
      "prev_word_window" => self.prev_word_window = parse_value(key, value)?,
      "comma_constraint" => self.comma_constraint = parse_value(key, value)?,
      "future_check" => self.future_check = parse_value(key, value)?,
      "equivalence" => self.equivalence = value.parse()?,
      "subcat" => {
        self.subcat = match value {
          "bag" => SubcatKind::Bag,
          "list" => SubcatKind::List,
          _ => return Err(format!("subcat: expected bag or list, got {}", value).into()),
        }
      }
      "max_sentence_length" => self.max_sentence_length = parse_value(key, value)?,
      "base_np_verb_barrier" => self.base_np_verb_barrier = parse_value(key, value)?,
      _ => return Err(format!("unknown setting {}", key).into()),
    }
    Ok(())
  }

  fn validate(&self) -> Result<(), Err> {
    if !(self.prune_factor >= 0.0) {
      return Err(format!("prune_factor must be non-negative, got {}", self.prune_factor).into());
    }
    if self.max_cell_size == 0 {
      return Err("max_cell_size must be at least 1".into());
    }
    Ok(())
  }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, Err>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  value
    .parse()
    .map_err(|e| format!("{}: bad value {:?}: {}", key, value, e).into())
}

/// Parses `key = value` lines over the defaults. `#` starts a comment.
impl FromStr for Settings {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    regex_static!(ASSIGNMENT, r"^\s*([a-z_]+)\s*=\s*(\S+)\s*$");
    regex_static!(BLANK, r"^\s*$");

    let mut settings = Self::default();
    for (lineno, line) in s.lines().enumerate() {
      let line = line.split('#').next().unwrap_or("");
      if BLANK.is_match(line) {
        continue;
      }
      let caps = ASSIGNMENT
        .captures(line)
        .ok_or_else(|| format!("line {}: expected key = value, got {:?}", lineno + 1, line))?;
      settings
        .set(&caps[1], &caps[2])
        .map_err(|e| format!("line {}: {}", lineno + 1, e))?;
    }

    settings.validate()?;
    Ok(settings)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_is_defaults() {
    assert_eq!("".parse::<Settings>().unwrap(), Settings::default());
    assert_eq!("# nothing\n\n".parse::<Settings>().unwrap(), Settings::default());
  }

  #[test]
  fn overrides_apply() {
    let settings: Settings = r#"
      prune_factor = 2.5   # tighter beam
      max_cell_size = 7
      history_window = 1
      comma_constraint = false
      equivalence = base-np
      subcat = list
    "#
    .parse()
    .unwrap();

    assert_eq!(settings.prune_factor, 2.5);
    assert_eq!(settings.max_cell_size, 7);
    assert_eq!(settings.history_window, 1);
    assert!(!settings.comma_constraint);
    assert!(settings.future_check);
    assert_eq!(settings.equivalence, EquivalencePolicy::BaseNpAware);
    assert_eq!(settings.subcat, SubcatKind::List);
  }

  #[test]
  fn beam_width_is_natural_log() {
    let settings = Settings {
      prune_factor: 1.0,
      ..Settings::default()
    };
    assert!((settings.beam_width() - 10f64.ln()).abs() < 1e-12);
  }

  #[test]
  fn bad_input_is_an_error() {
    assert!("nonsense".parse::<Settings>().is_err());
    assert!("mystery_key = 3".parse::<Settings>().is_err());
    assert!("max_cell_size = lots".parse::<Settings>().is_err());
    assert!("max_cell_size = 0".parse::<Settings>().is_err());
    assert!("prune_factor = -1".parse::<Settings>().is_err());
    assert!("subcat = tree".parse::<Settings>().is_err());
  }
}
