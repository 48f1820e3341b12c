//! Simple recursive-descent parsing of table model files

use regex::Regex;

use crate::item::Side;
use crate::Err;

/// One statement of a model file, with names still unresolved
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEntry {
  /// `tags word TAG...;`
  Tags { word: String, tags: Vec<String> },
  /// `prior LABEL word = lp;` with `*` for any word
  Prior {
    label: String,
    word: Option<String>,
    log_prob: f64,
  },
  /// `head PARENT HEADLABEL [left...] [right...] = lp;`
  Head {
    parent: String,
    head_label: String,
    left: Vec<String>,
    right: Vec<String>,
    log_prob: f64,
  },
  /// `mod PARENT HEADLABEL side MODLABEL = lp;`
  Mod {
    parent: String,
    head_label: String,
    side: Side,
    mod_label: String,
    log_prob: f64,
  },
  /// `stop PARENT HEADLABEL side = lp;`
  Stop {
    parent: String,
    head_label: String,
    side: Side,
    log_prob: f64,
  },
}

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// Try to consume a regex, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  if let Some(m) = re.find(s) {
    if m.start() > 0 {
      return (None, s);
    }
    let (_, rest) = s.split_at(m.end());
    (Some(m.as_str()), rest)
  } else {
    (None, s)
  }
}

/// Try to consume a regex, failing if it doesn't match
fn needed_re<'a>(re: &'static Regex, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", re, excerpt(s)).into())
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Try to consume a char, failing if it doesn't match
fn needed_char(c: char, s: &str) -> ParseResult<'_, char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", c, excerpt(s)).into())
  }
}

fn excerpt(s: &str) -> &str {
  let end = s.char_indices().nth(30).map(|(i, _)| i).unwrap_or(s.len());
  &s[..end]
}

/// Skips whitespace and // comments
fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_COMMENT, r"^(\s+|//[^\n]*)+");
  optional_re(&*WHITESPACE_OR_COMMENT, s).1
}

/// A label, tag, or word: anything up to whitespace or punctuation the
/// format reserves
fn parse_name(s: &str) -> ParseResult<'_, &str> {
  regex_static!(NAME, r"^[^\s\[\];=]+");
  needed_re(&*NAME, s).map_err(|err| format!("name: {}", err).into())
}

fn parse_log_prob(s: &str) -> ParseResult<'_, f64> {
  regex_static!(NUMBER, r"^-?(inf|[0-9]+(\.[0-9]*)?([eE][-+]?[0-9]+)?)");
  let (_, s) = needed_char('=', s)?;
  let s = skip_whitespace(s);
  let (num, s) = needed_re(&*NUMBER, s).map_err(|e| -> Err { format!("log prob: {}", e).into() })?;
  let value = num
    .parse::<f64>()
    .map_err(|e| -> Err { format!("log prob {}: {}", num, e).into() })?;
  if value > 0.0 {
    return Err(format!("log prob {} is positive", num).into());
  }
  Ok((value, s))
}

fn parse_side(s: &str) -> ParseResult<'_, Side> {
  let (name, rest) = parse_name(s)?;
  match name {
    "left" => Ok((Side::Left, rest)),
    "right" => Ok((Side::Right, rest)),
    _ => Err(format!("expected left or right, got {}", name).into()),
  }
}

/// `[NP-A S-A]`
fn parse_subcat(s: &str) -> ParseResult<'_, Vec<String>> {
  let mut names = Vec::new();
  let mut rem = needed_char('[', s)?.1;
  loop {
    rem = skip_whitespace(rem);
    if let (Some(_), rest) = optional_char(']', rem) {
      return Ok((names, rest));
    }
    let (name, rest) = parse_name(rem).map_err(|e| -> Err { format!("subcat: {}", e).into() })?;
    names.push(name.to_string());
    rem = rest;
  }
}

/// Parses `n` whitespace-separated names
fn parse_names(s: &str, n: usize) -> ParseResult<'_, Vec<String>> {
  let mut names = Vec::with_capacity(n);
  let mut rem = s;
  for _ in 0..n {
    rem = skip_whitespace(rem);
    let (name, rest) = parse_name(rem)?;
    names.push(name.to_string());
    rem = rest;
  }
  Ok((names, skip_whitespace(rem)))
}

fn parse_entry(s: &str) -> ParseResult<'_, ModelEntry> {
  let (keyword, s) = parse_name(s)?;
  let s = skip_whitespace(s);

  let (entry, s) = match keyword {
    "tags" => {
      let (word, mut rem) = parse_names(s, 1)?;
      let mut tags = Vec::new();
      while !rem.starts_with(';') {
        let (tag, rest) = parse_name(rem)?;
        tags.push(tag.to_string());
        rem = skip_whitespace(rest);
      }
      if tags.is_empty() {
        return Err(format!("tags for {} lists no tags", word[0]).into());
      }
      let word = word.into_iter().next().expect("parsed one name");
      (ModelEntry::Tags { word, tags }, rem)
    }
    "prior" => {
      let (names, s) = parse_names(s, 2)?;
      let (log_prob, s) = parse_log_prob(s)?;
      let [label, word]: [String; 2] = names.try_into().expect("parsed two names");
      let word = if word == "*" { None } else { Some(word) };
      (
        ModelEntry::Prior {
          label,
          word,
          log_prob,
        },
        s,
      )
    }
    "head" => {
      let (names, s) = parse_names(s, 2)?;
      let (left, s) = parse_subcat(s)?;
      let s = skip_whitespace(s);
      let (right, s) = parse_subcat(s)?;
      let s = skip_whitespace(s);
      let (log_prob, s) = parse_log_prob(s)?;
      let [parent, head_label]: [String; 2] = names.try_into().expect("parsed two names");
      (
        ModelEntry::Head {
          parent,
          head_label,
          left,
          right,
          log_prob,
        },
        s,
      )
    }
    "mod" => {
      let (names, s) = parse_names(s, 2)?;
      let (side, s) = parse_side(s)?;
      let (mod_label, s) = parse_names(s, 1)?;
      let (log_prob, s) = parse_log_prob(s)?;
      let [parent, head_label]: [String; 2] = names.try_into().expect("parsed two names");
      (
        ModelEntry::Mod {
          parent,
          head_label,
          side,
          mod_label: mod_label.into_iter().next().expect("parsed one name"),
          log_prob,
        },
        s,
      )
    }
    "stop" => {
      let (names, s) = parse_names(s, 2)?;
      let (side, s) = parse_side(s)?;
      let s = skip_whitespace(s);
      let (log_prob, s) = parse_log_prob(s)?;
      let [parent, head_label]: [String; 2] = names.try_into().expect("parsed two names");
      (
        ModelEntry::Stop {
          parent,
          head_label,
          side,
          log_prob,
        },
        s,
      )
    }
    _ => return Err(format!("unknown statement {}", keyword).into()),
  };

  let s = skip_whitespace(s);
  let (_, s) = needed_char(';', s).map_err(|e| -> Err { format!("{}: {}", keyword, e).into() })?;
  Ok((entry, s))
}

/// Parses a whole model file
pub fn parse_model(s: &str) -> Result<Vec<ModelEntry>, Err> {
  let mut entries = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok(entries);
    }
    let (entry, s) = parse_entry(rem)?;
    entries.push(entry);
    rem = s;
  }
}
