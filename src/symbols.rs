use std::fmt;

use rustc_hash::FxHashMap;

/// Interned label, tag, or word. Only meaningful relative to the `SymbolTable`
/// that produced it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(pub u32);

impl Symbol {
  /// Fills unused modifier-history slots
  pub const START: Symbol = Symbol(0);
  /// Modifier label used for stop events
  pub const STOP: Symbol = Symbol(1);
  /// Label of the distinguished sentence root
  pub const TOP: Symbol = Symbol(2);
  /// Word feature class of last resort for out-of-vocabulary words
  pub const UNKNOWN: Symbol = Symbol(3);
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

const SENTINELS: [&str; 4] = ["+START+", "+STOP+", "+TOP+", "+UNKNOWN+"];

/// Two-way map between strings and symbols. The sentinels are always present
/// with the ids given by the `Symbol` constants.
#[derive(Debug, Clone)]
pub struct SymbolTable {
  str_to_sym: FxHashMap<String, Symbol>,
  sym_to_str: Vec<String>,
}

impl Default for SymbolTable {
  fn default() -> Self {
    Self::new()
  }
}

impl SymbolTable {
  pub fn new() -> Self {
    let mut table = Self {
      str_to_sym: FxHashMap::default(),
      sym_to_str: Vec::new(),
    };
    for s in SENTINELS {
      table.intern(s);
    }
    table
  }

  pub fn intern(&mut self, s: &str) -> Symbol {
    if let Some(&sym) = self.str_to_sym.get(s) {
      return sym;
    }
    let sym = Symbol(u32::try_from(self.sym_to_str.len()).expect("symbol table overflowed u32"));
    self.sym_to_str.push(s.to_string());
    self.str_to_sym.insert(s.to_string(), sym);
    sym
  }

  pub fn get(&self, s: &str) -> Option<Symbol> {
    self.str_to_sym.get(s).copied()
  }

  /// Panics on a symbol from another table
  pub fn name(&self, sym: Symbol) -> &str {
    self
      .sym_to_str
      .get(sym.0 as usize)
      .expect("symbol not from this table")
  }

  pub fn len(&self) -> usize {
    self.sym_to_str.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> + '_ {
    self
      .sym_to_str
      .iter()
      .enumerate()
      .map(|(idx, s)| (Symbol(idx as u32), s.as_str()))
  }
}
