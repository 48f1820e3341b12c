use std::fmt;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::equivalence::{EquivalencePolicy, ItemKey};
use crate::item::{Item, ItemArena, ItemIdx};
use crate::policy::LanguagePolicy;
use crate::settings::Settings;
use crate::symbols::{Symbol, SymbolTable};

#[derive(Debug, Clone)]
struct Entry {
  idx: ItemIdx,
  score: f64,
  key: ItemKey,
}

/// The items of one label in one cell, best score first. Holds at most one
/// item per equivalence key.
#[derive(Debug, Default)]
pub struct LabelGroup {
  entries: Vec<Entry>,
  by_key: FxHashMap<ItemKey, ItemIdx>,
}

impl LabelGroup {
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn best(&self) -> Option<ItemIdx> {
    self.entries.first().map(|e| e.idx)
  }

  pub fn best_score(&self) -> Option<f64> {
    self.entries.first().map(|e| e.score)
  }

  pub fn worst_score(&self) -> Option<f64> {
    self.entries.last().map(|e| e.score)
  }

  /// Items in descending score order
  pub fn iter(&self) -> impl Iterator<Item = ItemIdx> + '_ {
    self.entries.iter().map(|e| e.idx)
  }

  fn insert(&mut self, idx: ItemIdx, score: f64, key: ItemKey) {
    // equal scores keep insertion order
    let pos = self.entries.partition_point(|e| e.score >= score);
    self.by_key.insert(key.clone(), idx);
    self.entries.insert(pos, Entry { idx, score, key });
  }

  fn remove(&mut self, idx: ItemIdx) {
    if let Some(pos) = self.entries.iter().position(|e| e.idx == idx) {
      let entry = self.entries.remove(pos);
      self.by_key.remove(&entry.key);
    }
  }

  /// Drops everything outside the beam, then the lowest scorers past `cap`
  fn prune(&mut self, beam_width: f64, cap: usize) -> Vec<ItemIdx> {
    let mut evicted = Vec::new();
    let Some(best) = self.best_score() else {
      return evicted;
    };
    let threshold = best - beam_width;

    while let Some(last) = self.entries.last() {
      if last.score >= threshold && self.entries.len() <= cap {
        break;
      }
      let entry = self.entries.pop().expect("checked non-empty");
      self.by_key.remove(&entry.key);
      evicted.push(entry.idx);
    }

    evicted
  }
}

#[derive(Debug, Default)]
struct ChartCell {
  groups: FxHashMap<Symbol, LabelGroup>,
}

/// Span-indexed chart. Cell (s, e), s <= e, holds every item spanning
/// exactly words s through e. Owns the arena all of a sentence's items live
/// in.
#[derive(Debug)]
pub struct Chart {
  size: usize,
  cells: Vec<ChartCell>,
  arena: ItemArena,
  policy: EquivalencePolicy,
  beam_width: f64,
  max_cell_size: usize,
  base_np_barrier: bool,
}

impl Chart {
  pub fn new(settings: &Settings) -> Self {
    Self {
      size: 0,
      cells: Vec::new(),
      arena: ItemArena::new(),
      policy: settings.equivalence,
      beam_width: settings.beam_width(),
      max_cell_size: settings.max_cell_size,
      base_np_barrier: settings.base_np_verb_barrier,
    }
  }

  /// Number of words the chart is sized for
  pub fn len(&self) -> usize {
    self.size
  }

  pub fn is_empty(&self) -> bool {
    self.size == 0
  }

  /// Resizes for a sentence of `n` words and forgets every item. Keeps the
  /// cell and arena allocations for reuse.
  pub fn set_size_and_clear(&mut self, n: usize) {
    self.size = n;
    for cell in self.cells.iter_mut() {
      cell.groups.clear();
    }
    self.cells.resize_with(n * n, ChartCell::default);
    self.arena.clear();
  }

  fn cell_index(&self, start: usize, end: usize) -> usize {
    assert!(
      start <= end && end < self.size,
      "chart cell ({}, {}) out of bounds for sentence of length {}",
      start,
      end,
      self.size
    );
    start * self.size + end
  }

  /// Offers `item` to cell (start, end). The chart takes ownership either way;
  /// a rejected item is dropped and must not be referenced again. Returns the
  /// new item's index if it was kept.
  pub fn add<P>(&mut self, start: usize, end: usize, item: Item, lang: &P) -> Option<ItemIdx>
  where
    P: LanguagePolicy + ?Sized,
  {
    let cell_idx = self.cell_index(start, end);
    assert!(
      item.start == start && item.end == end,
      "item spanning ({}, {}) added to cell ({}, {})",
      item.start,
      item.end,
      start,
      end
    );

    let score = item.score();
    let key = ItemKey::new(self.policy, &item, &self.arena, lang, self.base_np_barrier);
    let group = self.cells[cell_idx].groups.entry(item.label).or_default();

    if let Some(best) = group.best_score() {
      if score < best - self.beam_width {
        return None;
      }
    }
    if group.len() >= self.max_cell_size && group.worst_score().is_some_and(|w| score <= w) {
      return None;
    }

    if let Some(&existing) = group.by_key.get(&key) {
      if self.arena.get(existing).score() >= score {
        return None;
      }
      group.remove(existing);
      self.arena.mark_garbage(existing);
    }

    let idx = self.arena.alloc(item);
    group.insert(idx, score, key);

    for evicted in group.prune(self.beam_width, self.max_cell_size) {
      trace!(start, end, item = evicted.0, "evicted item");
      self.arena.mark_garbage(evicted);
    }

    Some(idx)
  }

  /// The items of one label in a cell, best first
  pub fn get(&self, start: usize, end: usize, label: Symbol) -> Option<&LabelGroup> {
    self.cells[self.cell_index(start, end)].groups.get(&label)
  }

  /// Every item in a cell, across labels
  pub fn cell(&self, start: usize, end: usize) -> impl Iterator<Item = ItemIdx> + '_ {
    self.cells[self.cell_index(start, end)]
      .groups
      .values()
      .flat_map(|g| g.iter())
  }

  /// Snapshot of a cell's items, for iterating while the chart grows
  pub fn cell_items(&self, start: usize, end: usize) -> Vec<ItemIdx> {
    self.cell(start, end).collect()
  }

  pub fn item(&self, idx: ItemIdx) -> &Item {
    self.arena.get(idx)
  }

  pub fn arena(&self) -> &ItemArena {
    &self.arena
  }

  /// Display the chart with symbol names resolved
  pub fn display<'a>(&'a self, symbols: &'a SymbolTable) -> ChartDisplay<'a> {
    ChartDisplay {
      chart: self,
      symbols,
    }
  }
}

/// Helper struct for displaying a chart
#[derive(Clone)]
pub struct ChartDisplay<'a> {
  pub chart: &'a Chart,
  pub symbols: &'a SymbolTable,
}

impl fmt::Display for ChartDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let chart = self.chart;
    for width in 0..chart.len() {
      for start in 0..chart.len() - width {
        let end = start + width;
        let mut labels = chart.cells[chart.cell_index(start, end)]
          .groups
          .iter()
          .filter(|(_, g)| !g.is_empty())
          .collect::<Vec<_>>();
        if labels.is_empty() {
          continue;
        }
        labels.sort_by_key(|(label, _)| **label);

        writeln!(f, "Cell {}..{}:", start, end)?;
        for (_, group) in labels {
          for idx in group.iter() {
            let item = chart.item(idx);
            writeln!(
              f,
              "  {} [{}/{}]{} {:.4}",
              self.symbols.name(item.label),
              self.symbols.name(item.head_word.word),
              self.symbols.name(item.head_word.tag),
              if item.stop { " stop" } else { "" },
              item.score()
            )?;
          }
        }
      }
    }
    Ok(())
  }
}
