//! Map store: the single owner of the canonical chart.
//!
//! The editor only reads the current `Arc<Beatmap>` and hands complete
//! replacements back through `set_map`.

use crate::structure::Beatmap;
use std::sync::Arc;

const MAX_HISTORY: usize = 64;

pub trait MapStore {
    fn map(&self) -> Arc<Beatmap>;
    fn set_map(&mut self, map: Arc<Beatmap>);

    fn undo(&mut self) -> bool {
        false
    }

    fn redo(&mut self) -> bool {
        false
    }
}

/// In-memory store with bounded undo/redo history.
pub struct HistoryStore {
    current: Arc<Beatmap>,
    undo_stack: Vec<Arc<Beatmap>>,
    redo_stack: Vec<Arc<Beatmap>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(Beatmap::default())
    }
}

impl HistoryStore {
    pub fn new(mut map: Beatmap) -> Self {
        map.sort_tempo_segments();
        Self {
            current: Arc::new(map),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Replace the chart and forget the history (e.g. after loading another chart).
    pub fn reset(&mut self, mut map: Beatmap) {
        map.sort_tempo_segments();
        self.current = Arc::new(map);
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

impl MapStore for HistoryStore {
    fn map(&self) -> Arc<Beatmap> {
        Arc::clone(&self.current)
    }

    fn set_map(&mut self, map: Arc<Beatmap>) {
        if Arc::ptr_eq(&self.current, &map) {
            return;
        }
        let previous = std::mem::replace(&mut self.current, map);
        self.undo_stack.push(previous);
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    fn undo(&mut self) -> bool {
        if let Some(previous) = self.undo_stack.pop() {
            let current = std::mem::replace(&mut self.current, previous);
            self.redo_stack.push(current);
            return true;
        }
        false
    }

    fn redo(&mut self) -> bool {
        if let Some(next) = self.redo_stack.pop() {
            let current = std::mem::replace(&mut self.current, next);
            self.undo_stack.push(current);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{Lane, Note, TempoSegment};
    use pretty_assertions::assert_eq;

    fn with_notes(count: usize) -> Beatmap {
        let mut map = Beatmap::with_tempo(120.0);
        map.notes = (0..count)
            .map(|i| Note::tap(i as f64, Lane::Key(0)))
            .collect();
        map
    }

    #[test]
    fn undo_and_redo_walk_history() {
        let mut store = HistoryStore::new(with_notes(0));
        store.set_map(Arc::new(with_notes(1)));
        store.set_map(Arc::new(with_notes(2)));
        assert!(store.undo());
        assert_eq!(store.map().notes.len(), 1);
        assert!(store.undo());
        assert_eq!(store.map().notes.len(), 0);
        assert!(!store.undo());
        assert!(store.redo());
        assert_eq!(store.map().notes.len(), 1);
    }

    #[test]
    fn commit_clears_redo() {
        let mut store = HistoryStore::new(with_notes(0));
        store.set_map(Arc::new(with_notes(1)));
        store.undo();
        assert!(store.can_redo());
        store.set_map(Arc::new(with_notes(3)));
        assert!(!store.can_redo());
        assert!(!store.redo());
    }

    #[test]
    fn history_is_bounded() {
        let mut store = HistoryStore::default();
        for i in 0..(MAX_HISTORY + 10) {
            store.set_map(Arc::new(with_notes(i % 3)));
        }
        let mut undone = 0;
        while store.undo() {
            undone += 1;
        }
        assert_eq!(undone, MAX_HISTORY);
    }

    #[test]
    fn same_arc_is_not_a_new_entry() {
        let mut store = HistoryStore::default();
        let current = store.map();
        store.set_map(current);
        assert!(!store.can_undo());
    }

    #[test]
    fn new_and_reset_order_tempo_segments() {
        let mut map = Beatmap::new();
        map.tempo_segments = vec![TempoSegment::new(5.0, 90.0), TempoSegment::new(0.0, 120.0)];
        let mut store = HistoryStore::new(map.clone());
        assert_eq!(store.map().tempo_segments[0].start_time, 0.0);

        store.reset(map);
        assert_eq!(store.map().tempo_segments[1].start_time, 5.0);
    }
}
