//! Snapshot-based undo and redo.
//!
//! The unit of undo is a full clone of the committed graph, taken just
//! before a mutation commits. Per-frame physics motion never creates
//! entries; only gestures and menu actions do.

use crate::constants;
use crate::types::MindMap;
use crate::ui::state::MindMapApp;

/// Past and future snapshot stacks.
#[derive(Debug, Default)]
pub struct UndoHistory {
    past: Vec<MindMap>,
    future: Vec<MindMap>,
}

impl UndoHistory {
    /// Records a pre-mutation snapshot. Any redo branch is discarded and the
    /// oldest entry is dropped past the cap.
    pub fn push(&mut self, snapshot: MindMap) {
        self.future.clear();
        self.past.push(snapshot);
        if self.past.len() > constants::MAX_UNDO_HISTORY {
            self.past.remove(0);
        }
    }

    /// Steps back: returns the state to restore, banking `current` for redo.
    pub fn undo(&mut self, current: MindMap) -> Option<MindMap> {
        let snapshot = self.past.pop()?;
        self.future.push(current);
        Some(snapshot)
    }

    /// Steps forward: returns the state to restore, banking `current` for
    /// undo without going through the cap.
    pub fn redo(&mut self, current: MindMap) -> Option<MindMap> {
        let snapshot = self.future.pop()?;
        self.past.push(current);
        Some(snapshot)
    }

    /// Whether an undo step exists.
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Whether a redo step exists.
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Drops both stacks.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

impl MindMapApp {
    /// Restores the previous snapshot. The simulation store is rebuilt
    /// atomically so no motion from the abandoned state leaks through.
    pub fn perform_undo(&mut self) {
        let current = self.snapshot();
        if let Some(map) = self.undo_history.undo(current) {
            self.restore(map);
        }
    }

    /// Restores the next snapshot.
    pub fn perform_redo(&mut self) {
        let current = self.snapshot();
        if let Some(map) = self.undo_history.redo(current) {
            self.restore(map);
        }
    }

    fn restore(&mut self, map: MindMap) {
        self.map = map;
        self.sim.restore(&self.map);
        self.interaction.session = None;
        self.cancel_text_edit();
        self.interaction
            .selected
            .retain(|id| self.map.node(*id).is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IdGen, Node, Shape};

    fn map_with(n: usize) -> MindMap {
        let mut ids = IdGen::sequential();
        let mut map = MindMap::new();
        for i in 0..n {
            map.add_node(Node::new(
                ids.next(),
                format!("{i}"),
                (i as f32 * 10.0, 0.0),
                Shape::Circle,
            ));
        }
        map
    }

    #[test]
    fn undo_and_redo_walk_the_stacks() {
        let mut history = UndoHistory::default();
        history.push(map_with(1));
        history.push(map_with(2));

        let restored = history.undo(map_with(3)).unwrap();
        assert_eq!(restored.nodes.len(), 2);
        let restored = history.undo(restored).unwrap();
        assert_eq!(restored.nodes.len(), 1);
        assert!(!history.can_undo());

        let forward = history.redo(restored).unwrap();
        assert_eq!(forward.nodes.len(), 2);
        assert!(history.can_redo());
    }

    #[test]
    fn push_discards_the_redo_branch() {
        let mut history = UndoHistory::default();
        history.push(map_with(1));
        let restored = history.undo(map_with(2)).unwrap();
        assert!(history.can_redo());
        history.push(restored);
        assert!(!history.can_redo());
    }

    #[test]
    fn history_is_capped() {
        let mut history = UndoHistory::default();
        for i in 0..(constants::MAX_UNDO_HISTORY + 10) {
            history.push(map_with(i));
        }
        let mut steps = 0;
        let mut current = map_with(0);
        while let Some(next) = history.undo(current) {
            current = next;
            steps += 1;
        }
        assert_eq!(steps, constants::MAX_UNDO_HISTORY);
    }
}
