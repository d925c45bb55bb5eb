use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Identifier handed to a thing when it is registered with the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThingId {
    index: u32,
    generation: u32, // For handling index reuse
}

impl ThingId {
    pub fn new(index: u32, generation: u32) -> Self {
        ThingId { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// ThingIds hands out ids and recycles the ones released by `remove`.
#[derive(Debug, Default)]
pub struct ThingIds {
    next_index: u32,
    generations: Vec<u32>,
    recycled: VecDeque<u32>,
}

impl ThingIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id, recycling released indices first
    pub fn allocate(&mut self) -> ThingId {
        if let Some(index) = self.recycled.pop_front() {
            ThingId::new(index, self.generations[index as usize])
        } else {
            let index = self.next_index;
            self.next_index += 1;
            self.generations.push(0);
            ThingId::new(index, 0)
        }
    }

    /// Invalidate an id so the index can be handed out again
    pub fn release(&mut self, id: ThingId) {
        if !self.is_live(id) {
            return;
        }
        self.generations[id.index() as usize] += 1;
        self.recycled.push_back(id.index());
    }

    pub fn is_live(&self, id: ThingId) -> bool {
        self.generations
            .get(id.index() as usize)
            .map_or(false, |generation| *generation == id.generation())
            && !self.recycled.contains(&id.index())
    }

    pub fn live_count(&self) -> usize {
        self.next_index as usize - self.recycled.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_index_is_reused_with_new_generation() {
        let mut ids = ThingIds::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert_eq!(ids.live_count(), 2);

        ids.release(a);
        assert!(!ids.is_live(a));
        assert!(ids.is_live(b));

        let c = ids.allocate();
        assert_eq!(c.index(), a.index());
        assert_eq!(c.generation(), a.generation() + 1);
        assert!(ids.is_live(c));
    }

    #[test]
    fn double_release_is_ignored() {
        let mut ids = ThingIds::new();
        let a = ids.allocate();
        ids.release(a);
        ids.release(a);
        assert_eq!(ids.live_count(), 0);
        let b = ids.allocate();
        let c = ids.allocate();
        assert_ne!(b.index(), c.index());
    }
}
