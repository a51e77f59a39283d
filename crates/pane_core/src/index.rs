//! IndexTable - dense index allocation with slot reuse
//!
//! Hands out small non-negative integer indices and reuses freed slots
//! before the table grows. Freed indices are reused last-freed-first.

/// Dense index table with a freelist of released slots
#[derive(Debug, Clone)]
pub struct IndexTable<T> {
    slots: Vec<Option<T>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> IndexTable<T> {
    /// Create a new empty table
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Rebuild a table from saved slots.
    ///
    /// Empty slots go onto the freelist in ascending order, so the highest
    /// empty slot is handed out first.
    pub fn from_slots(slots: Vec<Option<T>>) -> Self {
        let mut free_list = Vec::new();
        let mut len = 0;
        for (index, slot) in slots.iter().enumerate() {
            if slot.is_some() {
                len += 1;
            } else {
                free_list.push(index);
            }
        }
        Self { slots, free_list, len }
    }

    /// Store `item`, returning its index.
    ///
    /// The most recently freed index is reused if there is one, otherwise
    /// the table grows by one slot.
    pub fn allocate(&mut self, item: T) -> usize {
        self.len += 1;
        match self.free_list.pop() {
            Some(index) => {
                self.slots[index] = Some(item);
                index
            }
            None => {
                self.slots.push(Some(item));
                self.slots.len() - 1
            }
        }
    }

    /// Place `item` at a specific index, growing the table as needed.
    ///
    /// Slots created to reach `index` are added to the freelist. Returns the
    /// item previously stored there, if any.
    pub fn insert_at(&mut self, index: usize, item: T) -> Option<T> {
        while self.slots.len() <= index {
            let grown = self.slots.len();
            self.slots.push(None);
            if grown != index {
                self.free_list.push(grown);
            }
        }
        self.free_list.retain(|&i| i != index);
        let previous = self.slots[index].replace(item);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Release `index`, returning the item stored there.
    ///
    /// Freeing an empty or out-of-range slot is a no-op.
    pub fn free(&mut self, index: usize) -> Option<T> {
        let item = self.slots.get_mut(index)?.take()?;
        self.free_list.push(index);
        self.len -= 1;
        Some(item)
    }

    /// Get the item at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.as_ref()
    }

    /// Get the item at `index` mutably
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index)?.as_mut()
    }

    /// Check whether `index` currently holds an item
    pub fn is_active(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no slot is occupied
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, occupied or free
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Indices waiting for reuse, in the order they will be handed out
    pub fn free_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.free_list.iter().rev().copied()
    }

    /// Iterate over occupied slots in index order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (i, item)))
    }

    /// Iterate over every slot, including empty ones
    pub fn slots(&self) -> &[Option<T>] {
        &self.slots
    }

    /// Drop every item and forget all indices
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.len = 0;
    }
}

impl<T> Default for IndexTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
