//! Fixed-capacity slot arena with generational handles.
//!
//! Entries are allocated into the first free slot found by a linear scan and
//! freed by emptying the slot. Every release bumps the slot's generation, so a
//! handle kept past its entry's lifetime never resolves to whatever reuses the
//! slot afterwards.

use std::fmt;

/// Stable handle to an entry in a [`Slots`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    index: u32,
    generation: u32,
}

impl SlotId {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena of at most `capacity` live entries
#[derive(Debug)]
pub struct Slots<T> {
    slots: Vec<Slot<T>>,
    capacity: usize,
    len: usize,
}

impl<T> Slots<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            len: 0,
        }
    }

    /// Stores `value` in the first free slot.
    ///
    /// Returns None when every slot is occupied.
    pub fn allocate(&mut self, value: T) -> Option<SlotId> {
        if let Some(index) = self.slots.iter().position(|slot| slot.value.is_none()) {
            let slot = &mut self.slots[index];
            slot.value = Some(value);
            self.len += 1;
            return Some(SlotId {
                index: index as u32,
                generation: slot.generation,
            });
        }

        if self.slots.len() >= self.capacity {
            return None;
        }

        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        self.len += 1;
        Some(SlotId {
            index: index as u32,
            generation: 0,
        })
    }

    /// Frees the slot behind `id`, returning its entry if the handle was live
    pub fn release(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    /// Iterates over live entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    SlotId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
