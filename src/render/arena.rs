//! Frame-scoped slot arena
//!
//! A bounded [`SlotMap`] whose contents live for one frame. `reset()` drains
//! every slot, which bumps each slot's generation: keys handed out before the
//! reset stop resolving instead of aliasing next frame's values. Drained
//! values are parked and recycled by later allocations, so buffers they own
//! keep their heap capacity across frames.

use slotmap::{Key, SlotMap};

/// A slot type that can be returned to a pristine state in place,
/// keeping whatever heap capacity it already owns.
pub trait Recycle: Default {
    fn recycle(&mut self);
}

/// Pool of at most `capacity` live slots, addressed by `K`
#[derive(Debug)]
pub struct FrameArena<K: Key, T> {
    slots: SlotMap<K, T>,
    spare: Vec<T>,
    capacity: usize,
}

impl<K: Key, T: Recycle> FrameArena<K, T> {
    /// Slots are created lazily up to `capacity` and kept across frames
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_key(),
            spare: Vec::new(),
            capacity,
        }
    }

    /// Forget every allocation made this frame
    pub fn reset(&mut self) {
        self.spare.extend(self.slots.drain().map(|(_, value)| value));
    }

    /// Take a fresh slot, or `None` when the arena is exhausted
    pub fn alloc(&mut self) -> Option<(K, &mut T)> {
        if self.is_full() {
            return None;
        }
        let value = match self.spare.pop() {
            Some(mut value) => {
                value.recycle();
                value
            }
            None => T::default(),
        };
        let key = self.slots.insert(value);
        self.slots.get_mut(key).map(|slot| (key, slot))
    }

    /// `None` for keys issued before the last reset
    pub fn get(&self, key: K) -> Option<&T> {
        self.slots.get(key)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        self.slots.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
