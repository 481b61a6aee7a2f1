use std::collections::HashMap;

use crate::detection::ObjectId;

#[derive(Debug, Clone)]
struct Slot<T> {
    id: ObjectId,
    last_seen: i64,
    value: T,
}

/// Per-identity storage addressed by slot index.
///
/// Vacated slots are reused, and entries not seen for longer than a given
/// number of frames can be evicted, so memory stays bounded by the number of
/// identities alive within that horizon.
#[derive(Debug, Clone)]
pub struct ObjectTable<T> {
    slots: Vec<Option<Slot<T>>>,
    free: Vec<usize>,
    index: HashMap<ObjectId, usize>,
}

impl<T> Default for ObjectTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObjectTable<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(64),
            free: Vec::new(),
            index: HashMap::with_capacity(64),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&T> {
        let idx = *self.index.get(id)?;

        self.slots.get(idx)?.as_ref().map(|s| &s.value)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut T> {
        let idx = *self.index.get(id)?;

        self.slots.get_mut(idx)?.as_mut().map(|s| &mut s.value)
    }

    pub fn last_seen(&self, id: &ObjectId) -> Option<i64> {
        let idx = *self.index.get(id)?;

        self.slots.get(idx)?.as_ref().map(|s| s.last_seen)
    }

    /// Returns the entry for `id`, creating it with `init` on first sighting.
    /// The entry's last-seen frame never moves backwards.
    pub fn get_or_insert_with(
        &mut self,
        id: ObjectId,
        frame: i64,
        init: impl FnOnce() -> T,
    ) -> &mut T {
        let idx = match self.index.get(&id) {
            Some(&idx) => idx,
            None => {
                let idx = self.free.pop().unwrap_or_else(|| {
                    self.slots.push(None);
                    self.slots.len() - 1
                });
                self.index.insert(id, idx);
                idx
            }
        };

        let slot = self.slots[idx].get_or_insert_with(|| Slot {
            id,
            last_seen: frame,
            value: init(),
        });
        slot.last_seen = slot.last_seen.max(frame);

        &mut slot.value
    }

    pub fn remove(&mut self, id: &ObjectId) -> Option<T> {
        let idx = self.index.remove(id)?;
        let slot = self.slots.get_mut(idx)?.take()?;
        self.free.push(idx);

        Some(slot.value)
    }

    /// Drops every entry last seen more than `max_age` frames before `frame`.
    pub fn evict_stale(&mut self, frame: i64, max_age: i64) -> usize {
        let mut evicted = 0;

        for (idx, entry) in self.slots.iter_mut().enumerate() {
            if matches!(entry, Some(slot) if frame - slot.last_seen > max_age) {
                if let Some(slot) = entry.take() {
                    self.index.remove(&slot.id);
                }
                self.free.push(idx);
                evicted += 1;
            }
        }

        evicted
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &T)> {
        self.slots
            .iter()
            .filter_map(|s| s.as_ref().map(|s| (s.id, &s.value)))
    }
}
