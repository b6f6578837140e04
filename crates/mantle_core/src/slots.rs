//! Fixed-size section slot table.

use crate::error::{ChunkError, ChunkResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// A fixed-size table of optional, shared section instances.
///
/// Every slot is guarded by its own lock, so operations on different
/// indices never contend. A slot is either empty or holds one fully built
/// instance; installation happens under the slot's write lock, so no reader
/// ever observes a half-written slot.
///
/// # Install-once-wins
///
/// [`get_or_create`](Self::get_or_create) builds its candidate outside the
/// lock. When several threads race on the same empty slot, each may build a
/// candidate, but only the first to take the write lock installs it; the
/// others return the installed instance and drop their own.
pub struct SlotTable<S> {
    slots: Box<[RwLock<Option<Arc<S>>>]>,
}

impl<S> SlotTable<S> {
    /// Creates a table of `len` empty slots.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| RwLock::new(None)).collect(),
        }
    }

    /// Returns the number of slots. Never changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the table has zero slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the instance at `index`, if any.
    ///
    /// Out-of-range indices read as empty.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Arc<S>> {
        self.slots.get(index)?.read().clone()
    }

    /// Returns true if slot `index` holds an instance.
    #[must_use]
    pub fn exists(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .is_some_and(|slot| slot.read().is_some())
    }

    /// Returns the instance at `index`, creating it with `factory` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::SlotOutOfRange`] if `index >= len()`.
    pub fn get_or_create<F>(&self, index: usize, factory: F) -> ChunkResult<Arc<S>>
    where
        F: FnOnce() -> S,
    {
        let slot = self.slot(index)?;

        if let Some(existing) = slot.read().as_ref() {
            return Ok(Arc::clone(existing));
        }

        let candidate = Arc::new(factory());

        let mut guard = slot.write();
        match guard.as_ref() {
            Some(winner) => Ok(Arc::clone(winner)),
            None => {
                *guard = Some(Arc::clone(&candidate));
                Ok(candidate)
            }
        }
    }

    /// Stores `value` at `index`, replacing whatever was there.
    ///
    /// Returns the previous instance.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::SlotOutOfRange`] if `index >= len()`.
    pub fn set(&self, index: usize, value: Option<Arc<S>>) -> ChunkResult<Option<Arc<S>>> {
        let slot = self.slot(index)?;
        Ok(std::mem::replace(&mut *slot.write(), value))
    }

    /// Clears slot `index`, returning the instance that was there.
    ///
    /// Out-of-range indices are ignored.
    pub fn delete(&self, index: usize) -> Option<Arc<S>> {
        self.slots.get(index)?.write().take()
    }

    /// Clears slot `index` only if it still holds `expected`.
    ///
    /// Returns true if the slot was cleared.
    pub fn delete_if_same(&self, index: usize, expected: &Arc<S>) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };

        let mut guard = slot.write();
        if guard.as_ref().is_some_and(|current| Arc::ptr_eq(current, expected)) {
            *guard = None;
            true
        } else {
            false
        }
    }

    /// Clears every slot.
    pub fn clear(&self) {
        for index in 0..self.slots.len() {
            self.delete(index);
        }
    }

    /// Returns the number of occupied slots at the time of the call.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.read().is_some()).count()
    }

    fn slot(&self, index: usize) -> ChunkResult<&RwLock<Option<Arc<S>>>> {
        self.slots.get(index).ok_or(ChunkError::SlotOutOfRange {
            index,
            capacity: self.slots.len(),
        })
    }
}

impl<S> std::fmt::Debug for SlotTable<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotTable")
            .field("len", &self.len())
            .field("occupied", &self.occupied())
            .finish()
    }
}
