// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slot allocation with a FIFO free list and generation retirement.

use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use crate::error::HandleError;
use crate::handle::{Handle, HandleKind};

const NO_SLOT: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Used,
    /// On the free list; `next` is the slot freed right after this one.
    Free {
        next: u32,
    },
    /// Generation exhausted, never handed out again.
    Retired,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    /// Generation of the live handle while used, the next handle's generation
    /// while free, and `0` once retired.
    generation: u32,
    state: SlotState,
}

/// Allocator of generational [`Handle`]s of one kind.
///
/// - New slots are appended until the kind's index space is used up, after
///   which [`create`](Self::create) fails with [`HandleError::CapacityExceeded`].
/// - Removed slots go to the back of a singly-linked free list and are reused
///   oldest-freed-first, with the generation bumped so stale handles no longer
///   match.
/// - A slot removed while at the maximum generation is retired (generation `0`)
///   instead of wrapping, so an old handle can never become valid again.
///
/// The pool only tracks liveness. Per-entity data lives in parallel arrays
/// owned by the caller and indexed by [`Handle::index`].
pub struct HandlePool<K: HandleKind> {
    slots: Vec<Slot>,
    first_free: u32,
    last_free: u32,
    used: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> fmt::Debug for HandlePool<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlePool")
            .field("kind", &K::NAME)
            .field("slots", &self.slots.len())
            .field("used", &self.used)
            .finish_non_exhaustive()
    }
}

impl<K: HandleKind> Default for HandlePool<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HandleKind> HandlePool<K> {
    /// Creates an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            first_free: NO_SLOT,
            last_free: NO_SLOT,
            used: 0,
            _kind: PhantomData,
        }
    }

    /// Maximum number of slots a pool of this kind can address.
    #[must_use]
    pub const fn capacity() -> usize {
        1 << K::INDEX_BITS
    }

    /// Allocates a handle, recycling the oldest freed slot if there is one.
    pub fn create(&mut self) -> Result<Handle<K>, HandleError> {
        if self.first_free != NO_SLOT {
            let index = self.first_free;
            let slot = &mut self.slots[index as usize];
            let SlotState::Free { next } = slot.state else {
                unreachable!("free list links a slot that is not free");
            };
            self.first_free = next;
            if next == NO_SLOT {
                self.last_free = NO_SLOT;
            }
            slot.state = SlotState::Used;
            self.used += 1;
            return Ok(Handle::new(index, slot.generation));
        }

        if self.slots.len() >= Self::capacity() {
            return Err(HandleError::CapacityExceeded);
        }
        let index = u32::try_from(self.slots.len()).map_err(|_| HandleError::CapacityExceeded)?;
        self.slots.push(Slot {
            generation: 1,
            state: SlotState::Used,
        });
        self.used += 1;
        Ok(Handle::new(index, 1))
    }

    /// Frees the slot of `handle`.
    ///
    /// Fails with [`HandleError::InvalidHandle`] without touching the pool if
    /// the handle is not [valid](Self::is_valid).
    pub fn remove(&mut self, handle: Handle<K>) -> Result<(), HandleError> {
        if !self.is_valid(handle) {
            return Err(HandleError::InvalidHandle);
        }
        let index = handle.index();
        let slot = &mut self.slots[index as usize];
        if slot.generation == Handle::<K>::max_generation() {
            slot.generation = 0;
            slot.state = SlotState::Retired;
        } else {
            slot.generation += 1;
            slot.state = SlotState::Free { next: NO_SLOT };
            if self.last_free == NO_SLOT {
                self.first_free = index;
            } else {
                self.slots[self.last_free as usize].state = SlotState::Free { next: index };
            }
            self.last_free = index;
        }
        self.used -= 1;
        Ok(())
    }

    /// Whether `handle` refers to a slot that is allocated with the same generation.
    #[must_use]
    pub fn is_valid(&self, handle: Handle<K>) -> bool {
        self.slots
            .get(handle.index() as usize)
            .is_some_and(|slot| {
                slot.state == SlotState::Used
                    && slot.generation != 0
                    && slot.generation == handle.generation()
            })
    }

    /// Live handle occupying slot `index`, if the slot is in use.
    #[must_use]
    pub fn handle_at(&self, index: u32) -> Option<Handle<K>> {
        let slot = self.slots.get(index as usize)?;
        (slot.state == SlotState::Used).then(|| Handle::new(index, slot.generation))
    }

    /// Number of live handles.
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.used
    }

    /// Number of slots ever allocated, including free and retired ones.
    ///
    /// Parallel per-entity arrays need at least this many entries.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Iterates live handles in slot order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            slots: self.slots.iter().enumerate(),
            _kind: PhantomData,
        }
    }

    /// Drops every slot, invalidating all handles.
    ///
    /// Handles issued before the call may become valid again once their slot
    /// is reallocated with the same generation; only use this when no
    /// handles are retained anywhere.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.first_free = NO_SLOT;
        self.last_free = NO_SLOT;
        self.used = 0;
    }
}

/// Iterator over the live handles of a [`HandlePool`].
pub struct Iter<'a, K: HandleKind> {
    slots: core::iter::Enumerate<core::slice::Iter<'a, Slot>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> fmt::Debug for Iter<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("kind", &K::NAME).finish_non_exhaustive()
    }
}

impl<K: HandleKind> Iterator for Iter<'_, K> {
    type Item = Handle<K>;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, slot) in self.slots.by_ref() {
            if slot.state == SlotState::Used {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "Slot count never exceeds the kind's index space."
                )]
                return Some(Handle::new(index as u32, slot.generation));
            }
        }
        None
    }
}
