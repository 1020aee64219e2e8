// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed generational handles and the entity kinds they are tagged with.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// Compile-time description of one entity kind's handle layout.
///
/// `INDEX_BITS + GENERATION_BITS` must not exceed 64, and both must be
/// non-zero. The index width bounds how many live entities a pool of this
/// kind can hold; the generation width bounds how many times a slot can be
/// recycled before it is retired.
pub trait HandleKind: 'static {
    /// Number of low bits holding the slot index.
    const INDEX_BITS: u32;
    /// Number of bits above the index holding the generation.
    const GENERATION_BITS: u32;
    /// Name used in `Debug` output.
    const NAME: &'static str;
}

/// Marker for node handles.
#[derive(Debug)]
pub enum NodeKind {}

impl HandleKind for NodeKind {
    const INDEX_BITS: u32 = 20;
    const GENERATION_BITS: u32 = 16;
    const NAME: &'static str = "NodeHandle";
}

/// Marker for layer handles.
#[derive(Debug)]
pub enum LayerKind {}

impl HandleKind for LayerKind {
    const INDEX_BITS: u32 = 8;
    const GENERATION_BITS: u32 = 8;
    const NAME: &'static str = "LayerHandle";
}

/// Marker for layer-relative data handles.
#[derive(Debug)]
pub enum LayerDataKind {}

impl HandleKind for LayerDataKind {
    const INDEX_BITS: u32 = 20;
    const GENERATION_BITS: u32 = 16;
    const NAME: &'static str = "LayerDataHandle";
}

/// Marker for animator handles.
#[derive(Debug)]
pub enum AnimatorKind {}

impl HandleKind for AnimatorKind {
    const INDEX_BITS: u32 = 8;
    const GENERATION_BITS: u32 = 8;
    const NAME: &'static str = "AnimatorHandle";
}

/// A slot index and generation packed into one integer.
///
/// The index occupies the low `K::INDEX_BITS` bits, the generation the
/// `K::GENERATION_BITS` bits above it. Generation `0` is never handed out by
/// a pool, which makes the all-zero [`Handle::NULL`] invalid everywhere.
pub struct Handle<K: HandleKind> {
    bits: u64,
    _kind: PhantomData<fn() -> K>,
}

/// Handle to a node.
pub type NodeHandle = Handle<NodeKind>;
/// Handle to a layer.
pub type LayerHandle = Handle<LayerKind>;
/// Handle to a piece of data, relative to the layer that owns it.
pub type LayerDataHandle = Handle<LayerDataKind>;
/// Handle to an animator.
pub type AnimatorHandle = Handle<AnimatorKind>;

impl<K: HandleKind> Handle<K> {
    /// The null handle. Never valid.
    pub const NULL: Self = Self {
        bits: 0,
        _kind: PhantomData,
    };

    const INDEX_MASK: u64 = (1 << K::INDEX_BITS) - 1;
    const GENERATION_MASK: u64 = (1 << K::GENERATION_BITS) - 1;

    /// Packs an index and a generation. Bits beyond the kind's widths are dropped.
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: (index as u64 & Self::INDEX_MASK)
                | ((generation as u64 & Self::GENERATION_MASK) << K::INDEX_BITS),
            _kind: PhantomData,
        }
    }

    /// Slot index of the handle.
    #[inline]
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "The mask keeps at most INDEX_BITS (<= 32 for every kind) bits."
    )]
    pub const fn index(self) -> u32 {
        (self.bits & Self::INDEX_MASK) as u32
    }

    /// Generation counter of the handle.
    #[inline]
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "The mask keeps at most GENERATION_BITS (<= 32 for every kind) bits."
    )]
    pub const fn generation(self) -> u32 {
        ((self.bits >> K::INDEX_BITS) & Self::GENERATION_MASK) as u32
    }

    /// Whether this is [`Handle::NULL`].
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.bits == 0
    }

    /// The packed representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.bits
    }

    /// Rebuilds a handle from [`Handle::to_bits`] output.
    ///
    /// Bits outside the kind's index and generation fields are discarded.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            bits: bits & (Self::INDEX_MASK | (Self::GENERATION_MASK << K::INDEX_BITS)),
            _kind: PhantomData,
        }
    }

    /// Largest generation a slot of this kind can carry.
    #[inline]
    pub(crate) const fn max_generation() -> u32 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "GENERATION_BITS is at most 32 for every kind."
        )]
        let max = Self::GENERATION_MASK as u32;
        max
    }
}

impl<K: HandleKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: HandleKind> Copy for Handle<K> {}

impl<K: HandleKind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<K: HandleKind> Eq for Handle<K> {}

impl<K: HandleKind> PartialOrd for Handle<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: HandleKind> Ord for Handle<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bits.cmp(&other.bits)
    }
}

impl<K: HandleKind> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<K: HandleKind> Default for Handle<K> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "{}::NULL", K::NAME)
        } else {
            write!(f, "{}({}@gen{})", K::NAME, self.index(), self.generation())
        }
    }
}

/// Globally addressable layer data: the owning layer plus the layer-relative data handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataHandle {
    /// Layer owning the data.
    pub layer: LayerHandle,
    /// Data handle relative to `layer`.
    pub data: LayerDataHandle,
}

impl DataHandle {
    /// The null data handle.
    pub const NULL: Self = Self {
        layer: LayerHandle::NULL,
        data: LayerDataHandle::NULL,
    };

    /// Pairs a layer handle with a layer-relative data handle.
    #[inline]
    #[must_use]
    pub const fn new(layer: LayerHandle, data: LayerDataHandle) -> Self {
        Self { layer, data }
    }

    /// Whether both halves are null.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.layer.is_null() && self.data.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn packs_index_and_generation() {
        let h = NodeHandle::new(0xABCDE, 0x1234);
        assert_eq!(h.index(), 0xABCDE);
        assert_eq!(h.generation(), 0x1234);
        assert_eq!(h.to_bits(), 0x1234_ABCDE);
        assert_eq!(NodeHandle::from_bits(h.to_bits()), h);
    }

    #[test]
    fn out_of_range_bits_are_dropped() {
        let h = LayerHandle::new(0x1FF, 0x1FF);
        assert_eq!(h.index(), 0xFF);
        assert_eq!(h.generation(), 0xFF);
        assert_eq!(LayerHandle::from_bits(u64::MAX).to_bits(), 0xFFFF);
    }

    #[test]
    fn null_is_default_and_debug_prints_kind() {
        assert!(NodeHandle::default().is_null());
        assert!(DataHandle::default().is_null());
        assert_eq!(format!("{:?}", NodeHandle::NULL), "NodeHandle::NULL");
        assert_eq!(
            format!("{:?}", AnimatorHandle::new(3, 1)),
            "AnimatorHandle(3@gen1)"
        );
        assert_eq!(LayerDataHandle::max_generation(), 0xFFFF);
        assert_eq!(LayerHandle::max_generation(), 0xFF);
    }
}
