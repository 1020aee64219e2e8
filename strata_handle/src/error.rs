// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

/// Errors reported by a [`HandlePool`](crate::HandlePool).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleError {
    /// The handle is null, out of range, refers to a free slot, or its
    /// generation no longer matches the slot.
    InvalidHandle,
    /// Every index representable by the handle kind is in use or retired.
    CapacityExceeded,
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => f.write_str("invalid handle"),
            Self::CapacityExceeded => f.write_str("handle index space exhausted"),
        }
    }
}

impl core::error::Error for HandleError {}
