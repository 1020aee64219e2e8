// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use strata_handle::HandleError;

/// Contract violations reported by [`Tree`](crate::Tree) operations.
///
/// Every fallible operation checks its arguments before mutating anything, so
/// an `Err` leaves the tree exactly as it was.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeError {
    /// A node handle is null, stale, or was never issued by this tree.
    InvalidHandle,
    /// The node index space is exhausted.
    CapacityExceeded,
    /// The operation requires a node without a parent.
    NotARootNode,
    /// The node is not in the top-level order list.
    NotOrdered,
    /// A node was asked to be ordered before itself.
    SelfOrdering,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => f.write_str("invalid node handle"),
            Self::CapacityExceeded => f.write_str("node index space exhausted"),
            Self::NotARootNode => f.write_str("node has a parent and cannot be ordered"),
            Self::NotOrdered => f.write_str("node is not in the top-level order list"),
            Self::SelfOrdering => f.write_str("node cannot be ordered before itself"),
        }
    }
}

impl core::error::Error for TreeError {}

impl From<HandleError> for TreeError {
    fn from(err: HandleError) -> Self {
        match err {
            HandleError::InvalidHandle => Self::InvalidHandle,
            HandleError::CapacityExceeded => Self::CapacityExceeded,
        }
    }
}
