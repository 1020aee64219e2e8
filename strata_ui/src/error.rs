// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use strata_handle::HandleError;
use strata_tree::TreeError;

/// Contract violations reported by [`Ui`](crate::Ui) operations.
///
/// Like [`TreeError`], every variant is returned before any state is touched.
/// A pointer or key event that nobody handled is not an error; the dispatch
/// functions report it as `Ok(false)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UiError {
    /// A node, layer, data or animator handle is null or stale.
    InvalidHandle,
    /// A handle index space is exhausted.
    CapacityExceeded,
    /// The operation requires a node without a parent.
    NotARootNode,
    /// The node is not in the top-level order list.
    NotOrdered,
    /// A node was asked to be ordered before itself.
    SelfOrdering,
    /// An event was dispatched while already accepted, or a layer or animator
    /// was accessed as the wrong type.
    InvalidUsage,
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => f.write_str("invalid handle"),
            Self::CapacityExceeded => f.write_str("handle index space exhausted"),
            Self::NotARootNode => f.write_str("node has a parent and cannot be ordered"),
            Self::NotOrdered => f.write_str("node is not in the top-level order list"),
            Self::SelfOrdering => f.write_str("node cannot be ordered before itself"),
            Self::InvalidUsage => f.write_str("invalid usage"),
        }
    }
}

impl core::error::Error for UiError {}

impl From<HandleError> for UiError {
    fn from(err: HandleError) -> Self {
        match err {
            HandleError::InvalidHandle => Self::InvalidHandle,
            HandleError::CapacityExceeded => Self::CapacityExceeded,
        }
    }
}

impl From<TreeError> for UiError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::InvalidHandle => Self::InvalidHandle,
            TreeError::CapacityExceeded => Self::CapacityExceeded,
            TreeError::NotARootNode => Self::NotARootNode,
            TreeError::NotOrdered => Self::NotOrdered,
            TreeError::SelfOrdering => Self::SelfOrdering,
        }
    }
}
