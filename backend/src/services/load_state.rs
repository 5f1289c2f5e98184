//! Fetch state of an asynchronously loaded input.
//!
//! Derived structures are only built from inputs that are all [`LoadState::Ready`];
//! anything else short-circuits, so a consumer never sees a half-built value.

use crate::db::repository::{RepositoryError, RepositoryResult};

#[derive(Debug, Clone, Default)]
pub enum LoadState<T> {
    #[default]
    Loading,
    Error(RepositoryError),
    Ready(T),
}

impl<T> LoadState<T> {
    pub fn from_result(result: RepositoryResult<T>) -> Self {
        match result {
            Ok(value) => LoadState::Ready(value),
            Err(err) => LoadState::Error(err),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> LoadState<&T> {
        match self {
            LoadState::Loading => LoadState::Loading,
            LoadState::Error(err) => LoadState::Error(err.clone()),
            LoadState::Ready(value) => LoadState::Ready(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LoadState<U> {
        match self {
            LoadState::Loading => LoadState::Loading,
            LoadState::Error(err) => LoadState::Error(err),
            LoadState::Ready(value) => LoadState::Ready(f(value)),
        }
    }

    /// Join two states. An error on either side wins over loading, and the
    /// left error wins when both failed.
    pub fn zip<U>(self, other: LoadState<U>) -> LoadState<(T, U)> {
        match (self, other) {
            (LoadState::Ready(a), LoadState::Ready(b)) => LoadState::Ready((a, b)),
            (LoadState::Error(err), _) | (_, LoadState::Error(err)) => LoadState::Error(err),
            _ => LoadState::Loading,
        }
    }
}
