// Query state snapshots.
// One immutable snapshot per key, replaced on every transition.

use chrono::{DateTime, Utc};

use crate::error::ClassifiedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// The state of one query.
///
/// `data` is only set after a success; a success may still carry no data
/// when the resource was absent.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<T>,
    pub error: Option<ClassifiedError>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            last_updated: None,
        }
    }

    pub fn loading() -> Self {
        Self {
            status: QueryStatus::Loading,
            ..Self::idle()
        }
    }

    pub fn success(data: Option<T>) -> Self {
        Self {
            status: QueryStatus::Success,
            data,
            error: None,
            last_updated: Some(Utc::now()),
        }
    }

    pub fn failure(error: ClassifiedError) -> Self {
        Self {
            status: QueryStatus::Error,
            data: None,
            error: Some(error),
            last_updated: Some(Utc::now()),
        }
    }

    pub fn from_result(result: Result<Option<T>, ClassifiedError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure(error),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        QueryState {
            status: self.status,
            data: self.data.map(f),
            error: self.error,
            last_updated: self.last_updated,
        }
    }
}
