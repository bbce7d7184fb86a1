// Shared list state.
// Loading status for one-shot data and keyboard selection over a list.

use ratatui::widgets::ListState;

use crate::error::ClassifiedError;
use crate::query::{QueryState, QueryStatus};

/// Loading state for data the UI waits on.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadingState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    /// The resource does not exist, or the session is gone.
    Absent,
    Error(String),
}

impl<T> LoadingState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadingState::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn from_result(result: Result<T, ClassifiedError>) -> Self {
        match result {
            Ok(data) => LoadingState::Loaded(data),
            Err(e) => LoadingState::Error(e.to_string()),
        }
    }
}

impl<T> From<QueryState<T>> for LoadingState<T> {
    fn from(state: QueryState<T>) -> Self {
        match (state.status, state.data, state.error) {
            (QueryStatus::Idle, _, _) => LoadingState::Idle,
            (QueryStatus::Loading, _, _) => LoadingState::Loading,
            (QueryStatus::Success, Some(data), _) => LoadingState::Loaded(data),
            (QueryStatus::Success, None, _) => LoadingState::Absent,
            (QueryStatus::Error, _, Some(e)) => LoadingState::Error(e.to_string()),
            (QueryStatus::Error, _, None) => LoadingState::Error("unknown error".to_string()),
        }
    }
}

/// Keyboard selection over a list whose items live elsewhere.
#[derive(Debug, Clone, Default)]
pub struct SelectableList {
    pub list_state: ListState,
}

impl SelectableList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    /// Select the next item, staying on the last one.
    pub fn select_next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 >= len => len - 1,
            Some(i) => i + 1,
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    /// Select the previous item, staying on the first one.
    pub fn select_prev(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    /// Keep the selection inside a list that may have grown or shrunk.
    pub fn clamp(&mut self, len: usize) {
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            None => self.list_state.select(Some(0)),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            Some(_) => {}
        }
    }

    pub fn reset(&mut self) {
        self.list_state = ListState::default();
    }
}
