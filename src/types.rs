use crate::backend::FeedEvent;

#[derive(Debug, Clone)]
pub enum Action {
    Error(String),
    Quit,
    Render,
    Help,
    Open,
    Search(String),
    ClearSearch,
    ShowBlocked,
    LoadMore,
    Retry,
    Refresh,
    Tap(usize),
    Hide(String),
    Unhide(String),
    Feed(u64, FeedEvent),
}

#[derive(Debug, Clone)]
pub enum Event {
    Line(String),
    Eof,
    Error(String),
}
