use super::block_list::BlockList;
use super::error::{Error, Result};
use super::remote::RemoteFeed;
use super::types::{FeedItem, Page, PageToken, SourceKind};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone)]
pub enum LoadState {
    Loading,
    Error(Arc<Error>),
    NotLoading { end_of_stream: bool },
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::NotLoading { .. })
    }
    pub fn is_end_of_stream(&self) -> bool {
        matches!(
            self,
            Self::NotLoading {
                end_of_stream: true
            }
        )
    }
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Error(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Load states of every edge of one feed.
#[derive(Debug, Clone)]
pub struct LoadStates {
    pub refresh: LoadState,
    pub prepend: LoadState,
    pub append: LoadState,
}

impl Default for LoadStates {
    fn default() -> Self {
        Self {
            refresh: LoadState::NotLoading {
                end_of_stream: false,
            },
            prepend: LoadState::NotLoading {
                end_of_stream: true,
            },
            append: LoadState::NotLoading {
                end_of_stream: false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edge {
    Refresh,
    Append,
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Drop everything received so far; the feed restarts from its first page.
    Reset,
    Page(Vec<FeedItem>),
    LoadState(LoadStates),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// Re-issue the failed request with the same page token.
    #[default]
    SamePage,
    /// Start over from the first page.
    Restart,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Command {
    LoadMore,
    Retry,
    Refresh,
}

/// One source of pages for a pager.
pub(crate) trait PagingSource {
    fn load(&self, token: Option<PageToken>) -> impl Future<Output = Result<Page>> + Send;
}

pub(crate) struct RemoteSource<R> {
    remote: Arc<R>,
    query: Option<String>,
}

impl<R> RemoteSource<R> {
    pub(crate) fn new(remote: Arc<R>, query: Option<String>) -> Self {
        Self { remote, query }
    }
}

impl<R> PagingSource for RemoteSource<R>
where
    R: RemoteFeed + Send + Sync,
{
    fn load(&self, token: Option<PageToken>) -> impl Future<Output = Result<Page>> + Send {
        self.remote.fetch_page(self.query.as_deref(), token)
    }
}

/// The whole block list as a single, final page.
pub(crate) struct LocalSource<B> {
    block_list: Arc<B>,
}

impl<B> LocalSource<B> {
    pub(crate) fn new(block_list: Arc<B>) -> Self {
        Self { block_list }
    }
}

impl<B> PagingSource for LocalSource<B>
where
    B: BlockList + Send + Sync,
{
    fn load(&self, _: Option<PageToken>) -> impl Future<Output = Result<Page>> + Send {
        let page = self.block_list.list_all().map(|entries| Page {
            items: entries.into_iter().map(FeedItem::from).collect(),
            next: None,
        });
        future::ready(page.map_err(|e| match e {
            Error::LocalStore(_) => e,
            e => Error::LocalStore(e.to_string()),
        }))
    }
}

/// Drives one feed: loads pages on command and reports them as events.
pub(crate) struct Pager<S> {
    source: S,
    events: mpsc::UnboundedSender<FeedEvent>,
    states: watch::Sender<LoadStates>,
    current: LoadStates,
    retry: RetryPolicy,
    next: Option<PageToken>,
    failed: Option<(Edge, Option<PageToken>)>,
}

impl<S> Pager<S>
where
    S: PagingSource,
{
    pub(crate) fn new(
        source: S,
        events: mpsc::UnboundedSender<FeedEvent>,
        states: watch::Sender<LoadStates>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            events,
            states,
            current: LoadStates::default(),
            retry,
            next: None,
            failed: None,
        }
    }
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        self.load(Edge::Refresh, None).await;
        while let Some(command) = commands.recv().await {
            log::debug!("pager command: {command:?}");
            match command {
                Command::LoadMore => self.append().await,
                Command::Retry => self.retry().await,
                Command::Refresh => self.refresh().await,
            }
        }
        log::debug!("pager stopped");
    }
    async fn append(&mut self) {
        if self.current.refresh.is_loading() || self.current.append.is_loading() {
            return;
        }
        if self.failed.is_some() {
            return log::debug!("load more ignored until retry");
        }
        if let Some(token) = self.next {
            self.load(Edge::Append, Some(token)).await;
        }
    }
    async fn retry(&mut self) {
        let Some((edge, token)) = self.failed else {
            return log::debug!("nothing to retry");
        };
        match self.retry {
            RetryPolicy::SamePage => self.load(edge, token).await,
            RetryPolicy::Restart => self.refresh().await,
        }
    }
    async fn refresh(&mut self) {
        self.next = None;
        self.failed = None;
        self.current = LoadStates::default();
        self.states.send_replace(self.current.clone());
        self.emit(FeedEvent::Reset);
        self.load(Edge::Refresh, None).await;
    }
    async fn load(&mut self, edge: Edge, token: Option<PageToken>) {
        self.set_state(edge, LoadState::Loading);
        match self.source.load(token).await {
            Ok(page) => {
                let next = page.next.filter(|next| match token {
                    Some(token) if *next <= token => {
                        log::warn!("next token {next} does not advance past {token}");
                        false
                    }
                    _ => true,
                });
                self.next = next;
                self.failed = None;
                if !page.items.is_empty() {
                    self.emit(FeedEvent::Page(page.items));
                }
                let end_of_stream = next.is_none();
                if edge == Edge::Refresh {
                    self.current.append = LoadState::NotLoading { end_of_stream };
                }
                self.set_state(edge, LoadState::NotLoading { end_of_stream });
            }
            Err(e) => {
                let level = if e.is_remote() {
                    log::Level::Warn
                } else {
                    log::Level::Error
                };
                log::log!(level, "failed to load page {token:?}: {e}");
                self.failed = Some((edge, token));
                self.set_state(edge, LoadState::Error(Arc::new(e)));
            }
        }
    }
    fn set_state(&mut self, edge: Edge, state: LoadState) {
        match edge {
            Edge::Refresh => self.current.refresh = state,
            Edge::Append => self.current.append = state,
        }
        self.states.send_replace(self.current.clone());
        self.emit(FeedEvent::LoadState(self.current.clone()));
    }
    fn emit(&self, event: FeedEvent) {
        if self.events.send(event).is_err() {
            log::debug!("feed events receiver dropped");
        }
    }
}

/// Commands for the pager behind one feed.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    generation: u64,
    source: SourceKind,
    commands: mpsc::UnboundedSender<Command>,
    states: watch::Receiver<LoadStates>,
}

impl FeedHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
    pub fn source(&self) -> SourceKind {
        self.source
    }
    /// Request the next page. Ignored while loading, after an error or at the end.
    pub fn load_more(&self) {
        self.send(Command::LoadMore);
    }
    /// Re-issue the last failed request.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }
    /// Drop all pages and load the first one again.
    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }
    pub fn states(&self) -> LoadStates {
        self.states.borrow().clone()
    }
    fn send(&self, command: Command) {
        if let Err(e) = self.commands.send(command) {
            log::debug!("feed {} is no longer active: {e}", self.generation);
        }
    }
}

/// Items and load states of one feed, in the order they were produced.
#[derive(Debug)]
pub struct FeedEvents {
    generation: u64,
    rx: mpsc::UnboundedReceiver<FeedEvent>,
}

impl FeedEvents {
    pub fn generation(&self) -> u64 {
        self.generation
    }
    /// `None` once the feed has been replaced or dropped.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        self.rx.recv().await
    }
}

impl Stream for FeedEvents {
    type Item = FeedEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// A resolved load request.
#[derive(Debug)]
pub struct Feed {
    pub handle: FeedHandle,
    pub events: FeedEvents,
}

impl Feed {
    pub(crate) fn spawn<S>(
        generation: u64,
        kind: SourceKind,
        source: S,
        retry: RetryPolicy,
    ) -> (Self, tokio::task::JoinHandle<()>)
    where
        S: PagingSource + Send + Sync + 'static,
    {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (states_tx, states_rx) = watch::channel(LoadStates::default());
        let pager = Pager::new(source, events_tx, states_tx, retry);
        let task = tokio::spawn(pager.run(commands_rx));
        let feed = Self {
            handle: FeedHandle {
                generation,
                source: kind,
                commands: commands_tx,
                states: states_rx,
            },
            events: FeedEvents {
                generation,
                rx: events_rx,
            },
        };
        (feed, task)
    }
}
