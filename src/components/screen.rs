use super::adapter::{Cell, Footer, ListAdapter};
use super::Component;
use crate::backend::types::{FeedItem, LoadRequest, SourceKind};
use crate::backend::{
    BlockList, Connectivity, Feed, FeedEvent, FeedHandle, PaginationController, RemoteFeed,
};
use crate::config::LayoutConfig;
use crate::types::Action;
use color_eyre::Result;
use std::io::Write;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Receives the item the user tapped.
pub trait ItemSelected {
    fn on_item_selected(&self, item: &FeedItem);
}

/// The browse/search screen: one feed at a time, rendered as a grid.
pub struct MainScreen<R, B, C> {
    controller: PaginationController<R, B, C>,
    adapter: ListAdapter,
    feed: Option<FeedHandle>,
    forward: Option<JoinHandle<()>>,
    title: String,
    cell_width: usize,
    on_selected: Box<dyn ItemSelected>,
    action_tx: UnboundedSender<Action>,
}

impl<R, B, C> MainScreen<R, B, C>
where
    R: RemoteFeed + Send + Sync + 'static,
    B: BlockList + Send + Sync + 'static,
    C: Connectivity,
{
    pub fn new(
        controller: PaginationController<R, B, C>,
        layout: &LayoutConfig,
        prefetch_distance: usize,
        on_selected: Box<dyn ItemSelected>,
        action_tx: UnboundedSender<Action>,
    ) -> Self {
        Self {
            controller,
            adapter: ListAdapter::new(layout.columns, prefetch_distance),
            feed: None,
            forward: None,
            title: String::new(),
            cell_width: layout.cell_width.max(4),
            on_selected,
            action_tx,
        }
    }
    pub fn adapter(&self) -> &ListAdapter {
        &self.adapter
    }
    pub fn generation(&self) -> Option<u64> {
        self.feed.as_ref().map(FeedHandle::generation)
    }
    pub fn open(&mut self) {
        self.load(LoadRequest::trending());
    }
    pub fn submit_search(&mut self, query: &str) {
        self.load(LoadRequest::search(query));
    }
    pub fn clear_search(&mut self) {
        self.load(LoadRequest::trending());
    }
    pub fn show_blocked(&mut self) {
        self.load(LoadRequest::local());
    }
    pub fn load_more(&self) {
        if let Some(feed) = &self.feed {
            feed.load_more();
        }
    }
    pub fn retry(&self) {
        if let Some(feed) = &self.feed {
            feed.retry();
        }
    }
    pub fn refresh(&self) {
        if let Some(feed) = &self.feed {
            feed.refresh();
        }
    }
    pub fn tap(&self, index: usize) {
        let Some(item) = self.adapter.get(index) else {
            return log::warn!("no item at {index}");
        };
        self.on_selected.on_item_selected(item);
        if self.adapter.needs_more(index) {
            self.load_more();
        }
    }
    /// Blocks an item given by id or by its index on screen.
    pub fn hide(&mut self, target: &str) -> crate::backend::Result<String> {
        let id = if self.adapter.contains(target) {
            target.to_string()
        } else if let Some(item) = target.parse().ok().and_then(|i| self.adapter.get(i)) {
            item.id.clone()
        } else {
            target.to_string()
        };
        self.controller.block(&id)?;
        if self.source() == Some(SourceKind::Remote) {
            self.adapter.remove(&id);
        }
        Ok(id)
    }
    pub fn unhide(&mut self, id: &str) -> crate::backend::Result<bool> {
        let removed = self.controller.unblock(id)?;
        if removed && self.source() == Some(SourceKind::Local) {
            self.adapter.remove(id);
        }
        Ok(removed)
    }
    fn source(&self) -> Option<SourceKind> {
        self.feed.as_ref().map(FeedHandle::source)
    }
    fn load(&mut self, request: LoadRequest) {
        if let Some(forward) = self.forward.take() {
            forward.abort();
        }
        self.adapter.clear();
        let (forced, query) = (request.force_local, request.query.clone());
        let Feed { handle, mut events } = self.controller.resolve(request);
        self.title = match (handle.source(), query) {
            (SourceKind::Local, _) if forced => String::from("blocked"),
            (SourceKind::Local, _) => String::from("offline: blocked"),
            (SourceKind::Remote, Some(query)) => format!("search: {query}"),
            (SourceKind::Remote, None) => String::from("trending"),
        };
        let (tx, generation) = (self.action_tx.clone(), handle.generation());
        self.forward = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = tx.send(Action::Feed(generation, event)) {
                    log::error!("failed to send feed event: {e}");
                    break;
                }
            }
        }));
        self.feed = Some(handle);
    }
    fn cell(&self, cell: Cell) -> String {
        match cell {
            Cell::Item(index) => self
                .adapter
                .get(index)
                .map(|item| fit(&format!("[{index}] {}", item.display_title()), self.cell_width))
                .unwrap_or_default(),
            Cell::Footer => {
                let width = self.cell_width * self.adapter.columns();
                match self.adapter.footer() {
                    Footer::Hidden => String::new(),
                    Footer::Loading => fit("loading...", width),
                    Footer::Retry(message) => format!("! {message} (type `retry`)"),
                }
            }
        }
    }
}

impl<R, B, C> Component for MainScreen<R, B, C>
where
    R: RemoteFeed + Send + Sync + 'static,
    B: BlockList + Send + Sync + 'static,
    C: Connectivity,
{
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::Open => self.open(),
            Action::Search(query) => self.submit_search(&query),
            Action::ClearSearch => self.clear_search(),
            Action::ShowBlocked => self.show_blocked(),
            Action::LoadMore => self.load_more(),
            Action::Retry => self.retry(),
            Action::Refresh => self.refresh(),
            Action::Tap(index) => self.tap(index),
            Action::Hide(target) => {
                return Ok(Some(match self.hide(&target) {
                    Ok(id) => {
                        log::info!("hid {id}");
                        Action::Render
                    }
                    Err(e) => Action::Error(format!("failed to hide {target}: {e}")),
                }));
            }
            Action::Unhide(id) => {
                return Ok(Some(match self.unhide(&id) {
                    Ok(_) => Action::Render,
                    Err(e) => Action::Error(format!("failed to unhide {id}: {e}")),
                }));
            }
            Action::Feed(generation, event) => {
                if self.generation() != Some(generation) {
                    log::debug!("drop event of stale feed {generation}");
                    return Ok(None);
                }
                let render = matches!(event, FeedEvent::LoadState(_));
                self.adapter.apply(event);
                if render {
                    return Ok(Some(Action::Render));
                }
            }
            _ => {}
        }
        Ok(None)
    }
    fn draw(&mut self, out: &mut dyn Write) -> Result<()> {
        let width = self.cell_width * self.adapter.columns();
        let header = format!("-- {} ", self.title);
        let rule = "-".repeat(width.saturating_sub(header.chars().count()));
        writeln!(out, "{header}{rule}")?;
        let rows = self.adapter.rows();
        if rows.is_empty() && self.adapter.states().refresh.is_end_of_stream() {
            writeln!(out, "(nothing here)")?;
        }
        for row in rows {
            let line = row
                .into_iter()
                .map(|cell| self.cell(cell))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{}", line.trim_end())?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Pads or truncates `s` to exactly `width` characters.
fn fit(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let mut out = s.chars().take(width.saturating_sub(1)).collect::<String>();
        out.push('~');
        out
    } else {
        format!("{s:<width$}")
    }
}
