use super::block_list::BlockList;
use super::connectivity::Connectivity;
use super::error::Result;
use super::paging::{Feed, LocalSource, RemoteSource, RetryPolicy};
use super::remote::RemoteFeed;
use super::types::{BlockedEntry, LoadRequest, SourceKind};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Resolves load requests into feeds, keeping at most one feed active.
pub struct PaginationController<R, B, C> {
    remote: Arc<R>,
    block_list: Arc<B>,
    connectivity: C,
    retry: RetryPolicy,
    generation: u64,
    active: Option<JoinHandle<()>>,
}

impl<R, B, C> PaginationController<R, B, C>
where
    R: RemoteFeed + Send + Sync + 'static,
    B: BlockList + Send + Sync + 'static,
    C: Connectivity,
{
    pub fn new(remote: Arc<R>, block_list: Arc<B>, connectivity: C, retry: RetryPolicy) -> Self {
        Self {
            remote,
            block_list,
            connectivity,
            retry,
            generation: 0,
            active: None,
        }
    }
    /// The block list wins when it is forced or when the network is unreachable.
    pub fn source_for(&self, request: &LoadRequest) -> SourceKind {
        if request.force_local || !self.connectivity.is_connected() {
            SourceKind::Local
        } else {
            SourceKind::Remote
        }
    }
    /// Replaces the active feed with a new one for `request`.
    ///
    /// The previous pager is aborted, so pages it was still fetching are never
    /// delivered. Must be called from within a tokio runtime.
    pub fn resolve(&mut self, request: LoadRequest) -> Feed {
        self.cancel();
        self.generation += 1;
        let kind = self.source_for(&request);
        log::info!(
            "resolve feed {} ({kind:?}, query: {:?})",
            self.generation,
            request.query
        );
        let (feed, task) = match kind {
            SourceKind::Local => Feed::spawn(
                self.generation,
                kind,
                LocalSource::new(self.block_list.clone()),
                self.retry,
            ),
            SourceKind::Remote => Feed::spawn(
                self.generation,
                kind,
                RemoteSource::new(self.remote.clone(), request.query),
                self.retry,
            ),
        };
        self.active = Some(task);
        feed
    }
    /// Stops the active feed, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.active.take() {
            log::debug!("cancel feed {}", self.generation);
            task.abort();
        }
    }
    pub fn generation(&self) -> u64 {
        self.generation
    }
    pub fn block(&self, id: &str) -> Result<()> {
        self.block_list.insert(BlockedEntry::new(id))
    }
    pub fn unblock(&self, id: &str) -> Result<bool> {
        self.block_list.remove(id)
    }
}

impl<R, B, C> Drop for PaginationController<R, B, C> {
    fn drop(&mut self) {
        if let Some(task) = self.active.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::connectivity::Fixed;
    use crate::backend::paging::FeedEvent;
    use crate::backend::testing::{items, next_event, CountingBlockList, MockRemote};
    use crate::backend::types::PageToken;

    fn controller(
        remote: &MockRemote,
        block_list: &Arc<CountingBlockList>,
        connected: bool,
    ) -> PaginationController<MockRemote, CountingBlockList, Fixed> {
        PaginationController::new(
            Arc::new(remote.clone()),
            block_list.clone(),
            Fixed(connected),
            RetryPolicy::SamePage,
        )
    }

    /// Collects events until no edge is loading any more.
    async fn settle(feed: &mut Feed) -> (Vec<String>, Vec<(bool, bool)>) {
        let (mut received, mut transitions) = (Vec::new(), Vec::new());
        loop {
            match next_event(feed).await {
                FeedEvent::Page(page) => received.extend(items(&page)),
                FeedEvent::LoadState(states) => {
                    transitions.push((states.refresh.is_loading(), states.append.is_loading()));
                    if !states.refresh.is_loading() && !states.append.is_loading() {
                        return (received, transitions);
                    }
                }
                FeedEvent::Reset => received.clear(),
            }
        }
    }

    #[tokio::test]
    async fn force_local_lists_block_list() {
        let remote = MockRemote::new();
        let block_list = Arc::new(CountingBlockList::with_ids(&["g1", "g2", "g3"]));
        let mut controller = controller(&remote, &block_list, true);
        let mut feed = controller.resolve(LoadRequest::new(Some("cats"), true));
        assert_eq!(feed.handle.source(), SourceKind::Local);
        let (received, _) = settle(&mut feed).await;
        assert_eq!(received, ["g1", "g2", "g3"]);
        let states = feed.handle.states();
        assert!(states.refresh.is_end_of_stream());
        assert!(states.append.is_end_of_stream());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn offline_falls_back_to_block_list() {
        let remote = MockRemote::new();
        let block_list = Arc::new(CountingBlockList::with_ids(&["g1", "g2"]));
        let mut controller = controller(&remote, &block_list, false);
        let request = LoadRequest::new(None, false);
        assert_eq!(controller.source_for(&request), SourceKind::Local);
        let mut feed = controller.resolve(request);
        let (received, _) = settle(&mut feed).await;
        assert_eq!(received, ["g1", "g2"]);
        assert!(feed.handle.states().refresh.is_end_of_stream());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn remote_pages_in_order() {
        let remote = MockRemote::new()
            .page("cats", None, &["a", "b"], Some(2))
            .page("cats", Some(2), &["c"], None);
        let block_list = Arc::new(CountingBlockList::with_ids(&["g1"]));
        let mut controller = controller(&remote, &block_list, true);
        let mut feed = controller.resolve(LoadRequest::search("cats"));
        assert_eq!(feed.handle.source(), SourceKind::Remote);

        let (first, refresh) = settle(&mut feed).await;
        assert_eq!(first, ["a", "b"]);
        assert_eq!(refresh, [(true, false), (false, false)]);
        assert!(!feed.handle.states().append.is_end_of_stream());

        feed.handle.load_more();
        let (second, append) = settle(&mut feed).await;
        assert_eq!(second, ["c"]);
        assert_eq!(append, [(false, true), (false, false)]);
        assert!(feed.handle.states().append.is_end_of_stream());

        assert_eq!(
            remote.calls(),
            [
                (Some(String::from("cats")), None),
                (Some(String::from("cats")), Some(PageToken(2))),
            ]
        );
        assert_eq!(block_list.reads(), 0);
    }

    #[tokio::test]
    async fn trending_without_query() {
        let remote = MockRemote::new().query_page(None, None, &["t1"], None);
        let block_list = Arc::new(CountingBlockList::default());
        let mut controller = controller(&remote, &block_list, true);
        let mut feed = controller.resolve(LoadRequest::new(Some("  "), false));
        let (received, _) = settle(&mut feed).await;
        assert_eq!(received, ["t1"]);
        assert_eq!(remote.calls(), [(None, None)]);
    }

    #[tokio::test]
    async fn error_then_retry_same_page() {
        let remote = MockRemote::new()
            .failure("cats", None, "unavailable")
            .page("cats", None, &["a"], None);
        let block_list = Arc::new(CountingBlockList::default());
        let mut controller = controller(&remote, &block_list, true);
        let mut feed = controller.resolve(LoadRequest::search("cats"));

        let (received, _) = settle(&mut feed).await;
        assert!(received.is_empty());
        let states = feed.handle.states();
        let error = states.refresh.error().expect("expected refresh error");
        assert!(error.is_remote());
        assert!(error.to_string().contains("unavailable"));

        // Paging is stuck on the failed page until retried
        feed.handle.load_more();
        feed.handle.retry();
        let (received, _) = settle(&mut feed).await;
        assert_eq!(received, ["a"]);
        assert_eq!(
            remote.calls(),
            [
                (Some(String::from("cats")), None),
                (Some(String::from("cats")), None),
            ]
        );
    }

    #[tokio::test]
    async fn replaced_feed_delivers_nothing() {
        let remote = MockRemote::new()
            .page("slow", None, &["stale"], None)
            .page("fast", None, &["fresh"], None);
        let gate = remote.gate("slow");
        let block_list = Arc::new(CountingBlockList::default());
        let mut controller = controller(&remote, &block_list, true);

        let mut old = controller.resolve(LoadRequest::search("slow"));
        remote.wait_for_calls(1).await;
        let mut new = controller.resolve(LoadRequest::search("fast"));
        assert_eq!(new.handle.generation(), old.handle.generation() + 1);
        gate.notify_one();

        let (received, _) = settle(&mut new).await;
        assert_eq!(received, ["fresh"]);
        while let Some(event) = old.events.next().await {
            assert!(!matches!(event, FeedEvent::Page(_)), "stale page delivered");
        }
        old.handle.load_more();
        assert!(old.handle.states().refresh.is_loading());
    }

    #[tokio::test]
    async fn local_store_failure_is_terminal() {
        let remote = MockRemote::new();
        let mut controller = PaginationController::new(
            Arc::new(remote.clone()),
            Arc::new(crate::backend::testing::FailingBlockList),
            Fixed(false),
            RetryPolicy::SamePage,
        );
        let mut feed = controller.resolve(LoadRequest::trending());
        let (received, _) = settle(&mut feed).await;
        assert!(received.is_empty());
        let states = feed.handle.states();
        assert!(matches!(
            states.refresh.error(),
            Some(crate::backend::Error::LocalStore(_))
        ));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn block_inserts_entry() {
        let remote = MockRemote::new();
        let block_list = Arc::new(CountingBlockList::with_ids(&["g1"]));
        let controller = controller(&remote, &block_list, true);
        controller.block("g2").expect("failed to block");
        controller.block("g1").expect("failed to block");
        assert_eq!(block_list.ids(), ["g1", "g2"]);
        assert!(controller.unblock("g1").expect("failed to unblock"));
        assert_eq!(block_list.ids(), ["g2"]);
    }
}
