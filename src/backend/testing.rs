//! In-memory doubles of the feed collaborators.

use super::block_list::{BlockList, MemoryBlockList};
use super::error::{Error, Result};
use super::paging::{Feed, FeedEvent};
use super::remote::RemoteFeed;
use super::types::{BlockedEntry, FeedItem, Page, PageToken};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time;

type Key = (Option<String>, Option<PageToken>);

pub(crate) fn item(id: &str) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        title: format!("{id} title"),
        url: None,
        preview: None,
        rating: None,
    }
}

pub(crate) fn items(items: &[FeedItem]) -> Vec<String> {
    items.iter().map(|item| item.id.clone()).collect()
}

pub(crate) async fn next_event(feed: &mut Feed) -> FeedEvent {
    time::timeout(Duration::from_secs(5), feed.events.next())
        .await
        .expect("timed out waiting for feed event")
        .expect("feed closed")
}

#[derive(Default)]
struct Inner {
    responses: Mutex<HashMap<Key, VecDeque<Result<Page, String>>>>,
    calls: Mutex<Vec<Key>>,
    gates: Mutex<HashMap<Option<String>, Arc<Notify>>>,
}

/// Scripted remote feed. The last response for a key is repeated forever.
#[derive(Clone, Default)]
pub(crate) struct MockRemote {
    inner: Arc<Inner>,
}

impl MockRemote {
    pub(crate) fn new() -> Self {
        Self::default()
    }
    fn push(self, key: Key, response: Result<Page, String>) -> Self {
        self.inner
            .responses
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(response);
        self
    }
    pub(crate) fn page(self, query: &str, token: Option<u32>, ids: &[&str], next: Option<u32>) -> Self {
        self.query_page(Some(query), token, ids, next)
    }
    pub(crate) fn query_page(
        self,
        query: Option<&str>,
        token: Option<u32>,
        ids: &[&str],
        next: Option<u32>,
    ) -> Self {
        let page = Page {
            items: ids.iter().map(|id| item(id)).collect(),
            next: next.map(PageToken),
        };
        self.push((query.map(String::from), token.map(PageToken)), Ok(page))
    }
    pub(crate) fn failure(self, query: &str, token: Option<u32>, message: &str) -> Self {
        self.push(
            (Some(query.to_string()), token.map(PageToken)),
            Err(message.to_string()),
        )
    }
    /// Fetches for `query` wait until the returned gate is notified.
    pub(crate) fn gate(&self, query: &str) -> Arc<Notify> {
        self.inner
            .gates
            .lock()
            .unwrap()
            .entry(Some(query.to_string()))
            .or_default()
            .clone()
    }
    pub(crate) fn calls(&self) -> Vec<Key> {
        self.inner.calls.lock().unwrap().clone()
    }
    pub(crate) async fn wait_for_calls(&self, n: usize) {
        time::timeout(Duration::from_secs(5), async {
            while self.calls().len() < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("timed out waiting for fetch");
    }
}

impl RemoteFeed for MockRemote {
    fn fetch_page(
        &self,
        query: Option<&str>,
        token: Option<PageToken>,
    ) -> impl Future<Output = Result<Page>> + Send {
        let key = (query.map(String::from), token);
        let inner = self.inner.clone();
        async move {
            inner.calls.lock().unwrap().push(key.clone());
            let gate = inner.gates.lock().unwrap().get(&key.0).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            let response = {
                let mut responses = inner.responses.lock().unwrap();
                match responses.get_mut(&key) {
                    Some(queue) if queue.len() > 1 => queue.pop_front(),
                    Some(queue) => queue.front().cloned(),
                    None => None,
                }
            };
            match response {
                Some(Ok(page)) => Ok(page),
                Some(Err(message)) => Err(Error::Status {
                    status: 500,
                    message,
                }),
                None => Err(Error::Status {
                    status: 404,
                    message: format!("no page for {key:?}"),
                }),
            }
        }
    }
}

/// Block list that counts how often it is touched.
#[derive(Default)]
pub(crate) struct CountingBlockList {
    inner: MemoryBlockList,
    pub(crate) reads: AtomicUsize,
}

impl CountingBlockList {
    pub(crate) fn with_ids(ids: &[&str]) -> Self {
        Self {
            inner: MemoryBlockList::with_ids(ids.iter().copied()),
            ..Default::default()
        }
    }
    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
    pub(crate) fn ids(&self) -> Vec<String> {
        self.inner
            .list_all()
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    }
}

impl BlockList for CountingBlockList {
    fn insert(&self, entry: BlockedEntry) -> Result<()> {
        self.inner.insert(entry)
    }
    fn remove(&self, id: &str) -> Result<bool> {
        self.inner.remove(id)
    }
    fn list_all(&self) -> Result<Vec<BlockedEntry>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list_all()
    }
}

pub(crate) struct FailingBlockList;

impl BlockList for FailingBlockList {
    fn insert(&self, _: BlockedEntry) -> Result<()> {
        Err(Error::LocalStore(String::from("disk unavailable")))
    }
    fn remove(&self, _: &str) -> Result<bool> {
        Err(Error::LocalStore(String::from("disk unavailable")))
    }
    fn list_all(&self) -> Result<Vec<BlockedEntry>> {
        Err(Error::LocalStore(String::from("disk unavailable")))
    }
}
