pub mod block_list;
pub mod connectivity;
mod controller;
mod error;
mod paging;
pub mod remote;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

pub use block_list::BlockList;
pub use connectivity::Connectivity;
pub use controller::PaginationController;
pub use error::{Error, Result};
pub use paging::{Feed, FeedEvent, FeedEvents, FeedHandle, LoadState, LoadStates, RetryPolicy};
pub use remote::RemoteFeed;
