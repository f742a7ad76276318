//! The retrieval and mutation engine.
//!
//! Every invariant between documents (author/threads, parent/children) is
//! maintained procedurally by the mutation paths in this module tree; the
//! store enforces nothing. Reads reconstruct trees and pages from flat,
//! independently fetched documents.

mod activity;
mod feed;
mod mutation;
mod search;
mod tree;

pub use tree::REPLY_DEPTH;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::invalidate::{CacheInvalidator, NoopInvalidator};
use crate::keys::USERS;
use crate::model::{Profile, User, UserPosts, UserView};
use crate::store::Store;

/// Engine handle. Cheap to clone; all operations are independent
/// asynchronous units of work sharing the store's single multiplexed
/// connection, with no cross-operation serialization.
#[derive(Clone)]
pub struct Engine {
    store: Store,
    invalidator: Arc<dyn CacheInvalidator>,
}

impl Engine {
    pub fn new(store: Store) -> Self {
        Self::with_invalidator(store, Arc::new(NoopInvalidator))
    }

    pub fn with_invalidator(store: Store, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        Self { store, invalidator }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Fire the best-effort cache invalidation for a successful mutation.
    pub(crate) fn notify(&self, path: &str) {
        log::debug!("cache invalidation for path {path}");
        self.invalidator.invalidate(path);
    }

    /// Resolve the user document behind an external identity. A dangling
    /// lookup entry resolves to `None` (logged), never an error.
    pub(crate) async fn lookup_user(&self, external_id: &str) -> Result<Option<User>, EngineError> {
        let keys = self.store.keys();
        let lookup = keys.unique(USERS, "id", external_id);
        let Some(doc_id) = self.store.get_string(&lookup).await? else {
            return Ok(None);
        };
        let user = self.store.get_json::<User>(&keys.document(USERS, &doc_id)).await?;
        if user.is_none() {
            log::warn!("external id {external_id} points at missing user document {doc_id}");
        }
        Ok(user)
    }

    /// Fetch a user's profile by external id.
    pub async fn fetch_user(&self, external_id: &str) -> Result<Option<UserView>, EngineError> {
        Ok(self.lookup_user(external_id).await?.map(UserView::from))
    }

    /// The user's own threads, in back-reference order, each with one
    /// resolved level of replies.
    pub async fn user_posts(&self, external_id: &str) -> Result<Option<UserPosts>, EngineError> {
        let Some(user) = self.lookup_user(external_id).await? else {
            return Ok(None);
        };
        let threads = tree::own_threads(&self.store, &user).await?;
        Ok(Some(UserPosts {
            user: Profile::project(&user),
            threads,
        }))
    }
}

/// Sort direction over `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// One page of results plus the pagination protocol's bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// `has_next` holds when the separately counted total exceeds the items
    /// seen through the end of this page. The count and the page fetch are
    /// not atomic with respect to each other; staleness by one page boundary
    /// under concurrent writes is accepted.
    pub(crate) fn assemble(items: Vec<T>, total: u64, page: u64, page_size: u64) -> Self {
        let offset = (page - 1) * page_size;
        let has_next = total > offset + items.len() as u64;
        Self {
            items,
            total,
            page,
            page_size,
            has_next,
        }
    }
}

/// Validate the 1-based page arguments and return the fetch offset.
pub(crate) fn page_offset(page: u64, page_size: u64) -> Result<u64, EngineError> {
    if page < 1 || page_size < 1 {
        return Err(EngineError::InvalidRequest {
            message: format!("page and page_size must be >= 1 (got page={page}, page_size={page_size})"),
        });
    }
    Ok((page - 1) * page_size)
}
