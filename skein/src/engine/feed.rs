//! Root-level feed pagination.

use crate::errors::EngineError;
use crate::keys::{ROOTS_INDEX, THREADS};
use crate::model::{FeedItem, Profile, Thread};

use super::tree;
use super::{Engine, Page, page_offset};

impl Engine {
    /// One page of root threads, newest first.
    ///
    /// Ordering comes from the roots index: `created_at` descending, ties
    /// broken by lexicographic document id, so pagination is stable across
    /// pages. Each item resolves its author fully and one level of replies
    /// with narrow authors; the feed never shows grandchildren inline.
    pub async fn feed(&self, page: u64, page_size: u64) -> Result<Page<FeedItem>, EngineError> {
        let offset = page_offset(page, page_size)?;
        let store = self.store();
        let keys = store.keys();
        let roots = keys.index(THREADS, ROOTS_INDEX);

        let ids = store
            .zrevrange(&roots, offset as isize, (offset + page_size - 1) as isize)
            .await?;
        // Separate full-predicate count; not atomic with the page fetch.
        let total = store.zcard(&roots).await?;

        let doc_keys: Vec<String> = ids.iter().map(|id| keys.document(THREADS, id)).collect();
        let threads = store.get_many::<Thread>(&doc_keys).await?;

        let mut items = Vec::with_capacity(threads.len());
        for thread in threads {
            let author = tree::fetch_user_doc(store, &thread.author)
                .await?
                .map(|user| Profile::project(&user));
            let children = tree::reply_nodes(store, &thread.children, 1).await?;
            items.push(FeedItem {
                doc_id: thread.doc_id,
                text: thread.text,
                created_at: thread.created_at,
                community: thread.community,
                author,
                children,
            });
        }

        Ok(Page::assemble(items, total, page, page_size))
    }
}
