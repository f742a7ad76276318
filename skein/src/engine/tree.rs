//! Reply-tree resolution.

use crate::errors::EngineError;
use crate::keys::{THREADS, USERS};
use crate::model::{Author, ReplyAuthor, ReplyNode, Thread, TreeNode, User};
use crate::store::Store;

use super::Engine;

/// Default resolution depth: a thread's replies, and the replies to those.
pub const REPLY_DEPTH: usize = 2;

impl Engine {
    /// Resolve a thread and its reply tree to the default depth.
    ///
    /// `None` when the thread id does not resolve; callers branch on it
    /// explicitly.
    pub async fn thread_tree(&self, thread_id: &str) -> Result<Option<TreeNode>, EngineError> {
        self.thread_tree_with_depth(thread_id, REPLY_DEPTH).await
    }

    /// Resolve `depth` levels of replies below the root, each level fetched
    /// and author-resolved. Deeper replies stay in storage until a caller
    /// re-invokes resolution on a deeper node.
    pub async fn thread_tree_with_depth(
        &self,
        thread_id: &str,
        depth: usize,
    ) -> Result<Option<TreeNode>, EngineError> {
        let store = self.store();
        let keys = store.keys();
        let Some(thread) = store.get_json::<Thread>(&keys.document(THREADS, thread_id)).await? else {
            return Ok(None);
        };
        let author = author_of(store, &thread.author).await?;
        let children = reply_nodes(store, &thread.children, depth).await?;
        Ok(Some(TreeNode {
            doc_id: thread.doc_id,
            text: thread.text,
            created_at: thread.created_at,
            parent_id: thread.parent_id,
            author,
            children,
        }))
    }
}

/// Resolve reply documents `depth` levels down, narrowing their authors.
///
/// Missing reply documents are skipped (and logged); a missing author leaves
/// `author: None` on an otherwise intact node.
pub(crate) async fn reply_nodes(
    store: &Store,
    child_ids: &[String],
    depth: usize,
) -> Result<Vec<ReplyNode>, EngineError> {
    if depth == 0 || child_ids.is_empty() {
        return Ok(Vec::new());
    }
    let keys = store.keys();
    let mut nodes = Vec::with_capacity(child_ids.len());
    for child_id in child_ids {
        let Some(thread) = store.get_json::<Thread>(&keys.document(THREADS, child_id)).await? else {
            log::warn!("child reference {child_id} points at a missing thread document");
            continue;
        };
        let author = fetch_user_doc(store, &thread.author)
            .await?
            .map(|user| ReplyAuthor::project(&user, thread.parent_id.clone()));
        let children = Box::pin(reply_nodes(store, &thread.children, depth - 1)).await?;
        nodes.push(ReplyNode {
            doc_id: thread.doc_id,
            text: thread.text,
            created_at: thread.created_at,
            parent_id: thread.parent_id,
            author,
            children,
        });
    }
    Ok(nodes)
}

pub(crate) async fn fetch_user_doc(store: &Store, user_doc_id: &str) -> Result<Option<User>, EngineError> {
    let keys = store.keys();
    store.get_json::<User>(&keys.document(USERS, user_doc_id)).await
}

pub(crate) async fn author_of(store: &Store, user_doc_id: &str) -> Result<Option<Author>, EngineError> {
    Ok(fetch_user_doc(store, user_doc_id).await?.map(|user| Author::project(&user)))
}

/// The user's authored threads in back-reference order, each with one
/// resolved level of replies.
pub(crate) async fn own_threads(store: &Store, user: &User) -> Result<Vec<TreeNode>, EngineError> {
    let keys = store.keys();
    let author = Author::project(user);
    let mut threads = Vec::with_capacity(user.threads.len());
    for thread_id in &user.threads {
        let Some(thread) = store.get_json::<Thread>(&keys.document(THREADS, thread_id)).await? else {
            log::warn!("threads back-reference {thread_id} points at a missing thread document");
            continue;
        };
        let children = reply_nodes(store, &thread.children, 1).await?;
        threads.push(TreeNode {
            doc_id: thread.doc_id,
            text: thread.text,
            created_at: thread.created_at,
            parent_id: thread.parent_id,
            author: Some(author.clone()),
            children,
        });
    }
    Ok(threads)
}
