//! Activity aggregation: replies other users left on a user's threads.

use std::collections::HashSet;

use crate::errors::EngineError;
use crate::keys::THREADS;
use crate::model::{ActivityAuthor, ActivityItem, Thread};

use super::tree;
use super::Engine;

impl Engine {
    /// Replies authored by others on any content this user authored.
    ///
    /// The authored set is everything with `author == user` - roots and the
    /// user's own replies alike - so activity also surfaces replies to
    /// replies. An unknown identity reads as "no activity", matching the
    /// empty-result contract for reads.
    pub async fn activity_for(&self, user_external_id: &str) -> Result<Vec<ActivityItem>, EngineError> {
        let Some(user) = self.lookup_user(user_external_id).await? else {
            return Ok(Vec::new());
        };
        let store = self.store();
        let keys = store.keys();

        let authored_ids = store
            .smembers(&keys.reverse_relation(THREADS, "author", &user.doc_id))
            .await?;
        let authored_keys: Vec<String> = authored_ids.iter().map(|id| keys.document(THREADS, id)).collect();
        let authored = store.get_many::<Thread>(&authored_keys).await?;

        let child_ids = collect_child_ids(&authored);
        let child_keys: Vec<String> = child_ids.iter().map(|id| keys.document(THREADS, id)).collect();

        let mut items = Vec::new();
        for reply in store.get_many::<Thread>(&child_keys).await? {
            if reply.author == user.doc_id {
                continue;
            }
            let author = tree::fetch_user_doc(store, &reply.author)
                .await?
                .map(|user| ActivityAuthor::project(&user));
            items.push(ActivityItem {
                doc_id: reply.doc_id,
                text: reply.text,
                created_at: reply.created_at,
                parent_id: reply.parent_id,
                author,
            });
        }
        Ok(items)
    }
}

/// Union of `children` across the authored set, deduplicated in first-seen
/// order so the same reply cannot surface twice.
fn collect_child_ids(threads: &[Thread]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for thread in threads {
        for child in &thread.children {
            if seen.insert(child.clone()) {
                ids.push(child.clone());
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn thread(doc_id: &str, children: &[&str]) -> Thread {
        Thread {
            doc_id: doc_id.into(),
            text: "t".into(),
            author: "a".into(),
            community: None,
            created_at: Utc::now(),
            parent_id: None,
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn child_ids_are_deduplicated_in_first_seen_order() {
        let threads = [
            thread("t1", &["c1", "c2"]),
            thread("t2", &["c2", "c3", "c1"]),
            thread("t3", &[]),
        ];
        assert_eq!(collect_child_ids(&threads), ["c1", "c2", "c3"]);
    }
}
