//! Multi-document write sequences.
//!
//! Each mutation is a short saga: fixed step order, no cross-step atomicity,
//! no rollback. The first write is the authoritative insert; every later
//! write links it into the graph and surfaces as `PartialWrite` when it
//! fails after the insert committed. Back-reference appends are set-union,
//! so a retried step cannot duplicate a reference.

use chrono::Utc;

use crate::errors::EngineError;
use crate::id::generate_document_id;
use crate::keys::{ROOTS_INDEX, THREADS, USERS, USERS_BY_CREATION_INDEX};
use crate::model::{self, ProfileUpdate, Thread, User};
use crate::store::{AppendOutcome, ClaimOutcome};

use super::Engine;

impl Engine {
    /// Create a root thread and link it into the author's `threads`.
    ///
    /// `community_id` is accepted for interface parity; community wiring is
    /// out of scope and the stored reference is always empty.
    pub async fn create_thread(
        &self,
        text: &str,
        author_external_id: &str,
        community_id: Option<&str>,
        path: &str,
    ) -> Result<String, EngineError> {
        const OP: &str = "create_thread";
        model::validate_thread_text(text)?;
        let author = self.lookup_user(author_external_id).await?.ok_or_else(|| EngineError::NotFound {
            entity: "user",
            id: author_external_id.to_string(),
        })?;
        if let Some(community) = community_id {
            log::debug!("{OP}: ignoring community id {community}");
        }

        let store = self.store();
        let keys = store.keys();
        let doc_id = generate_document_id();
        let thread = Thread {
            doc_id: doc_id.clone(),
            text: text.to_string(),
            author: author.doc_id.clone(),
            community: None,
            created_at: Utc::now(),
            parent_id: None,
            children: Vec::new(),
        };
        store.put_json(&keys.document(THREADS, &doc_id), &thread).await?;

        store
            .zadd(
                &keys.index(THREADS, ROOTS_INDEX),
                thread.created_at.timestamp_millis(),
                &doc_id,
            )
            .await
            .map_err(|err| EngineError::partial(OP, "index_root", err))?;
        store
            .sadd(&keys.reverse_relation(THREADS, "author", &author.doc_id), &doc_id)
            .await
            .map_err(|err| EngineError::partial(OP, "index_author", err))?;
        let appended = store
            .append_ref(&keys.document(USERS, &author.doc_id), "$.threads", &doc_id)
            .await
            .map_err(|err| EngineError::partial(OP, "append_author_threads", err))?;
        if appended == AppendOutcome::MissingDocument {
            return Err(EngineError::partial(
                OP,
                "append_author_threads",
                EngineError::NotFound {
                    entity: "user",
                    id: author.doc_id.clone(),
                },
            ));
        }

        self.notify(path);
        Ok(doc_id)
    }

    /// Add a reply under an existing thread and link it into the parent's
    /// `children`. The replier's own `threads` is deliberately not touched:
    /// replies are not top-level posts.
    pub async fn add_reply(
        &self,
        parent_thread_id: &str,
        text: &str,
        author_external_id: &str,
        path: &str,
    ) -> Result<String, EngineError> {
        const OP: &str = "add_reply";
        model::validate_thread_text(text)?;
        let store = self.store();
        let keys = store.keys();
        let parent_key = keys.document(THREADS, parent_thread_id);
        if !store.exists(&parent_key).await? {
            return Err(EngineError::NotFound {
                entity: "thread",
                id: parent_thread_id.to_string(),
            });
        }
        let author = self.lookup_user(author_external_id).await?.ok_or_else(|| EngineError::NotFound {
            entity: "user",
            id: author_external_id.to_string(),
        })?;

        let doc_id = generate_document_id();
        let reply = Thread {
            doc_id: doc_id.clone(),
            text: text.to_string(),
            author: author.doc_id.clone(),
            community: None,
            created_at: Utc::now(),
            parent_id: Some(parent_thread_id.to_string()),
            children: Vec::new(),
        };
        store.put_json(&keys.document(THREADS, &doc_id), &reply).await?;

        store
            .sadd(&keys.reverse_relation(THREADS, "author", &author.doc_id), &doc_id)
            .await
            .map_err(|err| EngineError::partial(OP, "index_author", err))?;
        let appended = store
            .append_ref(&parent_key, "$.children", &doc_id)
            .await
            .map_err(|err| EngineError::partial(OP, "append_parent_children", err))?;
        if appended == AppendOutcome::MissingDocument {
            return Err(EngineError::partial(
                OP,
                "append_parent_children",
                EngineError::NotFound {
                    entity: "thread",
                    id: parent_thread_id.to_string(),
                },
            ));
        }

        self.notify(path);
        Ok(doc_id)
    }

    /// Find-or-create a user by external id and overwrite the profile
    /// fields. `onboarded` is forced true on every call. Returns the user's
    /// document id.
    ///
    /// The external-id lookup key doubles as the creation arbiter: the claim
    /// is atomic, so concurrent first-time upserts for the same identity
    /// agree on a single document. Field updates themselves are
    /// last-writer-wins; there are no version checks.
    pub async fn upsert_user_profile(&self, update: ProfileUpdate, path: &str) -> Result<String, EngineError> {
        const OP: &str = "upsert_user_profile";
        let update = update.validated()?;
        let store = self.store();
        let keys = store.keys();
        let lookup_key = keys.unique(USERS, "id", &update.external_id);
        let username_key = keys.unique(USERS, "username", &update.username);

        let candidate_id = generate_document_id();
        let doc_id = match store.claim_slot(&lookup_key, &candidate_id).await? {
            ClaimOutcome::Claimed | ClaimOutcome::Held => {
                match store.claim_slot(&username_key, &candidate_id).await? {
                    ClaimOutcome::Claimed | ClaimOutcome::Held => {}
                    ClaimOutcome::Taken { owner } => {
                        // Give the identity slot back before surfacing the
                        // conflict; the upsert committed nothing else yet.
                        store.release_slot(&lookup_key, &candidate_id).await?;
                        return Err(EngineError::UsernameTaken {
                            username: update.username,
                            existing_user_id: owner,
                        });
                    }
                }
                let user = User {
                    doc_id: candidate_id.clone(),
                    id: update.external_id.clone(),
                    username: update.username.clone(),
                    name: update.name.clone(),
                    image: update.image.clone(),
                    bio: update.bio.clone(),
                    onboarded: true,
                    threads: Vec::new(),
                    communities: Vec::new(),
                    created_at: Utc::now(),
                };
                store
                    .put_json(&keys.document(USERS, &candidate_id), &user)
                    .await
                    .map_err(|err| EngineError::partial(OP, "write_user_document", err))?;
                store
                    .zadd(
                        &keys.index(USERS, USERS_BY_CREATION_INDEX),
                        user.created_at.timestamp_millis(),
                        &candidate_id,
                    )
                    .await
                    .map_err(|err| EngineError::partial(OP, "index_user_creation", err))?;
                candidate_id
            }
            ClaimOutcome::Taken { owner } => {
                match store.claim_slot(&username_key, &owner).await? {
                    ClaimOutcome::Claimed | ClaimOutcome::Held => {}
                    ClaimOutcome::Taken { owner: holder } => {
                        return Err(EngineError::UsernameTaken {
                            username: update.username,
                            existing_user_id: holder,
                        });
                    }
                }
                let user_key = keys.document(USERS, &owner);
                match store.get_json::<User>(&user_key).await? {
                    Some(mut user) => {
                        let previous_username = user.username.clone();
                        user.username = update.username.clone();
                        user.name = update.name.clone();
                        user.bio = update.bio.clone();
                        user.image = update.image.clone();
                        user.onboarded = true;
                        store.put_json(&user_key, &user).await?;
                        if previous_username != update.username {
                            let previous_key = keys.unique(USERS, "username", &previous_username);
                            store
                                .release_slot(&previous_key, &owner)
                                .await
                                .map_err(|err| EngineError::partial(OP, "release_previous_username", err))?;
                        }
                    }
                    None => {
                        // Identity slot without a document: an earlier
                        // partial write. Recreate under the same doc id.
                        log::warn!(
                            "recreating missing user document {owner} for external id {}",
                            update.external_id
                        );
                        let user = User {
                            doc_id: owner.clone(),
                            id: update.external_id.clone(),
                            username: update.username.clone(),
                            name: update.name.clone(),
                            image: update.image.clone(),
                            bio: update.bio.clone(),
                            onboarded: true,
                            threads: Vec::new(),
                            communities: Vec::new(),
                            created_at: Utc::now(),
                        };
                        store.put_json(&user_key, &user).await?;
                        store
                            .zadd(
                                &keys.index(USERS, USERS_BY_CREATION_INDEX),
                                user.created_at.timestamp_millis(),
                                &owner,
                            )
                            .await
                            .map_err(|err| EngineError::partial(OP, "index_user_creation", err))?;
                    }
                }
                owner
            }
        };

        self.notify(path);
        Ok(doc_id)
    }
}
