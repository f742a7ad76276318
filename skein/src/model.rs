//! Persistent entity shapes and the projections handed to callers.
//!
//! Each entity maps to exactly one stored JSON document. References between
//! documents are plain document ids; the engine resolves them with explicit
//! round-trips, the store performs no joins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationIssue, ValidationResult};

/// A user document.
///
/// `doc_id` is the storage-assigned identifier; `id` is the durable external
/// identity supplied by the identity collaborator. Both are carried in the
/// document so either side of a reference can be resolved without a second
/// lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub doc_id: String,
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub onboarded: bool,
    /// Doc ids of threads authored by this user, append-only.
    #[serde(default)]
    pub threads: Vec<String>,
    /// Declared but not exercised by the engine.
    #[serde(default)]
    pub communities: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A thread document. A thread with `parent_id == None` is a root post; any
/// other thread is a reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub doc_id: String,
    pub text: String,
    /// Doc id of the authoring user.
    pub author: String,
    #[serde(default)]
    pub community: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Doc ids of direct replies, in append order.
    #[serde(default)]
    pub children: Vec<String>,
}

impl Thread {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Profile fields accepted by the upsert path. `validated` normalizes the
/// username (lowercased, trimmed) and rejects missing required fields before
/// any write is attempted.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub external_id: String,
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    /// Stored verbatim; the upload collaborator owns URL validity.
    pub image: Option<String>,
}

impl ProfileUpdate {
    pub fn validated(mut self) -> ValidationResult<Self> {
        let mut issues = Vec::new();
        if self.external_id.trim().is_empty() {
            issues.push(ValidationIssue::new(
                "external_id",
                "validation.required",
                "external user id is required",
            ));
        }
        let username = self.username.trim().to_lowercase();
        if username.is_empty() {
            issues.push(ValidationIssue::new(
                "username",
                "validation.required",
                "username is required",
            ));
        }
        if !issues.is_empty() {
            return Err(ValidationError::new(issues));
        }
        self.username = username;
        Ok(self)
    }
}

/// Required-field check for thread bodies. No length policy at this layer.
pub(crate) fn validate_thread_text(text: &str) -> ValidationResult<()> {
    if text.trim().is_empty() {
        return Err(ValidationError::single(
            "text",
            "validation.required",
            "thread text is required",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read projections. No raw document leaves the crate through a read path.
// ---------------------------------------------------------------------------

/// Reduced author projection used at the root of a resolved tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub doc_id: String,
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl Author {
    pub(crate) fn project(user: &User) -> Self {
        Self {
            doc_id: user.doc_id.clone(),
            id: user.id.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

/// Narrow author projection for nested replies. `parent_id` is the reply's
/// own parent pointer, carried here for client-side grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyAuthor {
    pub doc_id: String,
    pub id: String,
    pub name: Option<String>,
    pub parent_id: Option<String>,
    pub image: Option<String>,
}

impl ReplyAuthor {
    pub(crate) fn project(user: &User, parent_id: Option<String>) -> Self {
        Self {
            doc_id: user.doc_id.clone(),
            id: user.id.clone(),
            name: user.name.clone(),
            parent_id,
            image: user.image.clone(),
        }
    }
}

/// Full profile projection resolved for feed items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub doc_id: String,
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
}

impl Profile {
    pub(crate) fn project(user: &User) -> Self {
        Self {
            doc_id: user.doc_id.clone(),
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            bio: user.bio.clone(),
        }
    }
}

/// User projection returned by search and profile lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub doc_id: String,
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub onboarded: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            doc_id: user.doc_id,
            id: user.id,
            username: user.username,
            name: user.name,
            image: user.image,
            bio: user.bio,
            onboarded: user.onboarded,
            created_at: user.created_at,
        }
    }
}

/// Root node of a resolved reply tree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub doc_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<String>,
    /// `None` when the author reference no longer resolves.
    pub author: Option<Author>,
    pub children: Vec<ReplyNode>,
}

/// A resolved reply anywhere below the root.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyNode {
    pub doc_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<String>,
    pub author: Option<ReplyAuthor>,
    /// Empty once the resolution depth is exhausted; deeper replies stay in
    /// storage and need a re-invocation on this node to resolve.
    pub children: Vec<ReplyNode>,
}

/// One root-level post as served by the feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub doc_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub community: Option<String>,
    pub author: Option<Profile>,
    /// Direct replies only; the feed never shows grandchildren inline.
    pub children: Vec<ReplyNode>,
}

/// Narrow author projection for activity entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityAuthor {
    pub doc_id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl ActivityAuthor {
    pub(crate) fn project(user: &User) -> Self {
        Self {
            doc_id: user.doc_id.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

/// A reply someone else left on one of the subject user's threads.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityItem {
    pub doc_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<String>,
    pub author: Option<ActivityAuthor>,
}

/// A user's own posts with one resolved level of replies.
#[derive(Debug, Clone, Serialize)]
pub struct UserPosts {
    pub user: Profile,
    pub threads: Vec<TreeNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            doc_id: "d1".into(),
            id: "ext1".into(),
            username: "alice".into(),
            name: Some("Alice".into()),
            image: Some("https://img.example/a.png".into()),
            bio: None,
            onboarded: true,
            threads: vec!["t1".into()],
            communities: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn profile_update_normalizes_username() {
        let update = ProfileUpdate {
            external_id: "ext1".into(),
            username: "  AliCe  ".into(),
            name: None,
            bio: None,
            image: None,
        }
        .validated()
        .expect("valid update");
        assert_eq!(update.username, "alice");
    }

    #[test]
    fn profile_update_requires_username_and_external_id() {
        let err = ProfileUpdate {
            external_id: " ".into(),
            username: "".into(),
            name: None,
            bio: None,
            image: None,
        }
        .validated()
        .expect_err("must fail");
        let fields: Vec<&str> = err.issues.iter().map(|issue| issue.field.as_str()).collect();
        assert_eq!(fields, ["external_id", "username"]);
    }

    #[test]
    fn thread_text_must_be_non_empty() {
        assert!(validate_thread_text("hello").is_ok());
        assert!(validate_thread_text("   ").is_err());
    }

    #[test]
    fn projections_narrow_the_document() {
        let user = sample_user();
        let author = Author::project(&user);
        assert_eq!(author.id, "ext1");

        let reply_author = ReplyAuthor::project(&user, Some("parent".into()));
        assert_eq!(reply_author.parent_id.as_deref(), Some("parent"));

        let activity = ActivityAuthor::project(&user);
        assert_eq!(activity.doc_id, "d1");
    }

    #[test]
    fn thread_deserializes_with_defaults() {
        let raw = r#"{
            "doc_id": "t1",
            "text": "hello",
            "author": "d1",
            "created_at": "2026-01-01T00:00:00Z"
        }"#;
        let thread: Thread = serde_json::from_str(raw).expect("parse");
        assert!(thread.is_root());
        assert!(thread.children.is_empty());
        assert!(thread.community.is_none());
    }
}
