//! skein - a document-graph retrieval and consistency engine for threaded
//! posts, backed by Redis (RedisJSON documents plus plain index keys).
//!
//! Users author short text threads; any thread can carry nested replies. The
//! store has no referential integrity and no multi-document transactions, so
//! every cross-document invariant - the `author`/`threads` and
//! `parent_id`/`children` link pairs - is maintained procedurally by the
//! [`Engine`]'s mutation sagas, and every read reconstructs its view from
//! flat, independently fetched documents.
//!
//! ```ignore
//! let store = Store::connect("redis://127.0.0.1/", "app").await?;
//! let engine = Engine::new(store);
//!
//! let alice = engine
//!     .upsert_user_profile(profile("user_1", "alice"), "/profile/edit")
//!     .await?;
//! let hello = engine.create_thread("hello", "user_1", None, "/").await?;
//! engine.add_reply(&hello, "hi", "user_2", "/thread").await?;
//!
//! let tree = engine.thread_tree(&hello).await?.expect("thread exists");
//! let page = engine.feed(1, 20).await?;
//! ```

pub mod engine;
pub mod errors;
pub mod id;
pub mod invalidate;
pub mod keys;
pub mod model;
pub mod scripts;
pub mod store;

pub use engine::{Engine, Page, REPLY_DEPTH, SortOrder};
pub use errors::{EngineError, ValidationError, ValidationIssue, ValidationResult};
pub use invalidate::{CacheInvalidator, NoopInvalidator};
pub use model::{
    ActivityAuthor, ActivityItem, Author, FeedItem, Profile, ProfileUpdate, ReplyAuthor, ReplyNode, Thread, TreeNode,
    User, UserPosts, UserView,
};
pub use store::{AppendOutcome, ClaimOutcome, Store};

// Re-export redis types so users don't need to depend on a specific redis version
pub use redis;
pub use redis::aio::ConnectionManager;
