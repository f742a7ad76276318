//! End-to-end engine tests against a live redis-stack server.
//!
//! Every test provisions its own key namespace and cleans it up at the end,
//! so the suite can run against a shared server.

mod support;

use std::time::Duration;

use skein::keys::{THREADS, USERS};
use skein::model::Thread;
use skein::store::AppendOutcome;
use support::*;

#[tokio::test]
async fn hello_hi_scenario() {
    let Some(engine) = engine("hello_hi").await else { return };

    engine
        .upsert_user_profile(profile("ext_alice", "alice"), "/onboarding")
        .await
        .expect("create alice");
    engine
        .upsert_user_profile(profile("ext_bob", "bob"), "/onboarding")
        .await
        .expect("create bob");

    let hello = engine
        .create_thread("hello", "ext_alice", None, "/")
        .await
        .expect("alice posts hello");
    engine
        .add_reply(&hello, "hi", "ext_bob", "/thread")
        .await
        .expect("bob replies hi");
    // A self-reply must never show up in alice's activity.
    engine
        .add_reply(&hello, "hello again", "ext_alice", "/thread")
        .await
        .expect("alice replies to herself");

    let tree = engine.thread_tree(&hello).await.expect("resolve").expect("exists");
    assert_eq!(tree.text, "hello");
    let author = tree.author.expect("root author resolved");
    assert_eq!(author.id, "ext_alice");
    assert_eq!(tree.children.len(), 2);
    let reply = &tree.children[0];
    assert_eq!(reply.text, "hi");
    let reply_author = reply.author.as_ref().expect("reply author resolved");
    assert_eq!(reply_author.id, "ext_bob");
    assert_eq!(reply_author.parent_id.as_deref(), Some(hello.as_str()));

    let activity = engine.activity_for("ext_alice").await.expect("activity");
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].text, "hi");
    let activity_author = activity[0].author.as_ref().expect("activity author resolved");
    assert_eq!(activity_author.name.as_deref(), Some("bob example"));

    let bob_activity = engine.activity_for("ext_bob").await.expect("activity");
    assert!(bob_activity.is_empty());

    cleanup(&engine).await;
}

#[tokio::test]
async fn feed_pagination_order() {
    let Some(engine) = engine("feed_pages").await else { return };

    engine
        .upsert_user_profile(profile("ext_poster", "poster"), "/onboarding")
        .await
        .expect("create poster");
    let x = engine.create_thread("thread x", "ext_poster", None, "/").await.expect("post x");
    // Distinct creation timestamps keep the recency order unambiguous.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let y = engine.create_thread("thread y", "ext_poster", None, "/").await.expect("post y");

    let page1 = engine.feed(1, 1).await.expect("page 1");
    assert_eq!(page1.items.len(), 1);
    assert_eq!(page1.items[0].doc_id, y);
    assert!(page1.has_next);

    let page2 = engine.feed(2, 1).await.expect("page 2");
    assert_eq!(page2.items.len(), 1);
    assert_eq!(page2.items[0].doc_id, x);
    assert!(!page2.has_next);

    // The pages' union equals one un-paged fetch under the same ordering.
    let all = engine.feed(1, 10).await.expect("unpaged");
    let ids: Vec<&str> = all.items.iter().map(|item| item.doc_id.as_str()).collect();
    assert_eq!(ids, [y.as_str(), x.as_str()]);
    assert!(!all.has_next);

    cleanup(&engine).await;
}

#[tokio::test]
async fn reply_links_are_bidirectional() {
    let Some(engine) = engine("reply_links").await else { return };

    engine
        .upsert_user_profile(profile("ext_a", "anna"), "/onboarding")
        .await
        .expect("create anna");
    let parent = engine.create_thread("root", "ext_a", None, "/").await.expect("post");
    let reply = engine.add_reply(&parent, "child", "ext_a", "/thread").await.expect("reply");

    let store = engine.store();
    let keys = store.keys();
    let parent_doc: Thread = store
        .get_json(&keys.document(THREADS, &parent))
        .await
        .expect("fetch parent")
        .expect("parent exists");
    assert!(parent_doc.children.contains(&reply));

    let reply_doc: Thread = store
        .get_json(&keys.document(THREADS, &reply))
        .await
        .expect("fetch reply")
        .expect("reply exists");
    assert_eq!(reply_doc.parent_id.as_deref(), Some(parent.as_str()));

    cleanup(&engine).await;
}

#[tokio::test]
async fn reply_to_missing_thread_is_not_found() {
    let Some(engine) = engine("reply_missing").await else { return };

    engine
        .upsert_user_profile(profile("ext_a", "annika"), "/onboarding")
        .await
        .expect("create user");
    let err = engine
        .add_reply("no-such-thread", "hi", "ext_a", "/thread")
        .await
        .expect_err("must fail");
    assert!(matches!(err, EngineError::NotFound { entity: "thread", .. }));

    cleanup(&engine).await;
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let Some(engine) = engine("username_conflict").await else { return };

    let alice_id = engine
        .upsert_user_profile(profile("ext_1", "alice"), "/onboarding")
        .await
        .expect("create alice");
    // Usernames are lowercased on write, so "ALICE" collides.
    let err = engine
        .upsert_user_profile(profile("ext_2", "ALICE"), "/onboarding")
        .await
        .expect_err("must conflict");
    match err {
        EngineError::UsernameTaken { username, existing_user_id } => {
            assert_eq!(username, "alice");
            assert_eq!(existing_user_id, alice_id);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    cleanup(&engine).await;
}

#[tokio::test]
async fn upsert_updates_profile_and_frees_username() {
    let Some(engine) = engine("upsert_update").await else { return };

    let doc_id = engine
        .upsert_user_profile(profile("ext_1", "alice"), "/onboarding")
        .await
        .expect("create");
    let mut update = profile("ext_1", "wonderland");
    update.bio = Some("down the rabbit hole".to_string());
    let updated_id = engine
        .upsert_user_profile(update, "/profile/edit")
        .await
        .expect("update");
    assert_eq!(doc_id, updated_id);

    let user = engine.fetch_user("ext_1").await.expect("fetch").expect("exists");
    assert_eq!(user.username, "wonderland");
    assert_eq!(user.bio.as_deref(), Some("down the rabbit hole"));
    assert!(user.onboarded);

    // The old username is released and claimable again.
    engine
        .upsert_user_profile(profile("ext_2", "alice"), "/onboarding")
        .await
        .expect("reclaim released username");

    cleanup(&engine).await;
}

#[tokio::test]
async fn search_excludes_requester_and_filters() {
    let Some(engine) = engine("search_users").await else { return };

    engine
        .upsert_user_profile(profile("ext_1", "alice"), "/onboarding")
        .await
        .expect("create alice");
    tokio::time::sleep(Duration::from_millis(5)).await;
    engine
        .upsert_user_profile(profile("ext_2", "bob"), "/onboarding")
        .await
        .expect("create bob");
    tokio::time::sleep(Duration::from_millis(5)).await;
    engine
        .upsert_user_profile(profile("ext_3", "malice"), "/onboarding")
        .await
        .expect("create malice");

    // Empty query: everyone but the requester, newest first.
    let page = engine
        .search_users("ext_2", "", 1, 20, SortOrder::Desc)
        .await
        .expect("search");
    let usernames: Vec<&str> = page.items.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(usernames, ["malice", "alice"]);
    assert!(!page.has_next);

    // Substring filter is case-insensitive and matches anywhere.
    let page = engine
        .search_users("ext_2", "ALI", 1, 1, SortOrder::Asc)
        .await
        .expect("search");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].username, "alice");
    assert_eq!(page.total, 2);
    assert!(page.has_next);

    let page = engine
        .search_users("ext_2", "ALI", 2, 1, SortOrder::Asc)
        .await
        .expect("search");
    assert_eq!(page.items[0].username, "malice");
    assert!(!page.has_next);

    // The requester is excluded even when the query matches them.
    let page = engine
        .search_users("ext_1", "alice", 1, 20, SortOrder::Desc)
        .await
        .expect("search");
    let usernames: Vec<&str> = page.items.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(usernames, ["malice"]);

    cleanup(&engine).await;
}

#[tokio::test]
async fn missing_thread_tree_is_none() {
    let Some(engine) = engine("tree_missing").await else { return };

    let tree = engine.thread_tree("never-created").await.expect("resolve");
    assert!(tree.is_none());

    cleanup(&engine).await;
}

#[tokio::test]
async fn replies_stay_out_of_feed_and_user_threads() {
    let Some(engine) = engine("reply_scope").await else { return };

    engine
        .upsert_user_profile(profile("ext_a", "author"), "/onboarding")
        .await
        .expect("create author");
    engine
        .upsert_user_profile(profile("ext_r", "replier"), "/onboarding")
        .await
        .expect("create replier");
    let root = engine.create_thread("root", "ext_a", None, "/").await.expect("post");
    engine.add_reply(&root, "reply", "ext_r", "/thread").await.expect("reply");

    let page = engine.feed(1, 20).await.expect("feed");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].doc_id, root);

    // Replying does not register the reply among the replier's own posts.
    let posts = engine.user_posts("ext_r").await.expect("posts").expect("exists");
    assert!(posts.threads.is_empty());

    cleanup(&engine).await;
}

#[tokio::test]
async fn replies_resolve_to_depth_two_by_default() {
    let Some(engine) = engine("tree_depth").await else { return };

    engine
        .upsert_user_profile(profile("ext_a", "nester"), "/onboarding")
        .await
        .expect("create user");
    let root = engine.create_thread("level 0", "ext_a", None, "/").await.expect("root");
    let level1 = engine.add_reply(&root, "level 1", "ext_a", "/t").await.expect("level 1");
    let level2 = engine.add_reply(&level1, "level 2", "ext_a", "/t").await.expect("level 2");
    let level3 = engine.add_reply(&level2, "level 3", "ext_a", "/t").await.expect("level 3");

    let tree = engine.thread_tree(&root).await.expect("resolve").expect("exists");
    let first = &tree.children[0];
    assert_eq!(first.doc_id, level1);
    let second = &first.children[0];
    assert_eq!(second.doc_id, level2);
    assert!(second.author.is_some());
    // Depth exhausted: level 3 stays in storage.
    assert!(second.children.is_empty());

    let deeper = engine
        .thread_tree_with_depth(&root, 3)
        .await
        .expect("resolve")
        .expect("exists");
    assert_eq!(deeper.children[0].children[0].children[0].doc_id, level3);

    cleanup(&engine).await;
}

#[tokio::test]
async fn back_reference_append_is_idempotent() {
    let Some(engine) = engine("append_idempotent").await else { return };

    engine
        .upsert_user_profile(profile("ext_a", "appender"), "/onboarding")
        .await
        .expect("create user");
    let thread_id = engine.create_thread("once", "ext_a", None, "/").await.expect("post");

    let store = engine.store();
    let keys = store.keys();
    let user = engine.fetch_user("ext_a").await.expect("fetch").expect("exists");
    let user_key = keys.document(USERS, &user.doc_id);

    // Retrying the linking step reports the reference as already present.
    let outcome = store
        .append_ref(&user_key, "$.threads", &thread_id)
        .await
        .expect("append");
    assert_eq!(outcome, AppendOutcome::AlreadyPresent);

    let doc: skein::model::User = store.get_json(&user_key).await.expect("fetch").expect("exists");
    assert_eq!(doc.threads, [thread_id]);

    cleanup(&engine).await;
}

#[tokio::test]
async fn activity_for_unknown_identity_is_empty() {
    let Some(engine) = engine("activity_unknown").await else { return };

    let activity = engine.activity_for("nobody").await.expect("activity");
    assert!(activity.is_empty());

    cleanup(&engine).await;
}
