pub(crate) use skein::{Engine, EngineError, ProfileUpdate, SortOrder, Store};

use std::sync::atomic::{AtomicUsize, Ordering};

use skein::id::generate_document_id;

static TEST_NAMESPACE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Engine over a unique key namespace, or `None` when no `REDIS_URL` is
/// exported - the suite stays green without a redis-stack server.
pub(crate) async fn engine(label: &str) -> Option<Engine> {
    let _ = env_logger::builder().is_test(true).try_init();
    let Ok(url) = std::env::var("REDIS_URL") else {
        eprintln!("skipping {label}: set REDIS_URL to run the engine integration tests");
        return None;
    };
    let idx = TEST_NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let salt = generate_document_id();
    let prefix = format!("skein_test_{label}_{idx}_{}", &salt[..8]);
    let store = Store::connect(&url, prefix).await.expect("connect to redis");
    Some(Engine::new(store))
}

pub(crate) fn profile(external_id: &str, username: &str) -> ProfileUpdate {
    ProfileUpdate {
        external_id: external_id.to_string(),
        username: username.to_string(),
        name: Some(format!("{username} example")),
        bio: None,
        image: None,
    }
}

pub(crate) async fn cleanup(engine: &Engine) {
    engine.store().cleanup_namespace().await.expect("namespace cleanup");
}
