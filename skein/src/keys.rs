/// Service segment shared by every key the engine writes.
pub const SERVICE: &str = "skein";

/// Collection name for user documents.
pub const USERS: &str = "users";
/// Collection name for thread documents.
pub const THREADS: &str = "threads";

/// Name of the root-thread recency index (sorted set scored by epoch-ms).
pub const ROOTS_INDEX: &str = "roots";
/// Name of the user recency index (sorted set scored by epoch-ms).
pub const USERS_BY_CREATION_INDEX: &str = "by_creation";

/// Common key-construction helpers used across the engine.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub service: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, service: &'a str) -> Self {
        Self { prefix, service }
    }

    /// Key holding one entity document.
    pub fn document(&self, collection: &str, doc_id: &str) -> String {
        format!("{}:{}:{}:{}", self.prefix, self.service, collection, doc_id)
    }

    /// Key reserving a unique field value; its string value is the owning
    /// document id.
    pub fn unique(&self, collection: &str, field: &str, value: &str) -> String {
        format!("{}:{}:{}:unique:{}:{}", self.prefix, self.service, collection, field, value)
    }

    /// Sorted-set index over a collection (recency indexes).
    pub fn index(&self, collection: &str, name: &str) -> String {
        format!("{}:{}:{}:idx:{}", self.prefix, self.service, collection, name)
    }

    /// Reverse-relation set - all documents of `collection` whose `alias`
    /// reference points at `right_id`.
    pub fn reverse_relation(&self, collection: &str, alias: &str, right_id: &str) -> String {
        format!(
            "{}:{}:{}:rev_rel:{}:{}",
            self.prefix, self.service, collection, alias, right_id
        )
    }

    /// Glob pattern matching every key in this namespace.
    pub fn service_pattern(&self) -> String {
        format!("{}:{}:*", self.prefix, self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_document_keys() {
        let ctx = KeyContext::new("app", "skein");
        assert_eq!(ctx.document(THREADS, "abc"), "app:skein:threads:abc");
    }

    #[test]
    fn builds_unique_and_index_keys() {
        let ctx = KeyContext::new("app", "skein");
        assert_eq!(ctx.unique(USERS, "username", "alice"), "app:skein:users:unique:username:alice");
        assert_eq!(ctx.index(THREADS, ROOTS_INDEX), "app:skein:threads:idx:roots");
        assert_eq!(
            ctx.reverse_relation(THREADS, "author", "u1"),
            "app:skein:threads:rev_rel:author:u1"
        );
    }

    #[test]
    fn service_pattern_covers_namespace() {
        let ctx = KeyContext::new("app", "skein");
        assert_eq!(ctx.service_pattern(), "app:skein:*");
    }
}
