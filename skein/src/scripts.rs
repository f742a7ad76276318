use redis::Script;
use std::sync::LazyLock;

pub const APPEND_REF_SCRIPT_BODY: &str = include_str!("../lua/append_ref.lua");
pub const CLAIM_SLOT_SCRIPT_BODY: &str = include_str!("../lua/claim_slot.lua");
pub const RELEASE_SLOT_SCRIPT_BODY: &str = include_str!("../lua/release_slot.lua");

pub static APPEND_REF_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(APPEND_REF_SCRIPT_BODY));
pub static CLAIM_SLOT_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(CLAIM_SLOT_SCRIPT_BODY));
pub static RELEASE_SLOT_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(RELEASE_SLOT_SCRIPT_BODY));
