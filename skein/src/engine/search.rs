//! User directory search with pagination.

use regex::{Regex, RegexBuilder};

use crate::errors::EngineError;
use crate::keys::{USERS, USERS_BY_CREATION_INDEX};
use crate::model::{User, UserView};

use super::{Engine, Page, SortOrder, page_offset};

impl Engine {
    /// Search users by case-insensitive substring over username or display
    /// name, excluding the requester, ordered by `created_at` in the chosen
    /// direction.
    ///
    /// Filtering and counting happen engine-side over the creation index's
    /// full ordering: the total is the count of the filtered set, and the
    /// page is a slice of it, so `has_next` follows the same protocol as the
    /// feed.
    pub async fn search_users(
        &self,
        requester_id: &str,
        query: &str,
        page: u64,
        page_size: u64,
        sort: SortOrder,
    ) -> Result<Page<UserView>, EngineError> {
        let offset = page_offset(page, page_size)?;
        let store = self.store();
        let keys = store.keys();
        let index = keys.index(USERS, USERS_BY_CREATION_INDEX);

        let ids = match sort {
            SortOrder::Asc => store.zrange(&index, 0, -1).await?,
            SortOrder::Desc => store.zrevrange(&index, 0, -1).await?,
        };
        let filter = containment_filter(query)?;

        let doc_keys: Vec<String> = ids.iter().map(|id| keys.document(USERS, id)).collect();
        let users = store.get_many::<User>(&doc_keys).await?;
        let matched: Vec<User> = users
            .into_iter()
            .filter(|user| user.id != requester_id)
            .filter(|user| matches_filter(user, filter.as_ref()))
            .collect();

        let total = matched.len() as u64;
        let items: Vec<UserView> = matched
            .into_iter()
            .skip(offset as usize)
            .take(page_size as usize)
            .map(UserView::from)
            .collect();

        Ok(Page::assemble(items, total, page, page_size))
    }
}

/// Case-insensitive containment filter; `None` for an empty or
/// whitespace-only query. The query is matched as a literal substring, not a
/// user-supplied pattern.
fn containment_filter(query: &str) -> Result<Option<Regex>, EngineError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let regex = RegexBuilder::new(&regex::escape(trimmed))
        .case_insensitive(true)
        .build()
        .map_err(|err| EngineError::InvalidRequest {
            message: format!("unusable search query: {err}"),
        })?;
    Ok(Some(regex))
}

fn matches_filter(user: &User, filter: Option<&Regex>) -> bool {
    match filter {
        None => true,
        Some(regex) => {
            regex.is_match(&user.username)
                || user.name.as_deref().is_some_and(|name| regex.is_match(name))
        }
    }
}
