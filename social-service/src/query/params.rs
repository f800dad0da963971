use serde::Deserialize;
use utoipa::IntoParams;

use super::{DEFAULT_LIMIT, DEFAULT_PAGE};

/// Query-string parameters accepted by the `/list` endpoints.
///
/// Page and limit are taken as raw strings so that malformed values fall back
/// to the defaults instead of rejecting the request.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Page size (default 10)
    pub limit: Option<String>,
    /// Case-insensitive substring matched against the entity's text columns
    pub search: Option<String>,
    /// Restrict sessions to one user
    pub user_id: Option<String>,
    /// Whose followers to list
    pub following_id: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> i64 {
        positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        positive(self.limit.as_deref()).unwrap_or(DEFAULT_LIMIT)
    }

    pub fn search(&self) -> Option<&str> {
        non_empty(self.search.as_deref())
    }

    pub fn user_id(&self) -> Option<&str> {
        non_empty(self.user_id.as_deref())
    }

    pub fn following_id(&self) -> Option<&str> {
        non_empty(self.following_id.as_deref())
    }
}

fn positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v > 0)
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_paging_falls_back_to_defaults() {
        let params = ListParams {
            page: Some("abc".into()),
            limit: Some("-4".into()),
            ..Default::default()
        };
        assert_eq!(params.page(), DEFAULT_PAGE);
        assert_eq!(params.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_valid_paging_and_blank_search() {
        let params = ListParams {
            page: Some(" 3 ".into()),
            limit: Some("50".into()),
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(params.page(), 3);
        assert_eq!(params.limit(), 50);
        assert_eq!(params.search(), None);
    }
}
