use serde::{Deserialize, Serialize};

/// Standard response envelope. Errors render the same shape through
/// `ApiError::into_response`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            meta: None,
        }
    }

    pub fn page(message: impl Into<String>, data: T, meta: PageMeta) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            meta: Some(meta),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        // ceil(total / limit); limit is already clamped to >= 1
        let total_pages = (total + limit - 1) / limit;
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Common pagination/sorting query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl Pagination {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    pub fn order(&self) -> &'static str {
        self.sort_order.unwrap_or(SortOrder::Desc).as_sql()
    }

    /// Resolve the sort column against a whitelist. Unknown columns fall
    /// back to the default rather than reaching the SQL string.
    pub fn order_column(&self, allowed: &[&'static str], default: &'static str) -> &'static str {
        match &self.sort_by {
            Some(requested) => allowed
                .iter()
                .find(|c| **c == requested.as_str())
                .copied()
                .unwrap_or(default),
            None => default,
        }
    }

    pub fn meta(&self, total: i64) -> PageMeta {
        PageMeta::new(self.page(), self.limit(), total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pg(page: Option<i64>, limit: Option<i64>) -> Pagination {
        Pagination {
            page,
            limit,
            sort_by: None,
            sort_order: None,
        }
    }

    #[test]
    fn limit_clamps_to_bounds() {
        assert_eq!(pg(None, None).limit(), 10);
        assert_eq!(pg(None, Some(0)).limit(), 1);
        assert_eq!(pg(None, Some(-5)).limit(), 1);
        assert_eq!(pg(None, Some(1000)).limit(), 100);
        assert_eq!(pg(None, Some(25)).limit(), 25);
    }

    #[test]
    fn page_clamps_to_one() {
        assert_eq!(pg(None, None).page(), 1);
        assert_eq!(pg(Some(0), None).page(), 1);
        assert_eq!(pg(Some(-3), None).page(), 1);
        assert_eq!(pg(Some(7), None).page(), 7);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        assert_eq!(pg(Some(3), Some(20)).offset(), 40);
        assert_eq!(pg(Some(1), Some(10)).offset(), 0);
    }

    #[test]
    fn total_pages_is_ceiling() {
        assert_eq!(PageMeta::new(1, 10, 0).total_pages, 0);
        assert_eq!(PageMeta::new(1, 10, 1).total_pages, 1);
        assert_eq!(PageMeta::new(1, 10, 10).total_pages, 1);
        assert_eq!(PageMeta::new(1, 10, 11).total_pages, 2);
        assert_eq!(PageMeta::new(1, 3, 7).total_pages, 3);
    }

    #[test]
    fn sort_column_whitelist() {
        let mut p = pg(None, None);
        p.sort_by = Some("title".into());
        assert_eq!(p.order_column(&["created_at", "title"], "created_at"), "title");

        p.sort_by = Some("password_hash; DROP TABLE users".into());
        assert_eq!(
            p.order_column(&["created_at", "title"], "created_at"),
            "created_at"
        );

        p.sort_by = None;
        assert_eq!(p.order_column(&["created_at"], "created_at"), "created_at");
    }

    #[test]
    fn envelope_serialization_skips_empty_fields() {
        let body = ApiResponse::ok("created", serde_json::json!({"id": 1}));
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"message\":\"created\""));
        assert!(!json.contains("meta"));
    }
}
