use axum::http::HeaderMap;

use crate::model::BaseTypeId;

/// Caller identity header. Requests without it are anonymous and get a
/// challenge instead of a denial when permission checks fail.
pub const USER_HEADER: &str = "x-cmis-user";

/// Per-request call state threaded through dispatch and error reporting.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub repository_id: Option<String>,
    pub object_id: Option<String>,
    pub base_type_id: Option<BaseTypeId>,
    pub transaction: Option<String>,
    pub username: Option<String>,
}

impl CallContext {
    pub fn new(repository_id: impl Into<String>) -> Self {
        Self {
            repository_id: Some(repository_id.into()),
            ..Self::default()
        }
    }

    pub fn username_from(headers: &HeaderMap) -> Option<String> {
        headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Transaction key component for last-result bookkeeping; requests
    /// without a transaction share the empty key.
    pub fn transaction_key(&self) -> &str {
        self.transaction.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn username_comes_from_header() {
        let mut headers = HeaderMap::new();
        assert!(CallContext::username_from(&headers).is_none());

        headers.insert(USER_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(CallContext::username_from(&headers).as_deref(), Some("alice"));
    }
}
