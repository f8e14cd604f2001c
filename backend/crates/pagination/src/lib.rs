//! Page-number pagination primitives shared by Ladle backend endpoints.
//!
//! List endpoints accept `page` and `limit` query parameters and respond
//! with a `{count, next, previous, results}` envelope. This crate owns the
//! parameter clamping rules and the link rewriting so every endpoint
//! paginates identically.

use serde::Serialize;
use url::form_urlencoded;

/// Default page size applied when the request carries no `limit` parameter.
pub const DEFAULT_PAGE_SIZE: u32 = 6;

/// Hard ceiling on `limit` to keep a single response bounded.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Failures raised while interpreting pagination query parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    /// `page` was present but zero; pages are numbered from one.
    #[error("page numbers start at 1")]
    ZeroPage,
    /// `limit` was present but zero.
    #[error("limit must be at least 1")]
    ZeroLimit,
}

/// Validated pagination window for a single list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Interpret optional `page`/`limit` query parameters.
    ///
    /// Missing values fall back to page 1 and [`DEFAULT_PAGE_SIZE`]; a
    /// `limit` above [`MAX_PAGE_SIZE`] is clamped rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] when either parameter is explicitly zero.
    pub fn from_params(page: Option<u32>, limit: Option<u32>) -> Result<Self, PageError> {
        if page == Some(0) {
            return Err(PageError::ZeroPage);
        }
        if limit == Some(0) {
            return Err(PageError::ZeroLimit);
        }
        Ok(Self {
            page: page.unwrap_or(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
        })
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Number of items per page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Row offset for SQL `OFFSET` clauses.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// Whether `count` total rows leave a page after this one.
    #[must_use]
    pub const fn has_next(&self, count: u64) -> bool {
        (self.page as u64) * (self.limit as u64) < count
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A page of rows together with the total row count, as returned by
/// repository adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOf<T> {
    /// Total number of rows matching the query, across all pages.
    pub count: u64,
    /// Rows belonging to the requested page.
    pub items: Vec<T>,
}

impl<T> PageOf<T> {
    /// Wrap already-sliced rows with their total count.
    #[must_use]
    pub fn new(count: u64, items: Vec<T>) -> Self {
        Self { count, items }
    }

    /// Map the page items while keeping the count.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageOf<U> {
        PageOf {
            count: self.count,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Response envelope serialised to `{count, next, previous, results}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginated<T> {
    /// Total matching rows across all pages.
    pub count: u64,
    /// Link to the following page, when one exists.
    pub next: Option<String>,
    /// Link to the preceding page, when one exists.
    pub previous: Option<String>,
    /// Rows for the current page.
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Build the envelope for `page` given the request path and raw query
    /// string. Filter parameters in the query survive into the page links;
    /// only `page` is rewritten (and `limit` pinned to the clamped value).
    #[must_use]
    pub fn envelope(path: &str, query: &str, request: &PageRequest, page: PageOf<T>) -> Self {
        let next = request
            .has_next(page.count)
            .then(|| page_link(path, query, request, request.page() + 1));
        let previous = (request.page() > 1)
            .then(|| page_link(path, query, request, request.page() - 1));
        Self {
            count: page.count,
            next,
            previous,
            results: page.items,
        }
    }
}

fn page_link(path: &str, query: &str, request: &PageRequest, target_page: u32) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key != "page" && key != "limit" {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.append_pair("page", &target_page.to_string());
    serializer.append_pair("limit", &request.limit().to_string());
    format!("{path}?{}", serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, 1, DEFAULT_PAGE_SIZE)]
    #[case(Some(3), Some(10), 3, 10)]
    #[case(Some(1), Some(500), 1, MAX_PAGE_SIZE)]
    fn from_params_applies_defaults_and_clamping(
        #[case] page: Option<u32>,
        #[case] limit: Option<u32>,
        #[case] expected_page: u32,
        #[case] expected_limit: u32,
    ) {
        let request = PageRequest::from_params(page, limit).unwrap();
        assert_eq!(request.page(), expected_page);
        assert_eq!(request.limit(), expected_limit);
    }

    #[rstest]
    #[case(Some(0), None, PageError::ZeroPage)]
    #[case(None, Some(0), PageError::ZeroLimit)]
    fn from_params_rejects_zero(
        #[case] page: Option<u32>,
        #[case] limit: Option<u32>,
        #[case] expected: PageError,
    ) {
        assert_eq!(PageRequest::from_params(page, limit), Err(expected));
    }

    #[rstest]
    fn offset_reflects_page_number() {
        let request = PageRequest::from_params(Some(4), Some(10)).unwrap();
        assert_eq!(request.offset(), 30);
    }

    #[rstest]
    fn envelope_links_preserve_filters() {
        let request = PageRequest::from_params(Some(2), Some(2)).unwrap();
        let page = PageOf::new(5, vec!["c", "d"]);
        let envelope = Paginated::envelope(
            "/api/recipes/",
            "tags=breakfast&page=2&limit=2",
            &request,
            page,
        );

        assert_eq!(envelope.count, 5);
        assert_eq!(
            envelope.next.as_deref(),
            Some("/api/recipes/?tags=breakfast&page=3&limit=2")
        );
        assert_eq!(
            envelope.previous.as_deref(),
            Some("/api/recipes/?tags=breakfast&page=1&limit=2")
        );
    }

    #[rstest]
    fn envelope_omits_links_at_boundaries() {
        let request = PageRequest::default();
        let page = PageOf::new(3, vec![1, 2, 3]);
        let envelope = Paginated::envelope("/api/users/", "", &request, page);

        assert!(envelope.next.is_none());
        assert!(envelope.previous.is_none());
    }

    #[rstest]
    fn envelope_serialises_expected_shape() {
        let request = PageRequest::default();
        let envelope = Paginated::envelope("/api/tags/", "", &request, PageOf::new(1, vec!["a"]));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["count"], 1);
        assert!(value["next"].is_null());
        assert!(value["previous"].is_null());
        assert_eq!(value["results"][0], "a");
    }
}
