//! Limit/offset pagination envelope

use foodgram_common::config::AppConfig;
use serde::Serialize;

/// A page of results with links to its neighbours
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Resolved paging window for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    pub fn new(config: &AppConfig, limit: Option<u64>, offset: Option<u64>) -> Self {
        Self {
            offset: offset.unwrap_or(0),
            limit: config.page_limit(limit),
        }
    }
}

impl<T> Page<T> {
    /// Build a page; `base` is the absolute URL of the list and `query` the
    /// raw query string the client sent
    pub fn new(results: Vec<T>, count: u64, window: Window, base: &str, query: Option<&str>) -> Self {
        let Window { offset, limit } = window;

        let next = (offset.saturating_add(limit) < count)
            .then(|| page_link(base, query, limit, Some(offset + limit)));

        let previous = (offset > 0).then(|| {
            let previous = offset.saturating_sub(limit);
            page_link(base, query, limit, (previous > 0).then_some(previous))
        });

        Self {
            count,
            next,
            previous,
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// `base` with the client's other parameters kept and limit/offset replaced
fn page_link(base: &str, query: Option<&str>, limit: u64, offset: Option<u64>) -> String {
    let mut params: Vec<String> = query
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| !pair.starts_with("limit=") && !pair.starts_with("offset="))
        .map(String::from)
        .collect();

    params.push(format!("limit={}", limit));
    if let Some(offset) = offset {
        params.push(format!("offset={}", offset));
    }

    format!("{}?{}", base, params.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:8080/api/recipes";

    fn window(offset: u64, limit: u64) -> Window {
        Window { offset, limit }
    }

    #[test]
    fn test_first_page() {
        let page = Page::new(vec![1, 2], 5, window(0, 2), BASE, None);
        assert_eq!(page.next.as_deref(), Some("http://localhost:8080/api/recipes?limit=2&offset=2"));
        assert!(page.previous.is_none());
    }

    #[test]
    fn test_middle_page_keeps_filters() {
        let page = Page::new(vec![3, 4], 5, window(2, 2), BASE, Some("tags=lunch&limit=2&offset=2"));
        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost:8080/api/recipes?tags=lunch&limit=2&offset=4")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://localhost:8080/api/recipes?tags=lunch&limit=2")
        );
    }

    #[test]
    fn test_last_page() {
        let page = Page::new(vec![5], 5, window(4, 2), BASE, None);
        assert!(page.next.is_none());
        assert_eq!(page.previous.as_deref(), Some("http://localhost:8080/api/recipes?limit=2&offset=2"));
    }

    #[test]
    fn test_window_defaults() {
        let config = AppConfig::default();
        assert_eq!(Window::new(&config, None, None), window(0, 6));
        assert_eq!(Window::new(&config, Some(500), Some(3)), window(3, 100));
    }
}
