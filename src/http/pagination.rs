use serde::Serialize;
use std::ops::RangeInclusive;
use url::Url;

use crate::app::pagination::PageWindow;

/// Most page links listed in `pages`, centred on the current page.
const MAX_PAGE_LINKS: u32 = 10;

#[derive(Debug, Serialize)]
pub struct PageLink {
    pub page: u32,
    pub url: String,
    pub is_current: bool,
}

/// Paginated response envelope shared by the feed, dashboard and search.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub total_pages: u32,
    pub current_page: u32,
    pub page_size: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub pages: Vec<PageLink>,
    pub results: T,
}

/// Builds absolute page links for one request path, carrying the search text
/// and page size along.
#[derive(Debug, Clone)]
pub struct PageLinks {
    base: Url,
    search: Option<String>,
}

impl PageLinks {
    pub fn new(public_base_url: &Url, path: &str, search: Option<&str>) -> Self {
        let base = public_base_url
            .join(path.trim_start_matches('/'))
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, path = path, "failed to build page link base");
                public_base_url.clone()
            });
        Self {
            base,
            search: search
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
        }
    }

    pub fn page_url(&self, page: u32, page_size: u32) -> String {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            if let Some(search) = &self.search {
                query.append_pair("search", search);
            }
            query.append_pair("page", &page.to_string());
            query.append_pair("page_size", &page_size.to_string());
        }
        url.to_string()
    }

    pub fn envelope<T>(&self, window: PageWindow, results: T) -> Paginated<T> {
        let size = window.page_size;
        Paginated {
            count: window.count,
            total_pages: window.total_pages,
            current_page: window.current_page,
            page_size: size,
            next: window.next_page().map(|page| self.page_url(page, size)),
            previous: window.previous_page().map(|page| self.page_url(page, size)),
            pages: page_range(&window)
                .map(|page| PageLink {
                    page,
                    url: self.page_url(page, size),
                    is_current: page == window.current_page,
                })
                .collect(),
            results,
        }
    }
}

fn page_range(window: &PageWindow) -> RangeInclusive<u32> {
    let total = window.total_pages.max(1);
    let current = window.current_page.clamp(1, total);
    let last_start = total.saturating_sub(MAX_PAGE_LINKS - 1).max(1);
    let start = current
        .saturating_sub(MAX_PAGE_LINKS / 2)
        .max(1)
        .min(last_start);
    start..=(start + MAX_PAGE_LINKS - 1).min(total)
}
