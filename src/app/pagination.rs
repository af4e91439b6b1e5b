//! Page-number pagination.
//!
//! A [`PageRequest`] is parsed leniently from query strings: a bad page size
//! falls back to the default, an oversized one is clamped, and a page number
//! that is not a positive integer selects no rows at all instead of failing
//! the request.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// `None` when the caller asked for something that can never be a page.
    pub page: Option<u32>,
    pub page_size: u32,
}

impl PageRequest {
    pub fn parse(
        page: Option<&str>,
        page_size: Option<&str>,
        default_size: u32,
        max_size: u32,
    ) -> Self {
        let page = match page.map(str::trim) {
            None | Some("") => Some(1),
            Some(raw) => raw.parse::<u32>().ok().filter(|page| *page >= 1),
        };

        let page_size = page_size
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|size| *size >= 1)
            .map(|size| size.min(max_size))
            .unwrap_or(default_size);

        Self { page, page_size }
    }

    pub fn window(&self, count: i64) -> PageWindow {
        let count = count.max(0);
        let size = i64::from(self.page_size.max(1));
        let total_pages = ((count + size - 1) / size).max(1);
        PageWindow {
            count,
            page_size: self.page_size,
            current_page: self.page.unwrap_or(0),
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }
}

/// A page request resolved against the total number of matching rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub count: i64,
    pub page_size: u32,
    /// 0 when the requested page was not a positive integer.
    pub current_page: u32,
    pub total_pages: u32,
}

impl PageWindow {
    /// Row offset of the current page, or `None` when it holds no rows.
    pub fn offset(&self) -> Option<i64> {
        if self.current_page == 0 {
            return None;
        }
        let offset = i64::from(self.current_page - 1) * i64::from(self.page_size);
        if offset >= self.count {
            return None;
        }
        Some(offset)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn next_page(&self) -> Option<u32> {
        if self.current_page >= 1 && self.current_page < self.total_pages {
            Some(self.current_page + 1)
        } else {
            None
        }
    }

    pub fn previous_page(&self) -> Option<u32> {
        if self.current_page > 1 {
            Some((self.current_page - 1).min(self.total_pages))
        } else {
            None
        }
    }
}
