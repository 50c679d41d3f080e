//! Paginated table query state.
//!
//! Tracks page, page size, search text and sort order for a server-side
//! paginated table and turns them into query parameters. Two parameter
//! dialects exist on the backend: clinic endpoints take camel-case keys and
//! `search`, shuttle endpoints take snake-case keys and `filter`.

#[cfg(test)]
#[path = "table_test.rs"]
mod table_test;

use crate::net::api::Params;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamStyle {
    /// `page`, `pageSize`, `search`, `sortColumn`, `sortDesc`.
    Clinic,
    /// `page`, `page_size`, `filter`, `sort_column`, `sort_desc`.
    Shuttle,
}

/// One sorted column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub id: String,
    pub desc: bool,
}

impl SortKey {
    #[must_use]
    pub fn asc(id: &str) -> Self {
        Self { id: id.to_owned(), desc: false }
    }

    #[must_use]
    pub fn desc(id: &str) -> Self {
        Self { id: id.to_owned(), desc: true }
    }

    /// Parse `column` or `-column` (descending).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.strip_prefix('-') {
            Some(id) if !id.is_empty() => Some(Self::desc(id)),
            Some(_) => None,
            None if !raw.is_empty() => Some(Self::asc(raw)),
            None => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableQuery {
    page_index: u32,
    page_size: u32,
    search: String,
    sorting: Vec<SortKey>,
    last_page: Option<u32>,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl TableQuery {
    /// A page size of zero falls back to the default.
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        Self { page_index: 0, page_size, search: String::new(), sorting: Vec::new(), last_page: None }
    }

    #[must_use]
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// One-based page number sent to the backend.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page_index + 1
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub fn sorting(&self) -> &[SortKey] {
        &self.sorting
    }

    #[must_use]
    pub fn last_page(&self) -> Option<u32> {
        self.last_page
    }

    /// New search text starts over from the first page.
    pub fn set_search(&mut self, search: &str) {
        if self.search != search {
            self.search = search.to_owned();
            self.page_index = 0;
        }
    }

    pub fn set_sorting(&mut self, sorting: Vec<SortKey>) {
        self.sorting = sorting;
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        if page_size > 0 && page_size != self.page_size {
            self.page_size = page_size;
            self.page_index = 0;
        }
    }

    /// Record the backend's `last_page` and pull the index back in range.
    pub fn set_last_page(&mut self, last_page: u32) {
        let last_page = last_page.max(1);
        self.last_page = Some(last_page);
        self.page_index = self.page_index.min(last_page - 1);
    }

    /// Jump to a zero-based page, clamped once the page count is known.
    pub fn go_to(&mut self, page_index: u32) {
        self.page_index = match self.last_page {
            Some(last_page) => page_index.min(last_page - 1),
            None => page_index,
        };
    }

    #[must_use]
    pub fn can_previous(&self) -> bool {
        self.page_index > 0
    }

    /// Unknown page counts allow moving forward.
    #[must_use]
    pub fn can_next(&self) -> bool {
        self.last_page.is_none_or(|last_page| self.page_index + 1 < last_page)
    }

    pub fn next_page(&mut self) {
        if self.can_next() {
            self.page_index += 1;
        }
    }

    pub fn previous_page(&mut self) {
        self.page_index = self.page_index.saturating_sub(1);
    }

    /// Sort ids joined with commas, in priority order.
    #[must_use]
    pub fn sort_column(&self) -> String {
        self.sorting.iter().map(|key| key.id.as_str()).collect::<Vec<_>>().join(",")
    }

    /// True when any sorted column is descending.
    #[must_use]
    pub fn sort_desc(&self) -> bool {
        self.sorting.iter().any(|key| key.desc)
    }

    /// Query parameters in the given dialect. Empty search and sort
    /// values are omitted; `sort_desc` is always sent.
    #[must_use]
    pub fn to_params(&self, style: ParamStyle) -> Params {
        let (size_key, search_key, column_key, desc_key) = match style {
            ParamStyle::Clinic => ("pageSize", "search", "sortColumn", "sortDesc"),
            ParamStyle::Shuttle => ("page_size", "filter", "sort_column", "sort_desc"),
        };
        let mut params = vec![
            ("page".to_owned(), self.page().to_string()),
            (size_key.to_owned(), self.page_size.to_string()),
        ];
        let search = self.search.trim();
        if !search.is_empty() {
            params.push((search_key.to_owned(), search.to_owned()));
        }
        let column = self.sort_column();
        if !column.is_empty() {
            params.push((column_key.to_owned(), column));
        }
        params.push((desc_key.to_owned(), self.sort_desc().to_string()));
        params
    }
}
