//! Offset paging shared by the list queries.

use serde::Serialize;

use super::ValidationError;

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    pub const DEFAULT_SIZE: u32 = 20;
    pub const MAX_SIZE: u32 = 100;

    pub fn new(page: u32, size: u32) -> Result<Self, ValidationError> {
        Self::bounded(page, size, Self::MAX_SIZE)
    }

    /// Builds a request whose size may not exceed `max_size`.
    pub fn bounded(page: u32, size: u32, max_size: u32) -> Result<Self, ValidationError> {
        if size == 0 || size > max_size {
            return Err(ValidationError::out_of_range(
                "size",
                1,
                i64::from(max_size),
                i64::from(size),
            ));
        }
        Ok(Self { page, size })
    }

    pub fn first(size: u32) -> Result<Self, ValidationError> {
        Self::new(0, size)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: Self::DEFAULT_SIZE,
        }
    }
}

/// One page of results together with the totals a client needs to page on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
    pub first: bool,
    pub last: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size());
        let total_pages = (total_elements + size - 1) / size;
        let page = u64::from(request.page());
        let has_next = page + 1 < total_pages;
        Self {
            content,
            page: request.page(),
            size: request.size(),
            total_elements,
            total_pages,
            first: page == 0,
            last: !has_next,
            has_next,
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_oversized_pages() {
        assert!(PageRequest::new(0, 0).is_err());
        assert!(PageRequest::new(0, 101).is_err());
        assert!(PageRequest::bounded(0, 30, 25).is_err());
        assert!(PageRequest::new(3, 100).is_ok());
    }

    #[test]
    fn offset_multiplies_page_by_size() {
        let request = PageRequest::new(2, 25).unwrap();
        assert_eq!(request.offset(), 50);
        assert_eq!(PageRequest::default().offset(), 0);
    }

    #[test]
    fn first_of_two_pages_has_next() {
        let page = Page::new(vec![1, 2], PageRequest::new(0, 2).unwrap(), 3);
        assert_eq!(page.total_pages, 2);
        assert!(page.first);
        assert!(page.has_next);
        assert!(!page.last);
    }

    #[test]
    fn last_page_reports_no_next() {
        let page = Page::new(vec![3], PageRequest::new(1, 2).unwrap(), 3);
        assert!(!page.first);
        assert!(page.last);
        assert!(!page.has_next);
        assert_eq!(page.total_elements, 3);
    }

    #[test]
    fn empty_result_is_single_last_page() {
        let page: Page<u8> = Page::empty(PageRequest::default());
        assert_eq!(page.total_pages, 0);
        assert!(page.first);
        assert!(page.last);
    }

    #[test]
    fn serializes_camel_case_totals() {
        let page = Page::new(vec!["a"], PageRequest::new(0, 1).unwrap(), 2).map(str::to_uppercase);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["content"][0], "A");
        assert_eq!(json["totalElements"], 2);
        assert_eq!(json["totalPages"], 2);
        assert_eq!(json["hasNext"], true);
    }
}
