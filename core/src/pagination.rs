use anyhow::{Result, bail};
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_PAGE_NUMBER: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: i64,
    pub page_number: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_number: DEFAULT_PAGE_NUMBER,
        }
    }
}

impl Pagination {
    pub fn new(page_size: i64, page_number: i64) -> Result<Self> {
        if page_size < 1 {
            bail!("pageSize must be a positive integer");
        }
        if page_number < 1 {
            bail!("pageNumber must be a positive integer");
        }
        Ok(Self {
            page_size,
            page_number,
        })
    }

    pub fn skip(&self) -> i64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn total_pages(&self, total_count: i64) -> i64 {
        if total_count <= 0 {
            return 0;
        }
        total_count / self.page_size + i64::from(total_count % self.page_size != 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_count: i64,
    pub page_size: i64,
    pub page_number: i64,
    pub total_pages: i64,
    pub skip: i64,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, pagination: Pagination) -> Self {
        Self {
            items,
            info: PageInfo {
                total_count,
                page_size: pagination.page_size,
                page_number: pagination.page_number,
                total_pages: pagination.total_pages(total_count),
                skip: pagination.skip(),
            },
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            info: self.info,
        }
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside
/// `LIKE ? ESCAPE '\'`, then wraps it for a lowercase substring search.
pub fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for ch in keyword.trim().to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_page_of_twenty_five() {
        let pagination = Pagination::new(10, 2).unwrap();
        assert_eq!(pagination.skip(), 10);
        assert_eq!(pagination.limit(), 10);
        assert_eq!(pagination.total_pages(25), 3);
    }

    #[test]
    fn huge_page_size_does_not_overflow() {
        let pagination = Pagination::new(i64::MAX, 1).unwrap();
        assert_eq!(pagination.total_pages(2), 1);
        assert_eq!(pagination.total_pages(i64::MAX), 1);
        assert_eq!(pagination.skip(), 0);
        assert_eq!(Pagination::new(i64::MAX, 3).unwrap().skip(), i64::MAX);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let page = Page::<()>::new(Vec::new(), 0, Pagination::default());
        assert_eq!(page.info.total_pages, 0);
        assert_eq!(page.info.skip, 0);
    }

    #[test]
    fn rejects_non_positive_values() {
        assert!(Pagination::new(0, 1).is_err());
        assert!(Pagination::new(10, 0).is_err());
        assert!(Pagination::new(-5, 1).is_err());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Maize "), "%maize%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
