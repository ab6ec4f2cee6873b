use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: u32 = 6;
const MAX_LIMIT: u32 = 100;

/// `?page=&limit=` query parameters, 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    page: Option<u32>,
    limit: Option<u32>,
}

impl PageParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as i64
    }

    pub fn offset(&self) -> i64 {
        let page = self.page.unwrap_or(1).max(1) as i64;
        (page - 1) * self.limit()
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_six() {
        let params = PageParams::default();
        assert_eq!(params.limit(), 6);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn clamps_page_and_limit() {
        assert_eq!(PageParams::new(0, 0).offset(), 0);
        assert_eq!(PageParams::new(3, 10).offset(), 20);
        assert_eq!(PageParams::new(1, 1000).limit(), 100);
    }
}
