/// Clamp user-supplied paging parameters into a sane window.
pub fn validate_pagination(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, 100);
    (page, limit)
}

/// One page of a larger result set
#[derive(Debug)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = total.div_ceil(u64::from(limit.max(1))) as u32;
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// Slice an in-memory result set into the requested page.
    pub fn from_vec(all: Vec<T>, page: u32, limit: u32) -> Self {
        let total = all.len() as u64;
        let skip = ((page.max(1) - 1) as usize).saturating_mul(limit as usize);
        let items = all.into_iter().skip(skip).take(limit as usize).collect();
        Self::new(items, total, page, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_page_and_limit() {
        assert_eq!(validate_pagination(None, None), (1, 20));
        assert_eq!(validate_pagination(Some(0), Some(1000)), (1, 100));
        assert_eq!(validate_pagination(Some(3), Some(0)), (3, 1));
    }

    #[test]
    fn from_vec_slices_requested_page() {
        let page = PaginatedResult::from_vec((1..=45).collect::<Vec<_>>(), 3, 20);
        assert_eq!(page.items, vec![41, 42, 43, 44, 45]);
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);
    }
}
