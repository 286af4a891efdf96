//! Offset pagination over an already filtered and sorted sequence.

use databyte_api_types::{PageResult, Pagination, Record};

/// Cut the half-open window `[(page-1)*limit, (page-1)*limit+limit)` out of `items`.
///
/// A page past the end yields no data but still-valid metadata.
pub fn paginate(items: &[&Record], page: usize, limit: usize) -> PageResult {
    let pagination = Pagination::new(page, limit, items.len());
    let start = pagination.offset().min(items.len());
    let end = start.saturating_add(pagination.limit).min(items.len());

    PageResult {
        data: items[start..end]
            .iter()
            .map(|record| (*record).clone())
            .collect(),
        pagination,
    }
}
