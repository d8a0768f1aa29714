//! Page arithmetic and paged results

use serde::Serialize;
use type_mapping::Record;

/// Offset of a 1-based page. Pages below 1 are treated as the first page.
pub fn page_offset(page: u64, size: u64) -> u64 {
    page.max(1).saturating_sub(1).saturating_mul(size)
}

/// One page of records plus the total row count of the unpaged query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub total: i64,
    pub list: Vec<Record>,
}
