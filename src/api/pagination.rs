//! Page/pageSize handling for the list routes

use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;

/// Query parameters accepted by list routes
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// Pagination metadata returned alongside a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total: usize,
    #[serde(skip)]
    pub offset: usize,
}

/// Work out which slice of `total` results a request asks for.
///
/// The page size defaults to `default_limit` and is clamped to
/// `[1, max_limit]`. Pages past the end yield an empty slice.
pub fn calculate_pagination(total: usize, params: PageParams, limits: &ApiConfig) -> Pagination {
    let max = limits.max_limit.max(1);
    let page_size = params
        .page_size
        .unwrap_or(limits.default_limit)
        .clamp(1, max);
    let page = params.page.unwrap_or(1).max(1);

    Pagination {
        page,
        page_size,
        page_count: total.div_ceil(page_size),
        total,
        offset: (page - 1).saturating_mul(page_size),
    }
}

impl Pagination {
    /// Apply this page to a full result list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.page_size)
            .collect()
    }
}
