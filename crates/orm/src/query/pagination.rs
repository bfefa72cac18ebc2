//! Query Builder pagination operations

use super::builder::QueryBuilder;

/// SQLite reads LIMIT and OFFSET as signed 64-bit integers
const MAX_ROWS: u64 = i64::MAX as u64;

impl QueryBuilder<'_> {
    /// Add LIMIT clause, clamped to `i64::MAX`
    pub fn limit(&mut self, count: u64) -> &mut Self {
        self.state.limit_count = Some(count.min(MAX_ROWS));
        self
    }

    /// Add OFFSET clause, clamped to `i64::MAX`
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.state.offset_value = Some(offset.min(MAX_ROWS));
        self
    }

    /// Limit to one page of `per_page` rows; pages start at 1
    pub fn paginate(&mut self, per_page: u64, page: u64) -> &mut Self {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        self.limit(per_page).offset(offset)
    }
}
