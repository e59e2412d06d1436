//! Filtered, paginated views over the opportunity ledger.

use common::types::ArbitrageOpportunity;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Page {page} is out of range (1..={total_pages})")]
    PageOutOfRange { page: usize, total_pages: usize },

    #[error("Page size must be greater than 0")]
    InvalidPageSize,
}

/// Pair criterion: everything, or a case-insensitive substring of `BASE/QUOTE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PairFilter {
    #[default]
    All,
    Contains(String),
}

impl PairFilter {
    /// `"all"` (any case) or an empty string selects every pair.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            PairFilter::All
        } else {
            PairFilter::Contains(trimmed.to_uppercase())
        }
    }

    fn matches(&self, opportunity: &ArbitrageOpportunity) -> bool {
        match self {
            PairFilter::All => true,
            PairFilter::Contains(needle) => opportunity
                .pair
                .to_string()
                .to_uppercase()
                .contains(needle.to_uppercase().as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpportunityFilter {
    pub min_profit_pct: Decimal,
    pub pair: PairFilter,
}

impl OpportunityFilter {
    pub fn new(min_profit_pct: Decimal, pair: &str) -> Self {
        Self {
            min_profit_pct,
            pair: PairFilter::parse(pair),
        }
    }

    pub fn matches(&self, opportunity: &ArbitrageOpportunity) -> bool {
        opportunity.profit_percentage >= self.min_profit_pct && self.pair.matches(opportunity)
    }
}

/// One page of a filtered view.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<ArbitrageOpportunity>,
    /// 1-based.
    pub page: usize,
    pub total_pages: usize,
    /// Entries matching the filter across all pages.
    pub total_items: usize,
}

/// Keeps the entries matching `criteria`, preserving order.
pub fn filter<'a>(
    entries: impl IntoIterator<Item = &'a ArbitrageOpportunity>,
    criteria: &OpportunityFilter,
) -> Vec<ArbitrageOpportunity> {
    entries
        .into_iter()
        .filter(|o| criteria.matches(o))
        .cloned()
        .collect()
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size).max(1)
}

pub fn paginate(
    filtered: Vec<ArbitrageOpportunity>,
    page: usize,
    page_size: usize,
) -> Result<Page, QueryError> {
    if page_size == 0 {
        return Err(QueryError::InvalidPageSize);
    }

    let total_items = filtered.len();
    let total_pages = total_pages(total_items, page_size);
    if page < 1 || page > total_pages {
        return Err(QueryError::PageOutOfRange { page, total_pages });
    }

    let items = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Ok(Page {
        items,
        page,
        total_pages,
        total_items,
    })
}
