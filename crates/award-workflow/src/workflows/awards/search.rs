use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{ActorId, AwardClassification};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
/// Page size of the "my submissions" listing.
pub const DEFAULT_ACTOR_LIMIT: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Anything other than `asc` sorts newest first.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("asc") => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }

    pub const fn sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Raw search parameters as received from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub student_year: Option<u8>,
    #[serde(default)]
    pub classification: Option<AwardClassification>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub order: Option<String>,
}

impl SearchRequest {
    pub fn into_query(self, campus_id: i64) -> SearchQuery {
        SearchQuery {
            campus_id,
            keyword: self
                .keyword
                .map(|keyword| keyword.trim().to_string())
                .filter(|keyword| !keyword.is_empty()),
            date: self.date,
            student_year: self.student_year,
            classification: self.classification,
            page: clamp(self.page, DEFAULT_PAGE),
            limit: clamp(self.limit, DEFAULT_LIMIT),
            order: SortOrder::parse(self.order.as_deref()),
        }
    }
}

/// Campus-scoped search with pagination already clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub campus_id: i64,
    pub keyword: Option<String>,
    pub date: Option<NaiveDate>,
    pub student_year: Option<u8>,
    pub classification: Option<AwardClassification>,
    pub page: u32,
    pub limit: u32,
    pub order: SortOrder,
}

impl SearchQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Raw parameters of the caller's own submission listing. `years` is a comma separated list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorRequest {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub years: Option<String>,
}

impl ActorRequest {
    pub fn into_query(self, actor_id: ActorId) -> Result<ActorQuery, String> {
        let years = match self.years.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|year| !year.is_empty())
                .map(|year| {
                    year.parse::<i32>()
                        .map_err(|_| format!("'{year}' is not a valid academic year"))
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(ActorQuery {
            actor_id,
            years,
            page: clamp(self.page, DEFAULT_PAGE),
            limit: clamp(self.limit, DEFAULT_ACTOR_LIMIT),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorQuery {
    pub actor_id: ActorId,
    pub years: Vec<i32>,
    pub page: u32,
    pub limit: u32,
}

impl ActorQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

fn clamp(value: Option<i64>, default: u32) -> u32 {
    match value {
        Some(value) if value >= 1 => u32::try_from(value).unwrap_or(u32::MAX),
        _ => default,
    }
}

/// One page of results plus the counts needed to render pagination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: u64, page: u32, limit: u32) -> Self {
        Self {
            items,
            total_items,
            page,
            limit,
            total_pages: total_pages(total_items, limit),
        }
    }
}

pub fn total_pages(total_items: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total_items.div_ceil(u64::from(limit))
}
