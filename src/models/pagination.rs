use serde::{ Deserialize, Serialize };

pub const DEFAULT_CURRENT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Effective page selection after defaults have been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub current_page: u32,
    pub per_page: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            current_page: DEFAULT_CURRENT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PaginationParams {
    /// Number of rows to skip before this page
    pub fn offset(&self) -> u64 {
        (self.current_page.saturating_sub(1) as u64) * (self.per_page as u64)
    }
}

/// Caller-supplied page selection; absent fields fall back to the defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl PageRequest {
    pub fn new(current_page: u32, per_page: u32) -> Self {
        Self {
            current_page: Some(current_page),
            per_page: Some(per_page),
        }
    }

    /// Build from raw query-string values; unparseable values count as absent
    pub fn from_query(current_page: Option<&str>, per_page: Option<&str>) -> Self {
        Self {
            current_page: current_page.and_then(|v| v.trim().parse().ok()),
            per_page: per_page.and_then(|v| v.trim().parse().ok()),
        }
    }

    /// Merge over the defaults field by field. Zero is not a valid page or size.
    pub fn resolve(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            current_page: self.current_page.filter(|v| *v > 0).unwrap_or(defaults.current_page),
            per_page: self.per_page.filter(|v| *v > 0).unwrap_or(defaults.per_page),
        }
    }
}

impl From<PaginationParams> for PageRequest {
    fn from(params: PaginationParams) -> Self {
        Self::new(params.current_page, params.per_page)
    }
}

/// Length-aware page metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: u64,
    pub last_page: u64,
    pub per_page: u32,
    pub current_page: u32,
    pub from: u64,
    pub to: u64,
}

impl PaginationMeta {
    pub fn new(params: PaginationParams, total: u64, returned: usize) -> Self {
        let per_page = params.per_page.max(1) as u64;
        let from = params.offset();
        Self {
            total,
            last_page: (total + per_page - 1) / per_page,
            per_page: params.per_page,
            current_page: params.current_page,
            from,
            to: from + (returned as u64),
        }
    }
}

/// One page of rows plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, params: PaginationParams, total: u64) -> Self {
        let pagination = PaginationMeta::new(params, total, data.len());
        Self { data, pagination }
    }
}
