use super::installation::normalize_state_code;

pub const DEFAULT_PAGE_LIMIT: u64 = 50;
pub const MAX_PAGE_LIMIT: u64 = 1000;

/// Conjunctive filters for the installation listing. `None` means "don't
/// filter on this column".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallationFilter {
    pub state: Option<String>,
    pub year: Option<i32>,
    /// Inclusive lower bound on `capacity_ac`.
    pub min_capacity: Option<f64>,
}

impl InstallationFilter {
    pub fn with_state(mut self, state: &str) -> Self {
        self.state = normalize_state_code(state);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_min_capacity(mut self, min_capacity: f64) -> Self {
        self.min_capacity = Some(min_capacity);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    /// Defaults to the first 50 rows; `limit` is clamped to 1000.
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(Page::default(), Page { limit: 50, offset: 0 });
        assert_eq!(Page::new(Some(5000), Some(20)), Page { limit: 1000, offset: 20 });
        assert_eq!(Page::new(Some(0), None).limit, 0);
    }

    #[test]
    fn state_filter_is_normalized() {
        let f = InstallationFilter::default().with_state("ny");
        assert_eq!(f.state.as_deref(), Some("NY"));

        let blank = InstallationFilter::default().with_state("  ");
        assert_eq!(blank.state, None);
    }
}
