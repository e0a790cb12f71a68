use super::Installation;

/// Per-state totals, one row per distinct state code.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StateSummary {
    pub state: Option<String>,
    pub total_capacity_ac: f64,
    pub total_capacity_dc: f64,
    pub installation_count: i64,
    pub avg_capacity: f64,
    pub total_area: f64,
    pub latest_year: Option<i32>,
}

/// Capacity installed per commissioning year within one state.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct YearlyStat {
    pub year: Option<i32>,
    pub total_capacity: f64,
    pub installation_count: i64,
}

/// Installation count and capacity per primary technology within one state.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TechStat {
    pub tech_primary: Option<String>,
    pub count: i64,
    pub total_capacity: f64,
}

/// Inclusive `[earliest, latest]` commissioning years. Serialized as a
/// two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct YearRange(pub i32, pub i32);

impl YearRange {
    /// Range over every known year; `None` when no year is known.
    pub fn from_years<I: IntoIterator<Item = Option<i32>>>(years: I) -> Option<Self> {
        years.into_iter().flatten().fold(None, |acc, y| match acc {
            None => Some(YearRange(y, y)),
            Some(YearRange(lo, hi)) => Some(YearRange(lo.min(y), hi.max(y))),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StateStats {
    pub total_installations: i64,
    pub total_capacity: f64,
    pub average_capacity: f64,
    pub total_counties: i64,
    pub year_range: Option<YearRange>,
}

/// Everything known about one state: headline stats, breakdowns and the
/// installations themselves (newest first).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StateDetail {
    pub state: String,
    pub stats: StateStats,
    pub yearly_progression: Vec<YearlyStat>,
    pub tech_distribution: Vec<TechStat>,
    pub installations: Vec<Installation>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NationwideStats {
    pub total_installations: i64,
    pub total_capacity_ac: f64,
    pub average_size: f64,
    pub states_count: i64,
    pub year_range: Option<YearRange>,
}

/// Entry in the state picker listing.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StateInfo {
    pub code: String,
    pub installations: i64,
    pub total_capacity: f64,
}

/// One page of a filtered installation listing. `total` counts every
/// matching row, not just the page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InstallationPage {
    pub total: i64,
    pub installations: Vec<Installation>,
}
