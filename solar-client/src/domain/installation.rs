/// One row of the large-scale solar photovoltaic dataset.
///
/// Every column apart from `case_id` is nullable: the CSV has gaps, and the
/// null-substituting load policy keeps rows whose numeric cells fail to parse.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Installation {
    pub case_id: i64,
    pub name: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub capacity_ac: Option<f64>,
    pub capacity_dc: Option<f64>,
    pub year: Option<i32>,
    #[cfg_attr(feature = "serde", serde(rename = "technology"))]
    pub tech_primary: Option<String>,
    pub axis_type: Option<String>,
    pub has_battery: bool,
    pub area: Option<f64>,
}

impl Installation {
    /// Build an installation with only the identifier set.
    pub fn new(case_id: i64) -> Self {
        Self {
            case_id,
            name: None,
            state: None,
            county: None,
            latitude: None,
            longitude: None,
            capacity_ac: None,
            capacity_dc: None,
            year: None,
            tech_primary: None,
            axis_type: None,
            has_battery: false,
            area: None,
        }
    }
}

/// The battery column is free text; storage is flagged by any mention of
/// "batteries".
pub fn battery_flag(text: Option<&str>) -> bool {
    text.is_some_and(|t| t.to_ascii_lowercase().contains("batteries"))
}

/// Normalize a user- or file-supplied state code: trimmed and uppercased.
/// Blank input has no code.
pub fn normalize_state_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_uppercase())
    }
}
