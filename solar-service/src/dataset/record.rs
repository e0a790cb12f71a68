use csv::StringRecord;
use solar_client::domain::{battery_flag, normalize_state_code, Installation};

use super::LoadPolicy;

/// Why a single CSV row could not become an [`Installation`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("invalid case_id '{0}'")]
    InvalidIdentifier(String),
    #[error("duplicate case_id {0}")]
    DuplicateIdentifier(i64),
    #[error("invalid {column} '{value}'")]
    InvalidField { column: &'static str, value: String },
    #[error("malformed CSV record: {0}")]
    Malformed(String),
}

/// Column positions resolved once from the header row. Only `case_id` must
/// be present; any other missing column reads as empty.
#[derive(Debug, Clone)]
pub struct CsvColumns {
    case_id: usize,
    state: Option<usize>,
    county: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    name: Option<usize>,
    year: Option<usize>,
    capacity_ac: Option<usize>,
    capacity_dc: Option<usize>,
    tech_primary: Option<usize>,
    axis_type: Option<usize>,
    battery: Option<usize>,
    area: Option<usize>,
}

impl CsvColumns {
    /// Returns `None` when the header has no `case_id` column.
    pub fn from_headers(headers: &StringRecord) -> Option<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        Some(Self {
            case_id: find("case_id")?,
            state: find("p_state"),
            county: find("p_county"),
            latitude: find("ylat"),
            longitude: find("xlong"),
            name: find("p_name"),
            year: find("p_year"),
            capacity_ac: find("p_cap_ac"),
            capacity_dc: find("p_cap_dc"),
            tech_primary: find("p_tech_pri"),
            axis_type: find("p_axis"),
            battery: find("p_battery"),
            area: find("p_area"),
        })
    }
}

fn cell(record: &StringRecord, idx: Option<usize>) -> &str {
    idx.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
}

fn parse_optional_string(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integers may arrive float-formatted (`2019.0`) when the export went
/// through a float column.
fn parse_integral(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = parse_f64(s)?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_year(s: &str) -> Option<i32> {
    parse_integral(s).and_then(|v| i32::try_from(v).ok())
}

/// Applies the load policy to one cell. Under `NullSubstitute` a bad cell is
/// null; under `SkipInvalid` a bad or blank required cell fails the row.
fn required<T>(
    policy: LoadPolicy,
    column: &'static str,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, RowError> {
    match (parse(raw), policy) {
        (Some(v), _) => Ok(Some(v)),
        (None, LoadPolicy::NullSubstitute) => Ok(None),
        (None, LoadPolicy::SkipInvalid) => Err(RowError::InvalidField {
            column,
            value: raw.to_string(),
        }),
    }
}

/// Coerce one CSV record. Identifier, year, capacities and coordinates are
/// required; every other column is best-effort under both policies.
pub fn coerce_record(
    record: &StringRecord,
    columns: &CsvColumns,
    policy: LoadPolicy,
) -> Result<Installation, RowError> {
    let raw_id = cell(record, Some(columns.case_id));
    let case_id =
        parse_integral(raw_id).ok_or_else(|| RowError::InvalidIdentifier(raw_id.to_string()))?;

    let year = required(policy, "p_year", cell(record, columns.year), parse_year)?;
    let capacity_ac = required(policy, "p_cap_ac", cell(record, columns.capacity_ac), parse_f64)?;
    let capacity_dc = required(policy, "p_cap_dc", cell(record, columns.capacity_dc), parse_f64)?;
    let latitude = required(policy, "ylat", cell(record, columns.latitude), parse_f64)?;
    let longitude = required(policy, "xlong", cell(record, columns.longitude), parse_f64)?;

    let battery = cell(record, columns.battery);

    Ok(Installation {
        case_id,
        name: parse_optional_string(cell(record, columns.name)),
        state: normalize_state_code(cell(record, columns.state)),
        county: parse_optional_string(cell(record, columns.county)),
        latitude,
        longitude,
        capacity_ac,
        capacity_dc,
        year,
        tech_primary: parse_optional_string(cell(record, columns.tech_primary)),
        axis_type: parse_optional_string(cell(record, columns.axis_type)),
        has_battery: battery_flag(Some(battery)),
        area: parse_f64(cell(record, columns.area)),
    })
}
