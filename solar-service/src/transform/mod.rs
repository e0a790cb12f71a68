use crate::pipeline::{Envelope, PipelineError, Transform};
use solar_client::domain::Installation;

/// Counter bumped once per row the import rejects.
pub const REJECTED_ROWS_METRIC: &str = "solar_import_rejected_total";

/// Widths of the `VARCHAR` columns in `sql/schema/01_solar_installations.sql`.
pub const NAME_MAX_CHARS: usize = 255;
pub const COUNTY_MAX_CHARS: usize = 100;
pub const TECH_MAX_CHARS: usize = 50;
pub const AXIS_MAX_CHARS: usize = 50;

fn check_width(
    row: usize,
    column: &str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<(), PipelineError> {
    match value {
        Some(v) if v.chars().count() > max_chars => Err(PipelineError::Transform(format!(
            "row {row}: {column} longer than {max_chars} characters"
        ))),
        _ => Ok(()),
    }
}

/// Pure validation of an `Installation` headed for PostgreSQL.
///
/// Rules:
/// - state must be a two-letter code.
/// - text columns must fit their `VARCHAR` width.
/// - coordinates, when present, must be on the globe.
///
/// Any of these would otherwise fail the whole multi-row INSERT for its
/// batch. Capacity sign is not checked.
pub fn validate_installation(
    env: Envelope<Installation>,
) -> Result<Envelope<Installation>, PipelineError> {
    let inst = &env.payload;

    match inst.state.as_deref() {
        Some(code) if code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase()) => {}
        Some(code) => {
            return Err(PipelineError::Transform(format!(
                "row {}: invalid state code '{code}'",
                env.row
            )))
        }
        None => {
            return Err(PipelineError::Transform(format!(
                "row {}: missing state code",
                env.row
            )))
        }
    }

    check_width(env.row, "name", inst.name.as_deref(), NAME_MAX_CHARS)?;
    check_width(env.row, "county", inst.county.as_deref(), COUNTY_MAX_CHARS)?;
    check_width(env.row, "tech_primary", inst.tech_primary.as_deref(), TECH_MAX_CHARS)?;
    check_width(env.row, "axis_type", inst.axis_type.as_deref(), AXIS_MAX_CHARS)?;

    if inst.latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
        return Err(PipelineError::Transform(format!(
            "row {}: latitude out of range",
            env.row
        )));
    }
    if inst.longitude.is_some_and(|lon| !(-180.0..=180.0).contains(&lon)) {
        return Err(PipelineError::Transform(format!(
            "row {}: longitude out of range",
            env.row
        )));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct InstallationValidation;

#[async_trait::async_trait]
impl Transform<Installation, Installation> for InstallationValidation {
    async fn apply(
        &self,
        input: Envelope<Installation>,
    ) -> Result<Envelope<Installation>, PipelineError> {
        match validate_installation(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!(REJECTED_ROWS_METRIC).increment(1);
                Err(e)
            }
        }
    }
}
