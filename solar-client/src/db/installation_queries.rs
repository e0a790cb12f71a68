use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::{
    Installation, InstallationFilter, InstallationPage, NationwideStats, Page, StateDetail,
    StateInfo, StateStats, StateSummary, TechStat, YearRange, YearlyStat,
};

pub const INSTALLATION_COLUMNS: &str = "case_id, name, state, county, latitude, longitude, \
     capacity_ac, capacity_dc, year, tech_primary, axis_type, has_battery, area";

#[derive(Debug, Clone, sqlx::FromRow)]
struct Headline {
    total_installations: i64,
    total_capacity: f64,
    average_capacity: f64,
    distinct_values: i64,
    min_year: Option<i32>,
    max_year: Option<i32>,
}

impl Headline {
    fn year_range(&self) -> Option<YearRange> {
        match (self.min_year, self.max_year) {
            (Some(lo), Some(hi)) => Some(YearRange(lo, hi)),
            _ => None,
        }
    }
}

/// Totals per state, ordered by state code.
pub async fn state_summaries(pool: &PgPool) -> Result<Vec<StateSummary>> {
    let rows = sqlx::query_as::<_, StateSummary>(
        r#"
        SELECT
            state,
            COALESCE(SUM(capacity_ac), 0) AS total_capacity_ac,
            COALESCE(SUM(capacity_dc), 0) AS total_capacity_dc,
            COUNT(*)                      AS installation_count,
            COALESCE(AVG(capacity_ac), 0) AS avg_capacity,
            COALESCE(SUM(area), 0)        AS total_area,
            MAX(year)                     AS latest_year
        FROM solar_installations
        GROUP BY state
        ORDER BY state ASC NULLS LAST
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Headline stats, breakdowns and rows for one state. `None` when the state
/// has no installations.
pub async fn state_detail(pool: &PgPool, state_code: &str) -> Result<Option<StateDetail>> {
    let installations = sqlx::query_as::<_, Installation>(&format!(
        "SELECT {INSTALLATION_COLUMNS} FROM solar_installations \
         WHERE state = $1 ORDER BY year DESC NULLS LAST, case_id"
    ))
    .bind(state_code)
    .fetch_all(pool)
    .await?;

    if installations.is_empty() {
        return Ok(None);
    }

    let headline = sqlx::query_as::<_, Headline>(
        r#"
        SELECT
            COUNT(*)                      AS total_installations,
            COALESCE(SUM(capacity_ac), 0) AS total_capacity,
            COALESCE(AVG(capacity_ac), 0) AS average_capacity,
            COUNT(DISTINCT county)        AS distinct_values,
            MIN(year)                     AS min_year,
            MAX(year)                     AS max_year
        FROM solar_installations
        WHERE state = $1
        "#,
    )
    .bind(state_code)
    .fetch_one(pool)
    .await?;

    let yearly_progression = sqlx::query_as::<_, YearlyStat>(
        r#"
        SELECT
            year,
            COALESCE(SUM(capacity_ac), 0) AS total_capacity,
            COUNT(*)                      AS installation_count
        FROM solar_installations
        WHERE state = $1
        GROUP BY year
        ORDER BY year ASC NULLS LAST
        "#,
    )
    .bind(state_code)
    .fetch_all(pool)
    .await?;

    // Ties fall back to the lowest case_id, which tracks import order.
    let tech_distribution = sqlx::query_as::<_, TechStat>(
        r#"
        SELECT
            tech_primary,
            COUNT(*)                      AS count,
            COALESCE(SUM(capacity_ac), 0) AS total_capacity
        FROM solar_installations
        WHERE state = $1
        GROUP BY tech_primary
        ORDER BY COUNT(*) DESC, MIN(case_id) ASC
        "#,
    )
    .bind(state_code)
    .fetch_all(pool)
    .await?;

    Ok(Some(StateDetail {
        state: state_code.to_string(),
        stats: StateStats {
            total_installations: headline.total_installations,
            total_capacity: headline.total_capacity,
            average_capacity: headline.average_capacity,
            total_counties: headline.distinct_values,
            year_range: headline.year_range(),
        },
        yearly_progression,
        tech_distribution,
        installations,
    }))
}

pub async fn nationwide_stats(pool: &PgPool) -> Result<NationwideStats> {
    let headline = sqlx::query_as::<_, Headline>(
        r#"
        SELECT
            COUNT(*)                      AS total_installations,
            COALESCE(SUM(capacity_ac), 0) AS total_capacity,
            COALESCE(AVG(capacity_ac), 0) AS average_capacity,
            COUNT(DISTINCT state)         AS distinct_values,
            MIN(year)                     AS min_year,
            MAX(year)                     AS max_year
        FROM solar_installations
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(NationwideStats {
        total_installations: headline.total_installations,
        total_capacity_ac: headline.total_capacity,
        average_size: headline.average_capacity,
        states_count: headline.distinct_values,
        year_range: headline.year_range(),
    })
}

/// Known state codes with their installation count and AC capacity.
pub async fn states(pool: &PgPool) -> Result<Vec<StateInfo>> {
    let rows = sqlx::query_as::<_, StateInfo>(
        r#"
        SELECT
            state                         AS code,
            COUNT(*)                      AS installations,
            COALESCE(SUM(capacity_ac), 0) AS total_capacity
        FROM solar_installations
        WHERE state IS NOT NULL
        GROUP BY state
        ORDER BY state
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn count_installations(pool: &PgPool) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM solar_installations")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

fn push_filter(builder: &mut QueryBuilder<'static, Postgres>, filter: &InstallationFilter) {
    builder.push(" WHERE TRUE");
    if let Some(state) = &filter.state {
        builder.push(" AND state = ").push_bind(state.clone());
    }
    if let Some(year) = filter.year {
        builder.push(" AND year = ").push_bind(year);
    }
    if let Some(min_capacity) = filter.min_capacity {
        builder.push(" AND capacity_ac >= ").push_bind(min_capacity);
    }
}

/// `SELECT COUNT(*)` over the filtered rows.
pub fn count_query(filter: &InstallationFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM solar_installations");
    push_filter(&mut builder, filter);
    builder
}

/// `(LIMIT, OFFSET)` as Postgres `BIGINT`s. Values past `i64::MAX` saturate,
/// which still selects nothing beyond the last row.
pub fn page_window(page: Page) -> (i64, i64) {
    (
        i64::try_from(page.limit).unwrap_or(i64::MAX),
        i64::try_from(page.offset).unwrap_or(i64::MAX),
    )
}

/// One page of the filtered rows in case_id order.
pub fn page_query(filter: &InstallationFilter, page: Page) -> QueryBuilder<'static, Postgres> {
    let (limit, offset) = page_window(page);
    let mut builder = QueryBuilder::new(format!(
        "SELECT {INSTALLATION_COLUMNS} FROM solar_installations"
    ));
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY case_id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    builder
}

pub async fn installations(
    pool: &PgPool,
    filter: &InstallationFilter,
    page: Page,
) -> Result<InstallationPage> {
    let total = count_query(filter)
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let installations = page_query(filter, page)
        .build_query_as::<Installation>()
        .fetch_all(pool)
        .await?;

    Ok(InstallationPage { total, installations })
}
