//! Grouped statistics over an in-memory installation table.
//!
//! Sums and means ignore null cells. A mean over no values is `0.0` so a
//! sparse group never fails a request.

use std::collections::{BTreeMap, HashMap, HashSet};

use solar_client::domain::{
    Installation, NationwideStats, StateDetail, StateInfo, StateStats, StateSummary, TechStat,
    YearRange, YearlyStat,
};

pub fn sum_ignoring_null<I: IntoIterator<Item = Option<f64>>>(values: I) -> f64 {
    values.into_iter().flatten().fold(0.0, |acc, v| acc + v)
}

pub fn mean_ignoring_null<I: IntoIterator<Item = Option<f64>>>(values: I) -> f64 {
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn count(rows: &[&Installation]) -> i64 {
    rows.len() as i64
}

fn capacity_ac<'a>(rows: &'a [&'a Installation]) -> impl Iterator<Item = Option<f64>> + 'a {
    rows.iter().map(|r| r.capacity_ac)
}

/// Groups by state in code order, with the null-state group (if any) last.
fn group_by_state(rows: &[Installation]) -> Vec<(Option<&str>, Vec<&Installation>)> {
    let mut known: BTreeMap<&str, Vec<&Installation>> = BTreeMap::new();
    let mut unknown = Vec::new();
    for row in rows {
        match row.state.as_deref() {
            Some(code) => known.entry(code).or_default().push(row),
            None => unknown.push(row),
        }
    }

    let mut groups: Vec<_> = known.into_iter().map(|(k, v)| (Some(k), v)).collect();
    if !unknown.is_empty() {
        groups.push((None, unknown));
    }
    groups
}

/// Totals per state, ordered by state code.
pub fn state_summaries(rows: &[Installation]) -> Vec<StateSummary> {
    group_by_state(rows)
        .into_iter()
        .map(|(state, group)| StateSummary {
            state: state.map(str::to_string),
            total_capacity_ac: sum_ignoring_null(capacity_ac(&group)),
            total_capacity_dc: sum_ignoring_null(group.iter().map(|r| r.capacity_dc)),
            installation_count: count(&group),
            avg_capacity: mean_ignoring_null(capacity_ac(&group)),
            total_area: sum_ignoring_null(group.iter().map(|r| r.area)),
            latest_year: group.iter().filter_map(|r| r.year).max(),
        })
        .collect()
}

/// Capacity per year, ascending, with unknown years in a trailing bucket.
pub fn yearly_progression(rows: &[&Installation]) -> Vec<YearlyStat> {
    let mut by_year: BTreeMap<Option<i32>, Vec<&Installation>> = BTreeMap::new();
    for row in rows {
        by_year.entry(row.year).or_default().push(row);
    }

    let mut stats: Vec<YearlyStat> = by_year
        .into_iter()
        .map(|(year, group)| YearlyStat {
            year,
            total_capacity: sum_ignoring_null(capacity_ac(&group)),
            installation_count: count(&group),
        })
        .collect();
    // BTreeMap puts None first.
    if stats.first().is_some_and(|s| s.year.is_none()) {
        stats.rotate_left(1);
    }
    stats
}

/// Count and capacity per technology, most common first. Ties keep the
/// order in which each technology first appears.
pub fn tech_distribution(rows: &[&Installation]) -> Vec<TechStat> {
    let mut order: Vec<(Option<&str>, Vec<&Installation>)> = Vec::new();
    let mut index: HashMap<Option<&str>, usize> = HashMap::new();
    for row in rows {
        let key = row.tech_primary.as_deref();
        let slot = *index.entry(key).or_insert_with(|| {
            order.push((key, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(row);
    }

    let mut stats: Vec<TechStat> = order
        .into_iter()
        .map(|(tech, group)| TechStat {
            tech_primary: tech.map(str::to_string),
            count: count(&group),
            total_capacity: sum_ignoring_null(capacity_ac(&group)),
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats
}

/// Detail for one normalized state code; `None` when no row matches.
pub fn state_detail(rows: &[Installation], state_code: &str) -> Option<StateDetail> {
    let matching: Vec<&Installation> = rows
        .iter()
        .filter(|r| r.state.as_deref() == Some(state_code))
        .collect();
    if matching.is_empty() {
        return None;
    }

    let counties: HashSet<&str> = matching.iter().filter_map(|r| r.county.as_deref()).collect();

    let stats = StateStats {
        total_installations: count(&matching),
        total_capacity: sum_ignoring_null(capacity_ac(&matching)),
        average_capacity: mean_ignoring_null(capacity_ac(&matching)),
        total_counties: counties.len() as i64,
        year_range: YearRange::from_years(matching.iter().map(|r| r.year)),
    };

    let yearly_progression = yearly_progression(&matching);
    let tech_distribution = tech_distribution(&matching);

    // Newest first; `None < Some(_)` sends unknown years to the end and the
    // stable sort keeps load order within a year.
    let mut installations: Vec<Installation> = matching.into_iter().cloned().collect();
    installations.sort_by(|a, b| b.year.cmp(&a.year));

    Some(StateDetail {
        state: state_code.to_string(),
        stats,
        yearly_progression,
        tech_distribution,
        installations,
    })
}

pub fn nationwide_stats(rows: &[Installation]) -> NationwideStats {
    let states: HashSet<&str> = rows.iter().filter_map(|r| r.state.as_deref()).collect();

    NationwideStats {
        total_installations: rows.len() as i64,
        total_capacity_ac: sum_ignoring_null(rows.iter().map(|r| r.capacity_ac)),
        average_size: mean_ignoring_null(rows.iter().map(|r| r.capacity_ac)),
        states_count: states.len() as i64,
        year_range: YearRange::from_years(rows.iter().map(|r| r.year)),
    }
}

/// Known state codes, ascending, with count and AC capacity.
pub fn state_listing(rows: &[Installation]) -> Vec<StateInfo> {
    group_by_state(rows)
        .into_iter()
        .filter_map(|(state, group)| {
            Some(StateInfo {
                code: state?.to_string(),
                installations: count(&group),
                total_capacity: sum_ignoring_null(capacity_ac(&group)),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(case_id: i64, state: &str, year: Option<i32>, cap_ac: Option<f64>) -> Installation {
        let mut i = Installation::new(case_id);
        i.state = Some(state.to_string());
        i.year = year;
        i.capacity_ac = cap_ac;
        i.tech_primary = Some("PV".to_string());
        i
    }

    fn fixture() -> Vec<Installation> {
        vec![
            inst(1, "CA", Some(2019), Some(10.0)),
            inst(2, "CA", Some(2020), Some(5.0)),
            inst(3, "NY", Some(2018), Some(3.0)),
        ]
    }

    #[test]
    fn null_values_are_ignored_by_sum_and_mean() {
        let values = [Some(2.0), None, Some(4.0)];
        assert_eq!(sum_ignoring_null(values), 6.0);
        assert_eq!(mean_ignoring_null(values), 3.0);
        assert_eq!(mean_ignoring_null([None, None]), 0.0);
        assert_eq!(sum_ignoring_null(Vec::<Option<f64>>::new()), 0.0);
    }

    #[test]
    fn state_summary_for_worked_example() {
        let summaries = state_summaries(&fixture());
        assert_eq!(summaries.len(), 2);

        let ca = &summaries[0];
        assert_eq!(ca.state.as_deref(), Some("CA"));
        assert_eq!(ca.installation_count, 2);
        assert_eq!(ca.total_capacity_ac, 15.0);
        assert_eq!(ca.avg_capacity, 7.5);
        assert_eq!(ca.latest_year, Some(2020));
        assert_eq!(summaries[1].state.as_deref(), Some("NY"));
    }

    #[test]
    fn nationwide_stats_for_worked_example() {
        let stats = nationwide_stats(&fixture());
        assert_eq!(stats.total_installations, 3);
        assert_eq!(stats.total_capacity_ac, 18.0);
        assert_eq!(stats.average_size, 6.0);
        assert_eq!(stats.states_count, 2);
        assert_eq!(stats.year_range, Some(YearRange(2018, 2020)));
    }

    #[test]
    fn per_state_capacity_adds_up_to_nationwide_total() {
        let mut rows = fixture();
        rows.push(inst(4, "TX", None, None));
        rows.push(inst(5, "TX", Some(2021), Some(0.3)));
        let mut stateless = Installation::new(6);
        stateless.capacity_ac = Some(1.7);
        rows.push(stateless);

        let per_state: f64 = state_summaries(&rows).iter().map(|s| s.total_capacity_ac).sum();
        let nationwide = nationwide_stats(&rows).total_capacity_ac;
        assert!((per_state - nationwide).abs() < 1e-9);
    }

    #[test]
    fn stateless_rows_group_last_and_are_not_listed() {
        let mut rows = fixture();
        rows.insert(0, Installation::new(9));

        let summaries = state_summaries(&rows);
        assert_eq!(summaries.last().unwrap().state, None);

        let listing = state_listing(&rows);
        let codes: Vec<&str> = listing.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["CA", "NY"]);
        assert_eq!(nationwide_stats(&rows).states_count, 2);
    }

    #[test]
    fn unparseable_year_is_counted_but_not_ranged() {
        let mut rows = fixture();
        rows.push(inst(4, "NY", None, Some(1.0)));
        let stats = nationwide_stats(&rows);
        assert_eq!(stats.total_installations, 4);
        assert_eq!(stats.year_range, Some(YearRange(2018, 2020)));
    }

    #[test]
    fn empty_table_has_zero_totals() {
        let stats = nationwide_stats(&[]);
        assert_eq!(stats.total_installations, 0);
        assert_eq!(stats.total_capacity_ac, 0.0);
        assert_eq!(stats.average_size, 0.0);
        assert_eq!(stats.year_range, None);
        assert!(state_summaries(&[]).is_empty());
    }

    #[test]
    fn state_detail_orders_installations_newest_first() {
        let mut rows = fixture();
        rows.push(inst(4, "CA", None, Some(2.0)));
        rows.push(inst(5, "CA", Some(2020), Some(1.0)));

        let detail = state_detail(&rows, "CA").unwrap();
        let ids: Vec<i64> = detail.installations.iter().map(|i| i.case_id).collect();
        assert_eq!(ids, vec![2, 5, 1, 4]);
        assert_eq!(detail.stats.total_installations, 4);
        assert_eq!(detail.stats.total_capacity, 18.0);
        assert_eq!(detail.stats.year_range, Some(YearRange(2019, 2020)));
    }

    #[test]
    fn state_detail_yearly_buckets_ascend_with_unknown_last() {
        let mut rows = fixture();
        rows.push(inst(4, "CA", None, Some(2.0)));
        rows.push(inst(5, "CA", Some(2020), None));

        let detail = state_detail(&rows, "CA").unwrap();
        let years: Vec<Option<i32>> = detail.yearly_progression.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![Some(2019), Some(2020), None]);
        assert_eq!(detail.yearly_progression[1].installation_count, 2);
        assert_eq!(detail.yearly_progression[1].total_capacity, 5.0);
    }

    #[test]
    fn tech_distribution_sorts_by_count_then_first_seen() {
        let mut rows = Vec::new();
        for (id, tech) in [(1, "CSP"), (2, "PV"), (3, "PV"), (4, "CPV"), (5, "CSP")] {
            let mut i = inst(id, "AZ", Some(2015), Some(1.0));
            i.tech_primary = Some(tech.to_string());
            rows.push(i);
        }
        let mut untyped = inst(6, "AZ", Some(2015), Some(1.0));
        untyped.tech_primary = None;
        rows.push(untyped);

        let detail = state_detail(&rows, "AZ").unwrap();
        let techs: Vec<Option<&str>> = detail
            .tech_distribution
            .iter()
            .map(|t| t.tech_primary.as_deref())
            .collect();
        assert_eq!(techs, vec![Some("CSP"), Some("PV"), Some("CPV"), None]);
    }

    #[test]
    fn state_detail_counts_distinct_counties() {
        let mut rows = fixture();
        rows[0].county = Some("Kern".to_string());
        rows[1].county = Some("Kern".to_string());
        let detail = state_detail(&rows, "CA").unwrap();
        assert_eq!(detail.stats.total_counties, 1);
    }

    #[test]
    fn state_detail_without_rows_is_none() {
        assert!(state_detail(&fixture(), "WY").is_none());
    }

    #[test]
    fn state_without_years_has_no_range() {
        let rows = vec![inst(1, "VT", None, Some(1.0))];
        assert_eq!(state_detail(&rows, "VT").unwrap().stats.year_range, None);
    }
}
