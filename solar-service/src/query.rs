use solar_client::domain::{Installation, InstallationFilter, InstallationPage, Page};

/// True when `inst` passes every filter that is set. A row with unknown AC
/// capacity never satisfies a minimum-capacity filter.
pub fn matches(inst: &Installation, filter: &InstallationFilter) -> bool {
    if let Some(state) = &filter.state {
        if inst.state.as_deref() != Some(state.as_str()) {
            return false;
        }
    }
    if let Some(year) = filter.year {
        if inst.year != Some(year) {
            return false;
        }
    }
    if let Some(min) = filter.min_capacity {
        if !inst.capacity_ac.is_some_and(|cap| cap >= min) {
            return false;
        }
    }
    true
}

/// Filter then paginate, keeping load order.
pub fn filter_installations(
    rows: &[Installation],
    filter: &InstallationFilter,
    page: Page,
) -> InstallationPage {
    let matching: Vec<&Installation> = rows.iter().filter(|r| matches(r, filter)).collect();

    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);

    InstallationPage {
        total: matching.len() as i64,
        installations: matching.into_iter().skip(offset).take(limit).cloned().collect(),
    }
}
