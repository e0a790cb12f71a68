pub mod installation;
pub mod query;
pub mod summary;

pub use installation::{battery_flag, normalize_state_code, Installation};
pub use query::{InstallationFilter, Page, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use summary::{
    InstallationPage, NationwideStats, StateDetail, StateInfo, StateStats, StateSummary, TechStat,
    YearRange, YearlyStat,
};
